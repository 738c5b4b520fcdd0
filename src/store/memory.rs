//! 进程内交易存储：从 JSON 文件加载或直接由内存构造
//!
//! 检索使用简单的词项重合打分（查询词在描述+分类中出现的比例），
//! 仅作为可替换的默认后端。

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::AgentError;
use crate::store::{
    CategoryAggregator, CategoryTotal, Transaction, TransactionMatch, TransactionSearch,
};

#[derive(Clone, Debug, Default)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// 读取 `[{subject, date, description, category, amount}]` 格式的 JSON 文件
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Store(format!("read {}: {}", path.display(), e)))?;
        let transactions: Vec<Transaction> = serde_json::from_str(&raw)
            .map_err(|e| AgentError::Store(format!("parse {}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), count = transactions.len(), "transaction store loaded");
        Ok(Self::new(transactions))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn for_subject<'a>(&'a self, subject_id: &'a str) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions.iter().filter(move |t| t.subject == subject_id)
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn score(query_terms: &[String], tx: &Transaction) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let haystack = terms(&format!("{} {}", tx.description, tx.category));
    let hits = query_terms.iter().filter(|q| haystack.contains(q)).count();
    hits as f32 / query_terms.len() as f32
}

#[async_trait]
impl TransactionSearch for TransactionStore {
    async fn search(
        &self,
        subject_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TransactionMatch>, AgentError> {
        let query_terms = terms(query);
        let mut matches: Vec<TransactionMatch> = self
            .for_subject(subject_id)
            .filter_map(|tx| {
                let s = score(&query_terms, tx);
                (s > 0.0).then(|| TransactionMatch {
                    date: tx.date,
                    description: tx.description.clone(),
                    category: tx.category.clone(),
                    amount: tx.amount,
                    score: s,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.date.cmp(&a.date))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl CategoryAggregator for TransactionStore {
    async fn totals_by_category(
        &self,
        subject_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<CategoryTotal>, AgentError> {
        let mut by_category: HashMap<&str, CategoryTotal> = HashMap::new();
        for tx in self.for_subject(subject_id).filter(|t| t.date >= since) {
            let entry = by_category
                .entry(tx.category.as_str())
                .or_insert_with(|| CategoryTotal {
                    category: tx.category.clone(),
                    total: 0.0,
                    count: 0,
                });
            entry.total += tx.amount;
            entry.count += 1;
        }
        let mut totals: Vec<CategoryTotal> = by_category.into_values().collect();
        totals.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tx(subject: &str, date: &str, description: &str, category: &str, amount: f64) -> Transaction {
        Transaction {
            subject: subject.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            category: category.to_string(),
            amount,
        }
    }

    fn store() -> TransactionStore {
        TransactionStore::new(vec![
            tx("u1", "2024-05-01", "Blue Bottle Coffee", "dining", 6.5),
            tx("u1", "2024-05-03", "Coffee beans subscription", "groceries", 18.0),
            tx("u1", "2024-05-04", "Netflix", "subscriptions", 15.49),
            tx("u2", "2024-05-02", "Coffee shop", "dining", 4.0),
        ])
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_subject() {
        let hits = store().search("u1", "coffee", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        // 同分时新交易优先
        assert_eq!(hits[0].description, "Coffee beans subscription");

        let hits = store().search("u2", "coffee", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let hits = store().search("u1", "coffee", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(store().search("u1", "", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_totals_by_category_window() {
        let since = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let totals = store().totals_by_category("u1", since).await.unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, "groceries");
        assert_eq!(totals[1].category, "subscriptions");
        assert_eq!(totals[0].count, 1);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"subject":"u1","date":"2024-05-01","description":"Rent","category":"housing","amount":1200.0}}]"#
        )
        .unwrap();
        let store = TransactionStore::from_json_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = TransactionStore::from_json_file("/nonexistent/tx.json").unwrap_err();
        assert!(matches!(err, AgentError::Store(_)));
    }
}
