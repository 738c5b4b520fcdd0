//! search_transactions 工具：按自然语言描述检索用户交易
//!
//! 检索本身由注入的 TransactionSearch 完成；工具只负责参数解码与 max_results 钳制。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::TransactionSearch;
use crate::tools::schema::{clamp_rounded, decode_args, parameters_schema_for};
use crate::tools::Tool;

const DEFAULT_MAX_RESULTS: f64 = 10.0;

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    /// What to look for, e.g. "coffee shops" or "streaming subscriptions".
    query: String,
    /// Maximum number of matching transactions to return.
    #[serde(default = "default_max_results")]
    max_results: f64,
}

fn default_max_results() -> f64 {
    DEFAULT_MAX_RESULTS
}

pub struct SearchTransactionsTool {
    backend: Arc<dyn TransactionSearch>,
    /// 服务端上限，模型请求更多也不会超过
    max_results_cap: usize,
}

impl SearchTransactionsTool {
    pub fn new(backend: Arc<dyn TransactionSearch>, max_results_cap: usize) -> Self {
        Self {
            backend,
            max_results_cap: max_results_cap.max(1),
        }
    }

    fn clamp(&self, requested: f64) -> usize {
        clamp_rounded(requested, 1, self.max_results_cap as i64) as usize
    }
}

#[async_trait]
impl Tool for SearchTransactionsTool {
    fn name(&self) -> &str {
        "search_transactions"
    }

    fn description(&self) -> &str {
        "Search the user's transactions by meaning (merchant, item, or kind of spending). \
         Use it to find specific purchases or recurring charges before recommending anything about them. \
         Returns matches with date, description, category, amount and a relevance score."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<SearchArgs>()
    }

    async fn execute(&self, subject_id: &str, args: Value) -> Result<Value, String> {
        let args: SearchArgs = decode_args(self.name(), args)?;
        let query = args.query.trim();
        if query.is_empty() {
            return Err("Missing query".to_string());
        }
        let limit = self.clamp(args.max_results);
        tracing::info!(subject = %subject_id, query = %query, limit, "search_transactions");
        let matches = self
            .backend
            .search(subject_id, query, limit)
            .await
            .map_err(|e| e.to_string())?;
        Ok(json!({ "count": matches.len(), "matches": matches }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Transaction, TransactionStore};
    use chrono::NaiveDate;

    fn tool(cap: usize) -> SearchTransactionsTool {
        let txs = (1..=30)
            .map(|d| Transaction {
                subject: "u1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 4, d).unwrap(),
                description: format!("Coffee #{d}"),
                category: "dining".to_string(),
                amount: 4.0,
            })
            .collect();
        SearchTransactionsTool::new(Arc::new(TransactionStore::new(txs)), cap)
    }

    #[tokio::test]
    async fn test_max_results_is_clamped() {
        let out = tool(5)
            .execute("u1", json!({ "query": "coffee", "max_results": 1000 }))
            .await
            .unwrap();
        assert_eq!(out["count"], 5);

        let out = tool(5)
            .execute("u1", json!({ "query": "coffee", "max_results": -3 }))
            .await
            .unwrap();
        assert_eq!(out["count"], 1);
    }

    #[tokio::test]
    async fn test_fractional_max_results_is_rounded() {
        let out = tool(5)
            .execute("u1", json!({ "query": "coffee", "max_results": 3.0 }))
            .await
            .unwrap();
        assert_eq!(out["count"], 3);

        let out = tool(5)
            .execute("u1", json!({ "query": "coffee", "max_results": 1.6 }))
            .await
            .unwrap();
        assert_eq!(out["count"], 2);
    }

    #[tokio::test]
    async fn test_bad_arguments_are_errors() {
        assert!(tool(5).execute("u1", json!({})).await.is_err());
        assert!(tool(5).execute("u1", json!({ "query": "  " })).await.is_err());
        assert!(tool(5).execute("u1", json!({ "query": 3 })).await.is_err());
    }

    #[test]
    fn test_schema_requires_query() {
        let schema = tool(5).parameters_schema();
        assert_eq!(schema["required"], json!(["query"]));
        assert!(schema["properties"]["max_results"].is_object());
    }
}
