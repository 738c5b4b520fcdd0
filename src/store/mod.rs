//! 数据能力：工具访问用户交易数据的接口
//!
//! 语义检索与分类汇总对核心循环是不透明的能力提供者，由调用方在构造工具时注入。
//! TransactionStore 是进程内实现（JSON 文件 / 内存），用于命令行与测试。

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;

pub use memory::TransactionStore;

/// 单笔交易
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub subject: String,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    /// 支出为正数
    pub amount: f64,
}

/// 检索命中
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransactionMatch {
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub score: f32,
}

/// 某分类在时间窗口内的汇总
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: usize,
}

/// 按文本检索某用户的交易
#[async_trait]
pub trait TransactionSearch: Send + Sync {
    async fn search(
        &self,
        subject_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TransactionMatch>, AgentError>;
}

/// 按分类汇总某用户自 since（含）以来的支出，按金额降序
#[async_trait]
pub trait CategoryAggregator: Send + Sync {
    async fn totals_by_category(
        &self,
        subject_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<CategoryTotal>, AgentError>;
}
