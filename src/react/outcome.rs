//! 运行结果类型：建议、分类 / 优先级枚举、终止原因

use serde::{Deserialize, Serialize};

/// 建议分类（固定枚举，未知值回退为 Insight）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Saving,
    Budget,
    Subscription,
    Spending,
    Income,
    #[default]
    Insight,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Saving,
        Category::Budget,
        Category::Subscription,
        Category::Spending,
        Category::Income,
        Category::Insight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Saving => "saving",
            Category::Budget => "budget",
            Category::Subscription => "subscription",
            Category::Spending => "spending",
            Category::Income => "income",
            Category::Insight => "insight",
        }
    }

    /// 大小写不敏感；无法识别时返回默认值
    pub fn parse_or_default(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

/// 建议优先级（未知值回退为 Medium）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse_or_default(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

/// 单条建议
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub message: String,
    pub category: Category,
    pub priority: Priority,
}

/// 非正常结束的原因（均为合法终止，不是错误）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    MaxIterations,
    LengthLimit,
    ContentFiltered,
}

/// 一次运行的最终结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum AgentOutcome {
    Recommendations(Vec<Recommendation>),
    /// 正常完成，但没有可用的建议
    Empty,
    Aborted(AbortReason),
}

impl AgentOutcome {
    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            AgentOutcome::Recommendations(r) => r,
            _ => &[],
        }
    }
}
