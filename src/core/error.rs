//! Agent 错误类型
//!
//! 工具级失败（找不到工具、执行失败、超时）不会出现在这里：它们在工具边界被转为错误结果写回对话。
//! 这里只保留会中止整次调用或在启动期暴露的错误。

use thiserror::Error;

use crate::llm::LlmError;

/// Agent 运行 / 组装过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型传输层失败：不重试，直接中止本次调用
    #[error("Model transport failed: {0}")]
    Transport(#[from] LlmError),

    #[error("Cancelled")]
    Cancelled,

    /// 注册表中出现重名工具（构造期错误）
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    Store(String),
}
