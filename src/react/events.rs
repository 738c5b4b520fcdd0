//! 运行过程事件：用于向前端 / 日志推送进度

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 即将发出第 iteration 次模型请求（从 1 开始）
    IterationStarted { iteration: usize, max_iterations: usize },
    ToolCall {
        call_id: String,
        tool: String,
        args: serde_json::Value,
    },
    ToolResult {
        call_id: String,
        tool: String,
        success: bool,
        duration_ms: u64,
    },
    /// 正常完成；count 为解析出的建议条数
    Completed { count: usize },
    Aborted { reason: String },
    Error { text: String },
}
