//! 模型传输抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient::chat：输入完整消息列表与工具描述，
//! 返回一轮回复（内容项 + 结束信号）。线格式由各实现自行决定，核心循环只依赖这里的契约。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::{ContentItem, Message, ToolCallRequest};
use crate::tools::ToolDescriptor;

/// 传输层错误；核心循环不做重试，直接作为整次调用的中止原因上抛
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// 本轮结束原因
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFiltered,
    ToolCalls,
}

/// 模型的一轮回复
#[derive(Clone, Debug, PartialEq)]
pub struct ModelTurn {
    pub content: Vec<ContentItem>,
    pub finish: FinishReason,
}

impl ModelTurn {
    /// 纯文本回复
    pub fn text(text: impl Into<String>, finish: FinishReason) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            finish,
        }
    }

    /// 请求调用一个或多个工具
    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: calls.into_iter().map(ContentItem::ToolCall).collect(),
            finish: FinishReason::ToolCalls,
        }
    }

    pub fn requested_calls(&self) -> Vec<ToolCallRequest> {
        self.content
            .iter()
            .filter_map(|c| match c {
                ContentItem::ToolCall(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn into_message(self) -> Message {
        Message::assistant(self.content)
    }
}

/// 模型传输 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 发送完整对话与工具描述，取回一轮回复
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelTurn, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
