//! 对话状态：一次分析运行内的有序消息历史
//!
//! 只追加、不剪枝、不修改已有消息；每个工具调用请求都必须在下一轮模型请求之前得到一条
//! 以 call_id 关联的 tool 结果消息。运行结束后整体丢弃，不做持久化。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（与 chat-completion 接口一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 模型发出的工具调用请求；call_id 由模型传输层生成，这里只负责透传
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    /// 原始参数（未按 schema 解码）
    pub arguments: Value,
}

/// 单次工具执行结果：无论工具是否存在、是否失败，都会产生一条
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub call_id: String,
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ToolOutcome {
    pub fn success(call: &ToolCallRequest, payload: Value, duration_ms: u64) -> Self {
        Self {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            success: true,
            payload,
            error: None,
            duration_ms,
        }
    }

    pub fn failure(call: &ToolCallRequest, error: impl Into<String>, duration_ms: u64) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "tool execution failed".to_string();
        }
        Self {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            success: false,
            payload: Value::Null,
            error: Some(error),
            duration_ms,
        }
    }

    /// 发给模型的结果正文：`{"success": true, "data": ...}` 或 `{"success": false, "error": "..."}`
    pub fn to_model_content(&self) -> String {
        let body = if self.success {
            serde_json::json!({ "success": true, "data": self.payload })
        } else {
            serde_json::json!({ "success": false, "error": self.error })
        };
        body.to_string()
    }
}

/// 消息内容项：文本、工具调用请求或工具调用结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    ToolCall(ToolCallRequest),
    ToolResult(ToolOutcome),
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentItem>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentItem::text(text)],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentItem::text(text)],
        }
    }

    pub fn assistant(content: Vec<ContentItem>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool_result(outcome: ToolOutcome) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentItem::ToolResult(outcome)],
        }
    }

    /// 拼接所有文本项（忽略工具调用 / 结果）；无文本时返回 None
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|c| match c {
                ContentItem::Text { text } if !text.trim().is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    pub fn tool_calls(&self) -> Vec<&ToolCallRequest> {
        self.content
            .iter()
            .filter_map(|c| match c {
                ContentItem::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn tool_outcome(&self) -> Option<&ToolOutcome> {
        self.content.iter().find_map(|c| match c {
            ContentItem::ToolResult(outcome) => Some(outcome),
            _ => None,
        })
    }
}

/// 对话状态：消息历史 + 终止判定所需的计数
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    iterations: usize,
}

impl Conversation {
    /// 以 system 指令与任务提示开启一次新的对话
    pub fn seeded(system: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(task)],
            iterations: 0,
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 已发出的模型请求数
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub(crate) fn record_iteration(&mut self) {
        self.iterations += 1;
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// 尚未得到结果消息的工具调用 id（正常情况下在请求下一轮之前应为空）
    pub fn unanswered_calls(&self) -> Vec<&str> {
        let answered: Vec<&str> = self
            .messages
            .iter()
            .filter_map(|m| m.tool_outcome())
            .map(|o| o.call_id.as_str())
            .collect();
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.tool_calls())
            .map(|c| c.call_id.as_str())
            .filter(|id| !answered.contains(id))
            .collect()
    }
}
