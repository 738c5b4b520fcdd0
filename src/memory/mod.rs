//! 记忆层：单次运行内的对话状态（不跨运行复用，不持久化）

pub mod conversation;

pub use conversation::{ContentItem, Conversation, Message, Role, ToolCallRequest, ToolOutcome};
