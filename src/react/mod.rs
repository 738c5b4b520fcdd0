//! 认知层：Agent 主循环、输出解析、Prompt、过程事件与结果类型

pub mod events;
pub mod extractor;
pub mod loop_;
pub mod outcome;
pub mod prompt;

pub use events::AgentEvent;
pub use extractor::{strip_code_fence, OutputExtractor, DEFAULT_MAX_RECOMMENDATIONS};
pub use loop_::{AgentLoop, AgentRun};
pub use outcome::{AbortReason, AgentOutcome, Category, Priority, Recommendation};
pub use prompt::Prompts;
