//! 核心层：错误类型与工具并发调度

pub mod error;
pub mod task_scheduler;

pub use error::AgentError;
pub use task_scheduler::TaskScheduler;
