//! advisor - Rust 消费洞察智能体
//!
//! 模块划分：
//! - **agent**: 按配置组装模型传输、工具与 Agent 循环
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、工具并发调度
//! - **llm**: 模型传输抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 单次运行内的对话状态
//! - **observability**: 日志初始化
//! - **react**: Agent 主循环、输出解析、Prompt、结果类型
//! - **store**: 交易数据能力（检索 / 分类汇总）与进程内实现
//! - **tools**: 工具 trait、注册表、执行器与内置工具

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod store;
pub mod tools;

pub use react::{AgentLoop, AgentOutcome, AgentRun};
