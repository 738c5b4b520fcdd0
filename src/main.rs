//! advisor - 消费洞察智能体
//!
//! 入口：初始化日志、加载配置、组装 Agent，对单个用户运行一次并以 JSON 输出结果。
//!
//! 用法：`advisor <subject_id> [max_iterations]`

use anyhow::Context;
use advisor::{agent::create_agent_from_config, config::load_config, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let mut args = std::env::args().skip(1);
    let subject_id = args
        .next()
        .context("usage: advisor <subject_id> [max_iterations]")?;

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config load failed, using defaults");
        Default::default()
    });
    let max_iterations = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid max_iterations: {raw}"))?,
        None => cfg.agent.max_iterations,
    };

    let agent = create_agent_from_config(&cfg).context("Failed to create agent")?;
    let outcome = agent
        .run(&subject_id, max_iterations)
        .await
        .context("Agent run failed")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
