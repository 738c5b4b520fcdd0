//! Headless Agent 组装
//!
//! 从 AppConfig 构建模型传输、交易存储、工具注册表与执行器，得到可重复调用的 AgentLoop。
//! 数据能力（检索 / 汇总）由调用方注入；命令行入口使用 JSON 文件存储。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, TaskScheduler};
use crate::llm::{create_deepseek_client, FinishReason, LlmClient, MockLlmClient, ModelTurn, OpenAiClient};
use crate::react::{AgentLoop, OutputExtractor, Prompts};
use crate::store::{CategoryAggregator, TransactionSearch, TransactionStore};
use crate::tools::{SearchTransactionsTool, SpendingByCategoryTool, Tool, ToolExecutor, ToolRegistry};

/// 按 provider 与可用 API Key 选择模型传输；都不可用时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();

    let client = match provider.as_str() {
        "deepseek" if has_deepseek_key || has_openai_key => {
            tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
            create_deepseek_client(Some(&cfg.llm.model))
        }
        "openai" if has_openai_key => {
            tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
            OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            )
        }
        _ => {
            tracing::warn!(provider = %provider, "No API key set or provider is mock, using Mock LLM");
            return Arc::new(MockLlmClient::new().with_fallback(ModelTurn::text(
                r#"{"recommendations": []}"#,
                FinishReason::Stop,
            )));
        }
    };

    Arc::new(
        client
            .with_temperature(cfg.llm.temperature)
            .with_request_timeout(cfg.llm.timeouts.request),
    )
}

/// 以构造期列表建立注册表（重名即失败）
pub fn build_registry(
    cfg: &AppConfig,
    search: Arc<dyn TransactionSearch>,
    aggregator: Arc<dyn CategoryAggregator>,
) -> Result<ToolRegistry, AgentError> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(SpendingByCategoryTool::new(
            aggregator,
            cfg.tools.aggregate.max_categories,
        )),
        Arc::new(SearchTransactionsTool::new(search, cfg.tools.search.max_results)),
    ];
    ToolRegistry::from_tools(tools)
}

/// 组装 AgentLoop
pub fn create_agent(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    registry: ToolRegistry,
) -> AgentLoop {
    let executor = ToolExecutor::new(registry, cfg.tools.tool_timeout_secs)
        .with_scheduler(TaskScheduler::new(cfg.tools.max_concurrent_tools));
    let prompts = Prompts::from_dir(
        cfg.agent.prompts_dir.as_deref(),
        cfg.agent.max_recommendations,
    );
    AgentLoop::new(llm, executor, prompts)
        .with_extractor(OutputExtractor::new(cfg.agent.max_recommendations))
}

/// 完整按配置组装：模型传输 + JSON 文件交易存储 + 两个内置工具
pub fn create_agent_from_config(cfg: &AppConfig) -> Result<AgentLoop, AgentError> {
    let path = cfg
        .store
        .path
        .as_ref()
        .ok_or_else(|| AgentError::ConfigError("store.path is not set".to_string()))?;
    let store = Arc::new(TransactionStore::from_json_file(path)?);
    let registry = build_registry(cfg, store.clone(), store)?;
    Ok(create_agent(cfg, create_llm_from_config(cfg), registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_both_tools() {
        let store = Arc::new(TransactionStore::default());
        let registry = build_registry(&AppConfig::default(), store.clone(), store).unwrap();
        assert_eq!(
            registry.tool_names(),
            vec!["spending_by_category".to_string(), "search_transactions".to_string()]
        );
    }

    #[test]
    fn test_missing_store_path_is_config_error() {
        let err = create_agent_from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, AgentError::ConfigError(_)));
    }
}
