//! 工具执行器
//!
//! 持有只读 ToolRegistry、单次调用超时与并发调度器。一轮内的多个工具调用并行执行，
//! 结果按请求顺序返回并各自带上 call_id；找不到工具、工具返回 Err、超时、panic 都转为错误结果，
//! 不会向循环抛出。每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::time::timeout;

use crate::core::TaskScheduler;
use crate::memory::{ToolCallRequest, ToolOutcome};
use crate::tools::{ToolDescriptor, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并将所有失败映射为 ToolOutcome
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    scheduler: TaskScheduler,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry: Arc::new(registry),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            scheduler: TaskScheduler::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_scheduler(mut self, scheduler: TaskScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    /// 并行执行同一轮的全部调用，等待全部完成；返回顺序与 calls 一致
    pub async fn execute_all(&self, subject_id: &str, calls: &[ToolCallRequest]) -> Vec<ToolOutcome> {
        join_all(calls.iter().map(|call| self.execute(subject_id, call))).await
    }

    /// 执行单个调用；总是返回一个 ToolOutcome
    pub async fn execute(&self, subject_id: &str, call: &ToolCallRequest) -> ToolOutcome {
        let start = Instant::now();

        let Some(tool) = self.registry.resolve(&call.tool_name) else {
            let outcome = ToolOutcome::failure(call, format!("tool not found: {}", call.tool_name), 0);
            audit(call, &outcome, "not_found");
            return outcome;
        };

        let _permit = self.scheduler.acquire_tool().await;

        let subject = subject_id.to_string();
        let args = call.arguments.clone();
        let mut handle = tokio::spawn(async move { tool.execute(&subject, args).await });

        let result = timeout(self.timeout, &mut handle).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (outcome, label) = match result {
            Ok(Ok(Ok(payload))) => (ToolOutcome::success(call, payload, duration_ms), "ok"),
            Ok(Ok(Err(e))) => (ToolOutcome::failure(call, e, duration_ms), "error"),
            Ok(Err(join_err)) => (
                ToolOutcome::failure(call, format!("tool panicked: {join_err}"), duration_ms),
                "panic",
            ),
            Err(_) => {
                handle.abort();
                (
                    ToolOutcome::failure(
                        call,
                        format!("tool timed out after {}s", self.timeout.as_secs_f32()),
                        duration_ms,
                    ),
                    "timeout",
                )
            }
        };
        audit(call, &outcome, label);
        outcome
    }
}

fn audit(call: &ToolCallRequest, outcome: &ToolOutcome, label: &str) {
    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": call.tool_name,
        "call_id": call.call_id,
        "ok": outcome.success,
        "outcome": label,
        "duration_ms": outcome.duration_ms,
        "args_preview": args_preview(&call.arguments),
    });
    tracing::info!(audit = %audit.to_string(), "tool");
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Fixed;

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn description(&self) -> &str {
            "returns a fixed payload"
        }
        async fn execute(&self, subject_id: &str, _args: Value) -> Result<Value, String> {
            Ok(json!({ "subject": subject_id }))
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        async fn execute(&self, _subject_id: &str, _args: Value) -> Result<Value, String> {
            Err("backend unavailable".to_string())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Tool for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }
        fn description(&self) -> &str {
            "panics"
        }
        async fn execute(&self, _subject_id: &str, _args: Value) -> Result<Value, String> {
            panic!("boom")
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps"
        }
        async fn execute(&self, _subject_id: &str, _args: Value) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    fn call(id: &str, tool: &str) -> ToolCallRequest {
        ToolCallRequest {
            call_id: id.to_string(),
            tool_name: tool.to_string(),
            arguments: json!({}),
        }
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Fixed).unwrap();
        registry.register(Failing).unwrap();
        registry.register(Panicking).unwrap();
        registry.register(Slow).unwrap();
        ToolExecutor::new(registry, 30).with_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_every_call_gets_an_outcome_in_order() {
        let exec = executor();
        let calls = vec![
            call("1", "fixed"),
            call("2", "missing"),
            call("3", "failing"),
            call("4", "panicking"),
            call("5", "slow"),
        ];
        let outcomes = exec.execute_all("user-1", &calls).await;
        let ids: Vec<&str> = outcomes.iter().map(|o| o.call_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);

        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].payload["subject"], "user-1");

        for o in &outcomes[1..] {
            assert!(!o.success);
            assert!(!o.error.as_deref().unwrap_or("").is_empty());
        }
        assert!(outcomes[1].error.as_deref().unwrap().starts_with("tool not found"));
        assert_eq!(outcomes[2].error.as_deref(), Some("backend unavailable"));
        assert!(outcomes[3].error.as_deref().unwrap().contains("panicked"));
        assert!(outcomes[4].error.as_deref().unwrap().contains("timed out"));
    }
}
