//! Agent 主循环（工具调用状态机）
//!
//! Requesting -> (有工具调用) ToolCallsPending -> 执行并写回结果 -> Requesting
//!            -> (无工具调用) 按 finish 信号进入 Completed / LengthAborted / ContentFilterAborted
//! 请求次数达到 max_iterations 仍未终止时进入 MaxIterationsAborted。
//! 传输层失败不重试，直接以 AgentError::Transport 中止本次调用。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::AgentError;
use crate::llm::{FinishReason, LlmClient};
use crate::memory::{Conversation, Message, ToolCallRequest};
use crate::react::{AbortReason, AgentEvent, AgentOutcome, OutputExtractor, Prompts};
use crate::tools::ToolExecutor;

/// 循环状态
#[derive(Debug)]
enum LoopState {
    Requesting,
    ToolCallsPending(Vec<ToolCallRequest>),
    Completed,
    LengthAborted,
    ContentFilterAborted,
    MaxIterationsAborted,
}

/// 一次运行的完整记录；conversation 仅供调用方检查，随后丢弃
#[derive(Debug)]
pub struct AgentRun {
    pub run_id: Uuid,
    pub outcome: AgentOutcome,
    /// 实际发出的模型请求数
    pub iterations: usize,
    pub conversation: Conversation,
}

/// Agent 循环：持有模型传输、工具执行器、prompt 与输出解析器；可被多次、并发调用
pub struct AgentLoop {
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    prompts: Prompts,
    extractor: OutputExtractor,
    event_tx: Option<UnboundedSender<AgentEvent>>,
}

impl AgentLoop {
    pub fn new(llm: Arc<dyn LlmClient>, executor: ToolExecutor, prompts: Prompts) -> Self {
        Self {
            llm,
            executor,
            prompts,
            extractor: OutputExtractor::default(),
            event_tx: None,
        }
    }

    pub fn with_extractor(mut self, extractor: OutputExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// 入口：分析 subject_id，最多发出 max_iterations 次模型请求
    pub async fn run(&self, subject_id: &str, max_iterations: usize) -> Result<AgentOutcome, AgentError> {
        Ok(self.run_session(subject_id, max_iterations).await?.outcome)
    }

    /// 与 run 相同，但返回包含对话与请求次数的完整记录
    pub async fn run_session(&self, subject_id: &str, max_iterations: usize) -> Result<AgentRun, AgentError> {
        self.run_with_cancel(subject_id, max_iterations, CancellationToken::new())
            .await
    }

    /// 可取消的运行：每次模型请求前及等待模型期间检查取消；已开始的工具批次会等到全部完成
    pub async fn run_with_cancel(
        &self,
        subject_id: &str,
        max_iterations: usize,
        cancel_token: CancellationToken,
    ) -> Result<AgentRun, AgentError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("agent_run", %run_id, subject = %subject_id);
        self.drive(run_id, subject_id, max_iterations, cancel_token)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        run_id: Uuid,
        subject_id: &str,
        max_iterations: usize,
        cancel_token: CancellationToken,
    ) -> Result<AgentRun, AgentError> {
        let mut conversation =
            Conversation::seeded(self.prompts.system(), self.prompts.task(subject_id));
        let tools = self.executor.descriptors();
        let mut state = LoopState::Requesting;

        let outcome = loop {
            state = match state {
                LoopState::Requesting => {
                    if conversation.iterations() >= max_iterations {
                        LoopState::MaxIterationsAborted
                    } else {
                        self.request_turn(&mut conversation, &tools, max_iterations, &cancel_token)
                            .await?
                    }
                }
                LoopState::ToolCallsPending(calls) => {
                    self.execute_calls(&mut conversation, subject_id, calls).await;
                    LoopState::Requesting
                }
                LoopState::Completed => {
                    let outcome = conversation
                        .last_assistant()
                        .map(|m| self.extractor.extract(m))
                        .unwrap_or(AgentOutcome::Empty);
                    let count = outcome.recommendations().len();
                    if count == 0 {
                        tracing::info!("completed without recommendations");
                    } else {
                        tracing::info!(count, "completed with recommendations");
                    }
                    self.send_event(AgentEvent::Completed { count });
                    break outcome;
                }
                LoopState::LengthAborted => break self.abort(AbortReason::LengthLimit),
                LoopState::ContentFilterAborted => break self.abort(AbortReason::ContentFiltered),
                LoopState::MaxIterationsAborted => break self.abort(AbortReason::MaxIterations),
            };
        };

        Ok(AgentRun {
            run_id,
            outcome,
            iterations: conversation.iterations(),
            conversation,
        })
    }

    /// 发出一次模型请求并把回复追加到对话，返回下一个状态
    async fn request_turn(
        &self,
        conversation: &mut Conversation,
        tools: &[crate::tools::ToolDescriptor],
        max_iterations: usize,
        cancel_token: &CancellationToken,
    ) -> Result<LoopState, AgentError> {
        if cancel_token.is_cancelled() {
            self.send_event(AgentEvent::Error { text: "Cancelled".to_string() });
            return Err(AgentError::Cancelled);
        }

        conversation.record_iteration();
        let iteration = conversation.iterations();
        self.send_event(AgentEvent::IterationStarted { iteration, max_iterations });
        tracing::debug!(iteration, max_iterations, "requesting model turn");

        let turn = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                self.send_event(AgentEvent::Error { text: "Cancelled".to_string() });
                return Err(AgentError::Cancelled);
            }
            result = self.llm.chat(conversation.messages(), tools) => result,
        };
        let turn = match turn {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(iteration, error = %e, "model transport failed, aborting run");
                self.send_event(AgentEvent::Error { text: e.to_string() });
                return Err(AgentError::Transport(e));
            }
        };

        let calls = turn.requested_calls();
        let finish = turn.finish;
        conversation.push(turn.into_message());

        // 只要有工具调用就先执行，不看 finish 信号
        if !calls.is_empty() {
            return Ok(LoopState::ToolCallsPending(calls));
        }
        Ok(match finish {
            FinishReason::Stop | FinishReason::ToolCalls => LoopState::Completed,
            FinishReason::Length => LoopState::LengthAborted,
            FinishReason::ContentFiltered => LoopState::ContentFilterAborted,
        })
    }

    /// 执行本轮全部工具调用，按请求顺序逐条写回结果消息
    async fn execute_calls(
        &self,
        conversation: &mut Conversation,
        subject_id: &str,
        calls: Vec<ToolCallRequest>,
    ) {
        for call in &calls {
            self.send_event(AgentEvent::ToolCall {
                call_id: call.call_id.clone(),
                tool: call.tool_name.clone(),
                args: call.arguments.clone(),
            });
        }
        let outcomes = self.executor.execute_all(subject_id, &calls).await;
        for outcome in outcomes {
            if !outcome.success {
                tracing::info!(
                    tool = %outcome.tool_name,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "tool call failed, continuing"
                );
            }
            self.send_event(AgentEvent::ToolResult {
                call_id: outcome.call_id.clone(),
                tool: outcome.tool_name.clone(),
                success: outcome.success,
                duration_ms: outcome.duration_ms,
            });
            conversation.push(Message::tool_result(outcome));
        }
    }

    fn abort(&self, reason: AbortReason) -> AgentOutcome {
        tracing::warn!(?reason, "run aborted");
        self.send_event(AgentEvent::Aborted {
            reason: format!("{:?}", reason),
        });
        AgentOutcome::Aborted(reason)
    }

    fn send_event(&self, ev: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }
}
