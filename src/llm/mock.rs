//! Mock 模型传输（用于测试与离线演示，无需 API）
//!
//! 按顺序回放预先排好的回复，并记录每次请求看到的消息与工具描述；
//! 脚本耗尽后若设置了 fallback 则一直返回它，否则返回 InvalidResponse。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, ModelTurn};
use crate::memory::Message;
use crate::tools::ToolDescriptor;

/// 一次请求的快照
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

#[derive(Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<ModelTurn, LlmError>>>,
    fallback: Option<ModelTurn>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次回放给定回复
    pub fn scripted(turns: Vec<ModelTurn>) -> Self {
        Self {
            script: Mutex::new(turns.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// 追加一条传输层错误
    pub fn then_error(self, err: LlmError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err));
        }
        self
    }

    /// 脚本耗尽后始终返回该回复
    pub fn with_fallback(mut self, turn: ModelTurn) -> Self {
        self.fallback = Some(turn);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelTurn, LlmError> {
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(RecordedRequest {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(turn) => turn,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::InvalidResponse("mock script exhausted".to_string())),
        }
    }
}
