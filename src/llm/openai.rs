//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 DeepSeek、OpenAI、自建代理等。
//! 请求与响应走 byot（自定义类型），消息 / 工具调用 / finish_reason 的映射全部在本文件内完成。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::Client;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{FinishReason, LlmClient, LlmError, ModelTurn};
use crate::memory::{ContentItem, Message, Role, ToolCallRequest};
use crate::tools::ToolDescriptor;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// OpenAI 兼容客户端：持有 Client、model 名与请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    request_timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new()
                .with_api_base(url)
                .with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: None,
            request_timeout: Duration::from_secs(60),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs.max(1));
        self
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDescriptor]) -> Value {
        let mut request = json!({
            "model": self.model,
            "messages": messages.iter().flat_map(to_wire_messages).collect::<Vec<_>>(),
        });
        if !tools.is_empty() {
            request["tools"] = Value::Array(tools.iter().map(to_wire_tool).collect());
        }
        if let Some(t) = self.temperature {
            request["temperature"] = json!(t);
        }
        request
    }
}

/// 解析失败时保留的原始参数串原样回传，其余序列化为 JSON 文本
fn wire_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// 将内部消息映射为 chat-completion 消息；一条 tool 消息可能携带多个结果，按结果拆分
fn to_wire_messages(msg: &Message) -> Vec<Value> {
    match msg.role {
        Role::System => vec![json!({ "role": "system", "content": msg.text().unwrap_or_default() })],
        Role::User => vec![json!({ "role": "user", "content": msg.text().unwrap_or_default() })],
        Role::Assistant => {
            let calls: Vec<Value> = msg
                .tool_calls()
                .into_iter()
                .map(|c| {
                    json!({
                        "id": c.call_id,
                        "type": "function",
                        "function": { "name": c.tool_name, "arguments": wire_arguments(&c.arguments) },
                    })
                })
                .collect();
            let mut wire = json!({ "role": "assistant", "content": msg.text() });
            if !calls.is_empty() {
                wire["tool_calls"] = Value::Array(calls);
            }
            vec![wire]
        }
        Role::Tool => msg
            .content
            .iter()
            .filter_map(|c| match c {
                ContentItem::ToolResult(o) => Some(json!({
                    "role": "tool",
                    "tool_call_id": o.call_id,
                    "content": o.to_model_content(),
                })),
                _ => None,
            })
            .collect(),
    }
}

fn to_wire_tool(tool: &ToolDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        },
    })
}

/// 未知的 finish_reason 按 stop 处理
fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFiltered,
        Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

fn into_turn(response: ChatResponse) -> Result<ModelTurn, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("no choices".to_string()))?;

    let mut content = Vec::new();
    if let Some(text) = choice.message.content.filter(|t| !t.trim().is_empty()) {
        content.push(ContentItem::text(text));
    }
    for call in choice.message.tool_calls.unwrap_or_default() {
        // 参数不是合法 JSON 时原样保留为字符串，由工具的 schema 解码步骤报错
        let arguments = serde_json::from_str(&call.function.arguments)
            .unwrap_or(Value::String(call.function.arguments));
        content.push(ContentItem::ToolCall(ToolCallRequest {
            call_id: call.id,
            tool_name: call.function.name,
            arguments,
        }));
    }

    Ok(ModelTurn {
        content,
        finish: parse_finish_reason(choice.finish_reason.as_deref()),
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelTurn, LlmError> {
        let request = self.build_request(messages, tools);
        tracing::debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "chat request");

        let response: ChatResponse =
            tokio::time::timeout(self.request_timeout, self.client.chat().create_byot(request))
                .await
                .map_err(|_| LlmError::Timeout)?
                .map_err(|e| LlmError::Request(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage.add(usage.prompt_tokens, usage.completion_tokens);
        }

        into_turn(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ToolOutcome;

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(parse_finish_reason(Some("stop")), FinishReason::Stop);
        assert_eq!(parse_finish_reason(Some("length")), FinishReason::Length);
        assert_eq!(parse_finish_reason(Some("content_filter")), FinishReason::ContentFiltered);
        assert_eq!(parse_finish_reason(Some("tool_calls")), FinishReason::ToolCalls);
        assert_eq!(parse_finish_reason(Some("weird")), FinishReason::Stop);
        assert_eq!(parse_finish_reason(None), FinishReason::Stop);
    }

    #[test]
    fn test_response_with_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        { "id": "call_1", "type": "function",
                          "function": { "name": "search_transactions", "arguments": "{\"query\":\"coffee\"}" } },
                        { "id": "call_2", "type": "function",
                          "function": { "name": "spending_by_category", "arguments": "not json" } }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let turn = into_turn(serde_json::from_value(raw).unwrap()).unwrap();
        assert_eq!(turn.finish, FinishReason::ToolCalls);
        let calls = turn.requested_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments["query"], "coffee");
        assert_eq!(calls[1].arguments, Value::String("not json".to_string()));
    }

    #[test]
    fn test_empty_choices_is_invalid() {
        let raw = json!({ "choices": [] });
        let err = into_turn(serde_json::from_value(raw).unwrap()).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_tool_message_wire_shape() {
        let call = ToolCallRequest {
            call_id: "call_9".to_string(),
            tool_name: "x".to_string(),
            arguments: json!({}),
        };
        let msg = Message::tool_result(ToolOutcome::failure(&call, "tool not found", 0));
        let wire = to_wire_messages(&msg);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0]["role"], "tool");
        assert_eq!(wire[0]["tool_call_id"], "call_9");

        let asst = Message::assistant(vec![ContentItem::ToolCall(call)]);
        let wire = to_wire_messages(&asst);
        assert_eq!(wire[0]["tool_calls"][0]["id"], "call_9");
        assert!(wire[0]["content"].is_null());
    }

    #[test]
    fn test_unparsed_arguments_are_resent_verbatim() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        { "id": "call_1", "type": "function",
                          "function": { "name": "search_transactions", "arguments": "{\"query\":\"coffee\"}" } },
                        { "id": "call_2", "type": "function",
                          "function": { "name": "spending_by_category", "arguments": "not json" } }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let turn = into_turn(serde_json::from_value(raw).unwrap()).unwrap();
        let wire = to_wire_messages(&turn.into_message());
        let calls = wire[0]["tool_calls"].as_array().unwrap();
        assert_eq!(calls[1]["function"]["arguments"], "not json");
        let resent: Value =
            serde_json::from_str(calls[0]["function"]["arguments"].as_str().unwrap()).unwrap();
        assert_eq!(resent, json!({ "query": "coffee" }));
    }
}
