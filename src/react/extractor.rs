//! 输出解析：把最后一轮助手文本解析为结构化建议
//!
//! 接受 ```json ... ``` 包裹或裸 JSON 对象，顶层需有 `recommendations` 数组。
//! 缺少必填字段的元素被丢弃；未知分类 / 优先级回退为默认值；结果数量有上限。
//! 任何解析失败都只记录日志并返回 Empty。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::memory::Message;
use crate::react::outcome::{AgentOutcome, Category, Priority, Recommendation};

pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence regex is valid")
    })
}

/// 去掉可选的代码块围栏，返回其中内容；没有围栏时返回去空白的原文
pub fn strip_code_fence(text: &str) -> &str {
    match fence_regex().captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

#[derive(Clone, Debug)]
pub struct OutputExtractor {
    max_items: usize,
}

impl Default for OutputExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECOMMENDATIONS)
    }
}

impl OutputExtractor {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items: max_items.max(1),
        }
    }

    /// 解析最后一轮助手消息；只看文本项
    pub fn extract(&self, final_turn: &Message) -> AgentOutcome {
        let Some(text) = final_turn.text() else {
            tracing::info!("final turn has no text content");
            return AgentOutcome::Empty;
        };
        match self.parse(&text) {
            Ok(items) if items.is_empty() => {
                tracing::info!("final turn parsed but held no usable recommendations");
                AgentOutcome::Empty
            }
            Ok(items) => AgentOutcome::Recommendations(items),
            Err(e) => {
                let preview: String = text.chars().take(200).collect();
                tracing::warn!(error = %e, preview = %preview, "malformed final output");
                AgentOutcome::Empty
            }
        }
    }

    /// 解析文本为建议列表；结构错误返回 Err，单个元素缺字段只丢弃该元素
    pub fn parse(&self, text: &str) -> Result<Vec<Recommendation>, String> {
        let body = strip_code_fence(text);
        let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
        let items = value
            .get("recommendations")
            .and_then(Value::as_array)
            .ok_or_else(|| "missing top-level `recommendations` array".to_string())?;

        let mut out: Vec<Recommendation> = items.iter().filter_map(parse_item).collect();
        if out.len() < items.len() {
            tracing::debug!(dropped = items.len() - out.len(), "dropped incomplete recommendations");
        }
        out.truncate(self.max_items);
        Ok(out)
    }
}

fn field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_item(item: &Value) -> Option<Recommendation> {
    Some(Recommendation {
        title: field(item, "title")?.to_string(),
        message: field(item, "message")?.to_string(),
        category: enum_field(item, "category")?
            .map(Category::parse_or_default)
            .unwrap_or_default(),
        priority: enum_field(item, "priority")?
            .map(Priority::parse_or_default)
            .unwrap_or_default(),
    })
}

/// 枚举字段：缺失或 null 返回 None（丢弃元素）；存在但不是字符串时返回 Some(None)（取默认值）
fn enum_field<'a>(item: &'a Value, key: &str) -> Option<Option<&'a str>> {
    match item.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_str()),
    }
}
