//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），
//! 由 ToolRegistry 在构造期一次性注册（重名即报错），之后只读：按名解析、导出给模型的工具描述。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::AgentError;

/// 工具 trait：名称、描述（供 LLM 判断何时调用）、参数 schema、异步执行
///
/// execute 不得把失败抛出边界：任何错误都以 `Err(String)` 返回，由执行器写成错误结果。
/// 参数上限（如最大返回条数）由工具自己钳制，不信任模型给出的值。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（模型选择工具与分发时的关联键）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能与调用时机）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 以 subject_id 限定数据范围执行工具，返回可序列化的结果
    async fn execute(&self, subject_id: &str, args: Value) -> Result<Value, String>;
}

/// 导出给模型传输层的工具描述：模型对工具的全部认知
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，保留注册顺序用于稳定导出
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由完整工具列表构造；出现重名立即失败
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self, AgentError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register_arc(tool)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), AgentError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), AgentError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 按注册顺序导出 (name, description, schema)
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        async fn execute(&self, _subject_id: &str, _args: Value) -> Result<Value, String> {
            Ok(Value::String(self.0.to_string()))
        }
    }

    #[test]
    fn test_resolve_registered_and_unknown() {
        let registry =
            ToolRegistry::from_tools(vec![Arc::new(Named("a")), Arc::new(Named("b"))]).unwrap();
        for name in ["a", "b"] {
            assert_eq!(registry.resolve(name).unwrap().name(), name);
        }
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn test_duplicate_fails_at_construction() {
        let result = ToolRegistry::from_tools(vec![Arc::new(Named("a")), Arc::new(Named("a"))]);
        match result {
            Err(AgentError::DuplicateTool(name)) => assert_eq!(name, "a"),
            _ => panic!("Expected DuplicateTool"),
        }
    }

    #[test]
    fn test_descriptors_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("z")).unwrap();
        registry.register(Named("a")).unwrap();
        let names: Vec<String> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(registry.descriptors()[0].parameters["type"], "object");
    }
}
