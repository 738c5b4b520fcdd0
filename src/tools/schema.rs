//! 工具参数 Schema 与解码（schemars 自动生成 Schema）
//!
//! 每个工具声明一个参数结构体：Schema 由 schemars 生成并导出给模型，
//! execute 时用同一结构体经 serde 解码，类型不符直接返回错误结果而不是 panic。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// 生成参数结构体的 JSON Schema（去掉 $schema / title 等模型不需要的元信息）
pub fn parameters_schema_for<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema)
        .unwrap_or_else(|_| json!({ "type": "object", "properties": {} }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

/// 按参数结构体解码模型给出的参数；null 视为空对象（全部取默认值）
pub fn decode_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| format!("invalid arguments for {tool}: {e}"))
}

/// 数值参数先四舍五入再钳制到 [lo, hi]；模型常把整数写成 3.0
pub fn clamp_rounded(value: f64, lo: i64, hi: i64) -> i64 {
    if value.is_nan() {
        return lo;
    }
    (value.round() as i64).clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Debug, Deserialize, JsonSchema)]
    struct Args {
        /// 查询文本
        query: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = parameters_schema_for::<Args>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["query"].is_object());
        assert!(schema.get("$schema").is_none());
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["query"]);
    }

    #[test]
    fn test_decode_mismatch_is_error() {
        let err = decode_args::<Args>("t", json!({ "query": 5 })).unwrap_err();
        assert!(err.contains("invalid arguments for t"));
        assert!(decode_args::<Args>("t", Value::Null).is_err());
        let ok: Args = decode_args("t", json!({ "query": "x" })).unwrap();
        assert_eq!(ok.query, "x");
    }

    #[test]
    fn test_clamp_rounded() {
        assert_eq!(clamp_rounded(3.0, 1, 10), 3);
        assert_eq!(clamp_rounded(2.6, 1, 10), 3);
        assert_eq!(clamp_rounded(-7.2, 1, 10), 1);
        assert_eq!(clamp_rounded(1e300, 1, 10), 10);
        assert_eq!(clamp_rounded(f64::NAN, 1, 10), 1);
    }
}
