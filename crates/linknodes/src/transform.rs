use async_trait::async_trait;
use linkcore::{Context, NodeError, Transformer, Value};

/// Parse a JSON document into `Value::Json`.
///
/// Accepts a string payload, or an object payload with a string `body`
/// field such as an HTTP response.
pub struct JsonParse;

#[async_trait]
impl<G: Send + Sync + 'static> Transformer<G> for JsonParse {
    async fn transform(&self, data: &Value, _ctx: &Context<G>) -> Result<Value, NodeError> {
        let input = match data {
            Value::String(text) => text.as_str(),
            Value::Object(fields) => fields
                .get("body")
                .and_then(Value::as_str)
                .ok_or_else(|| NodeError::MissingInput("body".to_string()))?,
            other => return Err(NodeError::invalid_type("json", "string", other.type_name())),
        };

        let parsed: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(Value::Json(parsed))
    }
}

/// Render a payload as pretty-printed JSON text
pub struct JsonStringify;

#[async_trait]
impl<G: Send + Sync + 'static> Transformer<G> for JsonStringify {
    async fn transform(&self, data: &Value, _ctx: &Context<G>) -> Result<Value, NodeError> {
        let json_str = serde_json::to_string_pretty(&data.to_plain_json())
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(Value::String(json_str))
    }
}

/// Extract one field of an object payload
pub struct Field {
    name: String,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl<G: Send + Sync + 'static> Transformer<G> for Field {
    async fn transform(&self, data: &Value, _ctx: &Context<G>) -> Result<Value, NodeError> {
        data.get(&self.name)
            .cloned()
            .ok_or_else(|| NodeError::MissingInput(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_parse_response_body() {
        let ctx = Arc::new(());
        let response = Value::object([("status", Value::from(200u16)), ("body", Value::from(r#"{"ok":true}"#))]);

        let parsed = Transformer::<()>::transform(&JsonParse, &response, &ctx).await;

        assert_eq!(parsed, Ok(Value::Json(json!({"ok": true}))));
    }

    #[tokio::test]
    async fn test_parse_rejects_invalid_json() {
        let ctx = Arc::new(());
        let result = Transformer::<()>::transform(&JsonParse, &Value::from("{oops"), &ctx).await;
        assert!(matches!(result, Err(NodeError::ExecutionFailed(msg)) if msg.starts_with("JSON parse error")));
    }

    #[tokio::test]
    async fn test_stringify_renders_plain_json() {
        let ctx = Arc::new(());
        let value = Value::object([("answer", 42.0)]);

        let rendered = Transformer::<()>::transform(&JsonStringify, &value, &ctx)
            .await
            .expect("stringify");

        let text = rendered.as_str().expect("string payload");
        assert_eq!(serde_json::from_str::<serde_json::Value>(text).expect("json"), json!({"answer": 42.0}));
    }

    #[tokio::test]
    async fn test_field_extracts_or_fails() {
        let ctx = Arc::new(());
        let value = Value::object([("status", 404.0)]);

        assert_eq!(
            Transformer::<()>::transform(&Field::new("status"), &value, &ctx).await,
            Ok(Value::Number(404.0))
        );
        assert_eq!(
            Transformer::<()>::transform(&Field::new("body"), &value, &ctx).await,
            Err(NodeError::MissingInput("body".to_string()))
        );
    }
}
