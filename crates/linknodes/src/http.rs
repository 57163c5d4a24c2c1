use async_trait::async_trait;
use linkcore::{Chain, ChainNode, Condition, Context, NodeArgs, NodeError, Resolve, Transitions, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Outbound call extracted from a node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Read `url` and the optional `method`, `headers` and `body` fields of
    /// an object payload. A bare string payload is a GET of that URL.
    pub fn from_value(value: &Value) -> Result<Self, NodeError> {
        if let Some(url) = value.as_str() {
            return Ok(Self::get(url));
        }

        let fields = value
            .as_object()
            .ok_or_else(|| NodeError::invalid_type("request", "object", value.type_name()))?;

        let url = fields
            .get("url")
            .ok_or_else(|| NodeError::MissingInput("url".to_string()))?;
        let url = url
            .as_str()
            .ok_or_else(|| NodeError::invalid_type("url", "string", url.type_name()))?;

        let method = match fields.get("method") {
            None | Some(Value::Null) => "GET".to_string(),
            Some(Value::String(m)) => m.to_uppercase(),
            Some(other) => return Err(NodeError::invalid_type("method", "string", other.type_name())),
        };

        let mut headers = HashMap::new();
        match fields.get("headers") {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    if let Some(val_str) = value.as_str() {
                        headers.insert(key.clone(), val_str.to_string());
                    }
                }
            }
            Some(other) => return Err(NodeError::invalid_type("headers", "object", other.type_name())),
        }

        let body = fields.get("body").filter(|b| !b.is_null()).cloned();

        Ok(Self {
            url: url.to_string(),
            method,
            headers,
            body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Object payload `{status, headers, body}` handed to transitions.
    pub fn into_value(self) -> Value {
        let headers: HashMap<String, Value> = self
            .headers
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Value::object([
            ("status", Value::from(self.status)),
            ("headers", Value::Object(headers)),
            ("body", Value::String(self.body)),
        ])
    }
}

/// The network call capability used by [`HttpResolver`]
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, NodeError>;
}

/// [`Fetch`] backed by a shared `reqwest` client
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, NodeError> {
        let HttpRequest {
            url,
            method,
            headers,
            body,
        } = request;

        let mut builder = match method.as_str() {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            "PATCH" => self.client.patch(&url),
            "DELETE" => self.client.delete(&url),
            "HEAD" => self.client.head(&url),
            _ => return Err(NodeError::Configuration(format!("Unsupported method: {}", method))),
        };

        for (key, value) in &headers {
            builder = builder.header(key, value);
        }

        builder = match body {
            None => builder,
            Some(Value::String(text)) => builder.body(text),
            Some(Value::Bytes(bytes)) => builder.body(bytes),
            Some(Value::Json(json)) => builder.json(&json),
            Some(other) => builder.json(&other.to_plain_json()),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| NodeError::RequestFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| NodeError::RequestFailed(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Terminal resolution: perform the request described by the payload and
/// continue through the node's transitions with the response.
///
/// Any failure is reported and stops this node's resolution.
pub struct HttpResolver<F = ReqwestFetch> {
    fetch: F,
}

impl<F: Fetch> HttpResolver<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<G, F> Resolve<G> for HttpResolver<F>
where
    G: Send + Sync + 'static,
    F: Fetch,
{
    async fn resolve(&self, chain: &Chain<G>, transitions: &Transitions<G>, data: Value) {
        let request = match HttpRequest::from_value(&data) {
            Ok(request) => request,
            Err(err) => {
                chain.report(err).await;
                return;
            }
        };

        tracing::info!("{} {}", request.method, request.url);
        match self.fetch.fetch(request).await {
            Ok(response) => {
                tracing::info!("Response status: {}", response.status);
                transitions.resolve(chain, response.into_value()).await;
            }
            Err(err) => chain.report(err).await,
        }
    }
}

/// Builds nodes resolving through [`HttpResolver`]
pub struct HttpNode;

impl HttpNode {
    pub fn new<G: Send + Sync + 'static>(chain: &Chain<G>, args: NodeArgs<G>) -> Arc<ChainNode<G>> {
        Self::with_fetch(chain, args, ReqwestFetch::new())
    }

    pub fn with_fetch<G, F>(chain: &Chain<G>, args: NodeArgs<G>, fetch: F) -> Arc<ChainNode<G>>
    where
        G: Send + Sync + 'static,
        F: Fetch + 'static,
    {
        ChainNode::new(chain, args.with_resolver(HttpResolver::new(fetch)))
    }
}

/// Guard satisfied by response payloads with a 2xx status
pub struct SuccessStatus;

#[async_trait]
impl<G: Send + Sync + 'static> Condition<G> for SuccessStatus {
    async fn check(&self, data: &Value, _ctx: &Context<G>) -> Result<bool, NodeError> {
        let status = data
            .get("status")
            .and_then(Value::as_f64)
            .ok_or_else(|| NodeError::MissingInput("status".to_string()))?;
        Ok((200.0..300.0).contains(&status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_object_payload() {
        let payload = Value::object([
            ("url", Value::from("https://example.test/items")),
            ("method", Value::from("post")),
            ("headers", Value::object([("accept", "application/json")])),
            ("body", Value::from(serde_json::json!({"name": "widget"}))),
        ]);

        let request = HttpRequest::from_value(&payload).expect("valid request");

        assert_eq!(request.url, "https://example.test/items");
        assert_eq!(request.method, "POST");
        assert_eq!(request.headers.get("accept").map(String::as_str), Some("application/json"));
        assert!(request.body.is_some());
    }

    #[test]
    fn test_string_payload_is_a_get() {
        let request = HttpRequest::from_value(&Value::from("https://example.test")).expect("valid request");
        assert_eq!(request, HttpRequest::get("https://example.test"));
    }

    #[test]
    fn test_request_requires_url() {
        let payload = Value::object([("method", "GET")]);
        assert_eq!(
            HttpRequest::from_value(&payload),
            Err(NodeError::MissingInput("url".to_string()))
        );

        let payload = Value::object([("url", Value::from(3.0))]);
        assert!(matches!(
            HttpRequest::from_value(&payload),
            Err(NodeError::InvalidInputType { .. })
        ));
    }

    #[test]
    fn test_response_payload_shape() {
        let response = HttpResponse {
            status: 204,
            headers: HashMap::from([("x-trace".to_string(), "abc".to_string())]),
            body: String::new(),
        };
        assert!(response.is_success());

        let value = response.into_value();
        assert_eq!(value.get("status"), Some(&Value::Number(204.0)));
        assert_eq!(
            value.get("headers").and_then(|h| h.get("x-trace")),
            Some(&Value::from("abc"))
        );
    }
}
