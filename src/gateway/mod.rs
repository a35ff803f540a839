/// In-memory gateway used by tests and demos.
pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// Session credential forwarded with every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential(pub String);

impl Credential {
    /// Wraps a bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token.
    pub fn token(&self) -> &str {
        &self.0
    }
}

/// HTTP verb of a gateway request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Update.
    Put,
    /// Delete.
    Delete,
}

/// Request handed to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl GatewayRequest {
    /// GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Replaces the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// First query value for `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and JSON body returned verbatim by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// HTTP status.
    pub status: u16,
    /// Decoded JSON body.
    pub body: Value,
}

impl GatewayResponse {
    /// Response with `status` and `body`.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status is 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// The `error` string of an `{error: string}` payload.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Result of a gateway call.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Authenticated request boundary in front of the backend.
///
/// Calls block; the runtime runs them on the blocking pool. Requests without
/// a valid credential come back as status 401.
pub trait Gateway: Send + Sync + 'static {
    /// Sends `request` with `credential` and waits for the answer.
    fn request(&self, request: &GatewayRequest, credential: Option<&Credential>) -> GatewayResult<GatewayResponse>;
}
