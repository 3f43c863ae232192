//! Request and response shapes for the API client.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the response body should be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Parse as JSON only when the content-type header indicates a JSON
    /// media type.
    #[default]
    Auto,
    /// Always attempt a JSON parse.
    Json,
    /// Never parse; keep the raw text.
    Text,
}

/// A request body, as supplied by the caller.
///
/// Strings and raw bytes are passed through unchanged; anything else is
/// supplied as a JSON value and serialized.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// A JSON value, serialized before sending.
    Json(Value),
    /// A string, sent as-is.
    Text(String),
    /// Raw bytes, sent as-is.
    Bytes(Vec<u8>),
}

impl RequestBody {
    /// Serializes the body for the wire.
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

/// One API request, immutable per call.
///
/// Build with [`RequestSpec::get`]/[`RequestSpec::post`] and the
/// `with_*` setters:
///
/// ```rust
/// use jobsweep::client::RequestSpec;
/// use serde_json::json;
///
/// let spec = RequestSpec::get("job_definitions")
///     .with_query("limit", json!(100))
///     .with_query("cursor", json!("abc"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Path relative to the base endpoint. An absolute URL is accepted
    /// only when it stays inside the configured base endpoint.
    pub path: String,
    /// HTTP method.
    pub method: Method,
    /// Query parameters in insertion order. `null` values are dropped;
    /// array values expand to repeated parameters.
    pub query: Vec<(String, Value)>,
    /// Request body. Ignored for GET and HEAD.
    pub body: Option<RequestBody>,
    /// Per-call headers, merged over the client's base set (later wins).
    pub headers: Vec<(String, String)>,
    /// Per-call timeout override.
    pub timeout: Option<Duration>,
    /// Response body classification.
    pub response_mode: ResponseMode,
    /// External cancellation tokens combined with the timeout.
    pub cancel: Vec<CancellationToken>,
}

impl RequestSpec {
    /// Creates a request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            timeout: None,
            response_mode: ResponseMode::default(),
            cancel: Vec::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Appends one query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.push((key.into(), value));
        self
    }

    /// Appends a sequence of query parameters.
    pub fn with_query_pairs<I, K>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a JSON body.
    pub fn with_json_body(self, value: Value) -> Self {
        self.with_body(RequestBody::Json(value))
    }

    /// Appends one per-call header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the client's default timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the response classification mode.
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    /// Adds an external cancellation token.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel.push(token);
        self
    }
}

/// Context of an issued request, kept on every [`ApiError`] for
/// diagnosis.
///
/// [`ApiError`]: crate::core::error::ApiError
#[derive(Debug, Clone, Serialize)]
pub struct RequestContext {
    /// HTTP method.
    pub method: String,
    /// Fully resolved URL.
    pub url: String,
    /// Effective timeout in milliseconds.
    pub timeout_ms: u64,
}

/// The classified result of a successful request.
///
/// At most one of [`data`](Self::data) and [`raw_text`](Self::raw_text)
/// is populated; both are `None` only when the body was empty.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    /// `true` when the status is in the 2xx range.
    pub ok: bool,
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase.
    pub status_text: String,
    /// The URL the response was served from.
    pub url: String,
    /// HTTP method of the originating request.
    pub method: String,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: f64,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Parsed JSON body, when the response classified as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Raw body text, when the response did not classify as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl ResponseEnvelope {
    /// Returns a field of the JSON body by dot-separated path.
    ///
    /// Missing segments yield `None`; this never panics on absent or
    /// renamed fields.
    pub fn data_at(&self, path: &str) -> Option<&Value> {
        let mut current = self.data.as_ref()?;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_builder_accumulates_query_in_order() {
        let spec = RequestSpec::get("jobs")
            .with_query("a", json!(1))
            .with_query("b", json!("two"));
        assert_eq!(spec.query.len(), 2);
        assert_eq!(spec.query[0].0, "a");
        assert_eq!(spec.query[1].0, "b");
    }

    #[test]
    fn test_body_serialization() {
        assert_eq!(
            RequestBody::Json(json!({"a": 1})).into_bytes(),
            b"{\"a\":1}".to_vec()
        );
        assert_eq!(RequestBody::Text("raw".into()).into_bytes(), b"raw".to_vec());
        assert_eq!(
            RequestBody::Bytes(vec![1, 2, 3]).into_bytes(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_data_at_walks_nested_paths() {
        let envelope = ResponseEnvelope {
            ok: true,
            status: 200,
            status_text: "OK".into(),
            url: "https://api.test/jobs".into(),
            method: "GET".into(),
            duration_ms: 1.0,
            headers: HashMap::new(),
            data: Some(json!({"meta": {"next": "p2"}})),
            raw_text: None,
        };
        assert_eq!(envelope.data_at("meta.next"), Some(&json!("p2")));
        assert_eq!(envelope.data_at("meta.missing"), None);
        assert_eq!(envelope.data_at("absent"), None);
    }
}
