//! The authenticated API client.
//!
//! [`ApiClient`] issues single requests against a configured base
//! endpoint with auth-header injection, a combined timeout+cancellation
//! signal, and response classification. The underlying [`Transport`] is
//! an injected dependency so tests can substitute a mock without any
//! process-wide state.

use crate::client::request::{
    RequestContext, RequestSpec, ResponseEnvelope, ResponseMode,
};
use crate::core::cancel::CombinedSignal;
use crate::core::error::{ApiError, Result, TransportError, UsageError};
use crate::transport::{ArcTransport, HttpTransport, PreparedRequest, RawResponse, Transport};

use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fixed client identifier sent with every request.
const USER_AGENT: &str = concat!("jobsweep/", env!("CARGO_PKG_VERSION"));

/// Environment variable names read by [`ApiClientConfig::from_env`].
const ENV_BASE: &str = "JOBSWEEP_API_BASE";
const ENV_KEY: &str = "JOBSWEEP_API_KEY";
const ENV_TIMEOUT: &str = "JOBSWEEP_TIMEOUT_SECS";
const ENV_AUTH_HEADER: &str = "JOBSWEEP_AUTH_HEADER";
const ENV_AUTH_SCHEME: &str = "JOBSWEEP_AUTH_SCHEME";
const ENV_EXTRA_HEADERS: &str = "JOBSWEEP_EXTRA_HEADERS";

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base endpoint all request paths resolve against.
    pub base_endpoint: String,

    /// API credential (kept secret).
    pub credential: SecretString,

    /// Default per-request timeout.
    pub timeout: Duration,

    /// Name of the authentication header.
    pub auth_header: String,

    /// Scheme prefix for the credential, e.g. `Bearer`. An empty
    /// scheme sends the bare credential.
    pub auth_scheme: String,

    /// Extra static headers merged over the base set on every request.
    pub extra_headers: Vec<(String, String)>,
}

impl ApiClientConfig {
    /// Creates a configuration with the given endpoint and credential.
    pub fn new(base_endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            base_endpoint: base_endpoint.into(),
            credential: SecretString::new(credential.into().into()),
            timeout: Duration::from_secs(30),
            auth_header: "Authorization".to_string(),
            auth_scheme: "Bearer".to_string(),
            extra_headers: Vec::new(),
        }
    }

    /// Sets the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the authentication header name and scheme prefix.
    pub fn with_auth(mut self, header: impl Into<String>, scheme: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self.auth_scheme = scheme.into();
        self
    }

    /// Adds an extra static header.
    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// `JOBSWEEP_API_BASE` and `JOBSWEEP_API_KEY` are required;
    /// `JOBSWEEP_TIMEOUT_SECS`, `JOBSWEEP_AUTH_HEADER`,
    /// `JOBSWEEP_AUTH_SCHEME`, and `JOBSWEEP_EXTRA_HEADERS` (a JSON
    /// object of header name to value) are optional. Values are read
    /// once; this crate never reloads them.
    pub fn from_env() -> std::result::Result<Self, UsageError> {
        let base = std::env::var(ENV_BASE)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(UsageError::MissingBaseEndpoint)?;
        let key = std::env::var(ENV_KEY)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(UsageError::MissingCredential)?;

        let mut config = Self::new(base, key);

        if let Some(secs) = std::env::var(ENV_TIMEOUT)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(header) = std::env::var(ENV_AUTH_HEADER) {
            if !header.trim().is_empty() {
                config.auth_header = header;
            }
        }
        if let Ok(scheme) = std::env::var(ENV_AUTH_SCHEME) {
            config.auth_scheme = scheme;
        }
        if let Some(Value::Object(map)) = std::env::var(ENV_EXTRA_HEADERS)
            .ok()
            .and_then(|v| serde_json::from_str(&v).ok())
        {
            for (name, value) in map {
                if let Value::String(value) = value {
                    config.extra_headers.push((name, value));
                }
            }
        }

        Ok(config)
    }
}

/// The authenticated API client.
///
/// Cheap to clone; the configuration and transport are shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Arc<ApiClientConfig>,
    base: Url,
    transport: ArcTransport,
}

impl ApiClient {
    /// Creates a client with the production HTTP transport.
    ///
    /// Fails fast with a [`UsageError`] when the base endpoint or
    /// credential is missing, or when the transport cannot be built;
    /// these are construction errors, not request-time errors.
    pub fn new(config: ApiClientConfig) -> std::result::Result<Self, UsageError> {
        let transport =
            HttpTransport::new().map_err(|e| UsageError::TransportUnavailable {
                reason: e.to_string(),
            })?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client over the given transport.
    pub fn with_transport(
        config: ApiClientConfig,
        transport: ArcTransport,
    ) -> std::result::Result<Self, UsageError> {
        if config.base_endpoint.trim().is_empty() {
            return Err(UsageError::MissingBaseEndpoint);
        }
        if config.credential.expose_secret().is_empty() {
            return Err(UsageError::MissingCredential);
        }
        let base = Url::parse(config.base_endpoint.trim_end_matches('/')).map_err(|_| {
            UsageError::InvalidBaseEndpoint {
                value: config.base_endpoint.clone(),
            }
        })?;

        Ok(Self {
            config: Arc::new(config),
            base,
            transport,
        })
    }

    /// The configured base endpoint, without a trailing slash.
    pub fn base_endpoint(&self) -> &str {
        self.base.as_str()
    }

    /// Issues one request and classifies the response.
    ///
    /// # Errors
    ///
    /// - [`UsageError`] for an empty path or an absolute URL outside
    ///   the base endpoint, before any network activity.
    /// - [`ApiError`] with a response envelope for a non-2xx status.
    /// - [`ApiError`] with a transport source for network failures,
    ///   timeouts, and cancellation; the message reflects whichever
    ///   abort reason fired first.
    pub async fn request(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        let mut url = self.resolve_url(&spec.path)?;
        append_query(&mut url, &spec.query);

        let timeout = spec.timeout.unwrap_or(self.config.timeout);
        let context = RequestContext {
            method: spec.method.to_string(),
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };

        let body = if spec.method == Method::GET || spec.method == Method::HEAD {
            None
        } else {
            spec.body.map(|b| b.into_bytes())
        };

        let prepared = PreparedRequest {
            method: spec.method.clone(),
            url,
            headers: self.merged_headers(&spec.headers),
            body,
        };

        tracing::debug!(
            method = %context.method,
            url = %context.url,
            timeout_ms = context.timeout_ms,
            "issuing API request"
        );

        // The signal owns the timeout timer; dropping it at the end of
        // this call tears the timer down on every exit path.
        let signal = CombinedSignal::new(Some(timeout), &spec.cancel);
        let started = Instant::now();

        let raw = tokio::select! {
            result = self.transport.execute(prepared) => result,
            _ = signal.cancelled() => {
                let message = signal
                    .reason()
                    .map(|r| r.describe())
                    .unwrap_or_else(|| "request aborted".to_string());
                Err(TransportError::new(message))
            }
        };
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let raw = match raw {
            Ok(raw) => raw,
            Err(source) => {
                tracing::warn!(
                    method = %context.method,
                    url = %context.url,
                    error = %source,
                    "API request failed before a response arrived"
                );
                return Err(ApiError::transport(context, source).into());
            }
        };

        let envelope = classify(raw, spec.response_mode, &context.method, duration_ms);
        if envelope.ok {
            Ok(envelope)
        } else {
            Err(ApiError::status(context, envelope).into())
        }
    }

    /// Resolves a request path against the base endpoint.
    ///
    /// Absolute URLs are accepted only when their origin and path
    /// prefix match the base endpoint, so a caller cannot redirect
    /// requests (and the credential) to an arbitrary host.
    fn resolve_url(&self, path: &str) -> std::result::Result<Url, UsageError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(UsageError::EmptyPath);
        }

        if path.starts_with("http://") || path.starts_with("https://") {
            let url = Url::parse(path).map_err(|_| UsageError::InvalidPath {
                value: path.to_string(),
            })?;
            let same_origin = url.origin() == self.base.origin();
            if !same_origin || !url.path().starts_with(self.base.path()) {
                return Err(UsageError::CrossOrigin {
                    url: path.to_string(),
                    base: self.base.to_string(),
                });
            }
            return Ok(url);
        }

        let joined = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|_| UsageError::InvalidPath { value: joined })
    }

    /// Builds the effective header set: base headers, then configured
    /// extra headers, then per-call headers. Later layers win,
    /// case-insensitively.
    fn merged_headers(&self, per_call: &[(String, String)]) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            (self.config.auth_header.clone(), self.auth_value()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ];
        for (name, value) in &self.config.extra_headers {
            set_header(&mut headers, name, value);
        }
        for (name, value) in per_call {
            set_header(&mut headers, name, value);
        }
        headers
    }

    fn auth_value(&self) -> String {
        let credential = self.config.credential.expose_secret();
        if self.config.auth_scheme.is_empty() {
            credential.to_string()
        } else {
            format!("{} {}", self.config.auth_scheme, credential)
        }
    }
}

/// Replaces or appends a header, matching names case-insensitively.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
    {
        Some(slot) => slot.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Encodes query parameters onto the URL.
///
/// `null` values (and `null` sequence elements) are dropped; sequences
/// expand to one parameter per element, in element order; strings are
/// used verbatim and other scalars stringified.
fn append_query(url: &mut Url, query: &[(String, Value)]) {
    let mut pairs = url.query_pairs_mut();
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if !item.is_null() {
                        pairs.append_pair(key, &scalar_string(item));
                    }
                }
            }
            other => {
                pairs.append_pair(key, &scalar_string(other));
            }
        }
    }
    drop(pairs);
    // An empty query set must not leave a dangling "?".
    if url.query() == Some("") {
        url.set_query(None);
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Classifies a raw response into an envelope.
///
/// JSON parsing is attempted only per [`ResponseMode`]; a body that
/// fails to parse despite classifying as JSON falls through to
/// `raw_text` rather than raising.
fn classify(
    raw: RawResponse,
    mode: ResponseMode,
    method: &str,
    duration_ms: f64,
) -> ResponseEnvelope {
    let ok = (200..300).contains(&raw.status);

    let (data, raw_text) = if raw.body.is_empty() {
        (None, None)
    } else {
        let try_json = match mode {
            ResponseMode::Json => true,
            ResponseMode::Text => false,
            ResponseMode::Auto => raw
                .headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .is_some_and(|(_, value)| value.to_lowercase().contains("json")),
        };
        if try_json {
            match serde_json::from_str(&raw.body) {
                Ok(value) => (Some(value), None),
                Err(_) => (None, Some(raw.body)),
            }
        } else {
            (None, Some(raw.body))
        }
    };

    ResponseEnvelope {
        ok,
        status: raw.status,
        status_text: raw.status_text,
        url: raw.final_url,
        method: method.to_string(),
        duration_ms,
        headers: raw.headers,
        data,
        raw_text,
    }
}
