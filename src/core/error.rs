//! Error types for the jobsweep library.
//!
//! Two error kinds exist: failures talking to the remote API
//! ([`ApiError`], which wraps both protocol-level and transport-level
//! problems) and caller mistakes caught before any network activity
//! ([`UsageError`]). The library never panics; all errors are returned
//! as `Result` values.

use crate::client::{RequestContext, ResponseEnvelope};
use thiserror::Error;

/// A transport-level failure: DNS, connection reset, TLS, timeout, or
/// cancellation before a response was received.
///
/// This is the `source` of an [`ApiError`] when no HTTP response exists.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Human-readable description of the failure.
    pub message: String,
    /// The underlying failure, when one exists.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Creates a transport error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping an underlying failure.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// The error raised for any failed API request.
///
/// Exactly one type covers both failure families; callers distinguish
/// them by the presence of [`response`](Self::response):
///
/// - non-2xx status: `response` is `Some` and carries the parsed or raw
///   body so the failure payload can be inspected, not just the code.
/// - transport failure, timeout, or cancellation: `response` is `None`
///   and [`source`](Self::source) carries the underlying failure.
///
/// The request context is always present for diagnosis.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable description of the failure.
    pub message: String,
    /// Context of the request that failed.
    pub request: RequestContext,
    /// The response, when the server answered with a non-success status.
    pub response: Option<ResponseEnvelope>,
    /// The transport failure, when the server never answered.
    #[source]
    pub source: Option<TransportError>,
}

impl ApiError {
    /// Creates an error for a non-success HTTP status.
    pub fn status(request: RequestContext, response: ResponseEnvelope) -> Self {
        Self {
            message: format!(
                "{} {} failed with status {} {}",
                request.method, request.url, response.status, response.status_text
            ),
            request,
            response: Some(response),
            source: None,
        }
    }

    /// Creates an error for a transport-level failure.
    pub fn transport(request: RequestContext, source: TransportError) -> Self {
        Self {
            message: format!("{} {}: {}", request.method, request.url, source.message),
            request,
            response: None,
            source: Some(source),
        }
    }

    /// Returns the HTTP status code, when a response was received.
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Returns `true` if the server answered (non-2xx) rather than the
    /// transport failing.
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }
}

/// A caller mistake detected before any network activity.
///
/// Usage errors are always fatal and never retried.
#[derive(Debug, Error)]
pub enum UsageError {
    /// No base endpoint was configured.
    #[error("base endpoint is required")]
    MissingBaseEndpoint,

    /// The configured base endpoint is not a valid URL.
    #[error("base endpoint is not a valid URL: {value}")]
    InvalidBaseEndpoint {
        /// The rejected value.
        value: String,
    },

    /// No API credential was configured.
    #[error("API credential is required")]
    MissingCredential,

    /// The underlying HTTP transport could not be constructed.
    #[error("failed to construct HTTP transport: {reason}")]
    TransportUnavailable {
        /// Why construction failed.
        reason: String,
    },

    /// A request was issued with an empty path.
    #[error("request path must be a non-empty string")]
    EmptyPath,

    /// A request was issued with an unparseable absolute URL.
    #[error("request path is not a valid URL: {value}")]
    InvalidPath {
        /// The rejected value.
        value: String,
    },

    /// An absolute URL pointed outside the configured base endpoint.
    #[error("refusing to send request to '{url}': outside base endpoint '{base}'")]
    CrossOrigin {
        /// The rejected absolute URL.
        url: String,
        /// The configured base endpoint.
        base: String,
    },

    /// The search term was empty or whitespace.
    #[error("search term must be a non-empty string")]
    EmptySearchTerm,

    /// The strategy name is not one of the known strategies.
    #[error("unknown strategy '{name}' (expected one of: {expected})")]
    UnknownStrategy {
        /// The rejected name.
        name: String,
        /// Comma-separated list of accepted names.
        expected: String,
    },

    /// The batch budget fell outside the accepted range.
    #[error("max_batches must be between 1 and 50, got {got}")]
    BatchBudgetOutOfRange {
        /// The rejected value.
        got: u32,
    },
}

/// The top-level error type for sweep operations.
#[derive(Debug, Error)]
pub enum SweepError {
    /// A request to the remote API failed.
    #[error(transparent)]
    Api(Box<ApiError>),

    /// The caller supplied invalid parameters or configuration.
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl From<ApiError> for SweepError {
    fn from(err: ApiError) -> Self {
        Self::Api(Box::new(err))
    }
}

impl SweepError {
    /// Returns the inner [`ApiError`], if this is an API failure.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Usage(_) => None,
        }
    }
}

/// A specialized `Result` type for sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;
