//! Mock transport for testing.
//!
//! This module provides a configurable transport that serves scripted
//! responses without any network access, used by the crate's own tests
//! and available to downstream tests as well.

use crate::core::error::TransportError;
use crate::transport::{PreparedRequest, RawResponse, Transport};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A request observed by a [`MockTransport`], kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Absolute URL including the query string.
    pub url: String,
    /// Header name/value pairs as sent.
    pub headers: Vec<(String, String)>,
    /// The body, when one was sent.
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
enum RouteOutcome {
    Respond {
        status: u16,
        content_type: String,
        body: String,
    },
    Fail {
        message: String,
    },
}

#[derive(Debug, Clone)]
struct Route {
    needle: String,
    outcome: RouteOutcome,
}

/// A scriptable transport for tests.
///
/// Routes are matched against the full request URL by substring, in the
/// order they were added; the first match wins. Requests that match no
/// route get an empty `200` JSON object.
///
/// # Examples
///
/// ```rust
/// use jobsweep::transport::MockTransport;
/// use serde_json::json;
///
/// let transport = MockTransport::new()
///     .with_json_route("cursor=p2", 200, json!({"items": [], "next_cursor": null}))
///     .with_json_route("job_definitions", 200, json!({"items": [{"id": 1}]}))
///     .with_error_route("detail/9", "connection reset");
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Vec<Route>,
    latency: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
    call_count: AtomicU64,
}

impl MockTransport {
    /// Creates a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route answering with a JSON body.
    pub fn with_json_route(
        mut self,
        needle: impl Into<String>,
        status: u16,
        body: serde_json::Value,
    ) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            outcome: RouteOutcome::Respond {
                status,
                content_type: "application/json".to_string(),
                body: body.to_string(),
            },
        });
        self
    }

    /// Adds a route answering with a plain-text body.
    pub fn with_text_route(
        mut self,
        needle: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            outcome: RouteOutcome::Respond {
                status,
                content_type: "text/plain".to_string(),
                body: body.into(),
            },
        });
        self
    }

    /// Adds a route that fails at the transport level.
    pub fn with_error_route(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            outcome: RouteOutcome::Fail {
                message: message.into(),
            },
        });
        self
    }

    /// Sets a simulated latency applied to every request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the number of requests executed.
    pub fn request_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Returns copies of all recorded requests, in execution order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }

    fn status_text(status: u16) -> &'static str {
        match status {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        let url = request.url.to_string();
        self.requests
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedRequest {
                method: request.method.to_string(),
                url: url.clone(),
                headers: request.headers.clone(),
                body: request.body.clone(),
            });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self
            .routes
            .iter()
            .find(|route| url.contains(&route.needle))
            .map(|route| route.outcome.clone())
            .unwrap_or(RouteOutcome::Respond {
                status: 200,
                content_type: "application/json".to_string(),
                body: "{}".to_string(),
            });

        match outcome {
            RouteOutcome::Respond {
                status,
                content_type,
                body,
            } => {
                let mut headers = HashMap::new();
                headers.insert("content-type".to_string(), content_type);
                Ok(RawResponse {
                    status,
                    status_text: Self::status_text(status).to_string(),
                    final_url: url,
                    headers,
                    body,
                })
            }
            RouteOutcome::Fail { message } => Err(TransportError::new(message)),
        }
    }
}
