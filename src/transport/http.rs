//! reqwest-backed transport.

use crate::core::error::TransportError;
use crate::transport::{PreparedRequest, RawResponse, Transport};

use async_trait::async_trait;
use std::collections::HashMap;

/// The production transport, backed by a shared [`reqwest::Client`].
///
/// Per-request timeouts are enforced by the client's combined
/// cancellation signal, not here; the underlying connection pool is
/// reused across requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh connection pool.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::with_source("failed to build HTTP client", e))?;
        Ok(Self { client })
    }

    /// Wraps an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::with_source(format!("request failed: {e}"), e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::with_source(format!("failed to read body: {e}"), e))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            final_url,
            headers,
            body,
        })
    }
}
