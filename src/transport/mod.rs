//! Transport abstraction for the API client.
//!
//! The client never talks to the network directly; it hands a fully
//! prepared request to a [`Transport`] and gets back the raw response.
//! This keeps the HTTP stack an injected dependency rather than
//! process-wide state, so tests substitute [`MockTransport`] without
//! touching anything global.
//!
//! Available transports:
//!
//! - [`HttpTransport`] - reqwest-backed transport used in production
//! - [`MockTransport`] - scriptable transport for tests and demos

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockTransport, RecordedRequest};

use crate::core::error::TransportError;
use async_trait::async_trait;
use reqwest::{Method, Url};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A fully prepared request, ready to be put on the wire.
///
/// All client-side policy (URL resolution, query encoding, header
/// layering, body serialization) has already been applied by the time a
/// transport sees one of these.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the encoded query string.
    pub url: Url,
    /// Header name/value pairs, in layering order.
    pub headers: Vec<(String, String)>,
    /// Serialized body, when the method carries one.
    pub body: Option<Vec<u8>>,
}

/// The raw result of executing a [`PreparedRequest`].
///
/// The body is always read to completion as text; classification into
/// JSON happens in the client, not the transport.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status, when known.
    pub status_text: String,
    /// The URL the response was ultimately served from.
    pub final_url: String,
    /// Response headers, last value wins for repeated names.
    pub headers: HashMap<String, String>,
    /// The full response body as text.
    pub body: String,
}

/// The seam between the API client and the network.
///
/// Implementations must be `Send + Sync`, must never panic, and must
/// report every failure as a [`TransportError`]. A transport does not
/// interpret status codes; a 500 is a successful `execute` call.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Executes one request and reads the response body to completion.
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// An arc-wrapped transport for shared ownership.
pub type ArcTransport = Arc<dyn Transport>;
