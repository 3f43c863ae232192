//! # Jobsweep
//!
//! A client-side search layer over a remote paginated REST resource of
//! job-definition records. The remote API has no native substring
//! search; this crate compensates by scanning the collection in batches
//! under one of several strategies, filtering client-side,
//! deduplicating, and enriching a bounded head of the matches with
//! detail fetches.
//!
//! ## Overview
//!
//! Two components do the work:
//!
//! - [`ApiClient`] issues single authenticated requests with a combined
//!   timeout+cancellation signal and response classification, and
//!   offers a generic page-follower.
//! - [`JobSweeper`] drives the client through a strategy's query
//!   sequence, collects and deduplicates matches, and summarizes
//!   connector details for the leading results.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jobsweep::{ApiClient, ApiClientConfig, JobSweeper, SweepParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiClientConfig::from_env()?;
//!     let sweeper = JobSweeper::new(ApiClient::new(config)?);
//!
//!     let reply = sweeper.batch_search(SweepParams::new("nightly sales")).await;
//!     println!("{}", serde_json::to_string_pretty(&reply)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: fundamental types, errors, and the combined-cancellation
//!   primitive
//! - **Transport**: the seam between the client and the network, with a
//!   mock implementation for tests
//! - **Client**: authenticated requests and pagination
//! - **Sweep**: strategies, orchestration, and enrichment
//!
//! Failures degrade rather than abort: a failed batch shrinks the
//! result, a failed detail fetch leaves one match unenriched, and the
//! [`JobSweeper::batch_search`] surface always returns a well-formed
//! structured reply.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod client;
pub mod core;
pub mod sweep;
pub mod transport;

// Re-export commonly used types at the crate root
pub use crate::client::{
    ApiClient, ApiClientConfig, PageSet, PageSpec, RequestBody, RequestContext, RequestSpec,
    ResponseEnvelope, ResponseMode,
};
pub use crate::core::{
    ApiError, BatchSearchReply, ConnectorSummaries, ConnectorSummary, ErrorPayload, JobMatch,
    JobRecord, Result, StrategyKind, SweepError, SweepParams, SweepReport, TransportError,
    UsageError,
};
pub use crate::sweep::{JobSweeper, SweepConfig};
pub use crate::transport::{HttpTransport, MockTransport, Transport};

/// Prelude module for convenient imports.
///
/// ```rust
/// use jobsweep::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{ApiClient, ApiClientConfig, RequestSpec, ResponseEnvelope};
    pub use crate::core::{
        BatchSearchReply, Result, StrategyKind, SweepError, SweepParams, SweepReport,
    };
    pub use crate::sweep::{JobSweeper, SweepConfig};
    pub use crate::transport::{MockTransport, Transport};
}
