//! Core types for the jobsweep library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - The job record, strategies, sweep parameters and report
//! - [`error`] - Structured error types
//! - [`cancel`] - Combined cancellation signals

pub mod cancel;
pub mod error;
pub mod types;

// Re-export commonly used types at the core level
pub use cancel::{AbortReason, CombinedSignal};
pub use error::{ApiError, Result, SweepError, TransportError, UsageError};
pub use types::{
    BatchSearchReply, ConnectorSummaries, ConnectorSummary, ErrorPayload, JobMatch, JobRecord,
    StrategyKind, SweepParams, SweepReport,
};
