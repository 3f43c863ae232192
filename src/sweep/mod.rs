//! The multi-strategy scan-and-dedup orchestrator.
//!
//! This module answers "find records matching a search term" against an
//! API with no native substring search:
//!
//! - [`strategy`] - the four batch-planning strategies
//! - [`orchestrator`] - the batch loop, dedup, and report assembly
//! - [`enrich`] - connector-detail summarization for the result head

pub mod enrich;
pub mod orchestrator;
pub mod strategy;

pub use enrich::summarize_connectors;
pub use orchestrator::{JobSweeper, SweepConfig};
pub use strategy::{keyword_chunks, planner_for, BatchPlanner, BatchView, FailureMode};
