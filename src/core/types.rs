//! Core types used throughout the jobsweep library.
//!
//! This module defines the job-definition record as seen by this crate,
//! the sweep strategies, the parameters and report of a sweep, and the
//! structured reply returned to the host process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::core::error::UsageError;

/// A job definition record as returned by the listing endpoint.
///
/// The remote record carries many more fields; this crate reads only
/// the ones below and tolerates every one of them being absent or
/// renamed: a missing field is treated as missing, never an error.
/// Identity is `id`: two records are the same entity iff their ids
/// match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier. Accepted as a number or a string upstream;
    /// normalized to a string here.
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,

    /// Type of the input connector (e.g. `s3`, `snowflake`).
    #[serde(default)]
    pub input_option_type: Option<String>,

    /// Type of the output connector.
    #[serde(default)]
    pub output_option_type: Option<String>,

    /// Who created the record. Accepted as a bare string or an object
    /// with a `name` or `email` field.
    #[serde(default, deserialize_with = "creator_as_string")]
    pub created_by: Option<String>,
}

impl JobRecord {
    /// Returns `true` if the record's name or description contains the
    /// case-folded search term.
    pub fn matches(&self, folded_term: &str) -> bool {
        if self.name.to_lowercase().contains(folded_term) {
            return true;
        }
        self.description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(folded_term))
    }

    /// Parses a record out of a raw listing item.
    ///
    /// Returns `None` only when the item is not an object or carries no
    /// usable id; such records can be counted but never matched.
    pub fn from_item(item: &Value) -> Option<Self> {
        let record: JobRecord = serde_json::from_value(item.clone()).ok()?;
        record.id.is_some().then_some(record)
    }
}

fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn creator_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Object(map)) => map
            .get("name")
            .or_else(|| map.get("email"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}

/// A summarized input or output connector extracted from a detail
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectorSummary {
    /// Object storage: a bucket and an optional key prefix.
    ObjectStorage {
        /// Bucket name.
        bucket: String,
        /// Key prefix within the bucket, when present.
        prefix: Option<String>,
    },

    /// A warehouse table addressed as database.schema.table.
    Warehouse {
        /// Database name.
        database: String,
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Execution warehouse, when present.
        warehouse: Option<String>,
    },

    /// A columnar analytics store table addressed as
    /// project.dataset.table.
    ColumnarStore {
        /// Project identifier.
        project: String,
        /// Dataset name.
        dataset: String,
        /// Table name.
        table: String,
    },
}

/// The input/output connector summaries for one enriched match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectorSummaries {
    /// Summary of the input side, when recognized.
    pub input: Option<ConnectorSummary>,
    /// Summary of the output side, when recognized.
    pub output: Option<ConnectorSummary>,
}

impl ConnectorSummaries {
    /// Returns `true` if neither side was recognized.
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

/// A matched record as projected into the sweep report.
#[derive(Debug, Clone, Serialize)]
pub struct JobMatch {
    /// Record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description, when present.
    pub description: Option<String>,
    /// Input connector type, when present.
    pub input_option_type: Option<String>,
    /// Output connector type, when present.
    pub output_option_type: Option<String>,
    /// Creator, when present.
    pub created_by: Option<String>,
    /// Deep link to the record in the upstream UI.
    pub url: String,
    /// Connector summaries from enrichment; empty when the record was
    /// outside the enrichment head or its detail fetch failed.
    #[serde(skip_serializing_if = "ConnectorSummaries::is_empty")]
    pub connectors: ConnectorSummaries,
}

/// The scanning strategies a sweep can run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Walk the whole collection page by page via the server cursor.
    ExhaustiveScan,
    /// Query `name_contains` for substrings derived from the term.
    KeywordChunks,
    /// Query `name_contains` once per alphabet symbol (a-z, 0-9).
    AlphabetSweep,
    /// Re-fetch the head of the collection, relying on the upstream
    /// default most-recent-first ordering.
    RecentFirst,
}

impl StrategyKind {
    /// All strategies, in documentation order.
    pub fn all() -> &'static [StrategyKind] {
        &[
            Self::ExhaustiveScan,
            Self::KeywordChunks,
            Self::AlphabetSweep,
            Self::RecentFirst,
        ]
    }

    /// The wire name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExhaustiveScan => "exhaustive_scan",
            Self::KeywordChunks => "keyword_chunks",
            Self::AlphabetSweep => "alphabet_sweep",
            Self::RecentFirst => "recent_first",
        }
    }

    /// Parses a wire name into a strategy.
    pub fn parse(name: &str) -> std::result::Result<Self, UsageError> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| UsageError::UnknownStrategy {
                name: name.to_string(),
                expected: Self::all()
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::ExhaustiveScan
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_max_batches() -> u32 {
    10
}

/// Parameters for one sweep invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepParams {
    /// The term to search for (case-insensitive substring match over
    /// name and description).
    pub search_term: String,

    /// The scanning strategy. Defaults to `exhaustive_scan`.
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Maximum number of batch requests to issue (1..=50). Defaults
    /// to 10.
    #[serde(default = "default_max_batches")]
    pub max_batches: u32,
}

impl SweepParams {
    /// Creates parameters with default strategy and batch budget.
    pub fn new(search_term: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            strategy: StrategyKind::default(),
            max_batches: default_max_batches(),
        }
    }

    /// Sets the strategy.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the batch budget.
    pub fn with_max_batches(mut self, max_batches: u32) -> Self {
        self.max_batches = max_batches;
        self
    }

    /// Validates the parameters, raising a [`UsageError`] before any
    /// network activity when they are out of contract.
    pub fn validate(&self) -> std::result::Result<(), UsageError> {
        if self.search_term.trim().is_empty() {
            return Err(UsageError::EmptySearchTerm);
        }
        if !(1..=50).contains(&self.max_batches) {
            return Err(UsageError::BatchBudgetOutOfRange {
                got: self.max_batches,
            });
        }
        Ok(())
    }
}

/// The result of one completed sweep.
///
/// Produced once per invocation and never mutated after return.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Unique identifier for this report.
    pub id: String,

    /// The strategy that ran.
    pub strategy: StrategyKind,

    /// Number of batch requests that completed.
    pub batches_searched: u32,

    /// Total records seen across all batches, matched or not.
    pub total_scanned: u64,

    /// Deduplicated matches, first occurrence order.
    pub matches: Vec<JobMatch>,

    /// Human-readable progress summary.
    pub progress: String,

    /// When the sweep started.
    pub started_at: DateTime<Utc>,

    /// When the sweep completed.
    pub completed_at: DateTime<Utc>,
}

/// Diagnostic context attached to a structured failure reply.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Human-readable failure message.
    pub message: String,
    /// The failed request, when the failure originated as an API error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<crate::client::RequestContext>,
    /// The response, when the server answered with an error status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<crate::client::ResponseEnvelope>,
}

/// The reply of the exposed batch-search operation.
///
/// Every invocation produces one of these. Internal failures degrade
/// the report (fewer results, missing enrichment) rather than escaping,
/// and the remaining failure paths still serialize to a well-formed
/// `{ok: false, error: {...}}` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchSearchReply {
    /// The sweep completed.
    Success {
        /// Always `true`.
        ok: bool,
        /// The completed report.
        #[serde(flatten)]
        report: SweepReport,
    },
    /// The sweep could not run.
    Failure {
        /// Always `false`.
        ok: bool,
        /// Diagnostic payload.
        error: ErrorPayload,
    },
}

impl BatchSearchReply {
    /// Wraps a completed report.
    pub fn success(report: SweepReport) -> Self {
        Self::Success { ok: true, report }
    }

    /// Wraps a failure.
    pub fn failure(error: &crate::core::error::SweepError) -> Self {
        let payload = match error.as_api() {
            Some(api) => ErrorPayload {
                message: api.message.clone(),
                request: Some(api.request.clone()),
                response: api.response.clone(),
            },
            None => ErrorPayload {
                message: error.to_string(),
                request: None,
                response: None,
            },
        };
        Self::Failure {
            ok: false,
            error: payload,
        }
    }

    /// Returns `true` for a success reply.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_parses_numeric_and_string_ids() {
        let numeric = JobRecord::from_item(&json!({"id": 42, "name": "load"})).unwrap();
        assert_eq!(numeric.id.as_deref(), Some("42"));

        let string = JobRecord::from_item(&json!({"id": "abc", "name": "load"})).unwrap();
        assert_eq!(string.id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        assert!(JobRecord::from_item(&json!({"name": "orphan"})).is_none());
        assert!(JobRecord::from_item(&json!("not an object")).is_none());
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let record = JobRecord::from_item(&json!({"id": 1})).unwrap();
        assert_eq!(record.name, "");
        assert!(record.description.is_none());
        assert!(record.input_option_type.is_none());
    }

    #[test]
    fn test_creator_accepts_object_and_string() {
        let from_obj =
            JobRecord::from_item(&json!({"id": 1, "created_by": {"name": "ops"}})).unwrap();
        assert_eq!(from_obj.created_by.as_deref(), Some("ops"));

        let from_str = JobRecord::from_item(&json!({"id": 2, "created_by": "ops"})).unwrap();
        assert_eq!(from_str.created_by.as_deref(), Some("ops"));
    }

    #[test]
    fn test_matching_is_case_folded_over_name_and_description() {
        let record = JobRecord::from_item(&json!({
            "id": 1,
            "name": "Daily Sales Load",
            "description": "Syncs ORDERS into the warehouse",
        }))
        .unwrap();

        assert!(record.matches("sales"));
        assert!(record.matches("orders"));
        assert!(!record.matches("inventory"));
    }

    #[test]
    fn test_strategy_parse_round_trips() {
        for kind in StrategyKind::all() {
            assert_eq!(StrategyKind::parse(kind.as_str()).unwrap(), *kind);
        }
        assert!(StrategyKind::parse("full_table_scan").is_err());
    }

    #[test]
    fn test_params_validation() {
        assert!(SweepParams::new("term").validate().is_ok());
        assert!(SweepParams::new("  ").validate().is_err());
        assert!(SweepParams::new("term")
            .with_max_batches(0)
            .validate()
            .is_err());
        assert!(SweepParams::new("term")
            .with_max_batches(51)
            .validate()
            .is_err());
        assert!(SweepParams::new("term")
            .with_max_batches(50)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_params_deserialize_defaults() {
        let params: SweepParams = serde_json::from_value(json!({"search_term": "x"})).unwrap();
        assert_eq!(params.strategy, StrategyKind::ExhaustiveScan);
        assert_eq!(params.max_batches, 10);
    }

    #[test]
    fn test_reply_serialization_shape() {
        let reply = BatchSearchReply::failure(&crate::core::error::SweepError::Usage(
            UsageError::EmptySearchTerm,
        ));
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert!(value["error"]["message"].is_string());
        assert!(value["error"].get("request").is_none());
    }
}
