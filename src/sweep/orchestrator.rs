//! The sweep orchestrator.
//!
//! [`JobSweeper`] drives the API client through a strategy's query
//! sequence, filters and deduplicates the returned records, enriches a
//! bounded head of the matches with detail fetches, and assembles the
//! final report. Internal batch and detail failures degrade the result
//! (fewer matches, missing enrichment) instead of failing the call.

use crate::client::{ApiClient, RequestSpec, ResponseEnvelope};
use crate::core::error::Result;
use crate::core::types::{
    BatchSearchReply, ConnectorSummaries, JobMatch, JobRecord, SweepParams, SweepReport,
};
use crate::sweep::enrich::summarize_connectors;
use crate::sweep::strategy::{planner_for, BatchPlanner, BatchView, FailureMode};

use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Listing/detail resource path relative to the base endpoint.
    pub list_path: String,

    /// How many of the leading matches get a detail fetch. Zero
    /// disables enrichment.
    pub enrich_limit: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            list_path: "job_definitions".to_string(),
            enrich_limit: 5,
        }
    }
}

impl SweepConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource path.
    pub fn with_list_path(mut self, path: impl Into<String>) -> Self {
        self.list_path = path.into();
        self
    }

    /// Sets the enrichment head size.
    pub fn with_enrich_limit(mut self, limit: usize) -> Self {
        self.enrich_limit = limit;
        self
    }
}

/// The multi-strategy scan-and-dedup orchestrator.
///
/// Holds no state across invocations; every sweep starts fresh from its
/// parameters. The client is an injected dependency, so tests run the
/// whole orchestration against a mock transport.
#[derive(Debug, Clone)]
pub struct JobSweeper {
    client: ApiClient,
    config: SweepConfig,
}

impl JobSweeper {
    /// Creates a sweeper over the given client with default
    /// configuration.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            config: SweepConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs one sweep and returns the report.
    ///
    /// # Errors
    ///
    /// Only parameter validation fails here; batch and detail failures
    /// are absorbed per the strategy's failure policy.
    pub async fn sweep(&self, params: SweepParams) -> Result<SweepReport> {
        params.validate()?;
        let term = params.search_term.trim().to_string();
        let folded = term.to_lowercase();
        let started_at = Utc::now();

        tracing::info!(
            strategy = %params.strategy,
            max_batches = params.max_batches,
            "starting sweep"
        );

        let mut planner = planner_for(params.strategy, &term);
        let mut batches_searched: u32 = 0;
        let mut total_scanned: u64 = 0;
        let mut collected: Vec<JobRecord> = Vec::new();

        while batches_searched < params.max_batches {
            let Some(query) = planner.next_query() else {
                break;
            };
            let spec = RequestSpec::get(self.config.list_path.as_str()).with_query_pairs(query);

            match self.client.request(spec).await {
                Ok(envelope) => {
                    let items = batch_items(&envelope);
                    let view = BatchView {
                        count: items.len(),
                        next_cursor: cursor_from(&envelope),
                    };

                    batches_searched += 1;
                    total_scanned += items.len() as u64;
                    for item in items {
                        if let Some(record) = JobRecord::from_item(item) {
                            if record.matches(&folded) {
                                collected.push(record);
                            }
                        }
                    }

                    tracing::debug!(
                        batch = batches_searched,
                        scanned = view.count,
                        matches = collected.len(),
                        "batch complete"
                    );
                    planner.observe(&view);
                }
                Err(error) => match planner.failure_mode() {
                    FailureMode::FatalToSweep => {
                        tracing::warn!(error = %error, "batch failed; ending sweep early");
                        break;
                    }
                    FailureMode::SkipBatch => {
                        tracing::warn!(error = %error, "batch failed; skipping");
                        continue;
                    }
                },
            }
        }

        let mut matches: Vec<JobMatch> = dedup_by_id(collected)
            .into_iter()
            .map(|record| self.project(record))
            .collect();
        self.enrich_head(&mut matches).await;

        let completed_at = Utc::now();
        let progress = format!(
            "searched {} batches, scanned {} records, found {} matches",
            batches_searched,
            total_scanned,
            matches.len()
        );

        tracing::info!(
            batches = batches_searched,
            scanned = total_scanned,
            matches = matches.len(),
            "sweep complete"
        );

        Ok(SweepReport {
            id: uuid::Uuid::new_v4().to_string(),
            strategy: params.strategy,
            batches_searched,
            total_scanned,
            matches,
            progress,
            started_at,
            completed_at,
        })
    }

    /// Runs one sweep and wraps the outcome in the structured reply
    /// returned to the host: `{ok: true, ...}` or `{ok: false, error}`.
    /// This surface never returns an error.
    pub async fn batch_search(&self, params: SweepParams) -> BatchSearchReply {
        match self.sweep(params).await {
            Ok(report) => BatchSearchReply::success(report),
            Err(error) => {
                tracing::warn!(error = %error, "batch search failed");
                BatchSearchReply::failure(&error)
            }
        }
    }

    fn project(&self, record: JobRecord) -> JobMatch {
        let id = record.id.unwrap_or_default();
        JobMatch {
            url: deep_link(self.client.base_endpoint(), &self.config.list_path, &id),
            id,
            name: record.name,
            description: record.description,
            input_option_type: record.input_option_type,
            output_option_type: record.output_option_type,
            created_by: record.created_by,
            connectors: ConnectorSummaries::default(),
        }
    }

    /// Fetches details for the leading matches concurrently; a failed
    /// fetch leaves that match's summaries empty and the others intact.
    async fn enrich_head(&self, matches: &mut [JobMatch]) {
        let head = matches.len().min(self.config.enrich_limit);
        if head == 0 {
            return;
        }

        let fetches: Vec<_> = matches[..head]
            .iter()
            .map(|candidate| self.fetch_detail(candidate.id.clone()))
            .collect();
        let summaries = futures::future::join_all(fetches).await;

        for (candidate, connectors) in matches[..head].iter_mut().zip(summaries) {
            candidate.connectors = connectors;
        }
    }

    async fn fetch_detail(&self, id: String) -> ConnectorSummaries {
        let path = format!("{}/{}", self.config.list_path, id);
        match self.client.request(RequestSpec::get(path)).await {
            Ok(envelope) => envelope
                .data
                .as_ref()
                .map(summarize_connectors)
                .unwrap_or_default(),
            Err(error) => {
                tracing::warn!(id = %id, error = %error, "detail fetch failed; skipping enrichment");
                ConnectorSummaries::default()
            }
        }
    }
}

/// Extracts the record array from a listing response, tolerating an
/// absent or non-array `items` field.
fn batch_items(envelope: &ResponseEnvelope) -> &[Value] {
    envelope
        .data_at("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Reads the server cursor, treating null, `false`, and the empty
/// string as absent.
fn cursor_from(envelope: &ResponseEnvelope) -> Option<String> {
    match envelope.data_at("next_cursor")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Builds the deep link for a record: the base endpoint with a trailing
/// `api` segment stripped, then the resource path and id.
fn deep_link(base_endpoint: &str, list_path: &str, id: &str) -> String {
    let trimmed = base_endpoint.trim_end_matches('/');
    let root = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    format!("{root}/{list_path}/{id}")
}

/// Collapses the accumulator to one record per id, keeping the first
/// occurrence's position. Idempotent: re-running on an already
/// deduplicated sequence is a no-op.
fn dedup_by_id(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let Some(id) = record.id.clone() else {
            continue;
        };
        if seen.insert(id) {
            out.push(record);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClientConfig;
    use crate::core::types::StrategyKind;
    use crate::transport::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://app.example.com/api";

    fn sweeper(transport: MockTransport) -> (JobSweeper, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let client =
            ApiClient::with_transport(ApiClientConfig::new(BASE, "sekrit"), transport.clone())
                .unwrap();
        (JobSweeper::new(client), transport)
    }

    fn batch(ids: std::ops::Range<u64>, matching: &[u64], cursor: Option<&str>) -> Value {
        let items: Vec<Value> = ids
            .map(|id| {
                let name = if matching.contains(&id) {
                    format!("sales load {id}")
                } else {
                    format!("job {id}")
                };
                json!({"id": id, "name": name, "description": "nightly"})
            })
            .collect();
        json!({"items": items, "next_cursor": cursor})
    }

    fn record(id: &str) -> JobRecord {
        JobRecord::from_item(&json!({"id": id, "name": id})).unwrap()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_and_is_idempotent() {
        let records = vec![record("a"), record("b"), record("a"), record("c"), record("b")];
        let once: Vec<String> = dedup_by_id(records.clone())
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        assert_eq!(once, vec!["a", "b", "c"]);

        let twice: Vec<String> = dedup_by_id(dedup_by_id(records))
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        assert_eq!(twice, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deep_link_strips_trailing_api_segment() {
        assert_eq!(
            deep_link("https://app.example.com/api", "job_definitions", "42"),
            "https://app.example.com/job_definitions/42"
        );
        assert_eq!(
            deep_link("https://app.example.com", "job_definitions", "42"),
            "https://app.example.com/job_definitions/42"
        );
    }

    #[tokio::test]
    async fn test_exhaustive_scan_follows_cursor_to_exhaustion() {
        let transport = MockTransport::new()
            .with_json_route("cursor=p2", 200, batch(100..200, &[], Some("p3")))
            .with_json_route("cursor=p3", 200, batch(200..250, &[230], None))
            .with_json_route("limit=100", 200, batch(0..100, &[7, 31], Some("p2")));
        let (sweeper, _) = sweeper(transport);

        let report = sweeper
            .sweep(
                SweepParams::new("sales")
                    .with_strategy(StrategyKind::ExhaustiveScan)
                    .with_max_batches(3),
            )
            .await
            .unwrap();

        assert_eq!(report.batches_searched, 3);
        assert_eq!(report.total_scanned, 250);
        assert_eq!(report.matches.len(), 3);
        let ids: Vec<&str> = report.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "31", "230"]);
        assert!(report
            .matches
            .iter()
            .all(|m| m.url == format!("https://app.example.com/job_definitions/{}", m.id)));
        assert!(report.progress.contains("3 batches"));
        assert!(report.progress.contains("250 records"));
    }

    #[tokio::test]
    async fn test_exhaustive_scan_stops_when_cursor_absent_before_budget() {
        let transport =
            MockTransport::new().with_json_route("limit=100", 200, batch(0..40, &[1], None));
        let (sweeper, transport) = sweeper(transport);

        let report = sweeper
            .sweep(SweepParams::new("sales").with_max_batches(10))
            .await
            .unwrap();

        assert_eq!(report.batches_searched, 1);
        // One listing request plus one enrichment detail fetch.
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_exhaustive_scan_batch_failure_is_fatal_but_degrades() {
        let transport = MockTransport::new()
            .with_error_route("cursor=p2", "connection reset")
            .with_json_route("limit=100", 200, batch(0..100, &[3], Some("p2")));
        let (sweeper, _) = sweeper(transport);

        let reply = sweeper
            .batch_search(SweepParams::new("sales").with_max_batches(5))
            .await;

        // The sweep ends early but still reports what it found.
        assert!(reply.is_ok());
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["ok"], json!(true));
        assert_eq!(value["batches_searched"], json!(1));
        assert_eq!(value["matches"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_keyword_chunks_skips_failed_batches() {
        let transport = MockTransport::new()
            .with_error_route("name_contains=bcd", "boom")
            .with_json_route(
                "name_contains=abc",
                200,
                json!({"items": [
                    {"id": 1, "name": "abcde nightly load"},
                    {"id": 2, "name": "abc only"},
                ]}),
            )
            .with_json_route(
                "name_contains=cde",
                200,
                json!({"items": [{"id": 3, "name": "cde export"}]}),
            )
            .with_json_route(
                "name_contains=ab",
                200,
                json!({"items": [{"id": 1, "name": "abcde nightly load"}]}),
            );
        let (sweeper, transport) = sweeper(transport);

        let report = sweeper
            .sweep(
                SweepParams::new("abcde")
                    .with_strategy(StrategyKind::KeywordChunks)
                    .with_max_batches(10),
            )
            .await
            .unwrap();

        // Four chunk queries were issued; the failed one does not count
        // as a completed batch.
        assert_eq!(report.batches_searched, 3);
        assert_eq!(report.total_scanned, 4);
        // Record 1 matched twice across chunks; dedup keeps it once.
        let ids: Vec<&str> = report.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
        let listing_requests = transport
            .requests()
            .iter()
            .filter(|r| r.url.contains("name_contains="))
            .count();
        assert_eq!(listing_requests, 4);
    }

    #[tokio::test]
    async fn test_alphabet_sweep_issues_one_query_per_symbol() {
        let (sweeper, transport) = sweeper(MockTransport::new());

        let report = sweeper
            .sweep(
                SweepParams::new("anything")
                    .with_strategy(StrategyKind::AlphabetSweep)
                    .with_max_batches(50),
            )
            .await
            .unwrap();

        assert_eq!(report.batches_searched, 36);
        let urls: Vec<String> = transport.requests().iter().map(|r| r.url.clone()).collect();
        assert!(urls[0].contains("name_contains=a"));
        assert!(urls[35].contains("name_contains=9"));
    }

    #[tokio::test]
    async fn test_alphabet_sweep_respects_smaller_budget() {
        let (sweeper, transport) = sweeper(MockTransport::new());

        let report = sweeper
            .sweep(
                SweepParams::new("anything")
                    .with_strategy(StrategyKind::AlphabetSweep)
                    .with_max_batches(5),
            )
            .await
            .unwrap();

        assert_eq!(report.batches_searched, 5);
        assert_eq!(transport.request_count(), 5);
    }

    #[tokio::test]
    async fn test_recent_first_stops_on_empty_batch() {
        let transport = MockTransport::new()
            .with_json_route("limit=100", 200, json!({"items": []}));
        let (sweeper, transport) = sweeper(transport);

        let report = sweeper
            .sweep(
                SweepParams::new("sales")
                    .with_strategy(StrategyKind::RecentFirst)
                    .with_max_batches(10),
            )
            .await
            .unwrap();

        assert_eq!(report.batches_searched, 1);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_recent_first_runs_to_budget_when_batches_stay_full() {
        let transport = MockTransport::new()
            .with_json_route("limit=100", 200, batch(0..100, &[], None));
        let (sweeper, transport) = sweeper(transport);

        let report = sweeper
            .sweep(
                SweepParams::new("sales")
                    .with_strategy(StrategyKind::RecentFirst)
                    .with_max_batches(3),
            )
            .await
            .unwrap();

        assert_eq!(report.batches_searched, 3);
        assert_eq!(report.total_scanned, 300);
        assert_eq!(transport.request_count(), 3);
        // Records repeat across batches; dedup keeps each id once.
        assert_eq!(report.matches.len(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_across_batches_keep_first_position() {
        // recent_first re-fetches the same head, so every id repeats.
        let transport = MockTransport::new()
            .with_json_route("limit=100", 200, batch(0..100, &[5, 9], None));
        let (sweeper, _) = sweeper(transport);

        let report = sweeper
            .sweep(
                SweepParams::new("sales")
                    .with_strategy(StrategyKind::RecentFirst)
                    .with_max_batches(4),
            )
            .await
            .unwrap();

        assert_eq!(report.total_scanned, 400);
        let ids: Vec<&str> = report.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "9"]);
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_isolated_to_one_candidate() {
        let matching: Vec<u64> = (0..6).collect();
        let transport = MockTransport::new()
            .with_error_route("job_definitions/2", "detail fetch refused")
            .with_json_route(
                "job_definitions/0",
                200,
                json!({
                    "id": 0,
                    "input_option_type": "s3",
                    "input_option": {"bucket": "raw", "path_prefix": "in/"}
                }),
            )
            .with_json_route("limit=100", 200, batch(0..6, &matching, None));
        let (sweeper, _) = sweeper(transport);

        let report = sweeper
            .sweep(SweepParams::new("sales").with_max_batches(1))
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 6);

        // The failed candidate is still present, with empty summaries.
        let failed = report.matches.iter().find(|m| m.id == "2").unwrap();
        assert!(failed.connectors.is_empty());

        // A sibling candidate's enrichment still landed.
        let enriched = report.matches.iter().find(|m| m.id == "0").unwrap();
        assert_eq!(
            enriched.connectors.input,
            Some(crate::core::types::ConnectorSummary::ObjectStorage {
                bucket: "raw".to_string(),
                prefix: Some("in/".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_only_the_head_is_enriched() {
        let matching: Vec<u64> = (0..8).collect();
        let transport = MockTransport::new()
            .with_json_route("limit=100", 200, batch(0..8, &matching, None));
        let (sweeper, transport) = sweeper(transport);

        let report = sweeper
            .sweep(SweepParams::new("sales").with_max_batches(1))
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 8);
        let detail_requests = transport
            .requests()
            .iter()
            .filter(|r| !r.url.contains('?'))
            .count();
        assert_eq!(detail_requests, 5);
    }

    #[tokio::test]
    async fn test_invalid_params_yield_structured_failure() {
        let (sweeper, transport) = sweeper(MockTransport::new());

        let reply = sweeper.batch_search(SweepParams::new("   ")).await;
        assert!(!reply.is_ok());
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("search term"));

        let reply = sweeper
            .batch_search(SweepParams::new("x").with_max_batches(99))
            .await;
        assert!(!reply.is_ok());

        // Validation happens before any network activity.
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_records_are_scanned_but_never_matched() {
        let transport = MockTransport::new().with_json_route(
            "limit=100",
            200,
            json!({
                "items": [
                    {"name": "sales but no id"},
                    {"id": 1, "name": "sales load"},
                    "not even an object"
                ],
                "next_cursor": null
            }),
        );
        let (sweeper, _) = sweeper(transport);

        let report = sweeper
            .sweep(SweepParams::new("sales").with_max_batches(1))
            .await
            .unwrap();

        assert_eq!(report.total_scanned, 3);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].id, "1");
    }
}
