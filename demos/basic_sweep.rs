//! Basic sweep example demonstrating a batch search end to end.
//!
//! This example shows how to:
//! - Configure an API client
//! - Build a JobSweeper
//! - Run a batch search and render the structured reply
//!
//! It runs against a mock transport so it needs no credentials or
//! network access. Run with: cargo run --example basic_sweep

use jobsweep::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Script a tiny two-page collection. Against a real deployment you
    // would use ApiClientConfig::from_env() and ApiClient::new instead.
    let transport = MockTransport::new()
        .with_json_route(
            "cursor=p2",
            200,
            json!({
                "items": [
                    {"id": 103, "name": "weekly sales rollup", "description": "aggregates orders"},
                ],
                "next_cursor": null
            }),
        )
        .with_json_route(
            "job_definitions",
            200,
            json!({
                "items": [
                    {"id": 101, "name": "nightly sales load", "description": "raw orders to warehouse"},
                    {"id": 102, "name": "inventory snapshot", "description": "stock levels"},
                ],
                "next_cursor": "p2"
            }),
        );

    let config = ApiClientConfig::new("https://app.example.com/api", "demo-credential");
    let client = ApiClient::with_transport(config, Arc::new(transport))?;
    let sweeper = JobSweeper::new(client);

    let params = SweepParams::new("sales")
        .with_strategy(StrategyKind::ExhaustiveScan)
        .with_max_batches(5);

    println!("=== Jobsweep Basic Sweep Example ===\n");
    let reply = sweeper.batch_search(params).await;

    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
