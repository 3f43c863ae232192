//! Connector-detail extraction.
//!
//! Detail records describe their input and output connectors under
//! `{side}_option_type` / `{side}_option`, with several field layouts in
//! the wild per connector type. Extraction is driven by an ordered rule
//! table evaluated first-match-wins: supporting a new connector type or
//! field layout means adding a rule, not another branch.

use crate::core::types::{ConnectorSummaries, ConnectorSummary};
use serde_json::Value;

type Extractor = fn(&Value) -> Option<ConnectorSummary>;

/// One known (connector type, field layout) pairing.
struct ShapeRule {
    /// Matched as a substring of the record's `*_option_type`, so
    /// versioned type names like `s3_v2` still resolve.
    kind: &'static str,
    extract: Extractor,
}

/// Known layouts, most specific first per connector type.
static SHAPE_RULES: &[ShapeRule] = &[
    ShapeRule {
        kind: "s3",
        extract: object_storage_path_prefix,
    },
    ShapeRule {
        kind: "s3",
        extract: object_storage_prefix,
    },
    ShapeRule {
        kind: "s3",
        extract: object_storage_bucket_name,
    },
    ShapeRule {
        kind: "s3",
        extract: object_storage_bucket_only,
    },
    ShapeRule {
        kind: "snowflake",
        extract: warehouse_database,
    },
    ShapeRule {
        kind: "snowflake",
        extract: warehouse_db,
    },
    ShapeRule {
        kind: "bigquery",
        extract: columnar_project_id,
    },
    ShapeRule {
        kind: "bigquery",
        extract: columnar_project,
    },
    ShapeRule {
        kind: "bigquery",
        extract: columnar_suffixed_ids,
    },
];

/// Summarizes both sides of a detail record.
///
/// Unknown connector types and unrecognized layouts yield `None` for
/// that side; absent fields never raise.
pub fn summarize_connectors(detail: &Value) -> ConnectorSummaries {
    ConnectorSummaries {
        input: summarize_side(detail, "input"),
        output: summarize_side(detail, "output"),
    }
}

fn summarize_side(detail: &Value, side: &str) -> Option<ConnectorSummary> {
    let kind = detail
        .get(format!("{side}_option_type"))?
        .as_str()?
        .to_lowercase();
    let options = detail.get(format!("{side}_option"))?;

    for rule in SHAPE_RULES.iter().filter(|rule| kind.contains(rule.kind)) {
        // The options may be nested under a "<kind>_<side>_option"
        // wrapper or sit directly on the options object.
        let wrapper = options.get(format!("{}_{side}_option", rule.kind));
        for candidate in wrapper.iter().copied().chain(std::iter::once(options)) {
            if let Some(summary) = (rule.extract)(candidate) {
                return Some(summary);
            }
        }
    }
    None
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(str::to_string)
}

fn object_storage_path_prefix(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::ObjectStorage {
        bucket: str_field(value, "bucket")?,
        prefix: Some(str_field(value, "path_prefix")?),
    })
}

fn object_storage_prefix(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::ObjectStorage {
        bucket: str_field(value, "bucket")?,
        prefix: Some(str_field(value, "prefix")?),
    })
}

fn object_storage_bucket_name(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::ObjectStorage {
        bucket: str_field(value, "bucket_name")?,
        prefix: str_field(value, "key_prefix"),
    })
}

fn object_storage_bucket_only(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::ObjectStorage {
        bucket: str_field(value, "bucket")?,
        prefix: None,
    })
}

fn warehouse_database(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::Warehouse {
        database: str_field(value, "database")?,
        schema: str_field(value, "schema")?,
        table: str_field(value, "table")?,
        warehouse: str_field(value, "warehouse")
            .or_else(|| str_field(value, "execution_warehouse")),
    })
}

fn warehouse_db(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::Warehouse {
        database: str_field(value, "db")?,
        schema: str_field(value, "schema")?,
        table: str_field(value, "table")?,
        warehouse: str_field(value, "warehouse"),
    })
}

fn columnar_project_id(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::ColumnarStore {
        project: str_field(value, "project_id")?,
        dataset: str_field(value, "dataset")?,
        table: str_field(value, "table")?,
    })
}

fn columnar_project(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::ColumnarStore {
        project: str_field(value, "project")?,
        dataset: str_field(value, "dataset")?,
        table: str_field(value, "table")?,
    })
}

fn columnar_suffixed_ids(value: &Value) -> Option<ConnectorSummary> {
    Some(ConnectorSummary::ColumnarStore {
        project: str_field(value, "project_id")?,
        dataset: str_field(value, "dataset_id")?,
        table: str_field(value, "table_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_wrapper_layout_is_found() {
        let detail = json!({
            "input_option_type": "s3",
            "input_option": {
                "s3_input_option": {"bucket": "raw-events", "path_prefix": "2025/"}
            }
        });

        let summaries = summarize_connectors(&detail);
        assert_eq!(
            summaries.input,
            Some(ConnectorSummary::ObjectStorage {
                bucket: "raw-events".to_string(),
                prefix: Some("2025/".to_string()),
            })
        );
        assert!(summaries.output.is_none());
    }

    #[test]
    fn test_flat_layout_is_found() {
        let detail = json!({
            "output_option_type": "snowflake",
            "output_option": {
                "database": "ANALYTICS",
                "schema": "PUBLIC",
                "table": "ORDERS",
                "execution_warehouse": "LOAD_WH"
            }
        });

        let summaries = summarize_connectors(&detail);
        assert_eq!(
            summaries.output,
            Some(ConnectorSummary::Warehouse {
                database: "ANALYTICS".to_string(),
                schema: "PUBLIC".to_string(),
                table: "ORDERS".to_string(),
                warehouse: Some("LOAD_WH".to_string()),
            })
        );
    }

    #[test]
    fn test_first_matching_layout_wins() {
        // Both path_prefix and prefix are present; the earlier rule
        // takes path_prefix.
        let detail = json!({
            "input_option_type": "s3",
            "input_option": {"bucket": "b", "path_prefix": "keep/", "prefix": "drop/"}
        });

        let summary = summarize_connectors(&detail).input.unwrap();
        assert_eq!(
            summary,
            ConnectorSummary::ObjectStorage {
                bucket: "b".to_string(),
                prefix: Some("keep/".to_string()),
            }
        );
    }

    #[test]
    fn test_bucket_without_prefix_falls_back() {
        let detail = json!({
            "input_option_type": "s3",
            "input_option": {"bucket": "plain"}
        });

        assert_eq!(
            summarize_connectors(&detail).input,
            Some(ConnectorSummary::ObjectStorage {
                bucket: "plain".to_string(),
                prefix: None,
            })
        );
    }

    #[test]
    fn test_versioned_type_names_still_match() {
        let detail = json!({
            "input_option_type": "s3_v2",
            "input_option": {"bucket_name": "v2-bucket", "key_prefix": "in/"}
        });

        assert_eq!(
            summarize_connectors(&detail).input,
            Some(ConnectorSummary::ObjectStorage {
                bucket: "v2-bucket".to_string(),
                prefix: Some("in/".to_string()),
            })
        );
    }

    #[test]
    fn test_columnar_layout_variants() {
        let suffixed = json!({
            "output_option_type": "google_bigquery",
            "output_option": {
                "bigquery_output_option": {
                    "project_id": "corp-dw",
                    "dataset_id": "events",
                    "table_id": "clicks"
                }
            }
        });

        assert_eq!(
            summarize_connectors(&suffixed).output,
            Some(ConnectorSummary::ColumnarStore {
                project: "corp-dw".to_string(),
                dataset: "events".to_string(),
                table: "clicks".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_type_and_missing_options_yield_empty() {
        let unknown = json!({
            "input_option_type": "mysql",
            "input_option": {"host": "db.internal"}
        });
        assert!(summarize_connectors(&unknown).is_empty());

        let missing = json!({"input_option_type": "s3"});
        assert!(summarize_connectors(&missing).is_empty());

        assert!(summarize_connectors(&json!({})).is_empty());
    }
}
