//! Test invocation wire types
//!
//! Request:
//!
//! ```json
//! { "testId": "P2P-01", "columnMapping": {"Vendor ID": 0}, "rows": [[...]], "headers": [...] }
//! ```
//!
//! Response:
//!
//! ```json
//! { "success": true, "exceptionCount": 437, "totalRows": 5000, "headers": [...], "sampleRows": [[...]] }
//! ```
//!
//! Failures come back as `success: false` with a user-facing `error`; the
//! internal cause is logged, never returned.

use crate::dataset::Row;
use crate::engine::TestEngine;
use crate::error::EngineError;
use crate::resolver::ColumnMapping;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Incoming test request; every field is optional on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    /// Catalogue test id
    pub test_id: Option<String>,
    /// Field name to column index
    pub column_mapping: Option<IndexMap<String, i64>>,
    /// Data rows
    pub rows: Option<Vec<Row>>,
    /// Header row, echoed in the response
    #[serde(default)]
    pub headers: Vec<String>,
}

impl TestRequest {
    /// Create a complete request
    #[must_use]
    pub fn new(test_id: impl Into<String>, mapping: &ColumnMapping, rows: Vec<Row>) -> Self {
        Self {
            test_id: Some(test_id.into()),
            column_mapping: Some(
                mapping
                    .iter()
                    .map(|(field, column)| (field.to_string(), i64::try_from(column).unwrap_or(i64::MAX)))
                    .collect(),
            ),
            rows: Some(rows),
            headers: Vec::new(),
        }
    }

    /// With header row
    #[inline]
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.headers = headers;
        self
    }

    fn test_id(&self) -> Result<&str, EngineError> {
        self.test_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EngineError::Validation("missing testId".into()))
    }

    fn mapping(&self) -> Result<ColumnMapping, EngineError> {
        let raw = self
            .column_mapping
            .as_ref()
            .ok_or_else(|| EngineError::Validation("missing columnMapping".into()))?;
        raw.iter()
            .map(|(field, index)| {
                usize::try_from(*index)
                    .map(|column| (field.clone(), column))
                    .map_err(|_| EngineError::Validation(format!("negative column index for '{field}'")))
            })
            .collect()
    }
}

/// Outgoing test response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResponse {
    /// Whether the test ran
    pub success: bool,
    /// Number of exceptions over the full dataset
    pub exception_count: usize,
    /// Number of input rows
    pub total_rows: usize,
    /// Header row from the request
    pub headers: Vec<String>,
    /// Up to the configured cap of exception rows
    pub sample_rows: Vec<Row>,
    /// User-facing failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResponse {
    /// Failure response for an engine error
    #[must_use]
    pub fn failure(err: &EngineError) -> Self {
        Self {
            success: false,
            error: Some(err.user_message()),
            ..Self::default()
        }
    }
}

/// Execute a decoded request
#[must_use]
pub fn invoke(engine: &TestEngine, request: TestRequest) -> TestResponse {
    match execute(engine, request) {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "test invocation failed");
            TestResponse::failure(&err)
        }
    }
}

/// Decode and execute a JSON request
#[must_use]
pub fn invoke_json(engine: &TestEngine, json: &str) -> TestResponse {
    match serde_json::from_str::<TestRequest>(json) {
        Ok(request) => invoke(engine, request),
        Err(err) => {
            let err = EngineError::Validation(format!("malformed request: {err}"));
            tracing::warn!(error = %err, "test invocation rejected");
            TestResponse::failure(&err)
        }
    }
}

fn execute(engine: &TestEngine, request: TestRequest) -> Result<TestResponse, EngineError> {
    let test_id = request.test_id()?.to_string();
    let mapping = request.mapping()?;
    let TestRequest { rows, headers, .. } = request;
    let rows = rows.ok_or_else(|| EngineError::Validation("missing rows".into()))?;

    if !headers.is_empty() {
        engine.check_columns(&test_id, &mapping, headers.len())?;
    }
    let outcome = engine.run(&test_id, &mapping, &rows)?;
    let sample_rows = outcome.sample(engine.config().sample_cap).to_vec();

    Ok(TestResponse {
        success: true,
        exception_count: outcome.exception_count,
        total_rows: outcome.total_rows,
        headers,
        sample_rows,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dataset::Cell;
    use crate::error::MAPPING_HINT;
    use pretty_assertions::assert_eq;

    #[test]
    fn sample_is_capped_at_configured_limit() {
        let engine = TestEngine::with_defaults();
        let rows: Vec<Row> = (0..1_000)
            .map(|i| vec![Cell::Number(if i < 437 { -1.0 } else { 1.0 })])
            .collect();
        let request = TestRequest::new("PAY-03", &ColumnMapping::new().with("Net Pay", 0), rows);

        let response = invoke(&engine, request);
        assert!(response.success);
        assert_eq!(response.exception_count, 437);
        assert_eq!(response.total_rows, 1_000);
        assert_eq!(response.sample_rows.len(), 100);
    }

    #[test]
    fn smaller_cap_from_config() {
        let engine = TestEngine::from_config(EngineConfig::default().with_sample_cap(3));
        let rows: Vec<Row> = (0..10).map(|_| vec![Cell::from("admin")]).collect();
        let request = TestRequest::new("ITA-01", &ColumnMapping::new().with("Access Level", 0), rows);

        let response = invoke(&engine, request);
        assert_eq!(response.exception_count, 10);
        assert_eq!(response.sample_rows.len(), 3);
    }

    #[test]
    fn json_round_trip() {
        let engine = TestEngine::with_defaults();
        let response = invoke_json(
            &engine,
            r#"{
                "testId": "O2C-01",
                "columnMapping": {"Invoice Number": 1},
                "headers": ["Customer", "Invoice Number"],
                "rows": [["C1", "INV1"], ["C2", "INV1"], ["C3", "INV2"]]
            }"#,
        );
        assert!(response.success);
        assert_eq!(response.exception_count, 2);
        assert_eq!(response.headers, vec!["Customer".to_string(), "Invoice Number".to_string()]);

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["exceptionCount"], 2);
        assert_eq!(wire["sampleRows"][1][0], "C2");
        assert!(wire.get("error").is_none());
    }

    #[test]
    fn missing_fields_are_validation_errors() {
        let engine = TestEngine::with_defaults();

        let response = invoke_json(&engine, r#"{"columnMapping": {}, "rows": []}"#);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("missing testId"));

        let response = invoke_json(&engine, r#"{"testId": "P2P-03", "columnMapping": {"Amount": 0}}"#);
        assert_eq!(response.error.as_deref(), Some("missing rows"));

        let response = invoke_json(&engine, r#"{"testId": "P2P-03", "rows": []}"#);
        assert_eq!(response.error.as_deref(), Some("missing columnMapping"));

        let response = invoke_json(&engine, "not json");
        assert!(response.error.unwrap().starts_with("malformed request"));
    }

    #[test]
    fn mapping_failures_use_the_hint() {
        let engine = TestEngine::with_defaults();

        let response = invoke_json(
            &engine,
            r#"{"testId": "P2P-03", "columnMapping": {"Amount": 4}, "headers": ["Amount"], "rows": [[1]]}"#,
        );
        assert_eq!(response.error.as_deref(), Some(MAPPING_HINT));

        let response = invoke_json(&engine, r#"{"testId": "P2P-03", "columnMapping": {}, "rows": [[1]]}"#);
        assert!(response.error.unwrap().ends_with(MAPPING_HINT));
    }

    #[test]
    fn negative_column_index_is_rejected() {
        let engine = TestEngine::with_defaults();
        let response = invoke_json(
            &engine,
            r#"{"testId": "P2P-03", "columnMapping": {"Amount": -1}, "rows": [[1]]}"#,
        );
        assert!(!response.success);
        assert!(response.error.unwrap().contains("negative column index"));
    }

    #[test]
    fn unknown_test_fails_without_rows_being_read() {
        let engine = TestEngine::with_defaults();
        let response = invoke_json(&engine, r#"{"testId": "ZZZ-00", "columnMapping": {}, "rows": [[1]]}"#);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("unknown test 'ZZZ-00'"));
        assert_eq!(response.exception_count, 0);
    }
}
