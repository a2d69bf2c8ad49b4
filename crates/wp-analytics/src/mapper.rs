//! Risk-test mapper
//!
//! Attaches catalogued tests to generated risks by keyword. For each test
//! the first risk (in program order) whose description contains any of the
//! test's keywords, ignoring case, becomes its risk. Unmatched tests keep no
//! risk. Every mapped test starts out included.
//!
//! Mapping runs once at generation time; later edits to risks do not
//! re-run it.

use crate::catalogue::{Catalogue, Process, TestDefinition};
use wp_graph::{AnalyticsTest, Program, Risk};

/// Map tests onto risks
#[must_use]
pub fn map_tests<'a>(tests: impl IntoIterator<Item = &'a TestDefinition>, risks: &[Risk]) -> Vec<AnalyticsTest> {
    let descriptions: Vec<String> = risks.iter().map(|r| r.description.to_lowercase()).collect();

    tests
        .into_iter()
        .map(|test| {
            let keywords: Vec<String> = test
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            let risk_id = descriptions
                .iter()
                .position(|d| keywords.iter().any(|k| d.contains(k.as_str())))
                .map(|i| risks[i].id.clone());

            match &risk_id {
                Some(risk) => tracing::debug!(test = %test.id, %risk, "test mapped"),
                None => tracing::debug!(test = %test.id, "no risk matched"),
            }

            AnalyticsTest {
                id: test.id.clone(),
                name: test.name.clone(),
                required_fields: test.required_fields(),
                rule_id: test.id.clone(),
                risk_id,
                included: true,
            }
        })
        .collect()
}

/// Program with the catalogue tests of `process` attached
#[must_use]
pub fn attach_process_tests(program: &Program, catalogue: &Catalogue, process: Process) -> Program {
    let tests = map_tests(catalogue.for_process(process), &program.risks);
    tracing::info!(
        %process,
        tests = tests.len(),
        mapped = tests.iter().filter(|t| t.risk_id.is_some()).count(),
        "analytics tests attached"
    );
    program.with_analytics_tests(tests)
}
