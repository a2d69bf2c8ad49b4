//! Generation-to-report flow across both library crates
//!
//! Candidate JSON is decoded into a program, catalogue tests are attached
//! by keyword, columns are suggested from headers, and the tests run over
//! the fixture datasets.

use pretty_assertions::assert_eq;
use wp_analytics::{
    attach_process_tests, invoke_json, Catalogue, EngineConfig, Process, TestEngine, TestRequest,
};
use wp_graph::{Program, RiskId};
use wp_test_utils::{dangling_candidate_json, p2p_dataset, payroll_dataset, sample_program};

#[test]
fn payroll_tests_resolve_and_run() {
    let engine = TestEngine::with_defaults();
    let dataset = payroll_dataset();

    let mapping = engine.suggest_mapping("PAY-01", &dataset.headers).unwrap();
    assert_eq!(mapping.get("Employee ID"), Some(0));
    let duplicates = engine.run_dataset("PAY-01", &mapping, &dataset).unwrap();
    assert_eq!(duplicates.exception_indices, vec![0, 3]);

    let mapping = engine.suggest_mapping("PAY-02", &dataset.headers).unwrap();
    assert_eq!(mapping.get("Bank Account"), Some(2));
    let shared = engine.run_dataset("PAY-02", &mapping, &dataset).unwrap();
    assert_eq!(shared.exception_indices, vec![1, 2]);

    let mapping = engine.suggest_mapping("PAY-03", &dataset.headers).unwrap();
    let negative = engine.run_dataset("PAY-03", &mapping, &dataset).unwrap();
    assert_eq!(negative.exception_indices, vec![2]);
    assert_eq!(negative.total_rows, 5);
}

#[test]
fn p2p_duplicate_invoices_need_both_key_fields() {
    let engine = TestEngine::with_defaults();
    let dataset = p2p_dataset();

    let mapping = engine.suggest_mapping("P2P-01", &dataset.headers).unwrap();
    assert_eq!(mapping.get("Vendor ID"), Some(0));
    assert_eq!(mapping.get("Invoice Number"), Some(1));

    let outcome = engine.run_dataset("P2P-01", &mapping, &dataset).unwrap();
    assert_eq!(outcome.exception_indices, vec![0, 3]);

    let mapping = engine.suggest_mapping("P2P-04", &dataset.headers).unwrap();
    let over_limit = engine.run_dataset("P2P-04", &mapping, &dataset).unwrap();
    assert_eq!(over_limit.exception_indices, vec![2]);
}

#[test]
fn invocation_over_fixture_dataset() {
    let engine = TestEngine::from_config(EngineConfig::default().with_sample_cap(1));
    let dataset = p2p_dataset();
    let mapping = engine.suggest_mapping("P2P-03", &dataset.headers).unwrap();
    let request = TestRequest::new("P2P-03", &mapping, dataset.rows.clone()).with_headers(dataset.headers.clone());

    let response = invoke_json(&engine, &serde_json::to_string(&request).unwrap());
    assert!(response.success);
    assert_eq!(response.exception_count, 1);
    assert_eq!(response.sample_rows, vec![dataset.rows[1].clone()]);
    assert_eq!(response.headers, dataset.headers);
}

#[test]
fn generated_program_gets_catalogue_tests() {
    let program = Program::from_candidate_json(&dangling_candidate_json()).unwrap();
    let attached = attach_process_tests(&program, &Catalogue::builtin(), Process::ProcureToPay);

    assert_eq!(attached.analytics_tests.len(), 4);
    assert!(attached.analytics_tests.iter().all(|t| t.included));
    assert_eq!(attached.risks, program.risks);
    assert!(attached.integrity_violations().is_empty());
}

#[test]
fn mapping_is_not_rerun_on_edit() {
    let attached = attach_process_tests(&sample_program(), &Catalogue::builtin(), Process::ProcureToPay);
    let p2p01 = attached.analytics_test("P2P-01").unwrap();
    assert_eq!(p2p01.risk_id, Some(RiskId::new("R001")));

    let edited = attached.delete_risk(&RiskId::new("R001")).unwrap();
    assert_eq!(edited.analytics_test("P2P-01").unwrap().risk_id, None);
    assert_eq!(edited.analytics_tests.len(), attached.analytics_tests.len());

    let reassigned = edited.assign_test_risk("P2P-01", Some(RiskId::new("R001"))).unwrap();
    assert_eq!(reassigned.analytics_test("P2P-01").unwrap().risk_id, Some(RiskId::new("R001")));
}
