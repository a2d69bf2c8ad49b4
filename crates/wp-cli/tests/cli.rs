use pretty_assertions::assert_eq;
use serde_json::Value;
use std::path::Path;
use wp_cli::{command, execute, global_flag};
use wp_test_utils::{dangling_candidate_json, p2p_dataset};

fn run(args: &[&str]) -> (bool, Value) {
    let matches = command()
        .try_get_matches_from(std::iter::once("wp").chain(args.iter().copied()))
        .unwrap();
    let mut out: Vec<u8> = Vec::new();
    let ok = execute(&matches, &mut out).unwrap();
    (ok, serde_json::from_slice(&out).unwrap())
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn sanitize_prints_clean_program() {
    let dir = tempfile::tempdir().unwrap();
    let program = write(dir.path(), "program.json", &dangling_candidate_json());

    let (ok, out) = run(&["sanitize", &program]);
    assert!(ok);
    assert_eq!(out["risks"].as_array().unwrap().len(), 2);
    assert_eq!(out["auditProcedures"].as_array().unwrap().len(), 1);
    assert_eq!(out["controls"][0]["mitigatesRisks"], serde_json::json!(["R001", "R002"]));
}

#[test]
fn sanitize_can_renumber() {
    let dir = tempfile::tempdir().unwrap();
    let program = write(
        dir.path(),
        "program.json",
        r#"{"risks": [{"id": "R007", "relatedControls": ["C100"]}], "controls": [{"id": "C100", "mitigatesRisks": ["R007"]}]}"#,
    );

    let (_, out) = run(&["sanitize", "--renumber", &program]);
    assert_eq!(out["risks"][0]["id"], "R001");
    assert_eq!(out["risks"][0]["relatedControls"], serde_json::json!(["C001"]));
    assert_eq!(out["controls"][0]["mitigatesRisks"], serde_json::json!(["R001"]));
}

#[test]
fn orphans_report() {
    let dir = tempfile::tempdir().unwrap();
    let program = write(dir.path(), "program.json", &dangling_candidate_json());

    let (_, out) = run(&["orphans", &program]);
    assert_eq!(out["summary"]["risks"], 2);
    assert_eq!(out["orphans"]["unmitigatedRisks"], serde_json::json!([]));
    assert_eq!(out["orphans"]["untestedControls"], serde_json::json!([]));
}

#[test]
fn map_tests_attaches_process_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let program = write(dir.path(), "program.json", &dangling_candidate_json());

    let (_, out) = run(&["map-tests", &program, "--process", "p2p"]);
    let tests = out["analyticsTests"].as_array().unwrap();
    assert_eq!(tests.len(), 4);
    assert_eq!(tests[0]["id"], "P2P-01");
    assert_eq!(tests[0]["riskId"], "R001");
}

#[test]
fn resolve_reports_mapping_and_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = serde_json::to_string(&p2p_dataset()).unwrap();
    let dataset = write(dir.path(), "dataset.json", &dataset);

    let (_, out) = run(&["resolve", "--test", "P2P-01", &dataset]);
    assert_eq!(out["columnMapping"], serde_json::json!({"Vendor ID": 0, "Invoice Number": 1}));
    assert_eq!(out["unresolved"], serde_json::json!([]));

    let (_, out) = run(&["resolve", "--test", "PAY-01", &dataset]);
    assert_eq!(out["unresolved"], serde_json::json!(["Employee ID"]));
}

#[test]
fn run_uses_configured_sample_cap() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "engine.toml", "sample_cap = 2\n");
    let request = write(
        dir.path(),
        "request.json",
        r#"{"testId": "P2P-03", "columnMapping": {"Amount": 0}, "rows": [[-1], [-2], [-3], [4]]}"#,
    );

    let (ok, out) = run(&["run", &request, "--config", &config]);
    assert!(ok);
    assert_eq!(out["exceptionCount"], 3);
    assert_eq!(out["totalRows"], 4);
    assert_eq!(out["sampleRows"].as_array().unwrap().len(), 2);
}

#[test]
fn failed_run_reports_without_erroring() {
    let dir = tempfile::tempdir().unwrap();
    let request = write(dir.path(), "request.json", r#"{"testId": "P2P-03", "rows": []}"#);

    let (ok, out) = run(&["run", &request]);
    assert!(!ok);
    assert_eq!(out["success"], false);
    assert_eq!(out["error"], "missing columnMapping");
}

#[test]
fn catalogue_filters_by_process() {
    let (_, all) = run(&["catalogue"]);
    let (_, payroll) = run(&["catalogue", "--process", "payroll"]);
    assert_eq!(all.as_array().unwrap().len(), 12);
    assert!(payroll
        .as_array()
        .unwrap()
        .iter()
        .all(|t| t["process"] == "payroll"));
}

#[test]
fn unknown_process_is_an_error() {
    let matches = command()
        .try_get_matches_from(["wp", "catalogue", "--process", "treasury"])
        .unwrap();
    assert!(execute(&matches, &mut Vec::<u8>::new()).is_err());
}

#[test]
fn json_logs_flag_is_global() {
    let matches = command()
        .try_get_matches_from(["wp", "catalogue", "--json-logs"])
        .unwrap();
    assert!(global_flag(&matches, "json-logs"));
}
