//! Testing utilities for the working paper workspace
//!
//! Shared fixture programs, candidate documents, and datasets.

#![allow(missing_docs)]

use wp_analytics::{Cell, ColumnMapping, Dataset, Row};
use wp_graph::{ControlDraft, ControlId, ControlType, Procedure, Program, Rating, RiskDraft};

pub fn procedure(control: &str, text: &str) -> Procedure {
    Procedure {
        control_id: ControlId::new(control),
        procedure: text.to_string(),
        testing_method: "Inspection".to_string(),
        sample_size: "25".to_string(),
        expected_evidence: "Signed approval".to_string(),
    }
}

/// Three risks, three controls:
///
/// - R001 <-> C001, R002 <-> C001, R002 <-> C002
/// - R003 and C003 unlinked
/// - procedures on C001 and C002 only
pub fn sample_program() -> Program {
    let program = Program::new();
    let (program, r1) = program.add_risk(
        RiskDraft::new("Duplicate vendor invoices are paid twice")
            .with_category("Fraud")
            .with_rating(Rating::High),
    );
    let (program, r2) = program.add_risk(RiskDraft::new("Ghost employees receive payroll"));
    let (program, _) = program.add_risk(RiskDraft::new("Excessive discounts granted").with_rating(Rating::Low));

    let (program, c1) = program.add_control(ControlDraft::new("Three-way match before payment"));
    let (program, c2) = program.add_control(
        ControlDraft::new("HR reconciles payroll to headcount").with_type(ControlType::Detective),
    );
    let (program, _) = program.add_control(ControlDraft::new("Pricing committee review"));

    program
        .link(&r1, &c1, true)
        .and_then(|p| p.link(&r2, &c1, true))
        .and_then(|p| p.link(&r2, &c2, true))
        .and_then(|p| p.add_procedure(procedure("C001", "Reperform match for sampled invoices")))
        .and_then(|p| p.add_procedure(procedure("C002", "Inspect monthly reconciliation")))
        .unwrap()
}

/// The deletion example: R001..R003 and one control mitigating R002 and R003
pub fn renumbering_program() -> Program {
    let (program, _) = Program::new().add_risk(RiskDraft::new("first"));
    let (program, r2) = program.add_risk(RiskDraft::new("second"));
    let (program, r3) = program.add_risk(RiskDraft::new("third"));
    let (program, _) = program.add_control(ControlDraft::new("control").mitigating(r2).mitigating(r3));
    program
}

/// Generator output with dangling references on both sides, a procedure on
/// a missing control, a record without an id, and loosely typed fields
pub fn dangling_candidate_json() -> String {
    serde_json::json!({
        "risks": [
            {
                "id": "R001",
                "category": "Fraud",
                "description": "Duplicate payments",
                "rating": "HIGH",
                "assertion": "Occurrence",
                "relatedControls": ["C001", "C009"],
                "frameworkReference": "COSO CA"
            },
            {
                "id": "R002",
                "description": "Unapproved vendors",
                "rating": "severe",
                "relatedControls": "C001, C002"
            },
            { "description": "no id, dropped" }
        ],
        "controls": [
            {
                "id": "C001",
                "description": "Duplicate invoice check",
                "type": "detective",
                "frequency": "Daily",
                "owner": "AP Manager",
                "mitigatesRisks": ["R001", "R002", "R404"]
            }
        ],
        "auditProcedures": [
            { "controlId": "C001", "procedure": "Reperform", "sampleSize": 25 },
            { "controlId": "C404", "procedure": "Orphaned" },
            { "procedure": "No control" }
        ]
    })
    .to_string()
}

pub fn text_rows(rows: &[&[&str]]) -> Vec<Row> {
    rows.iter()
        .map(|r| r.iter().map(|c| Cell::from(*c)).collect())
        .collect()
}

pub fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

pub fn mapping(pairs: &[(&str, usize)]) -> ColumnMapping {
    pairs.iter().map(|(f, c)| (*f, *c)).collect()
}

/// Payroll extract with one duplicated employee, one bank account shared by
/// two employees, and one negative net pay
pub fn payroll_dataset() -> Dataset {
    Dataset::new(
        headers(&["EmpNo", "Full Name", "Bank Acct No", "Net Pay"]),
        vec![
            vec!["E001".into(), "Ada".into(), "GB01".into(), Cell::Number(2_500.0)],
            vec!["E002".into(), "Ben".into(), "GB02".into(), Cell::Number(2_100.0)],
            vec!["E003".into(), "Cy".into(), "GB02".into(), "(150.00)".into()],
            vec!["E001".into(), "Ada".into(), "GB01".into(), "2,500".into()],
            vec!["E004".into(), "Di".into(), "".into(), "n/a".into()],
        ],
    )
}

/// Accounts payable extract with one duplicated vendor invoice and one
/// negative line
pub fn p2p_dataset() -> Dataset {
    Dataset::new(
        headers(&["Supplier", "Inv No", "Amt", "Bank Account"]),
        vec![
            vec!["V1".into(), "INV-1".into(), Cell::Number(120.0), "ACC1".into()],
            vec!["V1".into(), "INV-2".into(), Cell::Number(-40.0), "ACC1".into()],
            vec!["V2".into(), "INV-1".into(), Cell::Number(15_000.0), "ACC2".into()],
            vec!["V1".into(), " INV-1".into(), Cell::Number(120.0), "ACC1".into()],
        ],
    )
}
