use pretty_assertions::assert_eq;
use wp_graph::{ControlId, ControlType, EntityId, Program, Rating, RiskId};
use wp_test_utils::dangling_candidate_json;

#[test]
fn generator_output_is_sanitized_on_entry() {
    let program = Program::from_candidate_json(&dangling_candidate_json()).unwrap();

    let risks: Vec<&str> = program.risks.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(risks, vec!["R001", "R002"]);

    let r1 = program.risk(&RiskId::new("R001")).unwrap();
    assert_eq!(r1.rating, Rating::High);
    assert_eq!(r1.related_controls.iter().collect::<Vec<_>>(), vec![&ControlId::new("C001")]);

    let r2 = program.risk(&RiskId::new("R002")).unwrap();
    assert_eq!(r2.rating, Rating::Medium);
    assert_eq!(r2.related_controls.len(), 1);

    let c1 = program.control(&ControlId::new("C001")).unwrap();
    assert_eq!(c1.control_type, ControlType::Detective);
    assert_eq!(
        c1.mitigates_risks.iter().map(RiskId::as_str).collect::<Vec<_>>(),
        vec!["R001", "R002"]
    );

    assert_eq!(program.audit_procedures.len(), 1);
    assert_eq!(program.audit_procedures[0].sample_size, "25");
    assert!(program.integrity_violations().is_empty());
}

#[test]
fn decoded_program_is_a_sanitize_fixed_point() {
    let program = Program::from_candidate_json(&dangling_candidate_json()).unwrap();
    assert_eq!(program.sanitize(), program);
}

#[test]
fn snapshot_round_trips_through_wire_shape() {
    let program = Program::from_candidate_json(&dangling_candidate_json()).unwrap();
    let wire = serde_json::to_value(&program).unwrap();

    assert!(wire.get("auditProcedures").is_some());
    assert!(wire.get("analyticsTests").is_none());
    assert_eq!(wire["controls"][0]["type"], "Detective");

    let back: Program = serde_json::from_value(wire).unwrap();
    assert_eq!(back, program);
}

#[test]
fn non_object_root_is_rejected() {
    assert!(Program::from_candidate_json("[1, 2]").is_err());
    assert!(Program::from_candidate_json("{not json").is_err());
}
