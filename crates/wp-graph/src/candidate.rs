//! Decoding untrusted generator output
//!
//! The text generator returns a JSON candidate that may be missing fields,
//! carry wrongly-typed values, or reference ids that do not exist. Every
//! record is read field by field from the raw JSON object so a single bad
//! value never rejects the whole document. Records that cannot be identified
//! are dropped; everything else gets an empty default. The decoded program
//! is then passed through [`Program::sanitize`].

use crate::error::DecodeError;
use crate::ids::{ControlId, RiskId};
use crate::model::{Control, ControlType, Procedure, Program, Rating, Risk};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::collections::HashSet;

type Object = Map<String, Value>;

impl Program {
    /// Decode a candidate program from generator JSON and sanitize it
    ///
    /// # Errors
    /// Returns [`DecodeError`] if the payload is not JSON or its root is not
    /// an object. Malformed records inside a valid document are dropped or
    /// defaulted, never reported.
    pub fn from_candidate_json(json: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_candidate_value(&value)
    }

    /// Decode a candidate program from an already-parsed JSON value
    ///
    /// # Errors
    /// Returns [`DecodeError::NotAnObject`] if the root is not an object.
    pub fn from_candidate_value(value: &Value) -> Result<Self, DecodeError> {
        let root = value
            .as_object()
            .ok_or_else(|| DecodeError::NotAnObject(json_type(value)))?;

        let risks = decode_records(root, &["risks"], decode_risk, |r| r.id.to_string());
        let controls = decode_records(root, &["controls"], decode_control, |c| c.id.to_string());
        let audit_procedures = records(root, &["auditProcedures", "audit_procedures", "procedures"])
            .filter_map(decode_procedure)
            .collect();

        let candidate = Self {
            risks,
            controls,
            audit_procedures,
            analytics_tests: Vec::new(),
        };
        Ok(candidate.sanitize())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Iterate the object elements of the first array found under `keys`
fn records<'a>(root: &'a Object, keys: &[&str]) -> impl Iterator<Item = &'a Object> + 'a {
    let array = keys
        .iter()
        .find_map(|k| root.get(*k).and_then(Value::as_array));
    array.into_iter().flatten().filter_map(Value::as_object)
}

/// Decode an entity collection, dropping unidentifiable and duplicate records
fn decode_records<T>(
    root: &Object,
    keys: &[&str],
    decode: impl Fn(&Object) -> Option<T>,
    key_of: impl Fn(&T) -> String,
) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (i, record) in records(root, keys).enumerate() {
        let Some(entity) = decode(record) else {
            tracing::warn!(collection = keys[0], index = i, "dropping record without id");
            continue;
        };
        let key = key_of(&entity);
        if seen.insert(key.clone()) {
            out.push(entity);
        } else {
            tracing::warn!(collection = keys[0], id = %key, "dropping duplicate id");
        }
    }
    out
}

fn first<'a>(obj: &'a Object, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text(obj: &Object, keys: &[&str]) -> String {
    first(obj, keys).and_then(scalar_text).unwrap_or_default()
}

fn identifier(obj: &Object, keys: &[&str]) -> Option<String> {
    Some(text(obj, keys)).filter(|s| !s.is_empty())
}

/// Accept either an array of scalars or a single comma-separated string
fn text_list(obj: &Object, keys: &[&str]) -> Vec<String> {
    match first(obj, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_risk(obj: &Object) -> Option<Risk> {
    let id = identifier(obj, &["id", "riskId"])?;
    let regulatory = text_list(obj, &["regulatoryRefs", "regulatory_refs"]);
    Some(Risk {
        id: RiskId::new(id),
        category: text(obj, &["category"]),
        description: text(obj, &["description"]),
        rating: Rating::parse_lenient(&text(obj, &["rating"])).unwrap_or_default(),
        assertion: text(obj, &["assertion"]),
        related_controls: text_list(obj, &["relatedControls", "related_controls"])
            .into_iter()
            .map(ControlId::new)
            .collect::<IndexSet<_>>(),
        framework_reference: text(obj, &["frameworkReference", "framework_reference"]),
        regulatory_refs: (!regulatory.is_empty()).then_some(regulatory),
    })
}

fn decode_control(obj: &Object) -> Option<Control> {
    let id = identifier(obj, &["id", "controlId"])?;
    Some(Control {
        id: ControlId::new(id),
        description: text(obj, &["description"]),
        control_type: ControlType::parse_lenient(&text(obj, &["type", "controlType"]))
            .unwrap_or_default(),
        frequency: text(obj, &["frequency"]),
        owner: text(obj, &["owner"]),
        mitigates_risks: text_list(obj, &["mitigatesRisks", "mitigates_risks"])
            .into_iter()
            .map(RiskId::new)
            .collect(),
        framework_reference: text(obj, &["frameworkReference", "framework_reference"]),
    })
}

fn decode_procedure(obj: &Object) -> Option<Procedure> {
    let Some(control_id) = identifier(obj, &["controlId", "control_id"]) else {
        tracing::warn!("dropping procedure without controlId");
        return None;
    };
    Some(Procedure {
        control_id: ControlId::new(control_id),
        procedure: text(obj, &["procedure"]),
        testing_method: text(obj, &["testingMethod", "testing_method"]),
        sample_size: text(obj, &["sampleSize", "sample_size"]),
        expected_evidence: text(obj, &["expectedEvidence", "expected_evidence"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_root() {
        let err = Program::from_candidate_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject("array")));
        assert!(Program::from_candidate_json("{not json").is_err());
    }

    #[test]
    fn missing_collections_decode_to_empty_program() {
        let program = Program::from_candidate_value(&json!({})).unwrap();
        assert_eq!(program, Program::new());
    }

    #[test]
    fn defaults_missing_fields_and_drops_unidentified_records() {
        let program = Program::from_candidate_value(&json!({
            "risks": [
                { "id": "R001", "description": "Duplicate payments", "rating": "HIGH" },
                { "description": "no id" },
                "not an object"
            ],
            "controls": [
                { "id": "C001", "type": "detective", "mitigatesRisks": "R001, R404" }
            ],
            "auditProcedures": [
                { "controlId": "C001", "sampleSize": 25 },
                { "procedure": "orphaned" }
            ]
        }))
        .unwrap();

        assert_eq!(program.risks.len(), 1);
        assert_eq!(program.risks[0].rating, Rating::High);
        assert_eq!(program.risks[0].category, "");
        assert_eq!(program.controls[0].control_type, ControlType::Detective);
        // R404 does not exist and is removed by sanitize
        assert_eq!(
            program.controls[0].mitigates_risks.iter().collect::<Vec<_>>(),
            vec![&RiskId::new("R001")]
        );
        assert_eq!(program.audit_procedures.len(), 1);
        assert_eq!(program.audit_procedures[0].sample_size, "25");
    }

    #[test]
    fn drops_duplicate_ids_keeping_first() {
        let program = Program::from_candidate_value(&json!({
            "risks": [
                { "id": "R001", "description": "first" },
                { "id": "R001", "description": "second" }
            ]
        }))
        .unwrap();
        assert_eq!(program.risks.len(), 1);
        assert_eq!(program.risks[0].description, "first");
    }

    #[test]
    fn wrong_typed_fields_default_instead_of_failing() {
        let program = Program::from_candidate_value(&json!({
            "risks": [{ "id": "R001", "description": { "nested": true }, "relatedControls": 7 }]
        }))
        .unwrap();
        assert_eq!(program.risks[0].description, "");
        assert!(program.risks[0].related_controls.is_empty());
    }
}
