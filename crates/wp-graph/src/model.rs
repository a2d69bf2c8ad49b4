//! Working-paper data model
//!
//! Defines the entities of a program snapshot:
//! - [`Risk`] and [`Control`], linked many-to-many by id
//! - [`Procedure`], attached to exactly one control
//! - [`AnalyticsTest`], optionally attached to one risk
//!
//! Cross-reference collections are ordered sets so duplicate links cannot
//! be represented.

use crate::ids::{ControlId, RiskId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Risk rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rating {
    /// High inherent risk
    High,
    /// Medium inherent risk
    #[default]
    Medium,
    /// Low inherent risk
    Low,
}

impl Rating {
    /// Parse a rating case-insensitively
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Some(Self::High),
            "medium" | "med" | "moderate" | "m" => Some(Self::Medium),
            "low" | "l" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Control nature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlType {
    /// Stops an error before it happens
    #[default]
    Preventive,
    /// Finds an error after it happened
    Detective,
    /// Fixes an error that was found
    Corrective,
}

impl ControlType {
    /// Parse a control type case-insensitively
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "preventive" | "preventative" => Some(Self::Preventive),
            "detective" => Some(Self::Detective),
            "corrective" => Some(Self::Corrective),
            _ => None,
        }
    }
}

/// A described threat to an audit objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    /// Sequence id (`R001`)
    pub id: RiskId,
    /// Risk category (e.g. "Fraud", "Financial Reporting")
    pub category: String,
    /// Free-text description
    pub description: String,
    /// Inherent rating
    pub rating: Rating,
    /// Financial statement assertion
    pub assertion: String,
    /// Controls mitigating this risk
    pub related_controls: IndexSet<ControlId>,
    /// Framework reference (e.g. COSO component)
    pub framework_reference: String,
    /// Optional regulatory references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulatory_refs: Option<Vec<String>>,
}

/// A documented activity mitigating one or more risks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    /// Sequence id (`C001`)
    pub id: ControlId,
    /// Free-text description
    pub description: String,
    /// Control nature
    #[serde(rename = "type")]
    pub control_type: ControlType,
    /// Operating frequency (e.g. "Monthly")
    pub frequency: String,
    /// Responsible role
    pub owner: String,
    /// Risks this control mitigates
    pub mitigates_risks: IndexSet<RiskId>,
    /// Framework reference
    pub framework_reference: String,
}

/// A test step validating one control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    /// Control under test
    pub control_id: ControlId,
    /// Procedure text
    pub procedure: String,
    /// Inspection, observation, re-performance, ...
    pub testing_method: String,
    /// Sample size as written by the author (e.g. "25", "All items")
    pub sample_size: String,
    /// Evidence expected from the auditee
    pub expected_evidence: String,
}

/// A catalogued data analytics test attached to a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTest {
    /// Catalogue id (e.g. `P2P-01`)
    pub id: String,
    /// Display name
    pub name: String,
    /// Fields the rule needs mapped to columns
    pub required_fields: Vec<String>,
    /// Registered rule executing this test
    pub rule_id: String,
    /// Associated risk, if any
    pub risk_id: Option<RiskId>,
    /// Whether the test is part of the working paper
    pub included: bool,
}

/// Program snapshot exchanged with the UI and export layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    /// Risks in display order
    #[serde(default)]
    pub risks: Vec<Risk>,
    /// Controls in display order
    #[serde(default)]
    pub controls: Vec<Control>,
    /// Audit procedures in display order
    #[serde(default)]
    pub audit_procedures: Vec<Procedure>,
    /// Analytics tests attached to the program's process
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analytics_tests: Vec<AnalyticsTest>,
}

impl Program {
    /// Create empty program
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a risk by id
    #[must_use]
    pub fn risk(&self, id: &RiskId) -> Option<&Risk> {
        self.risks.iter().find(|r| &r.id == id)
    }

    /// Look up a control by id
    #[must_use]
    pub fn control(&self, id: &ControlId) -> Option<&Control> {
        self.controls.iter().find(|c| &c.id == id)
    }

    /// Look up an analytics test by id
    #[must_use]
    pub fn analytics_test(&self, id: &str) -> Option<&AnalyticsTest> {
        self.analytics_tests.iter().find(|t| t.id == id)
    }

    /// Procedures attached to a control
    pub fn procedures_for<'a>(&'a self, id: &'a ControlId) -> impl Iterator<Item = &'a Procedure> + 'a {
        self.audit_procedures.iter().filter(move |p| &p.control_id == id)
    }

    pub(crate) fn risk_mut(&mut self, id: &RiskId) -> Option<&mut Risk> {
        self.risks.iter_mut().find(|r| &r.id == id)
    }

    pub(crate) fn control_mut(&mut self, id: &ControlId) -> Option<&mut Control> {
        self.controls.iter_mut().find(|c| &c.id == id)
    }
}

/// New risk content; the id is assigned on insertion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskDraft {
    /// Risk category
    pub category: String,
    /// Description
    pub description: String,
    /// Rating
    pub rating: Rating,
    /// Assertion
    pub assertion: String,
    /// Controls to link on insertion
    pub related_controls: Vec<ControlId>,
    /// Framework reference
    pub framework_reference: String,
    /// Regulatory references
    pub regulatory_refs: Option<Vec<String>>,
}

impl RiskDraft {
    /// Create draft with a description
    #[inline]
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// With category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// With rating
    #[inline]
    #[must_use]
    pub fn with_rating(mut self, rating: Rating) -> Self {
        self.rating = rating;
        self
    }

    /// Link a control on insertion
    #[inline]
    #[must_use]
    pub fn linked_to(mut self, control: ControlId) -> Self {
        self.related_controls.push(control);
        self
    }
}

/// New control content; the id is assigned on insertion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlDraft {
    /// Description
    pub description: String,
    /// Control nature
    #[serde(rename = "type")]
    pub control_type: ControlType,
    /// Frequency
    pub frequency: String,
    /// Owner
    pub owner: String,
    /// Risks to link on insertion
    pub mitigates_risks: Vec<RiskId>,
    /// Framework reference
    pub framework_reference: String,
}

impl ControlDraft {
    /// Create draft with a description
    #[inline]
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// With control type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, control_type: ControlType) -> Self {
        self.control_type = control_type;
        self
    }

    /// Link a risk on insertion
    #[inline]
    #[must_use]
    pub fn mitigating(mut self, risk: RiskId) -> Self {
        self.mitigates_risks.push(risk);
        self
    }
}

/// Descriptive risk fields to overwrite; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskUpdate {
    /// New category
    pub category: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New rating
    pub rating: Option<Rating>,
    /// New assertion
    pub assertion: Option<String>,
    /// New framework reference
    pub framework_reference: Option<String>,
    /// New regulatory references
    pub regulatory_refs: Option<Vec<String>>,
}

/// Descriptive control fields to overwrite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlUpdate {
    /// New description
    pub description: Option<String>,
    /// New control nature
    #[serde(rename = "type")]
    pub control_type: Option<ControlType>,
    /// New frequency
    pub frequency: Option<String>,
    /// New owner
    pub owner: Option<String>,
    /// New framework reference
    pub framework_reference: Option<String>,
}

/// Procedure fields to overwrite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcedureUpdate {
    /// Re-target the procedure at another control
    pub control_id: Option<ControlId>,
    /// New procedure text
    pub procedure: Option<String>,
    /// New testing method
    pub testing_method: Option<String>,
    /// New sample size
    pub sample_size: Option<String>,
    /// New expected evidence
    pub expected_evidence: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_parse_lenient() {
        assert_eq!(Rating::parse_lenient(" HIGH "), Some(Rating::High));
        assert_eq!(Rating::parse_lenient("moderate"), Some(Rating::Medium));
        assert_eq!(Rating::parse_lenient("critical"), None);
    }

    #[test]
    fn control_type_parse_lenient() {
        assert_eq!(ControlType::parse_lenient("Preventative"), Some(ControlType::Preventive));
        assert_eq!(ControlType::parse_lenient("detective"), Some(ControlType::Detective));
        assert_eq!(ControlType::parse_lenient("manual"), None);
    }

    #[test]
    fn control_serializes_type_field() {
        let control = Control {
            id: ControlId::new("C001"),
            description: "Three-way match".into(),
            control_type: ControlType::Detective,
            frequency: "Per transaction".into(),
            owner: "AP Manager".into(),
            mitigates_risks: IndexSet::from([RiskId::new("R001")]),
            framework_reference: "COSO CA".into(),
        };
        let json = serde_json::to_value(&control).unwrap();
        assert_eq!(json["type"], "Detective");
        assert_eq!(json["mitigatesRisks"][0], "R001");
    }

    #[test]
    fn program_snapshot_omits_empty_tests() {
        let json = serde_json::to_value(Program::new()).unwrap();
        assert!(json.get("analyticsTests").is_none());
        assert!(json["auditProcedures"].as_array().unwrap().is_empty());
    }
}
