//! Program mutations
//!
//! Every operation borrows the current program and returns a new one; the
//! caller owns the update/persist cycle. Operations either succeed and
//! leave every cross-reference consistent, or fail with a [`GraphError`]
//! and leave the input untouched.
//!
//! # Renumbering
//!
//! Deleting a risk or control renumbers the survivors so ids stay dense.
//! The full `old -> new` map is built from the unmodified snapshot first,
//! then every reference in the program is rewritten from that map. Ids are
//! never recomputed against a partially rewritten list.

use crate::error::GraphError;
use crate::ids::{ControlId, EntityId, EntityKind, RiskId};
use crate::model::{
    AnalyticsTest, Control, ControlDraft, ControlUpdate, Procedure, ProcedureUpdate, Program,
    Risk, RiskDraft, RiskUpdate,
};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Old-to-new id map for one entity kind
///
/// Ids absent from the map have no replacement and are dropped wherever
/// they are referenced.
#[derive(Debug, Clone)]
struct Remap<I: EntityId> {
    map: HashMap<I, I>,
}

impl<I: EntityId> Remap<I> {
    /// Assign `1..=n` to the given ids in order
    fn sequential<'a>(survivors: impl IntoIterator<Item = &'a I>) -> Self
    where
        I: 'a,
    {
        let map = survivors
            .into_iter()
            .enumerate()
            .map(|(i, old)| (old.clone(), I::from_sequence(i + 1)))
            .collect();
        Self { map }
    }

    #[inline]
    fn apply(&self, id: &I) -> Option<I> {
        self.map.get(id).cloned()
    }

    fn apply_set(&self, ids: &IndexSet<I>) -> IndexSet<I> {
        ids.iter().filter_map(|id| self.apply(id)).collect()
    }

    fn is_identity(&self) -> bool {
        self.map.iter().all(|(old, new)| old == new)
    }
}

impl Program {
    /// Add or remove the link between a risk and a control
    ///
    /// Both sides are updated together. Requesting the state that already
    /// holds returns an equal program.
    ///
    /// # Errors
    /// [`GraphError::UnknownRisk`] or [`GraphError::UnknownControl`] if
    /// either id is not in the program.
    pub fn link(
        &self,
        risk_id: &RiskId,
        control_id: &ControlId,
        linked: bool,
    ) -> Result<Self, GraphError> {
        self.require_risk(risk_id)?;
        self.require_control(control_id)?;

        let mut next = self.clone();
        let (risk, control) = next.link_pair_mut(risk_id, control_id)?;
        if linked {
            risk.related_controls.insert(control_id.clone());
            control.mitigates_risks.insert(risk_id.clone());
        } else {
            risk.related_controls.shift_remove(control_id);
            control.mitigates_risks.shift_remove(risk_id);
        }

        tracing::debug!(risk = %risk_id, control = %control_id, linked, "link updated");
        Ok(next)
    }

    /// Delete a risk or control by raw id and renumber the survivors
    ///
    /// # Errors
    /// [`GraphError::UnknownRisk`] / [`GraphError::UnknownControl`] if no
    /// entity of `kind` has this id.
    pub fn delete(&self, kind: EntityKind, id: &str) -> Result<Self, GraphError> {
        match kind {
            EntityKind::Risk => self.delete_risk(&RiskId::new(id)),
            EntityKind::Control => self.delete_control(&ControlId::new(id)),
        }
    }

    /// Delete a risk, drop every reference to it, and renumber risks
    ///
    /// # Errors
    /// [`GraphError::UnknownRisk`] if the risk does not exist.
    pub fn delete_risk(&self, id: &RiskId) -> Result<Self, GraphError> {
        self.require_risk(id)?;
        let remap = Remap::sequential(self.risks.iter().map(|r| &r.id).filter(|r| *r != id));
        tracing::debug!(risk = %id, survivors = self.risks.len() - 1, "deleting risk");
        Ok(self.rewrite_risks(&remap))
    }

    /// Delete a control, drop every reference to it, and renumber controls
    ///
    /// Procedures attached to the deleted control are removed with it.
    ///
    /// # Errors
    /// [`GraphError::UnknownControl`] if the control does not exist.
    pub fn delete_control(&self, id: &ControlId) -> Result<Self, GraphError> {
        self.require_control(id)?;
        let remap = Remap::sequential(self.controls.iter().map(|c| &c.id).filter(|c| *c != id));
        tracing::debug!(control = %id, survivors = self.controls.len() - 1, "deleting control");
        Ok(self.rewrite_controls(&remap))
    }

    /// Renumber all risks and controls to dense sequences in display order
    ///
    /// Useful after sanitizing generator output whose ids are not canonical.
    #[must_use]
    pub fn renumber(&self) -> Self {
        let risks = Remap::sequential(self.risks.iter().map(|r| &r.id));
        let controls = Remap::sequential(self.controls.iter().map(|c| &c.id));
        if risks.is_identity() && controls.is_identity() {
            return self.clone();
        }
        self.rewrite_risks(&risks).rewrite_controls(&controls)
    }

    /// Append a risk with the next free id
    ///
    /// Controls named in the draft that do not exist are ignored; the rest
    /// are linked on both sides.
    #[must_use]
    pub fn add_risk(&self, draft: RiskDraft) -> (Self, RiskId) {
        let id = next_free(self.risks.len(), |candidate: &RiskId| {
            self.risk(candidate).is_some()
        });
        let mut next = self.clone();
        let related: IndexSet<ControlId> = draft
            .related_controls
            .into_iter()
            .filter(|c| self.control(c).is_some())
            .collect();

        for control in &mut next.controls {
            if related.contains(&control.id) {
                control.mitigates_risks.insert(id.clone());
            }
        }
        next.risks.push(Risk {
            id: id.clone(),
            category: draft.category,
            description: draft.description,
            rating: draft.rating,
            assertion: draft.assertion,
            related_controls: related,
            framework_reference: draft.framework_reference,
            regulatory_refs: draft.regulatory_refs,
        });

        tracing::debug!(risk = %id, "risk added");
        (next, id)
    }

    /// Append a control with the next free id
    ///
    /// Risks named in the draft that do not exist are ignored; the rest are
    /// linked on both sides.
    #[must_use]
    pub fn add_control(&self, draft: ControlDraft) -> (Self, ControlId) {
        let id = next_free(self.controls.len(), |candidate: &ControlId| {
            self.control(candidate).is_some()
        });
        let mut next = self.clone();
        let mitigates: IndexSet<RiskId> = draft
            .mitigates_risks
            .into_iter()
            .filter(|r| self.risk(r).is_some())
            .collect();

        for risk in &mut next.risks {
            if mitigates.contains(&risk.id) {
                risk.related_controls.insert(id.clone());
            }
        }
        next.controls.push(Control {
            id: id.clone(),
            description: draft.description,
            control_type: draft.control_type,
            frequency: draft.frequency,
            owner: draft.owner,
            mitigates_risks: mitigates,
            framework_reference: draft.framework_reference,
        });

        tracing::debug!(control = %id, "control added");
        (next, id)
    }

    /// Append an audit procedure
    ///
    /// # Errors
    /// [`GraphError::UnknownControl`] if the procedure's control is missing.
    pub fn add_procedure(&self, procedure: Procedure) -> Result<Self, GraphError> {
        self.require_control(&procedure.control_id)?;
        let mut next = self.clone();
        next.audit_procedures.push(procedure);
        Ok(next)
    }

    /// Remove the audit procedure at `index`
    ///
    /// # Errors
    /// [`GraphError::ProcedureIndexOutOfRange`] for a bad index.
    pub fn remove_procedure(&self, index: usize) -> Result<Self, GraphError> {
        self.require_procedure(index)?;
        let mut next = self.clone();
        next.audit_procedures.remove(index);
        Ok(next)
    }

    /// Overwrite descriptive risk fields
    ///
    /// # Errors
    /// [`GraphError::UnknownRisk`] if the risk does not exist.
    pub fn update_risk(&self, id: &RiskId, update: RiskUpdate) -> Result<Self, GraphError> {
        let mut next = self.clone();
        let risk = next
            .risk_mut(id)
            .ok_or_else(|| GraphError::UnknownRisk(id.clone()))?;

        if let Some(v) = update.category {
            risk.category = v;
        }
        if let Some(v) = update.description {
            risk.description = v;
        }
        if let Some(v) = update.rating {
            risk.rating = v;
        }
        if let Some(v) = update.assertion {
            risk.assertion = v;
        }
        if let Some(v) = update.framework_reference {
            risk.framework_reference = v;
        }
        if let Some(v) = update.regulatory_refs {
            risk.regulatory_refs = (!v.is_empty()).then_some(v);
        }
        Ok(next)
    }

    /// Overwrite descriptive control fields
    ///
    /// # Errors
    /// [`GraphError::UnknownControl`] if the control does not exist.
    pub fn update_control(&self, id: &ControlId, update: ControlUpdate) -> Result<Self, GraphError> {
        let mut next = self.clone();
        let control = next
            .control_mut(id)
            .ok_or_else(|| GraphError::UnknownControl(id.clone()))?;

        if let Some(v) = update.description {
            control.description = v;
        }
        if let Some(v) = update.control_type {
            control.control_type = v;
        }
        if let Some(v) = update.frequency {
            control.frequency = v;
        }
        if let Some(v) = update.owner {
            control.owner = v;
        }
        if let Some(v) = update.framework_reference {
            control.framework_reference = v;
        }
        Ok(next)
    }

    /// Overwrite procedure fields, including its target control
    ///
    /// # Errors
    /// [`GraphError::ProcedureIndexOutOfRange`] for a bad index,
    /// [`GraphError::UnknownControl`] when re-targeting at a missing control.
    pub fn update_procedure(&self, index: usize, update: ProcedureUpdate) -> Result<Self, GraphError> {
        self.require_procedure(index)?;
        if let Some(control_id) = &update.control_id {
            self.require_control(control_id)?;
        }

        let mut next = self.clone();
        let procedure = &mut next.audit_procedures[index];
        if let Some(v) = update.control_id {
            procedure.control_id = v;
        }
        if let Some(v) = update.procedure {
            procedure.procedure = v;
        }
        if let Some(v) = update.testing_method {
            procedure.testing_method = v;
        }
        if let Some(v) = update.sample_size {
            procedure.sample_size = v;
        }
        if let Some(v) = update.expected_evidence {
            procedure.expected_evidence = v;
        }
        Ok(next)
    }

    /// Replace the analytics test list
    ///
    /// Risk references that do not resolve are cleared.
    #[must_use]
    pub fn with_analytics_tests(&self, tests: Vec<AnalyticsTest>) -> Self {
        let mut next = self.clone();
        next.analytics_tests = tests
            .into_iter()
            .map(|mut t| {
                if t.risk_id.as_ref().is_some_and(|r| self.risk(r).is_none()) {
                    t.risk_id = None;
                }
                t
            })
            .collect();
        next
    }

    /// Reassign the risk an analytics test is attached to
    ///
    /// # Errors
    /// [`GraphError::UnknownTest`] or [`GraphError::UnknownRisk`].
    pub fn assign_test_risk(&self, test_id: &str, risk_id: Option<RiskId>) -> Result<Self, GraphError> {
        if let Some(risk) = &risk_id {
            self.require_risk(risk)?;
        }
        let mut next = self.clone();
        next.analytics_test_mut(test_id)?.risk_id = risk_id;
        Ok(next)
    }

    /// Include or exclude an analytics test
    ///
    /// # Errors
    /// [`GraphError::UnknownTest`] if the test is not attached.
    pub fn set_test_included(&self, test_id: &str, included: bool) -> Result<Self, GraphError> {
        let mut next = self.clone();
        next.analytics_test_mut(test_id)?.included = included;
        Ok(next)
    }

    /// Rebuild the program with every risk reference mapped through `remap`
    fn rewrite_risks(&self, remap: &Remap<RiskId>) -> Self {
        let risks = self
            .risks
            .iter()
            .filter_map(|r| {
                let id = remap.apply(&r.id)?;
                Some(Risk { id, ..r.clone() })
            })
            .collect();
        let controls = self
            .controls
            .iter()
            .map(|c| Control {
                mitigates_risks: remap.apply_set(&c.mitigates_risks),
                ..c.clone()
            })
            .collect();
        let analytics_tests = self
            .analytics_tests
            .iter()
            .map(|t| AnalyticsTest {
                risk_id: t.risk_id.as_ref().and_then(|r| remap.apply(r)),
                ..t.clone()
            })
            .collect();

        Self {
            risks,
            controls,
            audit_procedures: self.audit_procedures.clone(),
            analytics_tests,
        }
    }

    /// Rebuild the program with every control reference mapped through `remap`
    fn rewrite_controls(&self, remap: &Remap<ControlId>) -> Self {
        let controls = self
            .controls
            .iter()
            .filter_map(|c| {
                let id = remap.apply(&c.id)?;
                Some(Control { id, ..c.clone() })
            })
            .collect();
        let risks = self
            .risks
            .iter()
            .map(|r| Risk {
                related_controls: remap.apply_set(&r.related_controls),
                ..r.clone()
            })
            .collect();
        let audit_procedures = self
            .audit_procedures
            .iter()
            .filter_map(|p| {
                let control_id = remap.apply(&p.control_id)?;
                Some(Procedure { control_id, ..p.clone() })
            })
            .collect();

        Self {
            risks,
            controls,
            audit_procedures,
            analytics_tests: self.analytics_tests.clone(),
        }
    }

    fn require_risk(&self, id: &RiskId) -> Result<(), GraphError> {
        self.risk(id)
            .map(|_| ())
            .ok_or_else(|| GraphError::UnknownRisk(id.clone()))
    }

    fn require_control(&self, id: &ControlId) -> Result<(), GraphError> {
        self.control(id)
            .map(|_| ())
            .ok_or_else(|| GraphError::UnknownControl(id.clone()))
    }

    fn require_procedure(&self, index: usize) -> Result<(), GraphError> {
        if index < self.audit_procedures.len() {
            Ok(())
        } else {
            Err(GraphError::ProcedureIndexOutOfRange {
                index,
                len: self.audit_procedures.len(),
            })
        }
    }

    fn link_pair_mut(
        &mut self,
        risk_id: &RiskId,
        control_id: &ControlId,
    ) -> Result<(&mut Risk, &mut Control), GraphError> {
        let risk = self
            .risks
            .iter_mut()
            .find(|r| &r.id == risk_id)
            .ok_or_else(|| GraphError::UnknownRisk(risk_id.clone()))?;
        let control = self
            .controls
            .iter_mut()
            .find(|c| &c.id == control_id)
            .ok_or_else(|| GraphError::UnknownControl(control_id.clone()))?;
        Ok((risk, control))
    }

    fn analytics_test_mut(&mut self, test_id: &str) -> Result<&mut AnalyticsTest, GraphError> {
        self.analytics_tests
            .iter_mut()
            .find(|t| t.id == test_id)
            .ok_or_else(|| GraphError::UnknownTest(test_id.to_string()))
    }
}

/// First canonical id at or after `len + 1` not already taken
fn next_free<I: EntityId>(len: usize, taken: impl Fn(&I) -> bool) -> I {
    (len + 1..)
        .map(I::from_sequence)
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| I::from_sequence(len + 1))
}
