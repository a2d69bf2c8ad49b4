//! Reference integrity: sanitize, orphan check, and invariant audit
//!
//! [`Program::sanitize`] is the single choke point for untrusted programs.
//! It removes references to entities that do not exist; it does not add
//! missing back-references, so a program whose links are valid but
//! one-sided stays one-sided until edited through [`Program::link`].

use crate::ids::{ControlId, RiskId};
use crate::model::Program;
use serde::Serialize;
use std::collections::HashSet;

/// Advisory orphan warnings for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanReport {
    /// Risks with no related controls
    pub unmitigated_risks: Vec<RiskId>,
    /// Controls that mitigate no risk
    pub unlinked_controls: Vec<ControlId>,
    /// Controls with no audit procedure
    pub untested_controls: Vec<ControlId>,
}

impl OrphanReport {
    /// Total number of warnings
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.unmitigated_risks.len() + self.unlinked_controls.len() + self.untested_controls.len()
    }

    /// True when no orphan of any kind exists
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unmitigated_risks.is_empty()
            && self.unlinked_controls.is_empty()
            && self.untested_controls.is_empty()
    }
}

/// Clone `items`, keeping only the first item of each key
fn first_of_each<T: Clone, K: Eq + std::hash::Hash>(items: &[T], key: impl Fn(&T) -> &K) -> Vec<T> {
    let mut seen = HashSet::new();
    items.iter().filter(|item| seen.insert(key(item))).cloned().collect()
}

/// A broken program invariant found by [`Program::integrity_violations`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Risk lists a control that does not exist
    DanglingRiskLink {
        /// Listing risk
        risk: RiskId,
        /// Missing control
        control: ControlId,
    },
    /// Control lists a risk that does not exist
    DanglingControlLink {
        /// Listing control
        control: ControlId,
        /// Missing risk
        risk: RiskId,
    },
    /// Link present on only one side
    AsymmetricLink {
        /// Risk side of the link
        risk: RiskId,
        /// Control side of the link
        control: ControlId,
    },
    /// Procedure targets a missing control
    DanglingProcedure {
        /// Position in `auditProcedures`
        index: usize,
        /// Missing control
        control: ControlId,
    },
    /// Analytics test targets a missing risk
    DanglingTestRisk {
        /// Test id
        test: String,
        /// Missing risk
        risk: RiskId,
    },
    /// Risk id out of sequence
    RiskIdOutOfSequence {
        /// Zero-based position in `risks`
        position: usize,
        /// Id found there
        id: RiskId,
    },
    /// Control id out of sequence
    ControlIdOutOfSequence {
        /// Zero-based position in `controls`
        position: usize,
        /// Id found there
        id: ControlId,
    },
}

impl Program {
    /// Remove every reference to a non-existent entity
    ///
    /// Idempotent and total: keeps the first entity of any repeated id,
    /// filters `relatedControls` and `mitigatesRisks` to existing ids, drops
    /// procedures whose control is missing, and clears analytics test risks
    /// that no longer resolve.
    #[must_use]
    pub fn sanitize(&self) -> Self {
        let mut risks = first_of_each(&self.risks, |r| &r.id);
        let mut controls = first_of_each(&self.controls, |c| &c.id);
        let repeated = (self.risks.len() - risks.len()) + (self.controls.len() - controls.len());

        let risk_ids: HashSet<RiskId> = risks.iter().map(|r| r.id.clone()).collect();
        let control_ids: HashSet<ControlId> = controls.iter().map(|c| c.id.clone()).collect();
        let mut dropped = 0usize;

        for risk in &mut risks {
            let before = risk.related_controls.len();
            risk.related_controls.retain(|c| control_ids.contains(c));
            dropped += before - risk.related_controls.len();
        }

        for control in &mut controls {
            let before = control.mitigates_risks.len();
            control.mitigates_risks.retain(|r| risk_ids.contains(r));
            dropped += before - control.mitigates_risks.len();
        }

        let audit_procedures: Vec<_> = self
            .audit_procedures
            .iter()
            .filter(|p| control_ids.contains(&p.control_id))
            .cloned()
            .collect();
        let dropped_procedures = self.audit_procedures.len() - audit_procedures.len();

        let mut analytics_tests = self.analytics_tests.clone();
        for test in &mut analytics_tests {
            if test.risk_id.as_ref().is_some_and(|r| !risk_ids.contains(r)) {
                test.risk_id = None;
                dropped += 1;
            }
        }

        if dropped > 0 || dropped_procedures > 0 || repeated > 0 {
            tracing::warn!(
                dangling_links = dropped,
                dropped_procedures,
                repeated_ids = repeated,
                "sanitize removed dangling references"
            );
        }

        Self {
            risks,
            controls,
            audit_procedures,
            analytics_tests,
        }
    }

    /// Report orphaned risks and controls
    ///
    /// Pure query; orphans are advisory and never rejected.
    #[must_use]
    pub fn orphan_check(&self) -> OrphanReport {
        let tested: HashSet<&ControlId> =
            self.audit_procedures.iter().map(|p| &p.control_id).collect();

        OrphanReport {
            unmitigated_risks: self
                .risks
                .iter()
                .filter(|r| r.related_controls.is_empty())
                .map(|r| r.id.clone())
                .collect(),
            unlinked_controls: self
                .controls
                .iter()
                .filter(|c| c.mitigates_risks.is_empty())
                .map(|c| c.id.clone())
                .collect(),
            untested_controls: self
                .controls
                .iter()
                .filter(|c| !tested.contains(&c.id))
                .map(|c| c.id.clone())
                .collect(),
        }
    }

    /// List every broken invariant
    ///
    /// Empty for any program produced by the mutation operations starting
    /// from a consistent program. Sanitized generator output can still show
    /// [`Violation::AsymmetricLink`] or out-of-sequence ids.
    #[must_use]
    pub fn integrity_violations(&self) -> Vec<Violation> {
        use crate::ids::EntityId;

        let mut violations = Vec::new();

        for (i, risk) in self.risks.iter().enumerate() {
            if risk.id != RiskId::from_sequence(i + 1) {
                violations.push(Violation::RiskIdOutOfSequence {
                    position: i,
                    id: risk.id.clone(),
                });
            }
            for control_id in &risk.related_controls {
                match self.control(control_id) {
                    None => violations.push(Violation::DanglingRiskLink {
                        risk: risk.id.clone(),
                        control: control_id.clone(),
                    }),
                    Some(c) if !c.mitigates_risks.contains(&risk.id) => {
                        violations.push(Violation::AsymmetricLink {
                            risk: risk.id.clone(),
                            control: control_id.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for (i, control) in self.controls.iter().enumerate() {
            if control.id != ControlId::from_sequence(i + 1) {
                violations.push(Violation::ControlIdOutOfSequence {
                    position: i,
                    id: control.id.clone(),
                });
            }
            for risk_id in &control.mitigates_risks {
                match self.risk(risk_id) {
                    None => violations.push(Violation::DanglingControlLink {
                        control: control.id.clone(),
                        risk: risk_id.clone(),
                    }),
                    Some(r) if !r.related_controls.contains(&control.id) => {
                        violations.push(Violation::AsymmetricLink {
                            risk: risk_id.clone(),
                            control: control.id.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for (index, procedure) in self.audit_procedures.iter().enumerate() {
            if self.control(&procedure.control_id).is_none() {
                violations.push(Violation::DanglingProcedure {
                    index,
                    control: procedure.control_id.clone(),
                });
            }
        }

        for test in &self.analytics_tests {
            if let Some(risk) = &test.risk_id {
                if self.risk(risk).is_none() {
                    violations.push(Violation::DanglingTestRisk {
                        test: test.id.clone(),
                        risk: risk.clone(),
                    });
                }
            }
        }

        violations
    }
}
