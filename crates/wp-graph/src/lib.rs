//! Working Paper Entity Graph
//!
//! Owns the Risk / Control / Procedure collections of an audit program and
//! keeps their cross-references consistent.
//!
//! # Core Concepts
//!
//! - [`Program`]: immutable snapshot; every mutation returns a new value
//! - [`Program::sanitize`]: single choke point for untrusted generator output
//! - [`Program::link`]: updates both sides of a risk/control link together
//! - [`Program::delete`]: deletes and renumbers with a two-pass id remap
//! - [`Program::orphan_check`]: advisory orphan warnings
//!
//! # Example
//!
//! ```rust
//! use wp_graph::{ControlDraft, Program, RiskDraft};
//!
//! let (program, risk) = Program::new().add_risk(RiskDraft::new("Duplicate payments"));
//! let (program, control) = program.add_control(ControlDraft::new("Duplicate invoice check"));
//! let program = program.link(&risk, &control, true).unwrap();
//!
//! assert!(program.integrity_violations().is_empty());
//! assert_eq!(program.orphan_check().untested_controls.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod candidate;
pub mod error;
pub mod ids;
mod integrity;
pub mod model;
mod ops;

// Re-exports
pub use error::{DecodeError, GraphError};
pub use ids::{ControlId, EntityId, EntityKind, RiskId};
pub use integrity::{OrphanReport, Violation};
pub use model::{
    AnalyticsTest, Control, ControlDraft, ControlType, ControlUpdate, Procedure, ProcedureUpdate,
    Program, Rating, Risk, RiskDraft, RiskUpdate,
};

use serde::Serialize;

/// Entity and warning counts for a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    /// Number of risks
    pub risks: usize,
    /// Number of controls
    pub controls: usize,
    /// Number of audit procedures
    pub procedures: usize,
    /// Number of analytics tests attached
    pub analytics_tests: usize,
    /// Number of analytics tests included in the working paper
    pub included_tests: usize,
    /// Total orphan warnings
    pub orphan_warnings: usize,
}

impl Program {
    /// Count entities and orphan warnings
    #[must_use]
    pub fn summary(&self) -> ProgramSummary {
        ProgramSummary {
            risks: self.risks.len(),
            controls: self.controls.len(),
            procedures: self.audit_procedures.len(),
            analytics_tests: self.analytics_tests.len(),
            included_tests: self.analytics_tests.iter().filter(|t| t.included).count(),
            orphan_warnings: self.orphan_check().len(),
        }
    }
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for program editing
    pub use crate::{
        AnalyticsTest, ControlDraft, ControlId, EntityKind, GraphError, OrphanReport, Program,
        RiskDraft, RiskId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
