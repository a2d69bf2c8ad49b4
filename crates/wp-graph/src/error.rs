//! Error types for the entity graph
//!
//! Provides error handling for:
//! - Reference integrity violations (Link/Delete/Add against unknown ids)
//! - Decoding untrusted candidate programs

use crate::ids::{ControlId, RiskId};

/// Reference integrity violations raised by graph mutations
///
/// These indicate a caller contract violation: the UI/edit layer is expected
/// to pass ids that exist in the program it holds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Risk id not present in the program
    #[error("unknown risk id: {0}")]
    UnknownRisk(RiskId),

    /// Control id not present in the program
    #[error("unknown control id: {0}")]
    UnknownControl(ControlId),

    /// Analytics test id not present in the program
    #[error("unknown analytics test id: {0}")]
    UnknownTest(String),

    /// Procedure index outside the procedure list
    #[error("procedure index {index} out of range (len {len})")]
    ProcedureIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of procedures
        len: usize,
    },
}

impl GraphError {
    /// Check if this error names a dangling entity reference
    #[inline]
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::UnknownRisk(_) | Self::UnknownControl(_) | Self::UnknownTest(_)
        )
    }
}

/// Errors decoding a candidate program from generator output
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not valid JSON
    #[error("invalid candidate json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Payload root is not a JSON object
    #[error("candidate program must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let err = GraphError::UnknownRisk(RiskId::new("R009"));
        assert_eq!(err.to_string(), "unknown risk id: R009");

        let err = GraphError::ProcedureIndexOutOfRange { index: 4, len: 2 };
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn integrity_violation_classification() {
        assert!(GraphError::UnknownControl(ControlId::new("C001")).is_integrity_violation());
        assert!(GraphError::UnknownTest("P2P-01".into()).is_integrity_violation());
        assert!(!GraphError::ProcedureIndexOutOfRange { index: 0, len: 0 }.is_integrity_violation());
    }
}
