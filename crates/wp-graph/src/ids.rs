//! Typed entity identifiers
//!
//! Risk and Control ids are a prefix letter followed by a zero-padded
//! sequence number (`R001`, `C012`). Ids coming from an untrusted generator
//! may be arbitrary strings; the newtypes wrap whatever text was supplied
//! and only [`EntityId::from_sequence`] guarantees the canonical format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the zero-padded numeric part of a generated id
pub const SEQUENCE_WIDTH: usize = 3;

/// Common behavior for sequence-numbered entity ids
pub trait EntityId: Clone + Eq + std::hash::Hash + fmt::Display {
    /// Single-letter prefix (`R` or `C`)
    const PREFIX: char;

    /// Kind of entity this id names
    const KIND: EntityKind;

    /// Wrap raw id text without validation
    fn from_raw(raw: String) -> Self;

    /// Borrow the raw id text
    fn as_str(&self) -> &str;

    /// Build the canonical id for a 1-based sequence number
    #[must_use]
    fn from_sequence(sequence: usize) -> Self {
        Self::from_raw(format!(
            "{}{:0width$}",
            Self::PREFIX,
            sequence,
            width = SEQUENCE_WIDTH
        ))
    }

    /// Parse the sequence number out of a canonical id
    #[must_use]
    fn sequence(&self) -> Option<usize> {
        let digits = self.as_str().strip_prefix(Self::PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Entity kinds that carry sequence ids and can be deleted with renumbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A Risk (`R###`)
    Risk,
    /// A Control (`C###`)
    Control,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Risk => f.write_str("risk"),
            Self::Control => f.write_str("control"),
        }
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create id from any string-like value
            #[inline]
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }
        }

        impl EntityId for $name {
            const PREFIX: char = $prefix;
            const KIND: EntityKind = $kind;

            #[inline]
            fn from_raw(raw: String) -> Self {
                Self(raw)
            }

            #[inline]
            fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

entity_id!(
    /// Risk identifier (`R001`, `R002`, ...)
    RiskId,
    'R',
    EntityKind::Risk
);

entity_id!(
    /// Control identifier (`C001`, `C002`, ...)
    ControlId,
    'C',
    EntityKind::Control
);
