//! Tabular input: cells, rows, datasets

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A scalar spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Blank cell (`null`)
    #[default]
    Empty,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// Text
    Text(String),
}

/// A data row; rows are not required to match the header width
pub type Row = Vec<Cell>;

impl Cell {
    /// Trimmed text form of the cell
    ///
    /// Numbers print without a trailing `.0`, so `1.0` and `"1"` compare equal;
    /// `-0.0` prints as `0`.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Number(n) if *n == 0.0 => Cow::Borrowed("0"),
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s.trim()),
        }
    }

    /// Numeric value of the cell, if it has one
    ///
    /// Text is trimmed; thousands separators are ignored and an accounting
    /// negative like `(1,250.00)` reads as `-1250`. Non-finite values and
    /// anything else that fails to parse yield `None`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => parse_number(s)?,
            Self::Empty | Self::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// True for blank cells and whitespace-only text
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text().is_empty()
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Cell {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negated, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };
    if body.is_empty() {
        return None;
    }
    let cleaned: String = body.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.parse().ok()?;
    Some(if negated { -value } else { value })
}

/// Cell at `index`, or [`Cell::Empty`] when the row is too short
#[inline]
#[must_use]
pub fn cell_at(row: &[Cell], index: usize) -> &Cell {
    const EMPTY: &Cell = &Cell::Empty;
    row.get(index).unwrap_or(EMPTY)
}

/// A user-supplied table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Header row
    pub headers: Vec<String>,
    /// Data rows
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Create dataset from headers and rows
    #[inline]
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Number of header columns
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Number of data rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no data rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
