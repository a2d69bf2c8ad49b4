//! Exception rule families
//!
//! Every catalogued test is an instantiation of one of four families:
//!
//! - [`DuplicateKeyRule`]: the same (possibly composite) key appears twice
//! - [`SharedAttributeRule`]: one attribute value shared by several entities
//! - [`ThresholdRule`]: a numeric field crosses a fixed bound
//! - [`MembershipRule`]: a categorical field is in a target set
//!
//! Rules are pure. They receive the resolved column of each field they
//! declare (in declaration order) plus the rows, and return the indices of
//! exception rows in ascending order.

use crate::dataset::{cell_at, Cell, Row};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Separator placed between composite key components
const KEY_SEPARATOR: char = '\u{1f}';

/// Rule family discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    /// Duplicate-key detection
    DuplicateKey,
    /// Cross-entity shared attribute detection
    SharedAttribute,
    /// Numeric threshold/sign test
    Threshold,
    /// Categorical set membership
    Membership,
}

/// Core trait for exception rules
pub trait ExceptionRule: fmt::Debug + Send + Sync {
    /// Family this rule belongs to
    fn family(&self) -> RuleFamily;

    /// Field names the rule reads, in the order columns are passed
    fn fields(&self) -> Vec<&str>;

    /// Indices of exception rows, ascending
    ///
    /// `columns[i]` is the column holding `fields()[i]`. When `parallel` is
    /// set the per-row predicate runs on the rayon pool.
    fn flag(&self, columns: &[usize], rows: &[Row], parallel: bool) -> Vec<usize>;
}

/// Evaluate `predicate` over every row and collect matching indices in order
fn select<F>(rows: &[Row], parallel: bool, predicate: F) -> Vec<usize>
where
    F: Fn(&Row) -> bool + Sync,
{
    if parallel {
        let mut hits: Vec<usize> = rows
            .par_iter()
            .enumerate()
            .filter(|(_, row)| predicate(row))
            .map(|(i, _)| i)
            .collect();
        hits.par_sort_unstable();
        hits
    } else {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| predicate(row))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Flags rows whose key occurs more than once
///
/// The key is the trimmed text of each key field joined by a separator.
/// Rows with any blank key component are never flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKeyRule {
    key_fields: Vec<String>,
}

impl DuplicateKeyRule {
    /// Create rule over one or more key fields
    #[must_use]
    pub fn new<S: Into<String>>(key_fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
        }
    }

    fn key(columns: &[usize], row: &[Cell]) -> Option<String> {
        let mut key = String::new();
        for (i, column) in columns.iter().enumerate() {
            let part = cell_at(row, *column).text();
            if part.is_empty() {
                return None;
            }
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(&part);
        }
        Some(key)
    }
}

impl ExceptionRule for DuplicateKeyRule {
    fn family(&self) -> RuleFamily {
        RuleFamily::DuplicateKey
    }

    fn fields(&self) -> Vec<&str> {
        self.key_fields.iter().map(String::as_str).collect()
    }

    fn flag(&self, columns: &[usize], rows: &[Row], parallel: bool) -> Vec<usize> {
        if columns.is_empty() {
            return Vec::new();
        }
        let keys: Vec<Option<String>> = rows.iter().map(|r| Self::key(columns, r)).collect();
        let mut frequency: HashMap<&str, usize> = HashMap::new();
        for key in keys.iter().flatten() {
            *frequency.entry(key.as_str()).or_default() += 1;
        }

        let flagged = |i: usize| {
            keys[i]
                .as_deref()
                .is_some_and(|k| frequency.get(k).copied().unwrap_or(0) > 1)
        };
        select_indices(rows.len(), parallel, flagged)
    }
}

/// Flags rows whose shared attribute is used by more than one entity
///
/// Models "one bank account paid to several employees": the rule maps each
/// shared value to the distinct entity values seen with it, ignoring blank
/// values on either side, and flags every row whose shared value maps to
/// two or more entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedAttributeRule {
    shared_field: String,
    entity_field: String,
}

impl SharedAttributeRule {
    /// Create rule: `shared_field` must belong to one `entity_field` value
    #[must_use]
    pub fn new(shared_field: impl Into<String>, entity_field: impl Into<String>) -> Self {
        Self {
            shared_field: shared_field.into(),
            entity_field: entity_field.into(),
        }
    }
}

impl ExceptionRule for SharedAttributeRule {
    fn family(&self) -> RuleFamily {
        RuleFamily::SharedAttribute
    }

    fn fields(&self) -> Vec<&str> {
        vec![self.shared_field.as_str(), self.entity_field.as_str()]
    }

    fn flag(&self, columns: &[usize], rows: &[Row], parallel: bool) -> Vec<usize> {
        let [shared, entity] = columns else {
            return Vec::new();
        };

        let mut owners: HashMap<String, HashSet<String>> = HashMap::new();
        for row in rows {
            let shared_value = cell_at(row, *shared).text();
            let entity_value = cell_at(row, *entity).text();
            if shared_value.is_empty() || entity_value.is_empty() {
                continue;
            }
            owners
                .entry(shared_value.into_owned())
                .or_default()
                .insert(entity_value.into_owned());
        }

        select(rows, parallel, |row| {
            let shared_value = cell_at(row, *shared).text();
            !shared_value.is_empty()
                && owners
                    .get(&*shared_value)
                    .is_some_and(|set| set.len() > 1)
        })
    }
}

/// Fixed numeric comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `value < threshold`
    LessThan,
    /// `value <= threshold`
    LessOrEqual,
    /// `value > threshold`
    GreaterThan,
    /// `value >= threshold`
    GreaterOrEqual,
}

impl Comparison {
    /// Apply the comparison
    #[inline]
    #[must_use]
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::LessThan => value < threshold,
            Self::LessOrEqual => value <= threshold,
            Self::GreaterThan => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
        })
    }
}

/// Flags rows whose numeric field satisfies a fixed comparison
///
/// Unparsable cells are never exceptions.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    field: String,
    comparison: Comparison,
    threshold: f64,
}

impl ThresholdRule {
    /// Create rule `field <comparison> threshold`
    #[must_use]
    pub fn new(field: impl Into<String>, comparison: Comparison, threshold: f64) -> Self {
        Self {
            field: field.into(),
            comparison,
            threshold,
        }
    }

    /// Rule flagging strictly negative values
    #[must_use]
    pub fn negative(field: impl Into<String>) -> Self {
        Self::new(field, Comparison::LessThan, 0.0)
    }
}

impl ExceptionRule for ThresholdRule {
    fn family(&self) -> RuleFamily {
        RuleFamily::Threshold
    }

    fn fields(&self) -> Vec<&str> {
        vec![self.field.as_str()]
    }

    fn flag(&self, columns: &[usize], rows: &[Row], parallel: bool) -> Vec<usize> {
        let [column] = columns else {
            return Vec::new();
        };
        select(rows, parallel, |row| {
            cell_at(row, *column)
                .as_number()
                .is_some_and(|v| self.comparison.holds(v, self.threshold))
        })
    }
}

/// Flags rows whose categorical field is in a target set
///
/// Values and targets are compared trimmed and lowercased, so synonym
/// spellings must each be listed as targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRule {
    field: String,
    targets: HashSet<String>,
}

impl MembershipRule {
    /// Create rule over a target set
    #[must_use]
    pub fn new<S: AsRef<str>>(field: impl Into<String>, targets: impl IntoIterator<Item = S>) -> Self {
        Self {
            field: field.into(),
            targets: targets
                .into_iter()
                .map(|t| normalize_category(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Check whether a raw value is in the target set
    #[must_use]
    pub fn is_target(&self, raw: &str) -> bool {
        self.targets.contains(&normalize_category(raw))
    }
}

fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl ExceptionRule for MembershipRule {
    fn family(&self) -> RuleFamily {
        RuleFamily::Membership
    }

    fn fields(&self) -> Vec<&str> {
        vec![self.field.as_str()]
    }

    fn flag(&self, columns: &[usize], rows: &[Row], parallel: bool) -> Vec<usize> {
        let [column] = columns else {
            return Vec::new();
        };
        select(rows, parallel, |row| self.is_target(&cell_at(row, *column).text()))
    }
}

fn select_indices<F>(len: usize, parallel: bool, flagged: F) -> Vec<usize>
where
    F: Fn(usize) -> bool + Sync,
{
    if parallel {
        let mut hits: Vec<usize> = (0..len).into_par_iter().filter(|i| flagged(*i)).collect();
        hits.par_sort_unstable();
        hits
    } else {
        (0..len).filter(|i| flagged(*i)).collect()
    }
}

/// Declarative rule instantiation used by the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum RuleSpec {
    /// See [`DuplicateKeyRule`]
    DuplicateKey {
        /// Key fields
        fields: Vec<String>,
    },
    /// See [`SharedAttributeRule`]
    SharedAttribute {
        /// Attribute that must not be shared
        shared: String,
        /// Entity owning the attribute
        entity: String,
    },
    /// See [`ThresholdRule`]
    Threshold {
        /// Numeric field
        field: String,
        /// Comparison applied
        comparison: Comparison,
        /// Bound
        threshold: f64,
    },
    /// See [`MembershipRule`]
    Membership {
        /// Categorical field
        field: String,
        /// Target values (with every synonym spelling)
        targets: Vec<String>,
    },
}

impl RuleSpec {
    /// Field names the rule reads
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::DuplicateKey { fields } => fields.clone(),
            Self::SharedAttribute { shared, entity } => vec![shared.clone(), entity.clone()],
            Self::Threshold { field, .. } | Self::Membership { field, .. } => vec![field.clone()],
        }
    }

    /// Family of the rule
    #[must_use]
    pub fn family(&self) -> RuleFamily {
        match self {
            Self::DuplicateKey { .. } => RuleFamily::DuplicateKey,
            Self::SharedAttribute { .. } => RuleFamily::SharedAttribute,
            Self::Threshold { .. } => RuleFamily::Threshold,
            Self::Membership { .. } => RuleFamily::Membership,
        }
    }

    /// Instantiate the rule
    #[must_use]
    pub fn build(&self) -> Arc<dyn ExceptionRule> {
        match self {
            Self::DuplicateKey { fields } => Arc::new(DuplicateKeyRule::new(fields.iter().cloned())),
            Self::SharedAttribute { shared, entity } => {
                Arc::new(SharedAttributeRule::new(shared.clone(), entity.clone()))
            }
            Self::Threshold {
                field,
                comparison,
                threshold,
            } => Arc::new(ThresholdRule::new(field.clone(), *comparison, *threshold)),
            Self::Membership { field, targets } => Arc::new(MembershipRule::new(field.clone(), targets)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[Cell]) -> Vec<Row> {
        values.iter().map(|v| vec![v.clone()]).collect()
    }

    fn text_rows(rows: &[&[&str]]) -> Vec<Row> {
        rows.iter()
            .map(|r| r.iter().map(|c| Cell::from(*c)).collect())
            .collect()
    }

    #[test]
    fn duplicate_key_single_field() {
        let rows = text_rows(&[&["INV1"], &["INV1"], &["INV2"]]);
        let rule = DuplicateKeyRule::new(["Invoice Number"]);
        assert_eq!(rule.flag(&[0], &rows, false), vec![0, 1]);
    }

    #[test]
    fn duplicate_key_trims_and_skips_blank_components() {
        let rows = text_rows(&[
            &["V1", " INV1 "],
            &["V1", "INV1"],
            &["V2", "INV1"],
            &["", "INV9"],
            &["", "INV9"],
        ]);
        let rule = DuplicateKeyRule::new(["Vendor ID", "Invoice Number"]);
        assert_eq!(rule.flag(&[0, 1], &rows, false), vec![0, 1]);
    }

    #[test]
    fn duplicate_key_separator_prevents_concatenation_collisions() {
        let rows = text_rows(&[&["AB", "C"], &["A", "BC"]]);
        let rule = DuplicateKeyRule::new(["a", "b"]);
        assert!(rule.flag(&[0, 1], &rows, false).is_empty());
    }

    #[test]
    fn duplicate_key_treats_signed_zeros_as_one_key() {
        let rows = column(&[Cell::Number(0.0), Cell::Number(-0.0), Cell::Number(1.0)]);
        let rule = DuplicateKeyRule::new(["Amount"]);
        assert_eq!(rule.flag(&[0], &rows, false), vec![0, 1]);
    }

    #[test]
    fn shared_attribute_flags_all_rows_of_shared_value() {
        let rows = text_rows(&[&["A", "E1"], &["A", "E2"], &["B", "E3"]]);
        let rule = SharedAttributeRule::new("Bank Account", "Employee ID");
        assert_eq!(rule.flag(&[0, 1], &rows, false), vec![0, 1]);
    }

    #[test]
    fn shared_attribute_same_entity_repeated_is_not_exception() {
        let rows = text_rows(&[&["A", "E1"], &["A", "E1"], &["", "E2"], &["", "E3"]]);
        let rule = SharedAttributeRule::new("Bank Account", "Employee ID");
        assert!(rule.flag(&[0, 1], &rows, false).is_empty());
    }

    #[test]
    fn threshold_negative_values() {
        let rows = column(&[
            Cell::Number(5.0),
            Cell::Number(-1.0),
            Cell::from("abc"),
            Cell::Number(-0.0),
            Cell::Number(0.0),
        ]);
        let rule = ThresholdRule::negative("Amount");
        assert_eq!(rule.flag(&[0], &rows, false), vec![1]);
    }

    #[test]
    fn threshold_comparisons() {
        assert!(Comparison::GreaterThan.holds(10.5, 10.0));
        assert!(!Comparison::GreaterThan.holds(10.0, 10.0));
        assert!(Comparison::GreaterOrEqual.holds(10.0, 10.0));
        assert!(Comparison::LessOrEqual.holds(-0.0, 0.0));
        assert_eq!(Comparison::LessOrEqual.to_string(), "<=");
    }

    #[test]
    fn membership_with_synonyms() {
        let rows = column(&[
            Cell::from("Admin"),
            Cell::from(" super user "),
            Cell::from("user"),
            Cell::from("SUPERUSER"),
        ]);
        let rule = MembershipRule::new("Access Level", ["admin", "super user", "superuser", "super_user"]);
        assert_eq!(rule.flag(&[0], &rows, false), vec![0, 1, 3]);
    }

    #[test]
    fn short_rows_are_not_exceptions() {
        let rows: Vec<Row> = vec![vec![], vec![Cell::Number(-3.0)]];
        assert_eq!(ThresholdRule::negative("Amount").flag(&[0], &rows, false), vec![1]);
        assert!(DuplicateKeyRule::new(["k"]).flag(&[0], &[vec![], vec![]], false).is_empty());
    }

    #[test]
    fn parallel_matches_sequential_order() {
        let rows: Vec<Row> = (0..5_000)
            .map(|i| vec![Cell::from(format!("K{}", i % 1_700)), Cell::Number(f64::from(i % 7) - 3.0)])
            .collect();

        let dup = DuplicateKeyRule::new(["k"]);
        assert_eq!(dup.flag(&[0], &rows, true), dup.flag(&[0], &rows, false));

        let neg = ThresholdRule::negative("v");
        assert_eq!(neg.flag(&[1], &rows, true), neg.flag(&[1], &rows, false));
    }

    #[test]
    fn spec_round_trips_through_serde_and_builds() {
        let spec: RuleSpec = serde_json::from_str(
            r#"{"family":"threshold","field":"Amount","comparison":"greater_than","threshold":10000}"#,
        )
        .unwrap();
        assert_eq!(spec.family(), RuleFamily::Threshold);
        assert_eq!(spec.fields(), vec!["Amount".to_string()]);
        let rule = spec.build();
        assert_eq!(rule.fields(), vec!["Amount"]);
        let rows = column(&[Cell::Number(10_000.0), Cell::Number(10_001.0)]);
        assert_eq!(rule.flag(&[0], &rows, false), vec![1]);
    }

    #[test]
    fn wrong_column_count_flags_nothing() {
        let rows = text_rows(&[&["A", "E1"], &["A", "E2"]]);
        assert!(SharedAttributeRule::new("a", "b").flag(&[0], &rows, false).is_empty());
        assert!(ThresholdRule::negative("a").flag(&[0, 1], &rows, false).is_empty());
    }
}
