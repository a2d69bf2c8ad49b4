//! Test execution engine
//!
//! Looks up the rule registered for a test id, resolves the rule's fields
//! through a [`ColumnMapping`] and evaluates it over the rows. The outcome
//! always carries the full exception set; capping for display is done by
//! the caller through [`TestOutcome::sample`].

use crate::config::EngineConfig;
use crate::dataset::{Dataset, Row};
use crate::error::EngineError;
use crate::registry::RuleRegistry;
use crate::resolver::{ColumnMapping, ColumnResolver};
use serde::Serialize;

/// Result of running one test over a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    /// Indices of exception rows, ascending
    pub exception_indices: Vec<usize>,
    /// Exception rows in input order
    pub exceptions: Vec<Row>,
    /// Always `exceptions.len()`
    pub exception_count: usize,
    /// Always the number of input rows
    pub total_rows: usize,
}

impl TestOutcome {
    /// First `cap` exception rows
    #[must_use]
    pub fn sample(&self, cap: usize) -> &[Row] {
        &self.exceptions[..cap.min(self.exceptions.len())]
    }

    /// Check if the test found nothing
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.exceptions.is_empty()
    }
}

/// Registry-backed test runner
#[derive(Debug, Clone)]
pub struct TestEngine {
    registry: RuleRegistry,
    resolver: ColumnResolver,
    config: EngineConfig,
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TestEngine {
    /// Create engine over a registry and configuration
    #[must_use]
    pub fn new(registry: RuleRegistry, config: EngineConfig) -> Self {
        let resolver = ColumnResolver::new(config.alias_registry());
        Self {
            registry,
            resolver,
            config,
        }
    }

    /// Engine with the built-in catalogue and default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::from_config(EngineConfig::default())
    }

    /// Engine with the built-in catalogue and the given configuration
    #[must_use]
    pub fn from_config(config: EngineConfig) -> Self {
        Self::new(RuleRegistry::with_defaults(), config)
    }

    /// Registered rules
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Column resolver built from the configured aliases
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &ColumnResolver {
        &self.resolver
    }

    /// Fields a test needs mapped, in the order its rule reads them
    ///
    /// # Errors
    /// [`EngineError::UnknownRule`] for an unregistered test id.
    pub fn required_fields(&self, test_id: &str) -> Result<Vec<String>, EngineError> {
        let rule = self.registry.get(test_id)?;
        Ok(rule.fields().into_iter().map(str::to_string).collect())
    }

    /// Propose a column mapping for a test from dataset headers
    ///
    /// # Errors
    /// [`EngineError::UnknownRule`] for an unregistered test id.
    pub fn suggest_mapping(&self, test_id: &str, headers: &[String]) -> Result<ColumnMapping, EngineError> {
        let fields = self.required_fields(test_id)?;
        Ok(self.resolver.resolve(&fields, headers))
    }

    /// Run a test over rows
    ///
    /// Rows shorter than a mapped column read that cell as blank.
    ///
    /// # Errors
    /// - [`EngineError::UnknownRule`] for an unregistered test id
    /// - [`EngineError::UnmappedField`] if a field the rule reads has no column
    pub fn run(&self, test_id: &str, mapping: &ColumnMapping, rows: &[Row]) -> Result<TestOutcome, EngineError> {
        let rule = self.registry.get(test_id)?;
        let columns = rule
            .fields()
            .into_iter()
            .map(|field| {
                mapping
                    .get(field)
                    .ok_or_else(|| EngineError::UnmappedField(field.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let parallel = rows.len() >= self.config.parallel_threshold;
        let exception_indices = rule.flag(&columns, rows, parallel);
        let exceptions: Vec<Row> = exception_indices.iter().map(|i| rows[*i].clone()).collect();

        tracing::info!(
            test_id,
            family = ?rule.family(),
            total_rows = rows.len(),
            exceptions = exceptions.len(),
            parallel,
            "test completed"
        );

        Ok(TestOutcome {
            exception_count: exceptions.len(),
            total_rows: rows.len(),
            exception_indices,
            exceptions,
        })
    }

    /// Run a test over a dataset, checking mapped columns against its headers
    ///
    /// # Errors
    /// As [`Self::run`], plus [`EngineError::ColumnOutOfRange`] when a mapped
    /// column is past the last header.
    pub fn run_dataset(
        &self,
        test_id: &str,
        mapping: &ColumnMapping,
        dataset: &Dataset,
    ) -> Result<TestOutcome, EngineError> {
        self.check_columns(test_id, mapping, dataset.width())?;
        self.run(test_id, mapping, &dataset.rows)
    }

    pub(crate) fn check_columns(
        &self,
        test_id: &str,
        mapping: &ColumnMapping,
        width: usize,
    ) -> Result<(), EngineError> {
        for field in self.required_fields(test_id)? {
            if let Some(index) = mapping.get(&field) {
                if index >= width {
                    return Err(EngineError::ColumnOutOfRange { field, index, width });
                }
            }
        }
        Ok(())
    }
}
