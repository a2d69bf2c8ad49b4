//! Engine configuration
//!
//! Loaded from TOML or YAML. Every field has a default so an empty file is a
//! valid configuration.

use crate::error::ConfigError;
use crate::resolver::AliasRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default number of exception rows returned for display
pub const DEFAULT_SAMPLE_CAP: usize = 100;

/// Default row count at which rule evaluation goes parallel
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Analytics engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Maximum exception rows included in a response sample
    pub sample_cap: usize,
    /// Row count at or above which rules run on the rayon pool
    pub parallel_threshold: usize,
    /// Additional header aliases per field, merged into the defaults
    pub extra_aliases: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_cap: DEFAULT_SAMPLE_CAP,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            extra_aliases: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With sample cap
    #[inline]
    #[must_use]
    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap;
        self
    }

    /// With parallel threshold
    #[inline]
    #[must_use]
    pub fn with_parallel_threshold(mut self, rows: usize) -> Self {
        self.parallel_threshold = rows;
        self
    }

    /// With extra aliases for a field
    #[must_use]
    pub fn with_aliases(mut self, field: impl Into<String>, aliases: &[&str]) -> Self {
        self.extra_aliases
            .entry(field.into())
            .or_default()
            .extend(aliases.iter().map(|a| (*a).to_string()));
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// [`ConfigError::InvalidToml`] on syntax or shape errors.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse from YAML text
    ///
    /// # Errors
    /// [`ConfigError::InvalidYaml`] on syntax or shape errors.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// IO, parse, or [`ConfigError::UnsupportedFormat`] for other extensions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config = match extension.as_str() {
            "toml" => Self::from_toml_str(&text)?,
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        tracing::debug!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    /// Default alias registry extended with [`Self::extra_aliases`]
    #[must_use]
    pub fn alias_registry(&self) -> AliasRegistry {
        let mut registry = AliasRegistry::with_defaults();
        for (field, aliases) in &self.extra_aliases {
            registry.register(field, aliases);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_cap, 100);
        assert_eq!(config.parallel_threshold, 10_000);
        assert!(config.extra_aliases.is_empty());
    }

    #[test]
    fn empty_documents_are_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn toml_overrides_and_aliases() {
        let config = EngineConfig::from_toml_str(
            r#"
            sample_cap = 25

            [extra_aliases]
            "Employee ID" = ["Personalnummer", "Matricule"]
            "#,
        )
        .unwrap();
        assert_eq!(config.sample_cap, 25);
        assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);

        let registry = config.alias_registry();
        assert!(registry.is_alias("employeeid", "matricule"));
        assert!(registry.is_alias("employeeid", "empno"));
    }

    #[test]
    fn yaml_config() {
        let config = EngineConfig::from_yaml_str("parallel_threshold: 500\n").unwrap();
        assert_eq!(config.parallel_threshold, 500);
    }

    #[test]
    fn invalid_toml_is_reported() {
        assert!(matches!(
            EngineConfig::from_toml_str("sample_cap = \"many\""),
            Err(ConfigError::InvalidToml(_))
        ));
    }

    #[test]
    fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "sample_cap = 10").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().sample_cap, 10);

        let other = dir.path().join("engine.ini");
        std::fs::write(&other, "").unwrap();
        assert!(matches!(
            EngineConfig::load(&other),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn builder_methods() {
        let config = EngineConfig::new()
            .with_sample_cap(5)
            .with_parallel_threshold(1)
            .with_aliases("Amount", &["Betrag"]);
        assert_eq!(config.sample_cap, 5);
        assert_eq!(config.extra_aliases["Amount"], vec!["Betrag".to_string()]);
    }
}
