//! Working Paper Population Analytics
//!
//! Runs catalogued exception tests over whole datasets.
//!
//! # Core Concepts
//!
//! - [`ColumnResolver`]: suggests which header holds each field a test needs
//! - [`ExceptionRule`]: one of four pure rule families
//! - [`TestEngine`]: registry-backed runner returning the full exception set
//! - [`invoke_json`]: JSON request/response surface with display sampling
//! - [`map_tests`]: attaches catalogue tests to generated risks by keyword
//!
//! # Example
//!
//! ```rust
//! use wp_analytics::{Cell, ColumnMapping, TestEngine};
//!
//! let engine = TestEngine::with_defaults();
//! let headers = vec!["Vendor".to_string(), "Inv No".to_string()];
//! let mapping = engine.suggest_mapping("O2C-01", &headers).unwrap();
//! assert_eq!(mapping, ColumnMapping::new().with("Invoice Number", 1));
//!
//! let rows = vec![
//!     vec![Cell::from("V1"), Cell::from("INV1")],
//!     vec![Cell::from("V2"), Cell::from("INV1")],
//! ];
//! let outcome = engine.run("O2C-01", &mapping, &rows).unwrap();
//! assert_eq!(outcome.exception_count, 2);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod catalogue;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod invocation;
pub mod mapper;
pub mod registry;
pub mod resolver;
pub mod rules;

// Re-exports
pub use catalogue::{Catalogue, Process, TestDefinition};
pub use config::EngineConfig;
pub use dataset::{cell_at, Cell, Dataset, Row};
pub use engine::{TestEngine, TestOutcome};
pub use error::{ConfigError, EngineError, MAPPING_HINT};
pub use invocation::{invoke, invoke_json, TestRequest, TestResponse};
pub use mapper::{attach_process_tests, map_tests};
pub use registry::RuleRegistry;
pub use resolver::{normalize, AliasRegistry, ColumnMapping, ColumnResolver};
pub use rules::{
    Comparison, DuplicateKeyRule, ExceptionRule, MembershipRule, RuleFamily, RuleSpec, SharedAttributeRule,
    ThresholdRule,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running tests
    pub use crate::{
        Catalogue, Cell, ColumnMapping, ColumnResolver, EngineConfig, EngineError, Process, Row, TestEngine,
        TestRequest, TestResponse,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
