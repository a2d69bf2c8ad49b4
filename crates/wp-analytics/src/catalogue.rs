//! Built-in analytics test catalogue
//!
//! Tests are grouped by business process. Each entry names the fields it
//! needs, the keywords used to attach it to a generated risk, and the rule
//! family instantiation that executes it.

use crate::rules::{Comparison, RuleSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business process a test belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    /// Purchasing and accounts payable
    ProcureToPay,
    /// Payroll and HR master data
    Payroll,
    /// Sales and accounts receivable
    OrderToCash,
    /// User access management
    ItAccess,
}

impl Process {
    /// All processes in catalogue order
    pub const ALL: [Self; 4] = [Self::ProcureToPay, Self::Payroll, Self::OrderToCash, Self::ItAccess];

    /// Stable snake_case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcureToPay => "procure_to_pay",
            Self::Payroll => "payroll",
            Self::OrderToCash => "order_to_cash",
            Self::ItAccess => "it_access",
        }
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Process {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "procuretopay" | "p2p" | "purchasing" => Ok(Self::ProcureToPay),
            "payroll" | "hr" => Ok(Self::Payroll),
            "ordertocash" | "o2c" | "revenue" => Ok(Self::OrderToCash),
            "itaccess" | "itgc" | "access" => Ok(Self::ItAccess),
            _ => Err(format!("unknown process: {s}")),
        }
    }
}

/// One catalogued test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    /// Catalogue id, also the registry key
    pub id: String,
    /// Display name
    pub name: String,
    /// Owning process
    pub process: Process,
    /// What an exception means
    pub description: String,
    /// Substrings matched against risk descriptions
    pub keywords: Vec<String>,
    /// Rule executing the test
    pub rule: RuleSpec,
}

impl TestDefinition {
    /// Create definition
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        process: Process,
        rule: RuleSpec,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            process,
            description: String::new(),
            keywords: Vec::new(),
            rule,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With risk-matching keywords
    #[inline]
    #[must_use]
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Fields the test needs mapped
    #[inline]
    #[must_use]
    pub fn required_fields(&self) -> Vec<String> {
        self.rule.fields()
    }
}

/// Ordered set of test definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalogue {
    tests: Vec<TestDefinition>,
}

impl Catalogue {
    /// Create catalogue from definitions
    #[inline]
    #[must_use]
    pub fn new(tests: Vec<TestDefinition>) -> Self {
        Self { tests }
    }

    /// The built-in catalogue
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_tests())
    }

    /// Look up a test by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TestDefinition> {
        self.tests.iter().find(|t| t.id == id)
    }

    /// Tests of one process, in catalogue order
    pub fn for_process(&self, process: Process) -> impl Iterator<Item = &TestDefinition> {
        self.tests.iter().filter(move |t| t.process == process)
    }

    /// Iterate all tests
    pub fn iter(&self) -> impl Iterator<Item = &TestDefinition> {
        self.tests.iter()
    }

    /// Number of tests
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Check if catalogue is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

fn duplicate(fields: &[&str]) -> RuleSpec {
    RuleSpec::DuplicateKey {
        fields: fields.iter().map(|f| (*f).to_string()).collect(),
    }
}

fn shared(shared: &str, entity: &str) -> RuleSpec {
    RuleSpec::SharedAttribute {
        shared: shared.to_string(),
        entity: entity.to_string(),
    }
}

fn threshold(field: &str, comparison: Comparison, threshold: f64) -> RuleSpec {
    RuleSpec::Threshold {
        field: field.to_string(),
        comparison,
        threshold,
    }
}

fn membership(field: &str, targets: &[&str]) -> RuleSpec {
    RuleSpec::Membership {
        field: field.to_string(),
        targets: targets.iter().map(|t| (*t).to_string()).collect(),
    }
}

/// Spellings that all denote an administrator-level role
const PRIVILEGED_ROLES: &[&str] = &[
    "admin",
    "administrator",
    "sysadmin",
    "system administrator",
    "super user",
    "superuser",
    "super_user",
    "super-user",
    "root",
    "domain admin",
];

fn builtin_tests() -> Vec<TestDefinition> {
    use Process::{ItAccess, OrderToCash, Payroll, ProcureToPay};

    vec![
        TestDefinition::new(
            "P2P-01",
            "Duplicate invoices",
            ProcureToPay,
            duplicate(&["Vendor ID", "Invoice Number"]),
        )
        .with_description("Same vendor and invoice number recorded more than once")
        .with_keywords(&["duplicate invoice", "duplicate payment", "paid twice"]),
        TestDefinition::new(
            "P2P-02",
            "Vendors sharing bank accounts",
            ProcureToPay,
            shared("Bank Account", "Vendor ID"),
        )
        .with_description("One bank account set up against several vendors")
        .with_keywords(&["fictitious vendor", "vendor master", "bank detail"]),
        TestDefinition::new(
            "P2P-03",
            "Negative invoice amounts",
            ProcureToPay,
            threshold("Amount", Comparison::LessThan, 0.0),
        )
        .with_description("Invoice lines with a negative amount")
        .with_keywords(&["credit note", "negative", "invoice amount"]),
        TestDefinition::new(
            "P2P-04",
            "Invoices above approval limit",
            ProcureToPay,
            threshold("Amount", Comparison::GreaterThan, 10_000.0),
        )
        .with_description("Invoices exceeding the single-approver limit")
        .with_keywords(&["approval", "authori", "delegation"]),
        TestDefinition::new(
            "PAY-01",
            "Duplicate employee IDs",
            Payroll,
            duplicate(&["Employee ID"]),
        )
        .with_description("Employee id appearing on more than one payroll record")
        .with_keywords(&["duplicate employee", "duplicate payroll"]),
        TestDefinition::new(
            "PAY-02",
            "Employees sharing bank accounts",
            Payroll,
            shared("Bank Account", "Employee ID"),
        )
        .with_description("One bank account receiving pay for several employees")
        .with_keywords(&["ghost employee", "fictitious employee", "bank account"]),
        TestDefinition::new(
            "PAY-03",
            "Negative net pay",
            Payroll,
            threshold("Net Pay", Comparison::LessThan, 0.0),
        )
        .with_description("Payslips with net pay below zero")
        .with_keywords(&["payroll calculation", "net pay", "inaccurate pay"]),
        TestDefinition::new(
            "O2C-01",
            "Duplicate sales invoices",
            OrderToCash,
            duplicate(&["Invoice Number"]),
        )
        .with_description("Sales invoice number issued more than once")
        .with_keywords(&["duplicate invoice", "duplicate billing", "revenue recognition"]),
        TestDefinition::new(
            "O2C-02",
            "Negative sales amounts",
            OrderToCash,
            threshold("Amount", Comparison::LessThan, 0.0),
        )
        .with_description("Sales lines recorded with a negative value")
        .with_keywords(&["credit note", "return", "negative"]),
        TestDefinition::new(
            "O2C-03",
            "Excessive discounts",
            OrderToCash,
            threshold("Discount Percent", Comparison::GreaterThan, 20.0),
        )
        .with_description("Discounts above the standard pricing policy")
        .with_keywords(&["discount", "pricing"]),
        TestDefinition::new(
            "ITA-01",
            "Privileged access users",
            ItAccess,
            membership("Access Level", PRIVILEGED_ROLES),
        )
        .with_description("Accounts holding an administrator-level role")
        .with_keywords(&["privileged", "admin", "super user", "excessive access"]),
        TestDefinition::new(
            "ITA-02",
            "Duplicate user accounts",
            ItAccess,
            duplicate(&["User ID"]),
        )
        .with_description("User id provisioned more than once")
        .with_keywords(&["duplicate user", "shared account", "user provisioning"]),
    ]
}
