//! Column resolution
//!
//! Proposes which header column holds each field a test needs. A header
//! matches a field when their normalized forms are equal, or when the
//! normalized header is a registered alias of the normalized field. For each
//! field the first matching header in file order wins.
//!
//! Resolution never fails; fields with no match are left out of the
//! mapping and the caller decides whether to ask the user for them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lowercase and drop everything that is not a letter or digit
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Alternate header spellings per field, keyed and valued by normalized form
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    aliases: HashMap<String, HashSet<String>>,
}

impl AliasRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the built-in alias table
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (field, aliases) in DEFAULT_ALIASES {
            registry.register(field, aliases.iter().copied());
        }
        registry
    }

    /// Add aliases for a field; both sides are normalized on the way in
    pub fn register<S: AsRef<str>>(&mut self, field: &str, aliases: impl IntoIterator<Item = S>) {
        let entry = self.aliases.entry(normalize(field)).or_default();
        entry.extend(
            aliases
                .into_iter()
                .map(|a| normalize(a.as_ref()))
                .filter(|a| !a.is_empty()),
        );
    }

    /// Check whether a normalized header is an alias of a normalized field
    #[inline]
    #[must_use]
    pub fn is_alias(&self, normalized_field: &str, normalized_header: &str) -> bool {
        self.aliases
            .get(normalized_field)
            .is_some_and(|set| set.contains(normalized_header))
    }

    /// Aliases registered for a field
    #[must_use]
    pub fn aliases_of(&self, field: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .aliases
            .get(&normalize(field))
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Number of fields with aliases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Built-in aliases, written in normalized form
const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    (
        "employeeid",
        &[
            "empno", "empid", "empnum", "employeeno", "employeenumber", "employeenum", "eeid",
            "staffid", "staffno", "personnelno", "personnelnumber", "workerid", "payrollid",
        ],
    ),
    (
        "employeename",
        &["empname", "staffname", "fullname", "name", "employee", "workername"],
    ),
    (
        "invoicenumber",
        &[
            "invno", "invnum", "inv", "invoiceno", "invoicenum", "invoiceid", "invoice", "billno",
            "documentno", "docno",
        ],
    ),
    (
        "vendorid",
        &[
            "vendorno", "vendornumber", "vendornum", "vendorcode", "vendor", "supplierid",
            "supplierno", "suppliernumber", "suppliercode", "supplier", "payeeid",
        ],
    ),
    (
        "bankaccount",
        &[
            "bankaccountnumber", "bankaccountno", "bankacct", "bankacctno", "accountnumber",
            "accountno", "acctno", "acctnum", "iban",
        ],
    ),
    (
        "amount",
        &["amt", "invoiceamount", "value", "total", "grossamount", "transactionamount", "lineamount"],
    ),
    (
        "netpay",
        &["netsalary", "netamount", "netpayment", "takehomepay", "netwage", "netwages"],
    ),
    (
        "userid",
        &["user", "username", "login", "loginid", "logon", "uid", "accountname", "samaccountname"],
    ),
    (
        "accesslevel",
        &[
            "role", "userrole", "accessrole", "securityrole", "permission", "permissions",
            "privilege", "privilegelevel", "profile", "accessprofile",
        ],
    ),
    (
        "customerid",
        &["custid", "custno", "customerno", "customernumber", "customer", "clientid", "accountid"],
    ),
    (
        "creditlimit",
        &["limit", "custlimit", "customercreditlimit"],
    ),
    (
        "discountpercent",
        &["discount", "discountpct", "disc", "discountrate"],
    ),
    (
        "terminationdate",
        &["termdate", "leavedate", "leftdate", "enddate", "separationdate"],
    ),
];

/// Assignment of required field names to column indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    columns: IndexMap<String, usize>,
}

impl ColumnMapping {
    /// Create empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a field to a column
    #[inline]
    pub fn insert(&mut self, field: impl Into<String>, column: usize) {
        self.columns.insert(field.into(), column);
    }

    /// Builder-style [`Self::insert`]
    #[inline]
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, column: usize) -> Self {
        self.insert(field, column);
        self
    }

    /// Column assigned to a field
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<usize> {
        self.columns.get(field).copied()
    }

    /// Fields from `required` with no column assigned
    #[must_use]
    pub fn unresolved<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|f| !self.columns.contains_key(f.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Check every required field has a column
    #[inline]
    #[must_use]
    pub fn is_complete(&self, required: &[String]) -> bool {
        self.unresolved(required).is_empty()
    }

    /// Iterate `(field, column)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(f, c)| (f.as_str(), *c))
    }

    /// Number of mapped fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if nothing is mapped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for ColumnMapping {
    fn from_iter<T: IntoIterator<Item = (S, usize)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().map(|(f, c)| (f.into(), c)).collect(),
        }
    }
}

/// Suggests column mappings using exact and alias matching
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    aliases: AliasRegistry,
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::new(AliasRegistry::with_defaults())
    }
}

impl ColumnResolver {
    /// Create resolver over an alias registry
    #[inline]
    #[must_use]
    pub fn new(aliases: AliasRegistry) -> Self {
        Self { aliases }
    }

    /// Alias registry in use
    #[inline]
    #[must_use]
    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Check whether a header matches a field
    #[must_use]
    pub fn matches(&self, field: &str, header: &str) -> bool {
        let field = normalize(field);
        let header = normalize(header);
        !header.is_empty() && (header == field || self.aliases.is_alias(&field, &header))
    }

    /// Propose a column for each required field
    ///
    /// Fields with no matching header are absent from the result.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, required: &[S], headers: &[String]) -> ColumnMapping {
        let normalized_headers: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
        let mut mapping = ColumnMapping::new();

        for field in required {
            let field = field.as_ref();
            let key = normalize(field);
            let hit = normalized_headers
                .iter()
                .position(|h| !h.is_empty() && (*h == key || self.aliases.is_alias(&key, h)));
            match hit {
                Some(column) => mapping.insert(field, column),
                None => tracing::debug!(field, "no header matched"),
            }
        }

        mapping
    }
}
