//! Intermediate representation types
//!
//! The IR describes one source unit independently of its language:
//! - [`ProjectIR`]: root document (one per source unit)
//! - [`ModuleIR`]: class, module or interface, in declaration order
//! - [`FunctionIR`]: one callable unit
//! - [`TechnicalDebtItem`]: an identified issue with an ordinal [`Severity`]
//!
//! Every struct denies unknown fields, so a document can only be built
//! through the validator or from already-normalized JSON.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Root IR document for one source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProjectIR {
    /// Programming language tag (lowercase, e.g. `python`)
    pub language: String,
    /// File name as received
    pub original_filename: String,
    /// Advisory modern file name; never overrides output paths
    pub suggested_filename: String,
    /// High-level description of the unit
    pub summary: String,
    /// Modules in declaration order
    pub modules: Vec<ModuleIR>,
    /// Identified technical debt
    #[serde(default)]
    pub technical_debt: Vec<TechnicalDebtItem>,
    /// External libraries the unit depends on
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// What to modernize first, highest priority first
    #[serde(default)]
    pub modernization_priority: Vec<String>,
}

impl ProjectIR {
    /// Total number of functions across all modules
    #[inline]
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.modules.iter().map(|m| m.functions.len()).sum()
    }

    /// Technical debt items at the given severity, in IR order
    pub fn debt_with_severity(&self, severity: Severity) -> impl Iterator<Item = &TechnicalDebtItem> {
        self.technical_debt
            .iter()
            .filter(move |d| d.severity == severity)
    }

    /// Union of design patterns across all modules
    #[must_use]
    pub fn design_patterns(&self) -> BTreeSet<&str> {
        self.modules
            .iter()
            .flat_map(|m| m.design_patterns.iter().map(String::as_str))
            .collect()
    }
}

/// Kind of a module-level unit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// A class
    Class,
    /// A module / file-level namespace
    Module,
    /// An interface or protocol
    Interface,
}

impl ModuleKind {
    /// All accepted wire names
    pub const NAMES: &'static [&'static str] = &["class", "module", "interface"];

    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Module => "module",
            Self::Interface => "interface",
        }
    }
}

impl Display for ModuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A class, module or interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ModuleIR {
    /// Module name (non-empty)
    pub name: String,
    /// Module kind
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    /// Purpose of the module
    pub description: String,
    /// Functions and methods in declaration order
    #[serde(default)]
    pub functions: Vec<FunctionIR>,
    /// Attributes / fields
    #[serde(default)]
    pub attributes: Vec<IoType>,
    /// Imported symbols or packages
    #[serde(default)]
    pub imports: BTreeSet<String>,
    /// Design patterns in use
    #[serde(default)]
    pub design_patterns: BTreeSet<String>,
}

/// One callable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FunctionIR {
    /// Function name (non-empty)
    pub name: String,
    /// What the function does
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<IoType>,
    #[serde(default)]
    pub outputs: Vec<IoType>,
    /// Visibility, `static`, `async` and similar
    #[serde(default)]
    pub modifiers: BTreeSet<String>,
    /// Branching-logic summaries
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub side_effects: Vec<String>,
    /// Described failure conditions (semantic labels, not type names)
    #[serde(default)]
    pub exceptions: Vec<String>,
    /// Referenced symbols
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    #[serde(default)]
    pub business_logic: String,
}

/// Named, typed value: a parameter, return value or attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct IoType {
    pub name: String,
    /// Semantic type
    #[serde(rename = "type")]
    pub ty: String,
    /// Optional constraint note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IoType {
    /// Create a new IO type without a note
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            description: None,
        }
    }
}

/// A branch in the control flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Decision {
    /// Condition being checked
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordinal severity of a debt item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All accepted wire names, lowest first
    pub const NAMES: &'static [&'static str] = &["low", "medium", "high", "critical"];

    /// Most severe first
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identified technical debt issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TechnicalDebtItem {
    /// Issue category (e.g. `security`)
    pub category: String,
    /// What the issue is
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    /// How to resolve it
    pub recommendation: String,
}
