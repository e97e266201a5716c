//! Modernizer IR
//!
//! The language-agnostic intermediate representation that every downstream
//! artifact is derived from, plus the strict validator that guards it.
//!
//! # Core Concepts
//!
//! - [`ProjectIR`]: canonical description of one source unit
//! - [`ModernizedCodeRecord`], [`DocumentationBundle`]: artifacts derived from the IR
//! - [`validate`]: parse-then-validate gate for untrusted JSON
//! - [`Fingerprint`]: Blake3 digest of an artifact's canonical JSON
//!
//! # Example
//!
//! ```rust,ignore
//! use modernizer_ir::{validate, ProjectIR};
//!
//! let candidate: serde_json::Value = serde_json::from_str(raw)?;
//! match validate::<ProjectIR>(&candidate) {
//!     Ok(ir) => println!("{} modules", ir.modules.len()),
//!     Err(e) => println!("{}", e.corrective_instruction()),
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifacts;
mod fingerprint;
mod ir;
mod validate;

pub use artifacts::{DocumentKind, DocumentationBundle, ModernizedCodeRecord, UnknownDocument};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use ir::{
    Decision, FunctionIR, IoType, ModuleIR, ModuleKind, ProjectIR, Severity, TechnicalDebtItem,
};
pub use validate::{is_type_name, validate, Problem, Schema, ValidationError, ValidationIssue};

/// JSON Schema of [`ProjectIR`], pretty-printed, for embedding in instructions
#[must_use]
pub fn project_ir_json_schema() -> String {
    let schema = schemars::schema_for!(ProjectIR);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
