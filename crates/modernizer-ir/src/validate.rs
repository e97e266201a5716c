//! Strict schema validation for candidate documents
//!
//! Candidate JSON (typically produced by a generation backend) is walked
//! field by field against the schema of the target document. All problems
//! are collected with their JSON path so that a corrective instruction can
//! be built for a retry.
//!
//! Rules:
//! - Required fields must be present with the right JSON type
//! - `type` and `severity` must be one of their enum names
//! - Unknown keys at the document root are rejected
//! - Unknown keys in nested objects are dropped, never retained
//! - Optional list fields accept a missing value (empty list) or a single
//!   element (one-element list); nothing else is coerced

use crate::artifacts::{DocumentKind, DocumentationBundle, ModernizedCodeRecord};
use crate::ir::{ModuleKind, ProjectIR, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

/// A document type with a validation schema
pub trait Schema: DeserializeOwned {
    /// Schema name used in diagnostics
    const NAME: &'static str;

    /// Check `value` and produce its normalized form
    ///
    /// Problems are appended to `issues`. The returned value is only
    /// meaningful when no issues were recorded.
    #[doc(hidden)]
    fn normalize(value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value>;
}

/// Validate a candidate JSON value against schema `S`
///
/// Pure and deterministic: the same input always yields the same result.
///
/// # Errors
/// Returns [`ValidationError`] listing every (path, problem) pair found.
pub fn validate<S: Schema>(candidate: &Value) -> Result<S, ValidationError> {
    let mut issues = Vec::new();
    let normalized = S::normalize(candidate, &mut issues);

    if !issues.is_empty() {
        return Err(ValidationError::new(S::NAME, issues));
    }

    let normalized = normalized.ok_or_else(|| {
        ValidationError::single(S::NAME, "$", Problem::Unreadable("no value".into()))
    })?;

    serde_json::from_value(normalized).map_err(|e| {
        ValidationError::single(S::NAME, "$", Problem::Unreadable(e.to_string()))
    })
}

/// Candidate document failed schema conformance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{schema} failed validation ({} issue(s)): {}", .issues.len(), summarize(.issues))]
pub struct ValidationError {
    /// Name of the schema that was violated
    pub schema: &'static str,
    /// Every problem found
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Create from a list of issues
    #[inline]
    #[must_use]
    pub fn new(schema: &'static str, issues: Vec<ValidationIssue>) -> Self {
        Self { schema, issues }
    }

    /// Create from a single issue
    #[inline]
    #[must_use]
    pub fn single(schema: &'static str, path: impl Into<String>, problem: Problem) -> Self {
        Self::new(schema, vec![ValidationIssue::new(path, problem)])
    }

    /// Whether any issue is reported at exactly `path`
    #[must_use]
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }

    /// Follow-up instruction describing how to fix the document
    #[must_use]
    pub fn corrective_instruction(&self) -> String {
        let mut text = format!(
            "Your previous response did not conform to the {} schema. \
             Fix the following problems and return the complete corrected JSON document only, \
             with no additional fields:\n",
            self.schema
        );
        for issue in &self.issues {
            text.push_str("- ");
            text.push_str(&issue.to_string());
            text.push('\n');
        }
        text
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One (field path, problem) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON path, e.g. `modules[0].functions[1].name`; `$` is the root
    pub path: String,
    pub problem: Problem,
}

impl ValidationIssue {
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, problem: Problem) -> Self {
        Self {
            path: path.into(),
            problem,
        }
    }
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.path, self.problem)
    }
}

/// What is wrong with a field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Problem {
    #[error("required field is missing")]
    Missing,

    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{found}` is not one of: {}", .allowed.join(", "))]
    NotAllowed {
        allowed: &'static [&'static str],
        found: String,
    },

    #[error("must not be empty")]
    Empty,

    #[error("field is not part of the schema")]
    UnknownField,

    #[error("`{0}` is a type name; describe the failure condition instead")]
    TypeNameAsException(String),

    #[error("{0}")]
    Ungrounded(String),

    #[error("document could not be read: {0}")]
    Unreadable(String),
}

/// Exception labels that are bare type names rather than described conditions
static TYPE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[A-Za-z_]\w*(?:(?:\.|::)[A-Za-z_]\w*)+|[A-Z]\w*(?:Error|Exception|Fault)|[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]*)+)$",
    )
    .expect("type-name pattern is valid")
});

/// Whether an exception label looks like a language-specific type name
#[must_use]
pub fn is_type_name(label: &str) -> bool {
    TYPE_NAME.is_match(label.trim())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn element(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "$"
    } else {
        path
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Text {
    NonEmpty,
    Any,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Unknown {
    Reject,
    Drop,
}

type ItemNormalizer = fn(&str, &Value, &mut Vec<ValidationIssue>) -> Option<Value>;

/// Cursor over one JSON object being normalized
struct Fields<'v, 'i> {
    path: String,
    map: &'v Map<String, Value>,
    out: Map<String, Value>,
    known: Vec<&'static str>,
    issues: &'i mut Vec<ValidationIssue>,
}

impl<'v, 'i> Fields<'v, 'i> {
    fn open(path: &str, value: &'v Value, issues: &'i mut Vec<ValidationIssue>) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                path: path.to_string(),
                map,
                out: Map::new(),
                known: Vec::new(),
                issues,
            }),
            other => {
                issues.push(ValidationIssue::new(
                    display_path(path),
                    Problem::WrongType {
                        expected: "object",
                        found: json_type(other),
                    },
                ));
                None
            }
        }
    }

    fn report(&mut self, key: &str, problem: Problem) {
        self.issues
            .push(ValidationIssue::new(child(&self.path, key), problem));
    }

    fn lookup(&mut self, key: &'static str) -> Option<&'v Value> {
        self.known.push(key);
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Required string field
    fn text(&mut self, key: &'static str, rule: Text) {
        match self.lookup(key) {
            None => self.report(key, Problem::Missing),
            Some(Value::String(s)) if rule == Text::NonEmpty && s.trim().is_empty() => {
                self.report(key, Problem::Empty);
            }
            Some(Value::String(s)) => {
                self.out.insert(key.to_string(), Value::String(s.clone()));
            }
            Some(other) => self.report(
                key,
                Problem::WrongType {
                    expected: "string",
                    found: json_type(other),
                },
            ),
        }
    }

    /// Optional string field; absent or null keeps the schema default
    fn optional_text(&mut self, key: &'static str) {
        match self.lookup(key) {
            None => {}
            Some(Value::String(s)) => {
                self.out.insert(key.to_string(), Value::String(s.clone()));
            }
            Some(other) => self.report(
                key,
                Problem::WrongType {
                    expected: "string",
                    found: json_type(other),
                },
            ),
        }
    }

    /// Required string restricted to an enum
    fn one_of(&mut self, key: &'static str, allowed: &'static [&'static str]) {
        match self.lookup(key) {
            None => self.report(key, Problem::Missing),
            Some(Value::String(s)) if allowed.iter().any(|a| *a == s.as_str()) => {
                self.out.insert(key.to_string(), Value::String(s.clone()));
            }
            Some(Value::String(s)) => self.report(
                key,
                Problem::NotAllowed {
                    allowed,
                    found: s.clone(),
                },
            ),
            Some(other) => self.report(
                key,
                Problem::WrongType {
                    expected: "string",
                    found: json_type(other),
                },
            ),
        }
    }

    /// Optional list of non-empty strings
    fn string_list(&mut self, key: &'static str) -> Vec<String> {
        let items: Vec<&Value> = match self.lookup(key) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single @ Value::String(_)) => vec![single],
            Some(other) => {
                self.report(
                    key,
                    Problem::WrongType {
                        expected: "array of strings",
                        found: json_type(other),
                    },
                );
                return Vec::new();
            }
        };

        let base = child(&self.path, key);
        let mut strings = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Value::String(s) if s.trim().is_empty() => self
                    .issues
                    .push(ValidationIssue::new(element(&base, i), Problem::Empty)),
                Value::String(s) => strings.push(s.clone()),
                other => self.issues.push(ValidationIssue::new(
                    element(&base, i),
                    Problem::WrongType {
                        expected: "string",
                        found: json_type(other),
                    },
                )),
            }
        }

        self.out.insert(
            key.to_string(),
            Value::Array(strings.iter().cloned().map(Value::String).collect()),
        );
        strings
    }

    /// List of objects; a single object is accepted as a one-element list
    fn object_list(&mut self, key: &'static str, required: bool, item: ItemNormalizer) -> usize {
        let items: Vec<&Value> = match self.lookup(key) {
            None if required => {
                self.report(key, Problem::Missing);
                return 0;
            }
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single @ Value::Object(_)) => vec![single],
            Some(other) => {
                self.report(
                    key,
                    Problem::WrongType {
                        expected: "array of objects",
                        found: json_type(other),
                    },
                );
                return 0;
            }
        };

        let base = child(&self.path, key);
        let mut normalized = Vec::with_capacity(items.len());
        for (i, value) in items.iter().enumerate() {
            if let Some(v) = item(&element(&base, i), value, self.issues) {
                normalized.push(v);
            }
        }

        let count = items.len();
        self.out.insert(key.to_string(), Value::Array(normalized));
        count
    }

    fn finish(self, unknown: Unknown) -> Value {
        for key in self.map.keys() {
            if self.known.iter().any(|k| *k == key.as_str()) {
                continue;
            }
            match unknown {
                Unknown::Reject => self.issues.push(ValidationIssue::new(
                    child(&self.path, key),
                    Problem::UnknownField,
                )),
                Unknown::Drop => {
                    tracing::debug!(path = %child(&self.path, key), "dropping undeclared field");
                }
            }
        }
        Value::Object(self.out)
    }
}

fn normalize_module(path: &str, value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
    let mut f = Fields::open(path, value, issues)?;
    f.text("name", Text::NonEmpty);
    f.one_of("type", ModuleKind::NAMES);
    f.text("description", Text::Any);
    f.object_list("functions", false, normalize_function);
    f.object_list("attributes", false, normalize_io);
    f.string_list("imports");
    f.string_list("design_patterns");
    Some(f.finish(Unknown::Drop))
}

fn normalize_function(
    path: &str,
    value: &Value,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let mut f = Fields::open(path, value, issues)?;
    f.text("name", Text::NonEmpty);
    f.text("description", Text::Any);
    f.object_list("inputs", false, normalize_io);
    f.object_list("outputs", false, normalize_io);
    f.string_list("modifiers");
    f.object_list("decisions", false, normalize_decision);
    f.string_list("side_effects");

    let exceptions = f.string_list("exceptions");
    for (i, label) in exceptions.iter().enumerate() {
        if is_type_name(label) {
            let at = element(&child(&f.path, "exceptions"), i);
            f.issues.push(ValidationIssue::new(
                at,
                Problem::TypeNameAsException(label.clone()),
            ));
        }
    }

    f.string_list("dependencies");
    f.optional_text("business_logic");
    Some(f.finish(Unknown::Drop))
}

fn normalize_io(path: &str, value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
    let mut f = Fields::open(path, value, issues)?;
    f.text("name", Text::NonEmpty);
    f.text("type", Text::NonEmpty);
    f.optional_text("description");
    Some(f.finish(Unknown::Drop))
}

fn normalize_decision(
    path: &str,
    value: &Value,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let mut f = Fields::open(path, value, issues)?;
    f.text("condition", Text::NonEmpty);
    f.optional_text("description");
    Some(f.finish(Unknown::Drop))
}

fn normalize_debt(path: &str, value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
    let mut f = Fields::open(path, value, issues)?;
    f.text("category", Text::NonEmpty);
    f.optional_text("description");
    f.one_of("severity", Severity::NAMES);
    f.text("recommendation", Text::NonEmpty);
    Some(f.finish(Unknown::Drop))
}

impl Schema for ProjectIR {
    const NAME: &'static str = "ProjectIR";

    fn normalize(value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
        let mut f = Fields::open("", value, issues)?;
        f.text("language", Text::NonEmpty);
        f.text("original_filename", Text::NonEmpty);
        f.text("suggested_filename", Text::NonEmpty);
        f.text("summary", Text::Any);
        let empty = f
            .map
            .get("modules")
            .and_then(Value::as_array)
            .is_some_and(Vec::is_empty);
        f.object_list("modules", true, normalize_module);
        if empty {
            f.report("modules", Problem::Empty);
        }
        f.object_list("technical_debt", false, normalize_debt);
        f.string_list("dependencies");
        f.string_list("modernization_priority");
        Some(f.finish(Unknown::Reject))
    }
}

impl Schema for ModernizedCodeRecord {
    const NAME: &'static str = "ModernizedCodeRecord";

    fn normalize(value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
        let mut f = Fields::open("", value, issues)?;
        f.text("modernized_code", Text::Any);
        f.text("filename", Text::NonEmpty);
        f.text("changes_summary", Text::Any);
        Some(f.finish(Unknown::Reject))
    }
}

impl Schema for DocumentationBundle {
    const NAME: &'static str = "DocumentationBundle";

    fn normalize(value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
        let mut f = Fields::open("", value, issues)?;
        for kind in DocumentKind::ALL {
            f.text(kind.as_str(), Text::NonEmpty);
        }
        Some(f.finish(Unknown::Reject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ModuleKind;
    use serde_json::json;

    fn minimal_ir() -> Value {
        json!({
            "language": "python",
            "original_filename": "calc.py",
            "suggested_filename": "calculator.py",
            "summary": "Arithmetic helpers",
            "modules": [{
                "name": "calc",
                "type": "module",
                "description": "helpers",
                "functions": [{
                    "name": "add",
                    "description": "adds",
                    "inputs": [{"name": "a", "type": "number"}],
                    "exceptions": ["non-numeric operand"]
                }]
            }]
        })
    }

    #[test]
    fn accepts_minimal_document_with_defaults() {
        let ir: ProjectIR = validate(&minimal_ir()).unwrap();
        assert_eq!(ir.modules[0].kind, ModuleKind::Module);
        assert!(ir.technical_debt.is_empty());
        assert!(ir.modules[0].functions[0].outputs.is_empty());
        assert_eq!(ir.modules[0].functions[0].business_logic, "");
    }

    #[test]
    fn rejects_unknown_root_field() {
        let mut doc = minimal_ir();
        doc["confidence_score"] = json!(0.97);
        let err = validate::<ProjectIR>(&doc).unwrap_err();
        assert!(err.has_issue_at("confidence_score"));
        assert_eq!(err.issues[0].problem, Problem::UnknownField);
    }

    #[test]
    fn drops_unknown_nested_field() {
        let mut doc = minimal_ir();
        doc["modules"][0]["confidence"] = json!("high");
        let ir: ProjectIR = validate(&doc).unwrap();
        let reencoded = serde_json::to_value(&ir).unwrap();
        assert!(reencoded["modules"][0].get("confidence").is_none());
    }

    #[test]
    fn reports_all_problems_with_paths() {
        let doc = json!({
            "language": "python",
            "original_filename": "",
            "summary": 3,
            "modules": [{"name": "calc", "type": "package", "description": "x"}],
            "technical_debt": [{"category": "security", "severity": "severe", "recommendation": "fix"}]
        });
        let err = validate::<ProjectIR>(&doc).unwrap_err();
        assert!(err.has_issue_at("original_filename"));
        assert!(err.has_issue_at("suggested_filename"));
        assert!(err.has_issue_at("summary"));
        assert!(err.has_issue_at("modules[0].type"));
        assert!(err.has_issue_at("technical_debt[0].severity"));
        assert_eq!(err.issues.len(), 5);
    }

    #[test]
    fn coerces_singular_to_sequence() {
        let mut doc = minimal_ir();
        doc["dependencies"] = json!("requests");
        doc["modules"][0]["functions"][0]["outputs"] = json!({"name": "sum", "type": "number"});
        let ir: ProjectIR = validate(&doc).unwrap();
        assert!(ir.dependencies.contains("requests"));
        assert_eq!(ir.modules[0].functions[0].outputs.len(), 1);
    }

    #[test]
    fn does_not_coerce_scalar_types() {
        let mut doc = minimal_ir();
        doc["modules"][0]["functions"][0]["inputs"] = json!("a");
        let err = validate::<ProjectIR>(&doc).unwrap_err();
        assert!(err.has_issue_at("modules[0].functions[0].inputs"));
    }

    #[test]
    fn sets_are_deduplicated() {
        let mut doc = minimal_ir();
        doc["dependencies"] = json!(["os", "sys", "os"]);
        let ir: ProjectIR = validate(&doc).unwrap();
        assert_eq!(ir.dependencies.len(), 2);
    }

    #[test]
    fn modules_must_not_be_empty() {
        let mut doc = minimal_ir();
        doc["modules"] = json!([]);
        let err = validate::<ProjectIR>(&doc).unwrap_err();
        assert_eq!(err.issues[0].problem, Problem::Empty);

        doc.as_object_mut().unwrap().remove("modules");
        let err = validate::<ProjectIR>(&doc).unwrap_err();
        assert_eq!(err.issues[0].problem, Problem::Missing);
    }

    #[test]
    fn exception_type_names_rejected() {
        let mut doc = minimal_ir();
        doc["modules"][0]["functions"][0]["exceptions"] =
            json!(["ValueError", "java.io.IOException", "division by zero", "timeout"]);
        let err = validate::<ProjectIR>(&doc).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(err.has_issue_at("modules[0].functions[0].exceptions[0]"));
        assert!(err.has_issue_at("modules[0].functions[0].exceptions[1]"));
    }

    #[test]
    fn type_name_detection() {
        assert!(is_type_name("IOException"));
        assert!(is_type_name("KeyNotFound"));
        assert!(is_type_name("std::io::Error"));
        assert!(!is_type_name("file not found"));
        assert!(!is_type_name("Timeout"));
    }

    #[test]
    fn modernized_record_is_strict() {
        let ok = json!({"modernized_code": "x = 1", "filename": "a.py", "changes_summary": "none"});
        assert!(validate::<ModernizedCodeRecord>(&ok).is_ok());

        let extra = json!({"modernized_code": "", "filename": "a.py", "changes_summary": "", "notes": 1});
        assert!(validate::<ModernizedCodeRecord>(&extra)
            .unwrap_err()
            .has_issue_at("notes"));
    }

    #[test]
    fn documentation_bundle_requires_all_documents() {
        let mut doc = serde_json::Map::new();
        for kind in DocumentKind::ALL {
            doc.insert(kind.as_str().to_string(), json!(format!("# {kind}")));
        }
        let bundle: DocumentationBundle = validate(&Value::Object(doc.clone())).unwrap();
        assert!(bundle.is_complete());

        doc.remove("TESTING_GUIDE");
        doc.insert("CHANGELOG".into(), json!("# changes"));
        let err = validate::<DocumentationBundle>(&Value::Object(doc)).unwrap_err();
        assert!(err.has_issue_at("TESTING_GUIDE"));
        assert!(err.has_issue_at("CHANGELOG"));
    }

    #[test]
    fn non_object_root_is_reported() {
        let err = validate::<ProjectIR>(&json!([1, 2])).unwrap_err();
        assert!(err.has_issue_at("$"));
    }

    #[test]
    fn corrective_instruction_lists_paths() {
        let err = validate::<ProjectIR>(&json!({"language": "python"})).unwrap_err();
        let text = err.corrective_instruction();
        assert!(text.contains("`original_filename`: required field is missing"));
        assert!(text.contains("ProjectIR"));
    }
}
