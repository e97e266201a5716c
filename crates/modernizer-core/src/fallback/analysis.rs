//! Heuristic analysis fallback
//!
//! Builds a minimal IR from the file name, the language tag and
//! line-level import statements. There is no parsing: one top-level module
//! named after the file, no functions, and a single debt item recording
//! that no deep analysis took place.

use crate::unit::SourceUnit;
use modernizer_ir::{ModuleIR, ModuleKind, ProjectIR, Severity, TechnicalDebtItem};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Debt category of the heuristic-analysis marker item
pub const HEURISTIC_DEBT_CATEGORY: &str = "analysis";

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("import pattern is valid")
}

static PYTHON_IMPORT: Lazy<Regex> = Lazy::new(|| pattern(r"(?m)^\s*import\s+([\w.]+(?:\s*,\s*[\w.]+)*)"));
static PYTHON_FROM: Lazy<Regex> = Lazy::new(|| pattern(r"(?m)^\s*from\s+([\w.]+)\s+import\b"));
static JVM_IMPORT: Lazy<Regex> = Lazy::new(|| pattern(r"(?m)^\s*import\s+(?:static\s+)?([\w.]+)"));
static JS_FROM: Lazy<Regex> = Lazy::new(|| pattern(r#"(?m)^\s*import\s+(?:[^'"]*?\s+from\s+)?['"]([^'"]+)['"]"#));
static JS_REQUIRE: Lazy<Regex> = Lazy::new(|| pattern(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#));
static C_INCLUDE: Lazy<Regex> = Lazy::new(|| pattern(r#"(?m)^\s*#\s*include\s*[<"]([^>"]+)[>"]"#));
static CS_USING: Lazy<Regex> = Lazy::new(|| pattern(r"(?m)^\s*using\s+(?:static\s+)?([\w.]+)\s*;"));
static GO_SINGLE: Lazy<Regex> = Lazy::new(|| pattern(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#));
static GO_BLOCK: Lazy<Regex> = Lazy::new(|| pattern(r"(?s)import\s*\((.*?)\)"));
static QUOTED: Lazy<Regex> = Lazy::new(|| pattern(r#""([^"]+)""#));
static RUST_USE: Lazy<Regex> = Lazy::new(|| pattern(r"(?m)^\s*(?:pub\s+)?use\s+([\w:]+)"));
static SWIFT_IMPORT: Lazy<Regex> = Lazy::new(|| pattern(r"(?m)^\s*import\s+(\w+)"));

fn captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Imported modules, packages or headers found on import lines
#[must_use]
pub fn extract_imports(language: &str, text: &str) -> BTreeSet<String> {
    let found: Vec<String> = match language {
        "python" => captures(&PYTHON_IMPORT, text)
            .iter()
            .flat_map(|list| list.split(',').map(|s| s.trim().to_string()))
            .chain(captures(&PYTHON_FROM, text))
            .collect(),
        "java" | "kotlin" | "scala" => captures(&JVM_IMPORT, text),
        "javascript" | "typescript" => {
            let mut all = captures(&JS_FROM, text);
            all.extend(captures(&JS_REQUIRE, text));
            all
        }
        "c" | "cpp" => captures(&C_INCLUDE, text),
        "csharp" => captures(&CS_USING, text),
        "go" => {
            let mut all = captures(&GO_SINGLE, text);
            for block in captures(&GO_BLOCK, text) {
                all.extend(captures(&QUOTED, &block));
            }
            all
        }
        "rust" => captures(&RUST_USE, text),
        "swift" => captures(&SWIFT_IMPORT, text),
        _ => Vec::new(),
    };
    found.into_iter().filter(|s| !s.is_empty()).collect()
}

/// External package an import belongs to, if it is not project-local
fn dependency_of(language: &str, import: &str) -> Option<String> {
    let root = match language {
        "python" => import.split('.').next()?,
        "java" | "kotlin" | "scala" => {
            // drop the imported class, keep its package
            return import
                .rsplit_once('.')
                .map(|(package, _)| package.to_string())
                .or_else(|| Some(import.to_string()));
        }
        "javascript" | "typescript" => {
            if import.starts_with('.') || import.starts_with('/') {
                return None;
            }
            let mut parts = import.split('/');
            let first = parts.next()?;
            if first.starts_with('@') {
                return parts.next().map(|second| format!("{first}/{second}"));
            }
            first
        }
        "rust" => {
            let first = import.split("::").next()?;
            if matches!(first, "crate" | "self" | "super") {
                return None;
            }
            first
        }
        _ => import,
    };
    (!root.is_empty()).then(|| root.to_string())
}

/// Deterministic IR for `unit`, derived without a backend
#[must_use]
pub fn analysis_fallback(unit: &SourceUnit) -> ProjectIR {
    let language = unit.language();
    let imports = extract_imports(language, unit.text());
    let dependencies = imports
        .iter()
        .filter_map(|i| dependency_of(language, i))
        .filter(|d| !d.trim().is_empty())
        .collect();

    ProjectIR {
        language: language.to_string(),
        original_filename: unit.original_filename().to_string(),
        suggested_filename: unit.original_filename().to_string(),
        summary: format!(
            "Heuristic-only analysis of {} ({} source, {} lines). Structure was derived from \
             the file name and import statements; no deep analysis was performed.",
            unit.original_filename(),
            language,
            unit.line_count()
        ),
        modules: vec![ModuleIR {
            name: unit.stem().to_string(),
            kind: ModuleKind::Module,
            description: format!("Top-level module of {}", unit.original_filename()),
            functions: Vec::new(),
            attributes: Vec::new(),
            imports,
            design_patterns: BTreeSet::new(),
        }],
        technical_debt: vec![TechnicalDebtItem {
            category: HEURISTIC_DEBT_CATEGORY.to_string(),
            description: "No deep analysis performed: the IR was derived from structural \
                          heuristics only."
                .to_string(),
            severity: Severity::Medium,
            recommendation: "Re-run the analysis with a generation backend configured to \
                             obtain functions, decisions and side effects."
                .to_string(),
        }],
        dependencies,
        modernization_priority: vec![format!(
            "Run a full analysis of {} with a generation backend",
            unit.original_filename()
        )],
    }
}
