//! Stage instructions
//!
//! Every request demands a single JSON document and nothing else. The
//! analysis instruction embeds the generated JSON Schema of the IR so the
//! backend sees the exact contract it is validated against.

use crate::unit::SourceUnit;
use modernizer_backend::GenerationRequest;
use modernizer_ir::{project_ir_json_schema, DocumentKind, ProjectIR};
use once_cell::sync::Lazy;

static ANALYSIS_SYSTEM: Lazy<String> = Lazy::new(|| {
    format!(
        "You are a senior software architect analysing legacy code.\n\
         Return a single JSON object that EXACTLY matches this JSON Schema:\n\n{}\n\n\
         Rules:\n\
         - `original_filename` is the exact file name provided.\n\
         - `suggested_filename` follows modern naming conventions for the language \
         (snake_case.py, PascalCase.java, kebab-case.js / .ts).\n\
         - List modules in declaration order; `type` is one of class, module, interface.\n\
         - `severity` is one of low, medium, high, critical.\n\
         - `exceptions` describe failure conditions in words (\"division by zero\"), \
         never exception type names.\n\
         - Do not add any field that is not in the schema.\n\
         Return ONLY the JSON object.",
        project_ir_json_schema()
    )
});

const MODERNIZATION_SYSTEM: &str = "You are an expert software modernization engineer.\n\
Transform legacy code into modern, production-ready code for the same language, \
following current idioms (type hints and f-strings for Python 3.11+, generics and \
try-with-resources for Java 17+, ES modules and const/let for JavaScript).\n\
Preserve the behaviour described by the analysis you are given.\n\
Return a JSON object with exactly these fields:\n\
{\"modernized_code\": \"complete modernized source\", \
\"filename\": \"file name with extension\", \
\"changes_summary\": \"brief summary of the key changes\"}\n\
Return ONLY this JSON object.";

const DOCUMENTATION_SYSTEM: &str = "You are a documentation specialist.\n\
You write Markdown documentation using ONLY facts present in the analysis JSON you \
are given. Never invent names, types, counts or severities.\n\
Inline code spans may only contain names that appear in the analysis. \
Do not use fenced code blocks.\n\
Return ONLY a JSON object whose keys are exactly the requested document names \
and whose values are the Markdown text of each document.";

fn ir_json(ir: &ProjectIR) -> String {
    serde_json::to_string_pretty(ir).unwrap_or_default()
}

/// Request for the analysis stage
#[must_use]
pub fn analysis_request(unit: &SourceUnit) -> GenerationRequest {
    let instruction = format!(
        "Analyze this legacy {lang} code and produce its ProjectIR.\n\n\
         ORIGINAL FILENAME: {file}\n\
         LANGUAGE: {lang}\n\n\
         LEGACY CODE:\n<<<SOURCE\n{code}\nSOURCE>>>\n\n\
         Extract modules, functions, inputs and outputs, decision points, side effects, \
         dependencies, design patterns and technical debt, then suggest modernization \
         priorities. Return ONLY valid JSON matching the ProjectIR schema.",
        lang = unit.language(),
        file = unit.original_filename(),
        code = unit.text(),
    );
    GenerationRequest::json(ANALYSIS_SYSTEM.as_str(), instruction)
}

/// Request for the modernization stage
///
/// Carries the raw source together with the validated IR.
#[must_use]
pub fn modernization_request(unit: &SourceUnit, ir: &ProjectIR) -> GenerationRequest {
    let instruction = format!(
        "Modernize this legacy {lang} code.\n\n\
         ORIGINAL FILENAME: {file}\n\
         SUGGESTED FILENAME: {suggested}\n\n\
         ANALYSIS:\n{ir}\n\n\
         LEGACY CODE:\n<<<SOURCE\n{code}\nSOURCE>>>\n\n\
         Return JSON with modernized_code, filename and changes_summary.",
        lang = unit.language(),
        file = unit.original_filename(),
        suggested = ir.suggested_filename,
        ir = ir_json(ir),
        code = unit.text(),
    );
    GenerationRequest::json(MODERNIZATION_SYSTEM, instruction)
}

/// Request for the documentation stage
///
/// Built from the IR alone; the raw source is never part of it.
#[must_use]
pub fn documentation_request(ir: &ProjectIR) -> GenerationRequest {
    let names = DocumentKind::ALL
        .iter()
        .map(DocumentKind::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let instruction = format!(
        "Write the documentation set for {file}.\n\n\
         DOCUMENT NAMES: {names}\n\n\
         ANALYSIS:\n{ir}\n\n\
         README is an overview, MASTER_DOCUMENTATION the complete reference, ARCHITECTURE \
         describes modules and their relations, MIGRATION_GUIDE follows the modernization \
         priorities, TECHNICAL_DEBT groups issues by severity, API_REFERENCE lists every \
         function with its inputs and outputs, TESTING_GUIDE lists what to test per function. \
         Return ONLY the JSON object.",
        file = ir.original_filename,
        ir = ir_json(ir),
    );
    GenerationRequest::json(DOCUMENTATION_SYSTEM, instruction)
}

/// Follow-up sent after a response that was not a JSON document
#[must_use]
pub fn malformed_follow_up(problem: &str) -> String {
    format!(
        "Your previous response could not be parsed as JSON ({problem}). \
         Return only a single JSON object, with no prose and no Markdown fences."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ir() -> ProjectIR {
        serde_json::from_value(serde_json::json!({
            "language": "python",
            "original_filename": "calc.py",
            "suggested_filename": "calculator.py",
            "summary": "helpers",
            "modules": [{"name": "calc", "type": "module", "description": ""}]
        }))
        .unwrap()
    }

    #[test]
    fn analysis_request_embeds_schema_and_source() {
        let unit = SourceUnit::new("def add(a,b): return a+b", "calc.py", "python");
        let request = analysis_request(&unit);
        assert!(request.system.contains("\"modules\""));
        assert!(request.instruction.contains("ORIGINAL FILENAME: calc.py"));
        assert!(request.instruction.contains("def add(a,b)"));
    }

    #[test]
    fn documentation_request_excludes_source() {
        let unit = SourceUnit::new("SECRET_SOURCE_MARKER = 1", "calc.py", "python");
        let request = documentation_request(&ir());
        assert!(!request.instruction.contains(unit.text()));
        assert!(request.instruction.contains("TESTING_GUIDE"));
        assert!(request.instruction.contains("calculator.py"));
    }

    #[test]
    fn modernization_request_carries_ir() {
        let unit = SourceUnit::new("x=1", "calc.py", "python");
        let request = modernization_request(&unit, &ir());
        assert!(request.instruction.contains("SUGGESTED FILENAME: calculator.py"));
        assert!(request.instruction.contains("\"original_filename\": \"calc.py\""));
    }
}
