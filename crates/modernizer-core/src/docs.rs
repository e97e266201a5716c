//! Documentation assembler
//!
//! Produces the seven-document bundle from a validated [`ProjectIR`] and
//! nothing else. Backend prose is accepted only if it is grounded:
//! - every inline code span (backticks or `<code>`) names something in the IR
//! - fenced, indented and `<pre>` code blocks are refused outright
//! - every number equals an IR count or a numeral written in an IR field
//! - severity words match a severity the IR records
//! - code-shaped words (`snake_case`, `camelCase`, `call(..)`) and every
//!   name on a code-shaped line trace back to IR text

use crate::fallback::documentation_fallback;
use crate::prompt::documentation_request;
use crate::stage::{Stage, StageOrchestrator, StageOutcome, StageTask};
use modernizer_backend::GenerationRequest;
use modernizer_ir::{
    DocumentKind, DocumentationBundle, Problem, ProjectIR, Schema, Severity, ValidationError,
    ValidationIssue,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("grounding pattern is valid")
}

static CODE_SPAN: Lazy<Regex> = Lazy::new(|| pattern(r"`([^`\n]+)`"));
static HTML_CODE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)<code>([^<\n]*)</code>"));
static HTML_PRE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)<pre[\s>]"));
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| pattern(r"[A-Za-z_]\w*"));
static NUMBER: Lazy<Regex> = Lazy::new(|| pattern(r"\b\d+(?:\.\d+)*\b"));
static NUMBER_WORD: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\b(two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\b")
});
static SEVERITY_WORD: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(low|medium|high|critical)\b"));
/// Heading hashes, bullets and ordered-list numbers at the start of a line
static LINE_MARKER: Lazy<Regex> = Lazy::new(|| pattern(r"^\s*(?:#+\s+)?(?:[-*+]\s+)?(?:\d+[.)]\s+)?"));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| pattern(r"^\s*(?:[-*+]|\d+[.)])\s"));
static CODE_WORD: Lazy<Regex> =
    Lazy::new(|| pattern(r"\b(?:[A-Za-z][A-Za-z0-9]*_\w+|[A-Z]?[a-z0-9]+[A-Z]\w*)\b"));
static CALL: Lazy<Regex> = Lazy::new(|| pattern(r"\b([A-Za-z_]\w*)\(([^)\n]*)\)"));
static CODE_LINE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"^\s*(?:def|fn|func|function|class|struct|interface|public|private|protected|static|void|return|import|from|package|var|let|const|#include)\b.*[(){};=]",
    )
});

const NUMBER_WORDS: [&str; 13] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve",
];

/// Keywords that may open a code-shaped line without naming anything
const CODE_KEYWORDS: &[&str] = &[
    "def", "fn", "func", "function", "class", "struct", "interface", "public", "private",
    "protected", "static", "void", "return", "import", "from", "package", "var", "let", "const",
    "include", "self", "this", "none", "null", "true", "false",
];

/// `12` and `012` both state twelve
fn canonical_number(text: &str) -> String {
    text.parse::<u64>()
        .map_or_else(|_| text.to_string(), |n| n.to_string())
}

fn collect_strings<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Every count a document may state about `ir`
fn ir_counts(ir: &ProjectIR) -> Vec<usize> {
    let mut counts = vec![
        ir.modules.len(),
        ir.function_count(),
        ir.technical_debt.len(),
        ir.dependencies.len(),
        ir.modernization_priority.len(),
        ir.design_patterns().len(),
        DocumentKind::ALL.len(),
    ];
    counts.extend(
        Severity::DESCENDING
            .into_iter()
            .map(|s| ir.debt_with_severity(s).count()),
    );
    for module in &ir.modules {
        counts.extend([
            module.functions.len(),
            module.attributes.len(),
            module.imports.len(),
            module.design_patterns.len(),
        ]);
        for function in &module.functions {
            counts.extend([
                function.inputs.len(),
                function.outputs.len(),
                function.modifiers.len(),
                function.decisions.len(),
                function.side_effects.len(),
                function.exceptions.len(),
                function.dependencies.len(),
            ]);
        }
    }
    counts
}

/// Facts a document may state
///
/// Names come from the IR's language, file names, and every module,
/// function, parameter, attribute, import, dependency, modifier and design
/// pattern. Words and numerals come from every string in the IR, and
/// numbers also from the IR's counts.
#[derive(Debug, Clone, Default)]
pub struct IrVocabulary {
    terms: BTreeSet<String>,
    tokens: BTreeSet<String>,
    /// lowercase
    words: BTreeSet<String>,
    numbers: BTreeSet<String>,
}

impl IrVocabulary {
    /// Collect the vocabulary of `ir`
    #[must_use]
    pub fn of(ir: &ProjectIR) -> Self {
        let mut terms = BTreeSet::new();
        let mut add = |s: &str| {
            let s = s.trim();
            if !s.is_empty() {
                terms.insert(s.to_string());
            }
        };

        add(&ir.language);
        add(&ir.original_filename);
        add(&ir.suggested_filename);
        ir.dependencies.iter().for_each(|d| add(d));
        for module in &ir.modules {
            add(&module.name);
            module.imports.iter().for_each(|i| add(i));
            module.design_patterns.iter().for_each(|p| add(p));
            for attribute in &module.attributes {
                add(&attribute.name);
                add(&attribute.ty);
            }
            for function in &module.functions {
                add(&function.name);
                function.modifiers.iter().for_each(|m| add(m));
                function.dependencies.iter().for_each(|d| add(d));
                for io in function.inputs.iter().chain(&function.outputs) {
                    add(&io.name);
                    add(&io.ty);
                }
            }
        }

        let tokens: BTreeSet<String> = terms
            .iter()
            .flat_map(|t| IDENTIFIER.find_iter(t).map(|m| m.as_str().to_string()))
            .collect();

        let value = serde_json::to_value(ir).unwrap_or(Value::Null);
        let mut strings = Vec::new();
        collect_strings(&value, &mut strings);

        let mut words: BTreeSet<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        words.extend(DocumentKind::ALL.iter().map(|k| k.as_str().to_lowercase()));
        let mut numbers: BTreeSet<String> =
            ir_counts(ir).into_iter().map(|n| n.to_string()).collect();
        for text in strings {
            words.extend(IDENTIFIER.find_iter(text).map(|m| m.as_str().to_lowercase()));
            numbers.extend(NUMBER.find_iter(text).map(|m| canonical_number(m.as_str())));
        }

        Self {
            terms,
            tokens,
            words,
            numbers,
        }
    }

    /// Whether a code span refers only to IR names
    ///
    /// Either the whole span is a term, or every identifier inside it
    /// (e.g. `add(a, b)`, `calc.add`) is part of one.
    #[must_use]
    pub fn grounds(&self, span: &str) -> bool {
        let span = span.trim();
        if self.terms.contains(span) {
            return true;
        }
        let mut identifiers = IDENTIFIER.find_iter(span).peekable();
        identifiers.peek().is_some() && identifiers.all(|m| self.tokens.contains(m.as_str()))
    }

    /// Whether `number` is an IR count or appears in IR text
    #[must_use]
    pub fn states_number(&self, number: &str) -> bool {
        self.numbers.contains(&canonical_number(number))
    }

    /// Whether `word` occurs anywhere in the IR, ignoring case
    #[must_use]
    pub fn knows_word(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }
}

/// Issues found in one document, one per distinct problem
struct DocumentIssues<'a> {
    kind: DocumentKind,
    seen: BTreeSet<String>,
    issues: &'a mut Vec<ValidationIssue>,
}

impl DocumentIssues<'_> {
    fn report(&mut self, message: String) {
        if self.seen.insert(message.clone()) {
            self.issues
                .push(ValidationIssue::new(self.kind.as_str(), Problem::Ungrounded(message)));
        }
    }

    fn unknown_name(&mut self, name: &str) {
        self.report(format!("`{name}` does not name anything in the IR"));
    }
}

const QUOTE_INLINE: &str = "quote IR names inline instead";

fn check_spans(line: &str, vocabulary: &IrVocabulary, found: &mut DocumentIssues<'_>) {
    let spans = CODE_SPAN
        .captures_iter(line)
        .chain(HTML_CODE.captures_iter(line))
        .filter_map(|c| c.get(1));
    for span in spans {
        if !vocabulary.grounds(span.as_str()) {
            found.unknown_name(span.as_str());
        }
    }
}

fn check_prose(line: &str, vocabulary: &IrVocabulary, found: &mut DocumentIssues<'_>) {
    let prose = CODE_SPAN.replace_all(line, " ");
    let prose = HTML_CODE.replace_all(&prose, " ");
    let prose = LINE_MARKER.replace(&prose, "");

    for number in NUMBER.find_iter(&prose) {
        if !vocabulary.states_number(number.as_str()) {
            found.report(format!(
                "`{}` is not a count or value stated in the IR",
                number.as_str()
            ));
        }
    }
    for word in NUMBER_WORD.find_iter(&prose) {
        let word = word.as_str();
        let value = NUMBER_WORDS
            .iter()
            .position(|w| w.eq_ignore_ascii_case(word))
            .unwrap_or_default();
        if !vocabulary.knows_word(word) && !vocabulary.states_number(&value.to_string()) {
            found.report(format!("`{word}` is not a count or value stated in the IR"));
        }
    }
    for word in SEVERITY_WORD.find_iter(&prose) {
        if !vocabulary.knows_word(word.as_str()) {
            found.report(format!(
                "severity `{}` does not match any technical debt item in the IR",
                word.as_str().to_lowercase()
            ));
        }
    }
    for word in CODE_WORD.find_iter(&prose) {
        if !vocabulary.knows_word(word.as_str()) {
            found.unknown_name(word.as_str());
        }
    }
    for call in CALL.captures_iter(&prose) {
        let (Some(name), Some(args)) = (call.get(1), call.get(2)) else {
            continue;
        };
        // "function(s)" is a plural, not a call
        if matches!(args.as_str(), "s" | "es") {
            continue;
        }
        if !vocabulary.knows_word(name.as_str()) {
            found.unknown_name(name.as_str());
        }
    }
    if CODE_LINE.is_match(&prose) {
        for name in IDENTIFIER.find_iter(&prose) {
            let name = name.as_str();
            if !CODE_KEYWORDS.contains(&name.to_lowercase().as_str()) && !vocabulary.knows_word(name)
            {
                found.unknown_name(name);
            }
        }
    }
}

fn check_document(
    kind: DocumentKind,
    text: &str,
    vocabulary: &IrVocabulary,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut found = DocumentIssues {
        kind,
        seen: BTreeSet::new(),
        issues,
    };
    if HTML_PRE.is_match(text) {
        found.report(format!("HTML code blocks are not allowed; {QUOTE_INLINE}"));
    }

    let mut in_fence = false;
    let mut in_indented = false;
    let mut in_list = false;
    let mut after_blank = true;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            found.report(format!("fenced code blocks are not allowed; {QUOTE_INLINE}"));
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if trimmed.is_empty() {
            after_blank = true;
            continue;
        }

        let indented = line.starts_with("    ") || line.starts_with('\t');
        if indented && (in_indented || (after_blank && !in_list)) {
            found.report(format!("indented code blocks are not allowed; {QUOTE_INLINE}"));
            in_indented = true;
            after_blank = false;
            continue;
        }
        in_indented = false;
        if LIST_ITEM.is_match(line) {
            in_list = true;
        } else if !indented {
            in_list = false;
        }
        after_blank = false;

        check_spans(line, vocabulary, &mut found);
        check_prose(line, vocabulary, &mut found);
    }
}

/// Grounding problems in one bundle, as validation issues keyed by document
#[must_use]
pub fn grounding_issues(bundle: &DocumentationBundle, vocabulary: &IrVocabulary) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (kind, text) in bundle.iter() {
        check_document(kind, text, vocabulary, &mut issues);
    }
    issues
}

/// IR to documentation bundle
#[derive(Debug, Clone)]
pub struct DocumentationTask<'a> {
    ir: &'a ProjectIR,
    vocabulary: IrVocabulary,
}

impl<'a> DocumentationTask<'a> {
    #[must_use]
    pub fn new(ir: &'a ProjectIR) -> Self {
        Self {
            ir,
            vocabulary: IrVocabulary::of(ir),
        }
    }
}

impl StageTask for DocumentationTask<'_> {
    type Output = DocumentationBundle;

    fn stage(&self) -> Stage {
        Stage::Documentation
    }

    fn request(&self) -> GenerationRequest {
        documentation_request(self.ir)
    }

    fn fallback(&self) -> DocumentationBundle {
        documentation_fallback(self.ir)
    }

    fn verify(&self, bundle: &DocumentationBundle) -> Result<(), ValidationError> {
        let issues = grounding_issues(bundle, &self.vocabulary);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(DocumentationBundle::NAME, issues))
        }
    }
}

/// Build the documentation bundle for a validated IR
///
/// The raw source is not an input: documentation derives from the IR only.
pub async fn assemble(
    ir: &ProjectIR,
    orchestrator: &StageOrchestrator,
) -> StageOutcome<DocumentationBundle> {
    orchestrator.run(&DocumentationTask::new(ir)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::stage::{FallbackReason, Provenance};
    use modernizer_ir::{validate, TechnicalDebtItem};
    use modernizer_test_utils::{calc_documentation_json, calc_ir_json, ScriptedBackend};
    use std::sync::Arc;
    use std::time::Duration;

    fn calc_ir() -> ProjectIR {
        validate(&calc_ir_json()).unwrap()
    }

    fn bundle_with(kind: DocumentKind, text: &str) -> DocumentationBundle {
        let mut bundle: DocumentationBundle = validate(&calc_documentation_json()).unwrap();
        bundle.insert(kind, text);
        bundle
    }

    #[test]
    fn vocabulary_grounds_ir_names() {
        let vocabulary = IrVocabulary::of(&calc_ir());
        assert!(vocabulary.grounds("calc.py"));
        assert!(vocabulary.grounds("add"));
        assert!(vocabulary.grounds("add(a, b)"));
        assert!(vocabulary.grounds("calc.add"));
        assert!(vocabulary.grounds("number"));
        assert!(!vocabulary.grounds("subtract"));
        assert!(!vocabulary.grounds("add(a, b, precision)"));
        assert!(!vocabulary.grounds("42"));
    }

    #[test]
    fn invented_names_are_reported() {
        let vocabulary = IrVocabulary::of(&calc_ir());
        let bundle = bundle_with(
            DocumentKind::ApiReference,
            "Call `multiply(x, y)` or `multiply(x, y)` for products.",
        );
        let issues = grounding_issues(&bundle, &vocabulary);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "API_REFERENCE");
    }

    #[test]
    fn fenced_blocks_are_reported() {
        let vocabulary = IrVocabulary::of(&calc_ir());
        let bundle = bundle_with(DocumentKind::Readme, "# calc\n\n```python\nadd(1, 2)\n```\n");
        let issues = grounding_issues(&bundle, &vocabulary);
        assert!(issues.iter().any(|i| i.path == "README"));
    }

    fn issues_for(kind: DocumentKind, text: &str) -> Vec<String> {
        let vocabulary = IrVocabulary::of(&calc_ir());
        grounding_issues(&bundle_with(kind, text), &vocabulary)
            .into_iter()
            .map(|i| i.problem.to_string())
            .collect()
    }

    #[test]
    fn numbers_must_be_ir_counts() {
        let vocabulary = IrVocabulary::of(&calc_ir());
        assert!(vocabulary.states_number("1"));
        assert!(vocabulary.states_number("2"));
        assert!(!vocabulary.states_number("12"));

        assert!(issues_for(DocumentKind::Readme, "The `calc` module has 1 function with 2 inputs.").is_empty());
        let issues = issues_for(DocumentKind::Readme, "The `calc` module exposes 12 functions.");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("`12` is not a count"));
        assert!(!issues_for(DocumentKind::Readme, "There are twelve functions.").is_empty());
    }

    #[test]
    fn list_numbering_is_not_a_count() {
        let text = "## Roadmap\n\n1. Add type hints to `add`\n2. Keep `calc` small\n3. Done\n";
        assert!(issues_for(DocumentKind::MigrationGuide, text).is_empty());
    }

    #[test]
    fn severity_words_must_match_recorded_debt() {
        assert!(issues_for(DocumentKind::TechnicalDebt, "One low severity item: no type hints.").is_empty());
        let issues = issues_for(DocumentKind::TechnicalDebt, "A Critical SQL injection issue.");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("severity `critical`"));
    }

    #[test]
    fn indented_and_html_blocks_are_reported() {
        let issues = issues_for(DocumentKind::Readme, "Example:\n\n    add(1, 2)\n    add(3, 4)\n");
        assert!(issues.iter().any(|i| i.contains("indented code blocks")));
        let issues = issues_for(DocumentKind::Readme, "<pre>add(1, 2)</pre>");
        assert!(issues.iter().any(|i| i.contains("HTML code blocks")));
        let issues = issues_for(DocumentKind::Readme, "Call <code>multiply</code> or <code>add</code>.");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("`multiply` does not name"));
    }

    #[test]
    fn nested_list_items_are_not_code_blocks() {
        let text = "- `calc`\n\n    - `add(a, b)` returns `sum`\n";
        assert!(issues_for(DocumentKind::Architecture, text).is_empty());
    }

    #[test]
    fn code_shaped_prose_is_checked() {
        assert!(issues_for(DocumentKind::ApiReference, "Call add(a, b) to get a sum.").is_empty());
        assert!(issues_for(DocumentKind::ApiReference, "Covers the function(s) listed below.").is_empty());
        let issues = issues_for(DocumentKind::ApiReference, "Use multiply(x, y) or safe_divide.");
        assert!(issues.iter().any(|i| i.contains("`multiply` does not name")));
        assert!(issues.iter().any(|i| i.contains("`safe_divide` does not name")));
        let issues = issues_for(DocumentKind::ApiReference, "def divide(a, b): ...");
        assert_eq!(issues, vec!["`divide` does not name anything in the IR".to_string()]);
    }

    #[test]
    fn template_fallback_is_grounded() {
        let ir = calc_ir();
        let task = DocumentationTask::new(&ir);
        assert!(task.verify(&task.fallback()).is_ok());
    }

    #[test]
    fn template_fallback_is_grounded_for_richer_ir() {
        let mut ir = calc_ir();
        ir.modules[0].functions[0].business_logic = "Returns a + b\n\n    rounded to 2 places".into();
        ir.technical_debt.push(TechnicalDebtItem {
            category: "security".into(),
            description: "Unchecked input".into(),
            severity: Severity::Critical,
            recommendation: "Validate operands".into(),
        });
        let task = DocumentationTask::new(&ir);
        assert!(task.verify(&task.fallback()).is_ok());
    }

    #[tokio::test]
    async fn grounded_backend_bundle_is_accepted() {
        let backend = Arc::new(ScriptedBackend::new([Ok(calc_documentation_json().to_string())]));
        let orchestrator =
            StageOrchestrator::new(Some(backend), RetryPolicy::immediate(2), Duration::from_secs(5));
        let outcome = assemble(&calc_ir(), &orchestrator).await;
        assert_eq!(outcome.report.provenance, Provenance::Backend);
        assert!(outcome.output.is_complete());
    }

    #[tokio::test]
    async fn ungrounded_backend_bundle_falls_back_to_templates() {
        let mut invented = calc_documentation_json();
        invented["README"] = "Uses the `Decimal` type and `math.fsum`.".into();
        let backend = Arc::new(ScriptedBackend::repeating(invented.to_string(), 2));
        let orchestrator = StageOrchestrator::new(
            Some(backend.clone()),
            RetryPolicy::immediate(2),
            Duration::from_secs(5),
        );
        let ir = calc_ir();
        let outcome = assemble(&ir, &orchestrator).await;
        assert_eq!(backend.calls(), 2);
        assert_eq!(
            outcome.report.provenance,
            Provenance::Fallback {
                reason: FallbackReason::RetriesExhausted
            }
        );
        assert_eq!(outcome.output, documentation_fallback(&ir));
        assert!(backend.requests()[1].instruction.contains("`Decimal` does not name anything"));
    }

    #[tokio::test]
    async fn invented_counts_and_severities_fall_back_to_templates() {
        let mut invented = calc_documentation_json();
        invented["README"] = "The calc module exposes 12 functions, including multiply and divide, \
                              and carries a critical SQL injection issue.\n\n    def multiply(x, y): ..."
            .into();
        invented["TECHNICAL_DEBT"] = "There are 3 critical security issues.".into();
        let backend = Arc::new(ScriptedBackend::repeating(invented.to_string(), 2));
        let orchestrator = StageOrchestrator::new(
            Some(backend.clone()),
            RetryPolicy::immediate(2),
            Duration::from_secs(5),
        );
        let ir = calc_ir();
        let outcome = assemble(&ir, &orchestrator).await;

        assert_eq!(backend.calls(), 2);
        assert_eq!(
            outcome.report.provenance,
            Provenance::Fallback {
                reason: FallbackReason::RetriesExhausted
            }
        );
        assert_eq!(outcome.output, documentation_fallback(&ir));
        let corrective = &backend.requests()[1].instruction;
        assert!(corrective.contains("`12` is not a count"));
        assert!(corrective.contains("`3` is not a count"));
        assert!(corrective.contains("severity `critical`"));
        assert!(corrective.contains("indented code blocks"));
    }
}
