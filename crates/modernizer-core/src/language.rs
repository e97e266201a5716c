//! Source language classification
//!
//! A simple classification input for the pipeline: file extension first,
//! then a handful of content heuristics. No parsing.

use std::path::Path;

/// Extension to language tag
const EXTENSIONS: &[(&str, &str)] = &[
    ("py", "python"),
    ("java", "java"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("ts", "typescript"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("hpp", "cpp"),
    ("c", "c"),
    ("h", "c"),
    ("cs", "csharp"),
    ("go", "go"),
    ("rs", "rust"),
    ("kt", "kotlin"),
    ("swift", "swift"),
];

/// Language used when nothing else matches
pub const DEFAULT_LANGUAGE: &str = "python";

/// Language tag for a recognised source file extension
#[must_use]
pub fn language_for_extension(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Whether `filename` has a recognised source extension
#[inline]
#[must_use]
pub fn is_source_file(filename: &str) -> bool {
    language_for_extension(filename).is_some()
}

/// Classify a source unit by file name, falling back to its content
#[must_use]
pub fn detect_language(filename: &str, text: &str) -> &'static str {
    if let Some(lang) = language_for_extension(filename) {
        return lang;
    }

    if text.contains("def ") || text.contains("import ") {
        "python"
    } else if text.contains("class ") && text.contains('{') && text.contains(';') {
        "java"
    } else if text.contains("function") || text.contains("const ") {
        "javascript"
    } else {
        DEFAULT_LANGUAGE
    }
}
