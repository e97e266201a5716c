//! Identity modernization fallback

use crate::unit::SourceUnit;
use modernizer_ir::ModernizedCodeRecord;

/// Summary recorded when the source is passed through unchanged
pub const UNCHANGED_SUMMARY: &str =
    "No transformation applied: the original source is returned unchanged.";

/// The original source, verbatim, under its original file name
#[must_use]
pub fn modernization_fallback(unit: &SourceUnit) -> ModernizedCodeRecord {
    ModernizedCodeRecord {
        modernized_code: unit.text().to_string(),
        filename: unit.original_filename().to_string(),
        changes_summary: UNCHANGED_SUMMARY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_source_verbatim() {
        let text = "def add(a,b): return a+b";
        let record = modernization_fallback(&SourceUnit::new(text, "calc.py", "python"));
        assert_eq!(record.modernized_code, text);
        assert_eq!(record.filename, "calc.py");
        assert_eq!(record.changes_summary, UNCHANGED_SUMMARY);
    }
}
