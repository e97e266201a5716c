//! Source units
//!
//! A [`SourceUnit`] is the input boundary of the pipeline: raw text plus
//! the metadata the upload layer resolved for it.

use crate::language::detect_language;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name used when the caller supplies none
const UNNAMED: &str = "unnamed";

/// One source file to modernize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    text: String,
    original_filename: String,
    language: String,
    relative_path: String,
}

impl SourceUnit {
    /// Create a unit with a declared language
    ///
    /// An empty language tag is replaced by detection; the relative path
    /// defaults to the file name.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        original_filename: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let mut original_filename = original_filename.into().trim().to_string();
        if original_filename.is_empty() {
            original_filename = UNNAMED.to_string();
        }
        let mut language = language.into().trim().to_ascii_lowercase();
        if language.is_empty() {
            language = detect_language(&original_filename, &text).to_string();
        }
        Self {
            relative_path: original_filename.clone(),
            text,
            original_filename,
            language,
        }
    }

    /// Create a unit whose language is detected from name and content
    #[inline]
    #[must_use]
    pub fn detect(text: impl Into<String>, original_filename: impl Into<String>) -> Self {
        Self::new(text, original_filename, "")
    }

    /// With relative path for structure preservation
    #[inline]
    #[must_use]
    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !path.trim().is_empty() {
            self.relative_path = path;
        }
        self
    }

    /// Same unit with different source text
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Raw source text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// File name as received (never empty)
    #[inline]
    #[must_use]
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// Lowercase language tag (never empty)
    #[inline]
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Path relative to the input root
    #[inline]
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// File name without extension, used as the top-level module name
    #[must_use]
    pub fn stem(&self) -> &str {
        Path::new(&self.original_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.original_filename)
    }

    /// Number of lines in the source text
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}
