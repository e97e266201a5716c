//! Derived artifacts
//!
//! Artifacts produced from a [`ProjectIR`](crate::ProjectIR) by downstream
//! stages. They are computed from the IR and never write back into it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Output of the modernization stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ModernizedCodeRecord {
    /// Complete modernized source text
    pub modernized_code: String,
    /// File name for the modernized source
    pub filename: String,
    /// Brief summary of what changed
    pub changes_summary: String,
}

/// The fixed set of generated documents
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DocumentKind {
    #[serde(rename = "README")]
    Readme,
    #[serde(rename = "MASTER_DOCUMENTATION")]
    MasterDocumentation,
    #[serde(rename = "ARCHITECTURE")]
    Architecture,
    #[serde(rename = "MIGRATION_GUIDE")]
    MigrationGuide,
    #[serde(rename = "TECHNICAL_DEBT")]
    TechnicalDebt,
    #[serde(rename = "API_REFERENCE")]
    ApiReference,
    #[serde(rename = "TESTING_GUIDE")]
    TestingGuide,
}

impl DocumentKind {
    /// Every document kind, in bundle order
    pub const ALL: [DocumentKind; 7] = [
        DocumentKind::Readme,
        DocumentKind::MasterDocumentation,
        DocumentKind::Architecture,
        DocumentKind::MigrationGuide,
        DocumentKind::TechnicalDebt,
        DocumentKind::ApiReference,
        DocumentKind::TestingGuide,
    ];

    /// Document name as used on the wire
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Readme => "README",
            Self::MasterDocumentation => "MASTER_DOCUMENTATION",
            Self::Architecture => "ARCHITECTURE",
            Self::MigrationGuide => "MIGRATION_GUIDE",
            Self::TechnicalDebt => "TECHNICAL_DEBT",
            Self::ApiReference => "API_REFERENCE",
            Self::TestingGuide => "TESTING_GUIDE",
        }
    }

    /// Markdown file name
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.md", self.as_str())
    }
}

impl Display for DocumentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = UnknownDocument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownDocument(s.to_string()))
    }
}

/// Name that is not one of the fixed document kinds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document name: {0}")]
pub struct UnknownDocument(pub String);

/// Mapping from document kind to rendered text
///
/// Serializes as a JSON object keyed by document name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentationBundle {
    documents: BTreeMap<DocumentKind, String>,
}

impl DocumentationBundle {
    /// Create an empty bundle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document
    pub fn insert(&mut self, kind: DocumentKind, text: impl Into<String>) {
        self.documents.insert(kind, text.into());
    }

    /// With a document (builder style)
    #[inline]
    #[must_use]
    pub fn with(mut self, kind: DocumentKind, text: impl Into<String>) -> Self {
        self.insert(kind, text);
        self
    }

    /// Text of a document
    #[inline]
    #[must_use]
    pub fn get(&self, kind: DocumentKind) -> Option<&str> {
        self.documents.get(&kind).map(String::as_str)
    }

    /// Whether all seven documents are present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        DocumentKind::ALL
            .iter()
            .all(|k| self.documents.contains_key(k))
    }

    /// Documents in bundle order
    pub fn iter(&self) -> impl Iterator<Item = (DocumentKind, &str)> {
        self.documents.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Number of documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the bundle has no documents
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
