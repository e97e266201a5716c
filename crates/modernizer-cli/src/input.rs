//! Source discovery
//!
//! File arguments are taken as-is; directory arguments are walked
//! recursively and filtered to recognised source extensions. Each unit
//! keeps its path relative to the argument it was found under.

use anyhow::{bail, Context, Result};
use modernizer_core::language::is_source_file;
use modernizer_core::SourceUnit;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A source file located on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the input root, `/`-separated
    pub relative_path: String,
}

fn relative(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Find the source files named by `paths`, sorted by relative path within
/// each argument
///
/// # Errors
/// Fails if an argument does not exist or a directory cannot be walked.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push(SourceFile {
                path: path.clone(),
                relative_path: name,
            });
        } else if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path).follow_links(false) {
                let entry =
                    entry.with_context(|| format!("cannot walk {}", path.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if !is_source_file(&name) {
                    tracing::debug!(path = %entry.path().display(), "skipping non-source file");
                    continue;
                }
                found.push(SourceFile {
                    relative_path: relative(entry.path(), path),
                    path: entry.into_path(),
                });
            }
            found.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
            files.extend(found);
        } else {
            bail!("input path does not exist: {}", path.display());
        }
    }
    Ok(files)
}

/// Read `file` into a source unit
///
/// Invalid UTF-8 is replaced rather than rejected. `language` overrides
/// detection when given.
///
/// # Errors
/// Fails if the file cannot be read.
pub fn load_unit(file: &SourceFile, language: Option<&str>) -> Result<SourceUnit> {
    let bytes =
        std::fs::read(&file.path).with_context(|| format!("cannot read {}", file.path.display()))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceUnit::new(text, name, language.unwrap_or_default())
        .with_relative_path(&file.relative_path))
}
