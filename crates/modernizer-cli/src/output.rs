//! Artifact writer
//!
//! Layout under the output directory, per unit:
//!
//! ```text
//! <relative path>/
//!     ir.json
//!     provenance.json
//!     modernized/<original filename>
//!     skeleton/<original filename>
//!     docs/README.md ... docs/TECHNICAL_DEBT.md
//! ```
//!
//! The IR's `suggested_filename` is advisory and never changes these paths.

use anyhow::{Context, Result};
use modernizer_core::PipelineResult;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("cannot write {}", path.display()))
}

/// Directory holding one unit's artifacts
#[must_use]
pub fn unit_dir(out: &Path, result: &PipelineResult) -> PathBuf {
    result
        .relative_path
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(out.to_path_buf(), |dir, part| dir.join(part))
}

/// Write every artifact of `result` under `out`
///
/// # Errors
/// Fails on the first file that cannot be written.
pub fn write_result(out: &Path, result: &PipelineResult) -> Result<PathBuf> {
    let dir = unit_dir(out, result);
    let original = &result.ir.original_filename;

    write(
        &dir.join("ir.json"),
        &serde_json::to_string_pretty(&result.ir)?,
    )?;
    write(
        &dir.join("modernized").join(original),
        &result.modernized.modernized_code,
    )?;
    write(&dir.join("skeleton").join(original), &result.skeleton)?;
    for (kind, text) in result.docs.iter() {
        write(&dir.join("docs").join(kind.file_name()), text)?;
    }

    let provenance = json!({
        "relative_path": result.relative_path,
        "ir_fingerprint": result.ir_fingerprint,
        "suggested_filename": result.ir.suggested_filename,
        "changes_summary": result.modernized.changes_summary,
        "stages": result.provenance.reports(),
    });
    write(
        &dir.join("provenance.json"),
        &serde_json::to_string_pretty(&provenance)?,
    )?;
    Ok(dir)
}
