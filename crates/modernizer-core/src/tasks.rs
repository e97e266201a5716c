//! Analysis and modernization stage tasks

use crate::fallback::{analysis_fallback, modernization_fallback};
use crate::prompt::{analysis_request, modernization_request};
use crate::stage::{Stage, StageTask};
use crate::unit::SourceUnit;
use modernizer_backend::GenerationRequest;
use modernizer_ir::{
    ModernizedCodeRecord, Problem, ProjectIR, Schema, ValidationError, ValidationIssue,
};

/// Source text to IR
#[derive(Debug, Clone, Copy)]
pub struct AnalysisTask<'a> {
    unit: &'a SourceUnit,
}

impl<'a> AnalysisTask<'a> {
    #[inline]
    #[must_use]
    pub fn new(unit: &'a SourceUnit) -> Self {
        Self { unit }
    }
}

impl StageTask for AnalysisTask<'_> {
    type Output = ProjectIR;

    fn stage(&self) -> Stage {
        Stage::Analysis
    }

    fn request(&self) -> GenerationRequest {
        analysis_request(self.unit)
    }

    fn fallback(&self) -> ProjectIR {
        analysis_fallback(self.unit)
    }

    /// The IR must describe the file it was asked about, in the language
    /// it was declared as
    fn verify(&self, ir: &ProjectIR) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if ir.original_filename != self.unit.original_filename() {
            issues.push(ValidationIssue::new(
                "original_filename",
                Problem::Ungrounded(format!(
                    "must be `{}`, the file name provided",
                    self.unit.original_filename()
                )),
            ));
        }
        if !ir.language.trim().eq_ignore_ascii_case(self.unit.language()) {
            issues.push(ValidationIssue::new(
                "language",
                Problem::Ungrounded(format!(
                    "must be `{}`, the language provided",
                    self.unit.language()
                )),
            ));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(ProjectIR::NAME, issues))
        }
    }
}

/// Source text plus IR to modernized code
#[derive(Debug, Clone, Copy)]
pub struct ModernizationTask<'a> {
    unit: &'a SourceUnit,
    ir: &'a ProjectIR,
}

impl<'a> ModernizationTask<'a> {
    /// Requires the validated IR of the same unit
    #[inline]
    #[must_use]
    pub fn new(unit: &'a SourceUnit, ir: &'a ProjectIR) -> Self {
        Self { unit, ir }
    }
}

impl StageTask for ModernizationTask<'_> {
    type Output = ModernizedCodeRecord;

    fn stage(&self) -> Stage {
        Stage::Modernization
    }

    fn request(&self) -> GenerationRequest {
        modernization_request(self.unit, self.ir)
    }

    fn fallback(&self) -> ModernizedCodeRecord {
        modernization_fallback(self.unit)
    }

    fn verify(&self, record: &ModernizedCodeRecord) -> Result<(), ValidationError> {
        if record.modernized_code.trim().is_empty() && !self.unit.text().trim().is_empty() {
            return Err(ValidationError::single(
                ModernizedCodeRecord::NAME,
                "modernized_code",
                Problem::Empty,
            ));
        }
        Ok(())
    }
}
