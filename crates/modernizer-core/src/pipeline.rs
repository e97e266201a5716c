//! Pipeline coordinator
//!
//! Sequences Analysis, Modernization and Documentation for one unit,
//! threading the IR from stage to stage:
//! - Modernization only starts once a valid IR exists for the unit
//! - Documentation sees the IR and nothing else
//! - Units share no mutable state, so batches run concurrently
//!
//! The only errors that reach the caller are configuration errors, raised
//! by [`Pipeline::new`] before any unit runs, and explicit cancellation.

use crate::config::PipelineConfig;
use crate::docs::assemble;
use crate::error::PipelineError;
use crate::skeleton::generate_skeleton;
use crate::stage::{Stage, StageOrchestrator, StageOutcome, StageReport};
use crate::tasks::{AnalysisTask, ModernizationTask};
use crate::unit::SourceUnit;
use futures::stream::{self, StreamExt};
use modernizer_backend::GenerationBackend;
use modernizer_ir::{DocumentationBundle, Fingerprint, ModernizedCodeRecord, ProjectIR};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Instrument;

/// Per-stage provenance of one unit's artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitProvenance {
    pub analysis: StageReport,
    pub modernization: StageReport,
    pub documentation: StageReport,
}

impl UnitProvenance {
    /// Reports in stage order
    #[inline]
    #[must_use]
    pub fn reports(&self) -> [&StageReport; 3] {
        [&self.analysis, &self.modernization, &self.documentation]
    }

    /// Check if any stage used its fallback
    #[must_use]
    pub fn any_fallback(&self) -> bool {
        self.reports().iter().any(|r| r.provenance.is_fallback())
    }

    /// Backend calls across all stages
    #[must_use]
    pub fn backend_calls(&self) -> u32 {
        self.reports().iter().map(|r| r.backend_calls).sum()
    }
}

/// Everything produced for one source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Path of the unit relative to the input root
    pub relative_path: String,
    /// Canonical audit record
    pub ir: ProjectIR,
    pub modernized: ModernizedCodeRecord,
    pub docs: DocumentationBundle,
    /// Outline of the modernized target derived from the IR
    pub skeleton: String,
    pub provenance: UnitProvenance,
    /// Digest of the IR's canonical JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir_fingerprint: Option<Fingerprint>,
}

/// Cooperative cancellation checked at stage boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs source units through the three stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    orchestrator: StageOrchestrator,
}

impl Pipeline {
    /// Create a pipeline with an explicit backend (or none)
    ///
    /// # Errors
    /// Returns `PipelineError::Configuration` if `config` is invalid.
    pub fn new(
        config: PipelineConfig,
        backend: Option<Arc<dyn GenerationBackend>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let orchestrator = StageOrchestrator::new(backend, config.retry, config.backend.timeout());
        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Create a pipeline whose backend is built from `config`
    ///
    /// # Errors
    /// Returns `PipelineError::Configuration` if `config` is invalid.
    pub fn from_config(config: PipelineConfig, api_key: Option<&str>) -> Result<Self, PipelineError> {
        config.validate()?;
        let backend = config.backend.build_backend(api_key);
        Self::new(config, backend)
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage orchestrator in use
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &StageOrchestrator {
        &self.orchestrator
    }

    /// Analysis stage alone
    pub async fn analyze(&self, unit: &SourceUnit) -> StageOutcome<ProjectIR> {
        self.orchestrator.run(&AnalysisTask::new(unit)).await
    }

    /// Modernization stage alone, given the unit's validated IR
    pub async fn modernize(
        &self,
        unit: &SourceUnit,
        ir: &ProjectIR,
    ) -> StageOutcome<ModernizedCodeRecord> {
        self.orchestrator.run(&ModernizationTask::new(unit, ir)).await
    }

    /// Documentation stage alone
    pub async fn document(&self, ir: &ProjectIR) -> StageOutcome<DocumentationBundle> {
        assemble(ir, &self.orchestrator).await
    }

    /// Process one unit to completion
    ///
    /// Never fails: each stage ends with either validated backend output
    /// or its deterministic fallback.
    pub async fn process(&self, unit: &SourceUnit) -> PipelineResult {
        let span = tracing::info_span!("unit", unit = %unit.relative_path());
        async {
            let analysis = self.analyze(unit).await;
            let modernization = self.modernize(unit, &analysis.output).await;
            let documentation = self.document(&analysis.output).await;
            Self::finish(unit, analysis, modernization, documentation)
        }
        .instrument(span)
        .await
    }

    /// Process one unit, stopping at the next stage boundary once `cancel` is set
    ///
    /// # Errors
    /// Returns `PipelineError::Cancelled` naming the stage that did not start.
    pub async fn process_cancellable(
        &self,
        unit: &SourceUnit,
        cancel: &CancelFlag,
    ) -> Result<PipelineResult, PipelineError> {
        let check = |stage: Stage| {
            if cancel.is_cancelled() {
                tracing::info!(unit = %unit.relative_path(), %stage, "cancelled");
                Err(PipelineError::Cancelled {
                    unit: unit.relative_path().to_string(),
                    stage,
                })
            } else {
                Ok(())
            }
        };

        check(Stage::Analysis)?;
        let analysis = self.analyze(unit).await;
        check(Stage::Modernization)?;
        let modernization = self.modernize(unit, &analysis.output).await;
        check(Stage::Documentation)?;
        let documentation = self.document(&analysis.output).await;
        Ok(Self::finish(unit, analysis, modernization, documentation))
    }

    /// Process many units concurrently
    ///
    /// At most `max_concurrent_units` run at once; results come back in
    /// input order.
    pub async fn process_batch(&self, units: &[SourceUnit]) -> Vec<PipelineResult> {
        let mut results: Vec<(usize, PipelineResult)> = stream::iter(units.iter().enumerate())
            .map(|(i, unit)| async move { (i, self.process(unit).await) })
            .buffer_unordered(self.config.max_concurrent_units)
            .collect()
            .await;
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, result)| result).collect()
    }

    fn finish(
        unit: &SourceUnit,
        analysis: StageOutcome<ProjectIR>,
        modernization: StageOutcome<ModernizedCodeRecord>,
        documentation: StageOutcome<DocumentationBundle>,
    ) -> PipelineResult {
        let ir = analysis.output;
        let ir_fingerprint = match Fingerprint::of(&ir) {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                tracing::error!(error = %e, "cannot fingerprint IR");
                None
            }
        };
        let provenance = UnitProvenance {
            analysis: analysis.report,
            modernization: modernization.report,
            documentation: documentation.report,
        };

        metrics::counter!("modernizer_units_processed_total").increment(1);
        tracing::info!(
            fallback = provenance.any_fallback(),
            calls = provenance.backend_calls(),
            ir = %ir_fingerprint.map(|f| f.short()).unwrap_or_default(),
            "unit processed"
        );

        PipelineResult {
            relative_path: unit.relative_path().to_string(),
            skeleton: generate_skeleton(&ir),
            ir,
            modernized: modernization.output,
            docs: documentation.output,
            provenance,
            ir_fingerprint,
        }
    }
}
