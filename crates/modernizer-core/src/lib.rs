//! Modernizer Core - IR-first modernization pipeline
//!
//! Turns a source unit into a validated IR, then derives modernized code
//! and documentation from that IR:
//! - Stage orchestration with validation, corrective retry and backoff
//! - Deterministic fallbacks so every stage always completes
//! - A documentation assembler that only reads the IR
//! - Per-stage provenance for every unit
//!
//! # Example
//!
//! ```rust,ignore
//! use modernizer_core::{Pipeline, PipelineConfig, SourceUnit};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(PipelineConfig::offline(), None)?;
//! let unit = SourceUnit::new("def add(a,b): return a+b", "calc.py", "python");
//!
//! let result = pipeline.process(&unit).await;
//! println!("{} modules, fallback used: {}", result.ir.modules.len(), result.provenance.any_fallback());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod docs;
pub mod error;
pub mod fallback;
pub mod language;
pub mod pipeline;
pub mod prompt;
pub mod skeleton;
pub mod stage;
pub mod tasks;
pub mod unit;

pub use config::{BackendConfig, BackendKind, PipelineConfig, RetryPolicy};
pub use docs::{assemble, DocumentationTask, IrVocabulary};
pub use error::{ConfigError, PipelineError};
pub use language::detect_language;
pub use pipeline::{CancelFlag, Pipeline, PipelineResult, UnitProvenance};
pub use skeleton::generate_skeleton;
pub use stage::{
    FallbackReason, Provenance, Stage, StageOrchestrator, StageOutcome, StageReport, StageTask,
};
pub use tasks::{AnalysisTask, ModernizationTask};
pub use unit::SourceUnit;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the pipeline
    pub use crate::{
        CancelFlag, Pipeline, PipelineConfig, PipelineResult, Provenance, SourceUnit, Stage,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
