//! Error types for the modernizer core
//!
//! Generation-quality problems never surface here: they are absorbed by the
//! stage orchestrator's retry/fallback loop. What remains is:
//! - Configuration errors, detected before any unit is processed
//! - Caller-requested cancellation between stages

/// Invalid pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Retry budget outside the accepted range
    #[error("max_retries must be between 1 and {max}, got {value}")]
    InvalidMaxRetries { value: u32, max: u32 },

    /// Backend call timeout of zero
    #[error("backend timeout must be positive")]
    ZeroTimeout,

    /// No unit could ever run
    #[error("max_concurrent_units must be positive")]
    ZeroConcurrency,

    /// Backoff curve starts above its cap
    #[error("initial backoff ({initial_ms}ms) exceeds max backoff ({max_ms}ms)")]
    InvalidBackoff { initial_ms: u64, max_ms: u64 },

    /// Required backend setting left empty
    #[error("backend setting `{0}` must not be empty")]
    MissingBackendSetting(&'static str),

    /// Configuration file could not be read
    #[error("cannot read configuration {path}: {message}")]
    Io { path: String, message: String },

    /// Configuration text is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Error returned by the pipeline coordinator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// Configuration rejected before processing
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Caller cancelled the unit between stages
    #[error("unit `{unit}` cancelled before {stage} stage")]
    Cancelled { unit: String, stage: crate::Stage },
}

impl PipelineError {
    /// Check if the error was caused by cancellation
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
