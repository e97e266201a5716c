//! Modernizer generation backends
//!
//! A uniform interface to an optional external text-generation service.
//! Backends never retry and never cache: retry policy belongs to the
//! caller, and a backend may be shared across concurrently running
//! pipelines.
//!
//! # Example
//!
//! ```rust,ignore
//! use modernizer_backend::{GenerationBackend, GenerationRequest, OpenAiCompatibleBackend};
//!
//! let backend = OpenAiCompatibleBackend::builder("sk-...").model("gpt-4o-mini").build()?;
//! let raw = backend
//!     .generate(&GenerationRequest::json("You are an analyst.", "Describe calc.py"))
//!     .await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod openai;

pub use error::BackendError;
pub use openai::{OpenAiCompatibleBackend, OpenAiCompatibleBuilder, DEFAULT_BASE_URL, DEFAULT_MODEL};

use async_trait::async_trait;
use std::fmt::Debug;

/// Required shape of the backend's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// A single JSON document
    #[default]
    Json,
}

/// One generation request: instruction text plus the required-format marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Role / rules for the generator
    pub system: String,
    /// The task itself
    pub instruction: String,
    pub format: ResponseFormat,
}

impl GenerationRequest {
    /// Create a JSON-only request
    #[inline]
    #[must_use]
    pub fn json(system: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            instruction: instruction.into(),
            format: ResponseFormat::Json,
        }
    }

    /// Same request with a follow-up appended to the instruction
    #[must_use]
    pub fn with_follow_up(&self, follow_up: &str) -> Self {
        Self {
            system: self.system.clone(),
            instruction: format!("{}\n\n{}", self.instruction, follow_up),
            format: self.format,
        }
    }
}

/// Opaque text-completion service
///
/// Implementations must be safe for concurrent invocation and must not
/// keep mutable session state beyond connection pooling.
#[async_trait]
pub trait GenerationBackend: Send + Sync + Debug {
    /// Human-readable backend name for logs
    fn name(&self) -> &str;

    /// Produce raw text for `request`
    ///
    /// # Errors
    /// Returns [`BackendError`] on any service failure; never retries.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

/// Backend that is configured but cannot be used
///
/// Every call fails fast with [`BackendError::Unavailable`].
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    /// Create with the reason reported on every call
    #[inline]
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the backend is unavailable
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl GenerationBackend for UnavailableBackend {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
