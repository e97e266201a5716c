//! Pipeline configuration
//!
//! Everything the pipeline needs is passed in explicitly through a
//! [`PipelineConfig`] value; nothing is read from the environment here.
//! Configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! max_concurrent_units = 4
//!
//! [retry]
//! max_retries = 3
//! initial_backoff_ms = 500
//! max_backoff_ms = 8000
//!
//! [backend]
//! kind = "openai_compatible"
//! model = "mistralai/devstral-2512:free"
//! timeout_secs = 60
//! ```

use crate::error::ConfigError;
use modernizer_backend::{
    GenerationBackend, OpenAiCompatibleBackend, UnavailableBackend, DEFAULT_BASE_URL,
    DEFAULT_MODEL,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for `max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 16;

/// Default environment variable holding the backend API key
pub const DEFAULT_API_KEY_ENV: &str = "OPEN_ROUTER_API_KEY";

/// Also consulted when `api_key_env` is left at its default
pub const API_KEY_ENV_ALIASES: &[&str] = &["OPENROUTER_API_KEY"];

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Backend retry policy
    pub retry: RetryPolicy,
    /// Backend selection and connection settings
    pub backend: BackendConfig,
    /// Units processed concurrently by a batch
    pub max_concurrent_units: usize,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that never contacts a backend
    #[inline]
    #[must_use]
    pub fn offline() -> Self {
        Self::default().with_backend(BackendConfig::none())
    }

    /// With max retries
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With backend settings
    #[inline]
    #[must_use]
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// With max concurrent units
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_units(mut self, max: usize) -> Self {
        self.max_concurrent_units = max;
        self
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed TOML or unknown keys, or any
    /// error reported by [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every setting
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        self.backend.validate()?;
        if self.max_concurrent_units == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            backend: BackendConfig::default(),
            max_concurrent_units: 4,
        }
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total backend calls allowed per stage invocation
    pub max_retries: u32,
    /// Delay before the first retry after a transient error
    pub initial_backoff_ms: u64,
    /// Backoff cap
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a policy with the default backoff curve
    #[inline]
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Policy with no backoff delay (for tests and local backends)
    #[inline]
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay before the call that follows the `n`-th consecutive transient error
    ///
    /// `initial * 2^(n-1)`, capped at `max_backoff_ms`.
    #[must_use]
    pub fn backoff(&self, n: u32) -> Duration {
        let factor = 1_u64.checked_shl(n.saturating_sub(1)).unwrap_or(u64::MAX);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    /// Backoff cap
    #[inline]
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 || self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::InvalidMaxRetries {
                value: self.max_retries,
                max: MAX_RETRIES_LIMIT,
            });
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff {
                initial_ms: self.initial_backoff_ms,
                max_ms: self.max_backoff_ms,
            });
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
        }
    }
}

/// Which backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// No backend: every stage uses its deterministic fallback
    #[default]
    None,
    /// OpenAI-compatible `/chat/completions` endpoint
    OpenaiCompatible,
}

/// Backend selection and connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Provider base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Inline API key; prefer `api_key_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable the caller reads the API key from
    pub api_key_env: String,
    /// Per-call timeout
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
}

impl BackendConfig {
    /// No backend
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// OpenAI-compatible backend with default endpoint and model
    #[inline]
    #[must_use]
    pub fn openai_compatible() -> Self {
        Self {
            kind: BackendKind::OpenaiCompatible,
            ..Self::default()
        }
    }

    /// With model identifier
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With timeout in seconds
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Look up the API key through `lookup`, an environment reader
    ///
    /// Reads `api_key_env` first; with the default variable name the
    /// [`API_KEY_ENV_ALIASES`] are tried next. Blank values count as unset.
    pub fn api_key_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let aliases = if self.api_key_env == DEFAULT_API_KEY_ENV {
            API_KEY_ENV_ALIASES
        } else {
            &[]
        };
        std::iter::once(self.api_key_env.as_str())
            .chain(aliases.iter().copied())
            .find_map(|var| lookup(var).filter(|k| !k.trim().is_empty()))
    }

    /// Per-call timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the configured backend
    ///
    /// `api_key` is used when the configuration carries no inline key. A
    /// requested backend without any key, or one whose client cannot be
    /// created, becomes an [`UnavailableBackend`] so that stages fail fast
    /// into their fallbacks.
    #[must_use]
    pub fn build_backend(&self, api_key: Option<&str>) -> Option<Arc<dyn GenerationBackend>> {
        match self.kind {
            BackendKind::None => None,
            BackendKind::OpenaiCompatible => {
                let key = self
                    .api_key
                    .as_deref()
                    .or(api_key)
                    .filter(|k| !k.trim().is_empty());
                let Some(key) = key else {
                    tracing::warn!(env = %self.api_key_env, "no API key available; backend disabled");
                    return Some(Arc::new(UnavailableBackend::new(format!(
                        "no API key configured (set {})",
                        self.api_key_env
                    ))));
                };

                let built = OpenAiCompatibleBackend::builder(key)
                    .base_url(&self.base_url)
                    .model(&self.model)
                    .timeout(self.timeout())
                    .temperature(self.temperature)
                    .build();
                match built {
                    Ok(backend) => Some(Arc::new(backend)),
                    Err(e) => {
                        tracing::warn!(error = %e, "backend construction failed");
                        Some(Arc::new(UnavailableBackend::new(e.to_string())))
                    }
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.kind == BackendKind::OpenaiCompatible {
            if self.base_url.trim().is_empty() {
                return Err(ConfigError::MissingBackendSetting("base_url"));
            }
            if self.model.trim().is_empty() {
                return Err(ConfigError::MissingBackendSetting("model"));
            }
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 60,
            temperature: 0.0,
        }
    }
}
