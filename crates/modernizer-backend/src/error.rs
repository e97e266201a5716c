//! Backend error taxonomy
//!
//! Every failure of a generation call is one of:
//! - `Unavailable`: no backend configured or reachable (non-transient)
//! - `Timeout`, `RateLimited`, `Http`: transient service conditions
//! - `MalformedOutput`: the service answered but not with usable text

use std::time::Duration;

/// Error returned by a [`GenerationBackend`](crate::GenerationBackend) call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No backend configured or reachable
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Call did not complete in time
    #[error("backend call timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// Provider asked the caller to slow down
    #[error("backend rate limited{}", .retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// Response could not be interpreted
    #[error("malformed backend output: {0}")]
    MalformedOutput(String),

    /// Non-success HTTP status other than auth / rate-limit failures
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl BackendError {
    /// Check if a retry may succeed
    ///
    /// `Unavailable` is the only non-transient condition: calling again
    /// cannot change the outcome.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }

    /// Short, stable label for logs and metrics
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::MalformedOutput(_) => "malformed_output",
            Self::Http { .. } => "http",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_permanent() {
        assert!(!BackendError::Unavailable("no key".into()).is_transient());
        assert!(BackendError::Timeout {
            after: Duration::from_secs(1)
        }
        .is_transient());
        assert!(BackendError::RateLimited { retry_after: None }.is_transient());
        assert!(BackendError::MalformedOutput("x".into()).is_transient());
        assert!(BackendError::Http {
            status: 502,
            body: String::new()
        }
        .is_transient());
    }

    #[test]
    fn display_includes_context() {
        let err = BackendError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.to_string(), "backend rate limited (retry after 7s)");
        let err = BackendError::Timeout {
            after: Duration::from_millis(1500),
        };
        assert!(err.to_string().contains("1500ms"));
    }
}
