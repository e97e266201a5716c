//! Stage orchestrator
//!
//! Drives one stage invocation through its state machine:
//!
//! ```text
//! Start -> BackendCall -> Valid ------------------------------> Done
//!                      -> Malformed / Invalid -> BackendCall (corrective follow-up)
//!                      -> Transient error ---> BackendCall (after backoff)
//!                      -> Unavailable -------> Fallback -> Done
//!          (call budget exhausted) ----------> Fallback -> Done
//! ```
//!
//! `Done` is always reached: the orchestrator never returns an invalid
//! document and never fails for generation-quality reasons.

use crate::config::RetryPolicy;
use crate::prompt::malformed_follow_up;
use modernizer_backend::{BackendError, GenerationBackend, GenerationRequest};
use modernizer_ir::{validate, Schema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analysis,
    Modernization,
    Documentation,
}

impl Stage {
    /// Stages in execution order
    pub const ALL: [Stage; 3] = [Stage::Analysis, Stage::Modernization, Stage::Documentation];

    /// Stage name for logs and metrics
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Modernization => "modernization",
            Self::Documentation => "documentation",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage used its deterministic fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No backend configured
    NoBackend,
    /// Backend reported a non-transient failure
    BackendUnavailable,
    /// Call budget spent without a valid document
    RetriesExhausted,
}

impl FallbackReason {
    /// Label for logs and metrics
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoBackend => "no_backend",
            Self::BackendUnavailable => "backend_unavailable",
            Self::RetriesExhausted => "retries_exhausted",
        }
    }
}

/// Where a stage's output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Backend output that passed validation
    Backend,
    /// Deterministic fallback output
    Fallback { reason: FallbackReason },
}

impl Provenance {
    /// Check if the output is fallback-derived
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Audit record of one stage invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub provenance: Provenance,
    /// Backend calls made
    pub backend_calls: u32,
    /// One entry per rejected call, in order
    pub failures: Vec<String>,
}

/// Typed stage output with its report
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome<T> {
    pub output: T,
    pub report: StageReport,
}

/// One stage's inputs, instruction, checks and fallback
///
/// The orchestrator is generic over this trait; each stage supplies its
/// schema through `Output` and its deterministic fallback.
pub trait StageTask: Send + Sync {
    /// Document the stage produces
    type Output: Schema + Send;

    /// Which stage this is
    fn stage(&self) -> Stage;

    /// Initial backend request
    fn request(&self) -> GenerationRequest;

    /// Deterministic, schema-valid output derived from the task inputs only
    fn fallback(&self) -> Self::Output;

    /// Stage-specific checks applied after schema validation
    ///
    /// # Errors
    /// Returns the problems found; they feed the corrective retry.
    fn verify(&self, _output: &Self::Output) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Why a backend response was not accepted
enum Rejection {
    Malformed(BackendError),
    Invalid(ValidationError),
}

impl Rejection {
    fn follow_up(&self) -> String {
        match self {
            Self::Malformed(BackendError::MalformedOutput(problem)) => malformed_follow_up(problem),
            Self::Malformed(other) => malformed_follow_up(&other.to_string()),
            Self::Invalid(e) => e.corrective_instruction(),
        }
    }
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => Display::fmt(e, f),
            Self::Invalid(e) => Display::fmt(e, f),
        }
    }
}

/// Extract the JSON document from a raw backend response
///
/// A surrounding Markdown code fence is removed first.
///
/// # Errors
/// Returns `BackendError::MalformedOutput` if the text is not JSON.
pub fn parse_response(raw: &str) -> Result<Value, BackendError> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // drop the info string (e.g. `json`)
        text = rest.split_once('\n').map_or("", |(_, body)| body);
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }
    serde_json::from_str(text).map_err(|e| BackendError::MalformedOutput(e.to_string()))
}

fn accept<T: StageTask>(task: &T, raw: &str) -> Result<T::Output, Rejection> {
    let value = parse_response(raw).map_err(Rejection::Malformed)?;
    let output = validate::<T::Output>(&value).map_err(Rejection::Invalid)?;
    task.verify(&output).map_err(Rejection::Invalid)?;
    Ok(output)
}

/// Runs stage tasks against an optional backend
///
/// Holds no mutable state: one orchestrator may serve any number of
/// concurrently running pipelines.
#[derive(Debug, Clone)]
pub struct StageOrchestrator {
    backend: Option<Arc<dyn GenerationBackend>>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl StageOrchestrator {
    /// Create an orchestrator
    ///
    /// `retry.max_retries` is the total call budget per invocation; zero
    /// means the backend is never called.
    #[inline]
    #[must_use]
    pub fn new(
        backend: Option<Arc<dyn GenerationBackend>>,
        retry: RetryPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            retry,
            call_timeout,
        }
    }

    /// Orchestrator without a backend
    #[inline]
    #[must_use]
    pub fn offline() -> Self {
        Self::new(None, RetryPolicy::default(), Duration::from_secs(60))
    }

    /// Check if a backend is configured
    #[inline]
    #[must_use]
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Retry policy in use
    #[inline]
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run one stage invocation to completion
    pub async fn run<T: StageTask>(&self, task: &T) -> StageOutcome<T::Output> {
        let stage = task.stage();
        let span = tracing::info_span!("stage", stage = %stage);
        self.drive(task).instrument(span).await
    }

    async fn drive<T: StageTask>(&self, task: &T) -> StageOutcome<T::Output> {
        let stage = task.stage();
        let mut report = StageReport {
            stage,
            provenance: Provenance::Backend,
            backend_calls: 0,
            failures: Vec::new(),
        };

        let Some(backend) = &self.backend else {
            return Self::fall_back(task, report, FallbackReason::NoBackend);
        };

        let initial = task.request();
        let mut request = initial.clone();
        let mut transient_streak = 0_u32;
        let mut retry_hint = Duration::ZERO;

        while report.backend_calls < self.retry.max_retries {
            if transient_streak > 0 {
                // a Retry-After hint may stretch the delay, never past the cap
                let delay = self
                    .retry
                    .backoff(transient_streak)
                    .max(retry_hint)
                    .min(self.retry.max_backoff());
                if !delay.is_zero() {
                    tracing::debug!(?delay, "backing off");
                    tokio::time::sleep(delay).await;
                }
            }

            report.backend_calls += 1;
            metrics::counter!("modernizer_backend_calls_total", "stage" => stage.as_str())
                .increment(1);

            let result = match tokio::time::timeout(self.call_timeout, backend.generate(&request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout {
                    after: self.call_timeout,
                }),
            };

            match result {
                Err(e) if !e.is_transient() => {
                    tracing::warn!(backend = backend.name(), error = %e, "backend unavailable");
                    report.failures.push(e.to_string());
                    return Self::fall_back(task, report, FallbackReason::BackendUnavailable);
                }
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name(),
                        attempt = report.backend_calls,
                        kind = e.kind(),
                        error = %e,
                        "backend call failed"
                    );
                    retry_hint = match &e {
                        BackendError::RateLimited {
                            retry_after: Some(after),
                        } => *after,
                        _ => Duration::ZERO,
                    };
                    report.failures.push(e.to_string());
                    transient_streak += 1;
                }
                Ok(raw) => {
                    transient_streak = 0;
                    match accept(task, &raw) {
                        Ok(output) => {
                            tracing::info!(calls = report.backend_calls, "stage output accepted");
                            return StageOutcome { output, report };
                        }
                        Err(rejection) => {
                            tracing::warn!(
                                attempt = report.backend_calls,
                                problem = %rejection,
                                "backend output rejected"
                            );
                            report.failures.push(rejection.to_string());
                            request = initial.with_follow_up(&rejection.follow_up());
                        }
                    }
                }
            }
        }

        Self::fall_back(task, report, FallbackReason::RetriesExhausted)
    }

    fn fall_back<T: StageTask>(
        task: &T,
        mut report: StageReport,
        reason: FallbackReason,
    ) -> StageOutcome<T::Output> {
        let stage = task.stage();
        if reason == FallbackReason::NoBackend {
            tracing::debug!(%stage, "no backend configured; using deterministic fallback");
        } else {
            tracing::warn!(%stage, reason = reason.as_str(), calls = report.backend_calls, "falling back");
        }
        metrics::counter!(
            "modernizer_fallbacks_total",
            "stage" => stage.as_str(),
            "reason" => reason.as_str()
        )
        .increment(1);

        report.provenance = Provenance::Fallback { reason };
        StageOutcome {
            output: task.fallback(),
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modernizer_ir::ModernizedCodeRecord;
    use modernizer_test_utils::{AlwaysFailingBackend, ScriptedBackend};
    use serde_json::json;

    /// Minimal task over the modernized-code schema
    struct EchoTask;

    impl StageTask for EchoTask {
        type Output = ModernizedCodeRecord;

        fn stage(&self) -> Stage {
            Stage::Modernization
        }

        fn request(&self) -> GenerationRequest {
            GenerationRequest::json("sys", "modernize")
        }

        fn fallback(&self) -> ModernizedCodeRecord {
            ModernizedCodeRecord {
                modernized_code: "original".into(),
                filename: "a.py".into(),
                changes_summary: "none".into(),
            }
        }
    }

    fn record_json() -> String {
        json!({"modernized_code": "new", "filename": "a.py", "changes_summary": "typed"}).to_string()
    }

    fn orchestrator(backend: Arc<dyn GenerationBackend>, max_retries: u32) -> StageOrchestrator {
        StageOrchestrator::new(
            Some(backend),
            RetryPolicy::immediate(max_retries),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn parse_strips_code_fence() {
        let value = parse_response("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
        let value = parse_response("  {\"a\": 2}  ").unwrap();
        assert_eq!(value, json!({"a": 2}));
        assert!(matches!(
            parse_response("Sure! Here it is"),
            Err(BackendError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn no_backend_uses_fallback_without_calls() {
        let outcome = StageOrchestrator::offline().run(&EchoTask).await;
        assert_eq!(outcome.output.modernized_code, "original");
        assert_eq!(
            outcome.report.provenance,
            Provenance::Fallback {
                reason: FallbackReason::NoBackend
            }
        );
        assert_eq!(outcome.report.backend_calls, 0);
    }

    #[tokio::test]
    async fn valid_response_is_backend_derived() {
        let backend = Arc::new(ScriptedBackend::new([Ok(record_json())]));
        let outcome = orchestrator(backend.clone(), 3).run(&EchoTask).await;
        assert_eq!(outcome.output.modernized_code, "new");
        assert_eq!(outcome.report.provenance, Provenance::Backend);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_response_gets_corrective_follow_up() {
        let backend = Arc::new(ScriptedBackend::new([
            Ok(json!({"modernized_code": "new", "changes_summary": "x"}).to_string()),
            Ok(record_json()),
        ]));
        let outcome = orchestrator(backend.clone(), 3).run(&EchoTask).await;
        assert_eq!(outcome.report.provenance, Provenance::Backend);
        assert_eq!(outcome.report.backend_calls, 2);
        assert_eq!(outcome.report.failures.len(), 1);

        let requests = backend.requests();
        assert!(requests[1].instruction.starts_with("modernize"));
        assert!(requests[1]
            .instruction
            .contains("`filename`: required field is missing"));
    }

    #[tokio::test]
    async fn unavailable_backend_falls_back_immediately() {
        let backend = Arc::new(AlwaysFailingBackend::unavailable());
        let outcome = orchestrator(backend.clone(), 5).run(&EchoTask).await;
        assert_eq!(backend.calls(), 1);
        assert_eq!(
            outcome.report.provenance,
            Provenance::Fallback {
                reason: FallbackReason::BackendUnavailable
            }
        );
    }

    #[tokio::test]
    async fn transient_errors_exhaust_the_budget() {
        let backend = Arc::new(AlwaysFailingBackend::timeout());
        let outcome = orchestrator(backend.clone(), 4).run(&EchoTask).await;
        assert_eq!(backend.calls(), 4);
        assert_eq!(outcome.report.failures.len(), 4);
        assert_eq!(
            outcome.report.provenance,
            Provenance::Fallback {
                reason: FallbackReason::RetriesExhausted
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_back_off_exponentially() {
        let backend = Arc::new(ScriptedBackend::new([
            Err(BackendError::RateLimited { retry_after: None }),
            Err(BackendError::RateLimited { retry_after: None }),
            Ok(record_json()),
        ]));
        let orchestrator = StageOrchestrator::new(
            Some(backend.clone()),
            RetryPolicy {
                max_retries: 3,
                initial_backoff_ms: 100,
                max_backoff_ms: 1000,
            },
            Duration::from_secs(5),
        );
        let started = tokio::time::Instant::now();
        let outcome = orchestrator.run(&EchoTask).await;
        assert_eq!(outcome.report.provenance, Provenance::Backend);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_hint_is_capped() {
        let backend = Arc::new(ScriptedBackend::new([
            Err(BackendError::RateLimited {
                retry_after: Some(Duration::from_secs(3600)),
            }),
            Ok(record_json()),
        ]));
        let orchestrator = StageOrchestrator::new(
            Some(backend),
            RetryPolicy {
                max_retries: 2,
                initial_backoff_ms: 100,
                max_backoff_ms: 2000,
            },
            Duration::from_secs(5),
        );
        let started = tokio::time::Instant::now();
        let outcome = orchestrator.run(&EchoTask).await;
        assert_eq!(outcome.report.provenance, Provenance::Backend);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(2000));
        assert!(waited < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let backend = Arc::new(
            ScriptedBackend::new([Ok(record_json())]).with_delay(Duration::from_secs(30)),
        );
        let orchestrator = StageOrchestrator::new(
            Some(backend),
            RetryPolicy::immediate(1),
            Duration::from_secs(1),
        );
        let outcome = orchestrator.run(&EchoTask).await;
        assert!(outcome.report.failures[0].contains("timed out"));
        assert!(outcome.report.provenance.is_fallback());
    }
}
