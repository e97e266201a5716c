//! Testing utilities for the modernizer workspace
//!
//! Fake backends with call accounting, and JSON fixtures for the calc.py
//! scenario used across crates.

#![allow(missing_docs)]

use async_trait::async_trait;
use modernizer_backend::{BackendError, GenerationBackend, GenerationRequest};
use modernizer_ir::DocumentKind;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub const CALC_SOURCE: &str = "def add(a,b): return a+b";
pub const CALC_FILENAME: &str = "calc.py";

/// Backend replaying a fixed script of responses
///
/// Records every request it receives. Once the script is exhausted each
/// call fails with `Unavailable`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Result<String, BackendError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Replies with the same text `times` times
    pub fn repeating(text: impl Into<String>, times: usize) -> Self {
        let text = text.into();
        Self::new(std::iter::repeat_with(|| Ok(text.clone())).take(times))
    }

    /// Sleep before answering each call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Unavailable("script exhausted".into())))
    }
}

/// Backend that fails every call with the same error
#[derive(Debug)]
pub struct AlwaysFailingBackend {
    error: BackendError,
    calls: AtomicU32,
}

impl AlwaysFailingBackend {
    pub fn new(error: BackendError) -> Self {
        Self {
            error,
            calls: AtomicU32::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(BackendError::Unavailable("connection refused".into()))
    }

    pub fn timeout() -> Self {
        Self::new(BackendError::Timeout {
            after: Duration::from_secs(60),
        })
    }

    pub fn rate_limited() -> Self {
        Self::new(BackendError::RateLimited { retry_after: None })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for AlwaysFailingBackend {
    fn name(&self) -> &str {
        "always-failing"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Backend that answers every call with text that is not JSON
#[derive(Debug)]
pub struct AlwaysMalformedBackend {
    text: String,
    calls: AtomicU32,
}

impl AlwaysMalformedBackend {
    pub fn new() -> Self {
        Self::with_text("Sure! Here is the analysis you asked for: {modules: [calc")
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for AlwaysMalformedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for AlwaysMalformedBackend {
    fn name(&self) -> &str {
        "always-malformed"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Schema-valid ProjectIR for calc.py
pub fn calc_ir_json() -> Value {
    json!({
        "language": "python",
        "original_filename": CALC_FILENAME,
        "suggested_filename": "calculator.py",
        "summary": "Arithmetic helper module",
        "modules": [{
            "name": "calc",
            "type": "module",
            "description": "Top-level arithmetic functions",
            "functions": [{
                "name": "add",
                "description": "Adds two numbers",
                "inputs": [{"name": "a", "type": "number"}, {"name": "b", "type": "number"}],
                "outputs": [{"name": "sum", "type": "number"}],
                "exceptions": ["non-numeric operand"],
                "business_logic": "Returns a + b"
            }]
        }],
        "technical_debt": [{
            "category": "maintainability",
            "description": "No type hints",
            "severity": "low",
            "recommendation": "Add type hints"
        }],
        "dependencies": [],
        "modernization_priority": ["Add type hints to add"]
    })
}

/// calc.py IR with an undeclared root field
pub fn calc_ir_with_extra_field() -> Value {
    let mut ir = calc_ir_json();
    ir["confidence_score"] = json!(0.97);
    ir
}

/// Schema-valid modernized-code record for calc.py
pub fn calc_modernized_json() -> Value {
    json!({
        "modernized_code": "def add(a: float, b: float) -> float:\n    return a + b\n",
        "filename": "calculator.py",
        "changes_summary": "Added type hints"
    })
}

/// Documentation bundle whose code spans only name calc.py IR terms
pub fn calc_documentation_json() -> Value {
    let mut docs = Map::new();
    for kind in DocumentKind::ALL {
        docs.insert(
            kind.as_str().to_string(),
            json!(format!(
                "# {kind}\n\nThe `calc` module in `calc.py` exposes `add(a, b)` returning `sum`."
            )),
        );
    }
    Value::Object(docs)
}
