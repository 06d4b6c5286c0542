//! Script-level tests: everything here goes through `ShellRuntime::eval`.


use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::executor::{
    Backend, BackendError, BackendResult, CancelToken, Document, MemoryBackend, OpRequest,
    OperationBridge, SessionState, ShellContext,
};
use crate::{BufferSink, ShellRuntime};

/// In-memory backend that records every request it is given.
#[derive(Default)]
pub struct TapBackend {
    inner: MemoryBackend,
    seen: Mutex<Vec<OpRequest>>,
    fail_with: Mutex<Option<BackendError>>,
    delay: Mutex<Option<Duration>>,
}

impl TapBackend {
    pub fn requests(&self) -> Vec<OpRequest> {
        self.seen.lock().clone()
    }

    /// Fail every following call
    pub fn fail_with(&self, err: BackendError) {
        *self.fail_with.lock() = Some(err);
    }

    /// Sleep before answering every following call (`None` to stop)
    pub fn slow_down(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }
}

impl Backend for TapBackend {
    fn name(&self) -> &str {
        "tap"
    }

    fn execute(&self, request: &OpRequest, cancel: &CancelToken) -> BackendResult<Document> {
        self.seen.lock().push(request.clone());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
        }
        if let Some(err) = self.fail_with.lock().clone() {
            return Err(err);
        }
        self.inner.execute(request, cancel)
    }
}

pub struct Harness {
    pub runtime: ShellRuntime,
    pub backend: Arc<TapBackend>,
    pub out: BufferSink,
}

impl Harness {
    pub fn new() -> Self {
        let backend = Arc::new(TapBackend::default());
        let bridge = OperationBridge::new(backend.clone(), Duration::from_secs(5));
        let context = ShellContext::with_state(
            SessionState::new("test", "127.0.0.1", 27017),
            bridge,
        );
        let out = BufferSink::new();
        let runtime = ShellRuntime::new(context, Arc::new(out.clone())).unwrap();
        Self {
            runtime,
            backend,
            out,
        }
    }

    /// Evaluate and convert the result to JSON (`null` for unit)
    pub fn json(&mut self, source: &str) -> Value {
        self.runtime
            .eval_document(source)
            .unwrap()
            .unwrap_or(Value::Null)
    }
}
