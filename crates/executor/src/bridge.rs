//! The operation bridge: synchronous calls into a backend.
//!
//! Scripts run on one thread and expect each database call to block until it
//! has a result. The bridge gives them that, without letting a stalled backend
//! hang the script forever:
//!
//! - every call is executed on a dedicated worker thread (`docshell-bridge-N`)
//! - the caller waits at most `timeout`, polling its [`CancelToken`]
//! - on timeout or cancellation the worker is abandoned, and the next call
//!   spawns a fresh one
//!
//! Each bridge also carries a session token. [`OperationBridge::invoke`]
//! watches it, so a host holding [`OperationBridge::cancel_token`] can stop
//! whatever call the script is blocked on.
//!
//! One request in, one backend round trip, one result out. No batching, no retry.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use docshell_core::{Document, OpRequest};
use docshell_engine::{Backend, BackendResult, CancelToken};

use crate::{Error, Result};

/// How often a waiting caller re-checks its cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(20);

struct Job {
    request: OpRequest,
    cancel: CancelToken,
    reply: mpsc::Sender<BackendResult<Document>>,
}

struct Worker {
    id: u64,
    jobs: mpsc::Sender<Job>,
}

/// Bridge metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeStats {
    /// Calls that reached a worker
    pub calls: u64,
    /// Calls that gave up waiting
    pub timeouts: u64,
    /// Workers started, including the first
    pub workers_spawned: u64,
}

/// Synchronous call surface in front of a [`Backend`].
pub struct OperationBridge {
    backend: Arc<dyn Backend>,
    timeout: Duration,
    cancel: CancelToken,
    worker: Mutex<Option<Worker>>,
    next_worker: AtomicU64,
    calls: AtomicU64,
    timeouts: AtomicU64,
}

impl std::fmt::Debug for OperationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationBridge")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OperationBridge {
    /// Create a bridge. The worker thread is started on the first call.
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            cancel: CancelToken::new(),
            worker: Mutex::new(None),
            next_worker: AtomicU64::new(0),
            calls: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Name of the backend behind this bridge
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Longest a call may block
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Metrics snapshot
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            calls: self.calls.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            workers_spawned: self.next_worker.load(Ordering::Relaxed),
        }
    }

    /// The session token watched by [`OperationBridge::invoke`].
    ///
    /// Clones share state, so another thread can cancel the call in flight.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Clear a previous cancellation so later calls run again.
    pub fn reset_cancel(&self) {
        self.cancel.reset();
    }

    /// Invoke one operation and block until it completes, times out, or the
    /// session token is cancelled.
    pub fn invoke(&self, request: OpRequest) -> Result<Document> {
        self.invoke_with_cancel(request, &self.cancel)
    }

    /// Invoke one operation, giving up early if `cancel` is triggered.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the request breaks the wire contract
    /// - `Dispatch` if the backend fails the request
    /// - `Timeout` / `Cancelled` if the caller stopped waiting
    /// - `BridgeClosed` if no worker could take the call
    pub fn invoke_with_cancel(&self, request: OpRequest, cancel: &CancelToken) -> Result<Document> {
        request.validate()?;
        let op = request.op;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { op: op.to_string() });
        }
        debug!(op = %op, target = %request.database_target(), backend = self.backend.name(), "bridge call");

        // the worker gets its own token; the caller's is only read
        let call_cancel = CancelToken::new();
        let (reply_tx, reply_rx) = mpsc::channel();
        let job = Job {
            request,
            cancel: call_cancel.clone(),
            reply: reply_tx,
        };
        let worker_id = self.submit(job)?;
        self.calls.fetch_add(1, Ordering::Relaxed);

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match reply_rx.recv_timeout(remaining.min(CANCEL_POLL)) {
                Ok(Ok(payload)) => return Ok(payload),
                Ok(Err(err)) => {
                    warn!(op = %op, error = %err, "backend failed request");
                    return Err(Error::from_backend(op.to_string(), err));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        call_cancel.cancel();
                        self.abandon(worker_id);
                        warn!(op = %op, "bridge call cancelled");
                        return Err(Error::Cancelled { op: op.to_string() });
                    }
                    if Instant::now() >= deadline {
                        call_cancel.cancel();
                        self.abandon(worker_id);
                        self.timeouts.fetch_add(1, Ordering::Relaxed);
                        warn!(op = %op, timeout_ms = self.timeout.as_millis() as u64, "bridge call timed out");
                        return Err(Error::Timeout {
                            op: op.to_string(),
                            millis: self.timeout.as_millis() as u64,
                        });
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // worker died mid-call (backend panic)
                    self.abandon(worker_id);
                    return Err(Error::BridgeClosed);
                }
            }
        }
    }

    /// Hand a job to the current worker, spawning one if needed.
    fn submit(&self, job: Job) -> Result<u64> {
        let mut slot = self.worker.lock();
        let job = match slot.as_ref() {
            Some(worker) => match worker.jobs.send(job) {
                Ok(()) => return Ok(worker.id),
                Err(mpsc::SendError(job)) => job,
            },
            None => job,
        };

        let worker = self.spawn_worker()?;
        let id = worker.id;
        worker.jobs.send(job).map_err(|_| Error::BridgeClosed)?;
        *slot = Some(worker);
        Ok(id)
    }

    fn spawn_worker(&self) -> Result<Worker> {
        let id = self.next_worker.fetch_add(1, Ordering::Relaxed);
        let (jobs, inbox) = mpsc::channel::<Job>();
        let backend = Arc::clone(&self.backend);
        std::thread::Builder::new()
            .name(format!("docshell-bridge-{}", id))
            .spawn(move || worker_loop(backend, inbox))?;
        debug!(worker = id, "bridge worker started");
        Ok(Worker { id, jobs })
    }

    /// Drop our handle on a stalled worker. It exits once its current call returns.
    fn abandon(&self, worker_id: u64) {
        let mut slot = self.worker.lock();
        if slot.as_ref().map(|w| w.id) == Some(worker_id) {
            *slot = None;
            warn!(worker = worker_id, "abandoned bridge worker");
        }
    }
}

fn worker_loop(backend: Arc<dyn Backend>, inbox: mpsc::Receiver<Job>) {
    while let Ok(job) = inbox.recv() {
        let result = if job.cancel.is_cancelled() {
            Err(docshell_engine::BackendError::Cancelled)
        } else {
            backend.execute(&job.request, &job.cancel)
        };
        // caller may have stopped waiting
        let _ = job.reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshell_core::{CollectionDescriptor, DatabaseDescriptor, OpName};
    use docshell_engine::MemoryBackend;
    use serde_json::json;

    #[test]
    fn test_worker_is_lazy_and_reused() {
        let bridge = OperationBridge::new(Arc::new(MemoryBackend::new()), Duration::from_secs(5));
        assert_eq!(bridge.stats().workers_spawned, 0);

        let users = CollectionDescriptor::new(DatabaseDescriptor::new("t", "h", 1), "users");
        for _ in 0..3 {
            bridge
                .invoke(OpRequest::collection(OpName::InsertOne, users.clone(), vec![json!({})]))
                .unwrap();
        }
        let stats = bridge.stats();
        assert_eq!(stats.calls, 3);
        assert_eq!(stats.workers_spawned, 1);
    }

    #[test]
    fn test_contract_violation_never_reaches_worker() {
        let bridge = OperationBridge::new(Arc::new(MemoryBackend::new()), Duration::from_secs(5));
        let db = DatabaseDescriptor::new("t", "h", 1);
        let err = bridge
            .invoke(OpRequest::database(OpName::Find, db))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(bridge.stats().calls, 0);
    }
}
