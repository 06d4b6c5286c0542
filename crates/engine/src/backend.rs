//! The backend seam.
//!
//! The bridge knows nothing about storage. It hands each [`OpRequest`] to a
//! [`Backend`] on its worker thread and waits for the payload. Backends are
//! shared across threads, so they take `&self` and guard their own state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use docshell_core::{Document, OpRequest};

use crate::error::BackendResult;

/// Cooperative cancellation flag shared by a caller and the worker running its call.
///
/// Cloning shares the flag. Backends should check it before doing work and
/// between expensive steps; a cancelled call must not report success.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag so the token can guard another call
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A store that can execute bridge requests.
pub trait Backend: Send + Sync {
    /// Short name used in logs (`"memory"`, `"mongodb"`)
    fn name(&self) -> &str;

    /// Execute one request and return its payload.
    ///
    /// The request has already passed [`OpRequest::validate`].
    fn execute(&self, request: &OpRequest, cancel: &CancelToken) -> BackendResult<Document>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self, request: &OpRequest, cancel: &CancelToken) -> BackendResult<Document> {
        (**self).execute(request, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker_side = token.clone();
        assert!(!worker_side.is_cancelled());

        token.cancel();
        assert!(worker_side.is_cancelled());

        worker_side.reset();
        assert!(!token.is_cancelled());
    }
}
