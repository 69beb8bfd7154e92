//! Thread-safe handle to a coordinator.
//!
//! [`SharedCoordinator`] wraps a [`Coordinator`] in `Arc<Mutex<_>>` so
//! several threads can build and update one pipeline. Updates are
//! serialized by the lock. A call made from the thread that is currently
//! inside an update (for example from an algorithm callback that captured a
//! clone of the handle) would deadlock on the lock, so it fails with
//! [`PipelineError::ReentrantUpdate`] instead.

use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::coordinator::Coordinator;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::PortId;
use crate::pipeline::report::UpdateReport;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

static GLOBAL: OnceLock<SharedCoordinator> = OnceLock::new();

#[derive(Clone)]
pub struct SharedCoordinator {
    inner: Arc<Mutex<Coordinator>>,
    /// Thread currently holding the coordinator, if any.
    holder: Arc<Mutex<Option<ThreadId>>>,
    cancel: CancellationToken,
}

impl Default for SharedCoordinator {
    fn default() -> Self {
        Self::new(Coordinator::new())
    }
}

/// Clears the holder when the locked section ends, panics included.
struct HolderGuard<'a> {
    holder: &'a Mutex<Option<ThreadId>>,
}

impl Drop for HolderGuard<'_> {
    fn drop(&mut self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SharedCoordinator {
    pub fn new(coordinator: Coordinator) -> Self {
        let cancel = coordinator.cancellation_token();
        Self {
            inner: Arc::new(Mutex::new(coordinator)),
            holder: Arc::new(Mutex::new(None)),
            cancel,
        }
    }

    /// Process-wide instance, created on first use.
    pub fn global() -> &'static SharedCoordinator {
        GLOBAL.get_or_init(|| {
            tracing::debug!("Creating global coordinator");
            SharedCoordinator::default()
        })
    }

    /// Run `f` with exclusive access to the coordinator.
    pub fn with<R>(&self, f: impl FnOnce(&mut Coordinator) -> R) -> PipelineResult<R> {
        let me = thread::current().id();
        if *self.holder.lock().unwrap_or_else(PoisonError::into_inner) == Some(me) {
            tracing::warn!("Re-entrant coordinator access from {:?}", me);
            return Err(PipelineError::ReentrantUpdate);
        }

        let mut coordinator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = Some(me);
        let _guard = HolderGuard { holder: &self.holder };
        Ok(f(&mut coordinator))
    }

    /// Update `port`, waiting for any update running on another thread.
    pub fn update(&self, port: PortId) -> PipelineResult<UpdateReport> {
        self.with(|c| c.update(port))
    }

    /// Cancel the running update without taking the lock.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the wrapped coordinator. Replacing the
    /// coordinator's token through [`with`](Self::with) detaches this one.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
