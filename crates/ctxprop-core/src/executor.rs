//! Context-aware task executor (spec §4.8 / C8).

use std::sync::Arc;

use crate::runtime::Runtime;
use crate::snapshot::Snapshot;

/// Minimal executor capability this module wraps: accept a boxed
/// fire-and-forget task. Deliberately narrow (no shutdown/queue-depth
/// surface) — every other shape of submission (value-returning, batched)
/// is built on top of this one primitive, matching the "all shapes must
/// preserve the same contract" requirement.
pub trait Execute: Send + Sync + 'static {
    /// Forward `task` to the wrapped executor for execution, unmodified.
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// Adapts any Tokio runtime handle into an [`Execute`] by running tasks on
/// the blocking thread pool. Matches the wrapped-executor shape the spec
/// describes (C8 wraps *some* executor, not specifically Tokio) while
/// staying within this codebase's existing async stack.
pub struct TokioBlockingExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioBlockingExecutor {
    /// Wrap the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Execute for TokioBlockingExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        self.handle.spawn_blocking(task);
    }
}

/// Wraps an [`Execute`] so that every task submitted through it runs under
/// a reactivated snapshot of the submitting thread's ambient context.
///
/// On `execute`: capture a snapshot on the calling thread, wrap the task in
/// a closure that reactivates the snapshot on the worker thread (closing it
/// on every exit path, including a panicking task), then forward to the
/// wrapped executor. Shutdown, rejection, and interruption semantics are
/// whatever the wrapped executor already does — this type adds nothing on
/// that axis.
pub struct ContextAwareExecutor<E> {
    inner: E,
    runtime: Arc<Runtime>,
}

impl<E: Execute> ContextAwareExecutor<E> {
    /// Wrap `inner`, capturing snapshots from `runtime`.
    #[must_use]
    pub fn new(inner: E, runtime: Arc<Runtime>) -> Self {
        Self { inner, runtime }
    }

    /// Submit a fire-and-forget task. The snapshot active on the calling
    /// thread at the moment of this call is captured and reactivated around
    /// `task` on whichever thread the wrapped executor runs it.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
        let snapshot = Arc::new(self.runtime.create_context_snapshot());
        let runtime = Arc::clone(&self.runtime);
        self.inner.execute(Box::new(move || {
            run_under_snapshot(&snapshot, &runtime, task);
        }));
    }


    /// Submit a value-returning task, delivering its result through `tx`.
    /// Panics in `task` are caught and reported as a dropped sender (the
    /// receiver observes a `RecvError`), matching the "delegate errors
    /// propagate unchanged" rule — a panic unwinds the worker thread, not
    /// the wrapper.
    pub fn execute_value<T: Send + 'static>(
        &self,
        task: impl FnOnce() -> T + Send + 'static,
    ) -> tokio::sync::oneshot::Receiver<T> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.execute(move || {
            let _ = tx.send(task());
        });
        rx
    }
}

fn run_under_snapshot<T>(snapshot: &Snapshot, runtime: &Arc<Runtime>, task: impl FnOnce() -> T) -> T {
    let handle = snapshot
        .reactivate(runtime)
        .expect("reactivating a just-captured snapshot should not fail");
    let result = task();
    if let Err(err) = handle.close() {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %err, "context-aware executor failed to restore prior context");
        #[cfg(not(feature = "tracing"))]
        let _ = err;
    }
    result
}
