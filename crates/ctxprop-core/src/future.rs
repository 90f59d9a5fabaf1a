//! Context-aware future/promise (spec §4.10 / C10).

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};

use pin_project_lite::pin_project;

use crate::executor::Execute;
use crate::runtime::Runtime;
use crate::snapshot::Snapshot;
use crate::wrappers::ContextAwareFn;

pin_project! {
    /// Reactivates `snapshot` around every poll of `inner`, so any ambient
    /// reads performed while the future's state machine is running (not
    /// just at continuation boundaries) observe the same context it was
    /// constructed with. Mirrors this codebase's `Instrument`-style future
    /// combinators.
    struct WithSnapshot<F> {
        #[pin]
        inner: F,
        snapshot: Arc<Snapshot>,
        runtime: Arc<Runtime>,
    }
}

impl<F: Future> Future for WithSnapshot<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let handle = this
            .snapshot
            .reactivate(this.runtime)
            .expect("reactivating an already-captured snapshot should not fail");
        let result = this.inner.poll(cx);
        if let Err(err) = handle.close() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "context-aware future poll failed to restore prior context");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
        result
    }
}

/// Tracks the snapshot each stage of a chain should reactivate against.
/// Fixed unless take-new-snapshot mode is enabled, in which case every
/// completed stage publishes a fresh capture here for the next stage to
/// read (spec §4.10 "Variant takeNewSnapshot").
#[derive(Clone)]
struct SnapshotSlot(Arc<Mutex<Arc<Snapshot>>>);

impl SnapshotSlot {
    fn fixed(snapshot: Arc<Snapshot>) -> Self {
        Self(Arc::new(Mutex::new(snapshot)))
    }

    fn get(&self) -> Arc<Snapshot> {
        Arc::clone(&self.0.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn set(&self, snapshot: Arc<Snapshot>) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }
}

/// Adapts a one-shot `FnOnce` into the reusable `Fn` [`ContextAwareFn`]
/// expects, via interior mutability. Each future stage builds exactly one
/// `ContextAwareFn` and calls it exactly once, so the "called twice" panic
/// path is unreachable in practice; it exists only to keep the adapter
/// total.
fn once_to_fn<T, R>(
    f: impl FnOnce(T) -> R + Send + 'static,
) -> impl Fn(T) -> R + Send + Sync + 'static
where
    T: Send + 'static,
    R: Send + 'static,
{
    let cell = Mutex::new(Some(f));
    move |arg: T| {
        let f = cell
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .expect("future-stage delegate invoked more than once");
        f(arg)
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A future whose every stage is registered against the snapshot captured
/// at the *original* future's construction, not at the time each stage is
/// registered or executed (spec §4.10's central property) — unless
/// take-new-snapshot mode is enabled, in which case each stage reads
/// whatever the previous stage most recently published to `slot`.
pub struct ContextAwareFuture<T> {
    inner: BoxFuture<T>,
    original: Arc<Snapshot>,
    slot: SnapshotSlot,
    runtime: Arc<Runtime>,
    take_new_snapshot: bool,
}

impl<T: Send + 'static> ContextAwareFuture<T> {
    /// Capture a snapshot now, submit `supplier` to `executor`, and resolve
    /// to its result. The supplier runs under the snapshot captured here,
    /// regardless of which thread `executor` happens to run it on. Always
    /// publishes the fresh snapshot taken right after `supplier` runs into
    /// `slot`, so a subsequent `.with_take_new_snapshot()` (applied to the
    /// returned future, as every call site does) sees stage 1's mutations.
    pub fn supply_async<E: Execute>(
        supplier: impl FnOnce() -> T + Send + 'static,
        executor: Arc<E>,
        runtime: Arc<Runtime>,
    ) -> Self {
        let snapshot = Arc::new(runtime.create_context_snapshot());
        let slot = SnapshotSlot::fixed(Arc::clone(&snapshot));
        let publish_slot = slot.clone();
        let wrapped = ContextAwareFn::with_snapshot(
            Arc::clone(&snapshot),
            once_to_fn(move |()| supplier()),
            Arc::clone(&runtime),
        )
        .with_snapshot_consumer(move |fresh| publish_slot.set(fresh));

        let (tx, rx) = tokio::sync::oneshot::channel();
        executor.execute(move || {
            let _ = tx.send(wrapped.call(()));
        });

        let inner: BoxFuture<T> = Box::pin(async move {
            rx.await
                .expect("executor dropped the result sender before sending")
                .expect("wrapper reactivation should not fail for a just-captured snapshot")
        });

        Self {
            inner,
            original: snapshot,
            slot,
            runtime,
            take_new_snapshot: false,
        }
    }

    /// Like [`Self::supply_async`] for a task with no meaningful result.
    pub fn run_async<E: Execute>(
        task: impl FnOnce() + Send + 'static,
        executor: Arc<E>,
        runtime: Arc<Runtime>,
    ) -> ContextAwareFuture<()> {
        ContextAwareFuture::supply_async(task, executor, runtime)
    }

    /// Enable take-new-snapshot mode: every subsequent stage captures a
    /// fresh snapshot at its completion and propagates it to the next
    /// stage, instead of all stages sharing the originally captured one.
    #[must_use]
    pub fn with_take_new_snapshot(mut self) -> Self {
        self.take_new_snapshot = true;
        self
    }

    /// Chain `f` to run, under the appropriate snapshot, after `self`
    /// completes — submitted through `executor` so the continuation may run
    /// on a different thread than the one that registered it.
    pub fn then_apply_async<R: Send + 'static, E: Execute>(
        self,
        f: impl FnOnce(T) -> R + Send + 'static,
        executor: Arc<E>,
    ) -> ContextAwareFuture<R> {
        let original = Arc::clone(&self.original);
        let slot = self.slot.clone();
        let next_slot = slot.clone();
        let runtime = Arc::clone(&self.runtime);
        let take_new_snapshot = self.take_new_snapshot;
        let inner_self = self.inner;

        let (tx, rx) = tokio::sync::oneshot::channel();
        let inner: BoxFuture<R> = Box::pin(async move {
            let value = inner_self.await;
            // Read only after the previous stage has actually completed, so
            // take-new-snapshot mode sees what that stage just published
            // rather than whatever was in `slot` at registration time.
            let stage_snapshot = if take_new_snapshot {
                slot.get()
            } else {
                Arc::clone(&original)
            };
            let wrapped = ContextAwareFn::with_snapshot(stage_snapshot, once_to_fn(f), Arc::clone(&runtime))
                .with_snapshot_consumer(move |fresh| next_slot.set(fresh));
            executor.execute(move || {
                let _ = tx.send(wrapped.call(value));
            });
            rx.await
                .expect("executor dropped the result sender before sending")
                .expect("wrapper reactivation should not fail for an already-validated snapshot")
        });

        ContextAwareFuture {
            inner,
            original,
            slot,
            runtime,
            take_new_snapshot,
        }
    }

    /// Chain `f` to run inline (on whichever thread polls this future to
    /// completion), under the appropriate snapshot. Unlike
    /// [`Self::then_apply_async`] this never hops threads on its own.
    pub fn then_apply<R: Send + 'static>(
        self,
        f: impl FnOnce(T) -> R + Send + 'static,
    ) -> ContextAwareFuture<R> {
        let original = Arc::clone(&self.original);
        let slot = self.slot.clone();
        let next_slot = slot.clone();
        let runtime = Arc::clone(&self.runtime);
        let take_new_snapshot = self.take_new_snapshot;
        let inner_self = self.inner;

        let inner: BoxFuture<R> = Box::pin(async move {
            let value = inner_self.await;
            let stage_snapshot = if take_new_snapshot {
                slot.get()
            } else {
                Arc::clone(&original)
            };
            let wrapped = ContextAwareFn::with_snapshot(stage_snapshot, once_to_fn(f), Arc::clone(&runtime))
                .with_snapshot_consumer(move |fresh| next_slot.set(fresh));
            wrapped
                .call(value)
                .expect("wrapper reactivation should not fail for an already-validated snapshot")
        });

        ContextAwareFuture {
            inner,
            original,
            slot,
            runtime,
            take_new_snapshot,
        }
    }

    /// Wrap an arbitrary future so every poll of it (not just completion
    /// handoffs) runs under `snapshot`.
    #[must_use]
    pub fn from_future(
        future: impl Future<Output = T> + Send + 'static,
        snapshot: Arc<Snapshot>,
        runtime: Arc<Runtime>,
    ) -> Self {
        let inner: BoxFuture<T> = Box::pin(WithSnapshot {
            inner: future,
            snapshot: Arc::clone(&snapshot),
            runtime: Arc::clone(&runtime),
        });
        Self {
            inner,
            original: Arc::clone(&snapshot),
            slot: SnapshotSlot::fixed(snapshot),
            runtime,
            take_new_snapshot: false,
        }
    }
}

impl<T> Future for ContextAwareFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<T> {
        let this = self.get_mut();
        this.inner.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Execute;

    struct Inline;
    impl Execute for Inline {
        fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
            task();
        }
    }

    #[tokio::test]
    async fn supply_async_resolves_to_supplier_result() {
        let runtime = Arc::new(Runtime::builder().build());
        let fut = ContextAwareFuture::supply_async(|| 42, Arc::new(Inline), runtime);
        assert_eq!(fut.await, 42);
    }

    #[tokio::test]
    async fn then_apply_chains_under_inline_executor() {
        let runtime = Arc::new(Runtime::builder().build());
        let fut = ContextAwareFuture::supply_async(|| 1, Arc::new(Inline), runtime)
            .then_apply_async(|x| x + 1, Arc::new(Inline))
            .then_apply(|x| x * 10);
        assert_eq!(fut.await, 20);
    }

    #[tokio::test]
    async fn run_async_resolves_to_unit() {
        let runtime = Arc::new(Runtime::builder().build());
        let fut = ContextAwareFuture::run_async(|| {}, Arc::new(Inline), runtime);
        fut.await;
    }
}
