//! Function/Callable/Runnable wrappers (spec §4.9 / C9).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::snapshot::Snapshot;

/// Where a [`ContextAwareFn`] gets the snapshot it reactivates around each
/// call. A supplier defers capture until invocation time, which is what
/// lets a future's continuation capture context lazily (spec §4.9 step 1,
/// "so suppliers may defer capture").
enum SnapshotSource {
    Fixed(Arc<Snapshot>),
    Supplier(Arc<dyn Fn() -> Option<Arc<Snapshot>> + Send + Sync>),
}

impl SnapshotSource {
    fn obtain(&self) -> Result<Arc<Snapshot>> {
        match self {
            Self::Fixed(snapshot) => Ok(Arc::clone(snapshot)),
            Self::Supplier(supplier) => supplier().ok_or_else(|| {
                Error::configuration("snapshot supplier returned no snapshot")
            }),
        }
    }
}

/// A hook invoked after the delegate runs and before the reactivation scope
/// closes, receiving a freshly captured snapshot. Chained futures use this
/// to carry mutations the delegate made onward to the next stage (spec §4.9
/// step 5).
type SnapshotConsumer = Arc<dyn Fn(Arc<Snapshot>) + Send + Sync>;

/// Reactivates a snapshot around every invocation of a wrapped delegate.
///
/// Generic over `T -> R` so it stands in for Runnable (`T = ()`, `R = ()`),
/// Callable (`T = ()`, `R` meaningful), and Function (`T`, `R` both
/// meaningful) in one type, the way a single closure type does in Rust
/// where the source draws three separate interfaces.
pub struct ContextAwareFn<T, R> {
    source: SnapshotSource,
    delegate: Arc<dyn Fn(T) -> R + Send + Sync>,
    snapshot_consumer: Option<SnapshotConsumer>,
    runtime: Arc<Runtime>,
}

impl<T, R> Clone for ContextAwareFn<T, R> {
    fn clone(&self) -> Self {
        Self {
            source: match &self.source {
                SnapshotSource::Fixed(s) => SnapshotSource::Fixed(Arc::clone(s)),
                SnapshotSource::Supplier(s) => SnapshotSource::Supplier(Arc::clone(s)),
            },
            delegate: Arc::clone(&self.delegate),
            snapshot_consumer: self.snapshot_consumer.clone(),
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl<T: 'static, R: 'static> ContextAwareFn<T, R> {
    /// Wrap `delegate`, reactivating `snapshot` around every call.
    #[must_use]
    pub fn with_snapshot(
        snapshot: Arc<Snapshot>,
        delegate: impl Fn(T) -> R + Send + Sync + 'static,
        runtime: Arc<Runtime>,
    ) -> Self {
        Self {
            source: SnapshotSource::Fixed(snapshot),
            delegate: Arc::new(delegate),
            snapshot_consumer: None,
            runtime,
        }
    }

    /// Wrap `delegate`, calling `supplier` on every invocation to obtain the
    /// snapshot to reactivate. A supplier returning `None` is a
    /// configuration error (spec §4.9 step 2).
    #[must_use]
    pub fn with_supplier(
        supplier: impl Fn() -> Option<Arc<Snapshot>> + Send + Sync + 'static,
        delegate: impl Fn(T) -> R + Send + Sync + 'static,
        runtime: Arc<Runtime>,
    ) -> Self {
        Self {
            source: SnapshotSource::Supplier(Arc::new(supplier)),
            delegate: Arc::new(delegate),
            snapshot_consumer: None,
            runtime,
        }
    }

    /// Attach a consumer invoked with a freshly captured snapshot right
    /// before the reactivation scope closes.
    #[must_use]
    pub fn with_snapshot_consumer(
        mut self,
        consumer: impl Fn(Arc<Snapshot>) + Send + Sync + 'static,
    ) -> Self {
        self.snapshot_consumer = Some(Arc::new(consumer));
        self
    }

    /// Invoke the delegate once, under a reactivated snapshot.
    ///
    /// Delegate panics are not caught: they unwind through the reactivation
    /// scope's `Drop` (which still closes the handle) and out to the
    /// caller, matching "forwarding its result or thrown error unchanged"
    /// (spec §4.9 step 4).
    pub fn call(&self, arg: T) -> Result<R> {
        let snapshot = self.source.obtain()?;
        let handle = snapshot
            .reactivate(&self.runtime)
            .map_err(|source| Error::Activation {
                manager: "wrapper-reactivation".to_string(),
                source: Box::new(source),
            })?;

        let result = (self.delegate)(arg);

        if let Some(consumer) = &self.snapshot_consumer {
            consumer(Arc::new(self.runtime.create_context_snapshot()));
        }

        handle.close().map_err(|source| Error::Activation {
            manager: "wrapper-reactivation-close".to_string(),
            source: Box::new(source),
        })?;

        Ok(result)
    }

    /// Compose `self` followed by `next`, reactivating the *same* snapshot
    /// source around the composed call (spec §4.9 "Composition").
    #[must_use]
    pub fn and_then<R2: 'static>(
        self,
        next: impl Fn(R) -> R2 + Send + Sync + 'static,
    ) -> ContextAwareFn<T, R2> {
        let delegate = self.delegate;
        ContextAwareFn {
            source: self.source,
            delegate: Arc::new(move |t: T| next(delegate(t))),
            snapshot_consumer: self.snapshot_consumer,
            runtime: self.runtime,
        }
    }

    /// Compose `before` followed by `self`, reactivating the same snapshot
    /// source around the composed call.
    #[must_use]
    pub fn compose<T2: 'static>(
        self,
        before: impl Fn(T2) -> T + Send + Sync + 'static,
    ) -> ContextAwareFn<T2, R> {
        let delegate = self.delegate;
        ContextAwareFn {
            source: self.source,
            delegate: Arc::new(move |t2: T2| delegate(before(t2))),
            snapshot_consumer: self.snapshot_consumer,
            runtime: self.runtime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn call_reactivates_and_invokes_delegate() {
        let runtime = Arc::new(Runtime::builder().build());
        let snapshot = Arc::new(Snapshot::capture(runtime.registry()));
        let wrapper = ContextAwareFn::with_snapshot(snapshot, |x: i32| x * 2, runtime);
        assert_eq!(wrapper.call(21).unwrap(), 42);
    }

    #[test]
    fn missing_supplier_snapshot_is_configuration_error() {
        let runtime = Arc::new(Runtime::builder().build());
        let wrapper: ContextAwareFn<(), ()> =
            ContextAwareFn::with_supplier(|| None, |()| (), runtime);
        assert!(matches!(wrapper.call(()), Err(Error::Configuration { .. })));
    }

    #[test]
    fn and_then_composes_under_same_snapshot() {
        let runtime = Arc::new(Runtime::builder().build());
        let snapshot = Arc::new(Snapshot::capture(runtime.registry()));
        let wrapper = ContextAwareFn::with_snapshot(snapshot, |x: i32| x + 1, runtime)
            .and_then(|x| x * 10);
        assert_eq!(wrapper.call(4).unwrap(), 50);
    }

    #[test]
    fn compose_prepends_a_transform() {
        let runtime = Arc::new(Runtime::builder().build());
        let snapshot = Arc::new(Snapshot::capture(runtime.registry()));
        let wrapper = ContextAwareFn::with_snapshot(snapshot, |x: i32| x + 1, runtime)
            .compose(|s: &str| s.len() as i32);
        assert_eq!(wrapper.call("hello").unwrap(), 6);
    }

    #[test]
    fn snapshot_consumer_runs_before_close() {
        let runtime = Arc::new(Runtime::builder().build());
        let snapshot = Arc::new(Snapshot::capture(runtime.registry()));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let wrapper = ContextAwareFn::with_snapshot(snapshot, |()| (), runtime)
            .with_snapshot_consumer(move |_fresh| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        wrapper.call(()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
