//! Observers notified of activation/deactivation across all managers
//! (spec §4.7 / C7).

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

/// Receives lifecycle notifications for every manager registered with a
/// [`crate::registry::Registry`].
///
/// Observer errors are caught and logged by the [`ObserverBus`], never
/// propagated — a broken observer must not break context propagation for
/// the rest of the application (spec §4.7 "Isolation").
pub trait Observer: Send + Sync + 'static {
    /// A value became active for `manager`, nesting over `previous` (`None`
    /// at the bottom of the stack).
    fn on_activate(&self, manager: &str, previous: Option<&str>) {
        let _ = (manager, previous);
    }

    /// A value stopped being active for `manager`; `current` is whatever is
    /// now active (`None` if the stack is now empty). Only fires for closes
    /// that actually changed the head (spec §4.4 step 5).
    fn on_deactivate(&self, manager: &str, current: Option<&str>) {
        let _ = (manager, current);
    }
}

/// Ordered collection of observers, fanned out to on every manager event.
///
/// Mirrors the "run all, log failures, never abort the caller" shape used
/// throughout this codebase's hook/event infrastructure: a panicking or
/// erroring observer is isolated to itself.
#[derive(Default)]
pub struct ObserverBus {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl ObserverBus {
    /// An empty bus with no observers registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer. Order of registration is the order of
    /// notification.
    pub fn register(&self, observer: Arc<dyn Observer>) {
        self.observers.write().push(observer);
    }

    /// Number of registered observers, mostly useful for tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether any observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Fan out to every observer. An observer that panics is caught, logged
    /// at warning, and the remaining observers still run (spec §4.7/E6:
    /// "the thrown error is logged, and a second well-behaved observer
    /// still receives the event").
    pub(crate) fn notify_activate(&self, manager: &str, previous: Option<&str>) {
        for observer in self.observers.read().iter() {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| observer.on_activate(manager, previous)));
            if outcome.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(manager, "observer panicked handling on_activate");
            }
        }
    }

    pub(crate) fn notify_deactivate(&self, manager: &str, current: Option<&str>) {
        for observer in self.observers.read().iter() {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| observer.on_deactivate(manager, current)));
            if outcome.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(manager, "observer panicked handling on_deactivate");
            }
        }
    }
}

impl fmt::Debug for ObserverBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverBus")
            .field("count", &self.len())
            .finish()
    }
}
