//! Per-manager capture/reactivate latency diagnostics (spec §4.7 / C7).
//!
//! Wired into [`crate::snapshot::Snapshot::capture`] and
//! [`crate::snapshot::Snapshot::reactivate`]: every manager's capture or
//! reactivate call is timed individually and the measurement is handed to
//! every registered [`TimingListener`], plus emitted as a `tracing::trace!`
//! under the `context.timing` target (spec §6). Listener emission failures
//! (a panicking listener) are caught and logged, never allowed to break a
//! snapshot operation — timing is diagnostics, not a load-bearing path.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Which phase of the snapshot lifecycle a timing measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// [`crate::snapshot::Snapshot::capture`] reading one manager's active
    /// value.
    Capture,
    /// [`crate::snapshot::Snapshot::reactivate`] activating one manager's
    /// captured value.
    Reactivate,
}

impl Operation {
    /// The string used in the `context.timing` trace record (spec §6).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Reactivate => "reactivate",
        }
    }
}

/// Receives `(manager, op, duration)` tuples (spec §6 "Metrics surface").
///
/// Implementations must not assume anything about the calling thread and
/// should be cheap: this fires once per manager per capture/reactivate, on
/// the hot path.
pub trait TimingListener: Send + Sync + 'static {
    fn on_timing(&self, manager: &str, op: Operation, duration: Duration);
}

/// Holds the registered timing listeners and fans a measurement out to all
/// of them, plus a `context.timing` trace record. No heap allocation beyond
/// the listener list itself (spec §4.7 "no heap allocation on the hot path
/// beyond the measurement tuple").
#[derive(Default)]
pub struct TimingHook {
    listeners: Vec<Box<dyn TimingListener>>,
}

impl TimingHook {
    /// A hook with no listeners attached — still emits the `context.timing`
    /// trace record, just nothing else.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Attach a listener. Order of attachment is the order of notification.
    #[must_use]
    pub fn with_listener(mut self, listener: impl TimingListener) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Time `f`, then report `(manager, op, elapsed)` to every listener and
    /// to the `context.timing` trace target. Listener panics are caught and
    /// logged (spec §4.7 "Emission failures are swallowed").
    pub fn time<R>(&self, manager: &str, op: Operation, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.report(manager, op, start.elapsed());
        result
    }

    fn report(&self, manager: &str, op: Operation, duration: Duration) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "context.timing",
            manager,
            operation = op.as_str(),
            duration_nanos = duration.as_nanos() as u64,
            "context timing"
        );

        for listener in &self.listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.on_timing(manager, op, duration);
            }));
            if let Err(_panic) = outcome {
                #[cfg(feature = "tracing")]
                tracing::warn!(manager, operation = op.as_str(), "timing listener panicked");
            }
        }
    }
}
