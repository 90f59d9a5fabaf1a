//! Capture-all / reactivate-all across every registered manager
//! (spec §4.6 / C6).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handle::ErasedHandle;
use crate::manager::{ErasedContextManager, ErasedValue};
use crate::registry::Registry;
use crate::runtime::Runtime;
use crate::timing::{Operation, TimingHook};

/// One manager's captured value at the moment the snapshot was taken, or
/// `None` if that manager had nothing active.
struct Captured {
    manager: Arc<dyn ErasedContextManager>,
    value: Option<ErasedValue>,
}

/// An immutable capture of every registered manager's active value on the
/// thread that took it.
///
/// A snapshot may be reactivated more than once, including concurrently on
/// different threads: [`ErasedValue::clone_boxed`] produces a fresh boxed
/// value per reactivation, so the captured state itself is never consumed
/// (spec §4.6).
pub struct Snapshot {
    entries: Vec<Captured>,
}

impl Snapshot {
    /// Capture the currently active value of every manager in `registry`.
    #[must_use]
    pub fn capture(registry: &Registry) -> Self {
        let entries = registry
            .managers()
            .into_iter()
            .map(|manager| {
                let value = manager.active_erased();
                Captured { manager, value }
            })
            .collect();
        Self { entries }
    }

    /// Like [`Self::capture`], additionally timing each manager's capture
    /// call and reporting it to `timing` (spec §4.7).
    #[must_use]
    pub fn capture_with_timing(registry: &Registry, timing: &TimingHook) -> Self {
        let entries = registry
            .managers()
            .into_iter()
            .map(|manager| {
                let name = manager.name().to_string();
                let value = timing.time(&name, Operation::Capture, || manager.active_erased());
                Captured { manager, value }
            })
            .collect();
        Self { entries }
    }

    /// An empty snapshot, as if captured from a registry with nothing
    /// active. Used by context-aware wrappers built with no ambient
    /// snapshot available (spec's E5 scenario).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of managers this snapshot has an entry for (active or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this snapshot has no manager entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reactivate every captured value (skipping managers that had nothing
    /// active) on the calling thread, notifying `runtime`'s observers as
    /// each manager activates and timing each activation if `runtime` has a
    /// [`TimingHook`] configured.
    ///
    /// If a manager's `activate_erased` fails partway through, every handle
    /// already created in this call is closed in reverse order before
    /// returning the error — the calling thread is left exactly as it was
    /// before this call (spec §4.6 "all or nothing").
    ///
    /// The returned [`ReactivationHandle`] remembers `runtime` so its own
    /// close path can notify `on_deactivate` symmetrically with the
    /// `on_activate` fired here (spec §4.4 step 5 / §4.5).
    pub fn reactivate(&self, runtime: &Arc<Runtime>) -> Result<ReactivationHandle> {
        let observers = runtime.observers();
        let mut entries: Vec<ReactivatedEntry> = Vec::with_capacity(self.entries.len());

        for captured in &self.entries {
            let Some(captured_value) = captured.value.as_ref() else {
                continue;
            };

            let previous = captured.manager.active_erased();
            let previous_debug = previous.as_ref().map(ErasedValue::debug_string);

            let activation = match runtime.timing() {
                Some(timing) => timing.time(captured.manager.name(), Operation::Reactivate, || {
                    captured.manager.activate_erased(captured_value.clone_boxed())
                }),
                None => captured.manager.activate_erased(captured_value.clone_boxed()),
            };

            match activation {
                Ok(handle) => {
                    observers.notify_activate(captured.manager.name(), previous_debug.as_deref());
                    entries.push(ReactivatedEntry {
                        handle,
                        manager: captured.manager.name().to_string(),
                        restores_to: previous_debug,
                    });
                }
                Err(source) => {
                    let failing_name = captured.manager.name().to_string();
                    for (result, manager, restores_to) in close_all_reverse_entries(entries) {
                        match result {
                            Ok(()) => observers.notify_deactivate(&manager, restores_to.as_deref()),
                            Err(close_err) => {
                                #[cfg(feature = "tracing")]
                                tracing::warn!(
                                    error = %close_err,
                                    "rollback close failed after reactivation error"
                                );
                                #[cfg(not(feature = "tracing"))]
                                let _ = close_err;
                            }
                        }
                    }
                    return Err(Error::Reactivation {
                        manager: failing_name,
                        source,
                    });
                }
            }
        }

        Ok(ReactivationHandle {
            entries,
            runtime: Arc::clone(runtime),
        })
    }
}

/// One manager reactivated by a [`Snapshot::reactivate`] call: the open
/// handle, the manager's name (for observer notification), and what closing
/// this handle restores the manager's active value to.
struct ReactivatedEntry {
    handle: Box<dyn ErasedHandle>,
    manager: String,
    restores_to: Option<String>,
}

/// Close every entry in reverse (LIFO) order, pairing each close result with
/// the manager name and restore value it came from so the caller can fire
/// `on_deactivate` correctly.
fn close_all_reverse_entries(
    entries: Vec<ReactivatedEntry>,
) -> Vec<(crate::handle::CloseResult, String, Option<String>)> {
    entries
        .into_iter()
        .rev()
        .map(|entry| (entry.handle.close_erased(), entry.manager, entry.restores_to))
        .collect()
}

/// Opens every captured manager value; closing this (explicitly or via
/// [`Drop`]) restores the thread to what it was before [`Snapshot::reactivate`],
/// firing `on_deactivate` for each manager it restores (spec §4.4 step 5).
pub struct ReactivationHandle {
    entries: Vec<ReactivatedEntry>,
    runtime: Arc<Runtime>,
}

impl ReactivationHandle {
    /// Close every reactivated manager, in reverse (LIFO) order. The first
    /// error encountered is returned; later errors are logged rather than
    /// dropped, matching the "close errors never abort a caller" convention
    /// (spec §7).
    pub fn close(mut self) -> Result<()> {
        self.close_in_place()
    }

    fn close_in_place(&mut self) -> Result<()> {
        let entries = std::mem::take(&mut self.entries);
        let observers = self.runtime.observers();
        let mut first_err = None;
        for (result, manager, restores_to) in close_all_reverse_entries(entries) {
            match result {
                Ok(()) => observers.notify_deactivate(&manager, restores_to.as_deref()),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    } else {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %err, "handle close failed during reactivation teardown");
                    }
                }
            }
        }
        match first_err {
            Some(source) => Err(Error::Activation {
                manager: "reactivation-teardown".to_string(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ReactivationHandle {
    fn drop(&mut self) {
        if let Err(err) = self.close_in_place() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "reactivation handle close failed on drop");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }
}
