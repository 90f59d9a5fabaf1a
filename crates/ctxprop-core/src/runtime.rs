//! The explicit `Runtime` value object (spec §9 "Global state").
//!
//! The source library keys its manager registry and observer bus off class
//! identity as process-wide singletons. Here that becomes an explicit,
//! constructible value: a [`Runtime`] owns a [`Registry`], an
//! [`ObserverBus`], and an optional [`TimingHook`], and is passed to (or
//! defaulted by) every snapshot/executor/wrapper entry point. A
//! [`OnceLock`]-backed process default keeps call sites ergonomic without
//! hiding the dependency from anything that wants its own instance — tests
//! in particular should build a fresh [`Runtime`] rather than share the
//! default.

use std::sync::{Arc, OnceLock};

use crate::observer::{Observer, ObserverBus};
use crate::registry::Registry;
use crate::snapshot::Snapshot;
use crate::timing::TimingHook;

/// Everything a snapshot/executor/wrapper needs: the manager registry, the
/// observer bus, and an optional timing hook.
pub struct Runtime {
    registry: Registry,
    observers: ObserverBus,
    timing: Option<TimingHook>,
}

impl Runtime {
    /// Start building a runtime with no managers, no observers, and no
    /// timing hook.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// A fresh, independent runtime with no managers registered — the
    /// per-test override §9 calls for ("avoid hidden singletons in test
    /// harnesses"). Equivalent to `Runtime::builder().build()`, named for
    /// the call site's intent.
    #[must_use]
    pub fn new_for_test() -> Self {
        Self::builder().build()
    }

    /// The registry of managers this runtime snapshots/reactivates over.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The observer bus notified on every activation/deactivation.
    #[must_use]
    pub fn observers(&self) -> &ObserverBus {
        &self.observers
    }

    /// The timing hook, if one was configured.
    #[must_use]
    pub fn timing(&self) -> Option<&TimingHook> {
        self.timing.as_ref()
    }

    /// `ContextManagers.createContextSnapshot()` (spec §6): capture the
    /// active value of every registered manager, timing each capture if a
    /// [`TimingHook`] is configured.
    #[must_use]
    pub fn create_context_snapshot(&self) -> Snapshot {
        match &self.timing {
            Some(timing) => Snapshot::capture_with_timing(&self.registry, timing),
            None => Snapshot::capture(&self.registry),
        }
    }

    /// `ContextManagers.clearActiveContexts()` (spec §6/§4.6): force-close
    /// every manager's active context on the calling thread, regardless of
    /// nesting order, firing `on_deactivate` for whatever was actually
    /// cleared (SPEC_FULL.md §5 open-question #3).
    pub fn clear_active_contexts(&self) {
        for manager in self.registry.managers() {
            let was_active = manager.active_erased().is_some();
            manager.clear();
            if was_active {
                self.observers.notify_deactivate(manager.name(), None);
            }
        }
    }

    /// The process-wide default runtime, built on first access with no
    /// managers registered. Callers that need managers (the usual case)
    /// should build their own `Runtime` via [`Runtime::builder`] instead of
    /// relying on this — it exists for simple embeddings and doctest-style
    /// examples, not as the primary entry point.
    #[must_use]
    pub fn default_instance() -> &'static Runtime {
        static DEFAULT: OnceLock<Runtime> = OnceLock::new();
        DEFAULT.get_or_init(|| RuntimeBuilder::default().build())
    }
}

/// Builder for [`Runtime`]. Mirrors the registration-at-startup shape used
/// by this codebase's other builders: call `manager`/`observer`/`timing`
/// repeatedly, then `build`.
#[derive(Default)]
pub struct RuntimeBuilder {
    registry: Registry,
    observers: ObserverBus,
    timing: Option<TimingHook>,
}

impl RuntimeBuilder {
    /// Register a manager at the default priority (`0`).
    #[must_use]
    pub fn manager(self, manager: Arc<dyn crate::manager::ErasedContextManager>) -> Self {
        self.registry.register_default(manager);
        self
    }

    /// Register a manager at an explicit priority (lower activates first).
    #[must_use]
    pub fn manager_with_priority(
        self,
        manager: Arc<dyn crate::manager::ErasedContextManager>,
        priority: i32,
    ) -> Self {
        self.registry.register(manager, priority);
        self
    }

    /// Register an observer.
    #[must_use]
    pub fn observer(self, observer: Arc<dyn Observer>) -> Self {
        self.observers.register(observer);
        self
    }

    /// Enable slow-activation diagnostics.
    #[must_use]
    pub fn timing(mut self, hook: TimingHook) -> Self {
        self.timing = Some(hook);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Runtime {
        Runtime {
            registry: self.registry,
            observers: self.observers,
            timing: self.timing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_empty_runtime_by_default() {
        let runtime = Runtime::builder().build();
        assert!(runtime.registry().is_empty());
        assert!(runtime.observers().is_empty());
        assert!(runtime.timing().is_none());
    }

    #[test]
    fn default_instance_is_process_wide() {
        let a = Runtime::default_instance() as *const Runtime;
        let b = Runtime::default_instance() as *const Runtime;
        assert_eq!(a, b);
    }

    #[test]
    fn builder_with_timing_hook() {
        let runtime = Runtime::builder().timing(TimingHook::new()).build();
        assert!(runtime.timing().is_some());
    }

    #[test]
    fn new_for_test_is_independent_of_default_instance() {
        let a = Runtime::new_for_test();
        let b = Runtime::new_for_test();
        assert!(a.registry().is_empty());
        assert!(b.registry().is_empty());
        assert!(std::ptr::eq(Runtime::default_instance(), Runtime::default_instance()));
    }

    #[test]
    fn clear_active_contexts_is_a_no_op_with_no_managers() {
        let runtime = Runtime::new_for_test();
        runtime.clear_active_contexts();
    }

    #[test]
    fn create_context_snapshot_is_empty_with_no_managers() {
        let runtime = Runtime::new_for_test();
        let snapshot = runtime.create_context_snapshot();
        assert!(snapshot.is_empty());
    }
}
