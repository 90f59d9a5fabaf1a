//! Priority-ordered registry of managers (spec §4.5 / C5).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::manager::ErasedContextManager;

/// A manager paired with the priority it was registered at. Lower numbers
/// snapshot/reactivate first, mirroring the convention used by this
/// codebase's other priority-ordered registries.
struct Entry {
    priority: i32,
    manager: Arc<dyn ErasedContextManager>,
}

/// Holds every registered manager, ordered by priority, for a
/// [`crate::runtime::Runtime`] to snapshot and reactivate as a unit.
///
/// Registration is expected at startup; lookups happen on every
/// snapshot/reactivation, so the read path takes a shared lock and the
/// write path (registration only) takes an exclusive one.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Vec<Entry>>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register `manager` at `priority`. Ties break in registration order
    /// (stable sort).
    pub fn register(&self, manager: Arc<dyn ErasedContextManager>, priority: i32) {
        let mut entries = self.entries.write();
        entries.push(Entry { priority, manager });
        entries.sort_by_key(|e| e.priority);
    }

    /// Register `manager` at the default priority (`0`).
    pub fn register_default(&self, manager: Arc<dyn ErasedContextManager>) {
        self.register(manager, 0);
    }

    /// All managers in priority order, lowest first.
    #[must_use]
    pub fn managers(&self) -> Vec<Arc<dyn ErasedContextManager>> {
        self.entries
            .read()
            .iter()
            .map(|e| Arc::clone(&e.manager))
            .collect()
    }

    /// The manager registered under `name`, if any.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<dyn ErasedContextManager>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.manager.name() == name)
            .map(|e| Arc::clone(&e.manager))
    }

    /// Number of registered managers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no managers are registered (spec's E5 scenario).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Invalidate any cached ordering and recompute it (spec §4.1 "an
    /// explicit reload invalidates the cache for tests").
    ///
    /// This registry has no separate cache generation to invalidate — the
    /// priority order is recomputed on every `register` call, so there is
    /// nothing stale to discard. Kept as an explicit operation so call
    /// sites written against the spec's contract (tests included) have
    /// something to call; it just re-sorts in place.
    pub fn reload(&self) {
        self.entries.write().sort_by_key(|e| e.priority);
    }
}
