//! Whole-map external-store manager — a stand-in for "Log4j ThreadContext
//! snapshot" (spec §4.11/C11), the one manager in this crate that does
//! *not* reuse [`ctxprop_core::Stack`]. It owns its own external store (a
//! plain `Vec` behind a `thread_local!`, simulating Log4j's `ThreadContext`
//! map) and replaces the whole map on every activation rather than nesting
//! individual keys — exercising the "manager owns its own external store"
//! branch of `clear_active_contexts` (spec §4.6): clearing here resets the
//! external store directly, it does not walk a shared stack's node chain.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use ctxprop_core::ContextHandle;

type Map = Arc<BTreeMap<String, String>>;

thread_local! {
    // A plain LIFO of whole-map snapshots, standing in for the external
    // store's own undo history. Not `ctxprop_core::Stack`: this manager's
    // point is to demonstrate a manager that keeps its external state
    // entirely outside the shared nested-stack machinery.
    static STORE: RefCell<Vec<Map>> = const { RefCell::new(Vec::new()) };
}

/// Snapshots/restores an entire external key-value map in one shot.
#[derive(Default)]
pub struct Log4jSnapshotManager;

impl ctxprop_core::ContextManager for Log4jSnapshotManager {
    type Value = Map;

    fn name(&self) -> &str {
        "log4j_thread_context"
    }

    fn active(&self) -> Option<Map> {
        STORE.with(|s| s.borrow().last().cloned())
    }

    fn activate(&self, value: Map) -> ContextHandle<Map> {
        STORE.with(|s| s.borrow_mut().push(Arc::clone(&value)));
        ContextHandle::new(value, move |_| {
            STORE.with(|s| {
                s.borrow_mut().pop();
            });
            Ok(())
        })
    }

    /// Reset the external store directly instead of walking a node chain —
    /// this is the branch of `clear_active_contexts` that has no shared
    /// stack to unwind.
    fn clear(&self) {
        STORE.with(|s| s.borrow_mut().clear());
    }
}
