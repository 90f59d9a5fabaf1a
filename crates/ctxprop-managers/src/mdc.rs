//! Mapped diagnostic context manager — a thin adapter over a key/value
//! diagnostic map (spec §4.11/C11), the kind of thing a logging framework's
//! MDC carries alongside each record.

use std::collections::BTreeMap;
use std::sync::Arc;

use ctxprop_core::{ContextHandle, ContextManager};

thread_local! {
    static STACK: ctxprop_core::Stack<Arc<BTreeMap<String, String>>> =
        const { ctxprop_core::Stack::new() };
}

/// Activates/reads the thread's current diagnostic map. Each activation
/// nests a whole replacement map over whatever was active — unlike a real
/// MDC (which usually mutates individual keys in place), this manager only
/// models the "what map was active when" question the propagation layer
/// cares about; per-key mutation is the caller's concern before it calls
/// [`MdcManager::activate`].
#[derive(Default)]
pub struct MdcManager;

impl ContextManager for MdcManager {
    type Value = Arc<BTreeMap<String, String>>;

    fn name(&self) -> &str {
        "mdc"
    }

    fn active(&self) -> Option<Self::Value> {
        STACK.with(ctxprop_core::Stack::active)
    }

    fn activate(&self, value: Self::Value) -> ContextHandle<Self::Value> {
        let node = STACK.with(|s| s.push(Arc::clone(&value)).0);
        ContextHandle::new(value, move |_| {
            STACK.with(|s| {
                s.close(&node);
            });
            Ok(())
        })
    }

    fn clear(&self) {
        STACK.with(ctxprop_core::Stack::clear);
    }
}

impl MdcManager {
    /// Convenience: activate a single `key = value` entry, merged over
    /// whatever map is currently active (or starting a fresh one if none
    /// is).
    #[must_use]
    pub fn activate_entry(&self, key: impl Into<String>, value: impl Into<String>) -> ContextHandle<Arc<BTreeMap<String, String>>> {
        let mut map = self
            .active()
            .map_or_else(BTreeMap::new, |m| (*m).clone());
        map.insert(key.into(), value.into());
        self.activate(Arc::new(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_entry_merges_over_parent() {
        let mgr = MdcManager;
        let outer = mgr.activate_entry("request_id", "abc-123");
        let inner = mgr.activate_entry("user", "vincent");

        let active = mgr.active().unwrap();
        assert_eq!(active.get("request_id").map(String::as_str), Some("abc-123"));
        assert_eq!(active.get("user").map(String::as_str), Some("vincent"));

        inner.close().unwrap();
        let active = mgr.active().unwrap();
        assert_eq!(active.get("user"), None);
        assert_eq!(active.get("request_id").map(String::as_str), Some("abc-123"));

        outer.close().unwrap();
        assert!(mgr.active().is_none());
    }

    #[test]
    fn clear_forces_empty() {
        let mgr = MdcManager;
        let _h = mgr.activate_entry("k", "v");
        mgr.clear();
        assert!(mgr.active().is_none());
    }
}
