//! Request-correlation-id manager — stand-in for servlet/HTTP request state
//! (spec §4.11/C11).

use std::fmt;

use ctxprop_core::{ContextHandle, ContextManager};
use uuid::Uuid;

thread_local! {
    static STACK: ctxprop_core::Stack<RequestId> = const { ctxprop_core::Stack::new() };
}

/// An opaque request-correlation identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random request id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing id, e.g. one parsed from an inbound header.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Activates/reads the thread's current [`RequestId`].
#[derive(Default)]
pub struct RequestIdManager;

impl ContextManager for RequestIdManager {
    type Value = RequestId;

    fn name(&self) -> &str {
        "request_id"
    }

    fn active(&self) -> Option<RequestId> {
        STACK.with(ctxprop_core::Stack::active)
    }

    fn activate(&self, value: RequestId) -> ContextHandle<RequestId> {
        let node = STACK.with(|s| s.push(value).0);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn nests_and_restores() {
        let mgr = RequestIdManager;
        let id1 = RequestId::generate();
        let id2 = RequestId::generate();

        let h1 = mgr.activate(id1);
        let h2 = mgr.activate(id2);
        assert_eq!(mgr.active(), Some(id2));
        h2.close().unwrap();
        assert_eq!(mgr.active(), Some(id1));
        h1.close().unwrap();
        assert_eq!(mgr.active(), None);
    }
}
