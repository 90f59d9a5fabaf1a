//! Tracing span manager — makes `tracing`'s own per-thread span stack
//! observable through the uniform [`ContextManager`] interface, so a
//! snapshot/reactivation captures "what span was active" the same way it
//! captures an MDC map or a locale (spec §4.11/C11).
//!
//! `tracing::Span` already restores its own parent on `Entered` drop; this
//! manager layers the shared nested-stack bookkeeping (§4.4) on top purely
//! so deactivation composes with [`ctxprop_core::ObserverBus`] and the
//! executor/future wrappers like every other manager here.

use ctxprop_core::{ContextHandle, ContextManager};
use tracing::Span;
use tracing::span::EnteredSpan;

thread_local! {
    static STACK: ctxprop_core::Stack<Span> = const { ctxprop_core::Stack::new() };
}

/// Activates/reads the thread's current [`Span`].
#[derive(Default)]
pub struct SpanManager;

impl ContextManager for SpanManager {
    type Value = Span;

    fn name(&self) -> &str {
        "span"
    }

    fn active(&self) -> Option<Span> {
        STACK.with(ctxprop_core::Stack::active)
    }

    /// Enters `value` (so `tracing::Span::current()` reflects it) and pushes
    /// it onto the shared stack. Closing the handle exits the entered guard
    /// before popping, restoring both tracing's own notion of the current
    /// span and this manager's view of it.
    fn activate(&self, value: Span) -> ContextHandle<Span> {
        let entered: EnteredSpan = value.clone().entered();
        let node = STACK.with(|s| s.push(value.clone()).0);
        ContextHandle::new(value, move |_| {
            STACK.with(|s| {
                s.close(&node);
            });
            drop(entered);
            Ok(())
        })
    }

    fn clear(&self) {
        STACK.with(ctxprop_core::Stack::clear);
    }
}
