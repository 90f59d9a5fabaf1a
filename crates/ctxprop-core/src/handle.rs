//! The closable handle returned by a context activation (spec §4.3 / C3).

use std::marker::PhantomData;

use crate::error::Result;

/// Result of closing a single handle: `Ok` on a clean restore, `Err` if the
/// underlying manager's close path failed. Close errors are never fatal —
/// callers log and continue (spec §7).
pub type CloseResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// One activation of one value on one manager, on one thread.
///
/// Carries the activated value and an idempotent close. Rust's ownership
/// already prevents calling `close` twice on the same handle by value; the
/// `Option`-based internals additionally make the implicit [`Drop`] path and
/// an explicit [`ContextHandle::close`] call collapse to the same
/// one-time action, matching the "closing an already-closed handle is a
/// no-op" invariant even when both paths could in principle fire.
///
/// Deliberately `!Send`: the close callback closes over a manager's
/// `thread_local!` stack node, which is only ever valid on the thread that
/// pushed it. A handle that crossed threads would close the wrong thread's
/// stack entirely.
pub struct ContextHandle<T> {
    value: Option<T>,
    on_close: Option<Box<dyn FnOnce(T) -> CloseResult>>,
    _not_send: PhantomData<*const ()>,
}

impl<T> ContextHandle<T> {
    /// Build a handle wrapping `value`, to be restored via `on_close` when
    /// the handle is closed or dropped.
    pub fn new(value: T, on_close: impl FnOnce(T) -> CloseResult + 'static) -> Self {
        Self {
            value: Some(value),
            on_close: Some(Box::new(on_close)),
            _not_send: PhantomData,
        }
    }

    /// The value this handle activated.
    ///
    /// # Panics
    /// Panics if called after the handle has been closed — there is no
    /// legitimate reason to hold a reference past `close`, since `close`
    /// consumes `self`.
    #[must_use]
    pub fn value(&self) -> &T {
        self.value
            .as_ref()
            .expect("ContextHandle::value called after close")
    }

    /// Whether this handle has already been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.value.is_none()
    }

    /// Close the handle now, restoring the manager's prior active context on
    /// this thread. Equivalent to `drop(handle)` but lets the caller observe
    /// close errors instead of only logging them.
    pub fn close(mut self) -> CloseResult {
        self.close_in_place()
    }

    fn close_in_place(&mut self) -> CloseResult {
        match (self.value.take(), self.on_close.take()) {
            (Some(v), Some(f)) => f(v),
            _ => Ok(()),
        }
    }
}

impl<T> Drop for ContextHandle<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close_in_place() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "context handle close failed");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ContextHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextHandle")
            .field("value", &self.value)
            .field("closed", &self.on_close.is_none())
            .finish()
    }
}

/// Type-erased close action for a single reactivated manager, used by
/// [`crate::snapshot::ReactivationHandle`] to hold a heterogeneous list of
/// handles across differently-typed managers. Not `Send` for the same
/// reason [`ContextHandle`] isn't.
pub(crate) trait ErasedHandle {
    fn close_erased(self: Box<Self>) -> CloseResult;
}

impl<T> ErasedHandle for ContextHandle<T> {
    fn close_erased(self: Box<Self>) -> CloseResult {
        (*self).close()
    }
}

/// Wraps a construction-time error surfaced eagerly, never swallowed
/// (spec §7 "Configuration errors").
pub(crate) fn configuration_error<T>(message: impl Into<String>) -> Result<T> {
    Err(crate::error::Error::configuration(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn close_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let handle = ContextHandle::new(42, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(*handle.value(), 42);
        handle.close().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_closes_if_not_closed_explicitly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        {
            let _handle = ContextHandle::new("x", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn is_closed_reports_state() {
        let handle = ContextHandle::new(1, |_| Ok(()));
        assert!(!handle.is_closed());
    }
}
