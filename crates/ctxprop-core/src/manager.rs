//! The `ContextManager` trait (spec §4.2 / C2) and its type-erased form.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use crate::handle::{ContextHandle, ErasedHandle};

/// A single kind of ambient, thread-scoped value (MDC map, locale, request
/// id, ...) together with the machinery to activate, snapshot, and restore
/// it.
///
/// A manager owns no state itself — concrete managers keep their per-thread
/// stack behind a `thread_local!` (see `ctxprop-managers`) — this trait only
/// describes the operations a [`crate::registry::Registry`] drives.
pub trait ContextManager: Send + Sync + 'static {
    /// The value this manager activates and captures. Must be cheap to
    /// clone: a snapshot clones the active value out of the stack, and the
    /// stack itself clones it again on every nested push (spec §4.4). `Debug`
    /// is required so observers can render a value without the registry
    /// needing to know its concrete type.
    type Value: Clone + std::fmt::Debug + Send + Sync + 'static;

    /// Stable, human-readable identity used in error messages and observer
    /// events. Does not need to be unique process-wide, only meaningful.
    fn name(&self) -> &str;

    /// The value currently active on this thread for this manager, if any.
    fn active(&self) -> Option<Self::Value>;

    /// Activate `value` on this thread, nesting over whatever was already
    /// active. Returns a handle that restores the previous value when
    /// closed (or dropped).
    fn activate(&self, value: Self::Value) -> ContextHandle<Self::Value>;

    /// Forcibly close every activation on this thread for this manager,
    /// regardless of nesting order. Used by `clear_active_contexts` (spec
    /// §4.9) to recover from a caller that forgot to close handles.
    fn clear(&self);
}

/// Type-erased close error surfaced up through [`ErasedContextManager`].
pub type ErasedActivateResult = Result<Box<dyn ErasedHandle>, Box<dyn StdError + Send + Sync>>;

/// A boxed manager value plus the one piece of type information erasure
/// loses: how to clone it. Lets a [`crate::snapshot::Snapshot`] be
/// reactivated more than once without the registry ever naming the
/// manager's concrete `Value` type.
pub struct ErasedValue {
    value: Box<dyn Any + Send + Sync>,
    clone_fn: fn(&(dyn Any + Send + Sync)) -> Box<dyn Any + Send + Sync>,
    debug_fn: fn(&(dyn Any + Send + Sync)) -> String,
}

impl ErasedValue {
    fn new<T: Clone + fmt::Debug + Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            clone_fn: |v| {
                let t = v
                    .downcast_ref::<T>()
                    .expect("ErasedValue always wraps the type its clone_fn was built for");
                Box::new(t.clone())
            },
            debug_fn: |v| {
                let t = v
                    .downcast_ref::<T>()
                    .expect("ErasedValue always wraps the type its debug_fn was built for");
                format!("{t:?}")
            },
        }
    }

    /// A fresh boxed clone of the wrapped value, suitable for handing to
    /// [`ErasedContextManager::activate_erased`].
    #[must_use]
    pub fn clone_boxed(&self) -> Box<dyn Any + Send + Sync> {
        (self.clone_fn)(self.value.as_ref())
    }

    /// `{:?}`-formatted rendering of the wrapped value.
    #[must_use]
    pub fn debug_string(&self) -> String {
        (self.debug_fn)(self.value.as_ref())
    }

    /// Consume into the boxed value, for the one-shot (non-repeatable)
    /// activation path.
    #[must_use]
    pub fn into_boxed(self) -> Box<dyn Any + Send + Sync> {
        self.value
    }
}

/// Object-safe counterpart of [`ContextManager`], used by the registry to
/// hold managers of differing `Value` types behind one `Vec<Arc<dyn
/// ErasedContextManager>>` (spec §4.5's "uniform registry over heterogeneous
/// managers").
///
/// Blanket-implemented for every [`ContextManager`]; consumers never
/// implement this directly.
pub trait ErasedContextManager: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Active value boxed and clonable, or `None`.
    fn active_erased(&self) -> Option<ErasedValue>;

    /// Activate a boxed value. `value` must downcast to the concrete
    /// manager's `Value` type; a mismatch is a caller bug (wrong manager
    /// paired with wrong captured value) and is reported as an
    /// [`ErasedActivateResult::Err`] rather than panicking.
    fn activate_erased(&self, value: Box<dyn Any + Send + Sync>) -> ErasedActivateResult;

    fn clear(&self);
}

#[derive(Debug)]
struct TypeMismatch {
    manager: String,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "captured value type does not match manager '{}'",
            self.manager
        )
    }
}

impl StdError for TypeMismatch {}

impl<M: ContextManager> ErasedContextManager for M {
    fn name(&self) -> &str {
        ContextManager::name(self)
    }

    fn active_erased(&self) -> Option<ErasedValue> {
        self.active().map(ErasedValue::new)
    }

    fn activate_erased(&self, value: Box<dyn Any + Send + Sync>) -> ErasedActivateResult {
        let value = value.downcast::<M::Value>().map_err(|_| {
            Box::new(TypeMismatch {
                manager: ContextManager::name(self).to_string(),
            }) as Box<dyn StdError + Send + Sync>
        })?;
        let handle = self.activate(*value);
        Ok(Box::new(handle) as Box<dyn ErasedHandle>)
    }

    fn clear(&self) {
        ContextManager::clear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Stack;

    thread_local! {
        static COUNTING_STACK: Stack<i32> = const { Stack::new() };
    }

    // Zero-sized: per-thread state lives in `COUNTING_STACK`, not on the
    // struct, which is how real managers stay `Send + Sync` while the stack
    // itself (built from `Rc`) stays thread-confined. See `ctxprop-managers`
    // for the pattern this mirrors.
    struct CountingManager;

    impl ContextManager for CountingManager {
        type Value = i32;

        fn name(&self) -> &str {
            "counting"
        }

        fn active(&self) -> Option<i32> {
            COUNTING_STACK.with(Stack::active)
        }

        fn activate(&self, value: i32) -> ContextHandle<i32> {
            let node = COUNTING_STACK.with(|s| s.push(value).0);
            ContextHandle::new(value, move |_| {
                COUNTING_STACK.with(|s| s.close(&node));
                Ok(())
            })
        }

        fn clear(&self) {
            COUNTING_STACK.with(Stack::clear);
        }
    }

    #[test]
    fn erased_roundtrip() {
        let mgr = CountingManager;
        let erased: &dyn ErasedContextManager = &mgr;
        assert_eq!(erased.name(), "counting");
        assert!(erased.active_erased().is_none());

        let handle = erased
            .activate_erased(Box::new(7_i32))
            .expect("activation succeeds");
        assert_eq!(mgr.active(), Some(7));
        handle.close_erased().unwrap();
        assert_eq!(mgr.active(), None);
        COUNTING_STACK.with(Stack::clear);
    }

    #[test]
    fn erased_type_mismatch_is_reported() {
        let mgr = CountingManager;
        let erased: &dyn ErasedContextManager = &mgr;
        let result = erased.activate_erased(Box::new("not an i32"));
        assert!(result.is_err());
        COUNTING_STACK.with(Stack::clear);
    }
}
