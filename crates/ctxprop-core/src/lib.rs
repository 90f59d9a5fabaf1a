//! Thread-scoped ambient context propagation.
//!
//! A [`Registry`] of [`ContextManager`] implementations, each keeping its
//! own per-thread nested stack of activations. A [`Snapshot`] captures the
//! active value of every registered manager at one instant on one thread;
//! [`Snapshot::reactivate`] re-establishes those values on (possibly) a
//! different thread, returning a [`ReactivationHandle`] that restores the
//! prior state on close. [`ContextAwareExecutor`] and [`ContextAwareFuture`]
//! interpose that capture/reactivate dance around task submission and
//! future continuations so ambient values survive the hand-off.
//!
//! Concrete managers (MDC, locale, request id, ...) live in
//! `ctxprop-managers`; this crate only defines the mechanism.

mod error;
mod handle;
mod manager;
mod observer;
mod registry;
mod snapshot;
mod stack;
mod timing;

#[cfg(feature = "tokio")]
mod executor;
#[cfg(feature = "tokio")]
mod future;
mod wrappers;

pub mod runtime;

pub use error::{Error, Result};
pub use handle::ContextHandle;
pub use manager::{ContextManager, ErasedContextManager, ErasedValue};
pub use observer::{Observer, ObserverBus};
pub use registry::Registry;
pub use runtime::{Runtime, RuntimeBuilder};
pub use snapshot::{ReactivationHandle, Snapshot};
pub use stack::{NodeId, Stack};
pub use timing::{Operation, TimingHook, TimingListener};
pub use wrappers::ContextAwareFn;

#[cfg(feature = "tokio")]
pub use executor::{ContextAwareExecutor, Execute, TokioBlockingExecutor};
#[cfg(feature = "tokio")]
pub use future::ContextAwareFuture;
