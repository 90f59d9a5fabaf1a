//! Concrete [`ctxprop_core::ContextManager`] adapters over common ambient
//! state: a diagnostic map, a locale, a request-correlation id, a tracing
//! span, a security principal, and a whole-map external-store manager.
//!
//! Each module is a thin wrapper (§4.11/C11 "thin adapters") — the actual
//! nesting/restoration mechanism lives in `ctxprop-core`'s shared
//! thread-local stack. `log4j_snapshot` is the exception: it deliberately
//! keeps its own external store instead of reusing the shared stack, to
//! exercise the other branch of `clear_active_contexts`.

pub mod locale;
pub mod log4j_snapshot;
pub mod mdc;
pub mod principal;
pub mod request_id;

#[cfg(feature = "tracing")]
pub mod span;

pub use locale::{Locale, LocaleManager};
pub use log4j_snapshot::Log4jSnapshotManager;
pub use mdc::MdcManager;
pub use principal::{Principal, PrincipalManager};
pub use request_id::{RequestId, RequestIdManager};

#[cfg(feature = "tracing")]
pub use span::SpanManager;
