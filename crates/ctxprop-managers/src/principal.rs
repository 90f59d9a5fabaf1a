//! Security-principal manager — stand-in for an authenticated-identity
//! holder (spec §4.11/C11).

use std::fmt;
use std::sync::Arc;

use ctxprop_core::{ContextHandle, ContextManager};

thread_local! {
    static STACK: ctxprop_core::Stack<Principal> = const { ctxprop_core::Stack::new() };
}

/// An opaque authenticated subject. Roles are carried as plain strings; this
/// manager does no authorization itself, only propagation.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    subject: Arc<str>,
    roles: Arc<[String]>,
}

impl Principal {
    /// A principal with no roles.
    #[must_use]
    pub fn anonymous(subject: impl Into<Arc<str>>) -> Self {
        Self {
            subject: subject.into(),
            roles: Arc::from(Vec::new()),
        }
    }

    /// A principal with the given roles.
    #[must_use]
    pub fn with_roles(subject: impl Into<Arc<str>>, roles: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: Arc::from(roles),
        }
    }

    /// The subject identifier (username, client id, service account, ...).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether this principal carries `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("subject", &self.subject)
            .field("roles", &self.roles)
            .finish()
    }
}

/// Activates/reads the thread's current [`Principal`].
#[derive(Default)]
pub struct PrincipalManager;

impl ContextManager for PrincipalManager {
    type Value = Principal;

    fn name(&self) -> &str {
        "principal"
    }

    fn active(&self) -> Option<Principal> {
        STACK.with(ctxprop_core::Stack::active)
    }

    fn activate(&self, value: Principal) -> ContextHandle<Principal> {
        let node = STACK.with(|s| s.push(value.clone()).0);
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
