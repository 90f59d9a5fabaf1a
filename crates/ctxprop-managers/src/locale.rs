//! Locale manager — spec §4.11/C11, exercised literally by scenario E1.

use std::fmt;

use ctxprop_core::{ContextHandle, ContextManager};

thread_local! {
    static STACK: ctxprop_core::Stack<Locale> = const { ctxprop_core::Stack::new() };
}

/// A thin newtype over a locale tag (`"nl_NL"`, `"de_DE"`, ...). No
/// validation is performed — this is a stand-in for a real locale holder,
/// not a BCP-47/RFC 5646 parser.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Locale(String);

impl Locale {
    /// Wrap a locale tag verbatim.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The wrapped tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locale({})", self.0)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Activates/reads the thread's current [`Locale`] through the shared
/// nested-stack machine (spec §4.4).
#[derive(Default)]
pub struct LocaleManager;

impl ContextManager for LocaleManager {
    type Value = Locale;

    fn name(&self) -> &str {
        "locale"
    }

    fn active(&self) -> Option<Locale> {
        STACK.with(ctxprop_core::Stack::active)
    }

    fn activate(&self, value: Locale) -> ContextHandle<Locale> {
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
