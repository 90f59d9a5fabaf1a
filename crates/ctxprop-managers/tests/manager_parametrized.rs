//! Parametrized activate/nest/restore coverage across every manager that
//! reuses the shared thread-local stack (spec §8 testable properties 1-4),
//! run once per manager via `rstest` cases instead of one hand-rolled test
//! per type.

use rstest::rstest;

use ctxprop_core::ContextManager;
use ctxprop_managers::{Locale, LocaleManager, Principal, PrincipalManager, RequestId, RequestIdManager};

#[rstest]
#[case::locale(LocaleManager, Locale::new("nl_NL"), Locale::new("de_DE"))]
fn locale_nests_and_restores(
    #[case] manager: LocaleManager,
    #[case] outer_value: Locale,
    #[case] inner_value: Locale,
) {
    assert!(manager.active().is_none());
    let outer = manager.activate(outer_value.clone());
    assert_eq!(manager.active(), Some(outer_value.clone()));

    let inner = manager.activate(inner_value.clone());
    assert_eq!(manager.active(), Some(inner_value));

    inner.close().unwrap();
    assert_eq!(manager.active(), Some(outer_value));

    outer.close().unwrap();
    assert!(manager.active().is_none());
    manager.clear();
}

#[rstest]
#[case::anonymous_then_named(Principal::anonymous("guest"), Principal::with_roles("vincent", vec!["admin".into()]))]
#[case::two_named(Principal::anonymous("system"), Principal::with_roles("mia", vec!["read-only".into(), "audit".into()]))]
fn principal_nests_and_restores(#[case] outer_value: Principal, #[case] inner_value: Principal) {
    let manager = PrincipalManager;
    assert!(manager.active().is_none());

    let outer = manager.activate(outer_value.clone());
    let inner = manager.activate(inner_value.clone());
    assert_eq!(manager.active().as_ref().map(Principal::subject), Some(inner_value.subject()));

    inner.close().unwrap();
    assert_eq!(manager.active().as_ref().map(Principal::subject), Some(outer_value.subject()));

    outer.close().unwrap();
    assert!(manager.active().is_none());
    manager.clear();
}

#[rstest]
#[case::three_deep(3)]
#[case::single(1)]
#[case::five_deep(5)]
fn request_id_nesting_depth_restores_exactly(#[case] depth: usize) {
    let manager = RequestIdManager;
    assert!(manager.active().is_none());

    let ids: Vec<RequestId> = (0..depth).map(|_| RequestId::generate()).collect();
    let handles: Vec<_> = ids.iter().copied().map(|id| manager.activate(id)).collect();

    assert_eq!(manager.active(), ids.last().copied());

    for (handle, expected_after_close) in handles.into_iter().rev().zip(
        ids.iter()
            .rev()
            .skip(1)
            .map(Some)
            .chain(std::iter::once(None)),
    ) {
        handle.close().unwrap();
        assert_eq!(manager.active().as_ref(), expected_after_close);
    }

    assert!(manager.active().is_none());
}
