// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation guard decision tests.
//!
//! Each test builds a guard over an in-memory store and an in-process
//! identity provider, so no emulator is needed.

use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;
use weight_tracker::config::Config;
use weight_tracker::db::InMemoryStore;
use weight_tracker::error::GuardError;
use weight_tracker::models::{Decision, GuardEvent, NavigationIntent, Principal, RouteName};
use weight_tracker::services::{
    IdentityError, IdentityProvider, LocalIdentityProvider, NavigationGuard, PrincipalListener,
    Subscription,
};

mod common;
use common::{capture_errors, entry, profile_with_goal};

fn guard(store: &Arc<InMemoryStore>) -> NavigationGuard {
    NavigationGuard::new(store.clone(), &Config::test_default())
}

fn signed_out() -> LocalIdentityProvider {
    LocalIdentityProvider::new(None)
}

fn signed_in(uid: &str) -> LocalIdentityProvider {
    LocalIdentityProvider::new(Some(Principal::new(uid)))
}

/// Store with a fully onboarded user `u1`.
fn onboarded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.put_profile("u1", profile_with_goal(Some(70.0)));
    store.push_entry("u1", entry(82.0));
    store
}

/// Identity provider that refuses every subscription.
struct RejectingProvider;

impl IdentityProvider for RejectingProvider {
    fn subscribe(&self, _listener: PrincipalListener) -> Result<Subscription, IdentityError> {
        Err(IdentityError("provider offline".to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// UNAUTHENTICATED
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_login_allowed_when_signed_out() {
    let store = Arc::new(InMemoryStore::new());
    let decision = guard(&store)
        .decide(&signed_out(), NavigationIntent::to(RouteName::Login))
        .await;
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn test_protected_routes_redirect_to_login_when_signed_out() {
    let store = Arc::new(InMemoryStore::new());
    let guard = guard(&store);

    for to in [RouteName::Dashboard, RouteName::Onboarding] {
        for from in [None, Some(RouteName::Login), Some(RouteName::Onboarding)] {
            let decision = guard
                .decide(&signed_out(), NavigationIntent::new(from, to))
                .await;
            assert_eq!(decision, Decision::RedirectTo(RouteName::Login), "{from:?} -> {to:?}");
        }
    }

    // Never query the store without a principal
    assert_eq!(store.profile_reads(), 0);
    assert_eq!(store.entry_queries(), 0);
}

#[tokio::test]
async fn test_rejected_identity_subscription_counts_as_signed_out() {
    let store = onboarded_store();
    let guard = guard(&store);
    let mut events = guard.subscribe_events();
    let (errors, _guard) = capture_errors();

    let decision = guard
        .decide(&RejectingProvider, NavigationIntent::to(RouteName::Dashboard))
        .await;

    assert_eq!(decision, Decision::RedirectTo(RouteName::Login));
    assert_eq!(errors.count(), 1);
    assert!(matches!(
        events.try_recv(),
        Ok(GuardEvent::Error(GuardError::IdentityResolution(_)))
    ));
    assert_eq!(store.profile_reads(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// AUTHENTICATED, NOT ONBOARDED
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_null_goal_weight_routes_toward_onboarding() {
    let store = Arc::new(InMemoryStore::new());
    store.put_profile("u1", profile_with_goal(None));
    store.push_entry("u1", entry(90.0));
    let guard = guard(&store);
    let identity = signed_in("u1");

    let to_dashboard = guard
        .decide(&identity, NavigationIntent::to(RouteName::Dashboard))
        .await;
    assert_eq!(to_dashboard, Decision::RedirectTo(RouteName::Onboarding));

    let to_onboarding = guard
        .decide(&identity, NavigationIntent::to(RouteName::Onboarding))
        .await;
    assert_eq!(to_onboarding, Decision::Allow);
}

#[tokio::test]
async fn test_missing_profile_routes_to_onboarding() {
    let store = Arc::new(InMemoryStore::new());
    let decision = guard(&store)
        .decide(&signed_in("new-user"), NavigationIntent::to(RouteName::Dashboard))
        .await;
    assert_eq!(decision, Decision::RedirectTo(RouteName::Onboarding));
}

#[tokio::test]
async fn test_goal_without_entries_routes_to_onboarding() {
    let store = Arc::new(InMemoryStore::new());
    store.put_profile("u1", profile_with_goal(Some(70.0)));

    let decision = guard(&store)
        .decide(&signed_in("u1"), NavigationIntent::to(RouteName::Dashboard))
        .await;

    assert_eq!(decision, Decision::RedirectTo(RouteName::Onboarding));
    assert_eq!(store.entry_queries(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// AUTHENTICATED, ONBOARDED
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_onboarded_user_reaches_dashboard() {
    let store = onboarded_store();
    let decision = guard(&store)
        .decide(&signed_in("u1"), NavigationIntent::to(RouteName::Dashboard))
        .await;
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn test_onboarded_user_is_sent_past_onboarding() {
    let store = onboarded_store();
    let decision = guard(&store)
        .decide(&signed_in("u1"), NavigationIntent::to(RouteName::Onboarding))
        .await;
    assert_eq!(decision, Decision::RedirectTo(RouteName::Dashboard));
}

#[tokio::test]
async fn test_leaving_onboarding_emits_one_cache_invalidation() {
    let store = onboarded_store();
    let guard = guard(&store);
    let mut events = guard.subscribe_events();

    let decision = guard
        .decide(
            &signed_in("u1"),
            NavigationIntent::new(Some(RouteName::Onboarding), RouteName::Dashboard),
        )
        .await;

    assert_eq!(decision, Decision::Allow);
    assert_eq!(
        events.try_recv(),
        Ok(GuardEvent::ProfileCacheInvalidated {
            uid: "u1".to_string()
        })
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_no_invalidation_when_onboarding_incomplete() {
    let store = Arc::new(InMemoryStore::new());
    store.put_profile("u1", profile_with_goal(Some(70.0)));
    let guard = guard(&store);
    let mut events = guard.subscribe_events();

    let decision = guard
        .decide(
            &signed_in("u1"),
            NavigationIntent::new(Some(RouteName::Onboarding), RouteName::Dashboard),
        )
        .await;

    assert_eq!(decision, Decision::RedirectTo(RouteName::Onboarding));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_repeated_decisions_are_identical() {
    let store = onboarded_store();
    let guard = guard(&store);
    let identity = signed_in("u1");

    for to in [RouteName::Login, RouteName::Onboarding, RouteName::Dashboard] {
        let first = guard.decide(&identity, NavigationIntent::to(to)).await;
        let second = guard.decide(&identity, NavigationIntent::to(to)).await;
        assert_eq!(first, second, "{to:?}");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE FAILURES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_profile_fetch_failure_routes_to_onboarding_and_logs_once() {
    let store = onboarded_store();
    store.set_fail_profile_reads(true);
    let guard = guard(&store);
    let mut events = guard.subscribe_events();
    let (errors, _guard) = capture_errors();

    let decision = guard
        .decide(&signed_in("u1"), NavigationIntent::to(RouteName::Dashboard))
        .await;

    assert_eq!(decision, Decision::RedirectTo(RouteName::Onboarding));
    assert_eq!(errors.count(), 1);
    assert!(matches!(
        events.try_recv(),
        Ok(GuardEvent::Error(GuardError::ProfileFetch(_)))
    ));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(store.entry_queries(), 0);
}

#[tokio::test]
async fn test_entry_query_failure_routes_to_onboarding() {
    let store = onboarded_store();
    store.set_fail_entry_queries(true);
    let guard = guard(&store);
    let mut events = guard.subscribe_events();
    let (errors, _guard) = capture_errors();

    let decision = guard
        .decide(&signed_in("u1"), NavigationIntent::to(RouteName::Dashboard))
        .await;

    assert_eq!(decision, Decision::RedirectTo(RouteName::Onboarding));
    assert_eq!(errors.count(), 1);
    assert!(matches!(
        events.try_recv(),
        Ok(GuardEvent::Error(GuardError::EntryQuery(_)))
    ));
}

#[tokio::test]
async fn test_store_failure_on_onboarding_target_allows_onboarding() {
    let store = onboarded_store();
    store.set_fail_profile_reads(true);

    let decision = guard(&store)
        .decide(&signed_in("u1"), NavigationIntent::to(RouteName::Onboarding))
        .await;

    assert_eq!(decision, Decision::Allow);
}
