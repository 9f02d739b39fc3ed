// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation guard: decides whether a route transition may proceed.
//!
//! Per decision the flow is
//! `resolve principal -> (login | profile check) -> allow | redirect`.
//! Principal resolution always completes before any store call is issued.
//! Every failure is recovered inside the decision: identity failures mean
//! "unauthenticated", store failures mean "not onboarded".

use crate::config::Config;
use crate::db::ProfileStore;
use crate::error::{AppError, GuardError};
use crate::models::{Decision, GuardEvent, NavigationIntent, OnboardingPolicy, RouteName};
use crate::services::identity::{resolve_principal, IdentityProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Decision plus whether it carried the post-onboarding refresh signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub refresh_profile: bool,
}

/// Stateless across calls; safe to share and call concurrently.
pub struct NavigationGuard {
    store: Arc<dyn ProfileStore>,
    policy: OnboardingPolicy,
    identity_timeout: Duration,
    store_timeout: Duration,
    events: broadcast::Sender<GuardEvent>,
}

impl NavigationGuard {
    pub fn new(store: Arc<dyn ProfileStore>, config: &Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            policy: config.onboarding_policy,
            identity_timeout: config.identity_timeout,
            store_timeout: config.store_timeout,
            events,
        }
    }

    pub fn policy(&self) -> OnboardingPolicy {
        self.policy
    }

    /// Receive cache-invalidation and error events from future decisions.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GuardEvent> {
        self.events.subscribe()
    }

    /// Decide a single navigation.
    pub async fn decide(
        &self,
        identity: &dyn IdentityProvider,
        intent: NavigationIntent,
    ) -> Decision {
        self.evaluate(identity, intent).await.decision
    }

    /// Like [`decide`](Self::decide), also reporting whether the caller
    /// should refresh derived profile state.
    pub async fn evaluate(
        &self,
        identity: &dyn IdentityProvider,
        intent: NavigationIntent,
    ) -> Verdict {
        let (decision, uid) = self.decide_inner(identity, intent).await;

        let refresh_profile = decision == Decision::Allow
            && intent.from == Some(RouteName::Onboarding)
            && intent.to == RouteName::Dashboard;

        if let (true, Some(uid)) = (refresh_profile, uid) {
            let _ = self
                .events
                .send(GuardEvent::ProfileCacheInvalidated { uid });
        }

        tracing::debug!(
            from = ?intent.from,
            to = ?intent.to,
            ?decision,
            refresh_profile,
            "Navigation decided"
        );

        Verdict {
            decision,
            refresh_profile,
        }
    }

    /// Returns the decision and the uid it was made for, if signed in.
    async fn decide_inner(
        &self,
        identity: &dyn IdentityProvider,
        intent: NavigationIntent,
    ) -> (Decision, Option<String>) {
        let route = intent.to.route();

        // Login is the only public route that still needs the principal
        // (signed-in users are sent away from it).
        if !route.requires_auth && intent.to != RouteName::Login {
            return (Decision::Allow, None);
        }

        let principal = match resolve_principal(identity, self.identity_timeout).await {
            Ok(principal) => principal,
            Err(err) => {
                self.report(err, None);
                None
            }
        };

        let Some(principal) = principal else {
            return if route.requires_auth {
                (Decision::RedirectTo(RouteName::Login), None)
            } else {
                (Decision::Allow, None)
            };
        };

        if intent.to == RouteName::Login {
            return (Decision::RedirectTo(RouteName::Dashboard), Some(principal.uid));
        }

        if !route.requires_profile {
            return (Decision::Allow, Some(principal.uid));
        }

        let onboarded = self.is_onboarded(&principal.uid).await;
        let decision = match (intent.to, onboarded) {
            (RouteName::Dashboard, false) => Decision::RedirectTo(RouteName::Onboarding),
            (RouteName::Onboarding, true) => Decision::RedirectTo(RouteName::Dashboard),
            _ => Decision::Allow,
        };
        (decision, Some(principal.uid))
    }

    /// Evaluate the onboarding predicate; any store failure counts as false.
    pub async fn is_onboarded(&self, uid: &str) -> bool {
        let profile = match self
            .bounded(self.store.get_profile(uid), GuardError::ProfileFetch)
            .await
        {
            Ok(profile) => profile,
            Err(err) => {
                self.report(err, Some(uid));
                return false;
            }
        };

        let has_goal = profile.as_ref().is_some_and(|p| p.goal_weight.is_some());
        if !has_goal || !self.policy.needs_entry_query() {
            return self.policy.is_onboarded(profile.as_ref(), false);
        }

        match self
            .bounded(self.store.has_weight_entry(uid), GuardError::EntryQuery)
            .await
        {
            Ok(has_entry) => self.policy.is_onboarded(profile.as_ref(), has_entry),
            Err(err) => {
                self.report(err, Some(uid));
                false
            }
        }
    }

    /// Run a store call under the store timeout, mapping both failure kinds.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AppError>>,
        kind: fn(String) -> GuardError,
    ) -> Result<T, GuardError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(kind(err.to_string())),
            Err(_) => Err(kind(format!(
                "timed out after {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }

    fn report(&self, err: GuardError, uid: Option<&str>) {
        tracing::error!(
            error = %err,
            uid = uid.unwrap_or("<none>"),
            "Navigation guard recovered from failure"
        );
        let _ = self.events.send(GuardEvent::Error(err));
    }
}

/// Feed guard events to `handle` until every sender is gone.
///
/// A receiver that falls behind skips the overwritten events and keeps
/// going; only a closed channel ends the loop. Returns how many events
/// were handled.
pub async fn forward_events(
    mut events: broadcast::Receiver<GuardEvent>,
    mut handle: impl FnMut(GuardEvent),
) -> usize {
    let mut handled = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                handle(event);
                handled += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Guard event receiver lagged, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    handled
}
