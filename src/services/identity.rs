// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider capability and single-shot principal resolution.
//!
//! Providers follow a subscribe/unsubscribe model: a listener fires once
//! with the current state right after subscribing, then on every change
//! until the returned [`Subscription`] is released. The guard only ever
//! needs one answer, so [`resolve_principal`] takes the first
//! notification and releases the subscription on every exit path.

use crate::error::GuardError;
use crate::middleware::auth::decode_session_token;
use crate::models::Principal;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;

/// Callback invoked with the current principal (None when signed out).
pub type PrincipalListener = Box<dyn FnMut(Option<Principal>) + Send + Sync>;

/// Provider refused the subscription.
#[derive(Debug, thiserror::Error)]
#[error("identity subscription rejected: {0}")]
pub struct IdentityError(pub String);

/// Source of the current signed-in principal.
pub trait IdentityProvider: Send + Sync {
    fn subscribe(&self, listener: PrincipalListener) -> Result<Subscription, IdentityError>;
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release (one-shot providers).
    pub fn detached() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Wait for exactly one notification from `provider`, bounded by `timeout`.
///
/// The subscription is released before returning, and also if the
/// returned future is dropped mid-wait.
pub async fn resolve_principal(
    provider: &dyn IdentityProvider,
    timeout: Duration,
) -> Result<Option<Principal>, GuardError> {
    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);

    let subscription = provider
        .subscribe(Box::new(move |principal| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(principal);
            }
        }))
        .map_err(|e| GuardError::IdentityResolution(e.to_string()))?;

    let first = tokio::time::timeout(timeout, rx).await;
    subscription.unsubscribe();

    match first {
        Ok(Ok(principal)) => Ok(principal),
        Ok(Err(_)) => Err(GuardError::IdentityResolution(
            "provider dropped listener before notifying".to_string(),
        )),
        Err(_) => Err(GuardError::IdentityResolution(format!(
            "no notification within {}ms",
            timeout.as_millis()
        ))),
    }
}

// ─── In-process provider ─────────────────────────────────────

/// Principal plus a counter bumped on every change.
#[derive(Default)]
struct VersionedPrincipal {
    version: u64,
    principal: Option<Principal>,
}

struct ListenerState {
    /// Highest state version this listener has been handed.
    delivered: Option<u64>,
    listener: PrincipalListener,
}

struct ListenerSlot {
    active: AtomicBool,
    state: Mutex<ListenerState>,
}

impl ListenerSlot {
    /// Hand `principal` to the listener unless it already saw this version
    /// or a newer one. Out-of-order deliveries from racing writers collapse
    /// to the newest state.
    fn deliver(&self, version: u64, principal: &Option<Principal>) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.active.load(Ordering::Acquire)
            || state.delivered.is_some_and(|seen| seen >= version)
        {
            return;
        }
        (state.listener)(principal.clone());
        state.delivered = Some(version);
    }
}

/// Identity state held in process, with change notification.
///
/// Used by long-lived hosts (and tests) where sign-in state changes over
/// time rather than arriving with each request.
///
/// Listeners run with no provider lock held, so they may subscribe or drop
/// subscriptions. A listener must not call [`set_principal`] on the
/// provider that is notifying it.
///
/// [`set_principal`]: LocalIdentityProvider::set_principal
#[derive(Default)]
pub struct LocalIdentityProvider {
    current: RwLock<VersionedPrincipal>,
    listeners: Arc<DashMap<u64, Arc<ListenerSlot>>>,
    next_id: AtomicU64,
}

impl LocalIdentityProvider {
    pub fn new(initial: Option<Principal>) -> Self {
        Self {
            current: RwLock::new(VersionedPrincipal {
                version: 0,
                principal: initial,
            }),
            ..Default::default()
        }
    }

    fn snapshot(&self) -> (u64, Option<Principal>) {
        let current = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (current.version, current.principal.clone())
    }

    pub fn current(&self) -> Option<Principal> {
        self.snapshot().1
    }

    /// Replace the signed-in principal and notify every listener.
    pub fn set_principal(&self, principal: Option<Principal>) {
        let version = {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            current.version += 1;
            current.principal = principal.clone();
            current.version
        };

        // Collect first so no map shard is locked while listeners run.
        let slots: Vec<Arc<ListenerSlot>> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for slot in slots {
            slot.deliver(version, &principal);
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn subscribe(&self, listener: PrincipalListener) -> Result<Subscription, IdentityError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(ListenerSlot {
            active: AtomicBool::new(true),
            state: Mutex::new(ListenerState {
                delivered: None,
                listener,
            }),
        });

        // Register before reading the state: a change landing in between
        // is then either in the snapshot or delivered by its writer.
        self.listeners.insert(id, Arc::clone(&slot));
        let (version, principal) = self.snapshot();
        slot.deliver(version, &principal);

        let listeners = Arc::clone(&self.listeners);
        Ok(Subscription::new(move || {
            slot.active.store(false, Ordering::Release);
            listeners.remove(&id);
        }))
    }
}

// ─── Session-token provider ──────────────────────────────────

/// Per-request provider backed by the session token the client sent.
///
/// Fires once on subscribe: a valid token yields its principal, a missing
/// or invalid token yields None. There is nothing to unsubscribe from.
pub struct SessionTokenIdentity<'a> {
    token: Option<String>,
    signing_key: &'a [u8],
}

impl<'a> SessionTokenIdentity<'a> {
    pub fn new(token: Option<String>, signing_key: &'a [u8]) -> Self {
        Self { token, signing_key }
    }
}

impl IdentityProvider for SessionTokenIdentity<'_> {
    fn subscribe(&self, mut listener: PrincipalListener) -> Result<Subscription, IdentityError> {
        let principal = self.token.as_deref().and_then(|token| {
            decode_session_token(token, self.signing_key)
                .map_err(|e| tracing::debug!(error = %e, "Rejected session token"))
                .ok()
        });
        listener(principal);
        Ok(Subscription::detached())
    }
}
