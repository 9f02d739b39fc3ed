// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod guard;
pub mod identity;

pub use guard::{forward_events, NavigationGuard, Verdict};
pub use identity::{
    resolve_principal, IdentityError, IdentityProvider, LocalIdentityProvider, PrincipalListener,
    SessionTokenIdentity, Subscription,
};
