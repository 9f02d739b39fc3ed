// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Static route table and navigation decision types.

use crate::error::GuardError;
use serde::{Deserialize, Serialize};

/// The three logical views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteName {
    Login,
    Onboarding,
    Dashboard,
}

/// Static description of a client route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: RouteName,
    pub path: &'static str,
    pub requires_auth: bool,
    /// Profile-completeness gate applies (direction depends on the route)
    pub requires_profile: bool,
}

pub static ROUTES: [Route; 3] = [
    Route {
        name: RouteName::Login,
        path: "/login",
        requires_auth: false,
        requires_profile: false,
    },
    Route {
        name: RouteName::Onboarding,
        path: "/onboarding",
        requires_auth: true,
        requires_profile: true,
    },
    Route {
        name: RouteName::Dashboard,
        path: "/dashboard",
        requires_auth: true,
        requires_profile: true,
    },
];

impl RouteName {
    pub fn route(self) -> &'static Route {
        match self {
            RouteName::Login => &ROUTES[0],
            RouteName::Onboarding => &ROUTES[1],
            RouteName::Dashboard => &ROUTES[2],
        }
    }

    pub fn path(self) -> &'static str {
        self.route().path
    }

    /// Resolve a client path. `/` is the dashboard.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(RouteName::Dashboard);
        }
        ROUTES.iter().find(|r| r.path == trimmed).map(|r| r.name)
    }
}

/// A single attempted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationIntent {
    /// Route the client is leaving, if any (None on first load)
    pub from: Option<RouteName>,
    pub to: RouteName,
}

impl NavigationIntent {
    pub fn new(from: Option<RouteName>, to: RouteName) -> Self {
        Self { from, to }
    }

    /// Entering the app fresh, with no previous route.
    pub fn to(to: RouteName) -> Self {
        Self { from: None, to }
    }
}

/// Outcome of a guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(RouteName),
}

/// Side effects the guard publishes for the hosting application.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardEvent {
    /// Onboarding just completed; cached profile-completeness state is stale.
    ProfileCacheInvalidated { uid: String },
    /// A recovered failure inside a single decision.
    Error(GuardError),
}
