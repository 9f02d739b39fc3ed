// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weight Tracker: navigation guard and profile API for the weight
//! tracking single-page app.
//!
//! The client asks this service, on every navigation, whether the user
//! may reach the login, onboarding, or dashboard view, and writes the
//! documents that complete onboarding.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ProfileStore;
use services::NavigationGuard;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ProfileStore>,
    pub guard: NavigationGuard,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ProfileStore>) -> Self {
        let guard = NavigationGuard::new(Arc::clone(&store), &config);
        Self {
            config,
            store,
            guard,
        }
    }
}
