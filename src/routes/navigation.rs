// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation guard endpoint, called by the client before every route change.

use crate::error::{AppError, Result};
use crate::middleware::auth::session_token;
use crate::models::{Decision, NavigationIntent, RouteName};
use crate::services::SessionTokenIdentity;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/navigation", post(decide_navigation))
}

/// Attempted transition, as client paths.
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NavigationRequest {
    /// Path being left (absent on first load)
    #[serde(default)]
    pub from: Option<String>,
    /// Path being entered
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Allow,
    Redirect,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NavigationResponse {
    pub decision: DecisionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    /// Client should drop cached profile state before rendering
    pub refresh_profile: bool,
}

async fn decide_navigation(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<NavigationRequest>,
) -> Result<Json<NavigationResponse>> {
    let to = RouteName::from_path(&request.to)
        .ok_or_else(|| AppError::NotFound(format!("No route for path {}", request.to)))?;

    // An unrecognized source path is treated as a fresh entry.
    let from = request.from.as_deref().and_then(RouteName::from_path);

    let identity = SessionTokenIdentity::new(
        session_token(&jar, &headers),
        &state.config.session_signing_key,
    );

    let verdict = state
        .guard
        .evaluate(&identity, NavigationIntent::new(from, to))
        .await;

    let response = match verdict.decision {
        Decision::Allow => NavigationResponse {
            decision: DecisionKind::Allow,
            redirect_to: None,
            refresh_profile: verdict.refresh_profile,
        },
        Decision::RedirectTo(target) => NavigationResponse {
            decision: DecisionKind::Redirect,
            redirect_to: Some(target.path().to_string()),
            refresh_profile: verdict.refresh_profile,
        },
    };

    Ok(Json(response))
}
