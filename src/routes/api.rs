// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{RouteName, WeightEntry};
use crate::time_utils::now_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via session token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile))
        .route("/api/onboarding", post(complete_onboarding))
        .route("/api/entries", post(add_entry))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub goal_weight: Option<f64>,
    pub current_weight: Option<f64>,
    pub onboarded: bool,
}

/// Current user's profile and onboarding state under the active policy.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.store.get_profile(&user.uid).await?;

    let has_entry = if state.guard.policy().needs_entry_query() && profile.is_some() {
        state.store.has_weight_entry(&user.uid).await?
    } else {
        false
    };
    let onboarded = state.guard.policy().is_onboarded(profile.as_ref(), has_entry);

    let profile = profile.unwrap_or_default();
    Ok(Json(ProfileResponse {
        goal_weight: profile.goal_weight,
        current_weight: profile.current_weight,
        onboarded,
    }))
}

// ─── Onboarding ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OnboardingRequest {
    #[validate(range(min = 20.0, max = 500.0))]
    pub goal_weight: f64,
    #[validate(range(min = 20.0, max = 500.0))]
    pub current_weight: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OnboardingResponse {
    /// Where the client should navigate next
    pub next: String,
}

/// Store goal weight and the first weight entry.
async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<OnboardingRequest>,
) -> Result<Json<OnboardingResponse>> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let first_entry = WeightEntry {
        weight: request.current_weight,
        created_at: now_utc_rfc3339(),
    };

    state
        .store
        .complete_onboarding(&user.uid, request.goal_weight, &first_entry)
        .await?;

    tracing::info!(uid = %user.uid, "Onboarding completed");

    Ok(Json(OnboardingResponse {
        next: RouteName::Dashboard.path().to_string(),
    }))
}

// ─── Weight Entries ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewEntryRequest {
    #[validate(range(min = 20.0, max = 500.0))]
    pub weight: f64,
}

/// Log a new measurement.
async fn add_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<NewEntryRequest>,
) -> Result<(StatusCode, Json<WeightEntry>)> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let entry = WeightEntry {
        weight: request.weight,
        created_at: now_utc_rfc3339(),
    };

    state.store.add_weight_entry(&user.uid, &entry).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}
