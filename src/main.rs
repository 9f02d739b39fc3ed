// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weight Tracker API Server

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weight_tracker::{
    config::Config, db::FirestoreDb, models::GuardEvent, services::forward_events, AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        policy = ?config.onboarding_policy,
        "Starting Weight Tracker API"
    );

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let state = Arc::new(AppState::new(config.clone(), Arc::new(db)));

    // Profile cache lives in the client; the server only records the signal.
    let events = state.guard.subscribe_events();
    tokio::spawn(forward_events(events, |event| {
        if let GuardEvent::ProfileCacheInvalidated { uid } = event {
            tracing::info!(
                uid = %uid,
                "Onboarding completed, client profile cache invalidated"
            );
        }
    }));

    let app = weight_tracker::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("weight_tracker=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
