// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::layer::{Context, SubscriberExt};
use weight_tracker::config::Config;
use weight_tracker::db::{FirestoreDb, InMemoryStore};
use weight_tracker::middleware::auth::Claims;
use weight_tracker::models::{Profile, WeightEntry};
use weight_tracker::routes::create_router;
use weight_tracker::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by an in-memory store.
/// Returns the router, the shared state, and the store for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState::new(Config::test_default(), store.clone()));
    (create_router(state.clone()), state, store)
}

/// Create a session token for `uid` signed with `signing_key`.
#[allow(dead_code)]
pub fn create_test_token(uid: &str, signing_key: &[u8]) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: uid.to_string(),
        email: None,
        name: None,
        picture: None,
        iat: now,
        exp: now + 3600,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn profile_with_goal(goal_weight: Option<f64>) -> Profile {
    Profile {
        goal_weight,
        current_weight: None,
        updated_at: None,
    }
}

#[allow(dead_code)]
pub fn entry(weight: f64) -> WeightEntry {
    WeightEntry {
        weight,
        created_at: "2026-03-01T07:30:00.000Z".to_string(),
    }
}

/// Counts ERROR-level tracing events.
#[derive(Clone, Default)]
pub struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    #[allow(dead_code)]
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Install an error counter as the thread's default subscriber.
///
/// Only reliable on the current-thread runtime (the `#[tokio::test]` default).
#[allow(dead_code)]
pub fn capture_errors() -> (ErrorCounter, tracing::subscriber::DefaultGuard) {
    let counter = ErrorCounter::default();
    let guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(counter.clone()));
    (counter, guard)
}
