// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, plus an in-memory store for tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::InMemoryStore;

use crate::error::AppError;
use crate::models::{Profile, WeightEntry};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Profile documents (keyed by principal uid)
    pub const USERS: &str = "users";
    /// Sub-collection of weight entries under each profile
    pub const ENTRIES: &str = "entries";
}

/// Remote storage of profiles and their weight entries.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get a profile by principal uid.
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, AppError>;

    /// Whether the profile has at least one weight entry.
    ///
    /// Implementations fetch at most one entry (newest first).
    async fn has_weight_entry(&self, uid: &str) -> Result<bool, AppError>;

    /// Store the goal weight and the first weight entry together.
    async fn complete_onboarding(
        &self,
        uid: &str,
        goal_weight: f64,
        first_entry: &WeightEntry,
    ) -> Result<(), AppError>;

    /// Append a weight entry and update the profile's current weight.
    async fn add_weight_entry(&self, uid: &str, entry: &WeightEntry) -> Result<(), AppError>;
}
