// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Layout:
//! - `users/{uid}` holds the profile document
//! - `users/{uid}/entries/{entryId}` holds weight entries

use crate::db::{collections, ProfileStore};
use crate::error::AppError;
use crate::models::{Profile, WeightEntry};
use async_trait::async_trait;

/// Profile fields owned by a weight entry write (serialized names).
const ENTRY_PROFILE_FIELDS: [&str; 2] = ["currentWeight", "updatedAt"];

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Path of the profile document that owns the `entries` sub-collection.
    fn entries_parent(&self, uid: &str) -> Result<firestore::ParentPathBuilder, AppError> {
        self.get_client()?
            .parent_path(collections::USERS, uid)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest weight entry for a user, if any.
    pub async fn latest_weight_entry(&self, uid: &str) -> Result<Option<WeightEntry>, AppError> {
        let parent = self.entries_parent(uid)?;

        let entries: Vec<WeightEntry> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ENTRIES)
            .parent(&parent)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(entries.into_iter().next())
    }
}

/// Entry document IDs sort by creation time and do not collide within a user.
fn new_entry_id() -> String {
    let now = chrono::Utc::now();
    format!(
        "{:020}",
        now.timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros() * 1_000)
    )
}

#[async_trait]
impl ProfileStore for FirestoreDb {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn has_weight_entry(&self, uid: &str) -> Result<bool, AppError> {
        Ok(self.latest_weight_entry(uid).await?.is_some())
    }

    /// Writes the profile and the first entry in one transaction so the
    /// guard never sees a goal weight without an entry.
    async fn complete_onboarding(
        &self,
        uid: &str,
        goal_weight: f64,
        first_entry: &WeightEntry,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = self.entries_parent(uid)?;

        let profile = Profile {
            goal_weight: Some(goal_weight),
            current_weight: Some(first_entry.weight),
            updated_at: Some(first_entry.created_at.clone()),
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add profile to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::ENTRIES)
            .document_id(new_entry_id())
            .parent(&parent)
            .object(first_entry)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add entry to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(uid, goal_weight, "Onboarding stored");
        Ok(())
    }

    async fn add_weight_entry(&self, uid: &str, entry: &WeightEntry) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = self.entries_parent(uid)?;

        // Written with a field mask so a concurrent onboarding's goal
        // weight is never overwritten.
        let profile = Profile {
            current_weight: Some(entry.weight),
            updated_at: Some(entry.created_at.clone()),
            ..Default::default()
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::ENTRIES)
            .document_id(new_entry_id())
            .parent(&parent)
            .object(entry)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add entry to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .fields(ENTRY_PROFILE_FIELDS)
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add profile to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(uid, weight = entry.weight, "Weight entry stored");
        Ok(())
    }
}
