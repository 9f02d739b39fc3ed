// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process profile store for tests and offline runs.
//!
//! Supports failure injection and artificial latency so guard behavior
//! under store outages can be exercised without an emulator.

use crate::db::ProfileStore;
use crate::error::AppError;
use crate::models::{Profile, WeightEntry};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct InMemoryStore {
    profiles: DashMap<String, Profile>,
    entries: DashMap<String, Vec<WeightEntry>>,
    fail_profile_reads: AtomicBool,
    fail_entry_queries: AtomicBool,
    latency_ms: AtomicU64,
    profile_reads: AtomicUsize,
    entry_queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile document directly.
    pub fn put_profile(&self, uid: &str, profile: Profile) {
        self.profiles.insert(uid.to_string(), profile);
    }

    /// Seed a weight entry without touching the profile.
    pub fn push_entry(&self, uid: &str, entry: WeightEntry) {
        self.entries.entry(uid.to_string()).or_default().push(entry);
    }

    pub fn entries_for(&self, uid: &str) -> Vec<WeightEntry> {
        self.entries
            .get(uid)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn set_fail_profile_reads(&self, fail: bool) {
        self.fail_profile_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_entry_queries(&self, fail: bool) {
        self.fail_entry_queries.store(fail, Ordering::SeqCst);
    }

    /// Delay applied to every read.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn profile_reads(&self) -> usize {
        self.profile_reads.load(Ordering::SeqCst)
    }

    pub fn entry_queries(&self) -> usize {
        self.entry_queries.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, AppError> {
        self.profile_reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_profile_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database("profile store unavailable".to_string()));
        }
        Ok(self.profiles.get(uid).map(|p| p.value().clone()))
    }

    async fn has_weight_entry(&self, uid: &str) -> Result<bool, AppError> {
        self.entry_queries.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_entry_queries.load(Ordering::SeqCst) {
            return Err(AppError::Database("entry query failed".to_string()));
        }
        Ok(self.entries.get(uid).is_some_and(|e| !e.is_empty()))
    }

    async fn complete_onboarding(
        &self,
        uid: &str,
        goal_weight: f64,
        first_entry: &WeightEntry,
    ) -> Result<(), AppError> {
        {
            let mut profile = self.profiles.entry(uid.to_string()).or_default();
            profile.goal_weight = Some(goal_weight);
            profile.current_weight = Some(first_entry.weight);
            profile.updated_at = Some(first_entry.created_at.clone());
        }
        self.push_entry(uid, first_entry.clone());
        Ok(())
    }

    async fn add_weight_entry(&self, uid: &str, entry: &WeightEntry) -> Result<(), AppError> {
        // Only the fields this write owns; goal weight is left alone.
        {
            let mut profile = self.profiles.entry(uid.to_string()).or_default();
            profile.current_weight = Some(entry.weight);
            profile.updated_at = Some(entry.created_at.clone());
        }
        self.push_entry(uid, entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(weight: f64) -> WeightEntry {
        WeightEntry {
            weight,
            created_at: "2026-01-15T10:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_onboarding_writes_profile_and_entry() {
        let store = InMemoryStore::new();
        assert!(!store.has_weight_entry("u1").await.unwrap());

        store.complete_onboarding("u1", 70.0, &entry(82.5)).await.unwrap();

        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.goal_weight, Some(70.0));
        assert_eq!(profile.current_weight, Some(82.5));
        assert!(store.has_weight_entry("u1").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_entries_never_clear_goal_weight() {
        let store = Arc::new(InMemoryStore::new());

        let mut handles = vec![];
        for i in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                if i == 25 {
                    store.complete_onboarding("u1", 70.0, &entry(85.0)).await
                } else {
                    store.add_weight_entry("u1", &entry(80.0 + i as f64 / 10.0)).await
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.goal_weight, Some(70.0));
        assert_eq!(store.entries_for("u1").len(), 50);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryStore::new();
        store.set_fail_profile_reads(true);
        assert!(store.get_profile("u1").await.is_err());
        store.set_fail_entry_queries(true);
        assert!(store.has_weight_entry("u1").await.is_err());
        assert_eq!(store.profile_reads(), 1);
        assert_eq!(store.entry_queries(), 1);
    }
}
