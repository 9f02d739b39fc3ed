// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and weight entry models stored in Firestore.

use serde::{Deserialize, Serialize};

/// Per-user profile document, keyed by principal uid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Target weight chosen during onboarding
    #[serde(default)]
    pub goal_weight: Option<f64>,
    /// Last known weight (kept for older clients; entries are authoritative)
    #[serde(default)]
    pub current_weight: Option<f64>,
    /// Last write timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One logged measurement, stored in the profile's `entries` sub-collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub weight: f64,
    /// RFC 3339 UTC with `Z` suffix, so string order is chronological
    pub created_at: String,
}

/// Which predicate decides that a user has finished onboarding.
///
/// Two predicates have been used for this app and they disagree: a profile
/// can carry a stale `currentWeight` with no entries, or entries without
/// `currentWeight`. Entry existence is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnboardingPolicy {
    /// `goalWeight` is set and at least one weight entry exists.
    #[default]
    GoalAndEntry,
    /// `goalWeight` and `currentWeight` are both set.
    GoalAndCurrentWeight,
}

impl OnboardingPolicy {
    /// Parse the `ONBOARDING_POLICY` setting.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "goal_and_entry" => Some(Self::GoalAndEntry),
            "goal_and_current_weight" => Some(Self::GoalAndCurrentWeight),
            _ => None,
        }
    }

    /// Whether the entry-existence query is needed to evaluate this policy.
    pub fn needs_entry_query(self) -> bool {
        matches!(self, Self::GoalAndEntry)
    }

    /// Evaluate the predicate. `has_entry` is ignored by the legacy policy.
    pub fn is_onboarded(self, profile: Option<&Profile>, has_entry: bool) -> bool {
        let Some(profile) = profile else {
            return false;
        };
        match self {
            Self::GoalAndEntry => profile.goal_weight.is_some() && has_entry,
            Self::GoalAndCurrentWeight => {
                profile.goal_weight.is_some() && profile.current_weight.is_some()
            }
        }
    }
}
