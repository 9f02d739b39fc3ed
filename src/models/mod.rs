// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod principal;
pub mod profile;
pub mod route;

pub use principal::Principal;
pub use profile::{OnboardingPolicy, Profile, WeightEntry};
pub use route::{Decision, GuardEvent, NavigationIntent, Route, RouteName};
