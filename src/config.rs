// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use crate::models::OnboardingPolicy;
use std::env;
use std::time::Duration;

const DEFAULT_IDENTITY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// HS256 key for session tokens (raw bytes)
    pub session_signing_key: Vec<u8>,
    /// Upper bound on waiting for the identity provider's first notification
    pub identity_timeout: Duration,
    /// Upper bound on each profile store call made by the guard
    pub store_timeout: Duration,
    /// Predicate used to decide that a user has finished onboarding
    pub onboarding_policy: OnboardingPolicy,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            session_signing_key: b"test_session_key_32_bytes_min!!!".to_vec(),
            identity_timeout: Duration::from_millis(500),
            store_timeout: Duration::from_millis(500),
            onboarding_policy: OnboardingPolicy::default(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let onboarding_policy = match env::var("ONBOARDING_POLICY") {
            Ok(value) => OnboardingPolicy::parse(&value)
                .ok_or(ConfigError::Invalid("ONBOARDING_POLICY", value))?,
            Err(_) => OnboardingPolicy::default(),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .trim()
                .as_bytes()
                .to_vec(),
            identity_timeout: duration_ms_from_env(
                "IDENTITY_TIMEOUT_MS",
                DEFAULT_IDENTITY_TIMEOUT_MS,
            )?,
            store_timeout: duration_ms_from_env("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)?,
            onboarding_policy,
        })
    }
}

fn duration_ms_from_env(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or(ConfigError::Invalid(name, value)),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
