//! Application configuration loaded from environment variables.
//!
//! The backend project URL and anon key are the only required settings; the
//! rest have development defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Minimum time the splash view stays up, independent of how fast the
/// session check resolves.
const DEFAULT_SPLASH_MIN_MS: u64 = 3000;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend project (no trailing slash)
    pub backend_url: String,
    /// Public anon API key sent with every request
    pub anon_key: String,
    /// Redirect URL registered for the OAuth provider flow
    pub oauth_redirect_url: String,
    /// Path of the on-device key/value store file
    pub local_store_path: PathBuf,
    /// Minimum splash duration enforced by the session gate
    pub splash_min: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            backend_url: env::var("BACKEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_URL"))?,
            anon_key: env::var("BACKEND_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_ANON_KEY"))?,
            oauth_redirect_url: env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| "taskdeck://auth-callback".to_string()),
            local_store_path: env::var("LOCAL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".taskdeck/state.json")),
            splash_min: Duration::from_millis(
                env::var("SPLASH_MIN_MS")
                    .unwrap_or_else(|_| DEFAULT_SPLASH_MIN_MS.to_string())
                    .parse()
                    .unwrap_or(DEFAULT_SPLASH_MIN_MS),
            ),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            anon_key: "test_anon_key".to_string(),
            oauth_redirect_url: "taskdeck://auth-callback".to_string(),
            local_store_path: env::temp_dir().join("taskdeck-test-state.json"),
            splash_min: Duration::from_millis(0),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
