//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Azure app registration client ID (public)
    pub ms_client_id: String,
    /// Client secret, only needed for confidential app registrations
    pub ms_client_secret: Option<String>,
    /// Identity platform tenant (`consumers` for personal accounts)
    pub ms_tenant: String,
    /// Public base URL of this API, used to build the OAuth redirect URI
    pub base_url: String,
    /// Path of the OAuth callback route
    pub callback_path: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Key for signing session JWTs and OAuth state (raw bytes)
    pub session_signing_key: Vec<u8>,
    /// Directory holding one cached token file per session
    pub token_cache_dir: PathBuf,
    /// Timeout applied to every Microsoft request
    pub http_timeout_secs: u64,
    /// Microsoft login host (overridable for tests)
    pub login_base_url: String,
    /// Microsoft Graph API root (overridable for tests)
    pub graph_base_url: String,
}

/// Scopes requested at sign-in.
pub const OAUTH_SCOPES: &str = "Tasks.ReadWrite User.Read";

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let session_signing_key = env::var("SESSION_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
            .into_bytes();
        if session_signing_key.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SIGNING_KEY must be at least 32 bytes",
            ));
        }

        Ok(Self {
            ms_client_id: env::var("MS_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MS_CLIENT_ID"))?,
            ms_client_secret: env::var("MS_CLIENT_SECRET")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            ms_tenant: env::var("MS_TENANT").unwrap_or_else(|_| "consumers".to_string()),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string()),
            callback_path: env::var("CALLBACK_PATH")
                .unwrap_or_else(|_| "/auth/microsoft/callback".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            session_signing_key,
            token_cache_dir: env::var("TOKEN_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("12weeks_tokens")),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            login_base_url: "https://login.microsoftonline.com".to_string(),
            graph_base_url: "https://graph.microsoft.com/v1.0".to_string(),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            ms_client_id: "test_client_id".to_string(),
            ms_client_secret: None,
            ms_tenant: "consumers".to_string(),
            base_url: "http://localhost:8000".to_string(),
            callback_path: "/auth/microsoft/callback".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8000,
            session_signing_key: b"test_session_key_32_bytes_minimum!!".to_vec(),
            token_cache_dir: env::temp_dir().join("12weeks_tokens_test"),
            http_timeout_secs: 5,
            login_base_url: "http://127.0.0.1:9".to_string(),
            graph_base_url: "http://127.0.0.1:9/v1.0".to_string(),
        }
    }

    /// Redirect URI registered with the identity platform.
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.callback_path)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
