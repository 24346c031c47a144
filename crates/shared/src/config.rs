use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub retry: RetrySettings,
    pub storage: StorageConfig,
    pub key_retrieval: KeyRetrievalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the diagnosis key submission server
    pub submission_url: String,
    /// Base URL of the verification server answering test result queries
    pub verification_url: String,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Client-side retry settings for the HTTP transport
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Total attempts including the first one (default: 3)
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: 100)
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay in milliseconds (default: 10000)
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// File holding the persisted registration token
    pub token_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyRetrievalConfig {
    /// How many days of proximity keys are eligible for submission (default: 14)
    pub window_days: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            backend: BackendConfig {
                submission_url: env::var("SUBMISSION_SERVER_URL")?,
                verification_url: env::var("VERIFICATION_SERVER_URL")?,
                timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            retry: RetrySettings {
                max_attempts: env::var("HTTP_RETRY_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                initial_delay_ms: env::var("HTTP_RETRY_INITIAL_DELAY_MS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()?,
                max_delay_ms: env::var("HTTP_RETRY_MAX_DELAY_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
            },
            storage: StorageConfig {
                token_path: env::var("TOKEN_STORE_PATH")
                    .unwrap_or_else(|_| "registration_token.json".to_string())
                    .into(),
            },
            key_retrieval: KeyRetrievalConfig {
                window_days: env::var("KEY_RETRIEVAL_WINDOW_DAYS")
                    .unwrap_or_else(|_| "14".to_string())
                    .parse()?,
            },
        })
    }
}
