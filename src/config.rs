use std::time::Duration;

use thiserror::Error;

use crate::pipeline::{RetryPolicy, DEFAULT_PAGE_DELAY};

/// Application-level constants
pub const APP_NAME: &str = "vitals-triage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upstream assessment API used when no override is set.
pub const DEFAULT_BASE_URL: &str = "https://assessment.ksensetech.com/api";

/// Per-request timeout for both retrieval and submission.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_KEY: &str = "VITALS_API_KEY";
pub const ENV_BASE_URL: &str = "VITALS_BASE_URL";
pub const ENV_MAX_ATTEMPTS: &str = "VITALS_MAX_ATTEMPTS";
pub const ENV_PAGE_DELAY_MS: &str = "VITALS_PAGE_DELAY_MS";
pub const ENV_TIMEOUT_SECS: &str = "VITALS_TIMEOUT_SECS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "vitals_triage=info,warn"
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

/// Everything the pipeline needs to talk to the upstream API.
///
/// Built once at startup and passed into the fetcher and submitter;
/// nothing downstream reads the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    /// Static credential. Absence is not validated; requests simply go out unauthenticated.
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub page_delay: Duration,
    pub retry: RetryPolicy,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_delay: DEFAULT_PAGE_DELAY,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup(ENV_BASE_URL) {
            Some(url) if url.trim().is_empty() => {
                return Err(ConfigError::Empty { key: ENV_BASE_URL })
            }
            Some(url) => url.trim().to_string(),
            None => DEFAULT_BASE_URL.to_string(),
        };

        let mut config = Self::new(&base_url);
        config.api_key = lookup(ENV_API_KEY).filter(|k| !k.is_empty());

        if let Some(attempts) = parse_number(&lookup, ENV_MAX_ATTEMPTS)? {
            let attempts = u32::try_from(attempts).map_err(|_| ConfigError::InvalidNumber {
                key: ENV_MAX_ATTEMPTS,
                value: attempts.to_string(),
            })?;
            config.retry = config.retry.with_max_attempts(attempts);
        }
        if let Some(ms) = parse_number(&lookup, ENV_PAGE_DELAY_MS)? {
            config.page_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_number(&lookup, ENV_TIMEOUT_SECS)? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn submit_url(&self) -> String {
        format!("{}/submit-assessment", self.base_url)
    }
}

fn parse_number<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}
