//! REST source configuration
//!
//! Connection, credential and retry settings for the Solidrock API.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use solidrock_connector::error::{ConnectorError, ConnectorResult};

/// Retry behaviour for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds (default: 200).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds (default: 10000).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// HTTP status codes that should trigger a retry.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: Vec<u16>,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_retry_status_codes() -> Vec<u16> {
    vec![429, 502, 503, 504]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            retry_status_codes: default_retry_status_codes(),
        }
    }
}

impl RetryConfig {
    /// Create a retry config with custom max retries.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Disable retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Set initial backoff.
    #[must_use]
    pub fn with_initial_backoff(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    /// Set max backoff.
    #[must_use]
    pub fn with_max_backoff(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    /// Exponential backoff for a 1-based attempt number.
    #[must_use]
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 1);
        let delay = self.initial_backoff_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }

    /// Check if a status code should trigger a retry.
    #[must_use]
    pub fn should_retry(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Configuration for [`RestRemoteSource`](crate::RestRemoteSource).
#[derive(Clone, Serialize, Deserialize)]
pub struct RestConfig {
    /// Base URL of the API (e.g. `https://api.solidrock.example/`).
    pub base_url: String,

    /// API key sent as the `apiKey` form parameter.
    pub api_key: String,

    /// HTTP Basic username.
    #[serde(default)]
    pub username: String,

    /// HTTP Basic password.
    #[serde(default)]
    pub password: String,

    /// Connect timeout in seconds (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds (default: 60).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Skip TLS certificate verification. Off unless explicitly enabled.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Retry configuration with exponential backoff.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl std::fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl RestConfig {
    /// Create a configuration with default timeouts and retries.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            username: String::new(),
            password: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            accept_invalid_certs: false,
            retry: RetryConfig::default(),
        }
    }

    /// Set HTTP Basic credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set connect and request timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_secs: u64, request_secs: u64) -> Self {
        self.connect_timeout_secs = connect_secs;
        self.request_timeout_secs = request_secs;
        self
    }

    /// Accept invalid TLS certificates.
    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.base_url.is_empty() {
            return Err(ConnectorError::invalid_configuration("base_url is required"));
        }
        if self.api_key.is_empty() {
            return Err(ConnectorError::invalid_configuration("api_key is required"));
        }

        let url = url::Url::parse(&self.base_url).map_err(|e| {
            ConnectorError::invalid_configuration(format!("invalid base_url: {e}"))
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConnectorError::invalid_configuration(format!(
                    "unsupported scheme: {other}"
                )))
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ConnectorError::invalid_configuration(
                "request_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Resolve an endpoint path against the base URL.
    ///
    /// The base is treated as a directory even without a trailing slash.
    pub fn endpoint_url(&self, endpoint: &str) -> ConnectorResult<url::Url> {
        let mut base = url::Url::parse(&self.base_url).map_err(|e| {
            ConnectorError::invalid_configuration(format!("invalid base_url: {e}"))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(endpoint.trim_start_matches('/')).map_err(|e| {
            ConnectorError::invalid_configuration(format!("invalid endpoint {endpoint}: {e}"))
        })
    }
}
