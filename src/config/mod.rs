use std::time::Duration;

use garde::Validate;
use serde::Deserialize;

/// Environment variable prefix for every setting (e.g. `ANALYSIS_API_BASE_URL`).
pub const ENV_PREFIX: &str = "ANALYSIS_";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientConfig {
    /// Analysis service origin, without the `/api` suffix.
    #[serde(default = "default_api_base_url")]
    #[garde(length(min = 1), custom(http_origin))]
    pub api_base_url: String,

    /// Delay between status queries.
    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 100))]
    pub poll_interval_ms: u64,

    /// Give up on a job after this long in processing. 0 polls forever.
    #[serde(default = "default_max_poll_duration_secs")]
    #[garde(skip)]
    pub max_poll_duration_secs: u64,

    /// Timeout for status, results and auxiliary requests.
    #[serde(default = "default_request_timeout_secs")]
    #[garde(range(min = 1))]
    pub request_timeout_secs: u64,

    /// Timeout for the whole upload. 0 disables it.
    #[serde(default)]
    #[garde(skip)]
    pub upload_timeout_secs: u64,

    /// Frame rate hint forwarded with the upload.
    #[serde(default)]
    #[garde(range(min = 1, max = 240))]
    pub target_fps: Option<u32>,
}

fn default_api_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_max_poll_duration_secs() -> u64 {
    30 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn http_origin(value: &str, _ctx: &()) -> garde::Result {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(garde::Error::new("must start with http:// or https://"))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_duration_secs: default_max_poll_duration_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            upload_timeout_secs: 0,
            target_fps: None,
        }
    }
}

impl ClientConfig {
    /// Load from `ANALYSIS_*` environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_duration(&self) -> Option<Duration> {
        (self.max_poll_duration_secs > 0).then(|| Duration::from_secs(self.max_poll_duration_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Option<Duration> {
        (self.upload_timeout_secs > 0).then(|| Duration::from_secs(self.upload_timeout_secs))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
