//! Configuration for the chat client
//!
//! Settings are read once at startup into an immutable [`Config`]. Every
//! required field is checked here, so a client can never be built against a
//! half-configured endpoint.

use std::fmt;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "ARK_API_KEY";
/// Environment variable holding the model identifier
pub const MODEL_VAR: &str = "MODEL";
/// Environment variable holding the provider endpoint
pub const BASE_URL_VAR: &str = "BASE_URL";
/// Optional request timeout in whole seconds
pub const TIMEOUT_VAR: &str = "ARK_TIMEOUT_SECS";

/// Default Volcengine Ark endpoint (cn-beijing region)
pub const ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
/// Default Ark model
pub const ARK_DEFAULT_MODEL: &str = "doubao-1-5-pro-32k-250115";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// API key that never shows up in logs or `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// Endpoint, credentials and model for one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    base_url: String,
    api_key: ApiKey,
    model: String,
    timeout: Duration,
}

impl Config {
    /// Build a config from explicit values. Blank values count as absent.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = required(BASE_URL_VAR, Some(base_url.into()))?;
        let api_key = required(API_KEY_VAR, Some(api_key.into()))?;
        let model = required(MODEL_VAR, Some(model.into()))?;
        check_base_url(&base_url)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: ApiKey::new(api_key),
            model,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from the environment with the Ark endpoint and model as fallbacks.
    /// The API key is still required.
    pub fn ark_from_env() -> Result<Self, ConfigError> {
        Self::ark_from_lookup(|key| std::env::var(key).ok())
    }

    /// [`Config::from_lookup`] with the Ark endpoint and model as fallbacks
    pub fn ark_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| {
            lookup(key).filter(|v| !v.trim().is_empty()).or_else(|| match key {
                BASE_URL_VAR => Some(ARK_BASE_URL.to_string()),
                MODEL_VAR => Some(ARK_DEFAULT_MODEL.to_string()),
                _ => None,
            })
        })
    }

    /// Load through an arbitrary key lookup.
    ///
    /// Required keys are checked in the order `BASE_URL`, `MODEL`,
    /// `ARK_API_KEY`; the first missing one is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = required(BASE_URL_VAR, lookup(BASE_URL_VAR))?;
        let model = required(MODEL_VAR, lookup(MODEL_VAR))?;
        let api_key = required(API_KEY_VAR, lookup(API_KEY_VAR))?;

        let timeout = match lookup(TIMEOUT_VAR).filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self::new(base_url, api_key, model)?.with_timeout(timeout))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provider endpoint, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn required(var: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(var)),
    }
}

/// The endpoint must be an absolute http(s) URL
fn check_base_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: BASE_URL_VAR,
        value: raw.to_string(),
        reason,
    };
    let url = reqwest::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(invalid("missing host".to_string())),
        scheme => Err(invalid(format!("unsupported scheme {:?}", scheme))),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        var: TIMEOUT_VAR,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var: TIMEOUT_VAR,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
