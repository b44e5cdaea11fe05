//! Client configuration.
//!
//! Credentials are a personal access token pair (application id and secret)
//! sent as HTTP Basic auth on every request.

use std::env;
use std::fmt;
use std::time::Duration;

use base64::Engine;

use crate::error::Error;
use crate::module::DEFAULT_API_HOST;

pub const ENV_APPLICATION_ID: &str = "PCO_APPLICATION_ID";
pub const ENV_SECRET: &str = "PCO_SECRET";
pub const ENV_API_HOST: &str = "PCO_API_HOST";
pub const ENV_TIMEOUT_SECS: &str = "PCO_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub application_id: String,
    pub secret: String,
    pub api_host: String,
    pub timeout: Duration,
}

impl Config {
    pub fn new(application_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            secret: secret.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read `PCO_APPLICATION_ID` and `PCO_SECRET`, plus the optional
    /// `PCO_API_HOST` and `PCO_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let application_id =
            lookup(ENV_APPLICATION_ID).ok_or(Error::MissingCredential(ENV_APPLICATION_ID))?;
        let secret = lookup(ENV_SECRET).ok_or(Error::MissingCredential(ENV_SECRET))?;

        let mut config = Self::new(application_id, secret);
        if let Some(host) = lookup(ENV_API_HOST).filter(|h| !h.is_empty()) {
            config.api_host = host;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid {ENV_TIMEOUT_SECS}"),
            }
        }
        Ok(config)
    }

    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `Authorization` header value for these credentials.
    pub fn authorization(&self) -> String {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.application_id, self.secret));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("application_id", &self.application_id)
            .field("secret", &"<redacted>")
            .field("api_host", &self.api_host)
            .field("timeout", &self.timeout)
            .finish()
    }
}
