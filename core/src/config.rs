//! Deployment configuration.
//!
//! A `Config` is built once at process start (usually with
//! `Config::from_env`) and handed to the client and helpers explicitly.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ApiError;

pub const ENV_VAR: &str = "PETSTORE_ENV";
pub const BASE_URL_VAR: &str = "API_BASE_URL";
pub const DEBUG_VAR: &str = "DEBUG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Development,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            other => Err(ApiError::UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: Environment,
    pub base_url: String,
    /// Whole-request limit applied by the transport.
    pub timeout: Duration,
    /// Extra attempts granted to callers that opt into `helpers::retry`.
    pub retries: u32,
    pub debug: bool,
}

impl Config {
    /// Defaults for a named deployment.
    pub fn for_environment(environment: Environment) -> Self {
        let (base_url, timeout_ms, retries) = match environment {
            Environment::Production => ("https://petstore.swagger.io/v2", 30_000, 2),
            Environment::Staging => ("https://staging.petstore.swagger.io/v2", 30_000, 2),
            Environment::Development => ("http://localhost:8080/v2", 15_000, 0),
        };
        Self {
            environment,
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(timeout_ms),
            retries,
            debug: false,
        }
    }

    /// Read `PETSTORE_ENV`, `API_BASE_URL` and `DEBUG` from the process
    /// environment. A missing or unknown environment name selects production.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup(ENV_VAR)
            .and_then(|name| name.parse().ok())
            .unwrap_or_default();
        let mut config = Self::for_environment(environment);
        if let Some(url) = lookup(BASE_URL_VAR).filter(|url| !url.is_empty()) {
            config = config.with_base_url(&url);
        }
        config.debug = lookup(DEBUG_VAR).as_deref() == Some("true");
        config
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::for_environment(Environment::Production)
    }
}
