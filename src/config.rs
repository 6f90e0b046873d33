use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::constants::{defaults, envvars};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("invalid endpoint '{endpoint}': {source}")]
    Endpoint {
        endpoint: String,
        source: url::ParseError,
    },
}

/// Connection settings for one Orion instance.
///
/// The config file wraps these in a top-level `config` object:
/// `{"config": {"endpoint": "http://localhost:1026/v2", "token": "..."}}`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub endpoint: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    retry_max_elapsed_secs: Option<u64>,
}

#[derive(Deserialize)]
struct ConfigFile {
    config: Config,
}

impl Config {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Config {
            endpoint: endpoint.into(),
            token: token.into(),
            service: None,
            request_timeout_secs: None,
            retry_max_elapsed_secs: None,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_retry_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.retry_max_elapsed_secs = Some(max_elapsed.as_secs());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults::API_REQUEST_TIMEOUT)
    }

    pub fn retry_max_elapsed(&self) -> Duration {
        self.retry_max_elapsed_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults::RETRY_MAX_ELAPSED)
    }

    /// The service name to send, if any. An empty name counts as none.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref().filter(|s| !s.is_empty())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = env::var(envvars::FIWARE_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Ok(token) = env::var(envvars::FIWARE_TOKEN) {
            self.token = token;
        }
        if let Ok(service) = env::var(envvars::FIWARE_SERVICE) {
            self.service = Some(service);
        }
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();
        Url::parse(&self.endpoint).map_err(|source| ConfigError::Endpoint {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        Ok(self)
    }
}

pub fn from_str(config_raw: &str) -> Result<Config, ConfigError> {
    let mut config = serde_json::from_str::<ConfigFile>(config_raw)?.config;
    config.apply_env_overrides();
    config.validate()
}

pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config_raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    from_str(&config_raw)
}
