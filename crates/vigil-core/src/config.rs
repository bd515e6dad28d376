//! Environment-driven configuration.
//!
//! Both monitor variants are configured entirely through environment
//! variables. Configuration is read once at startup into immutable
//! values that get passed into the checkers and monitors; nothing reads
//! the environment after that.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Env var holding the status-variant webhook URL.
pub const STATUS_WEBHOOK_VAR: &str = "VIGIL_STATUS_WEBHOOK";
/// Env var holding the bearer credential for status checks.
pub const BEARER_TOKEN_VAR: &str = "VIGIL_BEARER_TOKEN";
/// Prefix for per-target status endpoint variables, e.g.
/// `VIGIL_STATUS_URL_ICONS_SERVER` defines a target named "icons server".
pub const STATUS_URL_PREFIX: &str = "VIGIL_STATUS_URL_";
/// Env var overriding the per-target poll interval in milliseconds.
pub const STATUS_INTERVAL_VAR: &str = "VIGIL_STATUS_INTERVAL_MS";

/// Env var holding the freshness-variant webhook URL.
pub const CACHE_WEBHOOK_VAR: &str = "VIGIL_CACHE_WEBHOOK";
/// Env var holding the comma-separated list of monitored URLs.
pub const CACHE_URLS_VAR: &str = "VIGIL_CACHE_URLS";
/// Env var overriding the shared batch interval in minutes.
pub const CACHE_INTERVAL_VAR: &str = "VIGIL_CACHE_INTERVAL_MINUTES";

/// Default status poll interval: 5 minutes per target.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default freshness batch interval: 15 minutes.
pub const DEFAULT_CACHE_INTERVAL_MINUTES: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("invalid URL in {var}: {url}")]
    InvalidUrl { var: String, url: String },

    #[error("no targets configured (set {0}<NAME> variables)")]
    NoTargets(&'static str),

    #[error("no URLs configured (set {0})")]
    NoUrls(&'static str),
}

/// A single monitored endpoint. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub interval: Duration,
}

/// Configuration for the service-status monitor variant.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub webhook_url: String,
    pub bearer_token: String,
    pub targets: Vec<Target>,
}

impl StatusConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Parse from an arbitrary variable set. Tests use this so they
    /// never mutate the process environment.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();

        let webhook_url = required(&vars, STATUS_WEBHOOK_VAR)?;
        validate_url(STATUS_WEBHOOK_VAR, &webhook_url)?;
        let bearer_token = required(&vars, BEARER_TOKEN_VAR)?;

        let interval = match vars.get(STATUS_INTERVAL_VAR) {
            Some(raw) => Duration::from_millis(parse_positive(STATUS_INTERVAL_VAR, raw)?),
            None => DEFAULT_STATUS_INTERVAL,
        };

        // BTreeMap iteration keeps target order deterministic.
        let mut targets = Vec::new();
        for (key, value) in &vars {
            let Some(suffix) = key.strip_prefix(STATUS_URL_PREFIX) else {
                continue;
            };
            if suffix.is_empty() || value.trim().is_empty() {
                continue;
            }
            validate_url(key, value)?;
            targets.push(Target {
                name: suffix.to_ascii_lowercase().replace('_', " "),
                url: value.trim().to_string(),
                interval,
            });
        }

        if targets.is_empty() {
            return Err(ConfigError::NoTargets(STATUS_URL_PREFIX));
        }

        Ok(Self {
            webhook_url,
            bearer_token,
            targets,
        })
    }
}

/// Configuration for the cache-freshness monitor variant.
#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    pub webhook_url: String,
    pub urls: Vec<String>,
    pub interval: Duration,
}

impl FreshnessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();

        let webhook_url = required(&vars, CACHE_WEBHOOK_VAR)?;
        validate_url(CACHE_WEBHOOK_VAR, &webhook_url)?;

        let raw_urls = required(&vars, CACHE_URLS_VAR)?;
        let mut urls = Vec::new();
        for part in raw_urls.split(',') {
            let url = part.trim();
            if url.is_empty() {
                continue;
            }
            validate_url(CACHE_URLS_VAR, url)?;
            urls.push(url.to_string());
        }
        if urls.is_empty() {
            return Err(ConfigError::NoUrls(CACHE_URLS_VAR));
        }

        let minutes = match vars.get(CACHE_INTERVAL_VAR) {
            Some(raw) => parse_positive(CACHE_INTERVAL_VAR, raw)?,
            None => DEFAULT_CACHE_INTERVAL_MINUTES,
        };

        Ok(Self {
            webhook_url,
            urls,
            interval: Duration::from_secs(minutes * 60),
        })
    }
}

fn required(vars: &BTreeMap<String, String>, var: &'static str) -> Result<String, ConfigError> {
    match vars.get(var) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn parse_positive(var: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn validate_url(var: &str, url: &str) -> Result<(), ConfigError> {
    Url::parse(url.trim()).map(|_| ()).map_err(|_| ConfigError::InvalidUrl {
        var: var.to_string(),
        url: url.to_string(),
    })
}
