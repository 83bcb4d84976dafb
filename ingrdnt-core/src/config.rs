//! Scan pipeline configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::rules::{RuleSet, RulesError};

/// Default Open Food Facts base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://world.openfoodfacts.org";

pub const DEFAULT_USER_AGENT: &str = "Ingrdnt/1.0 (support@ingrdnt.app)";

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_METADATA_CACHE_CAPACITY: u64 = 10_000;

pub const DEFAULT_METADATA_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Hard cap on suggested alternatives.
pub const MAX_ALTERNATIVES: usize = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },

    #[error("Failed to load rules: {0}")]
    Rules(#[from] RulesError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Scan pipeline configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Base URL for product, ingredient and search endpoints.
    pub api_base_url: String,
    pub user_agent: String,
    /// Timeout applied to every external call.
    pub http_timeout: Duration,
    /// Minimum delay between requests to one host. 0 disables.
    pub rate_limit_ms: u64,
    /// Maximum number of cached ingredient tokens.
    pub metadata_cache_capacity: u64,
    /// Time-to-live for cached metadata. None keeps entries until evicted.
    pub metadata_cache_ttl: Option<Duration>,
    /// Maximum in-flight metadata fetches per analysis.
    pub fetch_concurrency: usize,
    pub max_alternatives: usize,
    /// Rule configuration file. None uses the built-in rules.
    pub rules_path: Option<PathBuf>,
    pub history_path: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            rate_limit_ms: 0,
            metadata_cache_capacity: DEFAULT_METADATA_CACHE_CAPACITY,
            metadata_cache_ttl: Some(Duration::from_secs(DEFAULT_METADATA_CACHE_TTL_SECS)),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            max_alternatives: MAX_ALTERNATIVES,
            rules_path: None,
            history_path: Self::default_history_path(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from environment variables.
    ///
    /// All optional:
    /// - `INGRDNT_API_BASE_URL`: catalog base URL (default: Open Food Facts)
    /// - `INGRDNT_USER_AGENT`: User-Agent header
    /// - `INGRDNT_HTTP_TIMEOUT_MS`: per-request timeout (default: 10000)
    /// - `INGRDNT_RATE_LIMIT_MS`: delay between requests to one host (default: 0)
    /// - `INGRDNT_METADATA_CACHE_CAPACITY`: cached tokens (default: 10000)
    /// - `INGRDNT_METADATA_CACHE_TTL_SECS`: cache TTL, 0 disables (default: 86400)
    /// - `INGRDNT_FETCH_CONCURRENCY`: parallel metadata fetches (default: 8)
    /// - `INGRDNT_MAX_ALTERNATIVES`: alternatives cap, clamped to 5
    /// - `INGRDNT_RULES_PATH`: JSON rule configuration
    /// - `INGRDNT_HISTORY_PATH`: scan history file (default: ~/.ingrdnt/scan-history.jsonl)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("INGRDNT_API_BASE_URL").unwrap_or(defaults.api_base_url);
        let user_agent = lookup("INGRDNT_USER_AGENT").unwrap_or(defaults.user_agent);

        let http_timeout = parse_var::<u64>(&lookup, "INGRDNT_HTTP_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.http_timeout);

        let rate_limit_ms =
            parse_var(&lookup, "INGRDNT_RATE_LIMIT_MS")?.unwrap_or(defaults.rate_limit_ms);

        let metadata_cache_capacity = parse_var(&lookup, "INGRDNT_METADATA_CACHE_CAPACITY")?
            .unwrap_or(defaults.metadata_cache_capacity);

        let metadata_cache_ttl = match parse_var::<u64>(&lookup, "INGRDNT_METADATA_CACHE_TTL_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.metadata_cache_ttl,
        };

        let fetch_concurrency = match parse_var::<usize>(&lookup, "INGRDNT_FETCH_CONCURRENCY")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    var: "INGRDNT_FETCH_CONCURRENCY".to_string(),
                    value: "0".to_string(),
                })
            }
            Some(n) => n,
            None => defaults.fetch_concurrency,
        };

        let max_alternatives = parse_var::<usize>(&lookup, "INGRDNT_MAX_ALTERNATIVES")?
            .map(|n| n.min(MAX_ALTERNATIVES))
            .unwrap_or(defaults.max_alternatives);

        let rules_path = lookup("INGRDNT_RULES_PATH").map(PathBuf::from);

        let history_path = lookup("INGRDNT_HISTORY_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.history_path);

        Ok(Self {
            api_base_url,
            user_agent,
            http_timeout,
            rate_limit_ms,
            metadata_cache_capacity,
            metadata_cache_ttl,
            fetch_concurrency,
            max_alternatives,
            rules_path,
            history_path,
        })
    }

    /// Load the configured rule set, or the built-in one.
    pub fn load_rules(&self) -> Result<RuleSet, ConfigError> {
        match &self.rules_path {
            Some(path) => Ok(RuleSet::from_path(path)?),
            None => Ok(RuleSet::builtin().clone()),
        }
    }

    /// Get the default history file: ~/.ingrdnt/scan-history.jsonl
    pub fn default_history_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".ingrdnt").join("scan-history.jsonl"))
            .unwrap_or_else(|| PathBuf::from("data/scan-history.jsonl"))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
    }
}
