//! Resolver configuration and API credentials
//!
//! Configuration is built once by the caller (the CLI reads the environment)
//! and passed into constructors. Nothing below this module reads env vars.

use std::time::Duration;

use thiserror::Error;

use crate::gamma::rank::RankPolicy;
use crate::{DEFAULT_GEMINI_MODEL, EXA_API_BASE, GAMMA_API_BASE, GEMINI_API_BASE};

/// Slugs that show up in polymarket.com URLs but are not markets
pub const DEFAULT_DENYLIST: [&str; 4] = ["profile", "login", "leaderboard", "rewards"];

/// Blocking configuration problems, surfaced to the user as-is
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing credential: set {name}")]
    MissingCredential { name: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Third-party API keys
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// Google AI Studio key (Gemini)
    pub google_api_key: Option<String>,
    /// Exa.ai key (neural search)
    pub exa_api_key: Option<String>,
}

impl ApiKeys {
    /// Load keys from environment variables
    ///
    /// Expected env vars:
    /// - GOOGLE_API_KEY
    /// - EXA_API_KEY
    ///
    /// Empty values count as absent.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self { google_api_key: read("GOOGLE_API_KEY"), exa_api_key: read("EXA_API_KEY") }
    }

    pub fn require_google(&self) -> Result<&str, ConfigError> {
        self.google_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential { name: "GOOGLE_API_KEY" })
    }

    pub fn require_exa(&self) -> Result<&str, ConfigError> {
        self.exa_api_key.as_deref().ok_or(ConfigError::MissingCredential { name: "EXA_API_KEY" })
    }
}

fn redact(key: &Option<String>) -> String {
    match key {
        Some(k) => format!("{}...", k.chars().take(4).collect::<String>()),
        None => "<unset>".to_string(),
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("exa_api_key", &redact(&self.exa_api_key))
            .finish()
    }
}

/// Market Resolver configuration
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub gamma_base_url: String,
    pub exa_base_url: String,
    pub gemini_base_url: String,
    /// Model used for keyword extraction and briefings
    pub gemini_model: String,
    /// Per-request timeout for every upstream call (seconds)
    pub request_timeout_secs: u64,
    /// Results requested from the catalog search
    pub search_limit: u32,
    /// Markets taken from each event in the slug detail fetch
    pub detail_markets_per_event: usize,
    /// Candidates kept after ranking
    pub max_candidates: usize,
    /// Slugs that are never markets
    pub denylist: Vec<String>,
    /// Relevance scoring policy
    pub rank: RankPolicy,
    /// Events on the top-markets board
    pub top_limit: u32,
    /// Lifetime of the cached top-markets board (seconds)
    pub top_cache_ttl_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            gamma_base_url: GAMMA_API_BASE.to_string(),
            exa_base_url: EXA_API_BASE.to_string(),
            gemini_base_url: GEMINI_API_BASE.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            request_timeout_secs: 5,
            search_limit: 10,
            detail_markets_per_event: 2,
            max_candidates: 10,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            rank: RankPolicy::default(),
            top_limit: 12,
            top_cache_ttl_secs: 60,
        }
    }
}

impl ResolverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn top_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.top_cache_ttl_secs)
    }

    /// Whether `slug` is a known non-market path
    pub fn is_denylisted(&self, slug: &str) -> bool {
        self.denylist.iter().any(|d| d.eq_ignore_ascii_case(slug))
    }

    /// Reject values that would make every request fail or every result vanish
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_candidates",
                reason: "must be at least 1".to_string(),
            });
        }
        let threshold = self.rank.volume_threshold;
        if threshold.is_nan() || threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "volume_threshold",
                reason: format!("{} is not a non-negative number", threshold),
            });
        }
        Ok(())
    }
}
