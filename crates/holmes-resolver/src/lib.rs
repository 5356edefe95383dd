//! Holmes market resolver
//!
//! Maps free-form news or rumor text to ranked Polymarket markets and asks
//! an LLM for a trading briefing on them.
//!
//! - `gamma`: Gamma API client, catalog sources, ranking, resolver pipeline
//! - `exa`: Exa neural search (finds polymarket.com pages for a query)
//! - `llm`: Gemini text generation
//! - `narrative`: briefing prompt and report generation
//!
//! # Official Documentation
//! - Gamma Structure: https://docs.polymarket.com/developers/gamma-markets-api/gamma-structure
//! - Gamma Endpoints: https://docs.polymarket.com/quickstart/reference/endpoints
//! - Gemini API: https://ai.google.dev/api/generate-content
//! - Exa Search: https://docs.exa.ai/reference/search

pub mod config;
pub mod exa;
pub mod gamma;
pub mod llm;
pub mod narrative;
pub mod types;

pub use config::{ApiKeys, ConfigError, ResolverConfig};
pub use types::*;

/// Official Gamma API base URL (market discovery)
/// Source: https://docs.polymarket.com/quickstart/reference/endpoints
pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// Exa search API base URL
pub const EXA_API_BASE: &str = "https://api.exa.ai";

/// Google Generative Language API base URL
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Model used for keyword extraction and briefings
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
