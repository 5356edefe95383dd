//! Gamma API client and Market Resolver
//!
//! # Components
//! - `GammaClient`: REST client for Gamma API (market discovery)
//! - `CatalogSearch`: search term -> raw markets (`GammaSearch`, `ExaSearch`)
//! - `Ranker`: relevance scoring (`SubstringRanker`)
//! - `MarketResolver`: extract -> fetch -> filter -> rank pipeline
//! - `TopMarketsCache`: top open events by volume, TTL-cached
//!
//! # Source
//! - Gamma Structure: https://docs.polymarket.com/developers/gamma-markets-api/gamma-structure
//! - Gamma Endpoints: https://docs.polymarket.com/developers/gamma-markets-api/markets

pub mod board;
mod client;
pub mod rank;
pub mod resolver;
pub mod search;

pub use board::{top_markets_from_events, TopMarketsCache};
pub use client::GammaClient;
pub use rank::{RankPolicy, Ranker, SubstringRanker};
pub use resolver::MarketResolver;
pub use search::{CatalogSearch, ExaSearch, GammaSearch};
