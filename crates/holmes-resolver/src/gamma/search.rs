//! Catalog sources
//!
//! A catalog source turns a search term into raw Gamma market records. It does
//! no filtering beyond what its upstream does; the resolver owns filtering,
//! dedup and ranking.

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::exa::{polymarket_slug, ExaClient};
use crate::gamma::GammaClient;
use crate::types::{GammaEvent, GammaMarket};

/// Search term -> raw market records
#[allow(async_fn_in_trait)]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<GammaMarket>>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Flatten events into their markets
///
/// A market missing its title, `closed` flag or end date inherits the event's.
pub fn flatten_events(events: Vec<GammaEvent>, per_event: Option<usize>) -> Vec<GammaMarket> {
    let mut markets = Vec::new();
    for event in events {
        let take = per_event.unwrap_or(event.markets.len());
        for mut market in event.markets.into_iter().take(take) {
            if market.question.is_none() && market.title.is_none() {
                market.title = event.title.clone();
            }
            if market.closed.is_none() {
                market.closed = event.closed;
            }
            if market.end_date.is_none() {
                market.end_date = event.end_date.clone();
            }
            markets.push(market);
        }
    }
    markets
}

/// Gamma free-text search (GET /public-search)
#[derive(Clone)]
pub struct GammaSearch {
    gamma: GammaClient,
    limit: u32,
}

impl GammaSearch {
    pub fn new(gamma: GammaClient, limit: u32) -> Self {
        Self { gamma, limit }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        Ok(Self::new(GammaClient::from_config(config)?, config.search_limit))
    }
}

impl CatalogSearch for GammaSearch {
    async fn search(&self, term: &str) -> Result<Vec<GammaMarket>> {
        let events = self.gamma.public_search(term, self.limit).await?;
        debug!("Gamma public-search returned {} events", events.len());
        Ok(flatten_events(events, None))
    }

    fn name(&self) -> &str {
        "gamma"
    }
}

/// Exa neural search over polymarket.com, then Gamma detail fetch per slug
#[derive(Clone)]
pub struct ExaSearch {
    exa: ExaClient,
    gamma: GammaClient,
    denylist: Vec<String>,
    per_event: usize,
}

impl ExaSearch {
    pub fn new(exa: ExaClient, gamma: GammaClient, config: &ResolverConfig) -> Self {
        Self {
            exa,
            gamma,
            denylist: config.denylist.clone(),
            per_event: config.detail_markets_per_event,
        }
    }

    fn is_denylisted(&self, slug: &str) -> bool {
        self.denylist.iter().any(|d| d.eq_ignore_ascii_case(slug))
    }

    /// Markets behind a page slug: the event's first markets, else the market itself
    async fn fetch_details(&self, slug: &str) -> Vec<GammaMarket> {
        match self.gamma.events_by_slug(slug).await {
            Ok(events) => {
                let markets = flatten_events(events.into_iter().take(1).collect(), Some(self.per_event));
                if !markets.is_empty() {
                    return markets;
                }
                debug!("No event markets for slug {}, trying /markets", slug);
            }
            Err(e) => debug!("Event lookup failed for slug {}: {}", slug, e),
        }

        match self.gamma.markets_by_slug(slug).await {
            Ok(markets) => markets,
            Err(e) => {
                warn!("Detail fetch failed for slug {}: {}", slug, e);
                Vec::new()
            }
        }
    }
}

impl CatalogSearch for ExaSearch {
    async fn search(&self, term: &str) -> Result<Vec<GammaMarket>> {
        let results = self.exa.search(term).await?;
        debug!("Exa returned {} results", results.len());

        let mut seen: Vec<String> = Vec::new();
        let mut markets = Vec::new();

        for result in results {
            let Some(slug) = polymarket_slug(&result.url) else {
                debug!("Skipping non-market URL: {}", result.url);
                continue;
            };
            if self.is_denylisted(&slug) || seen.contains(&slug) {
                continue;
            }

            let details = self.fetch_details(&slug).await;
            if !details.is_empty() {
                markets.extend(details);
                seen.push(slug);
            }
        }

        Ok(markets)
    }

    fn name(&self) -> &str {
        "exa"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_inherits_event_title() {
        let event: GammaEvent = serde_json::from_value(json!({
            "title": "Fed decision in March",
            "markets": [
                {"slug": "a"},
                {"slug": "b", "question": "Fed cuts 50bps?"},
                {"slug": "c"}
            ]
        }))
        .unwrap();

        let all = flatten_events(vec![event.clone()], None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title.as_deref(), Some("Fed decision in March"));
        assert_eq!(all[1].question.as_deref(), Some("Fed cuts 50bps?"));
        assert!(all[1].title.is_none());

        let limited = flatten_events(vec![event], Some(2));
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_flatten_inherits_event_status() {
        let event: GammaEvent = serde_json::from_value(json!({
            "title": "Old election",
            "closed": true,
            "endDate": "2020-11-03T00:00:00Z",
            "markets": [
                {"slug": "bare"},
                {"slug": "own", "closed": false, "endDate": "2999-01-01T00:00:00Z"}
            ]
        }))
        .unwrap();

        let markets = flatten_events(vec![event], None);
        assert_eq!(markets[0].closed, Some(true));
        assert_eq!(markets[0].end_date.as_deref(), Some("2020-11-03T00:00:00Z"));
        assert_eq!(markets[1].closed, Some(false));
        assert_eq!(markets[1].end_date.as_deref(), Some("2999-01-01T00:00:00Z"));

        let config = ResolverConfig::default();
        let open = crate::gamma::resolver::filter_open(markets, chrono::Utc::now(), &config);
        let slugs: Vec<_> = open.iter().filter_map(|m| m.identity()).collect();
        assert_eq!(slugs, vec!["own"]);
    }
}
