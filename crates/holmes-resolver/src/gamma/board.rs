//! Top-markets board
//!
//! Highest-volume open events with their Yes/No implied odds, served from a
//! short-lived read-through cache. The cache is a convenience; a failed
//! fetch yields an empty board and is not cached.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::GammaClient;
use crate::types::{GammaEvent, TopMarket};

/// Whole-percent probability, truncated like the board has always shown it
fn to_percent(price: f64) -> u32 {
    (price.clamp(0.0, 1.0) * 100.0) as u32
}

/// Board entry for one event, if it has a priced open market
///
/// Uses the event's highest-volume open market. For Yes/No markets the Yes
/// price is read at the "Yes" index; for multi-outcome markets the highest
/// outcome price is shown.
pub fn top_market_for_event(event: &GammaEvent) -> Option<TopMarket> {
    let market = event
        .markets
        .iter()
        .filter(|m| !m.is_closed() && m.has_prices())
        // first of equal-volume markets wins
        .min_by(|a, b| b.volume_value().total_cmp(&a.volume_value()))?;

    if market.outcomes.is_empty() || market.outcomes.len() != market.outcome_prices.len() {
        return None;
    }

    let prices: Vec<f64> = market
        .outcome_prices
        .iter()
        .map(|p| p.trim().parse::<f64>().ok().filter(|p| p.is_finite()))
        .collect::<Option<Vec<_>>>()?;

    let yes_index = market.outcomes.iter().position(|o| o == "Yes");
    let has_no = market.outcomes.iter().any(|o| o == "No");

    let yes = match (yes_index, has_no) {
        (Some(i), true) => to_percent(prices[i]),
        _ => to_percent(prices.iter().copied().fold(0.0, f64::max)),
    };

    Some(TopMarket {
        title: event.title.clone().unwrap_or_else(|| "Unknown Event".to_string()),
        slug: event.slug.clone().unwrap_or_default(),
        yes,
        no: 100 - yes,
    })
}

/// Board entries for a page of events, in API order
pub fn top_markets_from_events(events: &[GammaEvent]) -> Vec<TopMarket> {
    events.iter().filter_map(top_market_for_event).collect()
}

/// Read-through TTL cache for the top-markets board
pub struct TopMarketsCache {
    gamma: GammaClient,
    limit: u32,
    ttl: Duration,
    entry: Mutex<Option<(Instant, Vec<TopMarket>)>>,
}

impl TopMarketsCache {
    pub fn new(gamma: GammaClient, limit: u32, ttl: Duration) -> Self {
        Self { gamma, limit, ttl, entry: Mutex::new(None) }
    }

    /// Cached board if fresh, otherwise refetch
    pub async fn get(&self) -> Vec<TopMarket> {
        let mut entry = self.entry.lock().await;

        if let Some((fetched_at, board)) = entry.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                debug!("Top markets served from cache ({} entries)", board.len());
                return board.clone();
            }
        }

        match self.gamma.top_events(self.limit).await {
            Ok(events) => {
                let board = top_markets_from_events(&events);
                info!("Loaded {} top markets", board.len());
                *entry = Some((Instant::now(), board.clone()));
                board
            }
            Err(e) => {
                warn!("Top markets fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> GammaEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_yes_read_at_its_index() {
        // "No" listed first must not flip the odds
        let e = event(json!({
            "title": "Shutdown?",
            "slug": "shutdown",
            "markets": [{"outcomes": "[\"No\", \"Yes\"]", "outcomePrices": "[\"0.3\", \"0.7\"]"}]
        }));
        let top = top_market_for_event(&e).unwrap();
        assert_eq!((top.yes, top.no), (70, 30));
        assert_eq!(top.slug, "shutdown");
    }

    #[test]
    fn test_multi_outcome_uses_max_price() {
        let e = event(json!({
            "title": "Range",
            "markets": [{
                "outcomes": ["<250k", "250k-500k", ">500k"],
                "outcomePrices": ["0.2", "0.55", "0.25"]
            }]
        }));
        let top = top_market_for_event(&e).unwrap();
        assert_eq!((top.yes, top.no), (55, 45));
    }

    #[test]
    fn test_highest_volume_open_market_wins() {
        let e = event(json!({
            "title": "Election",
            "markets": [
                {"outcomes": ["Yes", "No"], "outcomePrices": ["0.9", "0.1"], "volume": "999999", "closed": true},
                {"outcomes": ["Yes", "No"], "outcomePrices": ["0.4", "0.6"], "volume": "50"},
                {"outcomes": ["Yes", "No"], "outcomePrices": ["0.25", "0.75"], "volume": "5000"},
                {"outcomes": ["Yes", "No"], "volume": "1000000"}
            ]
        }));
        let top = top_market_for_event(&e).unwrap();
        assert_eq!(top.yes, 25);
    }

    #[test]
    fn test_volume_tie_keeps_first_market() {
        let e = event(json!({
            "title": "Unvolumed",
            "markets": [
                {"outcomes": ["Yes", "No"], "outcomePrices": ["0.8", "0.2"]},
                {"outcomes": ["Yes", "No"], "outcomePrices": ["0.1", "0.9"]}
            ]
        }));
        let top = top_market_for_event(&e).unwrap();
        assert_eq!((top.yes, top.no), (80, 20));
    }

    #[test]
    fn test_skips_mismatched_or_empty() {
        let mismatched = event(json!({
            "markets": [{"outcomes": ["Yes", "No"], "outcomePrices": ["0.5"]}]
        }));
        assert!(top_market_for_event(&mismatched).is_none());

        let no_markets = event(json!({"title": "Empty"}));
        assert!(top_market_for_event(&no_markets).is_none());

        assert!(top_markets_from_events(&[mismatched, no_markets]).is_empty());
    }
}
