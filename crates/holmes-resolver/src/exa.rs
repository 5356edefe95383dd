//! Exa neural search client
//!
//! Used to find polymarket.com event/market pages semantically related to a
//! query. Only the page URLs matter; market data comes from Gamma.
//!
//! # Endpoint
//! - POST /search (header `x-api-key`)
//!
//! # Source
//! - https://docs.exa.ai/reference/search

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ResolverConfig;

/// Results requested per search
pub const EXA_NUM_RESULTS: u32 = 4;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: String,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'a str,
    include_domains: [&'a str; 1],
}

/// Single search hit
#[derive(Clone, Debug, Deserialize)]
pub struct ExaResult {
    pub url: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

/// Exa REST client
#[derive(Clone)]
pub struct ExaClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExaClient {
    pub fn with_base_url(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client =
            Client::builder().timeout(timeout).build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &ResolverConfig, api_key: &str) -> Result<Self> {
        Self::with_base_url(&config.exa_base_url, api_key, config.request_timeout())
    }

    /// Neural search restricted to polymarket.com
    pub async fn search(&self, term: &str) -> Result<Vec<ExaResult>> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            query: format!("prediction market about {}", term),
            num_results: EXA_NUM_RESULTS,
            search_type: "neural",
            include_domains: ["polymarket.com"],
        };
        debug!("POST {} query={:?}", url, body.query);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} for {}: {}", status, url, body);
        }

        let parsed: SearchResponse =
            response.json().await.context("Failed to parse Exa search response")?;
        Ok(parsed.results)
    }
}

/// Extract the slug from a polymarket.com event or market URL
/// e.g., "https://polymarket.com/event/fed-decision-in-march?tid=1" -> Some("fed-decision-in-march")
pub fn polymarket_slug(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    let host = url.host_str()?;
    if host != "polymarket.com" && !host.ends_with(".polymarket.com") {
        return None;
    }

    let mut segments = url.path_segments()?;
    match segments.next()? {
        "event" | "market" => {}
        _ => return None,
    }
    segments.next().filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_event_url() {
        assert_eq!(
            polymarket_slug("https://polymarket.com/event/fed-decision-in-march?tid=1"),
            Some("fed-decision-in-march".to_string())
        );
        assert_eq!(
            polymarket_slug("https://www.polymarket.com/market/btc-100k/extra"),
            Some("btc-100k".to_string())
        );
    }

    #[test]
    fn test_slug_rejects_other_pages() {
        assert_eq!(polymarket_slug("https://polymarket.com/leaderboard"), None);
        assert_eq!(polymarket_slug("https://polymarket.com/event/"), None);
        assert_eq!(polymarket_slug("https://notpolymarket.com/event/x"), None);
        assert_eq!(polymarket_slug("not a url"), None);
    }

    #[test]
    fn test_request_shape() {
        let body = SearchRequest {
            query: "prediction market about fed".to_string(),
            num_results: EXA_NUM_RESULTS,
            search_type: "neural",
            include_domains: ["polymarket.com"],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["numResults"], 4);
        assert_eq!(json["type"], "neural");
        assert_eq!(json["includeDomains"][0], "polymarket.com");
    }
}
