//! Gamma API REST client
//!
//! Base URL: https://gamma-api.polymarket.com
//!
//! # Endpoints
//! - GET /public-search?q= - Free-text search over events (and their markets)
//! - GET /events?slug= - Event by slug, with nested markets
//! - GET /markets?slug= - Market by slug (fallback when the slug is a market)
//! - GET /events?sort=volume&closed=false - Open events by volume
//!
//! # Source
//! - https://docs.polymarket.com/developers/gamma-markets-api/markets

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ResolverConfig;
use crate::types::{decode_records, GammaEvent, GammaMarket, PublicSearchResponse};
use crate::GAMMA_API_BASE;

/// Gamma rejects some requests without a browser-looking user agent
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Gamma API REST client
#[derive(Clone)]
pub struct GammaClient {
    client: Client,
    base_url: String,
}

impl GammaClient {
    /// Create a new Gamma client with default base URL
    pub fn new() -> Result<Self> {
        Self::with_base_url(GAMMA_API_BASE, Duration::from_secs(5))
    }

    /// Create a client from resolver configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        Self::with_base_url(&config.gamma_base_url, config.request_timeout())
    }

    /// Create a new Gamma client with custom base URL and per-request timeout
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(REFERER, HeaderValue::from_static("https://polymarket.com/"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("Invalid Gamma URL: {}{}", self.base_url, path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// GET request returning raw JSON
    async fn get_json(&self, url: Url) -> Result<Value> {
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await.context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} for {}: {}", status, url, body);
        }

        response.json().await.with_context(|| format!("Failed to parse JSON from {}", url))
    }

    /// GET /public-search?q={query} - Free-text event search
    pub async fn public_search(&self, query: &str, limit: u32) -> Result<Vec<GammaEvent>> {
        let limit = limit.to_string();
        let url = self.url("/public-search", &[("q", query), ("limit_per_type", limit.as_str())])?;
        let json = self.get_json(url).await?;

        let response: PublicSearchResponse =
            serde_json::from_value(json).context("Failed to parse public-search response")?;
        Ok(response.events)
    }

    /// GET /events?slug={slug} - Event lookup by slug
    /// Returns an empty vec when nothing matches
    pub async fn events_by_slug(&self, slug: &str) -> Result<Vec<GammaEvent>> {
        let url = self.url("/events", &[("slug", slug)])?;
        let json = self.get_json(url).await?;
        decode_list(json, "event list")
    }

    /// GET /markets?slug={slug} - Market lookup by slug
    ///
    /// Note: usually an array, but single-object responses are accepted too.
    pub async fn markets_by_slug(&self, slug: &str) -> Result<Vec<GammaMarket>> {
        let url = self.url("/markets", &[("slug", slug)])?;
        let json = self.get_json(url).await?;
        decode_list(json, "market list")
    }

    /// GET /events?limit={limit}&sort=volume&closed=false - Open events by volume
    pub async fn top_events(&self, limit: u32) -> Result<Vec<GammaEvent>> {
        let limit = limit.to_string();
        let url =
            self.url("/events", &[("limit", limit.as_str()), ("sort", "volume"), ("closed", "false")])?;
        let json = self.get_json(url).await?;
        decode_list(json, "event list")
    }
}

/// Decode an array (or lone object) of records, dropping the malformed ones
fn decode_list<T: serde::de::DeserializeOwned>(json: Value, what: &str) -> Result<Vec<T>> {
    match json {
        Value::Array(items) => Ok(decode_records(items)),
        Value::Object(_) => Ok(decode_records(vec![json])),
        other => anyhow::bail!("Expected {} but got {}", what, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = GammaClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_custom_base_url() {
        let client =
            GammaClient::with_base_url("https://example.com/", Duration::from_secs(3)).unwrap();
        assert_eq!(client.base_url(), "https://example.com");
    }

    #[test]
    fn test_query_is_encoded() {
        let client = GammaClient::new().unwrap();
        let url = client.url("/public-search", &[("q", "fed rate cut & inflation")]).unwrap();
        assert_eq!(url.path(), "/public-search");
        assert_eq!(url.query(), Some("q=fed+rate+cut+%26+inflation"));
    }

    #[test]
    fn test_decode_list_shapes() {
        let list: Vec<GammaMarket> = decode_list(json!([{"slug": "a"}, {"slug": "b"}]), "x").unwrap();
        assert_eq!(list.len(), 2);

        let single: Vec<GammaMarket> = decode_list(json!({"slug": "a"}), "x").unwrap();
        assert_eq!(single.len(), 1);

        assert!(decode_list::<GammaMarket>(json!("nope"), "x").is_err());
    }
}
