//! Data types for Gamma API payloads and resolver output
//!
//! # Design Principles
//! 1. Every Gamma field is optional - a missing field never fails a record
//! 2. Records are decoded one at a time; a malformed record is dropped, not the whole page
//! 3. `outcomes` / `outcomePrices` arrive either as JSON arrays or as stringified
//!    JSON arrays, with string or numeric elements. Custom deserializers handle both.
//! 4. `MarketCandidate` is only built through `normalize`, which enforces its invariants
//!
//! # Sources
//! - Gamma Structure: https://docs.polymarket.com/developers/gamma-markets-api/gamma-structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// ============================================================================
// Scalar helpers
// ============================================================================

/// A JSON scalar the Gamma API may send as either a string or a number
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    /// Numeric value, if the scalar parses as a finite float
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Text(s) => s.trim().parse::<f64>().ok()?,
            Scalar::Number(n) => n.as_f64()?,
        };
        value.is_finite().then_some(value)
    }

    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

/// Deserialize a list that may be a JSON array, a stringified JSON array, or null
/// e.g., "[\"Yes\", \"No\"]" -> vec!["Yes", "No"]
///       [0.65, 0.35]         -> vec!["0.65", "0.35"]
fn deserialize_flexible_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{Error, SeqAccess, Visitor};

    struct FlexibleListVisitor;

    impl<'de> Visitor<'de> for FlexibleListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a JSON array, a stringified JSON array, or null")
        }

        fn visit_str<E: Error>(self, s: &str) -> Result<Self::Value, E> {
            if s.trim().is_empty() {
                return Ok(Vec::new());
            }
            let items: Vec<Scalar> = serde_json::from_str(s)
                .map_err(|e| E::custom(format!("Invalid JSON array '{}': {}", s, e)))?;
            Ok(items.into_iter().map(Scalar::into_text).collect())
        }

        fn visit_string<E: Error>(self, s: String) -> Result<Self::Value, E> {
            self.visit_str(&s)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(item) = seq.next_element::<Scalar>()? {
                items.push(item.into_text());
            }
            Ok(items)
        }

        fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(FlexibleListVisitor)
}

/// Decode a list of raw JSON records, dropping the ones that don't fit `T`
pub fn decode_records<T: serde::de::DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<T>(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Dropping unparseable record: {}", e);
                None
            }
        })
        .collect()
}

fn deserialize_records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(decode_records(raw.unwrap_or_default()))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Gamma API Types
// ============================================================================

/// Gamma market record, from GET /markets, GET /events (nested) or /public-search
/// Source: https://gamma-api.polymarket.com
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    /// Unique market identifier
    #[serde(default)]
    pub id: Option<String>,

    /// URL-friendly market name
    #[serde(default)]
    pub slug: Option<String>,

    /// Legacy slug field still returned by some endpoints
    #[serde(default, rename = "market_slug")]
    pub market_slug: Option<String>,

    /// Market question
    #[serde(default)]
    pub question: Option<String>,

    /// Title (set on event-shaped records)
    #[serde(default)]
    pub title: Option<String>,

    /// Outcome labels (e.g., ["Yes", "No"])
    #[serde(default, deserialize_with = "deserialize_flexible_list")]
    pub outcomes: Vec<String>,

    /// Outcome prices in [0, 1], parallel to `outcomes`
    #[serde(default, deserialize_with = "deserialize_flexible_list")]
    pub outcome_prices: Vec<String>,

    /// Lifetime volume (string or number)
    #[serde(default)]
    pub volume: Option<Scalar>,

    /// Numeric copy of `volume` when the API provides it
    #[serde(default)]
    pub volume_num: Option<Scalar>,

    #[serde(default)]
    pub closed: Option<bool>,

    #[serde(default)]
    pub archived: Option<bool>,

    /// Market end time (ISO 8601)
    #[serde(default)]
    pub end_date: Option<String>,
}

impl GammaMarket {
    /// Slug usable as the candidate identity
    pub fn identity(&self) -> Option<&str> {
        [self.slug.as_deref(), self.market_slug.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// Volume as a non-negative float; 0 when absent or unparseable
    pub fn volume_value(&self) -> f64 {
        self.volume_num
            .as_ref()
            .and_then(Scalar::as_f64)
            .or_else(|| self.volume.as_ref().and_then(Scalar::as_f64))
            .map(|v| v.max(0.0))
            .unwrap_or(0.0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed == Some(true)
    }

    pub fn is_archived(&self) -> bool {
        self.archived == Some(true)
    }

    /// End date parsed as UTC; None if absent or not RFC 3339
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_date.as_deref().and_then(parse_timestamp)
    }

    /// True when the market has a parseable end date strictly before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time().is_some_and(|end| end < now)
    }

    /// Whether the record carries any outcome prices
    pub fn has_prices(&self) -> bool {
        !self.outcome_prices.is_empty()
    }
}

/// Gamma event record, from GET /events or /public-search
/// An event groups one or more markets under a shared title.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaEvent {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub closed: Option<bool>,

    #[serde(default)]
    pub end_date: Option<String>,

    #[serde(default)]
    pub volume: Option<Scalar>,

    /// Nested markets, decoded one by one
    #[serde(default, deserialize_with = "deserialize_records")]
    pub markets: Vec<GammaMarket>,
}

/// Response body of GET /public-search
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PublicSearchResponse {
    #[serde(default, deserialize_with = "deserialize_records")]
    pub events: Vec<GammaEvent>,
}

// ============================================================================
// Resolver Output Types
// ============================================================================

/// A prediction market judged relevant to a query
///
/// Invariants: `volume >= 0`; `odds_display` is "Label: NN.N%" pairs joined
/// by " | ", or "N/A".
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MarketCandidate {
    pub title: String,
    pub slug: String,
    pub odds_display: String,
    pub volume: f64,
}

/// Format parallel outcome/price lists as "Yes: 65.0% | No: 35.0%"
/// Pairs whose price does not parse are skipped.
pub fn format_odds(outcomes: &[String], prices: &[String]) -> String {
    let pairs: Vec<String> = outcomes
        .iter()
        .zip(prices)
        .filter_map(|(label, price)| {
            let p = price.trim().parse::<f64>().ok().filter(|p| p.is_finite())?;
            Some(format!("{}: {:.1}%", label, p * 100.0))
        })
        .collect();

    if pairs.is_empty() {
        "N/A".to_string()
    } else {
        pairs.join(" | ")
    }
}

/// Build a candidate from a raw Gamma market
/// Returns None when the record has no usable slug.
pub fn normalize(market: &GammaMarket) -> Option<MarketCandidate> {
    let slug = market.identity()?.to_string();

    let title = [market.question.as_deref(), market.title.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    Some(MarketCandidate {
        title,
        slug,
        odds_display: format_odds(&market.outcomes, &market.outcome_prices),
        volume: market.volume_value(),
    })
}

/// Result of one resolver run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Resolution {
    /// Term actually sent to the catalog
    pub query: String,
    /// Ranked candidates, best first
    pub candidates: Vec<MarketCandidate>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Best-ranked candidate, if any
    pub fn top(&self) -> Option<&MarketCandidate> {
        self.candidates.first()
    }
}

/// Entry on the top-markets board
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopMarket {
    pub title: String,
    pub slug: String,
    /// Implied "Yes" probability, whole percent
    pub yes: u32,
    /// 100 - yes
    pub no: u32,
}
