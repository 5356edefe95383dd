//! Market Resolver - free text to ranked prediction-market candidates
//!
//! # Design Principles
//! 1. No candidates is a valid answer, never an error
//! 2. The catalog is the source of truth; odds and volume are not re-validated
//! 3. Every upstream failure degrades to "absent" and is logged
//!
//! # Algorithm
//! 1. Extract English search keywords with the LLM (fallback: the input text)
//! 2. Query the catalog source
//! 3. Drop closed, archived, expired and denylisted markets
//! 4. Normalize to `MarketCandidate`, dedupe by slug (first wins)
//! 5. Rank with the configured `Ranker`, keep the top `max_candidates`

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::rank::{Ranker, SubstringRanker};
use super::search::CatalogSearch;
use crate::config::ResolverConfig;
use crate::llm::TextGenerator;
use crate::types::{normalize, GammaMarket, MarketCandidate, Resolution};

/// Keyword-extraction prompt
pub fn keyword_prompt(text: &str) -> String {
    format!(
        "Task: Extract English search keywords for Polymarket. Input: \"{}\". Output: Keywords only.",
        text
    )
}

/// Keep markets that are open, not archived, not past their end date and not denylisted
///
/// Applying this twice gives the same result as applying it once.
pub fn filter_open(
    markets: Vec<GammaMarket>,
    now: DateTime<Utc>,
    config: &ResolverConfig,
) -> Vec<GammaMarket> {
    markets
        .into_iter()
        .filter(|m| {
            if m.is_closed() || m.is_archived() || m.is_expired(now) {
                return false;
            }
            !m.identity().is_some_and(|slug| config.is_denylisted(slug))
        })
        .collect()
}

/// Keep the first candidate for each slug, preserving order
pub fn dedup_by_slug(candidates: Vec<MarketCandidate>) -> Vec<MarketCandidate> {
    let mut seen = std::collections::HashSet::new();
    candidates.into_iter().filter(|c| seen.insert(c.slug.clone())).collect()
}

/// Market Resolver
/// Stateless: every call is an independent extract -> fetch -> filter -> rank run
pub struct MarketResolver<S, G, R = SubstringRanker> {
    source: S,
    extractor: G,
    ranker: R,
    config: ResolverConfig,
}

impl<S: CatalogSearch, G: TextGenerator> MarketResolver<S, G, SubstringRanker> {
    /// Create a resolver using the substring heuristic from `config.rank`
    pub fn new(source: S, extractor: G, config: ResolverConfig) -> Self {
        let ranker = SubstringRanker::new(config.rank.clone());
        Self { source, extractor, ranker, config }
    }
}

impl<S: CatalogSearch, G: TextGenerator, R: Ranker> MarketResolver<S, G, R> {
    /// Create a resolver with a custom ranker
    pub fn with_ranker(source: S, extractor: G, ranker: R, config: ResolverConfig) -> Self {
        Self { source, extractor, ranker, config }
    }

    /// Ask the LLM for English search keywords
    ///
    /// Any failure, or an empty answer, returns `text` unchanged. No retries.
    pub async fn extract_search_term(&self, text: &str) -> String {
        match self.extractor.generate(&keyword_prompt(text)).await {
            Ok(answer) => {
                let term = answer.trim().trim_matches('"').trim();
                if term.is_empty() {
                    debug!("Keyword extraction returned nothing, using input");
                    text.to_string()
                } else {
                    debug!("Extracted search term: {:?}", term);
                    term.to_string()
                }
            }
            Err(e) => {
                warn!("Keyword extraction failed, using input: {}", e);
                text.to_string()
            }
        }
    }

    /// Query the catalog and return open, deduplicated candidates in API order
    ///
    /// Blank terms return nothing without calling the catalog; catalog errors
    /// return nothing.
    pub async fn lookup_candidates(&self, term: &str) -> Vec<MarketCandidate> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }

        let markets = match self.source.search(term).await {
            Ok(markets) => markets,
            Err(e) => {
                warn!("Catalog search ({}) failed for {:?}: {}", self.source.name(), term, e);
                return Vec::new();
            }
        };
        let fetched = markets.len();

        let open = filter_open(markets, Utc::now(), &self.config);
        let candidates = dedup_by_slug(open.iter().filter_map(normalize).collect());

        debug!(
            "Catalog ({}) returned {} markets, {} candidates after filter/dedup",
            self.source.name(),
            fetched,
            candidates.len()
        );
        candidates
    }

    /// Order candidates by relevance to `term`, best first
    pub fn rank_candidates(&self, candidates: Vec<MarketCandidate>, term: &str) -> Vec<MarketCandidate> {
        self.ranker.rank(candidates, term)
    }

    /// Full pipeline for one piece of user text
    pub async fn resolve(&self, text: &str) -> Resolution {
        if text.trim().is_empty() {
            return Resolution::default();
        }

        let query = self.extract_search_term(text).await;

        info!("Resolving markets for query {:?}", query);

        let candidates = self.lookup_candidates(&query).await;
        let mut candidates = self.rank_candidates(candidates, &query);
        candidates.truncate(self.config.max_candidates);

        match candidates.first() {
            Some(top) => info!("Resolved {} candidates, top: {}", candidates.len(), top.slug),
            None => info!("No market candidates for query {:?}", query),
        }

        Resolution { query, candidates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Disabled;
    use anyhow::Result;
    use serde_json::json;
    use std::sync::Mutex;

    /// Catalog that records queries and replays fixed records
    struct FakeCatalog {
        records: Vec<GammaMarket>,
        fail: bool,
        queries: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn new(records: serde_json::Value) -> Self {
            Self {
                records: serde_json::from_value(records).unwrap(),
                fail: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self { records: Vec::new(), fail: true, queries: Mutex::new(Vec::new()) }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl CatalogSearch for &FakeCatalog {
        async fn search(&self, term: &str) -> Result<Vec<GammaMarket>> {
            self.queries.lock().unwrap().push(term.to_string());
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.records.clone())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct Answer(&'static str);

    impl TextGenerator for Answer {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn markets(value: serde_json::Value) -> Vec<GammaMarket> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_filter_open_is_idempotent() {
        let config = ResolverConfig::default();
        let now = Utc::now();
        let input = markets(json!([
            {"slug": "open-a"},
            {"slug": "closed-b", "closed": true},
            {"slug": "login"},
            {"slug": "old-c", "endDate": "2020-01-01T00:00:00Z"},
            {"slug": "archived-d", "archived": true},
            {"slug": "open-e", "closed": false, "endDate": "2999-01-01T00:00:00Z"}
        ]));

        let once = filter_open(input, now, &config);
        let slugs: Vec<_> = once.iter().filter_map(|m| m.identity()).collect();
        assert_eq!(slugs, vec!["open-a", "open-e"]);

        let twice = filter_open(once.clone(), now, &config);
        let again: Vec<_> = twice.iter().filter_map(|m| m.identity()).collect();
        assert_eq!(slugs, again);
    }

    #[test]
    fn test_lookup_dedupes_by_slug() {
        let catalog = FakeCatalog::new(json!([
            {"slug": "x", "question": "first"},
            {"slug": "y", "question": "other"},
            {"slug": "x", "question": "second"}
        ]));
        let resolver = MarketResolver::new(&catalog, Disabled, ResolverConfig::default());

        let candidates = tokio_test::block_on(resolver.lookup_candidates("anything"));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "first");
    }

    #[test]
    fn test_failed_extraction_falls_back_to_input() {
        let catalog = FakeCatalog::new(json!([]));
        let resolver = MarketResolver::new(&catalog, Disabled, ResolverConfig::default());

        let resolution = tokio_test::block_on(resolver.resolve("美联储三月降息"));
        assert_eq!(resolution.query, "美联储三月降息");
        assert_eq!(catalog.queries(), vec!["美联储三月降息"]);
    }

    #[test]
    fn test_empty_extraction_falls_back_to_input() {
        let catalog = FakeCatalog::new(json!([]));
        let resolver = MarketResolver::new(&catalog, Answer("  \n"), ResolverConfig::default());

        tokio_test::block_on(resolver.resolve("Fed cuts rates"));
        assert_eq!(catalog.queries(), vec!["Fed cuts rates"]);
    }

    #[test]
    fn test_extracted_term_is_used() {
        let catalog = FakeCatalog::new(json!([]));
        let resolver =
            MarketResolver::new(&catalog, Answer("\"Fed rate cut\"\n"), ResolverConfig::default());

        let resolution = tokio_test::block_on(resolver.resolve("美联储三月降息"));
        assert_eq!(resolution.query, "Fed rate cut");
        assert_eq!(catalog.queries(), vec!["Fed rate cut"]);
    }

    #[test]
    fn test_blank_input_returns_empty() {
        let catalog = FakeCatalog::new(json!([{"slug": "x"}]));
        let resolver = MarketResolver::new(&catalog, Answer("x"), ResolverConfig::default());

        assert!(tokio_test::block_on(resolver.resolve("   \t")).is_empty());
        assert!(tokio_test::block_on(resolver.lookup_candidates("")).is_empty());
        assert!(catalog.queries().is_empty());
    }

    #[test]
    fn test_catalog_failure_degrades_to_empty() {
        let catalog = FakeCatalog::failing();
        let resolver = MarketResolver::new(&catalog, Disabled, ResolverConfig::default());

        let resolution = tokio_test::block_on(resolver.resolve("bitcoin"));
        assert!(resolution.is_empty());
        assert_eq!(resolution.query, "bitcoin");
    }

    #[test]
    fn test_resolve_ranks_and_truncates() {
        let catalog = FakeCatalog::new(json!([
            {"slug": "eth", "question": "Ethereum above 5k?", "volume": "10"},
            {"slug": "btc", "question": "Bitcoin above 100k?", "volume": "10"},
            {"slug": "btc-etf", "question": "Bitcoin ETF approved?", "volume": "99999"}
        ]));
        let mut config = ResolverConfig::default();
        config.max_candidates = 2;
        let resolver = MarketResolver::new(&catalog, Answer("bitcoin above"), config);

        let resolution = tokio_test::block_on(resolver.resolve("btc news"));
        let slugs: Vec<_> = resolution.candidates.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["btc", "btc-etf"]);
        assert_eq!(resolution.top().map(|c| c.slug.as_str()), Some("btc"));
    }

    #[test]
    fn test_custom_ranker() {
        struct ByVolume;

        impl Ranker for ByVolume {
            fn score(&self, candidate: &MarketCandidate, _term: &str) -> i64 {
                candidate.volume as i64
            }
        }

        let catalog = FakeCatalog::new(json!([
            {"slug": "small", "question": "bitcoin", "volume": 5},
            {"slug": "big", "question": "other", "volume": 500}
        ]));
        let resolver =
            MarketResolver::with_ranker(&catalog, Disabled, ByVolume, ResolverConfig::default());

        let resolution = tokio_test::block_on(resolver.resolve("bitcoin"));
        assert_eq!(resolution.top().map(|c| c.slug.as_str()), Some("big"));
    }

    #[test]
    fn test_keyword_prompt() {
        let prompt = keyword_prompt("rumor");
        assert!(prompt.contains("Input: \"rumor\""));
        assert!(prompt.ends_with("Keywords only."));
    }
}
