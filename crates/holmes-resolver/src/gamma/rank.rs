//! Candidate ranking
//!
//! Relevance scoring sits behind the `Ranker` trait so the substring
//! heuristic can be replaced (lexical, embedding-based) without touching the
//! fetch/filter pipeline.

use serde::{Deserialize, Serialize};

use crate::types::MarketCandidate;

/// Scoring policy for `SubstringRanker`
///
/// Thresholds are a product decision; keep them configurable.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RankPolicy {
    /// Awarded when the title contains the whole search term
    pub full_match_points: i64,
    /// Awarded per search-term token found in the title
    pub token_match_points: i64,
    /// Tokens shorter than this (in chars) are ignored
    pub min_token_chars: usize,
    /// Volume strictly above this earns `volume_bonus`
    pub volume_threshold: f64,
    pub volume_bonus: i64,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            full_match_points: 10,
            token_match_points: 2,
            min_token_chars: 2,
            volume_threshold: 1000.0,
            volume_bonus: 1,
        }
    }
}

/// Scores candidates against a search term
pub trait Ranker: Send + Sync {
    /// Relevance score, higher is better
    fn score(&self, candidate: &MarketCandidate, term: &str) -> i64;

    /// Sort candidates by descending score; ties keep input order
    fn rank(&self, candidates: Vec<MarketCandidate>, term: &str) -> Vec<MarketCandidate> {
        let mut scored: Vec<(i64, MarketCandidate)> =
            candidates.into_iter().map(|c| (self.score(&c, term), c)).collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, c)| c).collect()
    }
}

/// Case-insensitive substring containment heuristic
#[derive(Clone, Debug, Default)]
pub struct SubstringRanker {
    policy: RankPolicy,
}

impl SubstringRanker {
    pub fn new(policy: RankPolicy) -> Self {
        Self { policy }
    }
}

impl Ranker for SubstringRanker {
    fn score(&self, candidate: &MarketCandidate, term: &str) -> i64 {
        let title = candidate.title.to_lowercase();
        let term = term.trim().to_lowercase();
        let mut score = 0;

        if !term.is_empty() && title.contains(&term) {
            score += self.policy.full_match_points;
        }

        for token in term.split_whitespace() {
            if token.chars().count() >= self.policy.min_token_chars && title.contains(token) {
                score += self.policy.token_match_points;
            }
        }

        if candidate.volume > self.policy.volume_threshold {
            score += self.policy.volume_bonus;
        }

        score
    }
}
