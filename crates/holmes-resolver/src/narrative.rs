//! Briefing generation
//!
//! One templated LLM call over the user's text and the best-ranked market.
//! Failures are not hidden: the error text becomes the report.

use tracing::{info, warn};

use crate::llm::TextGenerator;
use crate::types::MarketCandidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
}

/// Chinese if any CJK unified ideograph appears, English otherwise
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)) {
        Language::Chinese
    } else {
        Language::English
    }
}

/// Whole dollars with thousands separators, e.g. 1234567.8 -> "1,234,568"
pub fn format_volume(volume: f64) -> String {
    let digits = format!("{:.0}", volume.max(0.0));
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// "[Market Data]" line for the prompt
pub fn market_context(candidates: &[MarketCandidate]) -> String {
    match candidates.first() {
        Some(m) => format!(
            "Target: {} | Odds: {} | Volume: ${}",
            m.title,
            m.odds_display,
            format_volume(m.volume)
        ),
        None => "No specific prediction market found.".to_string(),
    }
}

pub fn build_prompt(user_input: &str, candidates: &[MarketCandidate]) -> String {
    let (role, lang_instruction) = match detect_language(user_input) {
        Language::Chinese => (
            "你现在是 **Be Holmes**，一位极度理性、只相信数据和博弈论的顶级宏观对冲基金经理。",
            "IMPORTANT: Respond in **CHINESE (中文)**.",
        ),
        Language::English => (
            "You are **Be Holmes**, a legendary Wall Street Macro Hedge Fund Manager. Rational, cynical, and data-driven.",
            "IMPORTANT: Respond in **ENGLISH**.",
        ),
    };

    format!(
        "{role}\n\
         [Intel]: \"{intel}\"\n\
         [Market Data]: {market}\n\
         {lang_instruction}\n\
         \n\
         **MISSION: DECODE ALPHA.**\n\
         **Analysis Framework:**\n\
         1. **Priced-in Check**\n\
         2. **Bluff vs Reality**\n\
         3. **Verdict**\n\
         \n\
         Output as a concise professional briefing.\n",
        intel = user_input,
        market = market_context(candidates),
    )
}

/// Writes the briefing for a resolved query
pub struct Analyst<G> {
    model: G,
}

impl<G: TextGenerator> Analyst<G> {
    pub fn new(model: G) -> Self {
        Self { model }
    }

    /// Markdown briefing, or "AI Error: ..." when the model call fails
    pub async fn report(&self, user_input: &str, candidates: &[MarketCandidate]) -> String {
        let prompt = build_prompt(user_input, candidates);
        match self.model.generate(&prompt).await {
            Ok(text) => {
                info!("Briefing generated ({} chars)", text.chars().count());
                text
            }
            Err(e) => {
                warn!("Briefing generation failed: {}", e);
                format!("AI Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Disabled;

    fn candidate() -> MarketCandidate {
        MarketCandidate {
            title: "Fed rate cut in March?".to_string(),
            slug: "fed-march".to_string(),
            odds_display: "Yes: 65.0% | No: 35.0%".to_string(),
            volume: 1_234_567.8,
        }
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("美联储降息"), Language::Chinese);
        assert_eq!(detect_language("Fed cuts rates"), Language::English);
        assert_eq!(detect_language("Fed 降息"), Language::Chinese);
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(0.0), "0");
        assert_eq!(format_volume(999.4), "999");
        assert_eq!(format_volume(1000.0), "1,000");
        assert_eq!(format_volume(1_234_567.8), "1,234,568");
    }

    #[test]
    fn test_prompt_with_market() {
        let prompt = build_prompt("Fed cuts rates", &[candidate()]);
        assert!(prompt.contains("[Intel]: \"Fed cuts rates\""));
        assert!(prompt.contains(
            "Target: Fed rate cut in March? | Odds: Yes: 65.0% | No: 35.0% | Volume: $1,234,568"
        ));
        assert!(prompt.contains("Respond in **ENGLISH**"));
        assert!(prompt.contains("Bluff vs Reality"));
    }

    #[test]
    fn test_prompt_without_market() {
        let prompt = build_prompt("美联储降息", &[]);
        assert!(prompt.contains("No specific prediction market found."));
        assert!(prompt.contains("CHINESE"));
    }

    #[test]
    fn test_report_leaks_error() {
        let analyst = Analyst::new(Disabled);
        let report = tokio_test::block_on(analyst.report("anything", &[]));
        assert_eq!(report, "AI Error: no language model configured");
    }
}
