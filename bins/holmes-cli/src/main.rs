//! Holmes CLI
//!
//! Commands:
//! - `resolve`: Map free text to ranked Polymarket candidates (JSON)
//! - `analyze`: Resolve, then ask Gemini for a trading briefing (markdown)
//! - `top`: Top open markets by volume with implied Yes/No odds
//!
//! # Usage
//! ```bash
//! # Candidates via Gamma search, keywords extracted by Gemini
//! GOOGLE_API_KEY=... holmes resolve --text "Fed signals March cut"
//!
//! # Exa neural search, no LLM keyword step
//! EXA_API_KEY=... holmes resolve --source exa --no-llm --text "Fed signals March cut"
//!
//! # Full briefing
//! GOOGLE_API_KEY=... holmes analyze --text "美联储暗示三月降息"
//!
//! # Top markets board
//! holmes top --limit 12
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use holmes_resolver::exa::ExaClient;
use holmes_resolver::gamma::{ExaSearch, GammaClient, GammaSearch, MarketResolver, TopMarketsCache};
use holmes_resolver::llm::{Disabled, GeminiClient, TextGenerator};
use holmes_resolver::narrative::{format_volume, Analyst};
use holmes_resolver::{ApiKeys, Resolution, ResolverConfig};

#[derive(Parser)]
#[command(name = "holmes")]
#[command(about = "Map news to Polymarket markets and decode the alpha")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve free text to ranked market candidates
    Resolve {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Skip LLM keyword extraction and search with the raw text
        #[arg(long, default_value = "false")]
        no_llm: bool,

        /// Output file for Resolution JSON (optional, defaults to stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Resolve, then generate a briefing (requires GOOGLE_API_KEY)
    Analyze {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Show top open markets by volume
    Top {
        /// Number of events to fetch
        #[arg(long, default_value = "12")]
        limit: u32,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    /// Gamma free-text search
    Gamma,
    /// Exa neural search (requires EXA_API_KEY)
    Exa,
}

#[derive(Args)]
struct PipelineArgs {
    /// News, rumor or question to analyze
    #[arg(long)]
    text: String,

    /// Catalog source
    #[arg(long, value_enum, default_value = "gamma")]
    source: Source,

    /// Volume above which a candidate gets the ranking bonus
    #[arg(long)]
    volume_threshold: Option<f64>,

    /// Candidates kept after ranking
    #[arg(long)]
    max_candidates: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Gemini model name
    #[arg(long)]
    model: Option<String>,
}

impl PipelineArgs {
    fn config(&self) -> Result<ResolverConfig> {
        let mut config = ResolverConfig::default();
        if let Some(threshold) = self.volume_threshold {
            config.rank.volume_threshold = threshold;
        }
        if let Some(max) = self.max_candidates {
            config.max_candidates = max;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(model) = &self.model {
            config.gemini_model = model.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let keys = ApiKeys::from_env();

    match cli.command {
        Commands::Resolve { pipeline, no_llm, out } => run_resolve(&keys, pipeline, no_llm, out).await,
        Commands::Analyze { pipeline } => run_analyze(&keys, pipeline).await,
        Commands::Top { limit, json } => run_top(limit, json).await,
    }
}

/// Build the resolver for `source` and run it over `text`
async fn resolve_with<G: TextGenerator>(
    source: Source,
    config: &ResolverConfig,
    keys: &ApiKeys,
    extractor: G,
    text: &str,
) -> Result<Resolution> {
    let resolution = match source {
        Source::Gamma => {
            let search = GammaSearch::from_config(config)?;
            MarketResolver::new(search, extractor, config.clone()).resolve(text).await
        }
        Source::Exa => {
            let exa = ExaClient::from_config(config, keys.require_exa()?)?;
            let search = ExaSearch::new(exa, GammaClient::from_config(config)?, config);
            MarketResolver::new(search, extractor, config.clone()).resolve(text).await
        }
    };
    Ok(resolution)
}

async fn run_resolve(
    keys: &ApiKeys,
    pipeline: PipelineArgs,
    no_llm: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = pipeline.config()?;

    info!("=== Market Resolver ===");
    info!("Source: {:?}", pipeline.source);
    info!("Keyword extraction: {}", if no_llm { "disabled" } else { "enabled" });
    info!("Keys: {:?}", keys);

    let resolution = if no_llm {
        resolve_with(pipeline.source, &config, keys, Disabled, &pipeline.text).await?
    } else {
        let gemini = GeminiClient::from_config(&config, keys.require_google()?)?;
        resolve_with(pipeline.source, &config, keys, gemini, &pipeline.text).await?
    };

    if resolution.is_empty() {
        warn!("No market candidates found for query {:?}", resolution.query);
    }

    let json_output = serde_json::to_string_pretty(&resolution)?;

    // Write to file or stdout
    if let Some(out_path) = out {
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&out_path, &json_output).await?;
        info!("Output written to: {}", out_path.display());
    } else {
        println!("{}", json_output);
    }

    Ok(())
}

async fn run_analyze(keys: &ApiKeys, pipeline: PipelineArgs) -> Result<()> {
    let config = pipeline.config()?;
    let gemini = GeminiClient::from_config(&config, keys.require_google()?)?;

    info!("=== Holmes Analysis ===");
    info!("Source: {:?}, model: {}", pipeline.source, gemini.model());

    let resolution = resolve_with(pipeline.source, &config, keys, &gemini, &pipeline.text).await?;
    let report = Analyst::new(&gemini).report(&pipeline.text, &resolution.candidates).await;

    match resolution.top() {
        Some(top) => {
            println!("## {}", top.title);
            println!();
            println!("- Implied odds: {}", top.odds_display);
            println!("- Volume: ${}", format_volume(top.volume));
            println!("- https://polymarket.com/market/{}", top.slug);
        }
        None => println!("_No matching prediction market; briefing uses the intel alone._"),
    }
    println!();
    println!("{}", report);

    Ok(())
}

async fn run_top(limit: u32, json: bool) -> Result<()> {
    let config = ResolverConfig { top_limit: limit, ..ResolverConfig::default() };
    let cache = TopMarketsCache::new(
        GammaClient::from_config(&config)?,
        config.top_limit,
        config.top_cache_ttl(),
    );

    let board = cache.get().await;
    if board.is_empty() {
        warn!("Top markets unavailable");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    for market in &board {
        println!("{:>3}% / {:>3}%  {}  ({})", market.yes, market.no, market.title, market.slug);
    }

    Ok(())
}
