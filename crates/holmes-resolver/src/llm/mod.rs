//! LLM text generation
//!
//! # Components
//! - `TextGenerator`: prompt in, plain text out
//! - `GeminiClient`: Google Gemini implementation
//! - `Disabled`: always fails; callers fall back to their no-LLM behavior

mod gemini;

pub use gemini::{GeminiClient, GeminiError};

use anyhow::Result;

/// Prompt-to-text model
#[allow(async_fn_in_trait)]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generator used when no model is configured
#[derive(Clone, Copy, Debug, Default)]
pub struct Disabled;

impl TextGenerator for Disabled {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("no language model configured")
    }
}

impl<T: TextGenerator> TextGenerator for &T {
    async fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt).await
    }
}
