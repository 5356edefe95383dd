//! Gemini REST client
//!
//! # Endpoint
//! - POST /v1beta/models/{model}:generateContent (header `x-goog-api-key`)
//!
//! # Source
//! - https://ai.google.dev/api/generate-content

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use super::TextGenerator;
use crate::config::ResolverConfig;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response contained no text")]
    EmptyResponse,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn with_base_url(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, GeminiError> {
        let client = Client::builder().timeout(timeout).build().map_err(GeminiError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &ResolverConfig, api_key: &str) -> Result<Self, GeminiError> {
        Self::with_base_url(
            &config.gemini_base_url,
            &config.gemini_model,
            api_key,
            config.request_timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single-turn text generation
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn generate_content(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest { contents: [Content { parts: [Part { text: prompt }] }] };
        debug!("POST {} ({} prompt chars)", url, prompt.chars().count());

        let response =
            self.client.post(&url).header("x-goog-api-key", &self.api_key).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::HttpStatus { status: status.as_u16(), body });
        }

        let body = response.text().await?;
        parse_generate_response(&body)
    }
}

/// Text of a generateContent response body
fn parse_generate_response(body: &str) -> Result<String, GeminiError> {
    let parsed: GenerateResponse = serde_json::from_str(body)?;
    parsed.text().ok_or(GeminiError::EmptyResponse)
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.generate_content(prompt).await?)
    }
}
