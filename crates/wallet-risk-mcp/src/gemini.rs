//! Gemini client implementing the core's `AiProvider`
//!
//! Calls the `generateContent` endpoint and hands back the first candidate's
//! text. Parsing that text into scores happens in the core.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use wallet_risk_core::{AiGenerationConfig, AiProvider, ProviderFailure};

use crate::config::GeminiConfig;
use crate::error::{Result, RiskMcpError};

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, timeout_seconds: u64) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RiskMcpError::Config("Gemini API key is not set".into()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| RiskMcpError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_url, model)
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &AiGenerationConfig,
    ) -> std::result::Result<String, ProviderFailure> {
        let response = self
            .client
            .post(self.endpoint(&config.model))
            .query(&[("key", self.api_key.as_str())])
            .timeout(Duration::from_secs(config.timeout_seconds))
            .json(&request_body(prompt, config))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_failure(status));
        }

        let body: Value = response.json().await.map_err(transport_failure)?;
        extract_text(&body)
    }
}

fn request_body(prompt: &str, config: &AiGenerationConfig) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_output_tokens
        }
    })
}

fn transport_failure(e: reqwest::Error) -> ProviderFailure {
    if e.is_timeout() {
        ProviderFailure::timeout(e.to_string())
    } else if e.is_decode() {
        ProviderFailure::invalid_response(e.to_string())
    } else {
        ProviderFailure::unavailable(e.to_string())
    }
}

fn status_failure(status: StatusCode) -> ProviderFailure {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderFailure::timeout(format!("Gemini returned {}", status))
        }
        _ => ProviderFailure::unavailable(format!("Gemini returned {}", status)),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// First candidate's text, or `InvalidResponse` if there is none
fn extract_text(body: &Value) -> std::result::Result<String, ProviderFailure> {
    let parsed = GenerateResponse::deserialize(body)
        .map_err(|e| ProviderFailure::invalid_response(format!("unexpected Gemini response: {}", e)))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ProviderFailure::invalid_response("Gemini response has no candidate text"))
}
