//! Configuration management for the wallet risk MCP server
//!
//! Layering: built-in defaults, then an optional `wallet-risk.toml`, then
//! `WALLET_RISK__*` environment variables (e.g.
//! `WALLET_RISK__SCORING__AI__MODEL=gemini-1.5-pro`).

use serde::Deserialize;
use wallet_risk_core::RiskConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Scoring thresholds, weights and AI generation settings
    #[serde(default)]
    pub scoring: RiskConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for the Generative Language API
    #[serde(default = "default_gemini_api_url")]
    pub api_url: String,
    /// API key; the AI path stays off without one
    #[serde(default = "default_gemini_api_key")]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_url: default_gemini_api_url(),
            api_key: default_gemini_api_key(),
        }
    }
}

impl GeminiConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

fn default_gemini_api_url() -> String {
    std::env::var("GEMINI_API_URL")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string())
}

fn default_gemini_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY").ok()
}

/// Assessment cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum cache entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 {
    1000
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

impl AppConfig {
    /// Load configuration from file and environment
    pub async fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("gemini.api_url", default_gemini_api_url())?
            .set_default("cache.max_capacity", default_max_capacity() as i64)?
            .set_default("cache.ttl_seconds", default_ttl() as i64)?
            .add_source(config::File::with_name("wallet-risk").required(false))
            .add_source(
                config::Environment::with_prefix("WALLET_RISK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cache.max_capacity, 1000);
        assert_eq!(config.cache.ttl_seconds, 300);
        assert_eq!(config.scoring, RiskConfig::default());
    }

    #[test]
    fn test_blank_key_disables_ai() {
        let gemini = GeminiConfig {
            api_url: default_gemini_api_url(),
            api_key: Some("  ".to_string()),
        };
        assert!(!gemini.enabled());
    }

    #[tokio::test]
    async fn test_malformed_weight_fails_to_load() {
        std::env::set_var("WALLET_RISK__SCORING__WEIGHTS__FAILURE_RATE", "not-a-number");
        let result = AppConfig::load().await;
        std::env::remove_var("WALLET_RISK__SCORING__WEIGHTS__FAILURE_RATE");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failure_rate"), "{}", err);
    }

    #[test]
    fn test_partial_scoring_section_keeps_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "scoring": { "weights": { "protocol_interactions": 0.35, "transaction_patterns": 0.20 } }
        }))
        .unwrap();
        assert_eq!(config.scoring.weights.protocol_interactions, 0.35);
        assert_eq!(config.scoring.hybrid, RiskConfig::default().hybrid);
    }
}
