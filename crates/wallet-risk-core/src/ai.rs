//! AI scorer adapter
//!
//! Builds a prompt from the same [`MetricsBundle`] the analyzers consumed, asks
//! the injected [`AiProvider`] for an assessment under a hard timeout and parses
//! the JSON answer. Every failure comes back as a [`ProviderFailure`]; nothing
//! here panics or propagates past the hybrid combiner.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::AiGenerationConfig;
use crate::error::ProviderFailure;
use crate::models::{AiInsights, ComponentKind, MetricsBundle};

/// Tokens listed in the prompt
const MAX_PROMPT_TOKENS: usize = 10;

const SYSTEM_PROMPT: &str = "You are an expert cryptocurrency risk analyst. \
Analyze wallet data and provide risk scores (0-100) with reasoning.";

/// Transport to a text-generation model
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, config: &AiGenerationConfig) -> Result<String, ProviderFailure>;
}

/// A validated AI assessment
#[derive(Debug, Clone, PartialEq)]
pub struct AiScore {
    pub overall: f64,
    /// Only the components the model actually scored
    pub components: BTreeMap<ComponentKind, f64>,
    pub confidence: Option<f64>,
    pub insights: AiInsights,
}

pub struct AiScorer {
    provider: Arc<dyn AiProvider>,
    config: AiGenerationConfig,
}

impl AiScorer {
    pub fn new(provider: Arc<dyn AiProvider>, config: AiGenerationConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn score(&self, bundle: &MetricsBundle) -> Result<AiScore, ProviderFailure> {
        let prompt = build_prompt(bundle);
        let limit = Duration::from_secs(self.config.timeout_seconds);

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Requesting AI assessment"
        );

        let response = match tokio::time::timeout(limit, self.provider.generate(&prompt, &self.config)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderFailure::timeout(format!(
                    "no response within {}s",
                    self.config.timeout_seconds
                )))
            }
        };

        parse_response(&response)
    }
}

// =============================================================================
// Prompt
// =============================================================================

pub fn build_prompt(bundle: &MetricsBundle) -> String {
    let tx = &bundle.transactions;
    let behavior = &bundle.behavior;
    let assets = &bundle.assets;
    let protocols = &bundle.protocols;

    let wallet_age = behavior
        .wallet_age_days
        .map(|days| format!("{:.0} days", days))
        .unwrap_or_else(|| "unknown".to_string());
    let top_tokens: Vec<&str> = assets
        .tokens
        .iter()
        .take(MAX_PROMPT_TOKENS)
        .map(|t| t.symbol.as_str())
        .collect();

    let mut lines = vec![
        SYSTEM_PROMPT.to_string(),
        String::new(),
        "WALLET RISK ANALYSIS REQUEST".to_string(),
        format!("Address: {}", bundle.address),
        String::new(),
        "TRANSACTION PATTERNS:".to_string(),
        format!("- Total Transactions: {}", tx.total_transactions),
        format!("- Success Rate: {:.1}%", tx.success_rate * 100.0),
        format!("- Activity: {:.2} tx/day", tx.activity_frequency),
        format!("- High-Value Ratio: {:.1}%", tx.high_value_ratio * 100.0),
        format!("- Contract Interaction Ratio: {:.1}%", tx.contract_ratio * 100.0),
        format!("- Transactions (last 30 days): {}", tx.recent_transactions),
        format!("- Average Gas Price: {:.1} Gwei", tx.avg_gas_price_gwei),
        format!("- Counterparty Diversity: {:.2}", tx.address_diversity),
        String::new(),
        "BEHAVIOR:".to_string(),
        format!(
            "- Value Flow: {:.4} ETH out vs {:.4} ETH in",
            behavior.total_value_out_eth, behavior.total_value_in_eth
        ),
        format!("- Largest Transaction: {:.4} ETH", behavior.largest_transaction_eth),
        format!("- Wallet Age: {}", wallet_age),
        String::new(),
        "HOLDINGS:".to_string(),
        format!("- ETH Balance: {:.4} ETH", assets.eth_balance),
        format!(
            "- Tokens: {} ({} stablecoins)",
            assets.token_count(),
            assets.stablecoin_count()
        ),
    ];
    if !top_tokens.is_empty() {
        lines.push(format!("- Top Tokens: {}", top_tokens.join(", ")));
    }

    lines.extend([
        String::new(),
        "PROTOCOL EXPOSURE:".to_string(),
        format!("- Protocols Identified: {}", protocols.protocol_count()),
        format!("- Distinct Categories: {}", protocols.diversification()),
        format!(
            "- High-Risk Protocols: {} ({} very high)",
            protocols.high_risk_count(),
            protocols.very_high_risk_count()
        ),
    ]);
    lines.extend(protocols.protocols.iter().map(|p| {
        format!(
            "  - {} [{}] tier={:?} tvl=${:.0}",
            p.protocol_id, p.category, p.risk_tier, p.tvl_usd
        )
    }));

    lines.push(RESPONSE_FORMAT.to_string());
    lines.join("\n")
}

const RESPONSE_FORMAT: &str = r#"
Respond with only a JSON object in this format:
{
  "overall_risk_score": <0-100>,
  "component_scores": {
    "transaction_patterns": <0-100>,
    "protocol_interactions": <0-100>,
    "asset_concentration": <0-100>,
    "behavioral_patterns": <0-100>
  },
  "confidence": <0-1>,
  "risk_reasoning": "<main risk factors and score rationale>",
  "key_insights": ["<insight 1>", "<insight 2>", "<insight 3>"]
}"#;

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawAiResponse {
    overall_risk_score: Option<f64>,
    #[serde(default)]
    component_scores: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    risk_reasoning: Option<String>,
    #[serde(default)]
    key_insights: Vec<String>,
}

/// Strip markdown code fences the model tends to wrap JSON in
fn strip_fences(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

fn in_score_range(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

pub fn parse_response(raw: &str) -> Result<AiScore, ProviderFailure> {
    let body = strip_fences(raw);

    let parsed: RawAiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderFailure::invalid_response(format!("response is not the expected JSON object: {}", e)))?;

    let overall = parsed
        .overall_risk_score
        .ok_or_else(|| ProviderFailure::invalid_response("missing overall_risk_score"))?;
    if !in_score_range(overall) {
        return Err(ProviderFailure::invalid_response(format!(
            "overall_risk_score {} is outside [0, 100]",
            overall
        )));
    }

    let mut components = BTreeMap::new();
    for kind in ComponentKind::ALL {
        // Keys outside the four components are ignored whatever their type
        if let Some(value) = parsed.component_scores.get(kind.as_str()) {
            let score = value.as_f64().filter(|s| in_score_range(*s)).ok_or_else(|| {
                ProviderFailure::invalid_response(format!(
                    "component score {} for {} is not a number in [0, 100]",
                    value, kind
                ))
            })?;
            components.insert(kind, score);
        }
    }

    let confidence = parsed.confidence.filter(|c| (0.0..=1.0).contains(c));

    Ok(AiScore {
        overall,
        components,
        confidence,
        insights: AiInsights {
            reasoning: parsed
                .risk_reasoning
                .unwrap_or_else(|| "AI analysis completed".to_string()),
            key_insights: parsed.key_insights,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderFailureKind;
    use crate::models::{BalanceData, TransactionHistorySummary, WalletSnapshot};

    struct ScriptedProvider {
        response: Result<String, ProviderFailure>,
        delay: Duration,
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &str, _config: &AiGenerationConfig) -> Result<String, ProviderFailure> {
            tokio::time::sleep(self.delay).await;
            self.response.clone()
        }
    }

    fn bundle() -> MetricsBundle {
        let snapshot = WalletSnapshot {
            address: "0xabc".to_string(),
            balances: BalanceData {
                eth_balance: 1.5,
                tokens: vec![],
            },
            history: TransactionHistorySummary {
                total_transactions: 20,
                successful_transactions: 19,
                ..Default::default()
            },
            protocols: vec![],
        };
        MetricsBundle::from_snapshot(&snapshot, &[])
    }

    fn scorer(response: Result<String, ProviderFailure>, delay_secs: u64) -> AiScorer {
        AiScorer::new(
            Arc::new(ScriptedProvider {
                response,
                delay: Duration::from_secs(delay_secs),
            }),
            AiGenerationConfig::default(),
        )
    }

    #[test]
    fn test_parse_fenced_response() {
        let raw = "```json\n{\"overall_risk_score\": 42.8, \"component_scores\": {\"transaction_patterns\": 30, \"unknown\": 5}, \"risk_reasoning\": \"steady\", \"key_insights\": [\"old wallet\"]}\n```";
        let score = parse_response(raw).unwrap();
        assert_eq!(score.overall, 42.8);
        assert_eq!(score.components.len(), 1);
        assert_eq!(score.components[&ComponentKind::TransactionPatterns], 30.0);
        assert_eq!(score.insights.reasoning, "steady");
        assert_eq!(score.insights.key_insights, vec!["old wallet".to_string()]);
    }

    #[test]
    fn test_parse_ignores_unknown_component_keys() {
        let raw = r#"{"overall_risk_score": 55, "component_scores": {"protocol_interactions": 61.5, "notes": "mostly lending", "sub_scores": {"a": 1}}}"#;
        let score = parse_response(raw).unwrap();
        assert_eq!(score.components.len(), 1);
        assert_eq!(score.components[&ComponentKind::ProtocolInteractions], 61.5);
    }

    #[test]
    fn test_parse_rejects_missing_or_out_of_range_score() {
        for raw in [
            "{\"risk_reasoning\": \"no score\"}",
            "{\"overall_risk_score\": 140}",
            "{\"overall_risk_score\": -1}",
            "{\"overall_risk_score\": \"high\"}",
            "{\"overall_risk_score\": 40, \"component_scores\": {\"asset_concentration\": 101}}",
            "{\"overall_risk_score\": 40, \"component_scores\": {\"asset_concentration\": \"low\"}}",
            "not json at all",
        ] {
            let err = parse_response(raw).unwrap_err();
            assert_eq!(err.kind, ProviderFailureKind::InvalidResponse, "{}", raw);
        }
    }

    #[test]
    fn test_prompt_contains_metrics() {
        let prompt = build_prompt(&bundle());
        assert!(prompt.contains("Total Transactions: 20"));
        assert!(prompt.contains("Success Rate: 95.0%"));
        assert!(prompt.contains("ETH Balance: 1.5000 ETH"));
        assert!(prompt.contains("overall_risk_score"));
    }

    #[tokio::test]
    async fn test_score_success() {
        let scorer = scorer(Ok("{\"overall_risk_score\": 35, \"confidence\": 0.8}".to_string()), 0);
        let score = scorer.score(&bundle()).await.unwrap();
        assert_eq!(score.overall, 35.0);
        assert_eq!(score.confidence, Some(0.8));
    }

    #[tokio::test]
    async fn test_provider_error_passes_through() {
        let scorer = scorer(Err(ProviderFailure::unavailable("connection refused")), 0);
        let err = scorer.score(&bundle()).await.unwrap_err();
        assert_eq!(err.kind, ProviderFailureKind::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let scorer = scorer(Ok("{\"overall_risk_score\": 35}".to_string()), 120);
        let err = scorer.score(&bundle()).await.unwrap_err();
        assert_eq!(err.kind, ProviderFailureKind::Timeout);
    }
}
