//! Scoring configuration
//!
//! Every weight, threshold and delta the analyzers use lives here. The whole
//! struct deserializes with serde defaults equal to the documented constants,
//! so a deployment only has to override what it changes. Validation runs once,
//! in [`crate::engine::RiskEngine::new`].

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::models::ComponentKind;

/// Tolerance for "sums to 1.0" checks
const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: ScoringWeights,
    pub transaction: TransactionThresholds,
    pub protocol: ProtocolThresholds,
    pub asset: AssetThresholds,
    pub behavioral: BehavioralThresholds,
    pub hybrid: HybridConfig,
    pub ai: AiGenerationConfig,
    pub recommendations: RecommendationSettings,
    pub stablecoin_symbols: StablecoinSymbols,
}

impl RiskConfig {
    pub fn validate(&self) -> RiskResult<()> {
        self.weights.validate()?;
        self.hybrid.validate()?;
        self.ai.validate()?;
        self.stablecoin_symbols.validate()?;
        self.transaction.validate()?;
        self.protocol.validate()?;
        self.asset.validate()?;
        self.behavioral.validate()?;

        if self.recommendations.max_recommendations == 0 {
            return Err(RiskError::configuration(
                "recommendations.max_recommendations must be at least 1",
            ));
        }
        check_non_negative(
            "recommendations.severity_threshold",
            self.recommendations.severity_threshold,
        )?;

        Ok(())
    }
}

// =============================================================================
// Weights
// =============================================================================

/// Configured aggregation weights (must sum to 1.0).
///
/// There are five keys but four analyzers: `activity_frequency` and
/// `failure_rate` both weigh the behavioral component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringWeights {
    pub transaction_patterns: f64,
    pub protocol_interactions: f64,
    pub asset_concentration: f64,
    pub activity_frequency: f64,
    pub failure_rate: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            transaction_patterns: 0.25,
            protocol_interactions: 0.30,
            asset_concentration: 0.20,
            activity_frequency: 0.15,
            failure_rate: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.transaction_patterns
            + self.protocol_interactions
            + self.asset_concentration
            + self.activity_frequency
            + self.failure_rate
    }

    pub fn validate(&self) -> RiskResult<()> {
        for (key, value) in [
            ("transaction_patterns", self.transaction_patterns),
            ("protocol_interactions", self.protocol_interactions),
            ("asset_concentration", self.asset_concentration),
            ("activity_frequency", self.activity_frequency),
            ("failure_rate", self.failure_rate),
        ] {
            check_non_negative(&format!("weights.{}", key), value)?;
        }

        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RiskError::configuration(format!(
                "weights must sum to 1.0, got {}",
                total
            )));
        }
        Ok(())
    }

    /// Collapse the five keys onto the four analyzers.
    pub fn effective(&self) -> ComponentWeights {
        ComponentWeights {
            transaction_patterns: self.transaction_patterns,
            protocol_interactions: self.protocol_interactions,
            asset_concentration: self.asset_concentration,
            behavioral_patterns: self.activity_frequency + self.failure_rate,
        }
    }
}

/// One weight per analyzer, as used by the aggregator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComponentWeights {
    pub transaction_patterns: f64,
    pub protocol_interactions: f64,
    pub asset_concentration: f64,
    pub behavioral_patterns: f64,
}

impl ComponentWeights {
    pub fn get(&self, kind: ComponentKind) -> f64 {
        match kind {
            ComponentKind::TransactionPatterns => self.transaction_patterns,
            ComponentKind::ProtocolInteractions => self.protocol_interactions,
            ComponentKind::AssetConcentration => self.asset_concentration,
            ComponentKind::BehavioralPatterns => self.behavioral_patterns,
        }
    }
}

// =============================================================================
// Analyzer thresholds
// =============================================================================
//
// Deltas are stored signed, exactly as they are applied to the score.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransactionThresholds {
    pub no_transactions_delta: f64,

    pub low_success_rate: f64,
    pub low_success_delta: f64,
    pub moderate_success_rate: f64,
    pub moderate_success_delta: f64,
    pub high_success_rate: f64,
    pub high_success_delta: f64,

    pub very_high_frequency: f64,
    pub very_high_frequency_delta: f64,
    pub high_frequency: f64,
    pub high_frequency_delta: f64,
    pub low_frequency: f64,
    pub low_frequency_delta: f64,
    pub normal_frequency_min: f64,
    pub normal_frequency_max: f64,
    pub normal_frequency_delta: f64,

    pub very_high_value_ratio: f64,
    pub very_high_value_delta: f64,
    pub high_value_ratio: f64,
    pub high_value_delta: f64,

    pub very_high_contract_ratio: f64,
    pub very_high_contract_delta: f64,
    pub high_contract_ratio: f64,
    pub high_contract_delta: f64,
    pub low_contract_ratio: f64,
    pub low_contract_delta: f64,

    /// Length of the "recent" window the data provider counts over
    pub inactive_days: u32,
    /// Dormancy only counts for wallets with more history than this
    pub dormant_min_transactions: u64,
    pub dormant_delta: f64,
    pub recent_activity_threshold: u64,
    pub recent_activity_delta: f64,

    pub high_gas_price: f64,
    pub high_gas_delta: f64,

    pub low_address_diversity: f64,
    pub low_address_diversity_delta: f64,
}

impl Default for TransactionThresholds {
    fn default() -> Self {
        Self {
            no_transactions_delta: 40.0,
            low_success_rate: 0.70,
            low_success_delta: 25.0,
            moderate_success_rate: 0.85,
            moderate_success_delta: 10.0,
            high_success_rate: 0.95,
            high_success_delta: -10.0,
            very_high_frequency: 20.0,
            very_high_frequency_delta: 15.0,
            high_frequency: 10.0,
            high_frequency_delta: 5.0,
            low_frequency: 0.1,
            low_frequency_delta: 15.0,
            normal_frequency_min: 1.0,
            normal_frequency_max: 5.0,
            normal_frequency_delta: -5.0,
            very_high_value_ratio: 0.5,
            very_high_value_delta: 15.0,
            high_value_ratio: 0.3,
            high_value_delta: 5.0,
            very_high_contract_ratio: 0.9,
            very_high_contract_delta: 15.0,
            high_contract_ratio: 0.7,
            high_contract_delta: 5.0,
            low_contract_ratio: 0.1,
            low_contract_delta: -5.0,
            inactive_days: 30,
            dormant_min_transactions: 10,
            dormant_delta: 20.0,
            recent_activity_threshold: 50,
            recent_activity_delta: 10.0,
            high_gas_price: 100.0,
            high_gas_delta: 10.0,
            low_address_diversity: 0.1,
            low_address_diversity_delta: 10.0,
        }
    }
}

impl TransactionThresholds {
    fn validate(&self) -> RiskResult<()> {
        check_ascending(
            "transaction success rate",
            &[self.low_success_rate, self.moderate_success_rate, self.high_success_rate],
        )?;
        check_ascending(
            "transaction frequency",
            &[self.low_frequency, self.high_frequency, self.very_high_frequency],
        )?;
        check_ascending(
            "transaction normal frequency",
            &[self.normal_frequency_min, self.normal_frequency_max],
        )?;
        check_ascending(
            "transaction high-value ratio",
            &[self.high_value_ratio, self.very_high_value_ratio],
        )?;
        check_ascending(
            "transaction contract ratio",
            &[self.low_contract_ratio, self.high_contract_ratio, self.very_high_contract_ratio],
        )?;
        check_finite(
            "transaction",
            &[
                self.no_transactions_delta,
                self.low_success_delta,
                self.moderate_success_delta,
                self.high_success_delta,
                self.very_high_frequency_delta,
                self.high_frequency_delta,
                self.low_frequency_delta,
                self.normal_frequency_delta,
                self.very_high_value_delta,
                self.high_value_delta,
                self.very_high_contract_delta,
                self.high_contract_delta,
                self.low_contract_delta,
                self.dormant_delta,
                self.recent_activity_delta,
                self.high_gas_price,
                self.high_gas_delta,
                self.low_address_diversity,
                self.low_address_diversity_delta,
            ],
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolThresholds {
    pub no_protocols_delta: f64,

    /// Delta per unit of high-risk share (ratio in [0,1])
    pub high_risk_share_factor: f64,
    pub high_risk_share_cap: f64,

    pub single_category_delta: f64,
    /// Fewer distinct categories than this is "low diversification"
    pub low_diversification_categories: usize,
    pub low_diversification_delta: f64,
    pub diversification_delta: f64,

    pub very_high_tvl_usd: f64,
    pub very_high_tvl_delta: f64,
    pub high_tvl_usd: f64,
    pub high_tvl_delta: f64,
    pub medium_tvl_usd: f64,
    pub medium_tvl_delta: f64,
    pub low_tvl_usd: f64,
    pub low_tvl_delta: f64,

    pub very_high_risk_delta_per_protocol: f64,
}

impl Default for ProtocolThresholds {
    fn default() -> Self {
        Self {
            no_protocols_delta: -50.0,
            high_risk_share_factor: 30.0,
            high_risk_share_cap: 30.0,
            single_category_delta: 15.0,
            low_diversification_categories: 3,
            low_diversification_delta: 5.0,
            diversification_delta: -10.0,
            very_high_tvl_usd: 50_000_000_000.0,
            very_high_tvl_delta: -15.0,
            high_tvl_usd: 10_000_000_000.0,
            high_tvl_delta: -10.0,
            medium_tvl_usd: 1_000_000_000.0,
            medium_tvl_delta: -5.0,
            low_tvl_usd: 100_000_000.0,
            low_tvl_delta: 15.0,
            very_high_risk_delta_per_protocol: 5.0,
        }
    }
}

impl ProtocolThresholds {
    fn validate(&self) -> RiskResult<()> {
        check_ascending(
            "protocol TVL",
            &[self.low_tvl_usd, self.medium_tvl_usd, self.high_tvl_usd, self.very_high_tvl_usd],
        )?;
        check_non_negative("protocol.high_risk_share_cap", self.high_risk_share_cap)?;
        check_finite(
            "protocol",
            &[
                self.no_protocols_delta,
                self.high_risk_share_factor,
                self.single_category_delta,
                self.low_diversification_delta,
                self.diversification_delta,
                self.very_high_tvl_delta,
                self.high_tvl_delta,
                self.medium_tvl_delta,
                self.low_tvl_delta,
                self.very_high_risk_delta_per_protocol,
            ],
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetThresholds {
    pub eth_only_delta: f64,
    pub empty_portfolio_delta: f64,
    pub single_token_delta: f64,
    pub low_diversification_count: usize,
    pub low_diversification_delta: f64,
    pub good_diversification_count: usize,
    pub good_diversification_delta: f64,
    pub high_diversification_delta: f64,

    pub very_large_eth: f64,
    pub very_large_eth_delta: f64,
    pub large_eth: f64,
    pub large_eth_delta: f64,
    pub significant_eth: f64,
    pub significant_eth_delta: f64,
    pub very_low_eth: f64,
    pub very_low_eth_delta: f64,

    /// Applied once per stablecoin held (negative: stablecoins reduce risk)
    pub stablecoin_delta_per_token: f64,
    /// Largest total reduction stablecoins can earn (positive magnitude)
    pub stablecoin_max_reduction: f64,
}

impl Default for AssetThresholds {
    fn default() -> Self {
        Self {
            eth_only_delta: -15.0,
            empty_portfolio_delta: 30.0,
            single_token_delta: 20.0,
            low_diversification_count: 3,
            low_diversification_delta: 10.0,
            good_diversification_count: 10,
            good_diversification_delta: -5.0,
            high_diversification_delta: -10.0,
            very_large_eth: 1000.0,
            very_large_eth_delta: 25.0,
            large_eth: 100.0,
            large_eth_delta: 15.0,
            significant_eth: 10.0,
            significant_eth_delta: 5.0,
            very_low_eth: 0.01,
            very_low_eth_delta: 10.0,
            stablecoin_delta_per_token: -5.0,
            stablecoin_max_reduction: 15.0,
        }
    }
}

impl AssetThresholds {
    fn validate(&self) -> RiskResult<()> {
        check_ascending(
            "asset ETH holdings",
            &[self.very_low_eth, self.significant_eth, self.large_eth, self.very_large_eth],
        )?;
        if self.low_diversification_count > self.good_diversification_count {
            return Err(RiskError::configuration(
                "asset.low_diversification_count must not exceed good_diversification_count",
            ));
        }
        check_non_negative("asset.stablecoin_max_reduction", self.stablecoin_max_reduction)?;
        check_finite(
            "asset",
            &[
                self.eth_only_delta,
                self.empty_portfolio_delta,
                self.single_token_delta,
                self.low_diversification_delta,
                self.good_diversification_delta,
                self.high_diversification_delta,
                self.very_large_eth_delta,
                self.large_eth_delta,
                self.significant_eth_delta,
                self.very_low_eth_delta,
                self.stablecoin_delta_per_token,
            ],
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehavioralThresholds {
    pub very_high_gas_price: f64,
    pub very_high_gas_delta: f64,
    pub high_gas_price: f64,
    pub high_gas_delta: f64,
    pub low_gas_price: f64,
    pub low_gas_delta: f64,

    pub heavy_outflow_ratio: f64,
    pub heavy_outflow_delta: f64,
    pub moderate_outflow_ratio: f64,
    pub moderate_outflow_delta: f64,
    pub accumulation_ratio: f64,
    pub accumulation_delta: f64,

    pub very_large_transaction_eth: f64,
    pub very_large_transaction_delta: f64,
    pub large_transaction_eth: f64,
    pub large_transaction_delta: f64,

    pub very_concentrated_interactions: f64,
    pub very_concentrated_delta: f64,
    pub concentrated_interactions: f64,
    pub concentrated_delta: f64,
    pub diverse_interactions: f64,
    pub diverse_delta: f64,

    pub very_new_wallet_days: f64,
    pub very_new_wallet_delta: f64,
    pub new_wallet_days: f64,
    pub new_wallet_delta: f64,
    pub old_wallet_days: f64,
    pub old_wallet_delta: f64,
}

impl Default for BehavioralThresholds {
    fn default() -> Self {
        Self {
            very_high_gas_price: 200.0,
            very_high_gas_delta: 20.0,
            high_gas_price: 100.0,
            high_gas_delta: 10.0,
            low_gas_price: 20.0,
            low_gas_delta: -5.0,
            heavy_outflow_ratio: 3.0,
            heavy_outflow_delta: 20.0,
            moderate_outflow_ratio: 1.5,
            moderate_outflow_delta: 5.0,
            accumulation_ratio: 2.0,
            accumulation_delta: -5.0,
            very_large_transaction_eth: 100.0,
            very_large_transaction_delta: 15.0,
            large_transaction_eth: 10.0,
            large_transaction_delta: 5.0,
            very_concentrated_interactions: 0.1,
            very_concentrated_delta: 15.0,
            concentrated_interactions: 0.3,
            concentrated_delta: 5.0,
            diverse_interactions: 0.7,
            diverse_delta: -5.0,
            very_new_wallet_days: 30.0,
            very_new_wallet_delta: 15.0,
            new_wallet_days: 90.0,
            new_wallet_delta: 5.0,
            old_wallet_days: 730.0,
            old_wallet_delta: -10.0,
        }
    }
}

impl BehavioralThresholds {
    fn validate(&self) -> RiskResult<()> {
        check_ascending(
            "behavioral gas price",
            &[self.low_gas_price, self.high_gas_price, self.very_high_gas_price],
        )?;
        check_ascending(
            "behavioral outflow ratio",
            &[self.moderate_outflow_ratio, self.heavy_outflow_ratio],
        )?;
        check_ascending(
            "behavioral transaction size",
            &[self.large_transaction_eth, self.very_large_transaction_eth],
        )?;
        check_ascending(
            "behavioral interaction diversity",
            &[
                self.very_concentrated_interactions,
                self.concentrated_interactions,
                self.diverse_interactions,
            ],
        )?;
        check_ascending(
            "behavioral wallet age",
            &[self.very_new_wallet_days, self.new_wallet_days, self.old_wallet_days],
        )?;
        check_finite(
            "behavioral",
            &[
                self.very_high_gas_delta,
                self.high_gas_delta,
                self.low_gas_delta,
                self.heavy_outflow_delta,
                self.moderate_outflow_delta,
                self.accumulation_ratio,
                self.accumulation_delta,
                self.very_large_transaction_delta,
                self.large_transaction_delta,
                self.very_concentrated_delta,
                self.concentrated_delta,
                self.diverse_delta,
                self.very_new_wallet_delta,
                self.new_wallet_delta,
                self.old_wallet_delta,
            ],
        )
    }
}

// =============================================================================
// Hybrid, AI, recommendations, stablecoins
// =============================================================================

/// Rule/AI mix for the hybrid score (must sum to 1.0)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HybridConfig {
    pub rule_based_weight: f64,
    pub llm_weight: f64,

    /// Rule share of each per-component hybrid estimate; the AI gets the rest
    pub component_rule_share: ComponentWeights,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            rule_based_weight: 0.6,
            llm_weight: 0.4,
            component_rule_share: ComponentWeights {
                transaction_patterns: 0.7,
                protocol_interactions: 0.5,
                asset_concentration: 0.6,
                behavioral_patterns: 0.7,
            },
        }
    }
}

impl HybridConfig {
    pub fn validate(&self) -> RiskResult<()> {
        check_non_negative("hybrid.rule_based_weight", self.rule_based_weight)?;
        check_non_negative("hybrid.llm_weight", self.llm_weight)?;
        let total = self.rule_based_weight + self.llm_weight;
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RiskError::configuration(format!(
                "hybrid weights must sum to 1.0, got {}",
                total
            )));
        }

        for kind in ComponentKind::ALL {
            let share = self.component_rule_share.get(kind);
            if !(0.0..=1.0).contains(&share) {
                return Err(RiskError::configuration(format!(
                    "hybrid.component_rule_share.{} must be within [0, 1], got {}",
                    kind, share
                )));
            }
        }
        Ok(())
    }
}

/// Generation settings handed to the AI provider with every prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiGenerationConfig {
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for AiGenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.1,
            max_output_tokens: 500,
            timeout_seconds: 30,
        }
    }
}

impl AiGenerationConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if self.model.trim().is_empty() {
            return Err(RiskError::configuration("ai.model cannot be empty"));
        }
        if self.timeout_seconds == 0 {
            return Err(RiskError::configuration("ai.timeout_seconds must be positive"));
        }
        if self.max_output_tokens == 0 {
            return Err(RiskError::configuration("ai.max_output_tokens must be positive"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RiskError::configuration(format!(
                "ai.temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendationSettings {
    /// Adjustments with a smaller magnitude produce no recommendation
    pub severity_threshold: f64,
    pub max_recommendations: usize,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            severity_threshold: 5.0,
            max_recommendations: 10,
        }
    }
}

/// Lowercase fragments identifying stablecoin symbols
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StablecoinSymbols(pub Vec<String>);

impl Default for StablecoinSymbols {
    fn default() -> Self {
        Self(
            ["usdt", "usdc", "dai", "busd", "frax", "tusd", "usdp", "gusd"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

impl StablecoinSymbols {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    fn validate(&self) -> RiskResult<()> {
        for symbol in &self.0 {
            if symbol.trim().is_empty() {
                return Err(RiskError::configuration("stablecoin symbols cannot be empty"));
            }
            if symbol.trim() != symbol || symbol.to_lowercase() != *symbol {
                return Err(RiskError::configuration(format!(
                    "stablecoin symbol '{}' must be lowercase without surrounding whitespace",
                    symbol
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn check_non_negative(field: &str, value: f64) -> RiskResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(RiskError::configuration(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )));
    }
    Ok(())
}

fn check_finite(section: &str, values: &[f64]) -> RiskResult<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(RiskError::configuration(format!(
            "{} thresholds must be finite numbers",
            section
        )));
    }
    Ok(())
}

/// Band ladders must be strictly ascending or the "first match wins" order breaks.
fn check_ascending(ladder: &str, cut_points: &[f64]) -> RiskResult<()> {
    check_finite(ladder, cut_points)?;
    if cut_points.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(RiskError::configuration(format!(
            "{} thresholds must be strictly ascending, got {:?}",
            ladder, cut_points
        )));
    }
    Ok(())
}
