//! Data model for wallet risk scoring
//!
//! A [`WalletSnapshot`] is the normalized input handed over by the data
//! collaborators. It is reduced into four metric views, one per analyzer, and
//! the analyzers' [`ComponentScore`]s are finally assembled into a
//! [`RiskAssessment`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderFailure, RiskError, RiskResult};
use crate::levels::RiskLevel;
use crate::recommendations::Recommendation;

/// Neutral value every component score starts from before adjustments
pub const BASELINE_SCORE: f64 = 50.0;

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

// =============================================================================
// Snapshot (input)
// =============================================================================

/// Everything the core knows about a wallet, already fetched and normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletSnapshot {
    /// Wallet address (0x-prefixed hex for EVM chains)
    pub address: String,

    /// Native and token balances
    #[serde(default)]
    pub balances: BalanceData,

    /// Aggregated transaction history
    #[serde(default)]
    pub history: TransactionHistorySummary,

    /// DeFi protocols the wallet interacted with
    #[serde(default)]
    pub protocols: Vec<ProtocolInteraction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BalanceData {
    /// ETH balance in whole ETH
    #[serde(default)]
    pub eth_balance: f64,

    /// ERC-20 tokens currently held
    #[serde(default)]
    pub tokens: Vec<TokenHolding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenHolding {
    /// Token symbol (e.g., "USDC", "UNI")
    pub symbol: String,

    /// Human-readable token name, when known
    #[serde(default)]
    pub name: Option<String>,

    /// Balance in token units
    #[serde(default)]
    pub balance: f64,
}

/// Transaction history reduced to the counters the analyzers need.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransactionHistorySummary {
    pub total_transactions: u64,
    pub successful_transactions: u64,
    /// Transactions above the provider's high-value cutoff
    pub high_value_transactions: u64,
    /// Transactions that called a contract
    pub contract_interactions: u64,
    /// Transactions in the last 30 days
    pub recent_transactions: u64,
    /// Distinct counterparty addresses
    pub unique_counterparties: u64,
    /// Distinct addresses the wallet actively interacted with
    pub unique_interactions: u64,
    /// Average transactions per day over the wallet's lifetime
    pub activity_frequency: f64,
    pub avg_gas_price_gwei: f64,
    pub total_value_in_eth: f64,
    pub total_value_out_eth: f64,
    pub largest_transaction_eth: f64,
    #[serde(default)]
    pub first_transaction_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_transaction_at: Option<DateTime<Utc>>,
}

/// A single DeFi protocol the wallet touched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolInteraction {
    /// Protocol identifier (e.g., "aave-v3", "uniswap")
    pub protocol_id: String,

    /// Protocol category (e.g., "Lending", "Dexes", "Derivatives")
    pub category: String,

    /// Risk tier assigned by the protocol data source
    pub risk_tier: ProtocolRiskTier,

    /// Total value locked in USD
    pub tvl_usd: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolRiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ProtocolRiskTier {
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::High | Self::VeryHigh)
    }
}

impl WalletSnapshot {
    /// Reject structurally invalid snapshots before any scoring happens.
    pub fn validate(&self) -> RiskResult<()> {
        if self.address.trim().is_empty() {
            return Err(RiskError::validation("wallet address cannot be empty"));
        }

        check_amount("eth_balance", self.balances.eth_balance)?;
        for token in &self.balances.tokens {
            if token.symbol.trim().is_empty() {
                return Err(RiskError::validation("token symbol cannot be empty"));
            }
            check_amount(&format!("balance of {}", token.symbol), token.balance)?;
        }

        let h = &self.history;
        for (field, count) in [
            ("successful_transactions", h.successful_transactions),
            ("high_value_transactions", h.high_value_transactions),
            ("contract_interactions", h.contract_interactions),
            ("recent_transactions", h.recent_transactions),
        ] {
            if count > h.total_transactions {
                return Err(RiskError::validation(format!(
                    "{} ({}) exceeds total_transactions ({})",
                    field, count, h.total_transactions
                )));
            }
        }
        check_amount("activity_frequency", h.activity_frequency)?;
        check_amount("avg_gas_price_gwei", h.avg_gas_price_gwei)?;
        check_amount("total_value_in_eth", h.total_value_in_eth)?;
        check_amount("total_value_out_eth", h.total_value_out_eth)?;
        check_amount("largest_transaction_eth", h.largest_transaction_eth)?;

        if let (Some(first), Some(last)) = (h.first_transaction_at, h.last_transaction_at) {
            if first > last {
                return Err(RiskError::validation(format!(
                    "first transaction ({}) is after last transaction ({})",
                    first, last
                )));
            }
        }

        for protocol in &self.protocols {
            if protocol.protocol_id.trim().is_empty() {
                return Err(RiskError::validation("protocol id cannot be empty"));
            }
            check_amount(&format!("tvl of {}", protocol.protocol_id), protocol.tvl_usd)?;
        }

        Ok(())
    }
}

fn check_amount(field: &str, value: f64) -> RiskResult<()> {
    if !value.is_finite() {
        return Err(RiskError::validation(format!("{} must be a finite number", field)));
    }
    if value < 0.0 {
        return Err(RiskError::validation(format!(
            "{} cannot be negative (got {})",
            field, value
        )));
    }
    Ok(())
}

// =============================================================================
// Metric views (one per analyzer)
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionPatternMetrics {
    pub total_transactions: u64,
    pub success_rate: f64,
    pub activity_frequency: f64,
    pub high_value_ratio: f64,
    pub contract_ratio: f64,
    pub recent_transactions: u64,
    pub avg_gas_price_gwei: f64,
    pub address_diversity: f64,
}

impl TransactionPatternMetrics {
    pub fn from_history(history: &TransactionHistorySummary) -> Self {
        let total = history.total_transactions;
        Self {
            total_transactions: total,
            success_rate: ratio(history.successful_transactions, total),
            activity_frequency: history.activity_frequency,
            high_value_ratio: ratio(history.high_value_transactions, total),
            contract_ratio: ratio(history.contract_interactions, total),
            recent_transactions: history.recent_transactions,
            avg_gas_price_gwei: history.avg_gas_price_gwei,
            address_diversity: ratio(history.unique_counterparties, total),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProtocolExposure {
    pub protocols: Vec<ProtocolInteraction>,
}

impl ProtocolExposure {
    pub fn new(protocols: Vec<ProtocolInteraction>) -> Self {
        Self { protocols }
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    pub fn protocol_count(&self) -> usize {
        self.protocols.len()
    }

    /// Number of distinct protocol categories (case-insensitive)
    pub fn diversification(&self) -> usize {
        let mut categories: Vec<String> = self
            .protocols
            .iter()
            .map(|p| p.category.trim().to_lowercase())
            .collect();
        categories.sort();
        categories.dedup();
        categories.len()
    }

    pub fn total_tvl_usd(&self) -> f64 {
        self.protocols.iter().map(|p| p.tvl_usd).sum()
    }

    pub fn high_risk_count(&self) -> usize {
        self.protocols.iter().filter(|p| p.risk_tier.is_high_risk()).count()
    }

    pub fn very_high_risk_count(&self) -> usize {
        self.protocols
            .iter()
            .filter(|p| p.risk_tier == ProtocolRiskTier::VeryHigh)
            .count()
    }

    pub fn high_risk_ratio(&self) -> f64 {
        ratio(self.high_risk_count() as u64, self.protocol_count() as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioToken {
    pub symbol: String,
    pub is_stablecoin: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetPortfolio {
    pub eth_balance: f64,
    pub tokens: Vec<PortfolioToken>,
}

impl AssetPortfolio {
    /// Build the portfolio view, flagging stablecoins by symbol.
    pub fn from_balances(balances: &BalanceData, stablecoin_symbols: &[String]) -> Self {
        let tokens = balances
            .tokens
            .iter()
            .map(|t| PortfolioToken {
                symbol: t.symbol.clone(),
                is_stablecoin: is_stablecoin(&t.symbol, stablecoin_symbols),
            })
            .collect();

        Self {
            eth_balance: balances.eth_balance,
            tokens,
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn stablecoin_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_stablecoin).count()
    }

    /// No tokens and no ETH at all
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.eth_balance == 0.0
    }
}

fn is_stablecoin(symbol: &str, stablecoin_symbols: &[String]) -> bool {
    let symbol = symbol.to_lowercase();
    stablecoin_symbols
        .iter()
        .any(|stable| symbol.contains(&stable.to_lowercase()))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BehavioralMetrics {
    pub avg_gas_price_gwei: f64,
    pub total_value_in_eth: f64,
    pub total_value_out_eth: f64,
    pub largest_transaction_eth: f64,
    /// Share of transactions that went to distinct addresses. `None` without history.
    pub interaction_diversity: Option<f64>,
    /// Days between first and last transaction. `None` when either is unknown.
    pub wallet_age_days: Option<f64>,
}

impl BehavioralMetrics {
    pub fn from_history(history: &TransactionHistorySummary) -> Self {
        let interaction_diversity = (history.total_transactions > 0)
            .then(|| ratio(history.unique_interactions, history.total_transactions));

        let wallet_age_days = match (history.first_transaction_at, history.last_transaction_at) {
            (Some(first), Some(last)) => {
                Some((last - first).num_seconds() as f64 / SECONDS_PER_DAY)
            }
            _ => None,
        };

        Self {
            avg_gas_price_gwei: history.avg_gas_price_gwei,
            total_value_in_eth: history.total_value_in_eth,
            total_value_out_eth: history.total_value_out_eth,
            largest_transaction_eth: history.largest_transaction_eth,
            interaction_diversity,
            wallet_age_days,
        }
    }
}

/// The four metric views derived from one snapshot.
///
/// Both the rule analyzers and the AI prompt read from this bundle, so the two
/// scoring paths always see the same numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsBundle {
    pub address: String,
    pub transactions: TransactionPatternMetrics,
    pub protocols: ProtocolExposure,
    pub assets: AssetPortfolio,
    pub behavior: BehavioralMetrics,
}

impl MetricsBundle {
    pub fn from_snapshot(snapshot: &WalletSnapshot, stablecoin_symbols: &[String]) -> Self {
        Self {
            address: snapshot.address.clone(),
            transactions: TransactionPatternMetrics::from_history(&snapshot.history),
            protocols: ProtocolExposure::new(snapshot.protocols.clone()),
            assets: AssetPortfolio::from_balances(&snapshot.balances, stablecoin_symbols),
            behavior: BehavioralMetrics::from_history(&snapshot.history),
        }
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

// =============================================================================
// Component scores
// =============================================================================

/// The closed set of scored dimensions.
///
/// Adding a dimension means adding a variant here; every `match` over it then
/// fails to compile until the new analyzer, weight and category are wired up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    TransactionPatterns,
    ProtocolInteractions,
    AssetConcentration,
    BehavioralPatterns,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::TransactionPatterns,
        ComponentKind::ProtocolInteractions,
        ComponentKind::AssetConcentration,
        ComponentKind::BehavioralPatterns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionPatterns => "transaction_patterns",
            Self::ProtocolInteractions => "protocol_interactions",
            Self::AssetConcentration => "asset_concentration",
            Self::BehavioralPatterns => "behavioral_patterns",
        }
    }

    /// Short category label used to tag recommendations
    pub fn category_label(&self) -> &'static str {
        match self {
            Self::TransactionPatterns => "transaction patterns",
            Self::ProtocolInteractions => "protocol risk",
            Self::AssetConcentration => "asset concentration",
            Self::BehavioralPatterns => "behavioral risk",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One triggered rule and what it did to the score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Adjustment {
    /// Stable rule identifier (e.g., "low_success_rate")
    pub rule: String,

    /// Human-readable explanation with the observed value
    pub label: String,

    /// Signed change applied to the score
    pub delta: f64,

    /// Guidance shown when this adjustment becomes a recommendation
    pub advice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentScore {
    pub component: ComponentKind,

    /// Score after adjustments, clamped to [0, 100]
    pub score: f64,

    /// Effective aggregation weight for this component
    pub weight: f64,

    /// Every deviation from the baseline, in rule order
    pub adjustments: Vec<Adjustment>,
}

impl ComponentScore {
    /// Apply adjustments to the baseline, clamp and round.
    pub fn from_adjustments(component: ComponentKind, weight: f64, adjustments: Vec<Adjustment>) -> Self {
        let raw: f64 = BASELINE_SCORE + adjustments.iter().map(|a| a.delta).sum::<f64>();
        Self {
            component,
            score: round2(clamp_score(raw)),
            weight,
            adjustments,
        }
    }

    /// Sum of all deltas before clamping
    pub fn net_adjustment(&self) -> f64 {
        self.adjustments.iter().map(|a| a.delta).sum()
    }
}

/// Clamp to [0, 100]; NaN collapses to the baseline.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return BASELINE_SCORE;
    }
    score.clamp(0.0, 100.0)
}

/// Round to two decimals for presentation
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Scoring methods & assessment (output)
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    RuleBased,
    LlmBased,
    Hybrid,
}

/// Why a hybrid result fell back to the rule-based score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No AI scorer configured
    Disabled,
    /// The AI scorer was called and failed
    ProviderFailed { failure: ProviderFailure },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringMethodResult {
    pub method: ScoringMethod,
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub components: BTreeMap<ComponentKind, f64>,
    pub methodology: String,
    /// Present exactly when a hybrid result is rule-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
}

impl ScoringMethodResult {
    /// Round the raw scores and classify the rounded overall score, so the
    /// displayed score and level always agree.
    pub fn new(
        method: ScoringMethod,
        raw_overall: f64,
        raw_components: &BTreeMap<ComponentKind, f64>,
        methodology: impl Into<String>,
    ) -> Self {
        let overall_score = round2(clamp_score(raw_overall));
        Self {
            method,
            overall_score,
            risk_level: RiskLevel::classify(overall_score),
            confidence: None,
            components: raw_components
                .iter()
                .map(|(kind, score)| (*kind, round2(clamp_score(*score))))
                .collect(),
            methodology: methodology.into(),
            fallback: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_fallback(mut self, reason: FallbackReason) -> Self {
        self.fallback = Some(reason);
        self
    }

    pub fn is_rule_only(&self) -> bool {
        self.fallback.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringMethods {
    pub rule_based: ScoringMethodResult,
    /// `None` when the AI path was disabled or failed
    pub llm_based: Option<ScoringMethodResult>,
    pub hybrid: ScoringMethodResult,
}

/// Components bucketed by severity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskDistribution {
    pub high: Vec<ComponentKind>,
    pub medium: Vec<ComponentKind>,
    pub low: Vec<ComponentKind>,
}

/// Narrative output of a successful AI call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AiInsights {
    pub reasoning: String,
    pub key_insights: Vec<String>,
}

/// Final result of one `assess()` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub address: String,
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_description: String,
    pub component_scores: BTreeMap<ComponentKind, ComponentScore>,
    pub scoring_methods: ScoringMethods,
    /// Ordered guidance, each rendered as `"[category] message"`
    pub recommendations: Vec<String>,
    /// The same recommendations with their component, rule and delta
    pub recommendation_details: Vec<Recommendation>,
    pub risk_distribution: RiskDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<AiInsights>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot() -> WalletSnapshot {
        let now = Utc::now();
        WalletSnapshot {
            address: "0x742d35cc6634c0532925a3b844bc454e4438f44e".to_string(),
            balances: BalanceData {
                eth_balance: 2.5,
                tokens: vec![TokenHolding {
                    symbol: "USDC".to_string(),
                    name: Some("USD Coin".to_string()),
                    balance: 1000.0,
                }],
            },
            history: TransactionHistorySummary {
                total_transactions: 100,
                successful_transactions: 90,
                contract_interactions: 40,
                unique_counterparties: 25,
                unique_interactions: 50,
                first_transaction_at: Some(now - Duration::days(400)),
                last_transaction_at: Some(now),
                ..Default::default()
            },
            protocols: vec![],
        }
    }

    #[test]
    fn test_valid_snapshot_passes() {
        assert!(snapshot().validate().is_ok());
    }

    #[test]
    fn test_negative_balance_rejected() {
        let mut s = snapshot();
        s.balances.eth_balance = -1.0;
        assert!(matches!(s.validate(), Err(RiskError::Validation(_))));
    }

    #[test]
    fn test_non_monotonic_timestamps_rejected() {
        let mut s = snapshot();
        std::mem::swap(&mut s.history.first_transaction_at, &mut s.history.last_transaction_at);
        assert!(matches!(s.validate(), Err(RiskError::Validation(_))));
    }

    #[test]
    fn test_successful_exceeding_total_rejected() {
        let mut s = snapshot();
        s.history.successful_transactions = 101;
        assert!(matches!(s.validate(), Err(RiskError::Validation(_))));
    }

    #[test]
    fn test_metric_derivation() {
        let stables = vec!["usdc".to_string()];
        let bundle = MetricsBundle::from_snapshot(&snapshot(), &stables);

        assert!((bundle.transactions.success_rate - 0.9).abs() < 1e-9);
        assert!((bundle.transactions.contract_ratio - 0.4).abs() < 1e-9);
        assert!((bundle.transactions.address_diversity - 0.25).abs() < 1e-9);
        assert_eq!(bundle.assets.stablecoin_count(), 1);
        assert_eq!(bundle.behavior.interaction_diversity, Some(0.5));
        let age = bundle.behavior.wallet_age_days.unwrap();
        assert!((age - 400.0).abs() < 0.01);
    }

    #[test]
    fn test_diversification_ignores_category_case() {
        let exposure = ProtocolExposure::new(vec![
            ProtocolInteraction {
                protocol_id: "aave".to_string(),
                category: "Lending".to_string(),
                risk_tier: ProtocolRiskTier::Low,
                tvl_usd: 1.0,
            },
            ProtocolInteraction {
                protocol_id: "compound".to_string(),
                category: "lending".to_string(),
                risk_tier: ProtocolRiskTier::VeryHigh,
                tvl_usd: 2.0,
            },
        ]);
        assert_eq!(exposure.diversification(), 1);
        assert_eq!(exposure.high_risk_count(), 1);
        assert_eq!(exposure.very_high_risk_count(), 1);
        assert!((exposure.total_tvl_usd() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-12.0), 0.0);
        assert_eq!(clamp_score(130.0), 100.0);
        assert_eq!(clamp_score(f64::NAN), BASELINE_SCORE);
        assert_eq!(round2(45.384999), 45.38);
    }
}
