//! Assessment orchestrator
//!
//! `RiskEngine` owns the validated configuration and everything built from it.
//! One `assess()` call runs the analyzers, aggregates, optionally asks the AI
//! scorer, combines, classifies and generates recommendations. The rule-based
//! result is always computed first so an AI failure can only ever degrade the
//! output to rule-only.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::aggregator::{aggregate, component_values};
use crate::ai::{AiProvider, AiScorer};
use crate::analyzers::AnalyzerSet;
use crate::config::{ComponentWeights, RiskConfig};
use crate::error::RiskResult;
use crate::hybrid::{AiOutcome, HybridCombiner};
use crate::levels::categorize_components;
use crate::models::{
    ComponentKind, ComponentScore, FallbackReason, MetricsBundle, RiskAssessment, ScoringMethod,
    ScoringMethodResult, ScoringMethods, WalletSnapshot,
};
use crate::provider::{build_snapshot, WalletDataProvider};
use crate::recommendations::RecommendationGenerator;

/// Output of the deterministic half of an assessment
struct RulePhase {
    bundle: MetricsBundle,
    components: BTreeMap<ComponentKind, ComponentScore>,
    values: BTreeMap<ComponentKind, f64>,
    overall: f64,
}

pub struct RiskEngine {
    config: Arc<RiskConfig>,
    weights: ComponentWeights,
    analyzers: AnalyzerSet,
    combiner: HybridCombiner,
    recommender: RecommendationGenerator,
    ai: Option<AiScorer>,
}

impl RiskEngine {
    /// Validate the configuration and build the rule tables. Invalid
    /// configuration is rejected here, never during an assessment.
    pub fn new(config: RiskConfig) -> RiskResult<Self> {
        config.validate()?;

        Ok(Self {
            weights: config.weights.effective(),
            analyzers: AnalyzerSet::new(&config),
            combiner: HybridCombiner::new(&config.hybrid),
            recommender: RecommendationGenerator::new(&config.recommendations),
            ai: None,
            config: Arc::new(config),
        })
    }

    /// Enable the AI path with the given provider
    pub fn with_ai_provider(mut self, provider: Arc<dyn AiProvider>) -> Self {
        self.ai = Some(AiScorer::new(provider, self.config.ai.clone()));
        self
    }

    pub fn config(&self) -> &Arc<RiskConfig> {
        &self.config
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.is_some()
    }

    /// Full assessment. AI problems degrade to rule-only; only an invalid
    /// snapshot is an error.
    pub async fn assess(&self, snapshot: &WalletSnapshot) -> RiskResult<RiskAssessment> {
        let phase = self.rule_phase(snapshot)?;

        let outcome: AiOutcome = match &self.ai {
            None => Err(FallbackReason::Disabled),
            Some(scorer) => scorer.score(&phase.bundle).await.map_err(|failure| {
                tracing::warn!(
                    address = %snapshot.address,
                    provider = scorer.provider_name(),
                    kind = failure.kind.as_str(),
                    error = %failure.message,
                    "AI scoring failed, falling back to rule-based score"
                );
                FallbackReason::ProviderFailed { failure }
            }),
        };

        Ok(self.finish(phase, outcome))
    }

    /// Synchronous rule-only assessment; never touches the AI provider.
    pub fn assess_rule_based(&self, snapshot: &WalletSnapshot) -> RiskResult<RiskAssessment> {
        let phase = self.rule_phase(snapshot)?;
        Ok(self.finish(phase, Err(FallbackReason::Disabled)))
    }

    /// Fetch the snapshot through the data provider, then assess it.
    pub async fn assess_address(
        &self,
        provider: &dyn WalletDataProvider,
        address: &str,
    ) -> RiskResult<RiskAssessment> {
        let snapshot = build_snapshot(provider, address).await?;
        self.assess(&snapshot).await
    }

    fn rule_phase(&self, snapshot: &WalletSnapshot) -> RiskResult<RulePhase> {
        snapshot.validate()?;

        let bundle = MetricsBundle::from_snapshot(snapshot, self.config.stablecoin_symbols.as_slice());
        let components = self.analyzers.score_all(&bundle);
        let values = component_values(&components);
        let overall = aggregate(&values, &self.weights);

        tracing::debug!(
            address = %snapshot.address,
            rule_score = overall,
            "Rule-based scoring complete"
        );

        Ok(RulePhase {
            bundle,
            components,
            values,
            overall,
        })
    }

    fn finish(&self, phase: RulePhase, outcome: AiOutcome) -> RiskAssessment {
        let RulePhase {
            bundle,
            components,
            values,
            overall,
        } = phase;

        let rule_based = ScoringMethodResult::new(
            ScoringMethod::RuleBased,
            overall,
            &values,
            "Weighted sum of four deterministic component analyzers",
        );
        let hybrid = self.combiner.combine(overall, &values, &outcome);

        let (llm_based, ai_insights) = match outcome {
            Ok(score) => {
                let llm = ScoringMethodResult::new(
                    ScoringMethod::LlmBased,
                    score.overall,
                    &score.components,
                    format!("AI model assessment ({})", self.config.ai.model),
                )
                .with_confidence(score.confidence);
                (Some(llm), Some(score.insights))
            }
            Err(_) => (None, None),
        };

        let recommendation_details = self.recommender.generate(&components);
        let recommendations = recommendation_details.iter().map(ToString::to_string).collect();
        let risk_distribution = categorize_components(&components);

        tracing::info!(
            address = %bundle.address,
            score = hybrid.overall_score,
            level = %hybrid.risk_level,
            rule_score = rule_based.overall_score,
            ai_used = hybrid.fallback.is_none(),
            "Wallet risk assessed"
        );

        RiskAssessment {
            address: bundle.address,
            overall_risk_score: hybrid.overall_score,
            risk_level: hybrid.risk_level,
            risk_description: hybrid.risk_level.description().to_string(),
            component_scores: components,
            scoring_methods: ScoringMethods {
                rule_based,
                llm_based,
                hybrid,
            },
            recommendations,
            recommendation_details,
            risk_distribution,
            ai_insights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;
    use crate::models::{BalanceData, TransactionHistorySummary};

    fn empty_wallet() -> WalletSnapshot {
        WalletSnapshot {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            balances: BalanceData::default(),
            history: TransactionHistorySummary::default(),
            protocols: vec![],
        }
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = RiskConfig::default();
        config.weights.asset_concentration = 0.5;
        assert!(matches!(RiskEngine::new(config), Err(RiskError::Configuration(_))));
    }

    #[test]
    fn test_empty_wallet_rule_based() {
        let engine = RiskEngine::new(RiskConfig::default()).unwrap();
        let assessment = engine.assess_rule_based(&empty_wallet()).unwrap();

        // transaction 90 (no history), protocol 0, asset 80 (empty), behavioral 45 (gas < 20)
        let scores: Vec<f64> = assessment.component_scores.values().map(|c| c.score).collect();
        assert_eq!(scores, vec![90.0, 0.0, 80.0, 45.0]);
        // 0.25*90 + 0.30*0 + 0.20*80 + 0.25*45
        assert_eq!(assessment.overall_risk_score, 49.75);
        assert_eq!(assessment.scoring_methods.hybrid.fallback, Some(FallbackReason::Disabled));
        assert!(assessment.scoring_methods.llm_based.is_none());
        assert!(assessment.ai_insights.is_none());
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let engine = RiskEngine::new(RiskConfig::default()).unwrap();
        let mut snapshot = empty_wallet();
        snapshot.address = String::new();
        assert!(matches!(engine.assess_rule_based(&snapshot), Err(RiskError::Validation(_))));
    }
}
