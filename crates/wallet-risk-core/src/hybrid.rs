//! Hybrid rule + AI combiner

use std::collections::BTreeMap;

use crate::ai::AiScore;
use crate::config::{ComponentWeights, HybridConfig};
use crate::models::{ComponentKind, FallbackReason, ScoringMethod, ScoringMethodResult};

/// Outcome of the optional AI step
pub type AiOutcome = Result<AiScore, FallbackReason>;

pub struct HybridCombiner {
    rule_weight: f64,
    llm_weight: f64,
    component_rule_share: ComponentWeights,
}

impl HybridCombiner {
    pub fn new(config: &HybridConfig) -> Self {
        Self {
            rule_weight: config.rule_based_weight,
            llm_weight: config.llm_weight,
            component_rule_share: config.component_rule_share,
        }
    }

    /// Blend the two overall scores with the configured mix
    pub fn blend(&self, rule_overall: f64, ai_overall: f64) -> f64 {
        self.rule_weight * rule_overall + self.llm_weight * ai_overall
    }

    /// Per-component estimates. A component the AI did not score keeps its
    /// rule value.
    pub fn blend_components(
        &self,
        rule: &BTreeMap<ComponentKind, f64>,
        ai: &BTreeMap<ComponentKind, f64>,
    ) -> BTreeMap<ComponentKind, f64> {
        rule.iter()
            .map(|(kind, rule_score)| {
                let blended = match ai.get(kind) {
                    Some(ai_score) => {
                        let share = self.component_rule_share.get(*kind);
                        share * rule_score + (1.0 - share) * ai_score
                    }
                    None => *rule_score,
                };
                (*kind, blended)
            })
            .collect()
    }

    /// Build the hybrid result. Without a usable AI score it is the rule-based
    /// result verbatim, tagged with the fallback reason.
    pub fn combine(
        &self,
        rule_overall: f64,
        rule_components: &BTreeMap<ComponentKind, f64>,
        ai: &AiOutcome,
    ) -> ScoringMethodResult {
        match ai {
            Ok(score) => ScoringMethodResult::new(
                ScoringMethod::Hybrid,
                self.blend(rule_overall, score.overall),
                &self.blend_components(rule_components, &score.components),
                format!(
                    "Hybrid: {:.0}% rule-based + {:.0}% AI",
                    self.rule_weight * 100.0,
                    self.llm_weight * 100.0
                ),
            )
            .with_confidence(score.confidence),
            Err(reason) => {
                let methodology = match reason {
                    FallbackReason::Disabled => "Rule-based only (AI scoring disabled)".to_string(),
                    FallbackReason::ProviderFailed { failure } => {
                        format!("Rule-based only ({})", failure)
                    }
                };
                ScoringMethodResult::new(ScoringMethod::Hybrid, rule_overall, rule_components, methodology)
                    .with_fallback(reason.clone())
            }
        }
    }
}
