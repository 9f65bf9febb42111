//! Recommendation generation
//!
//! Every triggered adjustment with enough weight becomes one line of
//! guidance. The strongest signals come first.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RecommendationSettings;
use crate::models::{ComponentKind, ComponentScore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub component: ComponentKind,
    /// Short category label (e.g., "protocol risk")
    pub category: String,
    pub rule: String,
    pub delta: f64,
    pub message: String,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

pub struct RecommendationGenerator {
    severity_threshold: f64,
    max_recommendations: usize,
}

impl RecommendationGenerator {
    pub fn new(settings: &RecommendationSettings) -> Self {
        Self {
            severity_threshold: settings.severity_threshold,
            max_recommendations: settings.max_recommendations,
        }
    }

    /// Ordered by descending |delta|; ties keep component order, then rule order.
    pub fn generate(&self, components: &BTreeMap<ComponentKind, ComponentScore>) -> Vec<Recommendation> {
        let threshold = self.severity_threshold;
        let mut recommendations: Vec<Recommendation> = components
            .values()
            .flat_map(|component| {
                component
                    .adjustments
                    .iter()
                    .filter(move |a| a.delta.abs() >= threshold)
                    .map(move |a| Recommendation {
                        component: component.component,
                        category: component.component.category_label().to_string(),
                        rule: a.rule.clone(),
                        delta: a.delta,
                        message: if a.advice.is_empty() {
                            a.label.clone()
                        } else {
                            format!("{}. {}", a.label, a.advice)
                        },
                    })
            })
            .collect();

        // sort_by is stable, so equal magnitudes keep insertion order
        recommendations.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()));
        recommendations.truncate(self.max_recommendations);
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Adjustment;

    fn adjustment(rule: &str, delta: f64) -> Adjustment {
        Adjustment {
            rule: rule.to_string(),
            label: rule.replace('_', " "),
            delta,
            advice: format!("advice for {}", rule),
        }
    }

    fn components(entries: Vec<(ComponentKind, Vec<Adjustment>)>) -> BTreeMap<ComponentKind, ComponentScore> {
        entries
            .into_iter()
            .map(|(kind, adjustments)| (kind, ComponentScore::from_adjustments(kind, 0.25, adjustments)))
            .collect()
    }

    #[test]
    fn test_ordering_and_threshold() {
        let generator = RecommendationGenerator::new(&RecommendationSettings::default());
        let scores = components(vec![
            (
                ComponentKind::TransactionPatterns,
                vec![adjustment("low_success_rate", 25.0), adjustment("normal_activity", -5.0)],
            ),
            (
                ComponentKind::AssetConcentration,
                vec![adjustment("stablecoin_holdings", -15.0), adjustment("tiny", 2.0)],
            ),
            (ComponentKind::BehavioralPatterns, vec![adjustment("high_gas", 5.0)]),
        ]);

        let rules: Vec<String> = generator.generate(&scores).into_iter().map(|r| r.rule).collect();
        assert_eq!(
            rules,
            vec!["low_success_rate", "stablecoin_holdings", "normal_activity", "high_gas"]
        );
    }

    #[test]
    fn test_category_tagging() {
        let generator = RecommendationGenerator::new(&RecommendationSettings::default());
        let scores = components(vec![(
            ComponentKind::ProtocolInteractions,
            vec![adjustment("very_high_risk_protocols", 10.0)],
        )]);
        let recs = generator.generate(&scores);
        assert_eq!(recs[0].category, "protocol risk");
        assert_eq!(
            recs[0].to_string(),
            "[protocol risk] very high risk protocols. advice for very_high_risk_protocols"
        );
    }

    #[test]
    fn test_capped_at_maximum() {
        let generator = RecommendationGenerator::new(&RecommendationSettings {
            severity_threshold: 5.0,
            max_recommendations: 3,
        });
        let adjustments = (0..8).map(|i| adjustment(&format!("rule_{}", i), 10.0 + i as f64)).collect();
        let scores = components(vec![(ComponentKind::BehavioralPatterns, adjustments)]);
        let recs = generator.generate(&scores);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].rule, "rule_7");
    }
}
