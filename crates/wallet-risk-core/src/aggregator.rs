//! Weighted rule-based aggregation

use std::collections::BTreeMap;

use crate::config::ComponentWeights;
use crate::models::{clamp_score, ComponentKind, ComponentScore};

/// Weighted sum of component scores, clamped to [0, 100].
///
/// Weights are validated when the configuration is loaded; a component missing
/// from `scores` contributes nothing.
pub fn aggregate(scores: &BTreeMap<ComponentKind, f64>, weights: &ComponentWeights) -> f64 {
    let total: f64 = ComponentKind::ALL
        .iter()
        .filter_map(|kind| scores.get(kind).map(|score| weights.get(*kind) * score))
        .sum();
    clamp_score(total)
}

/// Flatten component results into plain scores
pub fn component_values(components: &BTreeMap<ComponentKind, ComponentScore>) -> BTreeMap<ComponentKind, f64> {
    components
        .iter()
        .map(|(kind, component)| (*kind, component.score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: [f64; 4]) -> BTreeMap<ComponentKind, f64> {
        ComponentKind::ALL.into_iter().zip(values).collect()
    }

    #[test]
    fn test_weighted_sum() {
        let weights = ComponentWeights {
            transaction_patterns: 0.25,
            protocol_interactions: 0.30,
            asset_concentration: 0.20,
            behavioral_patterns: 0.25,
        };
        let overall = aggregate(&scores([38.5, 52.1, 41.8, 48.3]), &weights);
        // 9.625 + 15.63 + 8.36 + 12.075
        assert!((overall - 45.69).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_scores_pass_through() {
        let weights = crate::config::ScoringWeights::default().effective();
        let overall = aggregate(&scores([50.0; 4]), &weights);
        assert!((overall - 50.0).abs() < 1e-9);
    }
}
