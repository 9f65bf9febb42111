//! Risk level classification
//!
//! Maps a 0-100 score onto five ordinal bands. Every cut point is
//! lower-inclusive: 20 is LOW, 40 is MEDIUM, 60 is HIGH, 80 is VERY_HIGH.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{clamp_score, ComponentKind, ComponentScore, RiskDistribution};

/// Lower bound of each band above VERY_LOW
pub const LOW_FLOOR: f64 = 20.0;
pub const MEDIUM_FLOOR: f64 = 40.0;
pub const HIGH_FLOOR: f64 = 60.0;
pub const VERY_HIGH_FLOOR: f64 = 80.0;

/// Component scores at or above this land in the "high" bucket
pub const HIGH_COMPONENT_FLOOR: f64 = 70.0;
/// Component scores at or above this (and below high) land in "medium"
pub const MEDIUM_COMPONENT_FLOOR: f64 = 40.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Classify a score. Out-of-range input is clamped first.
    pub fn classify(score: f64) -> Self {
        let score = clamp_score(score);
        if score >= VERY_HIGH_FLOOR {
            Self::VeryHigh
        } else if score >= HIGH_FLOOR {
            Self::High
        } else if score >= MEDIUM_FLOOR {
            Self::Medium
        } else if score >= LOW_FLOOR {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "VERY_LOW",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::VeryHigh => "Extremely risky wallet with multiple severe red flags",
            Self::High => "High-risk wallet requiring significant caution",
            Self::Medium => "Medium risk with some concerning factors",
            Self::Low => "Low risk with generally safe behavior patterns",
            Self::VeryLow => "Very low risk, highly conservative wallet behavior",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket components into high / medium / low severity.
pub fn categorize_components(scores: &BTreeMap<ComponentKind, ComponentScore>) -> RiskDistribution {
    let mut distribution = RiskDistribution::default();

    for (kind, component) in scores {
        if component.score >= HIGH_COMPONENT_FLOOR {
            distribution.high.push(*kind);
        } else if component.score >= MEDIUM_COMPONENT_FLOOR {
            distribution.medium.push(*kind);
        } else {
            distribution.low.push(*kind);
        }
    }

    distribution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries_are_lower_inclusive() {
        assert_eq!(RiskLevel::classify(0.0), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::classify(19.99), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::classify(20.0), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(39.99), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(40.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(59.99), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::classify(79.99), RiskLevel::High);
        assert_eq!(RiskLevel::classify(80.0), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::classify(100.0), RiskLevel::VeryHigh);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        assert_eq!(RiskLevel::classify(-5.0), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::classify(250.0), RiskLevel::VeryHigh);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&RiskLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"VERY_HIGH\"");
        let level: RiskLevel = serde_json::from_str("\"VERY_LOW\"").unwrap();
        assert_eq!(level, RiskLevel::VeryLow);
    }

    #[test]
    fn test_categorize_components() {
        let mut scores = BTreeMap::new();
        for (kind, score) in [
            (ComponentKind::TransactionPatterns, 70.0),
            (ComponentKind::ProtocolInteractions, 69.99),
            (ComponentKind::AssetConcentration, 40.0),
            (ComponentKind::BehavioralPatterns, 39.0),
        ] {
            scores.insert(
                kind,
                ComponentScore {
                    component: kind,
                    score,
                    weight: 0.25,
                    adjustments: vec![],
                },
            );
        }

        let distribution = categorize_components(&scores);
        assert_eq!(distribution.high, vec![ComponentKind::TransactionPatterns]);
        assert_eq!(
            distribution.medium,
            vec![ComponentKind::ProtocolInteractions, ComponentKind::AssetConcentration]
        );
        assert_eq!(distribution.low, vec![ComponentKind::BehavioralPatterns]);
    }
}
