//! DeFi protocol exposure analysis

use crate::config::ProtocolThresholds;
use crate::models::{ComponentKind, ProtocolExposure};
use crate::rules::{Rule, RuleGroup, RuleTable};

use super::ComponentAnalyzer;

type M = ProtocolExposure;

pub struct ProtocolRiskAnalyzer {
    table: RuleTable<M>,
    weight: f64,
}

impl ProtocolRiskAnalyzer {
    pub fn new(t: &ProtocolThresholds, weight: f64) -> Self {
        Self {
            table: build_table(t),
            weight,
        }
    }
}

impl ComponentAnalyzer for ProtocolRiskAnalyzer {
    type Metrics = M;

    const KIND: ComponentKind = ComponentKind::ProtocolInteractions;

    fn table(&self) -> &RuleTable<M> {
        &self.table
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

fn usd(amount: f64) -> String {
    if amount >= 1e9 {
        format!("${:.1}B", amount / 1e9)
    } else {
        format!("${:.1}M", amount / 1e6)
    }
}

fn build_table(t: &ProtocolThresholds) -> RuleTable<M> {
    let (share_factor, share_cap) = (t.high_risk_share_factor, t.high_risk_share_cap);
    let low_diversification = t.low_diversification_categories;
    let (very_high_tvl, high_tvl, medium_tvl, low_tvl) =
        (t.very_high_tvl_usd, t.high_tvl_usd, t.medium_tvl_usd, t.low_tvl_usd);
    let per_very_high = t.very_high_risk_delta_per_protocol;

    RuleTable::new()
        .group(
            RuleGroup::terminal("exposure").band(
                Rule::new("no_protocols", |m: &M| m.is_empty())
                    .delta(t.no_protocols_delta)
                    .label(|_| "No DeFi protocol interactions".to_string())
                    .advice("No smart contract protocol exposure detected"),
            ),
        )
        .group(
            RuleGroup::new("high_risk_share").band(
                Rule::new("high_risk_protocols", |m: &M| m.high_risk_count() > 0)
                    .delta_with(move |m| (m.high_risk_ratio() * share_factor).min(share_cap))
                    .label(|m| format!("High-risk protocols: {}/{}", m.high_risk_count(), m.protocol_count()))
                    .advice("Research security audits and exploit history of the high-risk protocols used"),
            ),
        )
        .group(
            RuleGroup::new("diversification")
                .band(
                    Rule::new("single_category", |m: &M| m.diversification() == 1)
                        .delta(t.single_category_delta)
                        .label(|_| "Single protocol category".to_string())
                        .advice("Exposure is limited to one protocol category; spread across categories"),
                )
                .band(
                    Rule::new("low_diversification", move |m: &M| m.diversification() < low_diversification)
                        .delta(t.low_diversification_delta)
                        .label(|m| format!("Low diversification: {} categories", m.diversification()))
                        .advice("Consider using protocols from additional categories"),
                )
                .band(
                    Rule::new("good_diversification", |_: &M| true)
                        .delta(t.diversification_delta)
                        .label(|m| format!("Good diversification: {} categories", m.diversification()))
                        .advice("Protocol usage is spread across categories; keep it that way"),
                ),
        )
        .group(
            RuleGroup::new("tvl")
                .band(
                    Rule::new("very_high_tvl", move |m: &M| m.total_tvl_usd() > very_high_tvl)
                        .delta(t.very_high_tvl_delta)
                        .label(|m| format!("Very high TVL protocols: {}", usd(m.total_tvl_usd())))
                        .advice("Interacts with deep, established protocols"),
                )
                .band(
                    Rule::new("high_tvl", move |m: &M| m.total_tvl_usd() > high_tvl)
                        .delta(t.high_tvl_delta)
                        .label(|m| format!("High TVL protocols: {}", usd(m.total_tvl_usd())))
                        .advice("Interacts mostly with well-capitalized protocols"),
                )
                .band(
                    Rule::new("medium_tvl", move |m: &M| m.total_tvl_usd() > medium_tvl)
                        .delta(t.medium_tvl_delta)
                        .label(|m| format!("Medium TVL protocols: {}", usd(m.total_tvl_usd())))
                        .advice("Protocol liquidity is moderate; watch for TVL stability"),
                )
                .band(
                    Rule::new("low_tvl", move |m: &M| m.total_tvl_usd() < low_tvl)
                        .delta(t.low_tvl_delta)
                        .label(|m| format!("Low TVL protocols: {}", usd(m.total_tvl_usd())))
                        .advice("Low-TVL protocols carry higher rug-pull and exploit risk; verify audits"),
                ),
        )
        .group(
            RuleGroup::new("very_high_tier").band(
                Rule::new("very_high_risk_protocols", |m: &M| m.very_high_risk_count() > 0)
                    .delta_with(move |m| m.very_high_risk_count() as f64 * per_very_high)
                    .label(|m| format!("Very high-risk protocols: {}", m.very_high_risk_count()))
                    .advice("Exit or strictly limit exposure to very high-risk protocols"),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProtocolInteraction, ProtocolRiskTier};

    fn protocol(id: &str, category: &str, tier: ProtocolRiskTier, tvl: f64) -> ProtocolInteraction {
        ProtocolInteraction {
            protocol_id: id.to_string(),
            category: category.to_string(),
            risk_tier: tier,
            tvl_usd: tvl,
        }
    }

    fn analyzer() -> ProtocolRiskAnalyzer {
        ProtocolRiskAnalyzer::new(&ProtocolThresholds::default(), 0.30)
    }

    #[test]
    fn test_no_protocols_scores_zero() {
        let score = analyzer().score(&ProtocolExposure::default());
        assert_eq!(score.adjustments.len(), 1);
        assert_eq!(score.adjustments[0].rule, "no_protocols");
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_blue_chip_diversified_exposure() {
        let exposure = ProtocolExposure::new(vec![
            protocol("aave", "Lending", ProtocolRiskTier::Low, 5e9),
            protocol("uniswap", "Dexes", ProtocolRiskTier::Low, 3e9),
            protocol("lido", "Liquid Staking", ProtocolRiskTier::Low, 4e9),
        ]);
        let score = analyzer().score(&exposure);
        let rules: Vec<&str> = score.adjustments.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(rules, vec!["good_diversification", "high_tvl"]);
        assert_eq!(score.score, 30.0);
    }

    #[test]
    fn test_tvl_applies_once_on_aggregate() {
        let exposure = ProtocolExposure::new(vec![
            protocol("a", "Lending", ProtocolRiskTier::Low, 30e9),
            protocol("b", "Lending", ProtocolRiskTier::Low, 30e9),
        ]);
        let score = analyzer().score(&exposure);
        let tvl: Vec<_> = score.adjustments.iter().filter(|a| a.rule.ends_with("_tvl")).collect();
        assert_eq!(tvl.len(), 1);
        assert_eq!(tvl[0].rule, "very_high_tvl");
        assert_eq!(tvl[0].label, "Very high TVL protocols: $60.0B");
    }

    #[test]
    fn test_high_risk_share_and_very_high_tier() {
        let exposure = ProtocolExposure::new(vec![
            protocol("degen", "Derivatives", ProtocolRiskTier::VeryHigh, 50e6),
            protocol("farm", "Yield", ProtocolRiskTier::High, 20e6),
            protocol("aave", "Lending", ProtocolRiskTier::Low, 10e6),
            protocol("curve", "Dexes", ProtocolRiskTier::Medium, 5e6),
        ]);
        let score = analyzer().score(&exposure);
        let deltas: Vec<(&str, f64)> = score
            .adjustments
            .iter()
            .map(|a| (a.rule.as_str(), a.delta))
            .collect();
        assert_eq!(
            deltas,
            vec![
                ("high_risk_protocols", 15.0),
                ("good_diversification", -10.0),
                ("low_tvl", 15.0),
                ("very_high_risk_protocols", 5.0),
            ]
        );
        assert_eq!(score.score, 75.0);
    }

    #[test]
    fn test_high_risk_share_is_capped() {
        let exposure = ProtocolExposure::new(vec![protocol(
            "degen",
            "Derivatives",
            ProtocolRiskTier::VeryHigh,
            2e9,
        )]);
        let score = analyzer().score(&exposure);
        let share = score
            .adjustments
            .iter()
            .find(|a| a.rule == "high_risk_protocols")
            .unwrap();
        assert_eq!(share.delta, 30.0);
        // 50 + 30 + 15 (single category) - 5 (medium TVL) + 5 (very high tier)
        assert_eq!(score.score, 95.0);
    }
}
