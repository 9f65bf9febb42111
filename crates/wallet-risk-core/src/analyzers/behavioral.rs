//! Behavioral pattern analysis: gas bidding, value flow, transaction size,
//! interaction spread and wallet lifecycle.

use crate::config::BehavioralThresholds;
use crate::models::{BehavioralMetrics, ComponentKind};
use crate::rules::{Rule, RuleGroup, RuleTable};

use super::ComponentAnalyzer;

type M = BehavioralMetrics;

pub struct BehavioralPatternAnalyzer {
    table: RuleTable<M>,
    weight: f64,
}

impl BehavioralPatternAnalyzer {
    pub fn new(t: &BehavioralThresholds, weight: f64) -> Self {
        Self {
            table: build_table(t),
            weight,
        }
    }
}

impl ComponentAnalyzer for BehavioralPatternAnalyzer {
    type Metrics = M;

    const KIND: ComponentKind = ComponentKind::BehavioralPatterns;

    fn table(&self) -> &RuleTable<M> {
        &self.table
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

fn diversity_below(m: &M, cut: f64) -> bool {
    m.interaction_diversity.is_some_and(|d| d < cut)
}

fn age_below(m: &M, days: f64) -> bool {
    m.wallet_age_days.is_some_and(|age| age < days)
}

fn build_table(t: &BehavioralThresholds) -> RuleTable<M> {
    let (very_high_gas, high_gas, low_gas) = (t.very_high_gas_price, t.high_gas_price, t.low_gas_price);
    let (heavy_out, moderate_out, accumulation) =
        (t.heavy_outflow_ratio, t.moderate_outflow_ratio, t.accumulation_ratio);
    let (very_large_tx, large_tx) = (t.very_large_transaction_eth, t.large_transaction_eth);
    let (very_concentrated, concentrated, diverse) = (
        t.very_concentrated_interactions,
        t.concentrated_interactions,
        t.diverse_interactions,
    );
    let (very_new, new, old) = (t.very_new_wallet_days, t.new_wallet_days, t.old_wallet_days);

    RuleTable::new()
        .group(
            RuleGroup::new("gas")
                .band(
                    Rule::new("very_high_gas", move |m: &M| m.avg_gas_price_gwei > very_high_gas)
                        .delta(t.very_high_gas_delta)
                        .label(|m| format!("Very high gas usage: {:.1} Gwei", m.avg_gas_price_gwei))
                        .advice("Extreme gas bidding suggests MEV activity or urgent fund extraction"),
                )
                .band(
                    Rule::new("high_gas", move |m: &M| m.avg_gas_price_gwei > high_gas)
                        .delta(t.high_gas_delta)
                        .label(|m| format!("High gas usage: {:.1} Gwei", m.avg_gas_price_gwei))
                        .advice("Consider lower gas prices during off-peak hours"),
                )
                .band(
                    Rule::new("efficient_gas", move |m: &M| m.avg_gas_price_gwei < low_gas)
                        .delta(t.low_gas_delta)
                        .label(|m| format!("Efficient gas usage: {:.1} Gwei", m.avg_gas_price_gwei))
                        .advice("Gas usage is cost-conscious and unhurried"),
                ),
        )
        .group(
            RuleGroup::new("value_flow")
                .band(
                    Rule::new("heavy_outflow", move |m: &M| {
                        m.total_value_out_eth > m.total_value_in_eth * heavy_out
                    })
                    .delta(t.heavy_outflow_delta)
                    .label(|m| {
                        format!(
                            "Heavy fund outflow: {:.2} ETH out vs {:.2} ETH in",
                            m.total_value_out_eth, m.total_value_in_eth
                        )
                    })
                    .advice("Funds are draining out; verify wallet ownership and transaction authenticity"),
                )
                .band(
                    Rule::new("moderate_outflow", move |m: &M| {
                        m.total_value_out_eth > m.total_value_in_eth * moderate_out
                    })
                    .delta(t.moderate_outflow_delta)
                    .label(|_| "Moderate outflow pattern".to_string())
                    .advice("Outflows exceed inflows; monitor where the funds go"),
                )
                .band(
                    Rule::new("accumulation", move |m: &M| {
                        m.total_value_in_eth > m.total_value_out_eth * accumulation
                    })
                    .delta(t.accumulation_delta)
                    .label(|_| "Accumulation pattern".to_string())
                    .advice("Wallet is accumulating value rather than distributing it"),
                ),
        )
        .group(
            RuleGroup::new("transaction_size")
                .band(
                    Rule::new("very_large_transaction", move |m: &M| m.largest_transaction_eth > very_large_tx)
                        .delta(t.very_large_transaction_delta)
                        .label(|m| format!("Very large transaction: {:.2} ETH", m.largest_transaction_eth))
                        .advice("Verify transaction authenticity for high-value transfers"),
                )
                .band(
                    Rule::new("large_transaction", move |m: &M| m.largest_transaction_eth > large_tx)
                        .delta(t.large_transaction_delta)
                        .label(|m| format!("Large transaction: {:.2} ETH", m.largest_transaction_eth))
                        .advice("Confirm large transfers went to known counterparties"),
                ),
        )
        .group(
            RuleGroup::new("interaction_diversity")
                .band(
                    Rule::new("very_concentrated_interactions", move |m: &M| {
                        diversity_below(m, very_concentrated)
                    })
                    .delta(t.very_concentrated_delta)
                    .label(|_| "Very concentrated interactions".to_string())
                    .advice("Nearly all activity targets the same few addresses; check for wash patterns"),
                )
                .band(
                    Rule::new("concentrated_interactions", move |m: &M| diversity_below(m, concentrated))
                        .delta(t.concentrated_delta)
                        .label(|_| "Somewhat concentrated interactions".to_string())
                        .advice("Review the handful of addresses this wallet keeps returning to"),
                )
                .band(
                    Rule::new("diverse_interactions", move |m: &M| {
                        m.interaction_diversity.is_some_and(|d| d > diverse)
                    })
                    .delta(t.diverse_delta)
                    .label(|_| "Diverse interaction pattern".to_string())
                    .advice("Interactions are spread across many addresses"),
                ),
        )
        .group(
            RuleGroup::new("wallet_age")
                .band(
                    Rule::new("very_new_wallet", move |m: &M| age_below(m, very_new))
                        .delta(t.very_new_wallet_delta)
                        .label(move |_| format!("Very new wallet (<{} days)", very_new))
                        .advice("Monitor activity patterns while the wallet establishes history"),
                )
                .band(
                    Rule::new("new_wallet", move |m: &M| age_below(m, new))
                        .delta(t.new_wallet_delta)
                        .label(move |_| format!("New wallet (<{} days)", new))
                        .advice("Wallet history is still short; re-assess as it matures"),
                )
                .band(
                    Rule::new("established_wallet", move |m: &M| m.wallet_age_days.is_some_and(|age| age > old))
                        .delta(t.old_wallet_delta)
                        .label(move |_| format!("Established wallet (>{} days)", old))
                        .advice("Long on-chain history supports trust"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> BehavioralPatternAnalyzer {
        BehavioralPatternAnalyzer::new(&BehavioralThresholds::default(), 0.25)
    }

    fn neutral() -> M {
        M {
            avg_gas_price_gwei: 50.0,
            total_value_in_eth: 10.0,
            total_value_out_eth: 10.0,
            largest_transaction_eth: 1.0,
            interaction_diversity: Some(0.5),
            wallet_age_days: Some(365.0),
        }
    }

    fn rules(metrics: &M) -> Vec<String> {
        analyzer()
            .score(metrics)
            .adjustments
            .into_iter()
            .map(|a| a.rule)
            .collect()
    }

    #[test]
    fn test_neutral_metrics_stay_at_baseline() {
        assert_eq!(analyzer().score(&neutral()).score, 50.0);
    }

    #[test]
    fn test_value_flow_bands() {
        for (value_in, value_out, expected) in [
            (10.0, 31.0, Some("heavy_outflow")),
            (10.0, 16.0, Some("moderate_outflow")),
            (21.0, 10.0, Some("accumulation")),
            (10.0, 12.0, None),
            (0.0, 0.0, None),
        ] {
            let metrics = M {
                total_value_in_eth: value_in,
                total_value_out_eth: value_out,
                ..neutral()
            };
            assert_eq!(
                rules(&metrics).first().map(String::as_str),
                expected,
                "in {} out {}",
                value_in,
                value_out
            );
        }
    }

    #[test]
    fn test_missing_history_skips_diversity_and_age() {
        let metrics = M {
            interaction_diversity: None,
            wallet_age_days: None,
            ..neutral()
        };
        assert!(rules(&metrics).is_empty());
    }

    #[test]
    fn test_fresh_high_risk_wallet() {
        let metrics = M {
            avg_gas_price_gwei: 250.0,
            total_value_in_eth: 5.0,
            total_value_out_eth: 200.0,
            largest_transaction_eth: 150.0,
            interaction_diversity: Some(0.05),
            wallet_age_days: Some(3.0),
        };
        let score = analyzer().score(&metrics);
        assert_eq!(
            rules(&metrics),
            vec![
                "very_high_gas",
                "heavy_outflow",
                "very_large_transaction",
                "very_concentrated_interactions",
                "very_new_wallet",
            ]
        );
        assert_eq!(score.score, 100.0);
    }

    #[test]
    fn test_established_conservative_wallet() {
        let metrics = M {
            avg_gas_price_gwei: 12.0,
            total_value_in_eth: 50.0,
            total_value_out_eth: 20.0,
            largest_transaction_eth: 2.0,
            interaction_diversity: Some(0.8),
            wallet_age_days: Some(1000.0),
        };
        // 50 - 5 (gas) - 5 (accumulation) - 5 (diverse) - 10 (age)
        assert_eq!(analyzer().score(&metrics).score, 25.0);
    }
}
