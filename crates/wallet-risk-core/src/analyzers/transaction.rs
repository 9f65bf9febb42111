//! Transaction pattern analysis: success rate, cadence, value mix, contract
//! usage, recency, gas and counterparty spread.

use crate::config::TransactionThresholds;
use crate::models::{ComponentKind, TransactionPatternMetrics};
use crate::rules::{Rule, RuleGroup, RuleTable};

use super::ComponentAnalyzer;

type M = TransactionPatternMetrics;

pub struct TransactionPatternAnalyzer {
    table: RuleTable<M>,
    weight: f64,
}

impl TransactionPatternAnalyzer {
    pub fn new(t: &TransactionThresholds, weight: f64) -> Self {
        Self {
            table: build_table(t),
            weight,
        }
    }
}

impl ComponentAnalyzer for TransactionPatternAnalyzer {
    type Metrics = M;

    const KIND: ComponentKind = ComponentKind::TransactionPatterns;

    fn table(&self) -> &RuleTable<M> {
        &self.table
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

fn pct(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn build_table(t: &TransactionThresholds) -> RuleTable<M> {
    let (low_sr, moderate_sr, high_sr) = (t.low_success_rate, t.moderate_success_rate, t.high_success_rate);
    let (very_high_freq, high_freq, low_freq) = (t.very_high_frequency, t.high_frequency, t.low_frequency);
    let (normal_min, normal_max) = (t.normal_frequency_min, t.normal_frequency_max);
    let (very_high_value, high_value) = (t.very_high_value_ratio, t.high_value_ratio);
    let (very_high_contract, high_contract, low_contract) =
        (t.very_high_contract_ratio, t.high_contract_ratio, t.low_contract_ratio);
    let (dormant_min, recent_threshold, inactive_days) =
        (t.dormant_min_transactions, t.recent_activity_threshold, t.inactive_days);
    let high_gas = t.high_gas_price;
    let low_diversity = t.low_address_diversity;

    RuleTable::new()
        .group(
            RuleGroup::terminal("inactivity").band(
                Rule::new("no_transactions", |m: &M| m.total_transactions == 0)
                    .delta(t.no_transactions_delta)
                    .label(|_| "No transaction history".to_string())
                    .advice("Treat as unproven; there is no on-chain history to vouch for this wallet"),
            ),
        )
        .group(
            RuleGroup::new("success_rate")
                .band(
                    Rule::new("low_success_rate", move |m: &M| m.success_rate < low_sr)
                        .delta(t.low_success_delta)
                        .label(|m| format!("Low success rate: {}", pct(m.success_rate)))
                        .advice("Review failed transactions for bot activity or exploit attempts"),
                )
                .band(
                    Rule::new("moderate_success_rate", move |m: &M| m.success_rate < moderate_sr)
                        .delta(t.moderate_success_delta)
                        .label(|m| format!("Moderate success rate: {}", pct(m.success_rate)))
                        .advice("Check why a notable share of transactions reverts"),
                )
                .band(
                    Rule::new("high_success_rate", move |m: &M| m.success_rate > high_sr)
                        .delta(t.high_success_delta)
                        .label(|m| format!("High success rate: {}", pct(m.success_rate)))
                        .advice("Consistent execution history supports trust"),
                ),
        )
        .group(
            RuleGroup::new("frequency")
                .band(
                    Rule::new("very_high_activity", move |m: &M| m.activity_frequency > very_high_freq)
                        .delta(t.very_high_frequency_delta)
                        .label(|m| format!("Very high activity: {:.1} tx/day", m.activity_frequency))
                        .advice("Activity at this rate suggests automation; verify it is not a bot"),
                )
                .band(
                    Rule::new("high_activity", move |m: &M| m.activity_frequency > high_freq)
                        .delta(t.high_frequency_delta)
                        .label(|m| format!("High activity: {:.1} tx/day", m.activity_frequency))
                        .advice("Monitor for automated trading patterns"),
                )
                .band(
                    Rule::new("very_low_activity", move |m: &M| m.activity_frequency < low_freq)
                        .delta(t.low_frequency_delta)
                        .label(|m| format!("Very low activity: {:.3} tx/day", m.activity_frequency))
                        .advice("Sparse history gives little evidence; regular activity helps establish trust"),
                )
                .band(
                    Rule::new("normal_activity", move |m: &M| {
                        (normal_min..=normal_max).contains(&m.activity_frequency)
                    })
                    .delta(t.normal_frequency_delta)
                    .label(|m| format!("Normal activity: {:.1} tx/day", m.activity_frequency))
                    .advice("Activity cadence is consistent with a human user"),
                ),
        )
        .group(
            RuleGroup::new("high_value")
                .band(
                    Rule::new("very_high_value_ratio", move |m: &M| m.high_value_ratio > very_high_value)
                        .delta(t.very_high_value_delta)
                        .label(|m| format!("High-value transaction ratio: {}", pct(m.high_value_ratio)))
                        .advice("Apply additional security checks to large transfers"),
                )
                .band(
                    Rule::new("high_value_ratio", move |m: &M| m.high_value_ratio > high_value)
                        .delta(t.high_value_delta)
                        .label(|m| format!("Moderate high-value transactions: {}", pct(m.high_value_ratio)))
                        .advice("Verify the authenticity of high-value transfers"),
                ),
        )
        .group(
            RuleGroup::new("contract_ratio")
                .band(
                    Rule::new("very_high_contract_ratio", move |m: &M| m.contract_ratio > very_high_contract)
                        .delta(t.very_high_contract_delta)
                        .label(|m| format!("Very high DeFi usage: {}", pct(m.contract_ratio)))
                        .advice("Almost all activity is contract calls; audit the contracts involved"),
                )
                .band(
                    Rule::new("high_contract_ratio", move |m: &M| m.contract_ratio > high_contract)
                        .delta(t.high_contract_delta)
                        .label(|m| format!("High DeFi usage: {}", pct(m.contract_ratio)))
                        .advice("Review which contracts the wallet interacts with"),
                )
                .band(
                    Rule::new("low_contract_ratio", move |m: &M| m.contract_ratio < low_contract)
                        .delta(t.low_contract_delta)
                        .label(|m| format!("Low DeFi usage: {}", pct(m.contract_ratio)))
                        .advice("Mostly plain transfers with limited smart contract exposure"),
                ),
        )
        .group(
            RuleGroup::new("recent_activity")
                .band(
                    Rule::new("inactive_wallet", move |m: &M| {
                        m.recent_transactions == 0 && m.total_transactions > dormant_min
                    })
                    .delta(t.dormant_delta)
                    .label(move |_| format!("No recent activity ({} days)", inactive_days))
                    .advice("Dormant wallet; confirm it is still controlled by its owner"),
                )
                .band(
                    Rule::new("recent_burst", move |m: &M| m.recent_transactions > recent_threshold)
                        .delta(t.recent_activity_delta)
                        .label(|m| format!("Very active recently: {} txs", m.recent_transactions))
                        .advice("Recent burst of activity; check for compromise or airdrop farming"),
                ),
        )
        .group(
            RuleGroup::new("gas").band(
                Rule::new("high_gas_price", move |m: &M| m.avg_gas_price_gwei > high_gas)
                    .delta(t.high_gas_delta)
                    .label(|m| format!("High gas prices: {:.1} Gwei", m.avg_gas_price_gwei))
                    .advice("Consistently high gas bids can indicate MEV or urgent fund movement"),
            ),
        )
        .group(
            RuleGroup::new("counterparty_diversity").band(
                Rule::new("low_address_diversity", move |m: &M| {
                    m.total_transactions > 0 && m.address_diversity < low_diversity
                })
                .delta(t.low_address_diversity_delta)
                .label(|m| format!("Low address diversity: {:.2}", m.address_diversity))
                .advice("Activity is concentrated on very few counterparties; review them"),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> TransactionPatternAnalyzer {
        TransactionPatternAnalyzer::new(&TransactionThresholds::default(), 0.25)
    }

    fn neutral() -> M {
        M {
            total_transactions: 100,
            success_rate: 0.90,
            activity_frequency: 0.5,
            high_value_ratio: 0.0,
            contract_ratio: 0.5,
            recent_transactions: 5,
            avg_gas_price_gwei: 30.0,
            address_diversity: 0.5,
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
        let score = analyzer().score(&neutral());
        assert!(score.adjustments.is_empty());
        assert_eq!(score.score, 50.0);
        assert_eq!(score.weight, 0.25);
    }

    #[test]
    fn test_no_transactions_is_terminal() {
        let metrics = M {
            total_transactions: 0,
            ..M::default()
        };
        let score = analyzer().score(&metrics);
        assert_eq!(rules(&metrics), vec!["no_transactions"]);
        assert_eq!(score.score, 90.0);
    }

    #[test]
    fn test_success_rate_bands() {
        for (rate, expected) in [
            (0.60, Some("low_success_rate")),
            (0.80, Some("moderate_success_rate")),
            (0.90, None),
            (0.97, Some("high_success_rate")),
        ] {
            let metrics = M {
                success_rate: rate,
                ..neutral()
            };
            let fired = rules(&metrics);
            assert_eq!(fired.first().map(String::as_str), expected, "rate {}", rate);
        }
    }

    #[test]
    fn test_frequency_bands() {
        for (freq, expected) in [
            (25.0, "very_high_activity"),
            (12.0, "high_activity"),
            (0.05, "very_low_activity"),
            (1.0, "normal_activity"),
            (5.0, "normal_activity"),
        ] {
            let metrics = M {
                activity_frequency: freq,
                ..neutral()
            };
            assert_eq!(rules(&metrics), vec![expected], "frequency {}", freq);
        }
        let metrics = M {
            activity_frequency: 7.0,
            ..neutral()
        };
        assert!(rules(&metrics).is_empty());
    }

    #[test]
    fn test_dormancy_requires_history() {
        let dormant = M {
            recent_transactions: 0,
            total_transactions: 11,
            ..neutral()
        };
        assert_eq!(rules(&dormant), vec!["inactive_wallet"]);

        let young = M {
            recent_transactions: 0,
            total_transactions: 10,
            ..neutral()
        };
        assert!(rules(&young).is_empty());

        let burst = M {
            recent_transactions: 51,
            ..neutral()
        };
        assert_eq!(rules(&burst), vec!["recent_burst"]);
    }

    #[test]
    fn test_independent_groups_stack() {
        let metrics = M {
            success_rate: 0.5,
            activity_frequency: 30.0,
            high_value_ratio: 0.6,
            contract_ratio: 0.95,
            recent_transactions: 60,
            avg_gas_price_gwei: 150.0,
            address_diversity: 0.05,
            ..neutral()
        };
        let score = analyzer().score(&metrics);
        assert_eq!(score.adjustments.len(), 7);
        assert!((score.net_adjustment() - 100.0).abs() < 1e-9);
        assert_eq!(score.score, 100.0);
    }
}
