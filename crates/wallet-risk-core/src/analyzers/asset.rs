//! Portfolio concentration analysis

use crate::config::AssetThresholds;
use crate::models::{AssetPortfolio, ComponentKind};
use crate::rules::{Rule, RuleGroup, RuleTable};

use super::ComponentAnalyzer;

type M = AssetPortfolio;

pub struct AssetConcentrationAnalyzer {
    table: RuleTable<M>,
    weight: f64,
}

impl AssetConcentrationAnalyzer {
    pub fn new(t: &AssetThresholds, weight: f64) -> Self {
        Self {
            table: build_table(t),
            weight,
        }
    }
}

impl ComponentAnalyzer for AssetConcentrationAnalyzer {
    type Metrics = M;

    const KIND: ComponentKind = ComponentKind::AssetConcentration;

    fn table(&self) -> &RuleTable<M> {
        &self.table
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

fn build_table(t: &AssetThresholds) -> RuleTable<M> {
    let (low_count, good_count) = (t.low_diversification_count, t.good_diversification_count);
    let (very_large, large, significant, very_low) =
        (t.very_large_eth, t.large_eth, t.significant_eth, t.very_low_eth);
    let (per_stablecoin, stablecoin_cap) = (t.stablecoin_delta_per_token, t.stablecoin_max_reduction);

    RuleTable::new()
        .group(
            RuleGroup::new("diversification")
                .band(
                    Rule::new("eth_only", |m: &M| m.token_count() == 0 && m.eth_balance > 0.0)
                        .delta(t.eth_only_delta)
                        .label(|m| format!("ETH-only portfolio: {:.4} ETH", m.eth_balance))
                        .advice("Holdings are native ETH only, with no token contract exposure"),
                )
                .band(
                    Rule::new("empty_portfolio", |m: &M| m.is_empty())
                        .delta(t.empty_portfolio_delta)
                        .label(|_| "Empty portfolio: 0 assets".to_string())
                        .advice("Wallet holds nothing; it may be a drained or throwaway address"),
                )
                .band(
                    Rule::new("single_token", |m: &M| m.token_count() == 1)
                        .delta(t.single_token_delta)
                        .label(|m| {
                            let symbol = m.tokens.first().map(|token| token.symbol.as_str()).unwrap_or("?");
                            format!("Single-token concentration: {}", symbol)
                        })
                        .advice("Consider portfolio diversification across multiple assets"),
                )
                .band(
                    Rule::new("low_diversification", move |m: &M| m.token_count() < low_count)
                        .delta(t.low_diversification_delta)
                        .label(|m| format!("Low diversification: {} tokens", m.token_count()))
                        .advice("Spread holdings across more assets and protocols"),
                )
                .band(
                    Rule::new("good_diversification", move |m: &M| m.token_count() < good_count)
                        .delta(t.good_diversification_delta)
                        .label(|m| format!("Good diversification: {} tokens", m.token_count()))
                        .advice("Continue maintaining diversified holdings"),
                )
                .band(
                    Rule::new("high_diversification", |_: &M| true)
                        .delta(t.high_diversification_delta)
                        .label(|m| format!("High diversification: {} tokens", m.token_count()))
                        .advice("Holdings are broadly diversified"),
                ),
        )
        .group(
            RuleGroup::new("eth_holdings")
                .band(
                    Rule::new("very_large_eth", move |m: &M| m.eth_balance > very_large)
                        .delta(t.very_large_eth_delta)
                        .label(|m| format!("Whale-sized ETH holdings: {:.2} ETH", m.eth_balance))
                        .advice("Large ETH balance makes this wallet a high-value target; use cold storage"),
                )
                .band(
                    Rule::new("large_eth", move |m: &M| m.eth_balance > large)
                        .delta(t.large_eth_delta)
                        .label(|m| format!("Large ETH holdings: {:.2} ETH", m.eth_balance))
                        .advice("Consider moving part of the ETH balance to cold storage"),
                )
                .band(
                    Rule::new("significant_eth", move |m: &M| m.eth_balance > significant)
                        .delta(t.significant_eth_delta)
                        .label(|m| format!("Significant ETH holdings: {:.2} ETH", m.eth_balance))
                        .advice("Review security practices for a meaningful ETH balance"),
                )
                .band(
                    Rule::new("very_low_eth", move |m: &M| m.eth_balance < very_low && !m.is_empty())
                        .delta(t.very_low_eth_delta)
                        .label(|m| format!("Very low ETH balance: {:.4} ETH", m.eth_balance))
                        .advice("Too little ETH for gas; the wallet may be unable to act on its holdings"),
                ),
        )
        .group(
            RuleGroup::new("stablecoins").band(
                Rule::new("stablecoin_holdings", |m: &M| m.stablecoin_count() > 0)
                    .delta_with(move |m| {
                        (m.stablecoin_count() as f64 * per_stablecoin).clamp(-stablecoin_cap, stablecoin_cap)
                    })
                    .label(|m| format!("Stablecoin exposure: {} tokens", m.stablecoin_count()))
                    .advice("Stablecoin holdings provide good risk mitigation"),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PortfolioToken;

    fn analyzer() -> AssetConcentrationAnalyzer {
        AssetConcentrationAnalyzer::new(&AssetThresholds::default(), 0.20)
    }

    fn portfolio(eth: f64, symbols: &[(&str, bool)]) -> M {
        M {
            eth_balance: eth,
            tokens: symbols
                .iter()
                .map(|(symbol, is_stablecoin)| PortfolioToken {
                    symbol: symbol.to_string(),
                    is_stablecoin: *is_stablecoin,
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_portfolio_scores_80() {
        let score = analyzer().score(&portfolio(0.0, &[]));
        assert_eq!(score.adjustments.len(), 1);
        assert_eq!(score.adjustments[0].rule, "empty_portfolio");
        assert_eq!(score.score, 80.0);
    }

    #[test]
    fn test_dust_eth_only_wallet() {
        let score = analyzer().score(&portfolio(0.005, &[]));
        let rules: Vec<&str> = score.adjustments.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(rules, vec!["eth_only", "very_low_eth"]);
        assert_eq!(score.score, 45.0);
    }

    #[test]
    fn test_token_count_bands() {
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"];
        for (count, expected) in [
            (1, "single_token"),
            (2, "low_diversification"),
            (3, "good_diversification"),
            (9, "good_diversification"),
            (10, "high_diversification"),
        ] {
            let tokens: Vec<(&str, bool)> = names[..count].iter().map(|n| (*n, false)).collect();
            let score = analyzer().score(&portfolio(1.0, &tokens));
            assert_eq!(score.adjustments[0].rule, expected, "{} tokens", count);
        }
    }

    #[test]
    fn test_stablecoin_reduction_is_capped() {
        for (count, expected) in [(2usize, -10.0), (3, -15.0), (10, -15.0)] {
            let names: Vec<String> = (0..count).map(|i| format!("usd{}", i)).collect();
            let tokens: Vec<(&str, bool)> = names.iter().map(|n| (n.as_str(), true)).collect();
            let score = analyzer().score(&portfolio(1.0, &tokens));
            let stable = score
                .adjustments
                .iter()
                .find(|a| a.rule == "stablecoin_holdings")
                .unwrap();
            assert_eq!(stable.delta, expected, "{} stablecoins", count);
        }
    }

    #[test]
    fn test_whale_eth_holdings() {
        let score = analyzer().score(&portfolio(1500.0, &[("uni", false), ("usdc", true)]));
        let deltas: Vec<(&str, f64)> = score
            .adjustments
            .iter()
            .map(|a| (a.rule.as_str(), a.delta))
            .collect();
        assert_eq!(
            deltas,
            vec![
                ("low_diversification", 10.0),
                ("very_large_eth", 25.0),
                ("stablecoin_holdings", -5.0),
            ]
        );
        assert_eq!(score.score, 80.0);
    }
}
