//! Component analyzers
//!
//! Four deterministic analyzers share one contract: take a metrics view, run
//! the rule table built from configuration, return a [`ComponentScore`].

mod asset;
mod behavioral;
mod protocol;
mod transaction;

use std::collections::BTreeMap;

pub use asset::AssetConcentrationAnalyzer;
pub use behavioral::BehavioralPatternAnalyzer;
pub use protocol::ProtocolRiskAnalyzer;
pub use transaction::TransactionPatternAnalyzer;

use crate::config::RiskConfig;
use crate::models::{ComponentKind, ComponentScore, MetricsBundle};
use crate::rules::RuleTable;

pub trait ComponentAnalyzer {
    type Metrics;

    const KIND: ComponentKind;

    fn table(&self) -> &RuleTable<Self::Metrics>;

    fn weight(&self) -> f64;

    /// Score one metrics view. Never fails on well-formed input.
    fn score(&self, metrics: &Self::Metrics) -> ComponentScore {
        let adjustments = self.table().evaluate(metrics);
        for adjustment in &adjustments {
            tracing::debug!(
                component = %Self::KIND,
                rule = adjustment.rule.as_str(),
                delta = adjustment.delta,
                "Rule triggered"
            );
        }
        ComponentScore::from_adjustments(Self::KIND, self.weight(), adjustments)
    }
}

/// The closed registry of analyzers, built once from configuration
pub struct AnalyzerSet {
    transaction: TransactionPatternAnalyzer,
    protocol: ProtocolRiskAnalyzer,
    asset: AssetConcentrationAnalyzer,
    behavioral: BehavioralPatternAnalyzer,
}

impl AnalyzerSet {
    pub fn new(config: &RiskConfig) -> Self {
        let weights = config.weights.effective();
        Self {
            transaction: TransactionPatternAnalyzer::new(
                &config.transaction,
                weights.get(ComponentKind::TransactionPatterns),
            ),
            protocol: ProtocolRiskAnalyzer::new(
                &config.protocol,
                weights.get(ComponentKind::ProtocolInteractions),
            ),
            asset: AssetConcentrationAnalyzer::new(
                &config.asset,
                weights.get(ComponentKind::AssetConcentration),
            ),
            behavioral: BehavioralPatternAnalyzer::new(
                &config.behavioral,
                weights.get(ComponentKind::BehavioralPatterns),
            ),
        }
    }

    pub fn score(&self, kind: ComponentKind, bundle: &MetricsBundle) -> ComponentScore {
        match kind {
            ComponentKind::TransactionPatterns => self.transaction.score(&bundle.transactions),
            ComponentKind::ProtocolInteractions => self.protocol.score(&bundle.protocols),
            ComponentKind::AssetConcentration => self.asset.score(&bundle.assets),
            ComponentKind::BehavioralPatterns => self.behavioral.score(&bundle.behavior),
        }
    }

    /// Run every analyzer, in `ComponentKind::ALL` order
    pub fn score_all(&self, bundle: &MetricsBundle) -> BTreeMap<ComponentKind, ComponentScore> {
        ComponentKind::ALL
            .iter()
            .map(|kind| (*kind, self.score(*kind, bundle)))
            .collect()
    }
}
