//! Wallet data collaborator
//!
//! Fetching and normalizing raw chain data happens outside the core. The core
//! only consumes the normalized pieces through [`WalletDataProvider`].

use async_trait::async_trait;

use crate::error::RiskResult;
use crate::models::{BalanceData, ProtocolInteraction, TransactionHistorySummary, WalletSnapshot};

#[async_trait]
pub trait WalletDataProvider: Send + Sync {
    async fn get_balances(&self, address: &str) -> RiskResult<BalanceData>;

    async fn get_transaction_history(&self, address: &str) -> RiskResult<TransactionHistorySummary>;

    async fn get_protocol_interactions(&self, address: &str) -> RiskResult<Vec<ProtocolInteraction>>;
}

/// Fetch the three parts concurrently and assemble a snapshot.
///
/// The first `DataUnavailable` error wins; no partial snapshot is built.
pub async fn build_snapshot(provider: &dyn WalletDataProvider, address: &str) -> RiskResult<WalletSnapshot> {
    let (balances, history, protocols) = tokio::try_join!(
        provider.get_balances(address),
        provider.get_transaction_history(address),
        provider.get_protocol_interactions(address),
    )?;

    Ok(WalletSnapshot {
        address: address.to_string(),
        balances,
        history,
        protocols,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;

    struct FlakyProvider;

    #[async_trait]
    impl WalletDataProvider for FlakyProvider {
        async fn get_balances(&self, _address: &str) -> RiskResult<BalanceData> {
            Ok(BalanceData::default())
        }

        async fn get_transaction_history(&self, _address: &str) -> RiskResult<TransactionHistorySummary> {
            Err(RiskError::data_unavailable("etherscan", "rate limited"))
        }

        async fn get_protocol_interactions(&self, _address: &str) -> RiskResult<Vec<ProtocolInteraction>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_data_unavailable_propagates() {
        let err = build_snapshot(&FlakyProvider, "0xabc").await.unwrap_err();
        assert_eq!(err, RiskError::data_unavailable("etherscan", "rate limited"));
    }
}
