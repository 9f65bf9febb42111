use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use wallet_risk_core::{RiskAssessment, WalletSnapshot};

use crate::config::CacheConfig;
use crate::error::Result;

/// Cache key: the same address with different data is a different entry
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub address: String,
    pub fingerprint: u64,
    pub rule_only: bool,
}

impl CacheKey {
    pub fn for_snapshot(snapshot: &WalletSnapshot, rule_only: bool) -> Result<Self> {
        let canonical = serde_json::to_string(snapshot)?;
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);

        Ok(Self {
            address: snapshot.address.to_lowercase(),
            fingerprint: hasher.finish(),
            rule_only,
        })
    }
}

/// Assessment cache; repeated calls for an unchanged snapshot skip the AI round trip
#[derive(Clone)]
pub struct AssessmentCache {
    cache: Cache<CacheKey, Arc<RiskAssessment>>,
}

impl AssessmentCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<RiskAssessment>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, assessment: Arc<RiskAssessment>) {
        self.cache.insert(key, assessment).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_risk_core::{BalanceData, RiskConfig, RiskEngine, TransactionHistorySummary};

    fn snapshot(eth: f64) -> WalletSnapshot {
        WalletSnapshot {
            address: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string(),
            balances: BalanceData {
                eth_balance: eth,
                ..Default::default()
            },
            history: TransactionHistorySummary::default(),
            protocols: vec![],
        }
    }

    #[test]
    fn test_key_tracks_snapshot_contents() {
        let a = CacheKey::for_snapshot(&snapshot(1.0), false).unwrap();
        let b = CacheKey::for_snapshot(&snapshot(1.0), false).unwrap();
        let c = CacheKey::for_snapshot(&snapshot(2.0), false).unwrap();
        let d = CacheKey::for_snapshot(&snapshot(1.0), true).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.address, "0x742d35cc6634c0532925a3b844bc454e4438f44e");
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = AssessmentCache::new(&CacheConfig::default());
        let engine = RiskEngine::new(RiskConfig::default()).unwrap();
        let wallet = snapshot(1.0);
        let assessment = Arc::new(engine.assess_rule_based(&wallet).unwrap());

        let key = CacheKey::for_snapshot(&wallet, true).unwrap();
        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), Arc::clone(&assessment)).await;
        assert_eq!(cache.get(&key).await.unwrap().overall_risk_score, assessment.overall_risk_score);
    }
}
