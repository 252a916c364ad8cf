//! Per-pair mutual exclusion around plan + execute.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Async lock per asset pair. Different pairs never contend.
#[derive(Debug, Default)]
pub struct PairLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `pair`; released when the guard drops.
    pub async fn lock(&self, pair: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Only this map references idle locks.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(pair.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of pairs currently locked or waited on.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|l| Arc::strong_count(l) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_pair_waits() {
        let locks = PairLocks::new();
        let guard = locks.lock("BTC/USDT").await;

        let blocked = timeout(Duration::from_millis(50), locks.lock("BTC/USDT")).await;
        assert!(blocked.is_err());

        drop(guard);
        let acquired = timeout(Duration::from_millis(50), locks.lock("BTC/USDT")).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_pairs_do_not_contend() {
        let locks = PairLocks::new();
        let _btc = locks.lock("BTC/USDT").await;

        let eth = timeout(Duration::from_millis(50), locks.lock("ETH/USDT")).await;
        assert!(eth.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let locks = PairLocks::new();
        drop(locks.lock("BTC/USDT").await);
        drop(locks.lock("ETH/USDT").await);
        assert_eq!(locks.active(), 0);

        let _sol = locks.lock("SOL/USDT").await;
        assert_eq!(locks.locks.lock().unwrap().len(), 1);
    }
}
