//! Runtime selection of a decrease strategy.
//!
//! ```ignore
//! let config = StockGuardConfig::from_json_str(r#"{
//!     "strategy": "optimistic",
//!     "retry": { "interval_ms": 10, "multiplier": 2.0, "max_interval_ms": 500, "jitter": true, "max_attempts": 20 }
//! }"#)?;
//! let decrease = config.build(store, InMemoryLockProvider::new());
//! decrease.decrease(StockId(1), 1)?;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lock::LockProvider;
use crate::store::CounterStore;
use crate::strategy::{
    DecreaseStock, NamedLockPolicy, NamedLockStockFacade, OptimisticLockStockFacade,
    PessimisticLockStockService, RetryPolicy,
};

/// Which concurrency discipline guards decrements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Pessimistic,
    Optimistic,
    NamedLock,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid stock guard config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid stock guard config: {0}")]
    Invalid(String),
}

/// Strategy choice plus per-strategy settings. Missing fields take the
/// baseline defaults: pessimistic, 50 ms unbounded retry, no lock timeout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockGuardConfig {
    pub strategy: StrategyKind,
    pub retry: RetryPolicy,
    pub named_lock: NamedLockPolicy,
}

impl StockGuardConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let multiplier = self.retry.multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "retry.multiplier must be a finite number >= 1.0, got {multiplier}"
            )));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Build the configured strategy over `store`. `locks` is only used by
    /// the named-lock strategy.
    pub fn build<S, L>(&self, store: S, locks: L) -> Box<dyn DecreaseStock>
    where
        S: CounterStore + 'static,
        L: LockProvider + 'static,
    {
        tracing::info!(strategy = ?self.strategy, "building stock decrease strategy");
        match self.strategy {
            StrategyKind::Pessimistic => Box::new(PessimisticLockStockService::new(store)),
            StrategyKind::Optimistic => Box::new(OptimisticLockStockFacade::with_policy(
                store,
                self.retry.clone(),
            )),
            StrategyKind::NamedLock => Box::new(NamedLockStockFacade::with_policy(
                store,
                locks,
                self.named_lock,
            )),
        }
    }
}
