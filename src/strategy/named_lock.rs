use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DecreaseError;
use crate::lock::{LockGuard, LockProvider};
use crate::stock::{apply_decrease, DecreaseRequest, StockId, WriteMode};
use crate::store::{in_transaction, CounterStore};

use super::DecreaseStock;

/// Acquisition settings for [`NamedLockStockFacade`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedLockPolicy {
    /// Give up on the named lock after this long. `None` waits indefinitely.
    pub acquire_timeout_ms: Option<u64>,
}

impl NamedLockPolicy {
    pub fn with_acquire_timeout(timeout: Duration) -> Self {
        Self {
            acquire_timeout_ms: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

/// Serializes decrements per row through an external named lock.
///
/// The lock key is the row id's decimal form. The decrement runs in its own
/// store transaction while the named lock is held, so the lock service and
/// the store may be separate systems. The lock is released on every path.
pub struct NamedLockStockFacade<S, L> {
    store: S,
    locks: L,
    policy: NamedLockPolicy,
}

impl<S: CounterStore, L: LockProvider> NamedLockStockFacade<S, L> {
    pub fn new(store: S, locks: L) -> Self {
        Self::with_policy(store, locks, NamedLockPolicy::default())
    }

    pub fn with_policy(store: S, locks: L, policy: NamedLockPolicy) -> Self {
        Self {
            store,
            locks,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &L {
        &self.locks
    }

    fn decrease_locked(&self, request: &DecreaseRequest) -> Result<u64, DecreaseError> {
        in_transaction(&self.store, |tx| -> Result<u64, DecreaseError> {
            let record = self.store.read(tx, request.id())?;
            apply_decrease(
                &self.store,
                tx,
                &record,
                request.quantity(),
                WriteMode::Unconditional,
            )
        })
    }
}

impl<S: CounterStore, L: LockProvider> DecreaseStock for NamedLockStockFacade<S, L> {
    fn decrease(&self, id: StockId, quantity: u64) -> Result<(), DecreaseError> {
        let request = DecreaseRequest::new(id, quantity)?;
        let key = request.lock_key();

        let timeout = self.policy.acquire_timeout();
        let guard = LockGuard::acquire(&self.locks, &key, timeout).map_err(|reason| {
            tracing::warn!(lock_key = %key, error = %reason, "named lock unavailable");
            DecreaseError::LockUnavailable {
                key: key.clone(),
                reason,
            }
        })?;

        let result = self.decrease_locked(&request);

        if let Err(err) = guard.release() {
            tracing::error!(lock_key = %key, error = %err, "failed to release named lock");
        }

        let remaining = result?;
        tracing::debug!(stock_id = %id, quantity, remaining, "named lock decrease committed");
        Ok(())
    }
}
