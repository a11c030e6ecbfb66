use thiserror::Error;

use crate::lock::LockError;
use crate::stock::StockId;
use crate::store::StoreError;

/// Why a `decrease` call did not commit.
///
/// Every variant is returned only after held locks are released and the
/// open transaction is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecreaseError {
    /// The decrement would drive the quantity below zero. Never retried.
    #[error("insufficient stock for {id}: requested {requested}, available {available}")]
    InsufficientStock {
        id: StockId,
        available: u64,
        requested: u64,
    },
    /// Quantity to remove must be positive.
    #[error("decrease quantity for {id} must be positive")]
    InvalidQuantity { id: StockId },
    #[error("stock {id} not found")]
    NotFound { id: StockId },
    /// An optimistic write lost a race. Retried internally by the optimistic strategy.
    #[error("concurrent write detected for stock {id} (expected version {expected})")]
    VersionConflict { id: StockId, expected: u64 },
    /// The row lock could not be obtained within the store's lock wait timeout.
    #[error("timed out waiting for row lock on stock {id}")]
    LockTimeout { id: StockId },
    #[error("deadlock while locking stock {id}")]
    Deadlock { id: StockId },
    /// The named lock could not be acquired; the decrement was not attempted.
    #[error("named lock '{key}' unavailable: {reason}")]
    LockUnavailable {
        key: String,
        #[source]
        reason: LockError,
    },
    /// The optimistic retry loop hit its attempt cap or deadline.
    #[error("gave up on stock {id} after {attempts} conflicting attempts")]
    RetryExhausted { id: StockId, attempts: u32 },
    #[error(transparent)]
    Store(StoreError),
}

impl DecreaseError {
    /// Whether repeating the same call may succeed without outside changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecreaseError::VersionConflict { .. })
    }
}

impl From<StoreError> for DecreaseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => DecreaseError::NotFound { id },
            StoreError::LockTimeout { id } => DecreaseError::LockTimeout { id },
            StoreError::Deadlock { id } => DecreaseError::Deadlock { id },
            other => DecreaseError::Store(other),
        }
    }
}
