use thiserror::Error;

use crate::stock::StockId;

/// Error type for counter store and transaction operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("stock {id} not found")]
    NotFound { id: StockId },
    #[error("stock {id} already exists")]
    AlreadyExists { id: StockId },
    /// Waiting for another transaction's row lock exceeded the lock wait timeout.
    #[error("timed out waiting for row lock on stock {id}")]
    LockTimeout { id: StockId },
    /// Waiting for the row lock would close a cycle of waiting transactions.
    #[error("deadlock detected while locking stock {id}")]
    Deadlock { id: StockId },
    /// The transaction was opened by a different store.
    #[error("transaction does not belong to this store")]
    ForeignTransaction,
    #[error("store lock poisoned during {0}")]
    Poisoned(&'static str),
}
