use crate::stock::{StockId, StockRecord};

use super::StoreError;

/// An open atomic unit of work.
///
/// Dropping a transaction without calling [`Transaction::commit`] must roll it
/// back and release every row lock it holds.
pub trait Transaction: Send {
    fn commit(self) -> Result<(), StoreError>;
    fn rollback(self) -> Result<(), StoreError>;
}

/// Opens transactions around counter store access.
pub trait TransactionBoundary: Send + Sync {
    type Transaction: Transaction;

    fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

/// Versioned quantity storage keyed by [`StockId`].
///
/// Every operation runs inside a transaction obtained from
/// [`TransactionBoundary::begin`]; writes become visible to other
/// transactions only after commit, which bumps the row's version by one.
pub trait CounterStore: TransactionBoundary {
    /// Read the committed row without taking a lock.
    fn read(&self, tx: &mut Self::Transaction, id: StockId) -> Result<StockRecord, StoreError>;

    /// Read the row and hold its exclusive lock until `tx` ends.
    ///
    /// Blocks while another transaction holds the lock. Fails with
    /// [`StoreError::LockTimeout`] or [`StoreError::Deadlock`].
    fn read_for_update(
        &self,
        tx: &mut Self::Transaction,
        id: StockId,
    ) -> Result<StockRecord, StoreError>;

    /// Unconditionally set the quantity. Takes the row lock if not yet held.
    fn write(
        &self,
        tx: &mut Self::Transaction,
        id: StockId,
        quantity: u64,
    ) -> Result<(), StoreError>;

    /// Set the quantity only if the committed version still equals
    /// `expected_version`. Returns `Ok(false)` on a version mismatch or when
    /// another transaction is mid-write on the row; never blocks.
    fn write_if_version_matches(
        &self,
        tx: &mut Self::Transaction,
        id: StockId,
        quantity: u64,
        expected_version: u64,
    ) -> Result<bool, StoreError>;
}
