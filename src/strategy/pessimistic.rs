use crate::error::DecreaseError;
use crate::stock::{apply_decrease, DecreaseRequest, StockId, WriteMode};
use crate::store::{in_transaction, CounterStore};

use super::DecreaseStock;

/// Serializes decrements per row with an exclusive row lock.
///
/// Each call reads the row with `read_for_update`, so concurrent callers on
/// the same id block (never spin) until the holder's transaction ends.
pub struct PessimisticLockStockService<S> {
    store: S,
}

impl<S: CounterStore> PessimisticLockStockService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn decrease_request(&self, request: DecreaseRequest) -> Result<u64, DecreaseError> {
        in_transaction(&self.store, |tx| -> Result<u64, DecreaseError> {
            let record = self.store.read_for_update(tx, request.id())?;
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

impl<S: CounterStore> DecreaseStock for PessimisticLockStockService<S> {
    fn decrease(&self, id: StockId, quantity: u64) -> Result<(), DecreaseError> {
        let request = DecreaseRequest::new(id, quantity)?;
        let remaining = self.decrease_request(request)?;
        tracing::debug!(stock_id = %id, quantity, remaining, "pessimistic decrease committed");
        Ok(())
    }
}
