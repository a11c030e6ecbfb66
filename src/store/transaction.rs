use super::{StoreError, Transaction, TransactionBoundary};

/// Run `work` inside a fresh transaction.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`. If
/// `work` panics the transaction is dropped, which rolls it back.
pub fn in_transaction<B, T, E, F>(boundary: &B, work: F) -> Result<T, E>
where
    B: TransactionBoundary + ?Sized,
    E: From<StoreError> + std::fmt::Display,
    F: FnOnce(&mut B::Transaction) -> Result<T, E>,
{
    let mut tx = boundary.begin()?;
    tracing::debug!("transaction started");

    match work(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            tracing::debug!("transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            tracing::debug!(error = %err, "transaction rolled back");
            Err(err)
        }
    }
}
