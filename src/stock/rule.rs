use crate::error::DecreaseError;
use crate::store::CounterStore;

use super::StockRecord;

/// How [`apply_decrease`] persists the reduced quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The caller already holds exclusivity on the row.
    Unconditional,
    /// Write only if the row is still at the version that was read.
    IfVersionMatches,
}

/// The decrement rule shared by every strategy.
///
/// Takes `quantity` out of `record` and persists the result for `record.id`.
/// Performs no write when the result would be negative. Returns the
/// remaining quantity.
pub fn apply_decrease<S>(
    store: &S,
    tx: &mut S::Transaction,
    record: &StockRecord,
    quantity: u64,
    mode: WriteMode,
) -> Result<u64, DecreaseError>
where
    S: CounterStore + ?Sized,
{
    let remaining = record.remaining_after(quantity)?;

    match mode {
        WriteMode::Unconditional => store.write(tx, record.id, remaining)?,
        WriteMode::IfVersionMatches => {
            if !store.write_if_version_matches(tx, record.id, remaining, record.version)? {
                return Err(DecreaseError::VersionConflict {
                    id: record.id,
                    expected: record.version,
                });
            }
        }
    }

    Ok(remaining)
}
