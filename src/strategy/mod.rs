//! Concurrency strategies around the shared decrement rule.
//!
//! All three expose the same [`DecreaseStock`] API. Use one strategy per
//! stock id: mixing pessimistic and optimistic access to the same row
//! defeats both.

mod named_lock;
mod optimistic;
mod pessimistic;
mod retry;

use crate::error::DecreaseError;
use crate::stock::StockId;

pub use named_lock::{NamedLockPolicy, NamedLockStockFacade};
pub use optimistic::OptimisticLockStockFacade;
pub use pessimistic::PessimisticLockStockService;
pub use retry::RetryPolicy;

/// Remove `quantity` units from stock `id`.
pub trait DecreaseStock: Send + Sync {
    /// Fails with `InsufficientStock` (and writes nothing) if the result
    /// would be negative.
    fn decrease(&self, id: StockId, quantity: u64) -> Result<(), DecreaseError>;
}
