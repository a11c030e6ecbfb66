//! Counter store and transaction boundary.
//!
//! The store owns every [`StockRecord`](crate::StockRecord); callers never
//! cache a record across transactions.
//!
//! ## Example
//!
//! ```ignore
//! use stock_guard::{in_transaction, CounterStore, InMemoryStockStore, StockId};
//!
//! let store = InMemoryStockStore::new();
//! store.insert(StockId(1), 100)?;
//!
//! in_transaction(&store, |tx| {
//!     let record = store.read_for_update(tx, StockId(1))?;
//!     store.write(tx, StockId(1), record.quantity - 1)
//! })?;
//! ```

mod error;
mod in_memory;
#[allow(clippy::module_inception)]
mod store;
mod transaction;

pub use error::StoreError;
pub use in_memory::{InMemoryStockStore, InMemoryTransaction, DEFAULT_LOCK_WAIT_TIMEOUT};
pub use store::{CounterStore, Transaction, TransactionBoundary};
pub use transaction::in_transaction;
