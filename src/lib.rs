//! Concurrency-safe stock decrements.
//!
//! Three interchangeable strategies guard the same rule, "take `quantity`
//! out of a row, never below zero":
//!
//! - [`PessimisticLockStockService`]: exclusive row lock for the transaction.
//! - [`OptimisticLockStockFacade`]: versioned write, retried on conflict.
//! - [`NamedLockStockFacade`]: external named lock around a separate transaction.
//!
//! Storage, transactions and named locks are collaborators behind the
//! [`CounterStore`], [`TransactionBoundary`] and [`LockProvider`] traits, with
//! in-memory implementations included.

mod config;
mod error;
mod lock;
mod stock;
mod store;
mod strategy;

pub use config::{ConfigError, StockGuardConfig, StrategyKind};
pub use error::DecreaseError;
pub use lock::{InMemoryLockProvider, LockError, LockGuard, LockHandle, LockProvider};
pub use stock::{apply_decrease, DecreaseRequest, StockId, StockRecord, WriteMode};
pub use store::{
    in_transaction, CounterStore, InMemoryStockStore, InMemoryTransaction, StoreError, Transaction,
    TransactionBoundary, DEFAULT_LOCK_WAIT_TIMEOUT,
};
pub use strategy::{
    DecreaseStock, NamedLockPolicy, NamedLockStockFacade, OptimisticLockStockFacade,
    PessimisticLockStockService, RetryPolicy,
};
