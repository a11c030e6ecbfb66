//! InMemoryStockStore - HashMap-backed counter store with row locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{CounterStore, StoreError, Transaction, TransactionBoundary};
use crate::stock::{StockId, StockRecord};

/// Default row lock wait, matching InnoDB's `innodb_lock_wait_timeout`.
pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(50);

type TxId = u64;

struct Row {
    record: StockRecord,
    holder: Option<TxId>,
}

#[derive(Default)]
struct State {
    rows: HashMap<StockId, Row>,
    /// Row each blocked transaction is waiting for.
    waiting: HashMap<TxId, StockId>,
}

impl State {
    /// Whether `waiter` blocking on a row held by `holder` closes a wait-for cycle.
    fn would_deadlock(&self, waiter: TxId, holder: TxId) -> bool {
        let mut current = holder;
        for _ in 0..=self.waiting.len() {
            if current == waiter {
                return true;
            }
            let next = self
                .waiting
                .get(&current)
                .and_then(|row| self.rows.get(row))
                .and_then(|row| row.holder);
            match next {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    fn release_all(&mut self, tx: TxId, rows: &[StockId]) {
        for id in rows {
            if let Some(row) = self.rows.get_mut(id) {
                if row.holder == Some(tx) {
                    row.holder = None;
                }
            }
        }
        self.waiting.remove(&tx);
    }
}

struct Shared {
    state: Mutex<State>,
    released: Condvar,
    next_tx: AtomicU64,
    lock_wait_timeout: Duration,
}

impl Shared {
    fn state(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Poisoned(operation))
    }

    fn finish(&self, tx: &mut InMemoryTransaction, apply: bool) -> Result<(), StoreError> {
        let mut state = self.state(if apply { "commit" } else { "rollback" })?;
        if apply {
            for (id, quantity) in tx.staged.drain() {
                if let Some(row) = state.rows.get_mut(&id) {
                    row.record.quantity = quantity;
                    row.record.version += 1;
                }
            }
        } else {
            tx.staged.clear();
        }
        state.release_all(tx.id, &tx.held);
        tx.held.clear();
        tx.open = false;
        self.released.notify_all();
        Ok(())
    }
}

/// In-memory counter store.
///
/// Rows carry an exclusive lock owned by at most one transaction. Writes are
/// staged per transaction and applied atomically on commit. Clone-friendly
/// via `Arc`; clones share storage.
#[derive(Clone)]
pub struct InMemoryStockStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryStockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::with_lock_wait_timeout(DEFAULT_LOCK_WAIT_TIMEOUT)
    }

    /// Create a store whose row lock waits give up after `timeout`.
    pub fn with_lock_wait_timeout(timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                released: Condvar::new(),
                next_tx: AtomicU64::new(1),
                lock_wait_timeout: timeout,
            }),
        }
    }

    /// Create a row at version 0. Fails if it already exists.
    pub fn insert(&self, id: StockId, quantity: u64) -> Result<StockRecord, StoreError> {
        let mut state = self.shared.state("insert")?;
        if state.rows.contains_key(&id) {
            return Err(StoreError::AlreadyExists { id });
        }
        let record = StockRecord {
            id,
            quantity,
            version: 0,
        };
        state.rows.insert(
            id,
            Row {
                record,
                holder: None,
            },
        );
        Ok(record)
    }

    /// Latest committed state of a row.
    pub fn get(&self, id: StockId) -> Result<Option<StockRecord>, StoreError> {
        let state = self.shared.state("get")?;
        Ok(state.rows.get(&id).map(|row| row.record))
    }

    /// Number of rows currently locked by an open transaction.
    pub fn locked_rows(&self) -> Result<usize, StoreError> {
        let state = self.shared.state("locked_rows")?;
        let locked = state
            .rows
            .values()
            .filter(|row| row.holder.is_some())
            .count();
        Ok(locked)
    }

    #[cfg(test)]
    pub(crate) fn waiting_transactions(&self) -> usize {
        self.shared.state("waiting").unwrap().waiting.len()
    }

    fn check_owner(&self, tx: &InMemoryTransaction) -> Result<(), StoreError> {
        if Arc::ptr_eq(&self.shared, &tx.shared) {
            Ok(())
        } else {
            Err(StoreError::ForeignTransaction)
        }
    }

    /// Take the row lock for `tx`, waiting while another transaction holds it.
    fn lock_row<'s>(
        &'s self,
        tx: &mut InMemoryTransaction,
        id: StockId,
    ) -> Result<MutexGuard<'s, State>, StoreError> {
        let deadline = Instant::now() + self.shared.lock_wait_timeout;
        let mut state = self.shared.state("lock row")?;

        loop {
            let holder = state
                .rows
                .get(&id)
                .ok_or(StoreError::NotFound { id })?
                .holder;

            match holder {
                Some(holder) if holder == tx.id => {
                    state.waiting.remove(&tx.id);
                    return Ok(state);
                }
                None => {
                    if let Some(row) = state.rows.get_mut(&id) {
                        row.holder = Some(tx.id);
                    }
                    state.waiting.remove(&tx.id);
                    tx.held.push(id);
                    return Ok(state);
                }
                Some(holder) => {
                    if state.would_deadlock(tx.id, holder) {
                        state.waiting.remove(&tx.id);
                        tracing::warn!(stock_id = %id, tx = tx.id, holder, "deadlock detected");
                        return Err(StoreError::Deadlock { id });
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        state.waiting.remove(&tx.id);
                        return Err(StoreError::LockTimeout { id });
                    }
                    state.waiting.insert(tx.id, id);
                    state = self
                        .shared
                        .released
                        .wait_timeout(state, deadline - now)
                        .map_err(|_| StoreError::Poisoned("lock wait"))?
                        .0;
                }
            }
        }
    }

    fn visible_record(
        state: &State,
        tx: &InMemoryTransaction,
        id: StockId,
    ) -> Result<StockRecord, StoreError> {
        let mut record = state
            .rows
            .get(&id)
            .map(|row| row.record)
            .ok_or(StoreError::NotFound { id })?;
        if let Some(staged) = tx.staged.get(&id) {
            record.quantity = *staged;
        }
        Ok(record)
    }
}

impl TransactionBoundary for InMemoryStockStore {
    type Transaction = InMemoryTransaction;

    fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        Ok(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            id: self.shared.next_tx.fetch_add(1, Ordering::Relaxed),
            held: Vec::new(),
            staged: HashMap::new(),
            open: true,
        })
    }
}

impl CounterStore for InMemoryStockStore {
    fn read(&self, tx: &mut InMemoryTransaction, id: StockId) -> Result<StockRecord, StoreError> {
        self.check_owner(tx)?;
        let state = self.shared.state("read")?;
        Self::visible_record(&state, tx, id)
    }

    fn read_for_update(
        &self,
        tx: &mut InMemoryTransaction,
        id: StockId,
    ) -> Result<StockRecord, StoreError> {
        self.check_owner(tx)?;
        let state = self.lock_row(tx, id)?;
        Self::visible_record(&state, tx, id)
    }

    fn write(
        &self,
        tx: &mut InMemoryTransaction,
        id: StockId,
        quantity: u64,
    ) -> Result<(), StoreError> {
        self.check_owner(tx)?;
        let _state = self.lock_row(tx, id)?;
        tx.staged.insert(id, quantity);
        Ok(())
    }

    fn write_if_version_matches(
        &self,
        tx: &mut InMemoryTransaction,
        id: StockId,
        quantity: u64,
        expected_version: u64,
    ) -> Result<bool, StoreError> {
        self.check_owner(tx)?;
        let mut state = self.shared.state("conditional write")?;
        let row = state.rows.get_mut(&id).ok_or(StoreError::NotFound { id })?;

        if row.record.version != expected_version {
            return Ok(false);
        }
        match row.holder {
            Some(holder) if holder != tx.id => return Ok(false),
            Some(_) => {}
            None => {
                row.holder = Some(tx.id);
                tx.held.push(id);
            }
        }
        tx.staged.insert(id, quantity);
        Ok(true)
    }
}

/// Transaction handle for [`InMemoryStockStore`]. Rolls back on drop.
pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    id: TxId,
    held: Vec<StockId>,
    staged: HashMap<StockId, u64>,
    open: bool,
}

impl Transaction for InMemoryTransaction {
    fn commit(mut self) -> Result<(), StoreError> {
        let shared = Arc::clone(&self.shared);
        shared.finish(&mut self, true)
    }

    fn rollback(mut self) -> Result<(), StoreError> {
        let shared = Arc::clone(&self.shared);
        shared.finish(&mut self, false)
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.open {
            let shared = Arc::clone(&self.shared);
            if let Err(err) = shared.finish(self, false) {
                tracing::error!(tx = self.id, error = %err, "failed to roll back dropped transaction");
            }
        }
    }
}
