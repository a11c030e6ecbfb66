//! Shared fixtures for the concurrent decrease suite.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, Once};
use std::thread;
use std::time::Duration;

use stock_guard::{
    CounterStore, DecreaseError, DecreaseStock, InMemoryStockStore, InMemoryTransaction, StockId,
    StockRecord, StoreError, Transaction, TransactionBoundary,
};

pub const STOCK: StockId = StockId(1);

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn seeded_store(quantity: u64) -> InMemoryStockStore {
    init_tracing();
    let store = InMemoryStockStore::with_lock_wait_timeout(Duration::from_secs(10));
    store.insert(STOCK, quantity).unwrap();
    store
}

/// Run `calls` decrements of `quantity` on [`STOCK`] from separate threads,
/// released together by a barrier.
pub fn decrease_concurrently<D>(
    strategy: Arc<D>,
    calls: usize,
    quantity: u64,
) -> Vec<Result<(), DecreaseError>>
where
    D: DecreaseStock + ?Sized + 'static,
{
    let barrier = Arc::new(Barrier::new(calls));
    let handles: Vec<_> = (0..calls)
        .map(|_| {
            let strategy = Arc::clone(&strategy);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                strategy.decrease(STOCK, quantity)
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

pub fn successes(results: &[Result<(), DecreaseError>]) -> usize {
    results.iter().filter(|r| r.is_ok()).count()
}

pub fn insufficient(results: &[Result<(), DecreaseError>]) -> usize {
    results
        .iter()
        .filter(|r| matches!(r, Err(DecreaseError::InsufficientStock { .. })))
        .count()
}

/// Counter store that tracks how many transactions are inside a read-modify-write
/// section at once. A section opens when a transaction's first read returns and
/// closes when that transaction commits or rolls back.
#[derive(Clone)]
pub struct SectionStore {
    inner: InMemoryStockStore,
    sections: Arc<Sections>,
}

struct Sections {
    active: AtomicUsize,
    max_active: AtomicUsize,
    hold_for: Duration,
}

impl Sections {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SectionStore {
    /// Every read sleeps for `hold_for` so that overlapping sections are observed.
    pub fn new(inner: InMemoryStockStore, hold_for: Duration) -> Self {
        Self {
            inner,
            sections: Arc::new(Sections {
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                hold_for,
            }),
        }
    }

    pub fn inner(&self) -> &InMemoryStockStore {
        &self.inner
    }

    pub fn max_active(&self) -> usize {
        self.sections.max_active.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.sections.active.load(Ordering::SeqCst)
    }

    fn opened(&self, tx: &mut SectionTransaction, record: StockRecord) -> StockRecord {
        if !tx.entered {
            tx.entered = true;
            self.sections.enter();
        }
        thread::sleep(self.sections.hold_for);
        record
    }
}

pub struct SectionTransaction {
    inner: Option<InMemoryTransaction>,
    sections: Arc<Sections>,
    entered: bool,
}

impl SectionTransaction {
    fn inner_mut(&mut self) -> &mut InMemoryTransaction {
        self.inner.as_mut().expect("transaction already finished")
    }

    fn finish(
        &mut self,
        end: fn(InMemoryTransaction) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let result = self.inner.take().map_or(Ok(()), end);
        if std::mem::take(&mut self.entered) {
            self.sections.leave();
        }
        result
    }
}

impl Transaction for SectionTransaction {
    fn commit(mut self) -> Result<(), StoreError> {
        self.finish(InMemoryTransaction::commit)
    }

    fn rollback(mut self) -> Result<(), StoreError> {
        self.finish(InMemoryTransaction::rollback)
    }
}

impl Drop for SectionTransaction {
    fn drop(&mut self) {
        let _ = self.finish(InMemoryTransaction::rollback);
    }
}

impl TransactionBoundary for SectionStore {
    type Transaction = SectionTransaction;

    fn begin(&self) -> Result<SectionTransaction, StoreError> {
        Ok(SectionTransaction {
            inner: Some(self.inner.begin()?),
            sections: Arc::clone(&self.sections),
            entered: false,
        })
    }
}

impl CounterStore for SectionStore {
    fn read(&self, tx: &mut SectionTransaction, id: StockId) -> Result<StockRecord, StoreError> {
        let record = self.inner.read(tx.inner_mut(), id)?;
        Ok(self.opened(tx, record))
    }

    fn read_for_update(
        &self,
        tx: &mut SectionTransaction,
        id: StockId,
    ) -> Result<StockRecord, StoreError> {
        let record = self.inner.read_for_update(tx.inner_mut(), id)?;
        Ok(self.opened(tx, record))
    }

    fn write(
        &self,
        tx: &mut SectionTransaction,
        id: StockId,
        quantity: u64,
    ) -> Result<(), StoreError> {
        self.inner.write(tx.inner_mut(), id, quantity)
    }

    fn write_if_version_matches(
        &self,
        tx: &mut SectionTransaction,
        id: StockId,
        quantity: u64,
        expected_version: u64,
    ) -> Result<bool, StoreError> {
        self.inner
            .write_if_version_matches(tx.inner_mut(), id, quantity, expected_version)
    }
}

/// Counter store that records the version each successful conditional
/// write was based on.
#[derive(Clone)]
pub struct RecordingStore {
    inner: InMemoryStockStore,
    based_on: Arc<Mutex<Vec<u64>>>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryStockStore) -> Self {
        Self {
            inner,
            based_on: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn inner(&self) -> &InMemoryStockStore {
        &self.inner
    }

    pub fn based_on(&self) -> Vec<u64> {
        let mut versions = self.based_on.lock().unwrap().clone();
        versions.sort_unstable();
        versions
    }
}

impl TransactionBoundary for RecordingStore {
    type Transaction = InMemoryTransaction;

    fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        self.inner.begin()
    }
}

impl CounterStore for RecordingStore {
    fn read(&self, tx: &mut InMemoryTransaction, id: StockId) -> Result<StockRecord, StoreError> {
        self.inner.read(tx, id)
    }

    fn read_for_update(
        &self,
        tx: &mut InMemoryTransaction,
        id: StockId,
    ) -> Result<StockRecord, StoreError> {
        self.inner.read_for_update(tx, id)
    }

    fn write(
        &self,
        tx: &mut InMemoryTransaction,
        id: StockId,
        quantity: u64,
    ) -> Result<(), StoreError> {
        self.inner.write(tx, id, quantity)
    }

    fn write_if_version_matches(
        &self,
        tx: &mut InMemoryTransaction,
        id: StockId,
        quantity: u64,
        expected_version: u64,
    ) -> Result<bool, StoreError> {
        let written = self
            .inner
            .write_if_version_matches(tx, id, quantity, expected_version)?;
        if written {
            self.based_on.lock().unwrap().push(expected_version);
        }
        Ok(written)
    }
}
