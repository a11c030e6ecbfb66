use std::sync::Arc;
use std::time::Duration;

use stock_guard::{
    DecreaseError, DecreaseStock, InMemoryLockProvider, LockError, LockProvider,
    NamedLockPolicy, NamedLockStockFacade, PessimisticLockStockService,
};

use crate::support::{decrease_concurrently, seeded_store, successes, SectionStore, STOCK};

#[test]
fn critical_sections_never_overlap() {
    let store = SectionStore::new(seeded_store(100), Duration::from_millis(2));
    let locks = Arc::new(InMemoryLockProvider::new());
    let facade = Arc::new(NamedLockStockFacade::new(store.clone(), Arc::clone(&locks)));

    let results = decrease_concurrently(facade, 12, 5);

    assert_eq!(successes(&results), 12);
    assert_eq!(store.max_active(), 1);
    assert_eq!(store.active(), 0);
    assert_eq!(store.inner().get(STOCK).unwrap().unwrap().quantity, 40);
    assert!(!locks.is_locked(&STOCK.to_string()).unwrap());
}

#[test]
fn lock_held_elsewhere_times_out_as_lock_unavailable() {
    let store = seeded_store(10);
    let locks = Arc::new(InMemoryLockProvider::new());
    let facade = NamedLockStockFacade::with_policy(
        store.clone(),
        Arc::clone(&locks),
        NamedLockPolicy::with_acquire_timeout(Duration::from_millis(30)),
    );

    // Another instance sharing the same lock service holds the key.
    let other = locks.acquire("1", None).unwrap();

    let err = facade.decrease(STOCK, 1).unwrap_err();
    assert_eq!(
        err,
        DecreaseError::LockUnavailable {
            key: "1".into(),
            reason: LockError::Timeout { key: "1".into() },
        }
    );
    assert_eq!(store.get(STOCK).unwrap().unwrap().version, 0);

    locks.release(other).unwrap();
    facade.decrease(STOCK, 1).unwrap();
    assert_eq!(store.get(STOCK).unwrap().unwrap().quantity, 9);
}

#[test]
fn named_lock_keyspace_is_independent_of_row_locks() {
    let store = seeded_store(10);
    let locks = InMemoryLockProvider::new();

    // Holding the named lock does not touch the store's row locks.
    let held = locks.acquire(&STOCK.to_string(), None).unwrap();
    assert_eq!(store.locked_rows().unwrap(), 0);
    PessimisticLockStockService::new(store.clone())
        .decrease(STOCK, 2)
        .unwrap();
    locks.release(held).unwrap();

    assert_eq!(store.get(STOCK).unwrap().unwrap().quantity, 8);
}
