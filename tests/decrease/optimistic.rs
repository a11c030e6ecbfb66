use std::sync::Arc;
use std::time::Duration;

use stock_guard::{DecreaseError, OptimisticLockStockFacade, RetryPolicy};

use crate::support::{decrease_concurrently, seeded_store, successes, RecordingStore, STOCK};

#[test]
fn every_commit_is_based_on_the_version_it_read() {
    let store = RecordingStore::new(seeded_store(10));
    let facade = Arc::new(OptimisticLockStockFacade::with_policy(
        store.clone(),
        RetryPolicy::exponential(Duration::from_millis(1), Duration::from_millis(8)),
    ));

    let results = decrease_concurrently(facade, 10, 1);

    assert_eq!(successes(&results), 10);
    // Versions 0..10 each used exactly once: no two commits share a base.
    assert_eq!(store.based_on(), (0..10).collect::<Vec<u64>>());
    let record = store.inner().get(STOCK).unwrap().unwrap();
    assert_eq!(record.quantity, 0);
    assert_eq!(record.version, 10);
}

#[test]
fn baseline_policy_retries_until_success() {
    let store = seeded_store(40);
    let facade = Arc::new(OptimisticLockStockFacade::new(store.clone()));
    assert_eq!(facade.policy(), &RetryPolicy::default());

    let results = decrease_concurrently(facade, 4, 10);

    assert_eq!(successes(&results), 4);
    assert_eq!(store.get(STOCK).unwrap().unwrap().quantity, 0);
}

#[test]
fn capped_retries_give_up_without_losing_updates() {
    let store = seeded_store(1_000);
    let facade = Arc::new(OptimisticLockStockFacade::with_policy(
        store.clone(),
        RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(2),
    ));

    let results = decrease_concurrently(facade, 16, 5);

    for result in &results {
        assert!(
            matches!(result, Ok(()) | Err(DecreaseError::RetryExhausted { .. })),
            "{result:?}"
        );
    }
    let committed = successes(&results) as u64;
    assert!(committed >= 1);
    let record = store.get(STOCK).unwrap().unwrap();
    assert_eq!(record.quantity, 1_000 - committed * 5);
    assert_eq!(record.version, committed);
    assert_eq!(store.locked_rows().unwrap(), 0);
}
