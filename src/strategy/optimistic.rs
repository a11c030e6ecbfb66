use std::thread;
use std::time::Instant;

use crate::error::DecreaseError;
use crate::stock::{apply_decrease, DecreaseRequest, StockId, WriteMode};
use crate::store::{in_transaction, CounterStore};

use super::{DecreaseStock, RetryPolicy};

/// Versioned read-compute-write with retry on conflict.
///
/// Never waits on a row lock. A lost race (`VersionConflict`) rolls the
/// attempt back and starts over from a fresh read after the policy's delay;
/// nothing is held while sleeping. `InsufficientStock` is returned at once.
pub struct OptimisticLockStockFacade<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S: CounterStore> OptimisticLockStockFacade<S> {
    /// Retry forever every 50 ms.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Like [`DecreaseStock::decrease`], but gives up with `RetryExhausted`
    /// rather than start a retry that could not finish before `deadline`.
    pub fn decrease_before(
        &self,
        id: StockId,
        quantity: u64,
        deadline: Instant,
    ) -> Result<(), DecreaseError> {
        let request = DecreaseRequest::new(id, quantity)?;
        self.run(request, Some(deadline))
    }

    /// One read-compute-write attempt in its own transaction.
    fn attempt(&self, request: &DecreaseRequest) -> Result<u64, DecreaseError> {
        in_transaction(&self.store, |tx| -> Result<u64, DecreaseError> {
            let record = self.store.read(tx, request.id())?;
            apply_decrease(
                &self.store,
                tx,
                &record,
                request.quantity(),
                WriteMode::IfVersionMatches,
            )
        })
    }

    fn run(
        &self,
        request: DecreaseRequest,
        deadline: Option<Instant>,
    ) -> Result<(), DecreaseError> {
        let id = request.id();
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            match self.attempt(&request) {
                Ok(remaining) => {
                    tracing::debug!(
                        stock_id = %id,
                        quantity = request.quantity(),
                        remaining,
                        attempts,
                        "optimistic decrease committed"
                    );
                    return Ok(());
                }
                Err(err) if err.is_retryable() => {
                    let delay = self.policy.delay(attempts);
                    let past_deadline = deadline.is_some_and(|d| Instant::now() + delay >= d);
                    if self.policy.is_exhausted(attempts) || past_deadline {
                        tracing::warn!(stock_id = %id, attempts, "optimistic retries exhausted");
                        return Err(DecreaseError::RetryExhausted { id, attempts });
                    }
                    tracing::debug!(
                        stock_id = %id,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "version conflict, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<S: CounterStore> DecreaseStock for OptimisticLockStockFacade<S> {
    fn decrease(&self, id: StockId, quantity: u64) -> Result<(), DecreaseError> {
        let request = DecreaseRequest::new(id, quantity)?;
        self.run(request, None)
    }
}
