use std::time::Duration;

use super::{LockError, LockHandle, LockProvider};

/// Scoped ownership of a named lock.
///
/// The lock is released when the guard is dropped, including during
/// unwinding. Use [`LockGuard::release`] to observe the release result.
pub struct LockGuard<'a, P: LockProvider + ?Sized> {
    provider: &'a P,
    handle: Option<LockHandle>,
}

impl<'a, P: LockProvider + ?Sized> LockGuard<'a, P> {
    /// Acquire `key` from `provider` and wrap the handle in a guard.
    pub fn acquire(
        provider: &'a P,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, LockError> {
        let handle = provider.acquire(key, timeout)?;
        Ok(LockGuard {
            provider,
            handle: Some(handle),
        })
    }

    pub fn key(&self) -> &str {
        self.handle
            .as_ref()
            .map(LockHandle::key)
            .unwrap_or_default()
    }

    /// Release the lock now and report the outcome.
    pub fn release(mut self) -> Result<(), LockError> {
        match self.handle.take() {
            Some(handle) => self.provider.release(handle),
            None => Ok(()),
        }
    }
}

impl<P: LockProvider + ?Sized> Drop for LockGuard<'_, P> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let key = handle.key().to_string();
            if let Err(err) = self.provider.release(handle) {
                tracing::error!(lock_key = %key, error = %err, "failed to release named lock");
            }
        }
    }
}
