use thiserror::Error;

/// Error type for named lock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The underlying lock primitive was poisoned (e.g. a thread panicked while holding it).
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    /// The lock was still held by someone else when the acquire timeout elapsed.
    #[error("timed out waiting for lock '{key}'")]
    Timeout { key: String },
    /// The handle does not match the current holder of the lock.
    #[error("lock '{key}' is not held by this handle")]
    NotHeld { key: String },
}
