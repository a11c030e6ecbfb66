//! Named (advisory) locks keyed by an arbitrary string.

mod error;
mod guard;
mod in_memory;
#[allow(clippy::module_inception)]
mod lock;

pub use error::LockError;
pub use guard::LockGuard;
pub use in_memory::InMemoryLockProvider;
pub use lock::{LockHandle, LockProvider};
