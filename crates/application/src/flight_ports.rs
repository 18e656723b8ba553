//! Backing store port consumed by the coordinator.

use std::time::Duration;

use async_trait::async_trait;
use dsf_core::DsfResult;

/// Outcome of the atomic acquire-or-read primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAcquisition {
    /// The lock key was absent and now holds the candidate identity.
    Acquired,
    /// The lock key was already present; nothing was written.
    Held {
        /// Identity currently stored at the lock key.
        owner: String,
    },
}

/// Outcome of the atomic delete-if-owned primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The lock held the expected owner and was deleted.
    Released,
    /// The lock was absent or held by someone else; nothing changed.
    NotOwner,
}

/// Key-value store with the atomic primitives the single-flight protocol needs.
///
/// `acquire_or_read` and `delete_if_owned` must each execute as one
/// indivisible step at the store. Every other method is a plain single-key
/// operation.
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Reads one value, returning `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> DsfResult<Option<Vec<u8>>>;

    /// Writes one value with an expiry.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> DsfResult<()>;

    /// Deletes one key and reports whether it existed.
    async fn delete(&self, key: &str) -> DsfResult<bool>;

    /// Sets `lock_key` to `candidate` with `ttl` when absent, otherwise reads
    /// the current owner without modifying it.
    async fn acquire_or_read(
        &self,
        lock_key: &str,
        candidate: &str,
        ttl: Duration,
    ) -> DsfResult<LockAcquisition>;

    /// Deletes `lock_key` only when it currently holds `expected_owner`.
    async fn delete_if_owned(
        &self,
        lock_key: &str,
        expected_owner: &str,
    ) -> DsfResult<ReleaseOutcome>;
}
