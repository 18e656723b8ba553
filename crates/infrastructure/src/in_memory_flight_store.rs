use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsf_application::{FlightStore, LockAcquisition, ReleaseOutcome};
use dsf_core::{DsfError, DsfResult};
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct FlightStoreEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process flight store for tests and single-process deployments.
///
/// Each primitive holds the map lock for its whole read-modify-write, so
/// callers sharing one instance observe the same atomicity a Redis script
/// gives separate processes. Expired entries are evicted lazily on access.
#[derive(Default)]
pub struct InMemoryFlightStore {
    entries: Mutex<HashMap<String, FlightStoreEntry>>,
}

impl InMemoryFlightStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn expiry(ttl: Duration) -> DsfResult<Instant> {
    if ttl.as_millis() == 0 {
        return Err(DsfError::Validation(format!(
            "ttl must be at least 1ms, got {ttl:?}"
        )));
    }

    let now = Instant::now();
    now.checked_add(ttl)
        .ok_or_else(|| DsfError::Validation(format!("ttl {ttl:?} out of range")))
}

fn live_value<'a>(
    entries: &'a mut HashMap<String, FlightStoreEntry>,
    key: &str,
) -> Option<&'a [u8]> {
    if entries
        .get(key)
        .is_some_and(|entry| entry.expires_at <= Instant::now())
    {
        entries.remove(key);
        return None;
    }

    entries.get(key).map(|entry| entry.value.as_slice())
}

#[async_trait]
impl FlightStore for InMemoryFlightStore {
    async fn get(&self, key: &str) -> DsfResult<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().await;
        Ok(live_value(&mut entries, key).map(<[u8]>::to_vec))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> DsfResult<()> {
        let expires_at = expiry(ttl)?;
        self.entries.lock().await.insert(
            key.to_owned(),
            FlightStoreEntry {
                value: value.to_vec(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> DsfResult<bool> {
        let mut entries = self.entries.lock().await;
        Ok(live_value(&mut entries, key).is_some() && entries.remove(key).is_some())
    }

    async fn acquire_or_read(
        &self,
        lock_key: &str,
        candidate: &str,
        ttl: Duration,
    ) -> DsfResult<LockAcquisition> {
        let expires_at = expiry(ttl)?;
        let mut entries = self.entries.lock().await;

        if let Some(owner) = live_value(&mut entries, lock_key) {
            let owner = String::from_utf8(owner.to_vec()).map_err(|error| {
                DsfError::Store(format!("lock '{lock_key}' holds a non-utf8 owner: {error}"))
            })?;
            return Ok(LockAcquisition::Held { owner });
        }

        entries.insert(
            lock_key.to_owned(),
            FlightStoreEntry {
                value: candidate.as_bytes().to_vec(),
                expires_at,
            },
        );

        Ok(LockAcquisition::Acquired)
    }

    async fn delete_if_owned(
        &self,
        lock_key: &str,
        expected_owner: &str,
    ) -> DsfResult<ReleaseOutcome> {
        let mut entries = self.entries.lock().await;

        if live_value(&mut entries, lock_key) != Some(expected_owner.as_bytes()) {
            return Ok(ReleaseOutcome::NotOwner);
        }

        entries.remove(lock_key);
        Ok(ReleaseOutcome::Released)
    }
}
