//! Redis-backed flight store.

use std::time::Duration;

use async_trait::async_trait;
use dsf_application::{FlightStore, LockAcquisition, ReleaseOutcome};
use dsf_core::{DsfError, DsfResult};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

const ACQUIRE_OR_READ_SCRIPT: &str = r#"
if redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2], 'NX') then
  return {1, ''}
else
  return {0, redis.call('GET', KEYS[1])}
end
"#;

const DELETE_IF_OWNED_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
else
  return -1
end
"#;

/// Redis implementation of the flight store port.
///
/// The two lock primitives run as Lua scripts, which Redis executes
/// atomically with respect to every other client. One multiplexed
/// connection is dialed up front and shared by every call and clone; the
/// manager reconnects it after a dropped socket.
#[derive(Clone)]
pub struct RedisFlightStore {
    manager: ConnectionManager,
}

impl RedisFlightStore {
    /// Creates a store adapter over an established connection manager.
    #[must_use]
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Opens a client for the given Redis URL and dials its shared connection.
    pub async fn connect(redis_url: &str) -> DsfResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|error| DsfError::Validation(format!("invalid redis url: {error}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|error| DsfError::Store(format!("failed to connect to redis: {error}")))?;

        Ok(Self::new(manager))
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl FlightStore for RedisFlightStore {
    async fn get(&self, key: &str) -> DsfResult<Option<Vec<u8>>> {
        let mut connection = self.connection();

        connection
            .get(key)
            .await
            .map_err(|error| DsfError::Store(format!("failed to read '{key}': {error}")))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> DsfResult<()> {
        let ttl_millis = ttl_millis(ttl)?;
        let mut connection = self.connection();

        connection
            .pset_ex(key, value, ttl_millis)
            .await
            .map_err(|error| DsfError::Store(format!("failed to write '{key}': {error}")))
    }

    async fn delete(&self, key: &str) -> DsfResult<bool> {
        let mut connection = self.connection();

        let removed: i64 = connection
            .del(key)
            .await
            .map_err(|error| DsfError::Store(format!("failed to delete '{key}': {error}")))?;

        Ok(removed > 0)
    }

    async fn acquire_or_read(
        &self,
        lock_key: &str,
        candidate: &str,
        ttl: Duration,
    ) -> DsfResult<LockAcquisition> {
        let ttl_millis = ttl_millis(ttl)?;
        let mut connection = self.connection();

        let (acquired, owner): (i64, String) = Script::new(ACQUIRE_OR_READ_SCRIPT)
            .key(lock_key)
            .arg(candidate)
            .arg(ttl_millis)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                DsfError::Store(format!("failed to acquire lock '{lock_key}': {error}"))
            })?;

        if acquired == 1 {
            Ok(LockAcquisition::Acquired)
        } else {
            Ok(LockAcquisition::Held { owner })
        }
    }

    async fn delete_if_owned(
        &self,
        lock_key: &str,
        expected_owner: &str,
    ) -> DsfResult<ReleaseOutcome> {
        let mut connection = self.connection();

        let deleted: i64 = Script::new(DELETE_IF_OWNED_SCRIPT)
            .key(lock_key)
            .arg(expected_owner)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                DsfError::Store(format!("failed to release lock '{lock_key}': {error}"))
            })?;

        if deleted > 0 {
            Ok(ReleaseOutcome::Released)
        } else {
            Ok(ReleaseOutcome::NotOwner)
        }
    }
}

fn ttl_millis(ttl: Duration) -> DsfResult<u64> {
    let millis = u64::try_from(ttl.as_millis())
        .map_err(|error| DsfError::Validation(format!("ttl {ttl:?} out of range: {error}")))?;
    if millis == 0 {
        return Err(DsfError::Validation(format!(
            "ttl must be at least 1ms, got {ttl:?}"
        )));
    }

    Ok(millis)
}
