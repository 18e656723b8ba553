//! Immutable coordinator settings and their validating builder.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use dsf_core::{DsfError, DsfResult};
use dsf_domain::Namespace;
use tokio_util::sync::CancellationToken;

use crate::flight_ports::FlightStore;

mod backoff;

pub use backoff::{BackoffPolicy, DEFAULT_POLL_INTERVAL};

/// Default lock expiration.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(1);

/// Default published result expiration.
pub const DEFAULT_DATA_TTL: Duration = Duration::from_secs(2);

/// Default follower wait time.
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(2);

/// Settings consumed by one [`crate::Group`].
#[derive(Clone)]
pub struct GroupConfig {
    store: Arc<dyn FlightStore>,
    namespace: Namespace,
    lock_ttl: Duration,
    data_ttl: Duration,
    keep_lock: bool,
    wait_time: Duration,
    backoff: BackoffPolicy,
    cancellation: CancellationToken,
}

impl GroupConfig {
    /// Starts a builder populated with defaults.
    #[must_use]
    pub fn builder() -> GroupConfigBuilder {
        GroupConfigBuilder::default()
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn FlightStore> {
        &self.store
    }

    /// Returns the key namespace.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the lock expiration.
    #[must_use]
    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    /// Returns the published result expiration.
    #[must_use]
    pub fn data_ttl(&self) -> Duration {
        self.data_ttl
    }

    /// Returns whether leaders keep the lock until it expires.
    #[must_use]
    pub fn keep_lock(&self) -> bool {
        self.keep_lock
    }

    /// Returns how long a follower waits for a published result.
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Returns the follower poll policy.
    #[must_use]
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Returns the token that aborts store calls and poll sleeps.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl Debug for GroupConfig {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GroupConfig")
            .field("namespace", &self.namespace)
            .field("lock_ttl", &self.lock_ttl)
            .field("data_ttl", &self.data_ttl)
            .field("keep_lock", &self.keep_lock)
            .field("wait_time", &self.wait_time)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GroupConfig`].
#[derive(Clone)]
pub struct GroupConfigBuilder {
    store: Option<Arc<dyn FlightStore>>,
    namespace: Namespace,
    lock_ttl: Duration,
    data_ttl: Duration,
    keep_lock: bool,
    wait_time: Duration,
    backoff: BackoffPolicy,
    cancellation: CancellationToken,
}

impl Default for GroupConfigBuilder {
    fn default() -> Self {
        Self {
            store: None,
            namespace: Namespace::default(),
            lock_ttl: DEFAULT_LOCK_TTL,
            data_ttl: DEFAULT_DATA_TTL,
            keep_lock: false,
            wait_time: DEFAULT_WAIT_TIME,
            backoff: BackoffPolicy::default(),
            cancellation: CancellationToken::new(),
        }
    }
}

impl GroupConfigBuilder {
    /// Sets the backing store. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn FlightStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the key namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Sets the lock expiration. Must exceed the expected job duration.
    #[must_use]
    pub fn lock_ttl(mut self, lock_ttl: Duration) -> Self {
        self.lock_ttl = lock_ttl;
        self
    }

    /// Sets the published result expiration. Must exceed the follower wait time.
    #[must_use]
    pub fn data_ttl(mut self, data_ttl: Duration) -> Self {
        self.data_ttl = data_ttl;
        self
    }

    /// Keeps the lock held for its full TTL instead of releasing it early.
    #[must_use]
    pub fn keep_lock(mut self, keep_lock: bool) -> Self {
        self.keep_lock = keep_lock;
        self
    }

    /// Sets how long a follower waits for a published result.
    #[must_use]
    pub fn wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Sets the follower poll policy.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the execution context cancellation token.
    #[must_use]
    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Validates the settings and produces an immutable configuration.
    pub fn build(self) -> DsfResult<GroupConfig> {
        let Some(store) = self.store else {
            return Err(DsfError::Validation(
                "group config requires a store".to_owned(),
            ));
        };

        require_millis("lock_ttl", self.lock_ttl)?;
        require_millis("data_ttl", self.data_ttl)?;
        require_millis("wait_time", self.wait_time)?;

        Ok(GroupConfig {
            store,
            namespace: self.namespace,
            lock_ttl: self.lock_ttl,
            data_ttl: self.data_ttl,
            keep_lock: self.keep_lock,
            wait_time: self.wait_time,
            backoff: self.backoff,
            cancellation: self.cancellation,
        })
    }
}

// Store TTLs are expressed in whole milliseconds.
fn require_millis(name: &str, value: Duration) -> DsfResult<()> {
    if value.as_millis() == 0 {
        return Err(DsfError::Validation(format!(
            "{name} must be at least 1ms, got {value:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use dsf_core::{DsfError, DsfResult};
    use dsf_domain::Namespace;

    use super::{DEFAULT_DATA_TTL, DEFAULT_LOCK_TTL, DEFAULT_WAIT_TIME, GroupConfig};
    use crate::flight_ports::{FlightStore, LockAcquisition, ReleaseOutcome};

    struct UnreachableStore;

    #[async_trait]
    impl FlightStore for UnreachableStore {
        async fn get(&self, _key: &str) -> DsfResult<Option<Vec<u8>>> {
            Err(DsfError::Store("unreachable".to_owned()))
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> DsfResult<()> {
            Err(DsfError::Store("unreachable".to_owned()))
        }

        async fn delete(&self, _key: &str) -> DsfResult<bool> {
            Err(DsfError::Store("unreachable".to_owned()))
        }

        async fn acquire_or_read(
            &self,
            _lock_key: &str,
            _candidate: &str,
            _ttl: Duration,
        ) -> DsfResult<LockAcquisition> {
            Err(DsfError::Store("unreachable".to_owned()))
        }

        async fn delete_if_owned(
            &self,
            _lock_key: &str,
            _expected_owner: &str,
        ) -> DsfResult<ReleaseOutcome> {
            Err(DsfError::Store("unreachable".to_owned()))
        }
    }

    #[test]
    fn build_applies_defaults() {
        let config = GroupConfig::builder()
            .store(Arc::new(UnreachableStore))
            .build();
        assert!(config.is_ok());

        let config = config.unwrap_or_else(|_| unreachable!());
        assert_eq!(config.namespace(), &Namespace::default());
        assert_eq!(config.lock_ttl(), DEFAULT_LOCK_TTL);
        assert_eq!(config.data_ttl(), DEFAULT_DATA_TTL);
        assert_eq!(config.wait_time(), DEFAULT_WAIT_TIME);
        assert!(!config.keep_lock());
        assert_eq!(config.backoff().interval(3), Duration::from_millis(50));
        assert!(!config.cancellation().is_cancelled());
    }

    #[test]
    fn build_requires_store() {
        let result = GroupConfig::builder().build();
        assert!(matches!(result, Err(DsfError::Validation(_))));
    }

    #[test]
    fn build_rejects_zero_durations() {
        let store = Arc::new(UnreachableStore);

        let zero_lock = GroupConfig::builder()
            .store(store.clone())
            .lock_ttl(Duration::ZERO)
            .build();
        assert!(matches!(
            zero_lock,
            Err(DsfError::Validation(ref message)) if message.contains("lock_ttl")
        ));

        let zero_data = GroupConfig::builder()
            .store(store.clone())
            .data_ttl(Duration::from_micros(500))
            .build();
        assert!(matches!(
            zero_data,
            Err(DsfError::Validation(ref message)) if message.contains("data_ttl")
        ));

        let zero_wait = GroupConfig::builder()
            .store(store)
            .wait_time(Duration::ZERO)
            .build();
        assert!(matches!(
            zero_wait,
            Err(DsfError::Validation(ref message)) if message.contains("wait_time")
        ));
    }
}
