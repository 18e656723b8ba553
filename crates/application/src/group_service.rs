use dsf_core::DsfResult;
use dsf_domain::{ExecutionId, LockKey, ResultKey};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::flight_ports::{LockAcquisition, ReleaseOutcome};
use crate::group_config::GroupConfig;
use crate::result_poller::{ResultPoller, cancellable};

/// Result of one coordinated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightOutcome {
    /// Bytes produced by the job, either locally or by another caller.
    pub payload: Vec<u8>,
    /// True when the payload was produced by a different caller.
    pub shared: bool,
}

/// Distributed single-flight coordinator.
///
/// Concurrent calls for one job key, from any process sharing the store,
/// elect one leader that runs the job. Every other caller becomes a follower
/// and polls for the leader's published result.
#[derive(Clone, Debug)]
pub struct Group {
    config: GroupConfig,
}

impl Group {
    /// Creates a coordinator from validated settings.
    #[must_use]
    pub fn new(config: GroupConfig) -> Self {
        Self { config }
    }

    /// Returns the coordinator settings.
    #[must_use]
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Runs `job` at most once across all concurrent callers of `job_key`.
    ///
    /// The leader gets `shared = false` with its own output. Followers get
    /// `shared = true` with the leader's output, or a timeout error when
    /// nothing is published within the configured wait time. Election is
    /// attempted exactly once per call.
    pub async fn run<F, Fut>(&self, job_key: &str, job: F) -> DsfResult<FlightOutcome>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Vec<u8>> + Send,
    {
        let execution_id = ExecutionId::generate()?;
        let lock_key = LockKey::new(self.config.namespace(), job_key);
        debug!(lock_key = %lock_key, execution_id = %execution_id, "electing leader");

        let acquisition = cancellable(
            self.config.cancellation(),
            "lock acquisition",
            self.config.store().acquire_or_read(
                lock_key.as_str(),
                execution_id.as_str(),
                self.config.lock_ttl(),
            ),
        )
        .await?;

        match acquisition {
            LockAcquisition::Held { owner } => {
                info!(lock_key = %lock_key, owner = %owner, "lock missed");
                let payload = self.follow(owner.as_str()).await?;
                Ok(FlightOutcome {
                    payload,
                    shared: true,
                })
            }
            LockAcquisition::Acquired => {
                info!(lock_key = %lock_key, execution_id = %execution_id, "acquired lock");
                let payload = self.lead(&lock_key, &execution_id, job).await;
                Ok(FlightOutcome {
                    payload,
                    shared: false,
                })
            }
        }
    }

    async fn lead<F, Fut>(&self, lock_key: &LockKey, execution_id: &ExecutionId, job: F) -> Vec<u8>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Vec<u8>> + Send,
    {
        let payload = job().await;
        debug!(execution_id = %execution_id, bytes = payload.len(), "job finished");

        let result_key = ResultKey::new(self.config.namespace(), execution_id);
        let published = cancellable(
            self.config.cancellation(),
            "result publish",
            self.config
                .store()
                .set(result_key.as_str(), payload.as_slice(), self.config.data_ttl()),
        )
        .await;

        if let Err(error) = published {
            // Followers of this lock will time out; the lock is left to expire.
            error!(
                result_key = %result_key,
                error = %error,
                "failed to publish result"
            );
            return payload;
        }
        debug!(result_key = %result_key, "published result");

        if !self.config.keep_lock() {
            self.release(lock_key, execution_id).await;
        }

        payload
    }

    async fn release(&self, lock_key: &LockKey, execution_id: &ExecutionId) {
        info!(lock_key = %lock_key, "releasing lock");
        let released = cancellable(
            self.config.cancellation(),
            "lock release",
            self.config
                .store()
                .delete_if_owned(lock_key.as_str(), execution_id.as_str()),
        )
        .await;

        match released {
            Ok(ReleaseOutcome::Released) => {
                debug!(lock_key = %lock_key, "released lock");
            }
            Ok(ReleaseOutcome::NotOwner) => {
                warn!(
                    lock_key = %lock_key,
                    execution_id = %execution_id,
                    "lock expired before release"
                );
            }
            Err(error) => {
                warn!(
                    lock_key = %lock_key,
                    error = %error,
                    "failed to release lock, leaving it to expire"
                );
            }
        }
    }

    async fn follow(&self, owner: &str) -> DsfResult<Vec<u8>> {
        let owner = ExecutionId::parse(owner)?;
        let result_key = ResultKey::new(self.config.namespace(), &owner);
        let deadline = Instant::now() + self.config.wait_time();

        ResultPoller::new(
            self.config.store().clone(),
            self.config.cancellation().clone(),
        )
        .wait_for(&result_key, deadline, self.config.backoff())
        .await
    }
}
