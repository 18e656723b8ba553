//! Follower wait loop for a leader's published result.

use std::sync::Arc;
use std::time::Duration;

use dsf_core::{DsfError, DsfResult};
use dsf_domain::ResultKey;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::flight_ports::FlightStore;
use crate::group_config::BackoffPolicy;

/// Polls one result key until it appears, the deadline passes, or the
/// caller cancels.
#[derive(Clone)]
pub struct ResultPoller {
    store: Arc<dyn FlightStore>,
    cancellation: CancellationToken,
}

impl ResultPoller {
    /// Creates a poller over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn FlightStore>, cancellation: CancellationToken) -> Self {
        Self {
            store,
            cancellation,
        }
    }

    /// Waits for a result to be published at `result_key`.
    ///
    /// Sleeps `backoff.interval(attempt)` between fetches, clipped to the
    /// time left before `deadline`. Store errors end the wait immediately.
    pub async fn wait_for(
        &self,
        result_key: &ResultKey,
        deadline: Instant,
        backoff: &BackoffPolicy,
    ) -> DsfResult<Vec<u8>> {
        let mut attempt = 0_u32;

        while Instant::now() < deadline {
            debug!(result_key = %result_key, attempt, "fetching shared result");
            if let Some(payload) = self.fetch(result_key).await? {
                debug!(
                    result_key = %result_key,
                    attempt,
                    bytes = payload.len(),
                    "shared result found"
                );
                return Ok(payload);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            info!(
                result_key = %result_key,
                attempt,
                remaining_ms = remaining.as_millis(),
                "result not found"
            );

            let interval = backoff.interval(attempt).min(remaining);
            self.pause(interval).await?;
            attempt = attempt.saturating_add(1);
        }

        error!(result_key = %result_key, attempts = attempt, "result not found before deadline");
        Err(DsfError::Timeout(format!(
            "result '{result_key}' not found after {attempt} attempts"
        )))
    }

    async fn fetch(&self, result_key: &ResultKey) -> DsfResult<Option<Vec<u8>>> {
        cancellable(
            &self.cancellation,
            "result fetch",
            self.store.get(result_key.as_str()),
        )
        .await
    }

    async fn pause(&self, interval: Duration) -> DsfResult<()> {
        if interval.is_zero() {
            // Busy polling still has to let the leader's task run.
            tokio::task::yield_now().await;
            return Ok(());
        }

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(DsfError::Cancelled(
                "result wait cancelled".to_owned(),
            )),
            () = tokio::time::sleep(interval) => Ok(()),
        }
    }
}

/// Races one store call against the caller's cancellation token.
pub(crate) async fn cancellable<T>(
    cancellation: &CancellationToken,
    operation: &str,
    call: impl Future<Output = DsfResult<T>>,
) -> DsfResult<T> {
    tokio::select! {
        biased;
        () = cancellation.cancelled() => Err(DsfError::Cancelled(format!("{operation} cancelled"))),
        result = call => result,
    }
}
