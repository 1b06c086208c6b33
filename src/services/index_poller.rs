use std::sync::Arc;

use tokio::time::{sleep, sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    errors::{ActionError, ActionResult},
    metrics::INDEX_STATUS_QUERIES_TOTAL,
    models::indexer::{IndexConfirmation, IndexStatus},
    services::relay_api::IndexerApi,
};

/// Bounds for waiting on the indexer. `None` leaves that bound open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: Some(240),
            timeout: Some(Duration::from_secs(180)),
        }
    }
}

pub struct IndexPoller {
    api: Arc<dyn IndexerApi>,
    policy: PollPolicy,
}

impl IndexPoller {
    pub fn new(api: Arc<dyn IndexerApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until the transaction is indexed or reported failed.
    ///
    /// A status query that errors counts as an attempt and is retried. The
    /// transaction itself is never resubmitted.
    pub async fn await_indexed(&self, tx_hash: &str, cancel: &CancellationToken) -> ActionResult<IndexConfirmation> {
        let give_up_at = self.policy.timeout.map(|timeout| Instant::now() + timeout);
        let mut attempts: u32 = 0;

        info!(
            tx_hash = %tx_hash,
            interval_ms = self.policy.interval.as_millis() as u64,
            "Waiting for transaction to be indexed"
        );

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(tx_hash, attempts));
            }
            attempts += 1;

            let query = self.api.has_tx_hash_been_indexed(tx_hash.to_string());
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(tx_hash, attempts)),
                _ = deadline(give_up_at) => return Err(timed_out(tx_hash, attempts)),
                response = query => response,
            };

            match response {
                Ok(result) => {
                    let status = result.status();
                    INDEX_STATUS_QUERIES_TOTAL.with_label_values(&[status.label()]).inc();

                    match status {
                        IndexStatus::Indexed => {
                            let block_number = result.receipt().and_then(|receipt| receipt.block_number);
                            info!(tx_hash = %tx_hash, attempts = attempts, block_number = ?block_number, "Transaction indexed");
                            return Ok(IndexConfirmation {
                                tx_hash: tx_hash.to_string(),
                                block_number,
                                attempts,
                            });
                        }
                        IndexStatus::Failed(reason) => {
                            error!(tx_hash = %tx_hash, attempts = attempts, reason = %reason, "Indexer reported failure");
                            return Err(ActionError::IndexingFailure(reason));
                        }
                        IndexStatus::Pending => {
                            debug!(tx_hash = %tx_hash, attempts = attempts, "Not indexed yet");
                        }
                    }
                }
                Err(e) => {
                    INDEX_STATUS_QUERIES_TOTAL.with_label_values(&["error"]).inc();
                    warn!(tx_hash = %tx_hash, attempts = attempts, error = %e, "Index status query failed, retrying");
                }
            }

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(timed_out(tx_hash, attempts));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(tx_hash, attempts)),
                _ = deadline(give_up_at) => return Err(timed_out(tx_hash, attempts)),
                _ = sleep(self.policy.interval) => {}
            }
        }
    }
}

/// Resolves at `give_up_at`, or never when the wait is unbounded.
async fn deadline(give_up_at: Option<Instant>) {
    match give_up_at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn cancelled(tx_hash: &str, attempts: u32) -> ActionError {
    warn!(tx_hash = %tx_hash, attempts = attempts, "Index polling cancelled");
    ActionError::Cancelled
}

fn timed_out(tx_hash: &str, attempts: u32) -> ActionError {
    error!(tx_hash = %tx_hash, attempts = attempts, "Gave up waiting for indexer");
    ActionError::IndexingTimeout { attempts }
}
