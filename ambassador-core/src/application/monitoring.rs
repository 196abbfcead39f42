use crate::domain::Utxo;
use crate::foundation::{AmbassadorError, Result};
use crate::infrastructure::indexer::{IndexContext, StateIndexer};
use log::{debug, info, trace};
use std::sync::Arc;
use std::time::Duration;

/// Polls the local indexer until it reflects a finalized transaction.
pub struct SyncMonitor {
    indexer: Arc<dyn StateIndexer>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl SyncMonitor {
    pub fn new(indexer: Arc<dyn StateIndexer>, poll_interval: Duration, max_attempts: u32) -> Self {
        Self { indexer, poll_interval, max_attempts: max_attempts.max(1) }
    }

    /// Syncs `context` until `visible` accepts the snapshot; returns the attempt that succeeded.
    pub async fn wait_for<F>(&self, context: &IndexContext, mut visible: F) -> Result<u32>
    where
        F: FnMut(&[Utxo]) -> bool + Send,
    {
        for attempt in 1..=self.max_attempts {
            self.indexer.sync(context).await?;
            let snapshot = self.indexer.get_by_context(context).await?;
            if visible(&snapshot) {
                debug!("indexer caught up context={} attempt={}", context, attempt);
                return Ok(attempt);
            }
            trace!("indexer lagging context={} attempt={} sleep_ms={}", context, attempt, self.poll_interval.as_millis());
            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        info!("indexer did not catch up context={} attempts={}", context, self.max_attempts);
        Err(AmbassadorError::Message(format!("indexer did not reflect {context} after {} attempts", self.max_attempts)))
    }
}
