//! Fetch expansion: fetch the seeds, then everything they relate to, until
//! no unseen record remains or the round cap is hit.

use super::state::RunState;
use super::RunError;
use crate::adapter::{CancellationToken, FetchError, FetchedRecord, MetadataSource};
use crate::config::{DateFieldNames, ExpansionConfig};
use crate::graph::RecordId;
use crate::resolve::FixedPoint;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Drives discovery rounds against a metadata source
pub struct FetchExpander {
    source: Arc<dyn MetadataSource>,
    config: ExpansionConfig,
    dates: DateFieldNames,
    abort_on_malformed: bool,
    cancel: CancellationToken,
}

impl FetchExpander {
    pub fn new(source: Arc<dyn MetadataSource>, config: ExpansionConfig, dates: DateFieldNames) -> Self {
        Self {
            source,
            config,
            dates,
            abort_on_malformed: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_abort_on_malformed(mut self, abort: bool) -> Self {
        self.abort_on_malformed = abort;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Expand from `seeds` into `state`.
    ///
    /// Every fetch of a round finishes and is merged before the next round's
    /// frontier is computed. Results are merged in record-id order so edge
    /// insertion does not depend on which fetch returned first.
    pub async fn expand(
        &self,
        seeds: BTreeSet<RecordId>,
        state: &mut RunState,
    ) -> Result<FixedPoint, RunError> {
        let mut frontier: Vec<RecordId> = seeds
            .into_iter()
            .filter(|id| state.mark_attempted(id.clone()))
            .collect();
        let mut rounds = 0;

        while !frontier.is_empty() {
            if rounds >= self.config.max_rounds {
                warn!(
                    rounds,
                    pending = frontier.len(),
                    "expansion hit its round cap; unfetched records are left out"
                );
                state.unexpanded = frontier;
                return Ok(FixedPoint {
                    passes: rounds,
                    stable: false,
                });
            }
            if self.cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            rounds += 1;
            info!(round = rounds, requested = frontier.len(), "expansion round");

            for (id, result) in self.fetch_round(frontier).await {
                match result {
                    Ok(fetched) => state.absorb(id, fetched, &self.dates)?,
                    Err(error) if error.is_malformed() && self.abort_on_malformed => {
                        return Err(RunError::Malformed(error));
                    }
                    Err(error) => {
                        warn!(record = %id, %error, "skipping record");
                        state.record_failure(id, &error);
                    }
                }
            }

            frontier = state
                .frontier()
                .into_iter()
                .filter(|id| state.mark_attempted(id.clone()))
                .collect();
        }

        Ok(FixedPoint {
            passes: rounds,
            stable: true,
        })
    }

    /// Fetch one round concurrently, bounded by `fetch_concurrency`
    async fn fetch_round(
        &self,
        ids: Vec<RecordId>,
    ) -> Vec<(RecordId, Result<FetchedRecord, FetchError>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.fetch_concurrency.max(1)));

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let source = Arc::clone(&self.source);
                let semaphore = Arc::clone(&semaphore);
                let config = self.config.clone();
                let task_id = id.clone();
                let handle = tokio::spawn(async move {
                    match semaphore.acquire_owned().await {
                        Ok(_permit) => fetch_with_retry(source.as_ref(), &task_id, &config).await,
                        Err(e) => Err(FetchError::Transient(format!("Semaphore error: {}", e))),
                    }
                });
                (id, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(FetchError::Transient(format!("fetch task failed: {}", e))),
            };
            results.push((id, result));
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }
}

/// One fetch with a timeout, retrying transient failures with linear backoff
async fn fetch_with_retry(
    source: &dyn MetadataSource,
    id: &RecordId,
    config: &ExpansionConfig,
) -> Result<FetchedRecord, FetchError> {
    let timeout = config.fetch_timeout();
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(timeout, source.fetch(id)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Transient(format!("fetch timed out after {:?}", timeout))),
        };
        match result {
            Err(error) if error.is_transient() && attempt < config.fetch_retries => {
                attempt += 1;
                debug!(record = %id, attempt, %error, "retrying fetch");
                tokio::time::sleep(config.retry_backoff(attempt)).await;
            }
            other => return other,
        }
    }
}
