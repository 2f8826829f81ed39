//! Batch Runner
//!
//! Drives a work list through the minting API in fixed-size batches:
//!
//! ```text
//! work list ──► skip ids already in the progress file ──► chunk
//!                                                          │
//!     ┌────────────────────────────────────────────────────┘
//!     ▼
//!  batch N: submit concurrently (with retry) ──► merge successes
//!                                                  │
//!                                      save progress file
//!                                                  │
//!                                   pause, then batch N+1
//! ```
//!
//! Progress is checkpointed after every batch, so a crash loses at most the
//! batch in flight. Items that exhaust their retries are logged and left out
//! of the progress file; the next run picks them up again.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use crate::client::Submitter;
use crate::error::{ConfigError, MintError, SubmissionError};
use crate::item::{SubmissionResult, WorkItem};
use crate::retry::RetryPolicy;
use crate::store::ResultStore;

/// Default number of items per batch
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default pause between batches
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 500;

/// Default progress file location
pub const DEFAULT_PROGRESS_FILE: &str = "mint-progress.json";

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Ask the provider to re-upload files referenced by the metadata
    pub reupload_linked_files: bool,
    /// Items per batch; progress is saved after each one
    pub batch_size: usize,
    /// Max in-flight submissions within a batch (defaults to batch size)
    pub concurrency: Option<usize>,
    /// Pause after every batch except the last
    pub batch_pause: Duration,
    /// Where completed mints are recorded
    pub progress_path: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            reupload_linked_files: false,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: None,
            batch_pause: Duration::from_millis(DEFAULT_BATCH_PAUSE_MS),
            progress_path: PathBuf::from(DEFAULT_PROGRESS_FILE),
        }
    }
}

impl RunOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn with_progress_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.progress_path = path.into();
        self
    }

    pub fn with_reupload_linked_files(mut self, reupload: bool) -> Self {
        self.reupload_linked_files = reupload;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch size must be >= 1".to_string()));
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::Invalid("concurrency must be >= 1".to_string()));
        }
        Ok(())
    }

    fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(self.batch_size).max(1)
    }
}

/// Pending work split into batches.
#[derive(Debug)]
pub struct BatchPlan<'a> {
    /// Items already present in the progress file
    pub skipped: usize,
    pub batches: Vec<Vec<&'a WorkItem>>,
}

impl BatchPlan<'_> {
    pub fn pending(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

/// Filter out completed ids and chunk the rest, preserving input order.
pub fn plan<'a>(items: &'a [WorkItem], store: &ResultStore, batch_size: usize) -> BatchPlan<'a> {
    let pending: Vec<&WorkItem> = items.iter().filter(|i| !store.contains(&i.id)).collect();

    BatchPlan {
        skipped: items.len() - pending.len(),
        batches: pending
            .chunks(batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect(),
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Items in the work list
    pub total: usize,
    /// Items skipped because they were already minted
    pub skipped: usize,
    /// Items submitted during this run
    pub attempted: usize,
    pub succeeded: usize,
    /// Ids that exhausted their retries in this run
    pub failed_ids: Vec<String>,
    pub batches: usize,
    /// Size of the progress file after the run
    pub completed_total: usize,
}

pub struct BatchRunner<S> {
    submitter: S,
    retry: RetryPolicy,
    options: RunOptions,
}

impl<S: Submitter> BatchRunner<S> {
    pub fn new(submitter: S, retry: RetryPolicy, options: RunOptions) -> Self {
        Self {
            submitter,
            retry,
            options,
        }
    }

    /// Load prior progress from the configured path and process `items`.
    pub async fn run(&self, items: &[WorkItem]) -> Result<RunSummary, MintError> {
        let mut store = ResultStore::load(&self.options.progress_path).await;
        self.run_with_store(items, &mut store).await
    }

    /// Process `items` against an already loaded store. The store is saved
    /// after every batch; a failed save halts the run.
    pub async fn run_with_store(
        &self,
        items: &[WorkItem],
        store: &mut ResultStore,
    ) -> Result<RunSummary, MintError> {
        self.options.validate()?;

        let plan = plan(items, store, self.options.batch_size);
        let batch_count = plan.batches.len();
        let mut summary = RunSummary {
            total: items.len(),
            skipped: plan.skipped,
            batches: batch_count,
            ..Default::default()
        };

        info!(
            "Minting {} items ({} already done) in {} batch(es) of up to {}",
            plan.pending(),
            plan.skipped,
            batch_count,
            self.options.batch_size
        );

        for (idx, batch) in plan.batches.iter().enumerate() {
            let batch_no = idx + 1;
            info!(
                batch = batch_no,
                of = batch_count,
                size = batch.len(),
                "Submitting batch"
            );

            let outcomes = self.submit_batch(batch).await;
            summary.attempted += outcomes.len();

            let mut batch_ok = 0usize;
            for outcome in outcomes {
                match outcome {
                    Ok(result) => {
                        store.insert(result);
                        batch_ok += 1;
                    }
                    Err(e) => {
                        error!(
                            id = %e.item_id(),
                            "Mint failed after {} attempts: {}",
                            self.retry.max_attempts(),
                            e
                        );
                        summary.failed_ids.push(e.item_id().to_string());
                    }
                }
            }
            summary.succeeded += batch_ok;

            store.save().await?;
            info!(
                batch = batch_no,
                succeeded = batch_ok,
                failed = batch.len() - batch_ok,
                completed_total = store.len(),
                path = %store.path().display(),
                "Batch checkpointed"
            );

            if batch_no < batch_count && !self.options.batch_pause.is_zero() {
                tokio::time::sleep(self.options.batch_pause).await;
            }
        }

        summary.completed_total = store.len();
        Ok(summary)
    }

    /// Submit every item of a batch, at most `concurrency` at a time, and wait
    /// for all of them. Each outcome is independent.
    async fn submit_batch(
        &self,
        batch: &[&WorkItem],
    ) -> Vec<Result<SubmissionResult, SubmissionError>> {
        let reupload = self.options.reupload_linked_files;

        stream::iter(batch.iter().copied())
            .map(|item| self.retry.submit_with_retry(&self.submitter, item, reupload))
            .buffer_unordered(self.options.effective_concurrency())
            .collect()
            .await
    }
}
