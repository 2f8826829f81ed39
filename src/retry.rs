//! Bounded retry with exponential backoff around a single mint.

use std::time::Duration;
use tracing::{debug, warn};

use crate::client::Submitter;
use crate::error::SubmissionError;
use crate::item::{SubmissionResult, WorkItem};

/// Default number of attempts per item
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Wait before the first retry; doubles after every failed attempt
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Total attempts per item, never less than 1.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait inserted after the `retry`-th failure (0-based): 1s, 2s, 4s, ...
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
    }

    /// Submit `item`, retrying failures until `max_attempts` is reached.
    /// The last error is returned unchanged.
    pub async fn submit_with_retry<S>(
        &self,
        submitter: &S,
        item: &WorkItem,
        reupload_linked_files: bool,
    ) -> Result<SubmissionResult, SubmissionError>
    where
        S: Submitter + ?Sized,
    {
        let max_attempts = self.max_attempts;
        let mut attempt = 1;

        loop {
            match submitter.submit(item, reupload_linked_files).await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Mint of {} succeeded on attempt {}", item.id, attempt);
                    }
                    return Ok(result);
                }
                Err(e) if attempt < max_attempts => {
                    let backoff = self.backoff_for(attempt - 1);
                    warn!(
                        "Mint attempt {}/{} for {} failed: {}. Retrying in {}ms",
                        attempt,
                        max_attempts,
                        item.id,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{NftMetadata, OnChainStatus};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    /// Fails the first `failures` calls, then succeeds.
    struct FlakySubmitter {
        failures: usize,
        calls: Mutex<Vec<Instant>>,
    }

    impl FlakySubmitter {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls.lock();
            calls.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait]
    impl Submitter for FlakySubmitter {
        async fn submit(
            &self,
            item: &WorkItem,
            _reupload_linked_files: bool,
        ) -> Result<SubmissionResult, SubmissionError> {
            let call = {
                let mut calls = self.calls.lock();
                calls.push(Instant::now());
                calls.len()
            };
            if call <= self.failures {
                return Err(SubmissionError::Status {
                    id: item.id.clone(),
                    status: 503,
                    body: format!("{{\"attempt\":{}}}", call),
                });
            }
            Ok(SubmissionResult {
                id: item.id.clone(),
                on_chain: OnChainStatus::default(),
                action_id: None,
            })
        }
    }

    fn item() -> WorkItem {
        WorkItem {
            id: "nft-1".to_string(),
            recipient: "polygon:0x1".to_string(),
            metadata: NftMetadata {
                name: "N".to_string(),
                image: "i".to_string(),
                description: String::new(),
                attributes: Vec::new(),
                extra: Default::default(),
            },
        }
    }

    #[test]
    fn test_backoff_schedule_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_max_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempt_policy_submits_once() {
        let submitter = FlakySubmitter::new(usize::MAX);
        let start = Instant::now();

        let result = RetryPolicy::new(0, Duration::from_secs(1))
            .submit_with_retry(&submitter, &item(), false)
            .await;

        assert!(result.is_err());
        assert_eq!(submitter.calls.lock().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_match_backoff_for() {
        let submitter = FlakySubmitter::new(usize::MAX);
        let policy = RetryPolicy::new(4, Duration::from_millis(250));

        let _ = policy.submit_with_retry(&submitter, &item(), false).await;

        let expected: Vec<Duration> = (0..3).map(|retry| policy.backoff_for(retry)).collect();
        assert_eq!(submitter.gaps(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_does_not_wait() {
        let submitter = FlakySubmitter::new(0);
        let start = Instant::now();

        let result = RetryPolicy::default()
            .submit_with_retry(&submitter, &item(), false)
            .await;

        assert!(result.is_ok());
        assert_eq!(submitter.calls.lock().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let submitter = FlakySubmitter::new(2);

        let result = RetryPolicy::default()
            .submit_with_retry(&submitter, &item(), false)
            .await
            .unwrap();

        assert_eq!(result.id, "nft-1");
        assert_eq!(
            submitter.gaps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_last_error() {
        let submitter = FlakySubmitter::new(usize::MAX);

        let err = RetryPolicy::default()
            .submit_with_retry(&submitter, &item(), false)
            .await
            .unwrap_err();

        assert_eq!(submitter.calls.lock().len(), 3);
        assert_eq!(
            submitter.gaps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        match err {
            SubmissionError::Status { body, .. } => assert_eq!(body, "{\"attempt\":3}"),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_attempt_limit() {
        let submitter = FlakySubmitter::new(usize::MAX);
        let policy = RetryPolicy::new(5, Duration::from_millis(100));

        assert!(policy
            .submit_with_retry(&submitter, &item(), false)
            .await
            .is_err());
        assert_eq!(submitter.calls.lock().len(), 5);
        assert_eq!(
            submitter.gaps(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800)
            ]
        );
    }
}
