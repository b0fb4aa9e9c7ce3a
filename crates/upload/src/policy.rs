//! Retry, timeout and planning knobs for an upload batch.

use std::time::Duration;

use fileshare_transfer::PlanThresholds;

/// Tunable upload policy. `Default` gives the production values.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPolicy {
    /// Additional attempts per chunk after the first.
    pub chunk_retries: u32,
    /// Additional attempts per chunk when the store rejects the request
    /// with a client-side 4xx. Never exceeds `chunk_retries`.
    pub client_error_retries: u32,
    /// Global passes over the failed chunks after all batches ran.
    pub retry_passes: u32,
    /// Backoff unit; attempt `n` waits `n * retry_base_delay`.
    pub retry_base_delay: Duration,
    pub chunk_timeout: Duration,
    pub single_shot_timeout: Duration,
    /// Timeout for init and complete calls and each group attempt.
    pub call_timeout: Duration,
    /// Additional group-creation attempts after the first.
    pub group_retries: u32,
    /// Pause before the first group attempt.
    pub group_settle_delay: Duration,
    pub thresholds: PlanThresholds,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            chunk_retries: 2,
            client_error_retries: 1,
            retry_passes: 2,
            retry_base_delay: Duration::from_secs(1),
            chunk_timeout: Duration::from_secs(60),
            single_shot_timeout: Duration::from_secs(300),
            call_timeout: Duration::from_secs(120),
            group_retries: 2,
            group_settle_delay: Duration::from_millis(500),
            thresholds: PlanThresholds::default(),
        }
    }
}

impl TransferPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay.saturating_mul(attempt)
    }

    /// Retry budget for a chunk that failed with a retryable error.
    pub fn chunk_budget(&self, client_error: bool) -> u32 {
        if client_error {
            self.client_error_retries.min(self.chunk_retries)
        } else {
            self.chunk_retries
        }
    }

    /// Retry budget for a failed group creation.
    pub fn group_budget(&self, client_error: bool) -> u32 {
        if client_error {
            self.client_error_retries.min(self.group_retries)
        } else {
            self.group_retries
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff() {
        let policy = TransferPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
    }

    #[test]
    fn client_errors_get_smaller_budget() {
        let mut policy = TransferPolicy::default();
        assert_eq!(policy.chunk_budget(false), 2);
        assert_eq!(policy.chunk_budget(true), 1);

        policy.chunk_retries = 0;
        assert_eq!(policy.chunk_budget(true), 0);

        assert_eq!(policy.group_budget(false), 2);
        assert_eq!(policy.group_budget(true), 1);
    }
}
