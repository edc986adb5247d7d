use std::time::Duration;

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::chain::{ChainBackend, SubmitError};
use crate::draft::TransactionDraft;
use crate::error::{Error, Result};
use crate::types::{IdempotencyKey, TxId};

/// How [`submit_with_retry`] retries transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total submit calls allowed, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt (default: 500ms).
    pub initial_backoff: Duration,
    /// Maximum backoff between attempts (default: 8s).
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff after the `attempt`-th failure (1-based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub tx_id: TxId,
    /// Submit calls made, including the successful one.
    pub attempts: u32,
}

/// `SHA256("predicate-swap/idempotency" || draft.encode())`.
pub fn idempotency_key(draft: &TransactionDraft) -> IdempotencyKey {
    let mut hasher = Sha256::new();
    hasher.update(b"predicate-swap/idempotency");
    hasher.update(draft.encode());
    IdempotencyKey::new(hasher.finalize().into())
}

/// Submit a draft, retrying transient failures with exponential backoff.
///
/// Every attempt carries the same idempotency key, so a retry after a lost
/// acknowledgement cannot apply the transaction twice. Stale inputs and node
/// rejections are returned at once: the draft must be rebuilt, not resent.
pub fn submit_with_retry<B: ChainBackend + ?Sized>(
    chain: &B,
    draft: &TransactionDraft,
    policy: &RetryPolicy,
) -> Result<SubmitOutcome> {
    let key = idempotency_key(draft);
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match chain.submit(draft, &key) {
            Ok(tx_id) => return Ok(SubmitOutcome { tx_id, attempts }),
            Err(SubmitError::StaleResource(id)) => return Err(Error::StaleResource(id)),
            Err(SubmitError::Rejected(reason)) => return Err(Error::Submission(reason)),
            Err(SubmitError::Transient(reason)) => {
                if attempts >= max_attempts {
                    return Err(Error::Submission(format!(
                        "giving up after {attempts} attempts: {reason}"
                    )));
                }
                let backoff = policy.backoff(attempts);
                let jitter_ms = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 4);
                let wait = backoff + Duration::from_millis(jitter_ms);
                log::warn!("submit: {reason}, retrying in {wait:?} (attempt {attempts}/{max_attempts})");
                std::thread::sleep(wait);
            }
        }
    }
}
