//! Retry Controller
//!
//! Drives one intent of a sequential batch: broadcast at a fixed nonce, wait
//! for the receipt, and on failure back off and try again at the same nonce.
//! Reusing the nonce means at most one attempt can ever be mined.

use crate::{
    OutcomeStatus, TransactionError, TransactionIntent, TransactionOutcome, TxReceipt,
    chain::{ChainReader, SendRequest, TransactionSender},
};
use ethers::types::H256;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Retry ceiling and backoff unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Pause after the first failed attempt; doubles with every attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Pause after failed attempt `attempt` (0-indexed): `base_delay * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub struct RetryController<'a> {
    chain: &'a dyn ChainReader,
    sender: &'a dyn TransactionSender,
    policy: RetryPolicy,
    confirmations: usize,
}

impl<'a> RetryController<'a> {
    pub fn new(
        chain: &'a dyn ChainReader,
        sender: &'a dyn TransactionSender,
        policy: RetryPolicy,
        confirmations: usize,
    ) -> Self {
        Self {
            chain,
            sender,
            policy,
            confirmations,
        }
    }

    /// Runs up to `max_retries + 1` attempts of `intent` at `nonce`
    ///
    /// A mined receipt ends the loop whether or not it reverted; only
    /// broadcast and confirmation errors are retried.
    pub async fn execute_with_retry(
        &self,
        intent: &TransactionIntent,
        nonce: u64,
    ) -> TransactionOutcome {
        let request = SendRequest::new(&intent.call, nonce);
        let mut last_hash: Option<H256> = None;
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(&request).await {
                Ok(receipt) => {
                    let status = if receipt.status {
                        OutcomeStatus::Success
                    } else {
                        OutcomeStatus::Failed
                    };
                    info!(
                        id = %intent.id,
                        nonce,
                        retries = attempt,
                        ?status,
                        "Transaction mined"
                    );
                    return TransactionOutcome {
                        id: intent.id.clone(),
                        status,
                        nonce,
                        tx_hash: Some(receipt.transaction_hash),
                        error: (!receipt.status).then(|| "transaction reverted".to_string()),
                        receipt: Some(receipt),
                        retries: attempt,
                    };
                }
                Err(err) => {
                    if let TransactionError::Confirmation { tx_hash, .. } = &err {
                        last_hash = Some(*tx_hash);
                    }

                    if attempt < self.policy.max_retries {
                        let backoff = self.policy.backoff(attempt);
                        debug!(
                            id = %intent.id,
                            attempt = attempt + 1,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %err,
                            "Attempt failed, backing off before retry"
                        );
                        sleep(backoff).await;
                        attempt += 1;
                    } else {
                        warn!(
                            id = %intent.id,
                            nonce,
                            attempts = attempt + 1,
                            error = %err,
                            "All retry attempts exhausted"
                        );
                        return TransactionOutcome {
                            id: intent.id.clone(),
                            status: OutcomeStatus::Failed,
                            nonce,
                            tx_hash: last_hash,
                            receipt: None,
                            error: Some(err.to_string()),
                            retries: self.policy.max_retries,
                        };
                    }
                }
            }
        }
    }

    async fn attempt(&self, request: &SendRequest) -> Result<TxReceipt, TransactionError> {
        let tx_hash = self
            .sender
            .send_transaction(request)
            .await
            .map_err(|source| TransactionError::Broadcast {
                nonce: request.nonce,
                source,
            })?;

        self.chain
            .wait_for_receipt(tx_hash, self.confirmations)
            .await
            .map_err(|source| TransactionError::Confirmation {
                nonce: request.nonce,
                tx_hash,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.backoff(64), Duration::from_secs(u32::MAX as u64));
    }
}
