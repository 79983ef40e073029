//! Execution Coordinator Module
//!
//! Drives one `execute_batch` call from start to finish.
//!
//! # Flow
//! 1. Take ownership of the batch's progress record and mark it executing
//! 2. Fetch the starting nonce for the sending account
//! 3. Run the atomic or the sequential path
//! 4. Close the progress record with a terminal status
//! 5. Fold receipts into gas and cost totals
//!
//! # Atomic is bookkeeping, not a chain guarantee
//! The atomic path stops at the first reversion and fails the whole call,
//! but transactions confirmed before it stay on-chain. A plain account has
//! no way to retract them.

use super::nonce::NonceAllocator;
use super::progress::{ChannelObserver, ProgressObserver, ProgressReporter, ProgressTable};
use super::retry::{RetryController, RetryPolicy};
use crate::{
    BatchError, BatchProgress, BatchResult, OutcomeStatus, TransactionIntent,
    TransactionOutcome,
    chain::{ChainReader, SendRequest, TransactionSender},
    config::ExecutionDefaults,
};
use ethers::types::U256;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Per-call execution options
#[derive(Clone, Default)]
pub struct ExecutionConfig {
    /// Stop and fail the whole call on the first reversion
    pub atomic: bool,
    /// Pause between consecutive transactions (sequential path only)
    pub delay: Duration,
    /// Retries per transaction (sequential path only)
    pub max_retries: u32,
    pub on_progress: Option<Arc<dyn ProgressObserver>>,
}

impl ExecutionConfig {
    pub fn atomic() -> Self {
        Self {
            atomic: true,
            ..Self::default()
        }
    }

    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.on_progress = Some(observer);
        self
    }

    pub fn with_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&BatchProgress) + Send + Sync + 'static,
    {
        self.with_observer(Arc::new(callback))
    }

    pub fn with_channel(self, sender: UnboundedSender<BatchProgress>) -> Self {
        self.with_observer(Arc::new(ChannelObserver::new(sender)))
    }
}

impl From<&ExecutionDefaults> for ExecutionConfig {
    fn from(defaults: &ExecutionDefaults) -> Self {
        Self {
            atomic: defaults.atomic,
            delay: Duration::from_millis(defaults.delay_ms),
            max_retries: defaults.max_retries,
            on_progress: None,
        }
    }
}

impl fmt::Debug for ExecutionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionConfig")
            .field("atomic", &self.atomic)
            .field("delay", &self.delay)
            .field("max_retries", &self.max_retries)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

pub struct ExecutionCoordinator<'a> {
    chain: &'a dyn ChainReader,
    sender: &'a dyn TransactionSender,
    retry_base_delay: Duration,
    confirmations: usize,
}

impl<'a> ExecutionCoordinator<'a> {
    pub fn new(
        chain: &'a dyn ChainReader,
        sender: &'a dyn TransactionSender,
        retry_base_delay: Duration,
        confirmations: usize,
    ) -> Self {
        Self {
            chain,
            sender,
            retry_base_delay,
            confirmations,
        }
    }

    /// Executes `intents` in list order
    ///
    /// # Returns
    /// * `Ok(BatchResult)` once every intent has a terminal outcome; failed
    ///   entries are possible on the sequential path
    /// * `Err(BatchError)` if the nonce lookup fails, the batch is already
    ///   executing, or (atomic path) any transaction fails or reverts
    pub async fn execute(
        &self,
        batch_id: &str,
        intents: &[TransactionIntent],
        config: ExecutionConfig,
        table: ProgressTable,
    ) -> Result<BatchResult, BatchError> {
        let started = Instant::now();

        let mut reporter = ProgressReporter::begin(
            batch_id,
            intents.len(),
            intents.first().map(|intent| intent.id.as_str()),
            table,
            config.on_progress.clone(),
        )
        .await
        .ok_or_else(|| BatchError::AlreadyExecuting(batch_id.to_string()))?;
        reporter.start();

        if intents.is_empty() {
            reporter.finish(true).await;
            return Ok(fold_result(batch_id, Vec::new(), started));
        }

        let account = self.sender.address();
        let starting_nonce = match self.chain.get_transaction_count(account).await {
            Ok(nonce) => nonce,
            Err(e) => {
                warn!(%batch_id, error = %e, "Nonce lookup failed, aborting batch");
                reporter.finish(false).await;
                return Err(BatchError::NonceLookup(e));
            }
        };
        let nonces = NonceAllocator::new(starting_nonce);

        info!(
            %batch_id,
            transactions = intents.len(),
            starting_nonce,
            atomic = config.atomic,
            max_retries = config.max_retries,
            "Executing batch"
        );

        let outcomes = if config.atomic {
            match self.run_atomic(intents, nonces, &mut reporter).await {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    warn!(%batch_id, error = %e, "Atomic batch aborted");
                    reporter.finish(false).await;
                    return Err(e);
                }
            }
        } else {
            self.run_sequential(intents, nonces, &config, &mut reporter)
                .await
        };

        let success = outcomes.iter().all(TransactionOutcome::is_success);
        reporter.finish(success).await;

        let result = fold_result(batch_id, outcomes, started);
        info!(
            %batch_id,
            success = result.success,
            total_gas_used = %result.total_gas_used,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Batch finished"
        );
        Ok(result)
    }

    /// Broadcast everything, then confirm in order
    ///
    /// No receipt is requested past the first failed or reverted transaction.
    async fn run_atomic(
        &self,
        intents: &[TransactionIntent],
        nonces: NonceAllocator,
        reporter: &mut ProgressReporter,
    ) -> Result<Vec<TransactionOutcome>, BatchError> {
        let requests: Vec<SendRequest> = intents
            .iter()
            .enumerate()
            .map(|(index, intent)| SendRequest::new(&intent.call, nonces.nonce_at(index)))
            .collect();

        // Sends are issued together; results come back in list order.
        let sent = join_all(
            requests
                .iter()
                .map(|request| self.sender.send_transaction(request)),
        )
        .await;

        let mut hashes = Vec::with_capacity(sent.len());
        for (intent, result) in intents.iter().zip(sent) {
            match result {
                Ok(hash) => hashes.push(hash),
                Err(source) => {
                    reporter.record_failure().await;
                    return Err(BatchError::Broadcast {
                        transaction_id: intent.id.clone(),
                        source,
                    });
                }
            }
        }
        debug!(broadcast = hashes.len(), "Atomic batch broadcast complete");

        let mut outcomes = Vec::with_capacity(intents.len());
        for (index, (intent, tx_hash)) in intents.iter().zip(hashes).enumerate() {
            reporter.set_current(&intent.id).await;

            let receipt = match self.chain.wait_for_receipt(tx_hash, self.confirmations).await {
                Ok(receipt) => receipt,
                Err(source) => {
                    reporter.record_failure().await;
                    return Err(BatchError::Confirmation {
                        transaction_id: intent.id.clone(),
                        source,
                    });
                }
            };

            if !receipt.status {
                reporter.record_failure().await;
                return Err(BatchError::Reverted {
                    transaction_id: intent.id.clone(),
                    tx_hash,
                    confirmed: index,
                });
            }

            outcomes.push(TransactionOutcome {
                id: intent.id.clone(),
                status: OutcomeStatus::Success,
                nonce: nonces.nonce_at(index),
                tx_hash: Some(tx_hash),
                receipt: Some(receipt),
                error: None,
                retries: 0,
            });
            reporter.record_success().await;
        }

        Ok(outcomes)
    }

    /// One transaction at a time, each with its own retries
    ///
    /// A permanent failure does not stop the batch. Its nonce stays unused,
    /// so later transactions can only be mined once something fills the gap.
    async fn run_sequential(
        &self,
        intents: &[TransactionIntent],
        nonces: NonceAllocator,
        config: &ExecutionConfig,
        reporter: &mut ProgressReporter,
    ) -> Vec<TransactionOutcome> {
        let retry = RetryController::new(
            self.chain,
            self.sender,
            RetryPolicy::new(config.max_retries, self.retry_base_delay),
            self.confirmations,
        );

        let mut outcomes = Vec::with_capacity(intents.len());
        let mut first_gap: Option<u64> = None;

        for (index, intent) in intents.iter().enumerate() {
            if index > 0 && !config.delay.is_zero() {
                sleep(config.delay).await;
            }
            reporter.set_current(&intent.id).await;

            let nonce = nonces.nonce_at(index);
            if let Some(gap) = first_gap {
                warn!(
                    id = %intent.id,
                    nonce,
                    unconfirmed_nonce = gap,
                    "Sending past an unconfirmed nonce; this transaction may not be mined"
                );
            }

            let outcome = retry.execute_with_retry(intent, nonce).await;
            if outcome.is_success() {
                reporter.record_success().await;
            } else {
                // A reverted receipt consumed its nonce; only unmined ones leave a gap
                if outcome.receipt.is_none() && first_gap.is_none() {
                    first_gap = Some(nonce);
                }
                reporter.record_failure().await;
            }
            outcomes.push(outcome);
        }

        outcomes
    }
}

fn fold_result(
    batch_id: &str,
    outcomes: Vec<TransactionOutcome>,
    started: Instant,
) -> BatchResult {
    let (total_gas_used, total_cost) = outcomes
        .iter()
        .filter_map(|outcome| outcome.receipt.as_ref())
        .fold((U256::zero(), U256::zero()), |(gas, cost), receipt| {
            (
                gas.saturating_add(receipt.gas_used),
                cost.saturating_add(receipt.cost()),
            )
        });

    BatchResult {
        batch_id: batch_id.to_string(),
        success: outcomes.iter().all(TransactionOutcome::is_success),
        outcomes,
        total_gas_used,
        total_cost,
        elapsed: started.elapsed(),
    }
}
