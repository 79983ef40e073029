//! Batch Executor
//!
//! Public entry point tying the registry, the coordinator, and the cost
//! estimator to one pair of chain collaborators.

use super::coordinator::{ExecutionConfig, ExecutionCoordinator};
use super::estimator;
use super::registry::BatchRegistry;
use crate::{
    Batch, BatchError, BatchProgress, BatchResult, ChainError, CostEstimate, TransactionIntent,
    TxCall,
    chain::{ChainReader, TransactionSender},
    config::Config,
};
use std::sync::Arc;
use std::time::Duration;

/// Executes batches for one account
///
/// Holds no per-account lock: running two batches for the same account at
/// once produces conflicting nonces and must be avoided by the caller.
pub struct BatchExecutor {
    chain: Arc<dyn ChainReader>,
    sender: Option<Arc<dyn TransactionSender>>,
    registry: BatchRegistry,
    /// Backoff unit for retries
    retry_base_delay: Duration,
    confirmations: usize,
}

impl BatchExecutor {
    pub fn new(chain: Arc<dyn ChainReader>, sender: Arc<dyn TransactionSender>) -> Self {
        Self {
            chain,
            sender: Some(sender),
            registry: BatchRegistry::new(),
            retry_base_delay: Duration::from_secs(1),
            confirmations: 1,
        }
    }

    /// Executor without a signer; only estimation and bookkeeping work
    pub fn read_only(chain: Arc<dyn ChainReader>) -> Self {
        Self {
            chain,
            sender: None,
            registry: BatchRegistry::new(),
            retry_base_delay: Duration::from_secs(1),
            confirmations: 1,
        }
    }

    /// Builds an executor with retry and confirmation settings from config
    pub fn from_config(
        chain: Arc<dyn ChainReader>,
        sender: Option<Arc<dyn TransactionSender>>,
        config: &Config,
    ) -> Self {
        Self {
            chain,
            sender,
            registry: BatchRegistry::new(),
            retry_base_delay: config.retry.base_delay(),
            confirmations: config.chain.confirmations,
        }
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn has_signer(&self) -> bool {
        self.sender.is_some()
    }

    pub async fn create_batch(&self, calls: Vec<TxCall>) -> Batch {
        self.registry.create_batch(calls).await
    }

    /// Executes `intents` under `batch_id`
    ///
    /// Re-executing a batch fetches a fresh starting nonce, which conflicts
    /// with anything the earlier run already broadcast.
    pub async fn execute_batch(
        &self,
        batch_id: &str,
        intents: &[TransactionIntent],
        config: ExecutionConfig,
    ) -> Result<BatchResult, BatchError> {
        let sender = self.sender.as_deref().ok_or(BatchError::SignerNotConnected)?;

        ExecutionCoordinator::new(
            self.chain.as_ref(),
            sender,
            self.retry_base_delay,
            self.confirmations,
        )
        .execute(batch_id, intents, config, self.registry.progress_table())
        .await
    }

    pub async fn estimate_batch_cost(&self, calls: &[TxCall]) -> Result<CostEstimate, ChainError> {
        estimator::estimate_batch_cost(self.chain.as_ref(), calls).await
    }

    /// Progress of a batch that is pending or executing
    ///
    /// Returns `None` for unknown batches and for batches that already
    /// reached a terminal status.
    pub async fn get_batch_progress(&self, batch_id: &str) -> Option<BatchProgress> {
        self.registry.progress(batch_id).await
    }
}
