//! Batch Registry Module
//!
//! Creates batches, assigns identifiers, and owns the progress table the
//! executing calls write into.

use super::progress::ProgressTable;
use crate::{Batch, BatchProgress, TransactionIntent, TxCall};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Batch creation and progress bookkeeping
///
/// Batch ids combine the creation time with a sequence counter, so they are
/// unique within the process.
pub struct BatchRegistry {
    /// Next sequence number to assign (starts at 1)
    next_sequence: AtomicU64,
    progress: ProgressTable,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self {
            next_sequence: AtomicU64::new(1),
            progress: ProgressTable::new(),
        }
    }

    /// Create a new batch from call parameters
    ///
    /// Intent `i` gets the id `{batch_id}-{i}`. The batch's progress record
    /// starts as pending with every intent pending.
    pub async fn create_batch(&self, calls: Vec<TxCall>) -> Batch {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let batch_id = format!(
            "batch-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sequence
        );

        let intents: Vec<TransactionIntent> = calls
            .into_iter()
            .enumerate()
            .map(|(index, call)| TransactionIntent {
                id: format!("{}-{}", batch_id, index),
                call,
            })
            .collect();

        self.progress
            .insert(&batch_id, BatchProgress::new(intents.len()))
            .await;
        debug!(%batch_id, intents = intents.len(), "Batch created");

        Batch { batch_id, intents }
    }

    /// Progress of a pending or executing batch
    pub async fn progress(&self, batch_id: &str) -> Option<BatchProgress> {
        self.progress.get(batch_id).await
    }

    pub fn progress_table(&self) -> ProgressTable {
        self.progress.clone()
    }
}

impl Default for BatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
