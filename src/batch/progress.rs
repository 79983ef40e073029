//! Progress Reporting
//!
//! Every batch owns one `BatchProgress` record while it is pending or
//! executing. The record lives in a `ProgressTable` so callers can poll it,
//! and every transition is pushed to the batch's observer right away.

use crate::{BatchProgress, BatchStatus};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Receives a snapshot after every progress transition
///
/// Called synchronously from the executing task; one call per transition,
/// never coalesced.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &BatchProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&BatchProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &BatchProgress) {
        self(progress)
    }
}

/// Forwards snapshots into an unbounded channel
///
/// A closed receiver is ignored; execution does not depend on anyone
/// listening.
pub struct ChannelObserver {
    sender: UnboundedSender<BatchProgress>,
}

impl ChannelObserver {
    pub fn new(sender: UnboundedSender<BatchProgress>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, progress: &BatchProgress) {
        let _ = self.sender.send(progress.clone());
    }
}

impl fmt::Debug for ChannelObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelObserver").finish_non_exhaustive()
    }
}

/// Progress records keyed by batch id
///
/// Each key is written only by the one call executing that batch.
#[derive(Clone, Default)]
pub struct ProgressTable {
    records: Arc<RwLock<HashMap<String, BatchProgress>>>,
}

impl ProgressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, batch_id: &str) -> Option<BatchProgress> {
        let records = self.records.read().await;
        records.get(batch_id).cloned()
    }

    pub async fn insert(&self, batch_id: &str, progress: BatchProgress) {
        let mut records = self.records.write().await;
        records.insert(batch_id.to_string(), progress);
    }

    /// Claims the batch by installing an executing record
    ///
    /// Check and insert happen under one write lock, so at most one caller
    /// can claim a batch id. Returns `false` if another call already owns it.
    pub async fn try_begin(&self, batch_id: &str, progress: BatchProgress) -> bool {
        let mut records = self.records.write().await;
        if records
            .get(batch_id)
            .is_some_and(|existing| existing.status == BatchStatus::Executing)
        {
            return false;
        }
        records.insert(batch_id.to_string(), progress);
        true
    }

    pub async fn remove(&self, batch_id: &str) -> Option<BatchProgress> {
        let mut records = self.records.write().await;
        records.remove(batch_id)
    }
}

/// Mutates the progress record of one executing batch
pub struct ProgressReporter {
    batch_id: String,
    progress: BatchProgress,
    table: ProgressTable,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProgressReporter {
    /// Takes ownership of the batch's record, already marked executing
    ///
    /// # Returns
    /// `None` if the batch is already executing
    pub async fn begin(
        batch_id: &str,
        total: usize,
        first_transaction: Option<&str>,
        table: ProgressTable,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Option<Self> {
        let mut reporter = Self {
            batch_id: batch_id.to_string(),
            progress: BatchProgress::new(total),
            table,
            observer,
        };
        reporter.progress.current_transaction = first_transaction.map(str::to_string);
        reporter.transition(BatchStatus::Executing);

        if !reporter
            .table
            .try_begin(batch_id, reporter.progress.clone())
            .await
        {
            return None;
        }
        Some(reporter)
    }

    /// Announces the executing record to the observer
    pub fn start(&self) {
        self.notify();
    }

    /// Updates the transaction currently being worked on
    ///
    /// Counts and status are unchanged, so the observer is not notified.
    pub async fn set_current(&mut self, transaction_id: &str) {
        self.progress.current_transaction = Some(transaction_id.to_string());
        self.publish(false).await;
    }

    pub async fn record_success(&mut self) {
        if self.take_pending() {
            self.progress.completed += 1;
            self.publish(true).await;
        }
    }

    pub async fn record_failure(&mut self) {
        if self.take_pending() {
            self.progress.failed += 1;
            self.publish(true).await;
        }
    }

    /// Moves to a terminal status, notifies, and drops the table entry
    pub async fn finish(mut self, success: bool) -> BatchProgress {
        let status = if success {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };
        self.progress.current_transaction = None;
        self.transition(status);

        self.notify();
        self.table.remove(&self.batch_id).await;
        debug!(batch_id = %self.batch_id, ?status, "Batch progress closed");
        self.progress
    }

    fn take_pending(&mut self) -> bool {
        if self.progress.pending == 0 {
            warn!(batch_id = %self.batch_id, "Outcome recorded with no pending transactions");
            return false;
        }
        self.progress.pending -= 1;
        true
    }

    fn transition(&mut self, next: BatchStatus) {
        if self.progress.status.can_transition_to(next) {
            self.progress.status = next;
        } else {
            warn!(
                batch_id = %self.batch_id,
                from = ?self.progress.status,
                to = ?next,
                "Ignoring backwards status transition"
            );
        }
    }

    async fn publish(&self, notify: bool) {
        self.table.insert(&self.batch_id, self.progress.clone()).await;
        if notify {
            self.notify();
        }
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer.on_progress(&self.progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_observer() -> (Arc<dyn ProgressObserver>, Arc<Mutex<Vec<BatchProgress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<dyn ProgressObserver> =
            Arc::new(move |p: &BatchProgress| sink.lock().unwrap().push(p.clone()));
        (observer, seen)
    }

    #[tokio::test]
    async fn test_reporter_notifies_every_transition() {
        let table = ProgressTable::new();
        let (observer, seen) = recording_observer();

        let mut reporter =
            ProgressReporter::begin("b", 3, Some("b-0"), table.clone(), Some(observer))
                .await
                .unwrap();
        reporter.start();
        reporter.record_success().await;
        reporter.set_current("b-1").await;
        reporter.record_failure().await;
        reporter.set_current("b-2").await;
        reporter.record_success().await;
        let last = reporter.finish(false).await;

        let seen = seen.lock().unwrap();
        // start + 3 outcomes + finish; current-transaction updates are silent
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(BatchProgress::is_consistent));
        assert_eq!(seen[0].status, BatchStatus::Executing);
        assert_eq!(seen[4].status, BatchStatus::Failed);
        assert_eq!((last.completed, last.failed, last.pending), (2, 1, 0));
        assert!(table.get("b").await.is_none());
    }

    #[tokio::test]
    async fn test_table_tracks_current_transaction() {
        let table = ProgressTable::new();
        let mut reporter = ProgressReporter::begin("b", 2, Some("b-0"), table.clone(), None)
            .await
            .unwrap();
        reporter.start();
        reporter.record_success().await;
        reporter.set_current("b-1").await;

        let polled = table.get("b").await.unwrap();
        assert_eq!(polled.status, BatchStatus::Executing);
        assert_eq!(polled.current_transaction.as_deref(), Some("b-1"));
        assert_eq!(polled.completed, 1);
        assert_eq!(polled.pending, 1);
    }

    #[tokio::test]
    async fn test_second_reporter_for_executing_batch_is_refused() {
        let table = ProgressTable::new();
        let mut first = ProgressReporter::begin("b", 1, Some("b-0"), table.clone(), None)
            .await
            .unwrap();

        let polled = table.get("b").await.unwrap();
        assert_eq!(polled.status, BatchStatus::Executing);
        assert_eq!(polled.current_transaction.as_deref(), Some("b-0"));
        assert!(
            ProgressReporter::begin("b", 1, Some("b-0"), table.clone(), None)
                .await
                .is_none()
        );

        first.record_success().await;
        first.finish(true).await;
        assert!(
            ProgressReporter::begin("b", 1, None, table, None)
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_extra_outcomes_keep_counts_balanced() {
        let table = ProgressTable::new();
        let mut reporter = ProgressReporter::begin("b", 1, Some("b-0"), table, None)
            .await
            .unwrap();
        reporter.record_success().await;
        reporter.record_failure().await;

        let last = reporter.finish(true).await;
        assert!(last.is_consistent());
        assert_eq!((last.completed, last.failed), (1, 0));
    }

    #[tokio::test]
    async fn test_channel_observer_forwards_snapshots() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let observer = ChannelObserver::new(tx);
        let progress = BatchProgress::new(2);

        observer.on_progress(&progress);
        assert_eq!(rx.recv().await, Some(progress));
    }
}
