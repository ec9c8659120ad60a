use super::{PersistedState, PersistenceSink};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle the engine uses to queue snapshots for the persistence task
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    tx: mpsc::UnboundedSender<PersistedState>,
}

impl SnapshotPublisher {
    /// Queue a snapshot; never blocks
    ///
    /// Returns `false` when the persistence task is gone.
    pub fn publish(&self, snapshot: PersistedState) -> bool {
        if self.tx.send(snapshot).is_err() {
            tracing::debug!("persistence task stopped, snapshot dropped");
            return false;
        }
        true
    }
}

/// Counters reported by the persistence task when it stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistenceStats {
    /// Snapshots the sink accepted
    pub saved: u64,
    /// Snapshots the sink refused
    pub failed: u64,
    /// Snapshots skipped because a newer one was already queued
    pub superseded: u64,
}

/// Start the persistence task on the current tokio runtime
///
/// The task saves the newest queued snapshot, logs failures without
/// retrying and stops once every publisher is dropped.
pub fn spawn_persistence<S>(sink: S) -> (SnapshotPublisher, JoinHandle<PersistenceStats>)
where
    S: PersistenceSink + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(persistence_task(sink, rx));
    (SnapshotPublisher { tx }, handle)
}

async fn persistence_task<S: PersistenceSink>(
    sink: S,
    mut rx: mpsc::UnboundedReceiver<PersistedState>,
) -> PersistenceStats {
    let mut stats = PersistenceStats::default();

    while let Some(mut snapshot) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            snapshot = newer;
            stats.superseded += 1;
        }
        match sink.save(&snapshot).await {
            Ok(()) => stats.saved += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(error = %e, goal = %snapshot.selected_goal, "failed to persist snapshot");
            }
        }
    }

    tracing::debug!(saved = stats.saved, failed = stats.failed, "persistence task finished");
    stats
}
