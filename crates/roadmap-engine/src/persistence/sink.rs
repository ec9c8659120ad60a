use super::PersistedState;
use crate::error::PersistenceError;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination of engine snapshots
///
/// Implementations talk to whatever store keeps the user's progress. Calls
/// are best-effort: the worker logs a failure and moves on.
#[async_trait::async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store a snapshot
    async fn save(&self, snapshot: &PersistedState) -> Result<(), PersistenceError>;
}

/// Keeps every snapshot in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    saved: Arc<Mutex<Vec<PersistedState>>>,
    failing: bool,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that refuses every snapshot
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Snapshots saved so far
    #[must_use]
    pub fn snapshots(&self) -> Vec<PersistedState> {
        self.saved.lock().clone()
    }

    /// Most recent snapshot
    #[must_use]
    pub fn latest(&self) -> Option<PersistedState> {
        self.saved.lock().last().cloned()
    }

    /// Number of saved snapshots
    #[must_use]
    pub fn len(&self) -> usize {
        self.saved.lock().len()
    }

    /// Whether nothing was saved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.saved.lock().is_empty()
    }
}

#[async_trait::async_trait]
impl PersistenceSink for MemorySink {
    async fn save(&self, snapshot: &PersistedState) -> Result<(), PersistenceError> {
        if self.failing {
            return Err(PersistenceError::Rejected("memory sink is read-only".into()));
        }
        self.saved.lock().push(snapshot.clone());
        Ok(())
    }
}

/// Writes the newest snapshot to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    /// Sink writing to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored snapshot back
    ///
    /// # Errors
    /// Returns error if the file is missing or malformed
    pub async fn load(&self) -> Result<PersistedState, PersistenceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        PersistedState::from_json(&raw)
    }
}

#[async_trait::async_trait]
impl PersistenceSink for JsonFileSink {
    async fn save(&self, snapshot: &PersistedState) -> Result<(), PersistenceError> {
        let json = snapshot.to_json()?;
        // Staged write plus rename: readers never see a partial file.
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}
