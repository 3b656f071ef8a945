use crate::{Result, Storage, StorageError};
use async_trait::async_trait;
use statrelay_common::store::SampleStore;
use statrelay_common::types::{MetricSample, MetricValue};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory backend with an optional JSON snapshot file.
///
/// The store itself is a [`SampleStore`] behind a read/write lock; no await
/// happens while a guard is held, so handlers and the flush task contend
/// only for the short map operations.
pub struct MemStorage {
    inner: RwLock<SampleStore>,
    snapshot_path: Option<PathBuf>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SampleStore::new()),
            snapshot_path: None,
        }
    }

    /// Binds a snapshot file. When `restore` is set and the file holds a
    /// valid snapshot the store starts from it; a missing or corrupt file
    /// logs a warning and starts empty.
    pub fn with_snapshot(path: impl Into<PathBuf>, restore: bool) -> Self {
        let path = path.into();
        let mut store = SampleStore::new();
        if restore {
            match std::fs::read(&path) {
                Ok(bytes) => match serde_json::from_slice::<SampleStore>(&bytes) {
                    Ok(restored) => {
                        tracing::info!(
                            path = %path.display(),
                            gauges = restored.gauges.len(),
                            counters = restored.counters.len(),
                            "Snapshot restored"
                        );
                        store = restored;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Snapshot decode failed, starting empty"
                        );
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!(path = %path.display(), "No snapshot file, starting empty");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Snapshot read failed, starting empty"
                    );
                }
            }
        }
        Self {
            inner: RwLock::new(store),
            snapshot_path: Some(path),
        }
    }

    /// Rewrites the snapshot file in full (truncate + overwrite) from the
    /// current store. A no-op when no snapshot file is bound.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let data = serde_json::to_vec_pretty(&*self.read())?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, SampleStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SampleStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn put(&self, name: &str, value: MetricValue) -> Result<()> {
        self.write().put(name, value);
        Ok(())
    }

    // Merge semantics: samples apply one by one, in order, under a single
    // write lock. Names the batch does not mention keep their values.
    async fn put_batch(&self, batch: &[MetricSample]) -> Result<()> {
        let mut store = self.write();
        for sample in batch {
            store.put(sample.name.clone(), sample.value);
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<MetricValue> {
        self.read().get(name).ok_or_else(|| StorageError::NotFound {
            name: name.to_string(),
        })
    }

    async fn get_all(&self) -> Result<SampleStore> {
        Ok(self.read().clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) {
        if let Err(e) = self.flush() {
            tracing::error!(error = %e, "Final snapshot flush failed");
        }
    }
}
