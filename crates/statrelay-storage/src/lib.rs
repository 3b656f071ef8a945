//! Storage engines for the statrelay collector.
//!
//! Two backends implement the same [`Storage`] contract: an in-memory store
//! with an optional JSON snapshot file ([`memory::MemStorage`]) and a
//! relational store reached through a database URL ([`db::DbStorage`]).
//! Calls that leave the process go through the bounded [`retry`] policy.

pub mod db;
pub mod memory;
pub mod retry;

mod entity;


use async_trait::async_trait;
use statrelay_common::store::SampleStore;
use statrelay_common::types::{MetricSample, MetricValue};

/// Errors surfaced by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No gauge or counter is stored under the requested name.
    #[error("metric with key '{name}' not found")]
    NotFound { name: String },

    /// An underlying database error, after the retry policy has run.
    #[error("storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// The snapshot file could not be read or written.
    #[error("storage: snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot file could not be encoded or decoded.
    #[error("storage: snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Persistence backend for aggregated metrics.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the HTTP handlers and the snapshot flush task access the
/// storage concurrently.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Applies one sample: gauges replace, counters add onto the stored
    /// value (absent treated as zero).
    async fn put(&self, name: &str, value: MetricValue) -> Result<()>;

    /// Applies a whole batch or nothing. Duplicate names of the same kind
    /// within a batch are each applied, not deduplicated.
    async fn put_batch(&self, batch: &[MetricSample]) -> Result<()>;

    /// Returns the stored value for a name, counters first.
    async fn get(&self, name: &str) -> Result<MetricValue>;

    /// Full snapshot of both mappings for listing and export.
    async fn get_all(&self) -> Result<SampleStore>;

    /// Backend liveness check.
    async fn ping(&self) -> Result<()>;

    /// Releases backend resources; safe to call more than once.
    async fn shutdown(&self);
}
