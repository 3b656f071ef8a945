//! Relational backend over sea-orm; SQLite or PostgreSQL selected by URL.

use crate::entity::{self, Column, Entity as Metrics};
use crate::retry::{with_retry, RetryPolicy};
use crate::{Result, Storage, StorageError};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    RuntimeErr, TransactionTrait,
};
use statrelay_common::store::SampleStore;
use statrelay_common::types::{MetricSample, MetricValue, TYPE_COUNTER, TYPE_GAUGE};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const INIT_TIMEOUT: Duration = Duration::from_secs(2);
const QUERY_TIMEOUT: Duration = Duration::from_secs(1);

const QUERY_TABLE_VALIDATION: &str = "SELECT id FROM metrics LIMIT 1";
const QUERY_CREATE_TABLE: &str = "\
CREATE TABLE metrics (
    id TEXT NOT NULL,
    type TEXT NOT NULL,
    value DOUBLE PRECISION,
    delta BIGINT,
    PRIMARY KEY (id)
)";

/// Relational storage engine.
///
/// Gauges are stored by UPDATE-then-INSERT; counters read the stored delta
/// and write back the sum. Batches run inside one transaction, so a failed
/// sample rolls the whole batch back. Every call that reaches the database
/// goes through the crate's retry policy.
pub struct DbStorage {
    db: DatabaseConnection,
    policy: RetryPolicy,
    closed: AtomicBool,
}

impl DbStorage {
    /// Connects and bootstraps the `metrics` table when the validation
    /// query fails (first run against an empty database).
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_policy(url, RetryPolicy::default()).await
    }

    pub async fn connect_with_policy(url: &str, policy: RetryPolicy) -> Result<Self> {
        let db = Database::connect(url).await?;

        let probe = with_retry(policy, || {
            bounded(INIT_TIMEOUT, db.execute_unprepared(QUERY_TABLE_VALIDATION))
        })
        .await;
        if let Err(e) = probe {
            tracing::debug!(error = %e, "Validation query failed, creating table");
            with_retry(policy, || {
                bounded(INIT_TIMEOUT, db.execute_unprepared(QUERY_CREATE_TABLE))
            })
            .await?;
            tracing::info!("Table `metrics` created");
        }

        Ok(Self {
            db,
            policy,
            closed: AtomicBool::new(false),
        })
    }
}

// Expired deadlines count as connection-class failures, so a hung backend
// is retried the same way a refused connection is.
async fn bounded<T, Fut>(limit: Duration, fut: Fut) -> std::result::Result<T, DbErr>
where
    Fut: Future<Output = std::result::Result<T, DbErr>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DbErr::Conn(RuntimeErr::Internal(format!(
            "query timed out after {limit:?}"
        )))),
    }
}

async fn put_gauge<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    value: f64,
) -> std::result::Result<(), DbErr> {
    let updated = Metrics::update_many()
        .col_expr(Column::Value, Expr::value(value))
        .filter(Column::Id.eq(name))
        .exec(conn)
        .await?;
    if updated.rows_affected == 0 {
        let row = entity::ActiveModel {
            id: Set(name.to_string()),
            kind: Set(TYPE_GAUGE.to_string()),
            value: Set(Some(value)),
            delta: Set(None),
        };
        Metrics::insert(row).exec_without_returning(conn).await?;
    }
    Ok(())
}

// Read-then-write, not an atomic increment; concurrent writers are
// serialized by the enclosing transaction when there is one.
async fn put_counter<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    delta: i64,
) -> std::result::Result<(), DbErr> {
    match Metrics::find_by_id(name).one(conn).await? {
        None => {
            let row = entity::ActiveModel {
                id: Set(name.to_string()),
                kind: Set(TYPE_COUNTER.to_string()),
                value: Set(None),
                delta: Set(Some(delta)),
            };
            Metrics::insert(row).exec_without_returning(conn).await?;
        }
        Some(model) => {
            let current = model.delta.unwrap_or(0);
            Metrics::update_many()
                .col_expr(Column::Delta, Expr::value(current + delta))
                .filter(Column::Id.eq(name))
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

async fn apply_sample<C: ConnectionTrait>(
    conn: &C,
    sample: &MetricSample,
) -> std::result::Result<(), DbErr> {
    match sample.value {
        MetricValue::Gauge(value) => put_gauge(conn, &sample.name, value).await,
        MetricValue::Counter(delta) => put_counter(conn, &sample.name, delta).await,
    }
}

#[async_trait]
impl Storage for DbStorage {
    async fn put(&self, name: &str, value: MetricValue) -> Result<()> {
        let sample = MetricSample {
            name: name.to_string(),
            value,
        };
        with_retry(self.policy, || {
            bounded(QUERY_TIMEOUT, apply_sample(&self.db, &sample))
        })
        .await?;
        Ok(())
    }

    async fn put_batch(&self, batch: &[MetricSample]) -> Result<()> {
        // The transaction is the retry unit: a connection drop mid-batch
        // rolls back and replays from `begin`, never double-applying.
        let db = &self.db;
        with_retry(self.policy, || async move {
            let txn = db.begin().await?;
            for sample in batch {
                apply_sample(&txn, sample).await?;
            }
            txn.commit().await
        })
        .await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<MetricValue> {
        let model = with_retry(self.policy, || {
            bounded(QUERY_TIMEOUT, Metrics::find_by_id(name).one(&self.db))
        })
        .await?;
        let Some(model) = model else {
            return Err(StorageError::NotFound {
                name: name.to_string(),
            });
        };
        match model.kind.as_str() {
            TYPE_GAUGE => Ok(MetricValue::Gauge(model.value.unwrap_or_default())),
            TYPE_COUNTER => Ok(MetricValue::Counter(model.delta.unwrap_or_default())),
            _ => Err(StorageError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn get_all(&self) -> Result<SampleStore> {
        let rows = with_retry(self.policy, || {
            bounded(QUERY_TIMEOUT, Metrics::find().all(&self.db))
        })
        .await?;
        let mut store = SampleStore::new();
        for row in rows {
            let entity::Model {
                id,
                kind,
                value,
                delta,
            } = row;
            match kind.as_str() {
                TYPE_GAUGE => {
                    store.gauges.insert(id, value.unwrap_or_default());
                }
                TYPE_COUNTER => {
                    store.counters.insert(id, delta.unwrap_or_default());
                }
                other => {
                    tracing::warn!(kind = other, id = %id, "Unknown metric kind in table");
                }
            }
        }
        Ok(store)
    }

    async fn ping(&self) -> Result<()> {
        with_retry(self.policy, || bounded(QUERY_TIMEOUT, self.db.ping())).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.db.clone().close().await {
            Ok(()) => tracing::info!("Connection to database closed"),
            Err(e) => tracing::warn!(error = %e, "Database close failed"),
        }
    }
}
