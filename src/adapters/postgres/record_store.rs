//! PostgreSQL implementation of the record store ports.
//!
//! Aggregates are persisted as JSONB documents with a version column;
//! optimistic concurrency is a conditional UPDATE on that column. One
//! table per aggregate:
//!
//! ```sql
//! CREATE TABLE workflows (
//!     id         TEXT PRIMARY KEY,
//!     record     JSONB NOT NULL,
//!     version    BIGINT NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! -- bids, emds, tenders: same shape
//! ```
//!
//! Every round trip is bounded by the configured operation timeout and
//! surfaces `Timeout` instead of hanging.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::domain::bid::Bid;
use crate::domain::emd::Emd;
use crate::domain::foundation::{
    BidId, DomainError, EmdId, TenderId, Timestamp, WorkflowId,
};
use crate::domain::tender::TenderSnapshot;
use crate::domain::workflow::WorkflowInstance;
use crate::ports::{EmdStore, RecordStore, TenderReader, Version, Versioned};

/// PostgreSQL record store for one aggregate table.
pub struct PgRecordStore<T, ID> {
    pool: PgPool,
    table: &'static str,
    entity: &'static str,
    op_timeout: Duration,
    _marker: PhantomData<fn() -> (T, ID)>,
}

impl<T, ID> PgRecordStore<T, ID> {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool, table: &'static str, entity: &'static str, op_timeout: Duration) -> Self {
        Self {
            pool,
            table,
            entity,
            op_timeout,
            _marker: PhantomData,
        }
    }

    async fn bounded<F, R>(&self, operation: &'static str, fut: F) -> Result<R, DomainError>
    where
        F: Future<Output = Result<R, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Err(_) => Err(DomainError::timeout(format!("{} {}", operation, self.entity))),
            Ok(Err(e)) => Err(DomainError::store(format!(
                "{} {} failed: {}",
                operation, self.entity, e
            ))),
            Ok(Ok(r)) => Ok(r),
        }
    }
}

/// Store over the `workflows` table.
pub fn workflow_store(pool: PgPool, op_timeout: Duration) -> PgRecordStore<WorkflowInstance, WorkflowId> {
    PgRecordStore::new(pool, "workflows", "Workflow", op_timeout)
}

/// Store over the `bids` table.
pub fn bid_store(pool: PgPool, op_timeout: Duration) -> PgRecordStore<Bid, BidId> {
    PgRecordStore::new(pool, "bids", "Bid", op_timeout)
}

#[async_trait]
impl<T, ID> RecordStore<T, ID> for PgRecordStore<T, ID>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    ID: Display + Debug + Send + Sync,
{
    async fn load(&self, id: &ID) -> Result<Option<Versioned<T>>, DomainError> {
        let sql = format!("SELECT record, version FROM {} WHERE id = $1", self.table);
        let row = self
            .bounded(
                "load",
                sqlx::query(&sql).bind(id.to_string()).fetch_optional(&self.pool),
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record: serde_json::Value = row.try_get("record").map_err(|e| {
            DomainError::store(format!("bad record column for {} {}: {}", self.entity, id, e))
        })?;
        let version: i64 = row.try_get("version").map_err(|e| {
            DomainError::store(format!("bad version column for {} {}: {}", self.entity, id, e))
        })?;
        let record: T = serde_json::from_value(record).map_err(|e| {
            DomainError::store(format!("cannot decode {} {}: {}", self.entity, id, e))
        })?;
        Ok(Some(Versioned {
            record,
            version: Version::from_u64(version as u64),
        }))
    }

    async fn insert(&self, id: &ID, record: &T) -> Result<Version, DomainError> {
        let payload = serde_json::to_value(record).map_err(|e| {
            DomainError::store(format!("cannot encode {} {}: {}", self.entity, id, e))
        })?;
        let sql = format!(
            "INSERT INTO {} (id, record, version, updated_at) VALUES ($1, $2, $3, now()) \
             ON CONFLICT (id) DO NOTHING",
            self.table
        );
        let initial = Version::initial();
        let result = self
            .bounded(
                "insert",
                sqlx::query(&sql)
                    .bind(id.to_string())
                    .bind(payload)
                    .bind(initial.as_u64() as i64)
                    .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conflict(self.entity, id)
                .with_detail("reason", "record already exists"));
        }
        Ok(initial)
    }

    async fn save(&self, id: &ID, record: &T, expected: Version) -> Result<Version, DomainError> {
        let payload = serde_json::to_value(record).map_err(|e| {
            DomainError::store(format!("cannot encode {} {}: {}", self.entity, id, e))
        })?;
        let sql = format!(
            "UPDATE {} SET record = $2, version = version + 1, updated_at = now() \
             WHERE id = $1 AND version = $3 RETURNING version",
            self.table
        );
        let row = self
            .bounded(
                "save",
                sqlx::query(&sql)
                    .bind(id.to_string())
                    .bind(payload)
                    .bind(expected.as_u64() as i64)
                    .fetch_optional(&self.pool),
            )
            .await?;

        if let Some(row) = row {
            let version: i64 = row.try_get("version").map_err(|e| {
                DomainError::store(format!("bad version column for {} {}: {}", self.entity, id, e))
            })?;
            return Ok(Version::from_u64(version as u64));
        }

        // No row matched: distinguish a missing record from a lost race.
        let probe = format!("SELECT version FROM {} WHERE id = $1", self.table);
        let existing = self
            .bounded(
                "save",
                sqlx::query(&probe).bind(id.to_string()).fetch_optional(&self.pool),
            )
            .await?;
        match existing {
            None => Err(DomainError::not_found(self.entity, id)),
            Some(row) => {
                let stored: i64 = row.try_get("version").unwrap_or_default();
                Err(DomainError::conflict(self.entity, id)
                    .with_detail("expected_version", expected.to_string())
                    .with_detail("stored_version", stored.to_string()))
            }
        }
    }
}

/// PostgreSQL EMD store with the due-date scan for the sweep.
pub struct PgEmdStore {
    inner: PgRecordStore<Emd, EmdId>,
}

impl PgEmdStore {
    /// Creates a store over the `emds` table.
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self {
            inner: PgRecordStore::new(pool, "emds", "Emd", op_timeout),
        }
    }
}

#[async_trait]
impl RecordStore<Emd, EmdId> for PgEmdStore {
    async fn load(&self, id: &EmdId) -> Result<Option<Versioned<Emd>>, DomainError> {
        self.inner.load(id).await
    }

    async fn insert(&self, id: &EmdId, record: &Emd) -> Result<Version, DomainError> {
        self.inner.insert(id, record).await
    }

    async fn save(&self, id: &EmdId, record: &Emd, expected: Version) -> Result<Version, DomainError> {
        self.inner.save(id, record, expected).await
    }
}

#[async_trait]
impl EmdStore for PgEmdStore {
    async fn list_active_due(&self, before: Timestamp) -> Result<Vec<EmdId>, DomainError> {
        let rows = self
            .inner
            .bounded(
                "list_active_due",
                sqlx::query(
                    "SELECT id FROM emds \
                     WHERE record->>'status' = 'active' \
                       AND (record->>'validity')::timestamptz < $1",
                )
                .bind(*before.as_datetime())
                .fetch_all(&self.inner.pool),
            )
            .await?;

        rows.into_iter()
            .map(|row| {
                let raw: String = row.try_get("id").map_err(|e| {
                    DomainError::store(format!("bad id column in emds: {}", e))
                })?;
                raw.parse::<EmdId>()
                    .map_err(|e| DomainError::store(format!("bad emd id '{}': {}", raw, e)))
            })
            .collect()
    }
}

/// PostgreSQL tender snapshot reader over the `tenders` table.
pub struct PgTenderReader {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgTenderReader {
    /// Creates a reader over an existing pool.
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }
}

#[async_trait]
impl TenderReader for PgTenderReader {
    async fn snapshot(&self, id: &TenderId) -> Result<Option<TenderSnapshot>, DomainError> {
        let fut = sqlx::query("SELECT record FROM tenders WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool);
        let row = match tokio::time::timeout(self.op_timeout, fut).await {
            Err(_) => return Err(DomainError::timeout("load Tender")),
            Ok(Err(e)) => return Err(DomainError::store(format!("load Tender failed: {}", e))),
            Ok(Ok(row)) => row,
        };

        let Some(row) = row else {
            return Ok(None);
        };
        let record: serde_json::Value = row
            .try_get("record")
            .map_err(|e| DomainError::store(format!("bad record column for Tender {}: {}", id, e)))?;
        let snapshot: TenderSnapshot = serde_json::from_value(record)
            .map_err(|e| DomainError::store(format!("cannot decode Tender {}: {}", id, e)))?;
        Ok(Some(snapshot))
    }
}
