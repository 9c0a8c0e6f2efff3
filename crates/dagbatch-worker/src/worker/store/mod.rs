//! Job and batch persistence.
//!
//! Both stores expose idempotent upsert-by-business-key semantics: a
//! job is keyed by the producer's request guid, a batch by
//! `(job_id, batch_number)`. Redelivery-driven reprocessing relies on
//! these keys to overwrite rather than duplicate. The traits are the
//! seam; tests substitute in-memory implementations, the binary wires
//! the Postgres ones.

mod batches;
mod jobs;

pub use batches::PgBatchStore;
pub use jobs::PgJobStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dagbatch_core::Result;
use uuid::Uuid;

/// A persisted job row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: i64,
    pub request_guid: Uuid,
    pub user_guid: Uuid,
    pub total_graphs: i64,
    pub completed_graphs: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting or resetting a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub request_guid: Uuid,
    pub user_guid: Uuid,
    pub total_graphs: i64,
}

/// A persisted batch row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchRow {
    pub id: i64,
    pub job_id: i64,
    pub batch_number: i64,
    pub compressed_data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Fields for upserting a batch.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub job_id: i64,
    pub batch_number: i64,
    pub compressed_data: Vec<u8>,
}

/// Persistence for job rows.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts the job, or resets the existing row with the same
    /// request guid: completed count back to 0 and previously
    /// persisted batches removed, so reprocessing starts from scratch.
    async fn upsert_by_request_id(&self, job: NewJob) -> Result<JobRow>;

    /// Sets the completed-graph count for a job. The count is
    /// monotonically non-decreasing within one processing attempt; a
    /// missing job is a store error.
    async fn update_completed(&self, job_id: i64, completed: i64) -> Result<JobRow>;
}

/// Persistence for batch rows.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Inserts the batch, or overwrites the payload of the existing
    /// row with the same `(job_id, batch_number)` key.
    async fn upsert(&self, batch: NewBatch) -> Result<BatchRow>;
}
