//! Postgres batch store.

use super::{BatchRow, BatchStore, NewBatch};
use async_trait::async_trait;
use dagbatch_core::{Error, Result};
use sqlx::PgPool;
use tracing::instrument;

/// [`BatchStore`] backed by the `batches` table.
#[derive(Debug, Clone)]
pub struct PgBatchStore {
    pool: PgPool,
}

impl PgBatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchStore for PgBatchStore {
    #[instrument(skip(self), fields(job_id = batch.job_id, batch_number = batch.batch_number))]
    async fn upsert(&self, batch: NewBatch) -> Result<BatchRow> {
        sqlx::query_as(
            "INSERT INTO batches (job_id, batch_number, compressed_data) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (job_id, batch_number) \
             DO UPDATE SET compressed_data = EXCLUDED.compressed_data \
             RETURNING id, job_id, batch_number, compressed_data, created_at",
        )
        .bind(batch.job_id)
        .bind(batch.batch_number)
        .bind(&batch.compressed_data)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Store {
            context: e.to_string(),
        })
    }
}
