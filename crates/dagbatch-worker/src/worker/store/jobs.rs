//! Postgres job store.

use super::{JobRow, JobStore, NewJob};
use async_trait::async_trait;
use dagbatch_core::{Error, Result};
use sqlx::PgPool;
use tracing::instrument;

/// [`JobStore`] backed by the `jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store {
        context: e.to_string(),
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    /// The reset path also deletes the job's batches, in the same
    /// transaction, so a resubmission with a smaller total cannot
    /// leave stale batches behind.
    #[instrument(skip(self), fields(request_guid = %job.request_guid))]
    async fn upsert_by_request_id(&self, job: NewJob) -> Result<JobRow> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row: JobRow = sqlx::query_as(
            "INSERT INTO jobs (request_guid, user_guid, total_graphs, completed_graphs) \
             VALUES ($1, $2, $3, 0) \
             ON CONFLICT (request_guid) \
             DO UPDATE SET completed_graphs = 0, total_graphs = EXCLUDED.total_graphs \
             RETURNING id, request_guid, user_guid, total_graphs, completed_graphs, created_at",
        )
        .bind(job.request_guid)
        .bind(job.user_guid)
        .bind(job.total_graphs)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;

        sqlx::query("DELETE FROM batches WHERE job_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn update_completed(&self, job_id: i64, completed: i64) -> Result<JobRow> {
        sqlx::query_as(
            "UPDATE jobs SET completed_graphs = $2 WHERE id = $1 \
             RETURNING id, request_guid, user_guid, total_graphs, completed_graphs, created_at",
        )
        .bind(job_id)
        .bind(completed)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| Error::Store {
            context: format!("job {job_id} not found"),
        })
    }
}
