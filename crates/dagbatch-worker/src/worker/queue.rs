//! The durable queue delivery contract and its Postgres implementation.
//!
//! The broker's transport is out of scope; what the pipeline depends on
//! is the delivery contract: at-least-once delivery, at most one
//! unacknowledged message per worker instance, redelivery of anything
//! not positively acknowledged. [`JobSource`] captures that contract.
//! Prefetch-one is structural: the intake loop never holds more than
//! one unsettled [`Delivery`].
//!
//! [`PgJobSource`] implements the contract on a Postgres table. A claim
//! sets `locked_at` under `FOR UPDATE SKIP LOCKED`; acknowledging
//! deletes the row; rejecting clears the lock for immediate
//! redelivery; a claim whose worker crashed becomes redeliverable once
//! the redelivery timeout passes.

use async_trait::async_trait;
use dagbatch_core::{Error, Result};
use sqlx::PgPool;
use sqlx::postgres::types::PgInterval;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One claimed queue message.
///
/// Settling consumes the delivery, so a message can never be both
/// acknowledged and rejected, nor settled twice.
pub struct Delivery {
    body: Vec<u8>,
    message_id: i64,
    handle: Box<dyn DeliveryHandle>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, message_id: i64, handle: Box<dyn DeliveryHandle>) -> Self {
        Self {
            body,
            message_id,
            handle,
        }
    }

    /// The raw message body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Queue-assigned id, for operator-facing logs.
    pub fn message_id(&self) -> i64 {
        self.message_id
    }

    /// Positively acknowledges the message; it will not be redelivered.
    pub async fn ack(self) -> Result<()> {
        self.handle.ack().await
    }

    /// Returns the message to the queue for redelivery.
    pub async fn reject(self) -> Result<()> {
        self.handle.reject().await
    }
}

/// Settlement half of a [`Delivery`].
#[async_trait]
pub trait DeliveryHandle: Send {
    async fn ack(self: Box<Self>) -> Result<()>;
    async fn reject(self: Box<Self>) -> Result<()>;
}

/// A source of job deliveries.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Waits for the next deliverable message.
    ///
    /// Returns `Ok(None)` once `cancel` fires (and, for finite test
    /// sources, when the queue is exhausted).
    async fn recv(&self, cancel: &CancellationToken) -> Result<Option<Delivery>>;
}

/// [`JobSource`] backed by the `queue_messages` table.
#[derive(Debug, Clone)]
pub struct PgJobSource {
    pool: PgPool,
    poll_interval: Duration,
    redelivery_timeout: Duration,
}

impl PgJobSource {
    pub fn new(pool: PgPool, poll_interval: Duration, redelivery_timeout: Duration) -> Self {
        Self {
            pool,
            poll_interval,
            redelivery_timeout,
        }
    }

    async fn claim(&self) -> Result<Option<(i64, Vec<u8>, i32)>> {
        let timeout = PgInterval::try_from(self.redelivery_timeout).map_err(|e| Error::Store {
            context: format!("redelivery timeout is not a valid interval: {e}"),
        })?;

        sqlx::query_as(
            "UPDATE queue_messages \
             SET locked_at = now(), attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM queue_messages \
                 WHERE locked_at IS NULL OR locked_at < now() - $1 \
                 ORDER BY id \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, body, attempts",
        )
        .bind(timeout)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }
}

#[async_trait]
impl JobSource for PgJobSource {
    async fn recv(&self, cancel: &CancellationToken) -> Result<Option<Delivery>> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            if let Some((id, body, attempts)) = self.claim().await? {
                if attempts > 1 {
                    tracing::info!(message_id = id, attempts, "claimed redelivered message");
                }
                let handle = PgDeliveryHandle {
                    pool: self.pool.clone(),
                    id,
                };
                return Ok(Some(Delivery::new(body, id, Box::new(handle))));
            }

            tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

struct PgDeliveryHandle {
    pool: PgPool,
    id: i64,
}

#[async_trait]
impl DeliveryHandle for PgDeliveryHandle {
    async fn ack(self: Box<Self>) -> Result<()> {
        sqlx::query("DELETE FROM queue_messages WHERE id = $1")
            .bind(self.id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn reject(self: Box<Self>) -> Result<()> {
        sqlx::query("UPDATE queue_messages SET locked_at = NULL WHERE id = $1")
            .bind(self.id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store {
        context: e.to_string(),
    }
}
