//! The consume/ack loop.
//!
//! One delivery at a time: receive, decode, orchestrate, settle. The
//! message is acknowledged if and only if orchestration succeeded;
//! every failure path rejects the delivery back to the queue and the
//! loop moves on. The loop itself performs no retries and no backoff;
//! redelivery policy belongs to the queue.

use crate::worker::orchestrator::JobOrchestrator;
use crate::worker::queue::JobSource;
use dagbatch_core::{JobRequest, Result};
use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Runs the intake loop until the source is exhausted or `cancel`
/// fires.
///
/// # Errors
///
/// Returns an error only when the source or settlement itself fails;
/// per-job failures are logged and settled as rejections.
pub async fn run_intake<S, R>(
    source: &S,
    orchestrator: &mut JobOrchestrator<R>,
    cancel: &CancellationToken,
) -> Result<()>
where
    S: JobSource,
    R: Rng + Send,
{
    tracing::info!("Waiting for job requests");

    while let Some(delivery) = source.recv(cancel).await? {
        let message_id = delivery.message_id();

        let request: JobRequest = match serde_json::from_slice(delivery.body()) {
            Ok(request) => request,
            Err(e) => {
                // Surfaced, not silently dropped: the log line plus the
                // queue's attempt counter are the operator-visible
                // signal for a poison message.
                tracing::error!(message_id, error = %e, "rejecting undecodable message body");
                delivery.reject().await?;
                continue;
            }
        };

        match orchestrator.process_job(&request).await {
            Ok(()) => {
                delivery.ack().await?;
                tracing::info!(message_id, request_guid = %request.request_guid, "job acknowledged");
            }
            Err(e) => {
                tracing::error!(
                    message_id,
                    request_guid = %request.request_guid,
                    error = %e,
                    "job attempt failed, leaving message for redelivery"
                );
                delivery.reject().await?;
            }
        }
    }

    tracing::info!("Intake loop stopped");
    Ok(())
}
