//! The per-worker task loop.

use super::WorkRequest;
use dagbatch_core::{Error, GraphGenerator};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// Each worker owns its own [`GraphGenerator`] instance, so generation
/// (including its randomness state) needs no synchronization. The
/// worker listens on an MPSC channel and processes requests until a
/// shutdown signal is received.
///
/// Designed to be spawned as a Tokio task; runs until explicitly shut
/// down or the pool drops its sender.
pub async fn worker_loop<G: GraphGenerator>(
    worker_id: usize,
    mut rx: mpsc::Receiver<WorkRequest>,
    mut generator: G,
    cancel: CancellationToken,
) {
    tracing::trace!("Worker {worker_id} started");

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Generate { draw, result_tx } => {
                // A unit claimed before cancellation still reports an
                // outcome so the collector's count stays exact.
                let result = if cancel.is_cancelled() {
                    Err(Error::Shutdown)
                } else {
                    generator.generate(&draw)
                };

                if result_tx.send(result).await.is_err() {
                    tracing::debug!("Worker {worker_id} result receiver dropped");
                }
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
}
