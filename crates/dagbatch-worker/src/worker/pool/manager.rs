//! Asynchronous worker pool for bounded graph generation.
//!
//! This module defines the [`GenPool`] struct, which manages a set of
//! asynchronous workers responsible for processing [`WorkRequest`]s. It
//! distributes work using round-robin scheduling and supports
//! coordinated shutdown via a shared [`CancellationToken`].
//!
//! Each worker listens on its own bounded [`mpsc::Receiver`] and runs
//! its own generator instance, so generation state is never shared and
//! no locking is needed.

use super::{WorkRequest, worker::worker_loop};
use core::time::Duration;
use dagbatch_core::{Error, GraphDraw, GraphGenerator, Result, TaskGraph};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// A cooperative pool of asynchronous workers that generate task
/// graphs.
///
/// Workers receive requests over bounded MPSC channels. Work is
/// distributed in round-robin fashion and the pool supports graceful,
/// cancellable shutdown.
pub struct GenPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
}

impl GenPool {
    /// Spawns `num_workers` worker tasks, each owning the generator the
    /// factory produces for it.
    ///
    /// Worker channels hold a single request: with one job in flight
    /// at a time, dispatch is sequential and a deeper queue only adds
    /// memory pressure without improving throughput.
    pub fn spawn<G, F>(num_workers: usize, shutdown_token: CancellationToken, make_generator: F) -> Self
    where
        G: GraphGenerator + 'static,
        F: Fn(usize) -> G,
    {
        let mut workers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(1);
            workers.push(tx);

            tokio::spawn(worker_loop(
                worker_id,
                rx,
                make_generator(worker_id),
                shutdown_token.clone(),
            ));
        }

        Self {
            workers,
            next_worker: AtomicUsize::new(0),
            shutdown_token,
        }
    }

    /// Returns the index of the next worker to receive work
    /// (round-robin).
    ///
    /// Uses a relaxed atomic increment to minimize contention.
    fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Sends one generation unit to the next worker in the pool. The
    /// outcome arrives on `result_tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The worker is shutting down (`shutdown_token` was cancelled).
    /// - The worker's channel is closed.
    pub async fn dispatch(
        &self,
        draw: GraphDraw,
        result_tx: mpsc::Sender<Result<TaskGraph>>,
    ) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::Shutdown);
        }

        let worker_idx = self.next_worker_index();
        let worker = &self.workers[worker_idx];

        match worker.send(WorkRequest::Generate { draw, result_tx }).await {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::Channel {
                context: format!("Worker {worker_idx} channel closed"),
            }),
        }
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] to prevent new work.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker.
    /// - Waits (up to 3 seconds per worker) for shutdown
    ///   acknowledgements.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        tracing::debug!("Notifying all workers to shut down");
        let mut shutdown_handles = Vec::with_capacity(self.workers.len());

        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if let Err(e) = worker.send(WorkRequest::Shutdown { response: tx }).await {
                tracing::error!("Failed to send shutdown to worker {i}: {e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        let timeout_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(Duration::from_secs(3), rx).await {
                Ok(Ok(())) => {
                    tracing::trace!("Worker {i} shutdown acknowledged");
                }
                Ok(Err(e)) => {
                    tracing::error!("Worker {i} returned error: {e}");
                }
                Err(_) => {
                    tracing::warn!("Worker {i} shutdown timed out");
                }
            }
        });

        futures::future::join_all(timeout_futures).await;

        tracing::info!("Worker pool shutdown complete");
    }
}
