//! One job's lifecycle, intake to completion.
//!
//! The orchestrator owns the collector side of the pipeline: it
//! upserts (or resets) the job row, samples one parameter draw per
//! unit, feeds the draws to the worker pool, and drains the results
//! channel exactly `graph_count` times, cutting and persisting windows
//! as boundaries are hit. Window `k` is fully persisted (batch upsert,
//! then progress update) before any of window `k+1`'s results are
//! drained, so windows reach the store strictly in order even though
//! units complete out of order.
//!
//! No step here retries. Any failure aborts the attempt and surfaces
//! to the intake loop, which leaves the message unacknowledged;
//! redelivery reprocesses the job from scratch against the idempotent
//! upserts.

use crate::worker::coalescer::{BatchCoalescer, Window};
use crate::worker::pool::manager::GenPool;
use crate::worker::store::{BatchStore, JobStore, NewBatch, NewJob};
use dagbatch_core::{Error, JobRequest, Result, compress_batch};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Drives one job from request to completion.
pub struct JobOrchestrator<R: Rng + Send> {
    pool: Arc<GenPool>,
    jobs: Arc<dyn JobStore>,
    batches: Arc<dyn BatchStore>,
    batch_size: usize,
    rng: R,
}

impl<R: Rng + Send> JobOrchestrator<R> {
    pub fn new(
        pool: Arc<GenPool>,
        jobs: Arc<dyn JobStore>,
        batches: Arc<dyn BatchStore>,
        batch_size: usize,
        rng: R,
    ) -> Self {
        Self {
            pool,
            jobs,
            batches,
            batch_size,
            rng,
        }
    }

    /// Processes one decoded job request to completion.
    ///
    /// Returns `Ok(())` only after every window (including the final
    /// partial one) is persisted and the job's completed count equals
    /// its total. A zero-unit request succeeds immediately with no
    /// batches.
    #[tracing::instrument(skip_all, fields(request_guid = %request.request_guid, graphs = request.graph_count))]
    pub async fn process_job(&mut self, request: &JobRequest) -> Result<()> {
        let total = i64::from(request.graph_count);
        let job = self
            .jobs
            .upsert_by_request_id(NewJob {
                request_guid: request.request_guid,
                user_guid: request.user_guid,
                total_graphs: total,
            })
            .await?;

        if total == 0 {
            tracing::info!(job_id = job.id, "job has no units, completing immediately");
            return Ok(());
        }

        // Sampling happens up front, on this task, so the randomness
        // source stays single-owner.
        let draws = (0..total)
            .map(|_| request.graph_settings.sample(&mut self.rng))
            .collect::<Result<Vec<_>>>()?;

        // Validates the window size before the channel below, whose
        // capacity must be nonzero.
        let mut coalescer = BatchCoalescer::new(self.batch_size)?;

        let (result_tx, mut result_rx) = mpsc::channel(self.batch_size);

        // The feeder dispatches concurrently with the drain below;
        // worker channels are bounded, so dispatching all units before
        // draining would deadlock once every queue is full.
        let pool = Arc::clone(&self.pool);
        let feeder = tokio::spawn(async move {
            for draw in draws {
                if let Err(e) = pool.dispatch(draw, result_tx.clone()).await {
                    // Surface the dispatch failure through the same
                    // channel the collector is draining.
                    let _ = result_tx.send(Err(e)).await;
                    break;
                }
            }
        });

        for _ in 0..total {
            match result_rx.recv().await {
                Some(Ok(graph)) => {
                    if let Some(window) = coalescer.push(graph) {
                        self.persist_window(job.id, window).await?;
                    }
                }
                Some(Err(e)) => {
                    feeder.abort();
                    return Err(e);
                }
                None => {
                    feeder.abort();
                    return Err(Error::Channel {
                        context: "result channel closed before all units completed".into(),
                    });
                }
            }
        }

        feeder.await.map_err(|e| Error::Channel {
            context: format!("dispatch task failed: {e}"),
        })?;

        let completed = coalescer.total_seen();
        if let Some(window) = coalescer.finish() {
            self.persist_window(job.id, window).await?;
        }

        if completed != total {
            return Err(Error::Generation {
                reason: format!("job {} completed {completed} of {total} units", job.id),
            });
        }

        tracing::info!(job_id = job.id, total, "job completed");
        Ok(())
    }

    /// Compresses and persists one window: batch upsert first, then
    /// the job's progress counter. The two writes are independent;
    /// a failure between them is recovered by redelivery, not by a
    /// cross-row transaction.
    async fn persist_window(&self, job_id: i64, window: Window) -> Result<()> {
        let compressed_data = compress_batch(&window.graphs)?;

        self.batches
            .upsert(NewBatch {
                job_id,
                batch_number: window.batch_number,
                compressed_data,
            })
            .await?;

        self.jobs
            .update_completed(job_id, window.completed_so_far)
            .await?;

        tracing::debug!(
            job_id,
            batch_number = window.batch_number,
            completed = window.completed_so_far,
            "persisted batch window"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testutil::{
        CountingGenerator, FlakyGenerator, MemBatchStore, MemJobStore, request, spawn_pool,
    };
    use dagbatch_core::decompress_batch;
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn orchestrator(
        pool: Arc<GenPool>,
        jobs: Arc<MemJobStore>,
        batches: Arc<MemBatchStore>,
        batch_size: usize,
    ) -> JobOrchestrator<StdRng> {
        JobOrchestrator::new(pool, jobs, batches, batch_size, StdRng::seed_from_u64(17))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ten_units_in_windows_of_three() {
        let jobs = Arc::new(MemJobStore::default());
        let batches = Arc::new(MemBatchStore::default());
        let pool = spawn_pool(4, CountingGenerator::factory());
        let mut orch = orchestrator(pool, Arc::clone(&jobs), Arc::clone(&batches), 3);

        let request = request(10);
        orch.process_job(&request).await.unwrap();

        let job = jobs.get(request.request_guid).unwrap();
        assert_eq!(job.completed_graphs, 10);
        assert_eq!(jobs.progress_updates(job.id), vec![3, 6, 9, 10]);

        let mut sizes = Vec::new();
        for number in 1..=4i64 {
            let row = batches.get(job.id, number).unwrap();
            sizes.push(decompress_batch(&row.compressed_data).unwrap().len());
        }
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        assert_eq!(batches.count_for_job(job.id), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn zero_units_succeeds_with_no_batches() {
        let jobs = Arc::new(MemJobStore::default());
        let batches = Arc::new(MemBatchStore::default());
        let pool = spawn_pool(2, CountingGenerator::factory());
        let mut orch = orchestrator(pool, Arc::clone(&jobs), Arc::clone(&batches), 3);

        let request = request(0);
        orch.process_job(&request).await.unwrap();

        let job = jobs.get(request.request_guid).unwrap();
        assert_eq!(job.completed_graphs, 0);
        assert_eq!(batches.count_for_job(job.id), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exact_multiple_has_no_partial_window() {
        let jobs = Arc::new(MemJobStore::default());
        let batches = Arc::new(MemBatchStore::default());
        let pool = spawn_pool(3, CountingGenerator::factory());
        let mut orch = orchestrator(pool, Arc::clone(&jobs), Arc::clone(&batches), 3);

        let request = request(9);
        orch.process_job(&request).await.unwrap();

        let job = jobs.get(request.request_guid).unwrap();
        assert_eq!(job.completed_graphs, 9);
        assert_eq!(batches.count_for_job(job.id), 3);
        assert_eq!(jobs.progress_updates(job.id), vec![3, 6, 9]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resubmission_resets_and_overwrites() {
        let jobs = Arc::new(MemJobStore::default());
        let batches = Arc::new(MemBatchStore::default());
        let pool = spawn_pool(2, CountingGenerator::factory());
        let mut orch = orchestrator(pool, Arc::clone(&jobs), Arc::clone(&batches), 2);

        let request = request(4);
        orch.process_job(&request).await.unwrap();
        let first = jobs.get(request.request_guid).unwrap();

        orch.process_job(&request).await.unwrap();
        let second = jobs.get(request.request_guid).unwrap();

        // Same business key, same row; no duplicate job.
        assert_eq!(jobs.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.completed_graphs, 4);
        // Still exactly two batches; the second run overwrote them.
        assert_eq!(batches.count_for_job(second.id), 2);
        // Reset was observed: progress restarted from a fresh 0.
        assert_eq!(jobs.progress_updates(second.id), vec![2, 4, 2, 4]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn generation_failure_aborts_after_prior_windows() {
        let jobs = Arc::new(MemJobStore::default());
        let batches = Arc::new(MemBatchStore::default());
        // Single worker: results arrive in dispatch order, so the
        // failure on unit 7 lands after windows 1 and 2 are persisted.
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = spawn_pool(1, FlakyGenerator::factory(Arc::clone(&calls), 7));
        let mut orch = orchestrator(pool, Arc::clone(&jobs), Arc::clone(&batches), 3);

        let mut request = request(10);
        // Pin the layer bounds so both attempts draw identical graphs.
        request.graph_settings.max_layer = request.graph_settings.min_layer;
        let err = orch.process_job(&request).await.unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));

        let job = jobs.get(request.request_guid).unwrap();
        assert_eq!(batches.count_for_job(job.id), 2);
        assert_eq!(jobs.progress_updates(job.id), vec![3, 6]);
        let first_attempt: Vec<_> = (1..=2i64)
            .map(|number| batches.get(job.id, number).unwrap())
            .collect();

        // Redelivery: the same request reprocesses from scratch and
        // completes through batch 4 this time.
        orch.process_job(&request).await.unwrap();
        let job = jobs.get(request.request_guid).unwrap();
        assert_eq!(job.completed_graphs, 10);
        assert_eq!(batches.count_for_job(job.id), 4);

        // Batches 1 and 2 were overwritten in place: same rows,
        // identical regenerated payloads.
        for prior in &first_attempt {
            let row = batches.get(job.id, prior.batch_number).unwrap();
            assert_eq!(row.id, prior.id);
            assert_eq!(row.compressed_data, prior.compressed_data);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn zero_batch_size_is_a_config_error() {
        let jobs = Arc::new(MemJobStore::default());
        let batches = Arc::new(MemBatchStore::default());
        let pool = spawn_pool(1, CountingGenerator::factory());
        let mut orch = orchestrator(pool, Arc::clone(&jobs), Arc::clone(&batches), 0);

        let err = orch.process_job(&request(5)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_sampling_bounds_fail_before_dispatch() {
        let jobs = Arc::new(MemJobStore::default());
        let batches = Arc::new(MemBatchStore::default());
        let pool = spawn_pool(2, CountingGenerator::factory());
        let mut orch = orchestrator(pool, Arc::clone(&jobs), Arc::clone(&batches), 3);

        let mut request = request(5);
        request.graph_settings.min_nodes = 99;
        request.graph_settings.max_nodes = 1;

        let err = orch.process_job(&request).await.unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
        let job = jobs.get(request.request_guid).unwrap();
        assert_eq!(batches.count_for_job(job.id), 0);
    }
}
