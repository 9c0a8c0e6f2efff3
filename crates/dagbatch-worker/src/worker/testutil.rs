//! In-memory fakes and fixtures shared by the worker's test modules.

use crate::worker::pool::manager::GenPool;
use crate::worker::queue::{Delivery, DeliveryHandle, JobSource};
use crate::worker::store::{BatchRow, BatchStore, JobRow, JobStore, NewBatch, NewJob};
use async_trait::async_trait;
use chrono::Utc;
use dagbatch_core::{
    Error, GraphDraw, GraphGenerator, GraphSettings, JobRequest, Result, TaskGraph,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A request with fresh guids and bounds every draw can satisfy.
pub fn request(graph_count: u32) -> JobRequest {
    JobRequest {
        request_guid: Uuid::new_v4(),
        user_guid: Uuid::new_v4(),
        graph_count,
        include_cp: false,
        graph_settings: GraphSettings {
            min_layer: 2,
            max_layer: 3,
            min_nodes: 6,
            max_nodes: 12,
            min_comm: 1,
            max_comm: 5,
            min_comp: 1,
            max_comp: 9,
            min_processors: 1,
            max_processors: 4,
        },
    }
}

/// Spawns a pool with its own cancellation token.
pub fn spawn_pool<G, F>(workers: usize, factory: F) -> Arc<GenPool>
where
    G: GraphGenerator + 'static,
    F: Fn(usize) -> G,
{
    Arc::new(GenPool::spawn(workers, CancellationToken::new(), factory))
}

/// Generator producing a minimal graph per call, never failing.
pub struct CountingGenerator;

impl CountingGenerator {
    pub fn factory() -> impl Fn(usize) -> Self {
        |_| Self
    }
}

impl GraphGenerator for CountingGenerator {
    fn generate(&mut self, draw: &GraphDraw) -> Result<TaskGraph> {
        Ok(TaskGraph {
            layers: draw.layers,
            nodes: Vec::new(),
            edges: Vec::new(),
        })
    }
}

/// Generator that fails exactly once, on the `fail_on`-th call across
/// all pool workers, and succeeds otherwise.
pub struct FlakyGenerator {
    calls: Arc<AtomicUsize>,
    fail_on: usize,
}

impl FlakyGenerator {
    pub fn factory(calls: Arc<AtomicUsize>, fail_on: usize) -> impl Fn(usize) -> Self {
        move |_| Self {
            calls: Arc::clone(&calls),
            fail_on,
        }
    }
}

impl GraphGenerator for FlakyGenerator {
    fn generate(&mut self, draw: &GraphDraw) -> Result<TaskGraph> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(Error::Generation {
                reason: format!("injected failure on unit {call}"),
            });
        }
        Ok(TaskGraph {
            layers: draw.layers,
            nodes: Vec::new(),
            edges: Vec::new(),
        })
    }
}

/// In-memory [`JobStore`] recording every progress update.
///
/// The reset path leaves old batch rows to the key-level overwrite;
/// tests never shrink a job's total between submissions.
#[derive(Default)]
pub struct MemJobStore {
    inner: Mutex<MemJobs>,
}

#[derive(Default)]
struct MemJobs {
    rows: HashMap<Uuid, JobRow>,
    updates: Vec<(i64, i64)>,
    next_id: i64,
}

impl MemJobStore {
    pub fn get(&self, request_guid: Uuid) -> Option<JobRow> {
        self.inner.lock().unwrap().rows.get(&request_guid).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    /// Completed-count values in the order they were persisted.
    pub fn progress_updates(&self, job_id: i64) -> Vec<i64> {
        self.inner
            .lock()
            .unwrap()
            .updates
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, completed)| *completed)
            .collect()
    }
}

#[async_trait]
impl JobStore for MemJobStore {
    async fn upsert_by_request_id(&self, job: NewJob) -> Result<JobRow> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(row) = inner.rows.get_mut(&job.request_guid) {
            row.completed_graphs = 0;
            row.total_graphs = job.total_graphs;
            return Ok(row.clone());
        }

        inner.next_id += 1;
        let row = JobRow {
            id: inner.next_id,
            request_guid: job.request_guid,
            user_guid: job.user_guid,
            total_graphs: job.total_graphs,
            completed_graphs: 0,
            created_at: Utc::now(),
        };
        inner.rows.insert(job.request_guid, row.clone());
        Ok(row)
    }

    async fn update_completed(&self, job_id: i64, completed: i64) -> Result<JobRow> {
        let mut inner = self.inner.lock().unwrap();
        inner.updates.push((job_id, completed));
        let row = inner
            .rows
            .values_mut()
            .find(|row| row.id == job_id)
            .ok_or_else(|| Error::Store {
                context: format!("job {job_id} not found"),
            })?;
        row.completed_graphs = completed;
        Ok(row.clone())
    }
}

/// In-memory [`BatchStore`] keyed like the real table.
#[derive(Default)]
pub struct MemBatchStore {
    inner: Mutex<MemBatches>,
}

#[derive(Default)]
struct MemBatches {
    rows: HashMap<(i64, i64), BatchRow>,
    next_id: i64,
}

impl MemBatchStore {
    pub fn get(&self, job_id: i64, batch_number: i64) -> Option<BatchRow> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .get(&(job_id, batch_number))
            .cloned()
    }

    pub fn count_for_job(&self, job_id: i64) -> usize {
        self.inner
            .lock()
            .unwrap()
            .rows
            .keys()
            .filter(|(id, _)| *id == job_id)
            .count()
    }
}

#[async_trait]
impl BatchStore for MemBatchStore {
    async fn upsert(&self, batch: NewBatch) -> Result<BatchRow> {
        let mut inner = self.inner.lock().unwrap();
        let key = (batch.job_id, batch.batch_number);
        if let Some(row) = inner.rows.get_mut(&key) {
            row.compressed_data = batch.compressed_data;
            return Ok(row.clone());
        }

        inner.next_id += 1;
        let row = BatchRow {
            id: inner.next_id,
            job_id: batch.job_id,
            batch_number: batch.batch_number,
            compressed_data: batch.compressed_data,
            created_at: Utc::now(),
        };
        inner.rows.insert(key, row.clone());
        Ok(row)
    }
}

/// In-memory [`JobSource`]: finite queue, rejected messages go to the
/// back for redelivery unless [`MemorySource::drop_rejected`] was
/// called.
pub struct MemorySource {
    state: Arc<MemoryState>,
}

struct MemoryState {
    queue: Mutex<VecDeque<(i64, Vec<u8>)>>,
    acked: AtomicUsize,
    rejected: AtomicUsize,
    drop_rejected: AtomicBool,
}

impl MemorySource {
    pub fn new(bodies: Vec<Vec<u8>>) -> Self {
        let queue = bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| (i as i64 + 1, body))
            .collect();
        Self {
            state: Arc::new(MemoryState {
                queue: Mutex::new(queue),
                acked: AtomicUsize::new(0),
                rejected: AtomicUsize::new(0),
                drop_rejected: AtomicBool::new(false),
            }),
        }
    }

    pub fn acked(&self) -> usize {
        self.state.acked.load(Ordering::SeqCst)
    }

    pub fn rejected(&self) -> usize {
        self.state.rejected.load(Ordering::SeqCst)
    }

    /// Discard rejected messages instead of requeueing them.
    pub fn drop_rejected(&self) {
        self.state.drop_rejected.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobSource for MemorySource {
    async fn recv(&self, cancel: &CancellationToken) -> Result<Option<Delivery>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let next = self.state.queue.lock().unwrap().pop_front();
        Ok(next.map(|(id, body)| {
            let handle = MemoryHandle {
                state: Arc::clone(&self.state),
                id,
                body: body.clone(),
            };
            Delivery::new(body, id, Box::new(handle))
        }))
    }
}

struct MemoryHandle {
    state: Arc<MemoryState>,
    id: i64,
    body: Vec<u8>,
}

#[async_trait]
impl DeliveryHandle for MemoryHandle {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.state.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reject(self: Box<Self>) -> Result<()> {
        self.state.rejected.fetch_add(1, Ordering::SeqCst);
        if !self.state.drop_rejected.load(Ordering::SeqCst) {
            self.state
                .queue
                .lock()
                .unwrap()
                .push_back((self.id, self.body));
        }
        Ok(())
    }
}
