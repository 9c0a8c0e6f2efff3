//! Bounded generation worker pool.
//!
//! Fan-out per job is capped by the pool size: generation work is
//! dispatched round-robin to a fixed set of worker tasks, each with a
//! bounded request channel, instead of spawning one task per unit.
//!
//! ## Structure
//!
//! - [`manager`] - pool construction, dispatch, and shutdown.
//! - [`worker`] - the per-worker task loop.

pub mod manager;
pub mod worker;

use dagbatch_core::{GraphDraw, Result, TaskGraph};
use tokio::sync::{mpsc, oneshot};

/// A message processed by a pool worker.
pub enum WorkRequest {
    /// Generate one graph and send the outcome on `result_tx`.
    Generate {
        draw: GraphDraw,
        result_tx: mpsc::Sender<Result<TaskGraph>>,
    },
    /// Stop the worker and acknowledge on `response`.
    Shutdown { response: oneshot::Sender<()> },
}
