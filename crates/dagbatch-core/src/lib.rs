//! # dagbatch-core
//!
//! Shared domain types for the dagbatch system: the task graph artifact
//! model, the generation parameter bundle and its sampling rules, the
//! batch codec (canonical JSON + gzip), the job request wire type, and
//! the unified error enum.
//!
//! Anything that reads a persisted batch payload depends on this crate
//! only; the worker binary layers queueing, orchestration, and storage
//! on top of it.

mod codec;
mod error;
mod generate;
mod graph;
mod params;
mod request;

pub use codec::{compress_batch, decompress_batch};
pub use error::{Error, Result};
pub use generate::{GraphGenerator, LayeredGenerator};
pub use graph::{TaskEdge, TaskGraph, TaskNode};
pub use params::{GraphDraw, GraphSettings};
pub use request::JobRequest;
