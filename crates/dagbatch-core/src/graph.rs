//! The task graph artifact model.
//!
//! A [`TaskGraph`] is one self-contained unit of work product: a layered
//! DAG of tasks with computation costs, processor assignments, and
//! communication costs on the edges. Batches of these are serialized
//! with the codec in [`crate::codec`] and stored compressed, so the
//! field layout here is a durable format: fields are appended, never
//! reordered or renamed.

use serde::{Deserialize, Serialize};

/// A single task in a generated graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    /// Identifier, unique within the graph, dense from 0.
    pub id: u32,
    /// The layer this task sits in, 0-based from the entry layer.
    pub layer: u32,
    /// Cost of executing the task.
    pub computation_cost: u32,
    /// Processor the task is assigned to.
    pub processor: u32,
}

/// A directed dependency between two tasks in adjacent layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEdge {
    /// Source task id.
    pub from: u32,
    /// Target task id.
    pub to: u32,
    /// Cost of moving the source's output to the target.
    pub communication_cost: u32,
}

/// One generated artifact: a layered task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGraph {
    /// Number of layers in the graph.
    pub layers: u32,
    /// All tasks, ordered by id.
    pub nodes: Vec<TaskNode>,
    /// All dependencies. Edges only point from a layer to the next.
    pub edges: Vec<TaskEdge>,
}

impl TaskGraph {
    /// Number of tasks in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of dependencies in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
