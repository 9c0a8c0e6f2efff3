//! The unit generation capability.
//!
//! The worker treats graph generation as a consumed capability: one
//! call per unit, taking a concrete [`GraphDraw`] and returning one
//! [`TaskGraph`]. [`GraphGenerator`] is the seam; tests substitute
//! deterministic or failing implementations, and the worker pool gives
//! each worker task its own generator instance so no randomness state
//! is shared.
//!
//! [`LayeredGenerator`] is the default implementation: a layered DAG
//! where edges only connect adjacent layers, every non-entry task has
//! at least one predecessor, and costs are drawn from the generator's
//! own cost ranges.

use crate::{Error, GraphDraw, Result, TaskEdge, TaskGraph, TaskNode};
use rand::Rng;

/// Produces one task graph per generation unit.
///
/// Implementations may be arbitrarily expensive; calls run on pool
/// worker tasks, never on the intake loop.
pub trait GraphGenerator: Send {
    /// Generates one graph from a concrete parameter draw.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] when the draw cannot produce a
    /// well-formed graph. The enclosing job attempt treats this as
    /// fatal.
    fn generate(&mut self, draw: &GraphDraw) -> Result<TaskGraph>;
}

/// Default generator: a connected, layered DAG.
///
/// Structure comes from the draw (layer count, node count, edge
/// probability); computation cost, communication cost, and processor
/// assignment are drawn from fixed internal ranges, matching the
/// behavior of the upstream generation library this capability stands
/// in for.
pub struct LayeredGenerator<R: Rng> {
    rng: R,
}

const COMP_COST: core::ops::RangeInclusive<u32> = 1..=20;
const COMM_COST: core::ops::RangeInclusive<u32> = 1..=10;
const PROCESSORS: core::ops::RangeInclusive<u32> = 1..=4;

impl<R: Rng> LayeredGenerator<R> {
    /// Creates a generator owning its randomness source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> GraphGenerator for LayeredGenerator<R> {
    fn generate(&mut self, draw: &GraphDraw) -> Result<TaskGraph> {
        if draw.layers == 0 {
            return Err(Error::Generation {
                reason: "graph must have at least one layer".into(),
            });
        }
        if draw.nodes < draw.layers {
            return Err(Error::Generation {
                reason: format!(
                    "cannot place {} nodes across {} layers",
                    draw.nodes, draw.layers
                ),
            });
        }
        if !(0.0..=1.0).contains(&draw.edge_probability) {
            return Err(Error::Generation {
                reason: format!("edge probability {} out of range", draw.edge_probability),
            });
        }

        // Spread nodes across layers; the first `remainder` layers take
        // one extra so every layer is non-empty.
        let per_layer = draw.nodes / draw.layers;
        let remainder = draw.nodes % draw.layers;

        let mut nodes = Vec::with_capacity(draw.nodes as usize);
        let mut layer_members: Vec<Vec<u32>> = Vec::with_capacity(draw.layers as usize);
        let mut next_id = 0u32;
        for layer in 0..draw.layers {
            let count = per_layer + u32::from(layer < remainder);
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                nodes.push(TaskNode {
                    id: next_id,
                    layer,
                    computation_cost: self.rng.random_range(COMP_COST),
                    processor: self.rng.random_range(PROCESSORS),
                });
                members.push(next_id);
                next_id += 1;
            }
            layer_members.push(members);
        }

        let mut edges = Vec::new();
        for window in layer_members.windows(2) {
            let (upper, lower) = (&window[0], &window[1]);
            for &to in lower {
                let mut connected = false;
                for &from in upper {
                    if self.rng.random_range(0.0..1.0) < draw.edge_probability {
                        edges.push(TaskEdge {
                            from,
                            to,
                            communication_cost: self.rng.random_range(COMM_COST),
                        });
                        connected = true;
                    }
                }
                // Keep the graph connected layer-to-layer: every
                // non-entry task needs at least one predecessor.
                if !connected {
                    let from = upper[self.rng.random_range(0..upper.len())];
                    edges.push(TaskEdge {
                        from,
                        to,
                        communication_cost: self.rng.random_range(COMM_COST),
                    });
                }
            }
        }

        Ok(TaskGraph {
            layers: draw.layers,
            nodes,
            edges,
        })
    }
}
