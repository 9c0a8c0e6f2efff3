//! Generation parameters and sampling.
//!
//! [`GraphSettings`] mirrors the parameter bundle carried by the queue
//! message: inclusive `[min, max]` bounds for the structural and cost
//! dimensions of a generated graph. [`GraphSettings::sample`] turns the
//! bounds into one concrete [`GraphDraw`] using an explicit randomness
//! source, so callers control determinism (tests seed an `StdRng`; the
//! worker uses an OS-seeded one).

use crate::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive bounds controlling unit generation, as carried on the wire.
///
/// Field names keep the original producer-side JSON casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSettings {
    #[serde(rename = "MinLayer")]
    pub min_layer: u32,
    #[serde(rename = "MaxLayer")]
    pub max_layer: u32,
    #[serde(rename = "MinNodes")]
    pub min_nodes: u32,
    #[serde(rename = "MaxNodes")]
    pub max_nodes: u32,
    #[serde(rename = "MinComm")]
    pub min_comm: u32,
    #[serde(rename = "MaxComm")]
    pub max_comm: u32,
    #[serde(rename = "MinComp")]
    pub min_comp: u32,
    #[serde(rename = "MaxComp")]
    pub max_comp: u32,
    #[serde(rename = "MinProcessors")]
    pub min_processors: u32,
    #[serde(rename = "MaxProcessors")]
    pub max_processors: u32,
}

/// One concrete parameter draw for a single generation unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphDraw {
    /// Number of layers in the graph.
    pub layers: u32,
    /// Number of tasks in the graph.
    pub nodes: u32,
    /// Probability of an edge between tasks in adjacent layers, in
    /// `[0.01, 1.00]`, rounded to two decimal places.
    pub edge_probability: f64,
}

impl GraphSettings {
    /// Draws one set of generation inputs from the bounds.
    ///
    /// Layer and node counts are uniform over their inclusive bounds.
    /// The edge probability is uniform over `[0.01, 1.00]` and rounded
    /// to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] when any `min` bound exceeds its
    /// `max` bound.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GraphDraw> {
        let layers = sample_inclusive(rng, self.min_layer, self.max_layer, "layer count")?;
        let nodes = sample_inclusive(rng, self.min_nodes, self.max_nodes, "node count")?;
        let edge_probability = round_2dp(rng.random_range(0.01..=1.0));
        Ok(GraphDraw {
            layers,
            nodes,
            edge_probability,
        })
    }
}

fn sample_inclusive<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32, what: &str) -> Result<u32> {
    if min > max {
        return Err(Error::Generation {
            reason: format!("invalid {what} bounds: min {min} > max {max}"),
        });
    }
    Ok(rng.random_range(min..=max))
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
