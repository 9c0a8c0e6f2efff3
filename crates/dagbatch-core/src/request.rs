//! The job request wire type.

use crate::GraphSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One inbound job request, as decoded from a queue message body.
///
/// Field names keep the producer-side JSON casing; the producer is an
/// existing system and the wire contract is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Business key of the job. Redelivery of the same id resets and
    /// reprocesses the existing job rather than creating a second one.
    #[serde(rename = "RequestGuid")]
    pub request_guid: Uuid,
    /// Submitting user.
    #[serde(rename = "UserGuid")]
    pub user_guid: Uuid,
    /// Total number of graphs to generate for this job.
    #[serde(rename = "GraphCount")]
    pub graph_count: u32,
    /// Carried on the wire but unused by the pipeline.
    #[serde(rename = "IncludeCP")]
    pub include_cp: bool,
    /// Bounds for unit generation.
    #[serde(rename = "GraphSettings")]
    pub graph_settings: GraphSettings,
}
