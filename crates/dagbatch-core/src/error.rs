//! Error types for the batch generation pipeline.
//!
//! This module defines the central `Error` enum, which captures every
//! failure class the worker distinguishes. The intake loop maps all of
//! them to the same recovery path (leave the message unacknowledged so
//! the queue redelivers it), except for decode failures, which mark the
//! message itself as poison, and configuration errors, which abort
//! startup.
//!
//! ## Error Cases
//! - `Decode`: a queue message body could not be parsed into a job
//!   request.
//! - `Generation`: a unit failed to produce a task graph.
//! - `Codec`: batch serialization or compression failed.
//! - `Store`: a job or batch row could not be persisted.
//! - `Channel`: an internal channel between tasks closed unexpectedly.
//! - `InvalidConfig`: the worker was started with unusable settings.
//! - `Shutdown`: work was refused or abandoned because the worker is
//!   shutting down.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the batch generation pipeline.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The message body was not a valid job request.
    #[error("Failed to decode job request: {reason}")]
    Decode { reason: String },

    /// A generation unit failed to produce a task graph.
    #[error("Graph generation failed: {reason}")]
    Generation { reason: String },

    /// Batch serialization or (de)compression failed.
    #[error("Batch codec error: {context}")]
    Codec { context: String },

    /// A persistence call against the job or batch store failed.
    #[error("Store error: {context}")]
    Store { context: String },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    Channel { context: String },

    /// The worker configuration is unusable (e.g., batch size of 0).
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The worker is in the process of shutting down.
    #[error("Worker is shutting down")]
    Shutdown,
}
