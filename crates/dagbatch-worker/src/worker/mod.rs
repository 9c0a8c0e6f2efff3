//! Worker internals: the job-processing pipeline and its collaborators.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration and validation.
//! - [`telemetry`] - tracing subscriber setup.
//! - [`queue`] - the durable queue delivery contract and its Postgres
//!   implementation.
//! - [`store`] - job and batch persistence.
//! - [`pool`] - the bounded generation worker pool.
//! - [`coalescer`] - window accumulation and batch numbering.
//! - [`orchestrator`] - one job's lifecycle, intake to completion.
//! - [`intake`] - the one-delivery-at-a-time consume/ack loop.

pub mod coalescer;
pub mod config;
pub mod intake;
pub mod orchestrator;
pub mod pool;
pub mod queue;
pub mod store;
pub mod telemetry;

#[cfg(test)]
pub mod testutil;
