//! Worker configuration.
//!
//! [`CliArgs`] is the raw clap surface (flags with environment
//! fallbacks, loaded after `dotenvy`); [`WorkerConfig`] is the
//! validated form the rest of the worker consumes. Validation failures
//! are configuration errors and abort startup; they are never retried
//! at runtime.

use dagbatch_core::{Error, Result};
use std::time::Duration;

/// Command-line arguments, with environment variable fallbacks.
#[derive(clap::Parser, Debug)]
#[command(name = "dagbatch-worker", about = "Queue-driven task graph batch worker")]
pub struct CliArgs {
    /// Postgres connection string for the queue and stores.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Number of completed graphs per persisted batch.
    #[arg(long, env = "BATCH_SIZE", default_value_t = 50)]
    pub batch_size: usize,

    /// Generation worker tasks. 0 means one per logical CPU.
    #[arg(long, env = "NUM_WORKERS", default_value_t = 0)]
    pub num_workers: usize,

    /// Queue poll interval when no message is ready, in milliseconds.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 250)]
    pub poll_interval_ms: u64,

    /// Seconds before an unsettled claim becomes redeliverable.
    #[arg(long, env = "REDELIVERY_TIMEOUT_SECS", default_value_t = 300)]
    pub redelivery_timeout_secs: u64,

    /// Bound on the graceful drain of the in-flight job at shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    pub shutdown_timeout_secs: u64,

    /// Emit logs as JSON lines instead of human-readable output.
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

/// Validated worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub batch_size: usize,
    pub num_workers: usize,
    pub poll_interval: Duration,
    pub redelivery_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub log_json: bool,
}

impl TryFrom<CliArgs> for WorkerConfig {
    type Error = Error;

    fn try_from(args: CliArgs) -> Result<Self> {
        if args.batch_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "batch size must be at least 1".into(),
            });
        }
        if args.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig {
                reason: "poll interval must be non-zero".into(),
            });
        }
        if args.redelivery_timeout_secs == 0 {
            return Err(Error::InvalidConfig {
                reason: "redelivery timeout must be non-zero".into(),
            });
        }

        let num_workers = if args.num_workers == 0 {
            num_cpus::get()
        } else {
            args.num_workers
        };

        Ok(Self {
            database_url: args.database_url,
            batch_size: args.batch_size,
            num_workers,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            redelivery_timeout: Duration::from_secs(args.redelivery_timeout_secs),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
            log_json: args.log_json,
        })
    }
}
