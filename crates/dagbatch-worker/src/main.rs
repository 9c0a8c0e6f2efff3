//! Queue-driven batch generation worker.
//!
//! Wires the pipeline together: configuration, telemetry, Postgres
//! pool and migrations, the generation worker pool, the durable queue
//! source, and the intake loop. Shutdown is signal-driven: ctrl-c or
//! SIGTERM cancels the shared token, the intake loop finishes (or
//! abandons) the in-flight delivery, and the pool is drained with a
//! bounded wait.

mod worker;

use clap::Parser;
use dagbatch_core::LayeredGenerator;
use rand::{SeedableRng, rngs::StdRng};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use worker::config::{CliArgs, WorkerConfig};
use worker::intake::run_intake;
use worker::orchestrator::JobOrchestrator;
use worker::pool::manager::GenPool;
use worker::queue::PgJobSource;
use worker::store::{PgBatchStore, PgJobStore};
use worker::telemetry::init_telemetry;

// Using mimalloc for better performance under contention, especially
// in musl environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = WorkerConfig::try_from(args)?;

    init_telemetry(config.log_json);
    log_startup_info(&config);

    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let cancel = CancellationToken::new();

    let gen_pool = Arc::new(GenPool::spawn(
        config.num_workers,
        cancel.clone(),
        |_worker_id| LayeredGenerator::new(StdRng::from_os_rng()),
    ));

    let mut orchestrator = JobOrchestrator::new(
        Arc::clone(&gen_pool),
        Arc::new(PgJobStore::new(pool.clone())),
        Arc::new(PgBatchStore::new(pool.clone())),
        config.batch_size,
        StdRng::from_os_rng(),
    );

    let source = PgJobSource::new(pool, config.poll_interval, config.redelivery_timeout);

    let intake_cancel = cancel.clone();
    let mut intake = tokio::spawn(async move {
        run_intake(&source, &mut orchestrator, &intake_cancel).await
    });

    // An intake exit before any signal means the source or a settlement
    // failed unrecoverably; it triggers the same shutdown path so the
    // process never lingers while consuming nothing.
    let joined = tokio::select! {
        () = shutdown_signal() => {
            tracing::info!("Shutdown signal received, terminating gracefully...");
            cancel.cancel();
            // The in-flight job (if any) either finishes within the
            // timeout or is abandoned; redelivery covers the abandoned
            // case.
            match tokio::time::timeout(config.shutdown_timeout, &mut intake).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    tracing::warn!("Intake loop did not drain within the shutdown timeout");
                    intake.abort();
                    None
                }
            }
        }
        joined = &mut intake => {
            cancel.cancel();
            Some(joined)
        }
    };

    let intake_err = match joined {
        Some(Ok(Ok(()))) => {
            tracing::info!("Intake loop drained");
            None
        }
        Some(Ok(Err(e))) => {
            tracing::error!("Intake loop failed: {e}");
            Some(anyhow::Error::new(e))
        }
        Some(Err(e)) => {
            tracing::error!("Intake task panicked: {e}");
            Some(anyhow::Error::new(e))
        }
        None => None,
    };

    gen_pool.shutdown().await;
    match intake_err {
        Some(e) => Err(e),
        None => {
            tracing::info!("Worker shut down successfully");
            Ok(())
        }
    }
}

fn log_startup_info(config: &WorkerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting batch worker with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting batch worker with {} generation workers, batch size {}",
            config.num_workers,
            config.batch_size
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
