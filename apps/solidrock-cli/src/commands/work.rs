//! Work command - Run the worker and periodic syncs until interrupted

use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use solidrock_connector::types::Collection;
use solidrock_sync::{SyncError, WorkQueue, WorkerConfig};

use super::{Context, GlobalArgs};
use crate::error::{CliError, CliResult};

/// Arguments for the work command
#[derive(Args, Debug)]
pub struct WorkArgs {
    /// Seconds between sync runs of every collection
    #[arg(long, env = "SOLIDROCK_SYNC_INTERVAL_SECS", default_value_t = 3600)]
    pub interval_secs: u64,

    /// Milliseconds between queue polls
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Seconds between releases of work items that outran their budget
    #[arg(long, default_value_t = 60)]
    pub stale_release_interval_secs: u64,
}

/// Execute the work command
pub async fn execute(global: &GlobalArgs, args: WorkArgs) -> CliResult<()> {
    if args.interval_secs == 0 || args.poll_interval_ms == 0 || args.stale_release_interval_secs == 0 {
        return Err(CliError::Config(
            "intervals must be greater than zero".to_string(),
        ));
    }

    let ctx = Context::build(global).await?;
    let worker = Arc::new(ctx.service.worker(WorkerConfig {
        poll_interval_ms: args.poll_interval_ms,
        stale_release_interval_secs: args.stale_release_interval_secs,
    }));

    let worker_task = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };

    let mut sync_interval = interval(Duration::from_secs(args.interval_secs));
    info!(interval_secs = args.interval_secs, "Scheduler started");

    loop {
        tokio::select! {
            _ = sync_interval.tick() => {
                for collection in Collection::ALL {
                    ctx.service.sync_now(collection).await;
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    worker.shutdown();
    if let Err(e) = worker_task.await {
        error!(error = %e, "Worker task ended abnormally");
    }

    let pending = ctx.queue.len().await.map_err(SyncError::from)?;
    info!(pending = pending, "Stopped; in-memory work not yet executed is dropped");
    Ok(())
}
