//! Sync command - Reconcile remote records into local entries

use clap::Args;
use tracing::error;

use solidrock_sync::service::sync_status;
use solidrock_sync::WorkerConfig;

use super::{CollectionArg, Context, GlobalArgs};
use crate::error::CliResult;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Collection to sync
    #[arg(value_enum, default_value_t = CollectionArg::All)]
    pub collection: CollectionArg,

    /// Compute and print the plan without executing any work
    #[arg(long)]
    pub plan_only: bool,
}

/// Execute the sync command
pub async fn execute(global: &GlobalArgs, args: SyncArgs) -> CliResult<()> {
    let ctx = Context::build(global).await?;
    let mut first_error = None;

    for collection in args.collection.collections() {
        println!("{}", sync_status(collection));

        match ctx.service.try_sync(collection).await {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(e) => {
                error!(collection = %collection, error = %e, "Sync run did not complete");
                first_error.get_or_insert(e);
            }
        }
    }

    if !args.plan_only {
        let report = ctx.service.worker(WorkerConfig::default()).drain().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);

        let dead = ctx.queue.dead_letters().await;
        for work in &dead {
            eprintln!(
                "Gave up on \"{}\" after {} attempts: {}",
                work.item.description(),
                work.attempts,
                work.last_error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
