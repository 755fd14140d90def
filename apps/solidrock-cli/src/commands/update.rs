//! Update command - Re-fetch and rewrite every existing local entry

use clap::Args;

use solidrock_sync::WorkerConfig;

use super::{CollectionArg, Context, GlobalArgs};
use crate::error::CliResult;

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Collection to update
    #[arg(value_enum, default_value_t = CollectionArg::All)]
    pub collection: CollectionArg,
}

/// Execute the update command
pub async fn execute(global: &GlobalArgs, args: UpdateArgs) -> CliResult<()> {
    let ctx = Context::build(global).await?;

    for collection in args.collection.collections() {
        println!("{}", ctx.service.schedule_update(collection).await);
    }

    let report = ctx.service.worker(WorkerConfig::default()).drain().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{} entries stored", ctx.store.entry_count().await);
    Ok(())
}
