//! Sub-commands and the shared wiring they run on.

pub mod check_config;
pub mod sync;
pub mod update;
pub mod work;

use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

use solidrock_connector::types::Collection;
use solidrock_connector_rest::{RestConfig, RestRemoteSource};
use solidrock_sync::{MemoryQueue, MemoryStore, Settings, SolidrockSync, SyncOptions};

use crate::error::CliResult;

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// JSON snapshot file backing the local store
    #[arg(
        long,
        env = "SOLIDROCK_STORE",
        default_value = "solidrock-store.json",
        global = true
    )]
    pub store: PathBuf,

    /// Accept invalid TLS certificates from the remote API
    #[arg(long, env = "SOLIDROCK_ACCEPT_INVALID_CERTS", global = true)]
    pub accept_invalid_certs: bool,

    /// Attempts before a failing work item is given up
    #[arg(long, default_value_t = 3, global = true)]
    pub max_attempts: u32,
}

/// Collection selector.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionArg {
    Churches,
    Jobs,
    All,
}

impl CollectionArg {
    /// Collections selected, in sync order.
    #[must_use]
    pub fn collections(self) -> Vec<Collection> {
        match self {
            CollectionArg::Churches => vec![Collection::Churches],
            CollectionArg::Jobs => vec![Collection::Jobs],
            CollectionArg::All => Collection::ALL.to_vec(),
        }
    }
}

/// Service wired to the REST source, the snapshot store and a memory queue.
pub struct Context {
    pub service: SolidrockSync,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
}

impl Context {
    /// Load settings from the environment and build the service.
    ///
    /// Fails before any network call when a setting is missing.
    pub async fn build(global: &GlobalArgs) -> CliResult<Self> {
        let settings = Settings::from_env()?;
        if let Err(e) = settings.validate() {
            error!(error = %e, "Sync settings are incomplete");
            return Err(e.into());
        }
        let options = SyncOptions::from_env()?;

        let rest = RestConfig::new(settings.api_url.clone(), settings.api_key.clone())
            .with_basic_auth(settings.api_username.clone(), settings.api_password.clone())
            .with_accept_invalid_certs(global.accept_invalid_certs);
        let remote = Arc::new(RestRemoteSource::new(rest)?);

        let store = Arc::new(MemoryStore::open(&global.store).await?);
        let queue = Arc::new(MemoryQueue::with_max_attempts(global.max_attempts));

        let service =
            SolidrockSync::with_options(settings, options, remote, store.clone(), queue.clone());

        Ok(Self {
            service,
            store,
            queue,
        })
    }
}
