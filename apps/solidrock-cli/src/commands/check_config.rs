//! Check-config command - Validate settings without touching the network

use clap::Args;
use serde_json::json;

use solidrock_connector::types::Collection;
use solidrock_sync::{Settings, SyncOptions};

use crate::error::{CliError, CliResult};

/// Arguments for the check-config command
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn mask(value: &str) -> &'static str {
    if value.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}

fn show<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "(not set)".to_string(), |v| v.to_string())
}

/// Execute the check-config command
pub fn execute(args: CheckConfigArgs) -> CliResult<()> {
    let settings = Settings::from_env()?;
    let options = SyncOptions::from_env()?;
    let validation = settings.validate();

    if args.json {
        let report = json!({
            "valid": validation.is_ok(),
            "error": validation.as_ref().err().map(ToString::to_string),
            "api_url": settings.api_url,
            "api_key": mask(&settings.api_key),
            "api_username": settings.api_username,
            "api_password": mask(&settings.api_password),
            "churches_section_id": settings.churches_section_id,
            "churches_entry_type_id": settings.churches_entry_type_id,
            "jobs_section_id": settings.jobs_section_id,
            "jobs_entry_type_id": settings.jobs_entry_type_id,
            "jobs_category_group_id": settings.jobs_category_group_id,
            "churches_policy": options.policy_for(Collection::Churches),
            "jobs_policy": options.policy_for(Collection::Jobs),
            "time_budget_secs": options.time_budget_secs,
            "update_all_limit": options.update_all_limit,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("API URL:                 {}", settings.api_url);
        println!("API key:                 {}", mask(&settings.api_key));
        println!("API username:            {}", settings.api_username);
        println!("API password:            {}", mask(&settings.api_password));
        println!("Churches section:        {}", show(settings.churches_section_id));
        println!("Churches entry type:     {}", show(settings.churches_entry_type_id));
        println!("Jobs section:            {}", show(settings.jobs_section_id));
        println!("Jobs entry type:         {}", show(settings.jobs_entry_type_id));
        println!("Jobs category group:     {}", show(settings.jobs_category_group_id));
        println!("Churches update policy:  {}", options.policy_for(Collection::Churches));
        println!("Jobs update policy:      {}", options.policy_for(Collection::Jobs));
        println!("Work time budget:        {}s", options.time_budget_secs);
        println!("Update-all limit:        {}", options.update_all_limit);
    }

    match validation {
        Ok(()) => {
            if !args.json {
                println!("\nConfiguration OK");
            }
            Ok(())
        }
        Err(e) => Err(CliError::from(e)),
    }
}
