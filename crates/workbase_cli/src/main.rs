//! CLI probe for a workbase database.
//!
//! # Responsibility
//! - Open the database configured through `WORKBASE_*` variables.
//! - Print the number of active documents per registered entity.

use log::info;
use std::process::ExitCode;
use workbase_core::repo::filter::Filter;
use workbase_core::service::reference::active;
use workbase_core::{init_logging_from_config, CoreConfig, Workbase};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("workbase: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;

    println!("workbase_core ping={}", workbase_core::ping());
    println!("workbase_core version={}", workbase_core::core_version());

    let workbase = Workbase::open(&config.db)?;
    let repo = workbase.repository();
    for descriptor in workbase.registry().descriptors() {
        let count = repo.count(descriptor.collection, &active(&Filter::new()))?;
        println!("{} active={count}", descriptor.name);
    }
    info!("event=cli_probe module=cli status=ok");
    Ok(())
}
