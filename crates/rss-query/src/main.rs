//! rss-query - Resource Status database query tool
//!
//! Dumps and modifies the status, log and history tables of sites,
//! resources, components and nodes.
//!
//! Flow: load registry -> validate switches -> expand name/statusType
//! lists -> open the store -> dispatch and render each request.

use anyhow::{Context, Result};
use clap::Parser;
use rss_core::{logging, ConfigRegistry, LogLevel};
use std::io;
use tracing::warn;

use rss_query::cli::{run, Cli};
use rss_query::SqliteStatusStore;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = LogLevel::from_options(&cli.options);
    logging::init(level.clone().unwrap_or_default());
    if let Err(e) = level {
        warn!("{}, using {}", e, LogLevel::default());
    }

    let registry = match &cli.config {
        Some(path) => ConfigRegistry::load_from(path),
        None => ConfigRegistry::load(),
    }
    .context("Failed to load registry configuration")?;

    let open_store =
        || SqliteStatusStore::open(cli.db.as_deref()).context("Failed to open status database");

    let stdout = io::stdout();
    let code = run(&cli, &registry, open_store, &mut stdout.lock(), &mut io::stderr())?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
