//! `techpassport` command-line entry point.

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;

use techpassport_infra::StorageConfig;
use techpassport_observability::LogFormat;

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    techpassport_observability::init(cli.log_format.unwrap_or_else(LogFormat::from_env));

    let config = StorageConfig::resolve(cli.db.as_deref())
        .context("failed to resolve database location")?;
    tracing::debug!(location = %config.location, "storage configured");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(cli.command, &config, &mut out)
}
