mod cli;
mod cli_utils;
mod commands;
mod shutdown;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("remscope=info,remscope_core=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = cli_utils::load_config(args.config.as_deref())?;

    match args.command {
        Command::Discover {
            process,
            pid,
            json,
            output,
        } => commands::discover::run(&config, process.as_deref(), pid, json, output.as_deref()),
        Command::Modules { process, pid } => {
            commands::modules::run(&config, process.as_deref(), pid)
        }
        Command::Schema {
            scope,
            class,
            process,
            pid,
        } => commands::schema::run(&config, &scope, class.as_deref(), process.as_deref(), pid),
        Command::Scan {
            module,
            pattern,
            process,
            pid,
        } => commands::scan::run(&config, &module, &pattern, process.as_deref(), pid),
        Command::Watch {
            interval_ms,
            process,
            pid,
        } => commands::watch::run(&config, interval_ms, process.as_deref(), pid),
    }
}
