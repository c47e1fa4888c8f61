//! CLI argument definitions for remscope.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "remscope")]
#[command(about = "Structure discovery for a running process", version)]
pub struct Args {
    /// Path to config file (key = value lines)
    #[arg(short, long, global = true, value_name = "FILE", env = "REMSCOPE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Attach, discover every offset and print the table
    Discover {
        /// Process name (default: from config)
        #[arg(long)]
        process: Option<String>,
        /// Process ID (skip lookup by name)
        #[arg(long)]
        pid: Option<i32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Also write the table to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },
    /// List loaded modules and the plausible heap range
    Modules {
        #[arg(long)]
        process: Option<String>,
        #[arg(long)]
        pid: Option<i32>,
    },
    /// Dump the reflection registry of one scope
    Schema {
        /// Scope (library) name, e.g. libclient.so
        #[arg(long)]
        scope: String,
        /// Print the fields of this class only
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        process: Option<String>,
        #[arg(long)]
        pid: Option<i32>,
    },
    /// Print every match of a byte pattern in a module
    Scan {
        /// Module file name, e.g. libclient.so
        #[arg(long)]
        module: String,
        /// Byte pattern (hex, use ? or ?? for wildcard)
        #[arg(long)]
        pattern: String,
        #[arg(long)]
        process: Option<String>,
        #[arg(long)]
        pid: Option<i32>,
    },
    /// Keep a connection open and poll the local controller
    Watch {
        /// Poll interval in milliseconds (default: from config)
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long)]
        process: Option<String>,
        #[arg(long)]
        pid: Option<i32>,
    },
}
