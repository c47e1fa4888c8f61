//! Watch command implementation.
//!
//! Keeps one connection open, rebuilding a small snapshot of the local
//! controller every poll interval. When the target exits the loop waits for
//! it to come back and discovers again.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use remscope_core::error::Error;
use remscope_core::session::ConnectionContext;
use remscope_core::{
    Config, ConnectionManager, NamedProcessProvider, PidProcessProvider, ProcessProvider,
    ReadMemory, RemoteAddress, RemoteMemory,
};
use tracing::{debug, info, warn};

use crate::shutdown::ShutdownSignal;

/// What one poll reads from the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub controller: RemoteAddress,
    pub name: String,
    pub ping: u32,
}

impl ControllerSnapshot {
    fn read(ctx: &ConnectionContext<RemoteMemory>) -> Self {
        let offsets = ctx.offsets();
        let controller = ctx
            .memory()
            .read_pointer(RemoteAddress::new(offsets.direct.local_player));
        if controller.is_null() {
            return Self {
                controller,
                name: String::new(),
                ping: 0,
            };
        }

        Self {
            controller,
            name: ctx.memory().read_cstring(controller + offsets.controller.name),
            ping: ctx.field(controller, offsets.controller.ping),
        }
    }
}

pub fn run(
    config: &Config,
    interval_ms: Option<u64>,
    process: Option<&str>,
    pid: Option<i32>,
) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let interval = interval_ms
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.poll_interval());

    match pid {
        Some(pid) => {
            let provider = PidProcessProvider::new(pid).access(config.access());
            watch(provider, config, interval, &shutdown)
        }
        None => {
            let name = process.unwrap_or(&config.process_name);
            let provider = NamedProcessProvider::new(name).access(config.access());
            watch(provider, config, interval, &shutdown)
        }
    }
}

fn watch<P>(provider: P, config: &Config, interval: Duration, shutdown: &ShutdownSignal) -> Result<()>
where
    P: ProcessProvider<Process = RemoteMemory>,
{
    let manager: ConnectionManager<P, ControllerSnapshot> = ConnectionManager::new(provider);
    println!("Waiting for target... (Press Ctrl+C to quit)");

    let mut last: Option<ControllerSnapshot> = None;
    while !shutdown.is_shutdown() {
        if !manager.is_connected() {
            match manager.connect() {
                Ok(context) => println!("Connected to PID {}", context.pid()),
                Err(Error::ProcessNotFound(name)) => debug!("Target not running: {}", name),
                Err(e) => warn!("Connect failed: {}", e),
            }
            if !manager.is_connected() {
                if shutdown.wait(config.reconnect_interval()) {
                    break;
                }
                continue;
            }
        }

        match manager.update(ControllerSnapshot::read) {
            Ok(snapshot) => {
                if last.as_ref() != Some(&*snapshot) {
                    print_snapshot(&snapshot);
                    last = Some((*snapshot).clone());
                }
            }
            Err(Error::ProcessLost(pid)) => {
                println!("Process {} exited, waiting for it to return...", pid);
                last = None;
            }
            Err(e) => warn!("Update failed: {}", e),
        }

        if shutdown.wait(interval) {
            break;
        }
    }

    manager.disconnect();
    println!("Shutdown complete.");
    Ok(())
}

fn print_snapshot(snapshot: &ControllerSnapshot) {
    if snapshot.controller.is_null() {
        println!("No local controller");
    } else {
        println!(
            "Controller {} name {:?} ping {}",
            snapshot.controller, snapshot.name, snapshot.ping
        );
    }
}
