use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::offset::{self, DiscoveryError, OffsetTable};
use crate::process::{ProcessProvider, RemoteProcess};
use crate::session::ConnectionContext;

/// Discovery step run on every new attachment.
pub type Discover<M> = fn(&M) -> std::result::Result<OffsetTable, DiscoveryError>;

struct State<M, S> {
    context: Option<Arc<ConnectionContext<M>>>,
    snapshot: Option<Arc<S>>,
}

/// Owns the current connection and the latest snapshot built from it.
///
/// `connect`, `update` and `disconnect` are serialized by the writer lock.
/// The state lock is only held to read or swap the published `Arc`s, so
/// readers never wait on attach, discovery or a snapshot build.
pub struct ConnectionManager<P: ProcessProvider, S> {
    provider: P,
    discover: Discover<P::Process>,
    writer: Mutex<()>,
    state: Mutex<State<P::Process, S>>,
}

impl<P: ProcessProvider, S> ConnectionManager<P, S> {
    /// Manager that runs the standard discovery on connect.
    pub fn new(provider: P) -> Self {
        Self::with_discovery(provider, offset::discover::<P::Process>)
    }

    pub fn with_discovery(provider: P, discover: Discover<P::Process>) -> Self {
        Self {
            provider,
            discover,
            writer: Mutex::new(()),
            state: Mutex::new(State {
                context: None,
                snapshot: None,
            }),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn lock(&self) -> MutexGuard<'_, State<P::Process, S>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attach, discover and publish a fresh context.
    ///
    /// Any previous connection is dropped first. On failure nothing is
    /// published.
    pub fn connect(&self) -> Result<Arc<ConnectionContext<P::Process>>> {
        let _writer = self.lock_writer();
        {
            let mut state = self.lock();
            state.context = None;
            state.snapshot = None;
        }

        let process = self.provider.attach()?;
        debug!("Attached to pid {}, discovering offsets", process.pid());
        let offsets = (self.discover)(&process)?;

        let context = Arc::new(ConnectionContext::new(process, offsets));
        info!("Connected to pid {}", context.pid());
        self.lock().context = Some(Arc::clone(&context));
        Ok(context)
    }

    /// Build and publish a new snapshot from the current context.
    ///
    /// Tears the connection down and returns [`Error::ProcessLost`] once the
    /// process has exited. The snapshot is only published while the context
    /// it was built from is still the installed one.
    pub fn update<F>(&self, build: F) -> Result<Arc<S>>
    where
        F: FnOnce(&ConnectionContext<P::Process>) -> S,
    {
        let _writer = self.lock_writer();
        let context = self.lock().context.clone().ok_or(Error::NotConnected)?;

        if !context.memory().is_valid() {
            warn!("Process {} is gone, dropping connection", context.pid());
            let mut state = self.lock();
            if is_current(&state.context, &context) {
                state.context = None;
                state.snapshot = None;
            }
            return Err(Error::ProcessLost(context.pid()));
        }

        let snapshot = Arc::new(build(&context));

        let mut state = self.lock();
        if !is_current(&state.context, &context) {
            debug!("Connection to pid {} replaced during update", context.pid());
            return Err(Error::NotConnected);
        }
        state.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn disconnect(&self) {
        let _writer = self.lock_writer();
        let mut state = self.lock();
        if let Some(context) = state.context.take() {
            info!("Disconnected from pid {}", context.pid());
        }
        state.snapshot = None;
    }

    pub fn context(&self) -> Option<Arc<ConnectionContext<P::Process>>> {
        self.lock().context.clone()
    }

    pub fn snapshot(&self) -> Option<Arc<S>> {
        self.lock().snapshot.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().context.is_some()
    }
}

fn is_current<M>(
    installed: &Option<Arc<ConnectionContext<M>>>,
    context: &Arc<ConnectionContext<M>>,
) -> bool {
    installed
        .as_ref()
        .is_some_and(|current| Arc::ptr_eq(current, context))
}
