//! # Signal bridge: OS termination signals to `Conductor::stop`.
//!
//! [`SignalListener`] registers the process signal handlers; [`spawn_bridge`]
//! runs a task that calls `stop` once when a signal arrives, and exits quietly
//! if the conductor finishes shutting down (or is dropped) first.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::sync::Weak;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::conductor::Conductor;
use crate::events::{Bus, Event, EventKind};

/// Registered termination signal streams.
#[cfg(unix)]
pub(crate) struct SignalListener {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    /// Registers the handlers. Must be called inside a tokio runtime.
    pub(crate) fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next termination signal and returns its name.
    pub(crate) async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv()  => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigquit.recv() => "SIGQUIT",
        }
    }
}

/// Registered termination signal streams.
#[cfg(not(unix))]
pub(crate) struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    /// Ctrl-C registers lazily; nothing can fail here.
    pub(crate) fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    /// Waits for Ctrl-C. If the handler cannot be registered, never resolves.
    pub(crate) async fn recv(&mut self) -> &'static str {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

/// Spawns the bridge task.
///
/// - signal first: publish `SignalReceived`, then `stop` the conductor (if still alive);
/// - `completion` or `closed` first: exit without touching the conductor.
pub(crate) fn spawn_bridge(
    conductor: Weak<Conductor>,
    mut signals: SignalListener,
    completion: CancellationToken,
    closed: CancellationToken,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            name = signals.recv() => {
                bus.publish(Event::new(EventKind::SignalReceived).with_reason(format!("caught {name}")));
                if let Some(conductor) = conductor.upgrade() {
                    conductor.shutdown(format!("signal {name}")).await;
                }
            }
            _ = completion.cancelled() => {}
            _ = closed.cancelled() => {}
        }
    })
}
