use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    conductor::Conductor,
    shutdown::{SignalListener, spawn_bridge},
};
use crate::{
    core::Config,
    error::ConductorError,
    events::{Bus, EventKind},
    subscribers::{LogWriter, Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Conductor`] with optional features.
pub struct ConductorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ConductorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with bounded queues.
    /// [`LogWriter`] is appended automatically when `verbose` is set.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the conductor.
    ///
    /// Must be called inside a tokio runtime. This initializes:
    /// - the event bus and the subscriber workers
    /// - the listener forwarding bus events to subscribers
    /// - the signal bridge, if `hook_signals` is set
    ///
    /// Fails only if signal handlers cannot be installed.
    pub fn build(self) -> Result<Arc<Conductor>, ConductorError> {
        let signals = if self.cfg.hook_signals {
            Some(SignalListener::install()?)
        } else {
            None
        };

        let subscribers = with_builtin(self.subscribers, &self.cfg);
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let closed = CancellationToken::new();
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let listener = subscriber_listener(&bus, subs, closed.clone());

        let conductor = Arc::new(Conductor::new_internal(
            self.cfg,
            bus.clone(),
            listener,
            closed.clone(),
        ));

        if let Some(signals) = signals {
            spawn_bridge(
                Arc::downgrade(&conductor),
                signals,
                conductor.completion_token(),
                closed,
                bus,
            );
        }
        Ok(conductor)
    }
}

/// Appends the built-in subscribers enabled by `cfg`.
fn with_builtin(mut subscribers: Vec<Arc<dyn Subscribe>>, cfg: &Config) -> Vec<Arc<dyn Subscribe>> {
    if cfg.verbose {
        subscribers.push(Arc::new(LogWriter::new()));
    }
    subscribers
}

/// Forwards bus events to the subscriber set until the shutdown path finishes.
///
/// Exits after forwarding a terminal event (`AllStopped`, `StopTimeoutExceeded`)
/// and drains every subscriber queue before returning, or immediately once the
/// conductor is dropped.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, closed: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        if set.is_empty() {
            return;
        }
        loop {
            let ev = tokio::select! {
                _ = closed.cancelled() => return,
                res = rx.recv() => match res {
                    Ok(ev) => ev,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            };
            set.emit(&ev);
            if matches!(ev.kind, EventKind::AllStopped | EventKind::StopTimeoutExceeded) {
                break;
            }
        }
        set.shutdown().await;
    })
}
