//! # Per-service bookkeeping.
//!
//! A [`ServiceRecord`] is created at registration and lives as long as the conductor.
//! It owns the conductor side of the service's handshake channels and the
//! service side until it is lent to `run`.
//!
//! ## State machine
//! ```text
//! Registered ──run Ok──► Launched ──ready──► Ready ───────┐
//!     │                      │                            │ stop
//!     └─run Err──► Failed    └─timeout──► TimedOut ───────┤
//!                                                         ▼
//!                                           Stopping ──ack──► Stopped
//! ```
//! A launched service that drops its ready signal aborts startup but stays
//! `Launched`, so it still receives the shutdown request.
//! Only launched services (`Launched`, `Ready`, `TimedOut`) take part in shutdown.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::ServiceError;
use crate::services::{Handshake, ServiceContext, ServiceRef, ShutdownRequest, handshake};

/// Lifecycle state of a registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Registered, `run` not invoked yet.
    Registered,
    /// `run` returned `Ok`; readiness pending.
    Launched,
    /// Ready signal observed.
    Ready,
    /// `run` returned an error.
    Failed,
    /// Ready signal not observed within the start timeout.
    TimedOut,
    /// Shutdown request delivered; acknowledgement pending.
    Stopping,
    /// Stopped signal observed (or dropped).
    Stopped,
}

impl ServiceState {
    /// True if `run` succeeded and the service has not been asked to stop yet.
    #[inline]
    pub fn is_launched(&self) -> bool {
        matches!(
            self,
            ServiceState::Launched | ServiceState::Ready | ServiceState::TimedOut
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceState::Registered => "registered",
            ServiceState::Launched => "launched",
            ServiceState::Ready => "ready",
            ServiceState::Failed => "failed",
            ServiceState::TimedOut => "timed_out",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
        }
    }
}

pub(crate) struct ServiceRecord {
    pub(crate) name: Arc<str>,
    pub(crate) state: ServiceState,
    service: ServiceRef,
    context: Option<ServiceContext>,
    ready: Option<oneshot::Receiver<()>>,
    stopped: Option<oneshot::Receiver<()>>,
    shutdown: Option<oneshot::Sender<ShutdownRequest>>,
}

impl ServiceRecord {
    /// Creates a record with fresh handshake channels.
    pub(crate) fn new(name: Arc<str>, service: ServiceRef) -> Self {
        let (context, Handshake { ready, stopped, shutdown }) = handshake(Arc::clone(&name));
        Self {
            name,
            state: ServiceState::Registered,
            service,
            context: Some(context),
            ready: Some(ready),
            stopped: Some(stopped),
            shutdown: Some(shutdown),
        }
    }

    /// Invokes `run` and hands back the ready receiver on success.
    pub(crate) fn launch(&mut self) -> Result<oneshot::Receiver<()>, ServiceError> {
        let (Some(ctx), Some(ready)) = (self.context.take(), self.ready.take()) else {
            self.state = ServiceState::Failed;
            return Err(ServiceError::failed("service was already launched"));
        };
        match self.service.run(ctx) {
            Ok(()) => {
                self.state = ServiceState::Launched;
                Ok(ready)
            }
            Err(e) => {
                self.state = ServiceState::Failed;
                Err(e)
            }
        }
    }

    /// Delivers the shutdown request to a launched service.
    ///
    /// Returns the stopped receiver to wait on, or `None` if the service never
    /// launched (nobody listens on its channels).
    pub(crate) fn begin_stop(
        &mut self,
        request: &ShutdownRequest,
    ) -> Option<oneshot::Receiver<()>> {
        if !self.state.is_launched() {
            return None;
        }
        let shutdown = self.shutdown.take()?;
        let stopped = self.stopped.take()?;

        // A listener the service already dropped shows up as a dropped stopped signal.
        let _ = shutdown.send(request.clone());
        self.state = ServiceState::Stopping;
        Some(stopped)
    }
}
