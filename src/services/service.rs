//! # Service abstraction.
//!
//! A [`Service`] is a long-running unit managed by the conductor through three
//! one-shot channels (see [`ServiceContext`]). The common handle type is
//! [`ServiceRef`], an `Arc<dyn Service>`.

use std::sync::Arc;

use crate::error::ServiceError;
use crate::services::ServiceContext;

/// # Unit of work with a startup/shutdown handshake.
///
/// `run` is a **kickoff**, not the work itself: it must return quickly, usually
/// after spawning the service's background task. Returning an error aborts
/// startup of the whole conductor.
///
/// After a successful `run` the service must:
/// 1. fire the ready signal once initialized;
/// 2. wait for the shutdown request, clean up, and fire the stopped signal
///    before the request's deadline.
///
/// A service that never fires its stopped signal holds `stop` until the stop
/// ceiling elapses.
///
/// `run` is called while the conductor holds its registry lock: it must not call
/// back into the same conductor synchronously (spawned tasks may).
///
/// # Example
/// ```
/// use conductor::{Service, ServiceContext, ServiceError};
///
/// struct Ticker;
///
/// impl Service for Ticker {
///     fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError> {
///         let (ready, stopped, shutdown) = ctx.into_parts();
///         tokio::spawn(async move {
///             ready.notify();
///             let req = shutdown.recv().await;
///             // flush buffers before req.deadline() ...
///             let _ = req;
///             stopped.notify();
///         });
///         Ok(())
///     }
/// }
/// ```
pub trait Service: Send + Sync + 'static {
    /// Starts the service without blocking.
    fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError>;
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;
