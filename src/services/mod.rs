//! # Service contract and handshake channels.
//!
//! This module provides the service-related types:
//! - [`Service`] - trait every managed unit implements
//! - [`ServiceFn`] - closure-backed implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`ServiceContext`] - the ready/stopped/shutdown channel ends lent to `run`
//! - [`ShutdownRequest`] - deadline delivered on shutdown

mod context;
mod service;
mod service_fn;

pub(crate) use context::{Handshake, handshake};
pub use context::{ReadySignal, ServiceContext, ShutdownListener, ShutdownRequest, StoppedSignal};
pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
