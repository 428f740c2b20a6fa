//! # Function-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `F: Fn(ServiceContext) -> Result<(), ServiceError>`.
//! The closure plays the role of [`Service::run`]: spawn the work, return.
//!
//! ## Example
//! ```rust
//! use conductor::{ServiceContext, ServiceError, ServiceFn, ServiceRef};
//!
//! let svc: ServiceRef = ServiceFn::arc(|ctx: ServiceContext| {
//!     let (ready, stopped, shutdown) = ctx.into_parts();
//!     tokio::spawn(async move {
//!         ready.notify();
//!         shutdown.recv().await;
//!         stopped.notify();
//!     });
//!     Ok::<_, ServiceError>(())
//! });
//! # let _ = svc;
//! ```

use std::sync::Arc;

use crate::error::ServiceError;
use crate::services::{Service, ServiceContext};

/// Function-backed service implementation.
#[derive(Debug)]
pub struct ServiceFn<F> {
    f: F,
}

impl<F> ServiceFn<F>
where
    F: Fn(ServiceContext) -> Result<(), ServiceError> + Send + Sync + 'static,
{
    /// Creates a new function-backed service.
    ///
    /// Prefer [`ServiceFn::arc`] when you immediately need a [`ServiceRef`](crate::ServiceRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> Service for ServiceFn<F>
where
    F: Fn(ServiceContext) -> Result<(), ServiceError> + Send + Sync + 'static,
{
    fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError> {
        (self.f)(ctx)
    }
}
