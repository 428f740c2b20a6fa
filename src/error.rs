//! Error types used by the conductor and by managed services.
//!
//! This module defines two enums:
//!
//! - [`ConductorError`] — misuse of the conductor itself (late registration, signal hook failure).
//! - [`ServiceError`] — errors returned by [`Service::run`](crate::Service::run) to abort startup.
//!
//! Both types provide `as_label` for logs.

use thiserror::Error;

/// # Errors produced by the conductor.
///
/// Registration after start is a programming error: [`Conductor::service`](crate::Conductor::service)
/// panics with this error's message, [`Conductor::try_service`](crate::Conductor::try_service) returns it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConductorError {
    /// A service was registered after `start` was called.
    #[error("cannot register service {name:?} after the conductor has started")]
    AlreadyStarted {
        /// Name of the rejected service.
        name: String,
    },

    /// OS signal listeners could not be installed.
    #[error("failed to install signal hook: {0}")]
    SignalHook(#[from] std::io::Error),
}

impl ConductorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use conductor::ConductorError;
    ///
    /// let err = ConductorError::AlreadyStarted { name: "db".into() };
    /// assert_eq!(err.as_label(), "conductor_already_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConductorError::AlreadyStarted { .. } => "conductor_already_started",
            ConductorError::SignalHook(_) => "conductor_signal_hook",
        }
    }
}

/// # Errors returned by a service while starting.
///
/// Any error returned from `run` aborts startup of the whole conductor. The
/// display text becomes the reason of the `ServiceFailed` event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Startup failed (bad input, unreachable dependency, ...).
    #[error("startup failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        ServiceError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use conductor::ServiceError;
    ///
    /// assert_eq!(ServiceError::failed("boom").as_label(), "service_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Failed { .. } => "service_failed",
        }
    }
}
