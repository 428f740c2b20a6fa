//! Conductor core: registration, startup, shutdown.
//!
//! The public API from this module is [`Conductor`] (with its [`ConductorBuilder`]),
//! [`Config`], [`Completion`] and [`ServiceState`].
//!
//! Internal modules:
//! - [`conductor`]: sequential startup and parallel, deadline-bounded shutdown;
//! - [`record`]: per-service bookkeeping and lifecycle state;
//! - [`builder`]: wires the event bus, subscribers and the signal bridge;
//! - [`shutdown`]: OS signal bridge calling `stop`.

mod builder;
mod conductor;
mod config;
mod record;
mod shutdown;

pub use builder::ConductorBuilder;
pub use conductor::{Completion, Conductor};
pub use config::Config;
pub use record::ServiceState;
