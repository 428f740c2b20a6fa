//! # Conductor events and the broadcast bus that carries them.
//!
//! - [`Event`] / [`EventKind`] describe what happened during startup and shutdown;
//! - [`Bus`] broadcasts events to the subscriber listener and raw receivers.

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
