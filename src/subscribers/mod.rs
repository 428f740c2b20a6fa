//! # Event subscribers for the conductor.
//!
//! This module provides the [`Subscribe`] trait and the built-in [`LogWriter`]
//! for handling events broadcast through the conductor's bus.
//!
//! ## Architecture
//! ```text
//! Conductor ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet::emit(&Event)
//!                                                                   ┌─────────┼─────────┐
//!                                                                   ▼         ▼         ▼
//!                                                              LogWriter   Metrics    Custom
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscribe::Subscribe;
