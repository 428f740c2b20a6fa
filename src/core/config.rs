//! # Conductor configuration.
//!
//! Provides [`Config`], the settings applied when a conductor is built, before any
//! service is registered.
//!
//! ## Sentinel values
//! - `start_timeout = 0s` → wait for readiness indefinitely
//! - `stop_grace = 0s` → `stop` waits for every acknowledgement without a ceiling

use std::time::Duration;

/// Configuration for a [`Conductor`](crate::Conductor).
///
/// ## Field semantics
/// - `start_timeout`: how long each service may take to fire its ready signal
/// - `stop_timeout`: deadline communicated to services in the shutdown request
/// - `stop_grace`: extra time past `stop_timeout` before `stop` gives up on stragglers;
///   also bounds the final subscriber flush
/// - `verbose`: attach the built-in [`LogWriter`](crate::LogWriter)
/// - `hook_signals`: stop the conductor on SIGINT/SIGTERM/SIGQUIT (Ctrl-C on Windows)
/// - `bus_capacity`: event bus ring buffer size (min 1)
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use conductor::Config;
///
/// let cfg = Config {
///     start_timeout: Duration::from_secs(10),
///     verbose: true,
///     ..Config::default()
/// };
/// assert_eq!(cfg.stop_ceiling(), Some(Duration::from_secs(6)));
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum wait for each service's ready signal.
    ///
    /// Exceeding it aborts startup exactly like a `run` error.
    pub start_timeout: Duration,

    /// Deadline handed to services when shutdown begins.
    pub stop_timeout: Duration,

    /// Extra wait after `stop_timeout` before `stop` reports stragglers and
    /// closes the completion signal anyway.
    pub stop_grace: Duration,

    /// Print lifecycle events to stdout.
    pub verbose: bool,

    /// Install the OS signal bridge when the conductor is built.
    pub hook_signals: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the per-service readiness wait as an `Option`.
    ///
    /// - `None` → wait indefinitely
    /// - `Some(d)` → abort startup after `d`
    #[inline]
    pub fn start_deadline(&self) -> Option<Duration> {
        if self.start_timeout == Duration::ZERO {
            None
        } else {
            Some(self.start_timeout)
        }
    }

    /// Returns the hard ceiling for collecting stop acknowledgements.
    ///
    /// - `None` → no ceiling (`stop_grace = 0`)
    /// - `Some(d)` → `stop_timeout + stop_grace`
    #[inline]
    pub fn stop_ceiling(&self) -> Option<Duration> {
        if self.stop_grace == Duration::ZERO {
            None
        } else {
            Some(self.stop_timeout.saturating_add(self.stop_grace))
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `start_timeout = 5s`
    /// - `stop_timeout = 5s`
    /// - `stop_grace = 1s`
    /// - `verbose = false`
    /// - `hook_signals = false`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            stop_grace: Duration::from_secs(1),
            verbose: false,
            hook_signals: false,
            bus_capacity: 1024,
        }
    }
}
