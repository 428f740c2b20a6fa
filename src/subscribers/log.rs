//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout, one line each.
//! Attached automatically when [`Config::verbose`](crate::Config::verbose) is set.
//! Missing optional fields render as `-`.
//!
//! ## Example output
//! ```text
//! [starting] service="db" position=0
//! [ready] service="db" position=0
//! [failed] service="api" position=1 err="startup failed: port in use"
//! [start-timeout] service="cache" position=2 timeout_ms=5000
//! [shutdown-requested] reason="startup failed" timeout_ms=5000
//! [stopping] service="db" position=0
//! [stopped] service="db" position=0
//! [all-stopped]
//! ```

use std::fmt::Display;

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders one event as a single log line.
    pub fn format(e: &Event) -> String {
        let service = e.service.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        let position = field(e.position);
        let timeout_ms = field(e.timeout_ms);
        match e.kind {
            EventKind::ServiceRegistered => {
                format!("[registered] service={service:?} position={position}")
            }
            EventKind::ServiceStarting => {
                format!("[starting] service={service:?} position={position}")
            }
            EventKind::ServiceReady => format!("[ready] service={service:?} position={position}"),
            EventKind::ServiceFailed => {
                format!("[failed] service={service:?} position={position} err={reason:?}")
            }
            EventKind::StartTimeout => format!(
                "[start-timeout] service={service:?} position={position} timeout_ms={timeout_ms}"
            ),
            EventKind::StartAborted => format!("[start-aborted] reason={reason:?}"),
            EventKind::StartCompleted => "[start-completed]".to_string(),
            EventKind::ShutdownRequested => {
                format!("[shutdown-requested] reason={reason:?} timeout_ms={timeout_ms}")
            }
            EventKind::SignalReceived => format!("[signal] {reason}"),
            EventKind::ServiceStopping => {
                format!("[stopping] service={service:?} position={position}")
            }
            EventKind::ServiceStopped => match e.reason.as_deref() {
                Some(why) => {
                    format!("[stopped] service={service:?} position={position} note={why:?}")
                }
                None => format!("[stopped] service={service:?} position={position}"),
            },
            EventKind::AllStopped => "[all-stopped]".to_string(),
            EventKind::StopTimeoutExceeded => {
                format!("[stop-timeout-exceeded] stuck={reason:?} timeout_ms={timeout_ms}")
            }
            EventKind::SubscriberOverflow => {
                format!("[subscriber-overflow] subscriber={service:?} reason={reason:?}")
            }
            EventKind::SubscriberPanicked => {
                format!("[subscriber-panicked] subscriber={service} info={reason}")
            }
        }
    }
}

fn field<T: Display>(v: Option<T>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::format(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_format_every_kind() {
        let cases = [
            (
                Event::new(EventKind::ServiceRegistered).with_service("db").with_position(0),
                "[registered] service=\"db\" position=0",
            ),
            (
                Event::new(EventKind::ServiceStarting).with_service("db").with_position(0),
                "[starting] service=\"db\" position=0",
            ),
            (
                Event::new(EventKind::ServiceReady).with_service("db").with_position(0),
                "[ready] service=\"db\" position=0",
            ),
            (
                Event::new(EventKind::ServiceFailed)
                    .with_service("api")
                    .with_position(1)
                    .with_reason("startup failed: port in use"),
                "[failed] service=\"api\" position=1 err=\"startup failed: port in use\"",
            ),
            (
                Event::new(EventKind::StartTimeout)
                    .with_service("cache")
                    .with_position(2)
                    .with_timeout(Duration::from_millis(250)),
                "[start-timeout] service=\"cache\" position=2 timeout_ms=250",
            ),
            (
                Event::new(EventKind::StartAborted).with_reason("startup failed"),
                "[start-aborted] reason=\"startup failed\"",
            ),
            (Event::new(EventKind::StartCompleted), "[start-completed]"),
            (
                Event::new(EventKind::ShutdownRequested)
                    .with_reason("stop requested")
                    .with_timeout(Duration::from_secs(5)),
                "[shutdown-requested] reason=\"stop requested\" timeout_ms=5000",
            ),
            (
                Event::new(EventKind::SignalReceived).with_reason("caught SIGTERM"),
                "[signal] caught SIGTERM",
            ),
            (
                Event::new(EventKind::ServiceStopping).with_service("db").with_position(0),
                "[stopping] service=\"db\" position=0",
            ),
            (
                Event::new(EventKind::ServiceStopped).with_service("db").with_position(0),
                "[stopped] service=\"db\" position=0",
            ),
            (
                Event::new(EventKind::ServiceStopped)
                    .with_service("api")
                    .with_position(1)
                    .with_reason("stopped signal dropped"),
                "[stopped] service=\"api\" position=1 note=\"stopped signal dropped\"",
            ),
            (Event::new(EventKind::AllStopped), "[all-stopped]"),
            (
                Event::new(EventKind::StopTimeoutExceeded)
                    .with_reason("db,api")
                    .with_timeout(Duration::from_millis(100)),
                "[stop-timeout-exceeded] stuck=\"db,api\" timeout_ms=100",
            ),
            (
                Event::subscriber_overflow("metrics", "full"),
                "[subscriber-overflow] subscriber=\"metrics\" reason=\"full\"",
            ),
            (
                Event::subscriber_panicked("metrics", "boom".to_string()),
                "[subscriber-panicked] subscriber=metrics info=boom",
            ),
        ];

        for (ev, want) in &cases {
            let line = LogWriter::format(ev);
            assert_eq!(&line, want);
            assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn test_format_missing_fields() {
        let ev = Event::new(EventKind::StartTimeout);
        assert_eq!(
            LogWriter::format(&ev),
            "[start-timeout] service=\"unknown\" position=- timeout_ms=-"
        );
    }
}
