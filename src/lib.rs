//! # conductor
//!
//! **Conductor** starts a registered sequence of long-running, in-process services
//! in order, waits for each to report readiness, and later shuts all of them down
//! together within a deadline, collecting a stopped acknowledgement from each one.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Service #1  │   │  Service #2  │   │  Service #3  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!   ready/stopped/shutdown channels (one-shot, one set per service)
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Conductor                                                        │
//! │  - ServiceRecords (registration order, lifecycle state)           │
//! │  - start(): sequential handshake, start_timeout per service       │
//! │  - stop():  parallel handshake, shared deadline, JoinSet countdown│
//! │  - Completion (closed exactly once)                               │
//! └──────┬─────────────────────────────────────────────┬──────────────┘
//!        │ publish(Event)                              │ stop()
//!        ▼                                             │
//!   Bus (broadcast) ──► SubscriberSet ──► LogWriter    signal bridge
//!                                    └──► custom        (SIGINT/SIGTERM/SIGQUIT)
//! ```
//!
//! ### Lifecycle
//! ```text
//! service(name, svc) ... ──► start()
//!   for each service, in order:
//!     ├─► run(ctx)          Err ─► shutdown, abort
//!     └─► wait ready        timeout/dropped ─► shutdown, abort
//!
//! stop() / startup failure / signal
//!   ├─► ShutdownRequest { deadline = now + stop_timeout } to every launched service
//!   ├─► collect stopped acknowledgements (ceiling: stop_timeout + stop_grace)
//!   └─► close Completion
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Services**      | Contract every managed unit implements.                      | [`Service`], [`ServiceFn`], [`ServiceRef`] |
//! | **Handshake**     | One-shot ready/stopped/shutdown channels.                    | [`ServiceContext`], [`ShutdownRequest`]   |
//! | **Orchestration** | Ordered startup, acknowledged shutdown.                      | [`Conductor`], [`Completion`]             |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics).               | [`Subscribe`], [`LogWriter`]              |
//! | **Errors**        | Typed errors for misuse and service startup.                 | [`ConductorError`], [`ServiceError`]      |
//! | **Configuration** | Timeouts, verbosity, signal hook.                            | [`Config`]                                |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use conductor::{Conductor, Config, ServiceContext, ServiceFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         start_timeout: Duration::from_secs(2),
//!         ..Config::default()
//!     };
//!     let conductor = Conductor::new(cfg)?;
//!
//!     conductor.service(
//!         "ticker",
//!         ServiceFn::arc(|ctx: ServiceContext| {
//!             let (ready, stopped, shutdown) = ctx.into_parts();
//!             tokio::spawn(async move {
//!                 ready.notify();
//!                 let _req = shutdown.recv().await;
//!                 stopped.notify();
//!             });
//!             Ok(())
//!         }),
//!     );
//!
//!     let completion = conductor.start().await;
//!     conductor.stop().await;
//!     completion.wait().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod services;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Completion, Conductor, ConductorBuilder, Config, ServiceState};
pub use error::{ConductorError, ServiceError};
pub use events::{Event, EventKind};
pub use services::{
    ReadySignal, Service, ServiceContext, ServiceFn, ServiceRef, ShutdownListener,
    ShutdownRequest, StoppedSignal,
};
pub use subscribers::{LogWriter, Subscribe};
