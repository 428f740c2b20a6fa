//! # Handshake channels lent to a service.
//!
//! Every registered service gets three one-shot channels, created at registration:
//!
//! ```text
//!            service side (ServiceContext)         conductor side (Handshake)
//! ready:     ReadySignal      ── notify() ──────►  oneshot::Receiver<()>
//! stopped:   StoppedSignal    ── notify() ──────►  oneshot::Receiver<()>
//! shutdown:  ShutdownListener ◄── ShutdownRequest  oneshot::Sender<ShutdownRequest>
//! ```
//!
//! Each end is consumed by use, so a channel can carry at most one message.
//!
//! ## Shutdown request
//! A [`ShutdownRequest`] carries the shared stop deadline. All services stopped
//! by one `stop` call observe the same deadline and the same cancellation token,
//! which is cancelled when the deadline passes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline-bearing request to shut down.
///
/// The deadline is advisory: the conductor never kills a service, it only waits
/// for the stopped signal.
#[derive(Clone, Debug)]
pub struct ShutdownRequest {
    deadline: Instant,
    token: CancellationToken,
}

impl ShutdownRequest {
    /// Creates a request expiring `timeout` from now and arms its expiry timer.
    ///
    /// Must be called inside a tokio runtime.
    pub(crate) fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
        let token = CancellationToken::new();

        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => timer.cancel(),
                _ = timer.cancelled() => {}
            }
        });
        Self { deadline, token }
    }

    /// A request whose deadline has already passed.
    pub(crate) fn expired_now() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self {
            deadline: Instant::now(),
            token,
        }
    }

    /// Releases the expiry timer; the request reads as expired afterwards.
    pub(crate) fn release(&self) {
        self.token.cancel();
    }

    /// Point in time by which the service should have stopped.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline (zero once passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Completes when the deadline passes.
    pub async fn expired(&self) {
        self.token.cancelled().await;
    }

    /// Cancellation token cancelled at the deadline, for passing into child work.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Fired by the service once it is initialized.
#[derive(Debug)]
pub struct ReadySignal(oneshot::Sender<()>);

impl ReadySignal {
    /// Reports readiness. A conductor that stopped waiting ignores it.
    pub fn notify(self) {
        let _ = self.0.send(());
    }
}

/// Fired by the service once it has finished shutting down.
#[derive(Debug)]
pub struct StoppedSignal(oneshot::Sender<()>);

impl StoppedSignal {
    /// Acknowledges shutdown.
    pub fn notify(self) {
        let _ = self.0.send(());
    }
}

/// Receives the conductor's shutdown request.
#[derive(Debug)]
pub struct ShutdownListener(oneshot::Receiver<ShutdownRequest>);

impl ShutdownListener {
    /// Waits for the shutdown request.
    ///
    /// If the conductor goes away without sending one, resolves with an
    /// already expired request so the service still terminates.
    pub async fn recv(self) -> ShutdownRequest {
        self.0.await.unwrap_or_else(|_| ShutdownRequest::expired_now())
    }
}

/// The service-side ends of a service's handshake channels.
///
/// Handed to [`Service::run`](crate::Service::run) exactly once.
#[derive(Debug)]
pub struct ServiceContext {
    name: Arc<str>,
    ready: ReadySignal,
    stopped: StoppedSignal,
    shutdown: ShutdownListener,
}

impl ServiceContext {
    /// Name the service was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Splits the context into its three channel ends.
    pub fn into_parts(self) -> (ReadySignal, StoppedSignal, ShutdownListener) {
        (self.ready, self.stopped, self.shutdown)
    }
}

/// The conductor-side ends of a service's handshake channels.
#[derive(Debug)]
pub(crate) struct Handshake {
    pub(crate) ready: oneshot::Receiver<()>,
    pub(crate) stopped: oneshot::Receiver<()>,
    pub(crate) shutdown: oneshot::Sender<ShutdownRequest>,
}

/// Creates fresh handshake channels for one service.
pub(crate) fn handshake(name: Arc<str>) -> (ServiceContext, Handshake) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stopped_tx, stopped_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let ctx = ServiceContext {
        name,
        ready: ReadySignal(ready_tx),
        stopped: StoppedSignal(stopped_tx),
        shutdown: ShutdownListener(shutdown_rx),
    };
    let ends = Handshake {
        ready: ready_rx,
        stopped: stopped_rx,
        shutdown: shutdown_tx,
    };
    (ctx, ends)
}
