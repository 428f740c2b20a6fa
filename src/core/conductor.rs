//! # Conductor: ordered startup and acknowledged shutdown.
//!
//! The [`Conductor`] owns the ordered list of service records, the event bus and
//! the completion signal.
//!
//! ## Startup (sequential)
//! ```text
//! start()
//!   for each record, in registration order:
//!     ├─ stop already requested?  ──► StartAborted, wait for completion
//!     ├─ publish ServiceStarting, service.run(ctx)
//!     │     └─ Err ──► ServiceFailed ──► shutdown("startup failed") ──► return
//!     └─ select! {
//!          ready fired      ──► Ready + ServiceReady, next service
//!                               (stop took the record over? ──► StartAborted, wait)
//!          ready dropped    ──► ServiceFailed ──► shutdown ──► return (service stays launched)
//!          start_timeout    ──► StartTimeout  ──► shutdown ──► return
//!          stop requested   ──► StartAborted, wait for completion ──► return
//!        }
//!   publish StartCompleted (unless a stop is under way)
//! ```
//!
//! ## Shutdown (parallel)
//! ```text
//! shutdown(reason)
//!   ├─ second caller? ──► wait for completion, return
//!   ├─ ShutdownRequest { deadline = now + stop_timeout }
//!   ├─ deliver to every launched service (Launched | Ready | TimedOut)
//!   ├─ JoinSet: one waiter per stopped signal
//!   ├─ drain, bounded by stop_timeout + stop_grace (if grace > 0)
//!   │     ├─ all acknowledged ──► AllStopped
//!   │     └─ ceiling elapsed  ──► StopTimeoutExceeded { stuck }
//!   ├─ close completion (exactly once)
//!   └─ flush subscribers (bounded by stop_grace if grace > 0)
//! ```
//!
//! The record list sits behind a `std::sync::Mutex` held only for short, non-awaiting
//! sections. Launching a service and marking the conductor as stopping both happen
//! under it, so a concurrent `stop` either sees a service as launched or prevents it
//! from launching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::builder::ConductorBuilder;
use crate::core::config::Config;
use crate::core::record::{ServiceRecord, ServiceState};
use crate::error::ConductorError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{ServiceRef, ShutdownRequest};

/// Handle to the conductor-wide completion signal.
///
/// The signal closes exactly once, after the shutdown path has finished.
#[derive(Clone, Debug)]
pub struct Completion {
    token: CancellationToken,
}

impl Completion {
    /// Waits until shutdown processing has finished.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// True once shutdown processing has finished.
    pub fn is_complete(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Outcome of waiting for one service's ready signal.
enum Readiness {
    Ready,
    Dropped,
    TimedOut(Duration),
    Interrupted,
}

struct Inner {
    stopping: bool,
    records: Vec<ServiceRecord>,
}

/// Starts registered services in order and shuts them down together.
pub struct Conductor {
    cfg: Config,
    bus: Bus,
    started: AtomicBool,
    inner: Mutex<Inner>,
    /// Cancelled when the shutdown path is entered; interrupts a pending readiness wait.
    stop_requested: CancellationToken,
    /// Closed exactly once, when shutdown processing is done.
    completion: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
    _closed: DropGuard,
}

impl Conductor {
    /// Returns a builder for a conductor with the given configuration.
    pub fn builder(cfg: Config) -> ConductorBuilder {
        ConductorBuilder::new(cfg)
    }

    /// Builds a conductor without extra subscribers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(cfg: Config) -> Result<Arc<Self>, ConductorError> {
        ConductorBuilder::new(cfg).build()
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        listener: JoinHandle<()>,
        closed: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            started: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                stopping: false,
                records: Vec::new(),
            }),
            stop_requested: CancellationToken::new(),
            completion: CancellationToken::new(),
            listener: Mutex::new(Some(listener)),
            _closed: closed.drop_guard(),
        }
    }

    /// Configuration this conductor was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Appends a service to the startup order.
    ///
    /// # Panics
    /// If called after [`start`](Self::start) has begun. Registration after start
    /// is a programming error; use [`try_service`](Self::try_service) to get a `Result`.
    pub fn service(&self, name: impl Into<Arc<str>>, svc: ServiceRef) {
        if let Err(e) = self.try_service(name, svc) {
            panic!("{e}");
        }
    }

    /// Appends a service to the startup order, or reports late registration.
    pub fn try_service(
        &self,
        name: impl Into<Arc<str>>,
        svc: ServiceRef,
    ) -> Result<(), ConductorError> {
        let name = name.into();
        // Checked before locking: `run` executes under the lock.
        if self.started.load(Ordering::SeqCst) {
            return Err(ConductorError::AlreadyStarted {
                name: name.to_string(),
            });
        }

        let mut inner = self.lock();
        if self.started.load(Ordering::SeqCst) {
            return Err(ConductorError::AlreadyStarted {
                name: name.to_string(),
            });
        }
        let position = inner.records.len();
        inner
            .records
            .push(ServiceRecord::new(Arc::clone(&name), svc));
        self.bus.publish(
            Event::new(EventKind::ServiceRegistered)
                .with_service(name)
                .with_position(position),
        );
        Ok(())
    }

    /// Starts every registered service, one at a time, in registration order.
    ///
    /// Returns once all services are ready, or once startup was aborted and the
    /// resulting shutdown has completed. The returned [`Completion`] closes when
    /// shutdown processing is done; await it to keep the process alive.
    ///
    /// Calling `start` again does not restart anything.
    pub async fn start(&self) -> Completion {
        let first = {
            let _inner = self.lock();
            !self.started.swap(true, Ordering::SeqCst)
        };
        if first {
            self.run_startup().await;
        }
        self.completion()
    }

    /// Shuts every launched service down and closes the completion signal.
    ///
    /// Safe to call any number of times, concurrently: the first call drives the
    /// shutdown, every call returns once the completion signal is closed.
    pub async fn stop(&self) {
        self.shutdown("stop requested").await;
    }

    /// Handle to the completion signal.
    pub fn completion(&self) -> Completion {
        Completion {
            token: self.completion.clone(),
        }
    }

    pub(crate) fn completion_token(&self) -> CancellationToken {
        self.completion.clone()
    }

    /// Names and states of all registered services, in registration order.
    pub fn snapshot(&self) -> Vec<(Arc<str>, ServiceState)> {
        self.lock()
            .records
            .iter()
            .map(|r| (Arc::clone(&r.name), r.state))
            .collect()
    }

    /// Raw receiver of conductor events, including everything published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_startup(&self) {
        let count = self.lock().records.len();

        for position in 0..count {
            let launched = {
                let mut inner = self.lock();
                if inner.stopping {
                    None
                } else {
                    let record = &mut inner.records[position];
                    self.bus.publish(
                        Event::new(EventKind::ServiceStarting)
                            .with_service(Arc::clone(&record.name))
                            .with_position(position),
                    );
                    Some((Arc::clone(&record.name), record.launch()))
                }
            };

            let (name, ready) = match launched {
                None => return self.abandon_startup("shutdown requested").await,
                Some((name, Err(e))) => {
                    self.bus.publish(
                        Event::new(EventKind::ServiceFailed)
                            .with_service(name)
                            .with_position(position)
                            .with_reason(e.to_string()),
                    );
                    return self.fail_startup("startup failed").await;
                }
                Some((name, Ok(ready))) => (name, ready),
            };

            match self.await_ready(ready).await {
                Readiness::Ready => {
                    let ev = Event::new(EventKind::ServiceReady)
                        .with_service(name)
                        .with_position(position);
                    if !self.promote(position, ServiceState::Ready, ev) {
                        return self.abandon_startup("shutdown requested").await;
                    }
                }
                Readiness::Dropped => {
                    // Still launched: whatever `run` spawned gets the shutdown request.
                    self.bus.publish(
                        Event::new(EventKind::ServiceFailed)
                            .with_service(name)
                            .with_position(position)
                            .with_reason("ready signal dropped"),
                    );
                    return self.fail_startup("startup failed").await;
                }
                Readiness::TimedOut(timeout) => {
                    let ev = Event::new(EventKind::StartTimeout)
                        .with_service(name)
                        .with_position(position)
                        .with_timeout(timeout);
                    if !self.promote(position, ServiceState::TimedOut, ev) {
                        return self.abandon_startup("shutdown requested").await;
                    }
                    return self.fail_startup("startup timed out").await;
                }
                Readiness::Interrupted => {
                    return self.abandon_startup("shutdown requested").await;
                }
            }
        }

        let inner = self.lock();
        if !inner.stopping {
            self.bus.publish(Event::new(EventKind::StartCompleted));
        }
        drop(inner);
    }

    /// Races the ready signal against the start timeout and a concurrent stop.
    async fn await_ready(&self, ready: oneshot::Receiver<()>) -> Readiness {
        let deadline = self.cfg.start_deadline();
        let timer = async {
            match deadline {
                Some(d) => {
                    tokio::time::sleep(d).await;
                    d
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            res = ready => match res {
                Ok(()) => Readiness::Ready,
                Err(_) => Readiness::Dropped,
            },
            _ = self.stop_requested.cancelled() => Readiness::Interrupted,
            d = timer => Readiness::TimedOut(d),
        }
    }

    async fn fail_startup(&self, reason: &str) {
        self.bus
            .publish(Event::new(EventKind::StartAborted).with_reason(reason));
        self.shutdown(reason).await;
    }

    async fn abandon_startup(&self, reason: &str) {
        self.bus
            .publish(Event::new(EventKind::StartAborted).with_reason(reason));
        self.completion.cancelled().await;
    }

    /// Moves a `Launched` record to `state` and publishes `event`, both under the lock.
    ///
    /// Returns false if a concurrent stop already took the record over.
    fn promote(&self, position: usize, state: ServiceState, event: Event) -> bool {
        let mut inner = self.lock();
        match inner.records.get_mut(position) {
            Some(record) if record.state == ServiceState::Launched => {
                record.state = state;
                self.bus.publish(event);
                true
            }
            _ => false,
        }
    }

    /// The shutdown path shared by `stop`, startup failures and the signal bridge.
    pub(crate) async fn shutdown(&self, reason: impl Into<Arc<str>>) {
        let delivered = {
            let mut inner = self.lock();
            if inner.stopping {
                None
            } else {
                inner.stopping = true;
                self.stop_requested.cancel();
                self.bus.publish(
                    Event::new(EventKind::ShutdownRequested)
                        .with_reason(reason)
                        .with_timeout(self.cfg.stop_timeout),
                );

                let request = ShutdownRequest::with_timeout(self.cfg.stop_timeout);
                let mut targets = Vec::new();
                for (position, record) in inner.records.iter_mut().enumerate() {
                    if let Some(stopped) = record.begin_stop(&request) {
                        self.bus.publish(
                            Event::new(EventKind::ServiceStopping)
                                .with_service(Arc::clone(&record.name))
                                .with_position(position),
                        );
                        targets.push((position, stopped));
                    }
                }
                Some((request, targets))
            }
        };

        let Some((request, targets)) = delivered else {
            self.completion.cancelled().await;
            return;
        };

        let mut waiters = JoinSet::new();
        for (position, stopped) in targets {
            waiters.spawn(async move { (position, stopped.await.is_ok()) });
        }

        let drain = async {
            while let Some(joined) = waiters.join_next().await {
                if let Ok((position, acknowledged)) = joined {
                    self.mark_stopped(position, acknowledged);
                }
            }
        };
        let finished = match self.cfg.stop_ceiling() {
            Some(ceiling) => tokio::time::timeout(ceiling, drain).await.is_ok(),
            None => {
                drain.await;
                true
            }
        };
        request.release();

        if finished {
            self.bus.publish(Event::new(EventKind::AllStopped));
        } else {
            let stuck: Vec<String> = self
                .lock()
                .records
                .iter()
                .filter(|r| r.state == ServiceState::Stopping)
                .map(|r| r.name.to_string())
                .collect();
            let ceiling = self.cfg.stop_ceiling().unwrap_or(self.cfg.stop_timeout);
            self.bus.publish(
                Event::new(EventKind::StopTimeoutExceeded)
                    .with_reason(stuck.join(","))
                    .with_timeout(ceiling),
            );
        }

        self.completion.cancel();
        self.flush_subscribers().await;
    }

    fn mark_stopped(&self, position: usize, acknowledged: bool) {
        let name = {
            let mut inner = self.lock();
            let Some(record) = inner.records.get_mut(position) else {
                return;
            };
            record.state = ServiceState::Stopped;
            Arc::clone(&record.name)
        };
        let mut ev = Event::new(EventKind::ServiceStopped)
            .with_service(name)
            .with_position(position);
        if !acknowledged {
            ev = ev.with_reason("stopped signal dropped");
        }
        self.bus.publish(ev);
    }

    /// Waits for the subscriber listener to deliver the terminal event and drain.
    ///
    /// Bounded by `stop_grace` when the stop ceiling is enabled; a subscriber stuck
    /// past that is left behind.
    async fn flush_subscribers(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = listener else {
            return;
        };
        match self.cfg.stop_ceiling() {
            Some(_) => {
                let _ = tokio::time::timeout(self.cfg.stop_grace, handle).await;
            }
            None => {
                let _ = handle.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::ServiceError;
    use crate::services::{ServiceContext, ServiceFn};
    use crate::subscribers::Subscribe;

    /// Ordered log of what services observed.
    #[derive(Default)]
    struct Journal(StdMutex<Vec<String>>);

    impl Journal {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.entries().iter().filter(|e| e.starts_with(prefix)).count()
        }
    }

    /// Becomes ready after `ready_after`, acknowledges shutdown after `stop_after`.
    /// A shutdown request arriving before readiness is honored too.
    fn service(
        name: &'static str,
        journal: &Arc<Journal>,
        ready_after: Duration,
        stop_after: Duration,
    ) -> ServiceRef {
        let journal = Arc::clone(journal);
        ServiceFn::arc(move |ctx: ServiceContext| {
            journal.push(format!("run:{name}"));
            let (ready, stopped, shutdown) = ctx.into_parts();
            let journal = Arc::clone(&journal);
            tokio::spawn(async move {
                let mut shutdown = std::pin::pin!(shutdown.recv());
                let early = tokio::select! {
                    _ = tokio::time::sleep(ready_after) => None,
                    req = &mut shutdown => Some(req),
                };
                let req = match early {
                    Some(req) => req,
                    None => {
                        journal.push(format!("ready:{name}"));
                        ready.notify();
                        shutdown.await
                    }
                };
                assert!(!req.is_expired());
                journal.push(format!("shutdown:{name}"));
                tokio::time::sleep(stop_after).await;
                journal.push(format!("stopped:{name}"));
                stopped.notify();
            });
            Ok(())
        })
    }

    fn quick(name: &'static str, journal: &Arc<Journal>) -> ServiceRef {
        service(name, journal, Duration::ZERO, Duration::ZERO)
    }

    /// Fails in `run`, after checking whether a shutdown request ever arrives.
    fn failing(
        name: &'static str,
        journal: &Arc<Journal>,
        got_request: mpsc::UnboundedSender<bool>,
    ) -> ServiceRef {
        let journal = Arc::clone(journal);
        ServiceFn::arc(move |ctx: ServiceContext| {
            journal.push(format!("run:{name}"));
            let (_ready, _stopped, shutdown) = ctx.into_parts();
            let got_request = got_request.clone();
            tokio::spawn(async move {
                let res = tokio::time::timeout(Duration::from_millis(150), shutdown.recv()).await;
                let _ = got_request.send(res.is_ok());
            });
            Err(ServiceError::failed("port in use"))
        })
    }

    fn config(start_timeout: Duration) -> Config {
        Config {
            start_timeout,
            stop_timeout: Duration::from_millis(200),
            stop_grace: Duration::from_millis(200),
            ..Config::default()
        }
    }

    #[derive(Default)]
    struct Collect(StdMutex<Vec<Event>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.clone());
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    impl Collect {
        fn kinds(&self) -> Vec<EventKind> {
            self.0.lock().unwrap().iter().map(|e| e.kind).collect()
        }

        fn find(&self, kind: EventKind) -> Option<Event> {
            self.0.lock().unwrap().iter().find(|e| e.kind == kind).cloned()
        }
    }

    #[tokio::test]
    async fn test_starts_all_in_order_and_waits_for_stop() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(config(Duration::from_secs(1))).unwrap();
        for name in ["a", "b", "c", "d"] {
            conductor.service(name, quick(name, &journal));
        }

        let completion = conductor.start().await;
        assert!(!completion.is_complete());
        assert_eq!(
            journal.entries(),
            vec!["run:a", "ready:a", "run:b", "ready:b", "run:c", "ready:c", "run:d", "ready:d"]
        );
        assert!(
            conductor
                .snapshot()
                .iter()
                .all(|(_, state)| *state == ServiceState::Ready)
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!completion.is_complete());

        conductor.stop().await;
        assert!(completion.is_complete());
        assert_eq!(journal.count("stopped:"), 4);
    }

    #[tokio::test]
    async fn test_no_services() {
        let conductor = Conductor::new(Config::default()).unwrap();
        let completion = conductor.start().await;
        assert!(!completion.is_complete());

        conductor.stop().await;
        completion.wait().await;
        assert!(completion.is_complete());
    }

    #[tokio::test]
    async fn test_run_error_stops_earlier_services_and_skips_later() {
        let journal = Arc::new(Journal::default());
        let (tx, mut got_request) = mpsc::unbounded_channel();
        let conductor = Conductor::new(config(Duration::from_secs(1))).unwrap();
        conductor.service("a", quick("a", &journal));
        conductor.service("b", quick("b", &journal));
        conductor.service("c", failing("c", &journal, tx));
        conductor.service("d", quick("d", &journal));

        let completion = conductor.start().await;
        assert!(completion.is_complete());

        assert_eq!(journal.count("shutdown:a"), 1);
        assert_eq!(journal.count("shutdown:b"), 1);
        assert_eq!(journal.count("run:d"), 0);
        assert_eq!(got_request.recv().await, Some(false));

        let states: Vec<ServiceState> = conductor.snapshot().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            states,
            vec![
                ServiceState::Stopped,
                ServiceState::Stopped,
                ServiceState::Failed,
                ServiceState::Registered,
            ]
        );
    }

    #[tokio::test]
    async fn test_start_timeout_aborts_within_bounds() {
        let journal = Arc::new(Journal::default());
        let start_timeout = Duration::from_millis(100);
        let conductor = Conductor::new(config(start_timeout)).unwrap();
        conductor.service("a", quick("a", &journal));
        conductor.service(
            "slow",
            service("slow", &journal, Duration::from_secs(30), Duration::ZERO),
        );
        conductor.service("c", quick("c", &journal));

        let began = Instant::now();
        let completion = conductor.start().await;
        let elapsed = began.elapsed();

        assert!(completion.is_complete());
        assert!(elapsed >= start_timeout, "elapsed {elapsed:?}");
        assert!(elapsed < start_timeout + Duration::from_millis(500), "elapsed {elapsed:?}");
        assert_eq!(journal.count("shutdown:a"), 1);
        assert_eq!(journal.count("run:c"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stops_close_once() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(config(Duration::from_secs(1))).unwrap();
        for name in ["a", "b", "c"] {
            conductor.service(
                name,
                service(name, &journal, Duration::ZERO, Duration::from_millis(50)),
            );
        }
        let completion = conductor.start().await;

        let c1 = Arc::clone(&conductor);
        let c2 = Arc::clone(&conductor);
        let first = tokio::spawn(async move { c1.stop().await });
        let second = tokio::spawn(async move { c2.stop().await });
        first.await.unwrap();
        assert_eq!(journal.count("stopped:"), 3);
        second.await.unwrap();
        assert_eq!(journal.count("stopped:"), 3);
        assert_eq!(journal.count("shutdown:"), 3);
        assert!(completion.is_complete());

        conductor.stop().await;
    }

    #[tokio::test]
    #[should_panic(expected = "after the conductor has started")]
    async fn test_register_after_start_panics() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(Config::default()).unwrap();
        conductor.service("a", quick("a", &journal));
        let _ = conductor.start().await;
        conductor.service("late", quick("late", &journal));
    }

    #[tokio::test]
    async fn test_try_service_after_start_errors() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(Config::default()).unwrap();
        let _ = conductor.start().await;
        let err = conductor
            .try_service("late", quick("late", &journal))
            .unwrap_err();
        assert_eq!(err.as_label(), "conductor_already_started");
        assert!(conductor.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_three_services_end_to_end() {
        let journal = Arc::new(Journal::default());
        let collect = Arc::new(Collect::default());
        let conductor = Conductor::builder(config(Duration::from_secs(1)))
            .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        for name in ["db", "cache", "api"] {
            conductor.service(
                name,
                service(name, &journal, Duration::from_millis(5), Duration::from_millis(5)),
            );
        }

        let completion = conductor.start().await;
        let entries = journal.entries();
        assert_eq!(
            &entries[..6],
            ["run:db", "ready:db", "run:cache", "ready:cache", "run:api", "ready:api"]
        );

        conductor.stop().await;
        completion.wait().await;
        for name in ["db", "cache", "api"] {
            assert_eq!(journal.count(&format!("shutdown:{name}")), 1);
            assert_eq!(journal.count(&format!("stopped:{name}")), 1);
        }

        let kinds = collect.kinds();
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::ServiceReady).count(), 3);
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::ServiceStopped).count(), 3);
        assert!(kinds.contains(&EventKind::StartCompleted));
        assert_eq!(kinds.last(), Some(&EventKind::AllStopped));
    }

    #[tokio::test]
    async fn test_two_services_second_fails() {
        let journal = Arc::new(Journal::default());
        let (tx, mut got_request) = mpsc::unbounded_channel();
        let collect = Arc::new(Collect::default());
        let conductor = Conductor::builder(config(Duration::from_secs(1)))
            .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        conductor.service("first", quick("first", &journal));
        conductor.service("second", failing("second", &journal, tx));

        let completion = conductor.start().await;
        assert!(completion.is_complete());
        assert_eq!(journal.count("shutdown:first"), 1);
        assert_eq!(got_request.recv().await, Some(false));

        let failed = collect.find(EventKind::ServiceFailed).unwrap();
        assert_eq!(failed.service.as_deref(), Some("second"));
        assert_eq!(failed.reason.as_deref(), Some("startup failed: port in use"));
    }

    #[tokio::test]
    async fn test_straggler_hits_ceiling() {
        let collect = Arc::new(Collect::default());
        let cfg = Config {
            stop_timeout: Duration::from_millis(50),
            stop_grace: Duration::from_millis(50),
            ..Config::default()
        };
        let conductor = Conductor::builder(cfg)
            .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        conductor.service(
            "stubborn",
            ServiceFn::arc(|ctx: ServiceContext| {
                let (ready, stopped, shutdown) = ctx.into_parts();
                tokio::spawn(async move {
                    ready.notify();
                    let _req = shutdown.recv().await;
                    std::future::pending::<()>().await;
                    stopped.notify();
                });
                Ok(())
            }),
        );

        let completion = conductor.start().await;
        let began = Instant::now();
        conductor.stop().await;
        let elapsed = began.elapsed();

        assert!(completion.is_complete());
        assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(600), "elapsed {elapsed:?}");
        assert_eq!(
            conductor.snapshot(),
            vec![(Arc::<str>::from("stubborn"), ServiceState::Stopping)]
        );

        let exceeded = collect.find(EventKind::StopTimeoutExceeded).unwrap();
        assert_eq!(exceeded.reason.as_deref(), Some("stubborn"));
        assert_eq!(exceeded.timeout_ms, Some(100));
    }

    /// Never returns from `on_event` once shutdown reaches a service.
    struct Stuck;

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, event: &Event) {
            if event.kind == EventKind::ServiceStopping {
                std::future::pending::<()>().await;
            }
        }

        fn name(&self) -> &'static str {
            "stuck"
        }
    }

    #[tokio::test]
    async fn test_stuck_subscriber_does_not_hold_completion() {
        let journal = Arc::new(Journal::default());
        let cfg = Config {
            stop_timeout: Duration::from_millis(50),
            stop_grace: Duration::from_millis(50),
            ..Config::default()
        };
        let conductor = Conductor::builder(cfg)
            .with_subscribers(vec![Arc::new(Stuck) as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        conductor.service("a", quick("a", &journal));

        let completion = conductor.start().await;
        let began = Instant::now();
        tokio::time::timeout(Duration::from_secs(2), conductor.stop())
            .await
            .expect("stop must not wait on a stuck subscriber");

        assert!(completion.is_complete());
        assert!(began.elapsed() < Duration::from_millis(600), "elapsed {:?}", began.elapsed());
        assert_eq!(journal.count("stopped:a"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_racing_readiness_keeps_stopped_state() {
        for _ in 0..50 {
            let conductor = Conductor::new(config(Duration::from_secs(1))).unwrap();
            let weak = Arc::downgrade(&conductor);
            conductor.service(
                "racer",
                ServiceFn::arc(move |ctx: ServiceContext| {
                    let (ready, stopped, shutdown) = ctx.into_parts();
                    tokio::spawn(async move {
                        let _req = shutdown.recv().await;
                        stopped.notify();
                    });
                    let weak = weak.clone();
                    tokio::spawn(async move {
                        ready.notify();
                        if let Some(conductor) = weak.upgrade() {
                            conductor.stop().await;
                        }
                    });
                    Ok(())
                }),
            );
            let mut rx = conductor.subscribe();

            let completion = conductor.start().await;
            tokio::time::timeout(Duration::from_secs(2), completion.wait())
                .await
                .expect("stop should complete");

            assert_eq!(
                conductor.snapshot(),
                vec![(Arc::<str>::from("racer"), ServiceState::Stopped)]
            );

            let mut kinds = Vec::new();
            while let Ok(ev) = rx.try_recv() {
                kinds.push(ev.kind);
            }
            let requested = kinds
                .iter()
                .position(|k| *k == EventKind::ShutdownRequested)
                .unwrap();
            if let Some(done) = kinds.iter().position(|k| *k == EventKind::StartCompleted) {
                assert!(done < requested, "events {kinds:?}");
            }
            if let Some(ready) = kinds.iter().position(|k| *k == EventKind::ServiceReady) {
                assert!(ready < requested, "events {kinds:?}");
            }
        }
    }

    #[tokio::test]
    async fn test_dropped_ready_signal_fails_startup() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(config(Duration::from_secs(5))).unwrap();
        conductor.service("a", quick("a", &journal));
        conductor.service(
            "forgetful",
            ServiceFn::arc(|ctx: ServiceContext| {
                drop(ctx);
                Ok(())
            }),
        );
        conductor.service("c", quick("c", &journal));

        let began = Instant::now();
        let completion = conductor.start().await;
        assert!(began.elapsed() < Duration::from_secs(5));
        assert!(completion.is_complete());
        assert_eq!(journal.count("shutdown:a"), 1);
        assert_eq!(journal.count("run:c"), 0);
        assert_eq!(conductor.snapshot()[1].1, ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_dropped_stopped_signal_counts_as_stopped() {
        let collect = Arc::new(Collect::default());
        let conductor = Conductor::builder(config(Duration::from_secs(1)))
            .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        conductor.service(
            "quitter",
            ServiceFn::arc(|ctx: ServiceContext| {
                let (ready, stopped, shutdown) = ctx.into_parts();
                tokio::spawn(async move {
                    ready.notify();
                    shutdown.recv().await;
                    drop(stopped);
                });
                Ok(())
            }),
        );

        let _ = conductor.start().await;
        conductor.stop().await;

        let stopped = collect.find(EventKind::ServiceStopped).unwrap();
        assert_eq!(stopped.reason.as_deref(), Some("stopped signal dropped"));
        assert!(collect.kinds().contains(&EventKind::AllStopped));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_during_startup_interrupts_wait() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(config(Duration::from_secs(10))).unwrap();
        conductor.service("a", quick("a", &journal));
        conductor.service(
            "slow",
            service("slow", &journal, Duration::from_secs(30), Duration::ZERO),
        );
        conductor.service("c", quick("c", &journal));

        let starter = Arc::clone(&conductor);
        let start = tokio::spawn(async move { starter.start().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let began = Instant::now();
        conductor.stop().await;
        let completion = start.await.unwrap();

        assert!(began.elapsed() < Duration::from_secs(5));
        assert!(completion.is_complete());
        assert_eq!(journal.count("shutdown:a"), 1);
        assert_eq!(journal.count("shutdown:slow"), 1);
        assert_eq!(journal.count("run:c"), 0);
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(Config::default()).unwrap();
        conductor.service("a", quick("a", &journal));

        conductor.stop().await;
        let completion = conductor.start().await;
        assert!(completion.is_complete());
        assert_eq!(journal.count("run:"), 0);
    }

    #[tokio::test]
    async fn test_second_start_is_noop() {
        let journal = Arc::new(Journal::default());
        let conductor = Conductor::new(Config::default()).unwrap();
        conductor.service("a", quick("a", &journal));

        let _ = conductor.start().await;
        let _ = conductor.start().await;
        assert_eq!(journal.count("run:a"), 1);
        conductor.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sigterm_triggers_stop() {
        let journal = Arc::new(Journal::default());
        let cfg = Config {
            hook_signals: true,
            ..config(Duration::from_secs(1))
        };
        let conductor = Conductor::new(cfg).unwrap();
        conductor.service("a", quick("a", &journal));
        let completion = conductor.start().await;

        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("kill -TERM {}", std::process::id()))
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), completion.wait())
            .await
            .expect("signal should stop the conductor");
        assert_eq!(journal.count("stopped:a"), 1);
    }
}
