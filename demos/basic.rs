//! # Example: basic
//!
//! Three services started in dependency order, then stopped together.
//!
//! Demonstrates how to:
//! - Implement [`Service`] by hand and with [`ServiceFn`].
//! - Register services and start them with [`Conductor::start`].
//! - Stop the conductor and wait on its [`Completion`].
//!
//! ## Flow
//! ```text
//! start()
//!   ├─► db.run()    ──► ready
//!   ├─► cache.run() ──► ready
//!   └─► api.run()   ──► ready
//! stop()
//!   ├─► ShutdownRequest ──► db, cache, api (concurrently)
//!   └─► all stopped ──► completion closed
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use conductor::{
    Conductor, Config, Service, ServiceContext, ServiceError, ServiceFn, ServiceRef,
};

/// Pretends to open a connection pool.
struct Database {
    pool_size: usize,
}

impl Service for Database {
    fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError> {
        if self.pool_size == 0 {
            return Err(ServiceError::failed("pool size must be positive"));
        }
        let name = ctx.name().to_string();
        let pool_size = self.pool_size;
        let (ready, stopped, shutdown) = ctx.into_parts();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            println!("[{name}] pool of {pool_size} connections open");
            ready.notify();

            let req = shutdown.recv().await;
            println!("[{name}] closing pool, {:?} left", req.remaining());
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopped.notify();
        });
        Ok(())
    }
}

/// Ticks until asked to stop.
fn ticker(period: Duration) -> ServiceRef {
    ServiceFn::arc(move |ctx: ServiceContext| {
        let name = ctx.name().to_string();
        let (ready, stopped, shutdown) = ctx.into_parts();

        tokio::spawn(async move {
            ready.notify();
            let mut shutdown = std::pin::pin!(shutdown.recv());
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => println!("[{name}] tick"),
                    _ = &mut shutdown => break,
                }
            }
            println!("[{name}] stopped ticking");
            stopped.notify();
        });
        Ok(())
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        verbose: true,
        ..Config::default()
    };
    let conductor = Conductor::new(cfg)?;

    conductor.service("db", Arc::new(Database { pool_size: 8 }));
    conductor.service("cache", ticker(Duration::from_millis(200)));
    conductor.service("api", ticker(Duration::from_millis(300)));

    let completion = conductor.start().await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    conductor.stop().await;
    completion.wait().await;

    for (name, state) in conductor.snapshot() {
        println!("{name}: {}", state.as_label());
    }
    Ok(())
}
