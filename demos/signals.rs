//! # Example: signals
//!
//! Runs a service until Ctrl-C (or SIGTERM/SIGQUIT), then shuts down gracefully.
//!
//! ## Run
//! ```bash
//! cargo run --example signals
//! # press Ctrl-C
//! ```

use std::time::Duration;

use conductor::{Conductor, Config, ServiceContext, ServiceFn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        verbose: true,
        hook_signals: true,
        stop_timeout: Duration::from_secs(2),
        ..Config::default()
    };
    let conductor = Conductor::new(cfg)?;

    conductor.service(
        "worker",
        ServiceFn::arc(|ctx: ServiceContext| {
            let (ready, stopped, shutdown) = ctx.into_parts();
            tokio::spawn(async move {
                ready.notify();
                let req = shutdown.recv().await;
                println!("[worker] finishing in-flight jobs");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(500)) => {}
                    _ = req.expired() => println!("[worker] deadline hit, dropping jobs"),
                }
                stopped.notify();
            });
            Ok(())
        }),
    );

    let completion = conductor.start().await;
    println!("running, press Ctrl-C to stop");
    completion.wait().await;
    Ok(())
}
