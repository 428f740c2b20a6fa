//! # Example: startup_failure
//!
//! The second of three services fails in `run`. The first one is shut down,
//! the third one is never started.
//!
//! ## Run
//! ```bash
//! cargo run --example startup_failure
//! ```

use conductor::{Conductor, Config, ServiceContext, ServiceError, ServiceFn, ServiceRef};

fn well_behaved() -> ServiceRef {
    ServiceFn::arc(|ctx: ServiceContext| {
        let (ready, stopped, shutdown) = ctx.into_parts();
        tokio::spawn(async move {
            ready.notify();
            shutdown.recv().await;
            stopped.notify();
        });
        Ok(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        verbose: true,
        ..Config::default()
    };
    let conductor = Conductor::new(cfg)?;

    conductor.service("queue", well_behaved());
    conductor.service(
        "http",
        ServiceFn::arc(|_ctx: ServiceContext| Err(ServiceError::failed("address already in use"))),
    );
    conductor.service("metrics", well_behaved());

    let completion = conductor.start().await;
    assert!(completion.is_complete());

    for (name, state) in conductor.snapshot() {
        println!("{name}: {}", state.as_label());
    }
    Ok(())
}
