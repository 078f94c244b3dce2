//! # autopilotd: autopilot daemon
//!
//! Composition root that wires all adapters together and runs the control
//! loop until SIGINT/SIGTERM.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the probes, executor and rule set
//! - Serve the read-only status API (optional)
//! - Run the control loop and stop it cleanly on a signal
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;
mod probes;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use autopilot_adapter_http_axum::router;
use autopilot_adapter_http_axum::state::AppState;
use autopilot_adapter_storage_sqlite_sqlx::Config as StorageConfig;
use autopilot_adapter_termux::HookExecutor;
use autopilot_app::collector::TelemetryCollector;
use autopilot_app::control_loop::ControlLoop;
use autopilot_app::rule_engine::RuleEngine;
use autopilot_app::shutdown::{self, ShutdownTrigger};
use autopilot_domain::policy;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let store = Arc::new(db.decision_store());

    // Control loop collaborators
    let rules = policy::baseline(config.policy.battery_low_threshold)?;
    let (battery, network) = probes::build(&config.probes);
    let collector = TelemetryCollector::new(battery, network);
    let engine =
        RuleEngine::new(HookExecutor::new(config.hooks()).with_timeout(config.hook_timeout()));

    let (trigger, shutdown) = shutdown::channel();

    // HTTP
    let server = if config.server.enabled {
        let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
        tracing::info!(addr = %listener.local_addr()?, "status API listening");

        let app = router::build(AppState::from_arc(Arc::clone(&store)));
        let stop = shutdown.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.triggered().await })
                .await
        }))
    } else {
        None
    };

    tokio::spawn(stop_on_signal(trigger));

    let control = ControlLoop::new(
        collector,
        engine,
        Arc::clone(&store),
        rules,
        config.loop_config(),
    );
    let status = control.run(shutdown).await;

    if let Some(server) = server {
        server.await??;
    }
    db.close().await;

    tracing::info!(
        ticks = status.ticks,
        failed_ticks = status.failed_ticks,
        lost_batches = status.lost_batches,
        "autopilotd exited"
    );
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Trigger shutdown on the first SIGINT or SIGTERM.
async fn stop_on_signal(trigger: ShutdownTrigger) {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("SIGINT received, stopping"),
        () = terminate => tracing::info!("SIGTERM received, stopping"),
    }
    trigger.trigger();
}
