//! muralsync server binary.
//!
//! Reads `MURALSYNC_*` settings, starts the server and runs until SIGINT or
//! SIGTERM, then stops the engine so every session is dropped.

mod settings;

use muralsync::prelude::*;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = settings::from_env()?;
    let server = MuralServer::builder().config(config).build().await?;
    log_config(server.config());
    info!(addr = %server.local_addr()?, "listening");

    let engine = server.engine();
    tokio::select! {
        result = server.run() => result?,
        signal = shutdown_signal() => {
            info!(signal, "shutting down");
            engine.shutdown().await?;
        }
    }

    info!("server stopped");
    Ok(())
}

fn log_config(config: &ServerConfig) {
    let engine = &config.engine;
    let store = &engine.store;
    info!(
        bind = %config.bind_addr,
        connection_timeout = ?config.connection_timeout,
        idle_timeout = ?store.idle_timeout,
        max_age = ?store.max_age,
        cleanup_interval = ?engine.reaper.period,
        stats_interval = ?engine.stats_interval,
        max_notes = store.max_notes,
        max_drawings = store.max_drawings,
        max_texts = store.max_texts,
        code_length = store.code_length,
        sweep_ceiling = store.sweep_ceiling,
        "effective configuration"
    );
}

/// Resolves with the name of the first shutdown signal received.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    }
}
