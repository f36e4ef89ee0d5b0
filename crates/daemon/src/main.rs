// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kilnd` — the resident build daemon.
//!
//! Binds the session socket, then serves each client connection on its own
//! task. Logs go to a file under the state dir; a TUI client owns the
//! terminal, so the daemon never writes to it.

use std::sync::Arc;

use kiln_daemon::{
    env, serve, shutdown_cleanup, startup, BuildEngine, BuildGate, Config, LifecycleError,
    ProcessEngine, SessionConfig,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("kilnd: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), LifecycleError> {
    let config = Config::under(env::state_dir()?, env::socket_path()?);

    std::fs::create_dir_all(&config.logs_dir)?;
    let file_appender = tracing_appender::rolling::never(&config.logs_dir, "daemon.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("KILN_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let started = startup(&config)?;
    info!(version = env::DAEMON_VERSION, "kilnd started");

    let engine: Arc<dyn BuildEngine> = Arc::new(ProcessEngine::from_env());
    let session_config = SessionConfig::from_env();
    // One build at a time, daemon-wide; extra sessions queue behind it
    let gate = BuildGate::new();

    loop {
        tokio::select! {
            accepted = started.listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let engine = Arc::clone(&engine);
                        let gate = gate.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = serve(reader, writer, engine, gate, session_config).await {
                                warn!("session ended with error: {e}");
                            }
                        });
                    }
                    Err(e) => error!("accept error: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    shutdown_cleanup(&config);
    Ok(())
}
