// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kvapi daemon (kvd)
//!
//! Serves the key-value API over HTTP and persists every mutation to the
//! configured transaction log.

use std::path::Path;
use std::process::ExitCode;

use kv_core::LogError;
use kv_daemon::lifecycle::{self, writer_failure, LifecycleError};
use kv_daemon::{router, Config};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Why the serving loop ended
enum Stop {
    Signal,
    WriterFailed(LogError),
    ServerExited(String),
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Optional config file as the only argument
    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::from_env()?,
    };

    let log_guard = setup_logging(&config)?;

    info!(
        listen = %config.listen,
        backend = ?config.backend,
        queue_capacity = config.queue_capacity,
        "Starting kvd"
    );

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Bind last, after replay succeeded
    let listener = match TcpListener::bind(config.listen).await {
        Ok(l) => l,
        Err(source) => {
            let e = LifecycleError::BindFailed {
                addr: config.listen,
                source,
            };
            error!("Failed to start daemon: {}", e);
            if let Err(close_err) = daemon.shutdown().await {
                warn!(error = %close_err, "failed to close transaction log");
            }
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = router(daemon.app_state());
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    info!("Daemon ready, listening on {}", config.listen);

    let stop = tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            Stop::Signal
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
            Stop::Signal
        }
        err = writer_failure(daemon.take_errors()) => {
            error!(error = %err, "transaction log failed, shutting down");
            Stop::WriterFailed(err)
        }
        result = &mut server => {
            let reason = match result {
                Ok(Ok(())) => "server stopped".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            error!(reason = %reason, "HTTP server exited, shutting down");
            Stop::ServerExited(reason)
        }
    };

    // Stop accepting requests, let in-flight ones finish, then drain the log
    let _ = stop_tx.send(());
    let server_running = !matches!(stop, Stop::ServerExited(_));
    let drain = async {
        if server_running {
            if let Err(e) = server.await {
                warn!(error = %e, "HTTP server task failed during shutdown");
            }
        }
        daemon.shutdown().await
    };

    let closed = tokio::select! {
        result = drain => result,
        _ = sigterm.recv() => {
            warn!("Received second signal while draining, exiting immediately");
            drop(log_guard);
            std::process::exit(1);
        }
        _ = sigint.recv() => {
            warn!("Received second signal while draining, exiting immediately");
            drop(log_guard);
            std::process::exit(1);
        }
    };

    let code = match (stop, closed) {
        (Stop::Signal, Ok(())) => {
            info!("Daemon stopped");
            ExitCode::SUCCESS
        }
        (Stop::Signal, Err(e)) => {
            error!(error = %e, "transaction log did not close cleanly");
            ExitCode::FAILURE
        }
        (Stop::WriterFailed(err), closed) => {
            if let Err(e) = closed {
                warn!(error = %e, "close after writer failure");
            }
            error!(error = %err, "Daemon stopped after transaction log failure");
            ExitCode::FAILURE
        }
        (Stop::ServerExited(reason), closed) => {
            if let Err(e) = closed {
                warn!(error = %e, "close after server exit");
            }
            error!(reason = %reason, "Daemon stopped after server exit");
            ExitCode::FAILURE
        }
    };

    drop(log_guard);
    Ok(code)
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (writer, guard) = match &config.daemon_log {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)?;
            let file_name = path.file_name().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("log path has no file name: {}", path.display()),
                )
            })?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(config.daemon_log.is_none()),
        )
        .init();

    Ok(guard)
}
