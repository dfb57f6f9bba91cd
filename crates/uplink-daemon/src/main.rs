#![deny(unsafe_op_in_unsafe_fn)]

use anyhow::{Context, Result};
use clap::Parser;
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use uplink_core::cancel::{cancel, new_flag};
use uplink_core::{Arbiter, CommandLinkOps};
use uplink_daemon::cli::{usage, Cli};
use uplink_daemon::config::DaemonConfig;
use uplink_daemon::status::StatusWriter;
use uplink_daemon::systemd;
use uplink_daemon::worker::unexpected_exit;

const RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.interfaces.is_empty() {
        let program = std::env::args().next().unwrap_or_else(|| "uplinkd".into());
        println!("{}", usage(&program));
        return Ok(());
    }

    let config = DaemonConfig::from_env();
    let _logging_guards = uplink_logging::init("uplinkd", &config.root_path, &config.logging)
        .context("initialising logging")?;
    install_panic_hook();

    let ops = Arc::new(CommandLinkOps::new(config.tools.clone()));
    let mut arbiter =
        Arbiter::new(cli.interfaces, ops).context("invalid interface list")?;

    let span = tracing::info_span!("uplinkd", component = "uplinkd");
    let _span_guard = span.enter();

    let global_cancel = CancellationToken::new();
    if config.logging.enabled {
        spawn_retention_task(config.root_path.clone(), config.logging.clone(), global_cancel.clone());
    }

    // Registered before the worker starts so an early signal still stops it.
    let mut sigterm = signal(SignalKind::terminate()).context("registering SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("registering SIGINT handler")?;

    let stop = new_flag();
    let mut status = StatusWriter::new(config.status_path(), arbiter.interface_names());
    let worker_flag = Arc::clone(&stop);
    let mut worker = tokio::task::spawn_blocking(move || {
        arbiter.run_with(&worker_flag, |report| status.observe(report));
    });

    systemd::notify_ready();
    info!("uplinkd ready");

    let early_exit = tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, initiating graceful shutdown");
            None
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, initiating graceful shutdown");
            None
        }
        result = &mut worker => Some(result),
    };

    systemd::notify_stopping();
    cancel(&stop);
    global_cancel.cancel();

    if let Some(result) = early_exit {
        let err = unexpected_exit(result);
        error!("{:#}", err);
        return Err(err);
    }
    if let Err(err) = worker.await {
        error!("Arbiter worker failed: {}", err);
        return Err(err).context("arbiter worker failed");
    }

    info!("uplinkd stopped");
    Ok(())
}

fn spawn_retention_task(
    root: PathBuf,
    cfg: uplink_logging::LoggingConfig,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RETENTION_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    match uplink_logging::run_retention(&root, &cfg) {
                        Ok(0) => {}
                        Ok(removed) => info!("Log retention removed {} file(s)", removed),
                        Err(err) => warn!("Log retention failed: {:#}", err),
                    }
                }
            }
        }
    });
}

/// Log panics with location and backtrace before the default hook runs.
fn install_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        let backtrace = std::backtrace::Backtrace::capture();
        error!(
            target: "uplinkd::panic",
            location = %location,
            message = %message,
            "daemon panicked"
        );
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            error!(target: "uplinkd::panic", backtrace = %backtrace, "panic backtrace");
        }

        default_hook(panic_info);
    }));
}
