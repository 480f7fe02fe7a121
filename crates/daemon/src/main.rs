// SPDX-License-Identifier: MIT

//! hygiened: the Cyber Hygiene orchestrator daemon.
//!
//! No in-process scheduler of its own (§5): one tick loop polls the control
//! channel, reconciles the fleet balancer, sweeps the rescan scheduler, and
//! checkpoints materialized state. Concurrency across scan execution is
//! externalized to the worker processes that consume the READY queue.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use hygiene_daemon::lifecycle::{self, Config, DaemonState, LifecycleError};
use hygiene_daemon::{env, tick};
use hygiene_engine::control::ControlState;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// Max daemon.log size before rotation (§10).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate `daemon.log` if it exceeds [`MAX_LOG_SIZE`]. Best-effort: rotation
/// failures are silently ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config.log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("hygiened {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("hygiened {}", env!("CARGO_PKG_VERSION"));
                println!("Cyber Hygiene orchestrator daemon: fleet balancer + rescan scheduler tick loop");
                println!();
                println!("USAGE:");
                println!("    hygiened");
                return Ok(());
            }
            _ => {}
        }
    }

    let config = Config::load()?;
    rotate_log_if_needed(&config.log_path);
    let _guard = setup_logging(&config)?;

    let daemon = match lifecycle::startup(config) {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(e)) => {
            eprintln!("hygiened: failed to acquire lock, daemon already running? ({e})");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e.into());
        }
    };

    info!(pid = std::process::id(), "hygiened starting");
    run(daemon).await?;
    Ok(())
}

async fn run(mut daemon: DaemonState) -> Result<(), LifecycleError> {
    let tick_interval = env::tick_interval_ms();
    let mut ticker = tokio::time::interval(tick_interval);
    let mut control_state = ControlState::default();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = chrono::Utc::now();
                control_state = tick::run_tick(&mut daemon.state, now, true, control_state);
                if let Err(e) = hygiene_storage::checkpoint(&daemon.config.state_dir, &mut daemon.wal, &daemon.state) {
                    warn!(error = %e, "checkpoint failed");
                }
                if control_state.stopped {
                    info!("stop acknowledged, shutting down");
                    break;
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    hygiene_storage::checkpoint(&daemon.config.state_dir, &mut daemon.wal, &daemon.state)?;
    info!("hygiened stopped");
    Ok(())
}
