// SPDX-License-Identifier: MIT

//! `aquactld`: the control-plane binary. Loads configuration, wires an
//! [`aquactl_daemon::Engine`], and serves the HTTP control surface while
//! driving the scheduler and health-monitor tick loops in the background.

use aquactl_core::StartupError;
use aquactl_daemon::{http, logging, DaemonConfig, Engine};
use fs2::FileExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const USAGE: &str = "\
aquactld - aquarium AV device-control daemon

USAGE:
    aquactld [--config PATH]
    aquactld --version
    aquactld --help

OPTIONS:
    --config PATH   Path to the TOML configuration document.
                     Defaults to $AQUACTL_CONFIG, then the platform config dir.
";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print!("{USAGE}");
        return;
    }
    if args.iter().any(|a| a == "--version") {
        println!("aquactld {}", env!("CARGO_PKG_VERSION"));
        return;
    }
    let config_path = config_path_from(&args).unwrap_or_else(DaemonConfig::default_path);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let exit_code = runtime.block_on(run(config_path));
    std::process::exit(exit_code);
}

fn config_path_from(args: &[String]) -> Option<PathBuf> {
    let idx = args.iter().position(|a| a == "--config")?;
    args.get(idx + 1).map(PathBuf::from)
}

async fn run(config_path: PathBuf) -> i32 {
    logging::init();

    let config = match DaemonConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, path = %config_path.display(), "failed to load configuration");
            return StartupError::from(e).exit_code();
        }
    };

    let lock_path = config.document.log_dir.join("aquactld.lock");
    let _lock = match acquire_lock(&lock_path) {
        Ok(lock) => lock,
        Err(e) => {
            error!(error = %e, path = %lock_path.display(), "another aquactld instance appears to be running");
            return 1;
        }
    };

    let engine = match Engine::build(&config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!(error = %e, "failed to start engine");
            return e.exit_code();
        }
    };

    let listener = match tokio::net::TcpListener::bind(config.document.bind_addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %config.document.bind_addr, "failed to bind control surface");
            return 1;
        }
    };
    info!(addr = %config.document.bind_addr, "aquactld listening");

    let scheduler_task = tokio::spawn(scheduler_loop(engine.clone()));
    let monitor_task = tokio::spawn(monitor_loop(engine.clone()));

    let app = http::router(engine.clone());
    let shutdown = engine.shutdown.clone();
    let serve_result = axum::serve(listener, app).with_graceful_shutdown(wait_for_shutdown(shutdown)).await;

    engine.shutdown.cancel();
    let _ = scheduler_task.await;
    let _ = monitor_task.await;

    if let Err(e) = serve_result {
        error!(error = %e, "http server exited with an error");
        return 1;
    }
    0
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    let ctrl_c = async { let _ = tokio::signal::ctrl_c().await; };
    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(_) => return,
        };
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
        _ = shutdown.cancelled() => {},
    }
    shutdown.cancel();
}

async fn scheduler_loop(engine: Arc<Engine>) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => engine.run_scheduler_tick().await,
            _ = engine.shutdown.cancelled() => break,
        }
    }
}

async fn monitor_loop(engine: Arc<Engine>) {
    let mut ticker = tokio::time::interval(engine.monitor_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = engine.run_monitor_cycle().await;
                if let Some(alert) = outcome.alert {
                    warn!(level = %alert.level, message = %alert.message, "fleet health alert");
                }
            }
            _ = engine.shutdown.cancelled() => break,
        }
    }
}

struct LockGuard(std::fs::File, PathBuf);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.1);
    }
}

fn acquire_lock(path: &std::path::Path) -> std::io::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
    lock_file.try_lock_exclusive()?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(LockGuard(lock_file, path.to_path_buf()))
}
