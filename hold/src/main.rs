//! `hold`: single-host container engine daemon.
//!
//! Parses its own flags, self-daemonizes unless told to stay in the
//! foreground, then runs a tokio accept loop that hands each connection to
//! [`routes::dispatch`].

mod config;
mod error;
mod http;
mod routes;
mod state;

use std::path::PathBuf;

use config::Config;
use daemonize::Daemonize;
use log::{error, info, warn};
use state::AppState;
use tokio::net::TcpStream;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;

fn main() {
    env_logger::init();

    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("hold: {e}");
            std::process::exit(2);
        }
    };

    if !config.foreground && let Err(e) = daemonize(&config.state_root) {
        eprintln!("hold: failed to daemonize: {e}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("hold: failed to start tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        error!("hold exited with error: {e}");
        std::process::exit(1);
    }
}

/// Forks into the background before the tokio runtime is built, the same
/// ordering hold-shim's namespace setup requires: a multithreaded process
/// must not fork.
fn daemonize(state_root: &std::path::Path) -> std::io::Result<()> {
    let log_dir = state_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let stdout = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("daemon.out"))?;
    let stderr = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("daemon.err"))?;

    Daemonize::new()
        .working_directory(state_root)
        .stdout(stdout)
        .stderr(stderr)
        .start()
        .map_err(|e| std::io::Error::other(e.to_string()))
}

async fn run(config: Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.state_root)?;

    let state = AppState::open(config.state_root.clone(), shim_path())
        .map_err(|e| std::io::Error::other(format!("failed to open engine: {e}")))?;

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("hold listening on {}", config.bind);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                let state = state.clone();
                connections.spawn(async move {
                    if let Err(e) = handle_connection(state, stream).await {
                        warn!("connection error: {e}");
                    }
                });
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, draining in-flight requests");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, draining in-flight requests");
                break;
            }
        }
    }

    // Stop accepting and let requests already in flight finish; running
    // containers are left supervised by their own init, not torn down here.
    drop(listener);
    while connections.join_next().await.is_some() {}
    info!("hold stopped");
    Ok(())
}

async fn handle_connection(state: AppState, mut stream: TcpStream) -> std::io::Result<()> {
    let Some(req) = http::read_request(&mut stream).await? else {
        return Ok(());
    };
    let response = routes::dispatch(&state, req).await;
    http::write_response(&mut stream, response).await
}

/// `hold-shim` is expected next to the running `hold` binary.
fn shim_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join("hold-shim")))
        .unwrap_or_else(|| PathBuf::from("hold-shim"))
}
