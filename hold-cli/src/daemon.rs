//! `holdctl daemon` — start the `hold` daemon if it isn't already running.

use std::net::TcpStream;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

/// Spawns `hold` next to the running `holdctl` binary, unless one is
/// already listening at `host`, then waits up to 5s for it to accept
/// connections before giving up.
pub fn ensure_running(host: &str) -> Result<()> {
    if probe(host) {
        eprintln!("hold is already running at {host}");
        return Ok(());
    }

    let hold_path = sibling_binary("hold");
    Command::new(&hold_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn {}", hold_path.display()))?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if probe(host) {
            eprintln!("hold is ready at {host}");
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    bail!("hold did not become ready at {host} within 5s")
}

fn probe(host: &str) -> bool {
    TcpStream::connect(strip_scheme(host)).is_ok()
}

fn strip_scheme(host: &str) -> &str {
    host.strip_prefix("http://").unwrap_or(host)
}

fn sibling_binary(name: &str) -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join(name)))
        .unwrap_or_else(|| PathBuf::from(name))
}
