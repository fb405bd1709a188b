//! hold-shim — namespace-entry helper spawned by the daemon to bring up a
//! container process.
//!
//! The daemon writes a JSON-serialized [`hold_engine::namespaces::ChildSpec`]
//! to a temp file and spawns this binary with the file path as its sole
//! argument. The shim reads that file, deletes it, and calls
//! [`hold_engine::namespaces::enter_and_run`], which never returns on
//! success: it becomes PID 1 of a new PID namespace and eventually execs the
//! resolved command.
//!
//! This exists instead of a plain `fork()` in the daemon because the daemon
//! is a multi-threaded tokio process; forking one is undefined behavior the
//! moment another thread holds a lock the child can't release.

// Shim is a standalone binary — stderr is the correct error channel.
#![allow(clippy::print_stderr)]

fn main() {
    let Some(spec_path) = std::env::args().nth(1) else {
        eprintln!("[hold-shim] usage: hold-shim <spec.json>");
        std::process::exit(1);
    };

    let json = match std::fs::read_to_string(&spec_path) {
        Ok(j) => {
            let _ = std::fs::remove_file(&spec_path);
            j
        }
        Err(e) => {
            eprintln!("[hold-shim] failed to read spec {spec_path}: {e}");
            std::process::exit(1);
        }
    };

    let spec: hold_engine::namespaces::ChildSpec = match serde_json::from_str(&json) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[hold-shim] invalid spec JSON: {e}");
            std::process::exit(1);
        }
    };

    // enter_and_run never returns on success: either this process becomes
    // the container's init and execs the user command, or its fork's
    // parent exits with the child's status.
    if let Err(e) = hold_engine::namespaces::enter_and_run(&spec) {
        eprintln!("[hold-shim] container init failed: {e}");
        std::process::exit(1);
    }
}
