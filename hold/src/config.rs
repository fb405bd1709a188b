//! Daemon configuration: bind address and state directory, resolved from
//! CLI flags and `$HOLD_HOME`/`$HOME`, falling back to built-in defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default TCP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:2375";

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub bind: SocketAddr,
    /// Root directory for all persistent state (layers, images, containers).
    pub state_root: PathBuf,
    /// Run in the foreground instead of self-daemonizing.
    pub foreground: bool,
}

impl Config {
    /// Parses flags, falling back to `$HOLD_HOME` and built-in defaults.
    /// Recognized flags: `--bind ADDR`, `--state-dir DIR`, `--foreground`.
    pub fn from_args(args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut bind = DEFAULT_BIND.to_owned();
        let mut state_root = default_state_root();
        let mut foreground = false;

        let mut args = args;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bind" => {
                    bind = args.next().ok_or("--bind requires a value")?;
                }
                "--state-dir" => {
                    state_root =
                        PathBuf::from(args.next().ok_or("--state-dir requires a value")?);
                }
                "--foreground" => foreground = true,
                other => return Err(format!("unrecognized argument: {other}")),
            }
        }

        let bind = bind
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid --bind address {bind:?}: {e}"))?;

        Ok(Self {
            bind,
            state_root,
            foreground,
        })
    }
}

/// `$HOLD_HOME`, or `$HOME/.hold`, or `/var/lib/hold` as a last resort.
fn default_state_root() -> PathBuf {
    if let Ok(home) = std::env::var("HOLD_HOME") {
        return PathBuf::from(home);
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".hold"),
        Err(_) => PathBuf::from("/var/lib/hold"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_built_in_bind_address() {
        let config = Config::from_args(std::iter::empty()).unwrap();
        assert_eq!(config.bind, DEFAULT_BIND.parse().unwrap());
        assert!(!config.foreground);
    }

    #[test]
    fn parses_bind_and_state_dir_flags() {
        let args = [
            "--bind".to_owned(),
            "0.0.0.0:9999".to_owned(),
            "--state-dir".to_owned(),
            "/tmp/hold-state".to_owned(),
            "--foreground".to_owned(),
        ];
        let config = Config::from_args(args.into_iter()).unwrap();
        assert_eq!(config.bind, "0.0.0.0:9999".parse().unwrap());
        assert_eq!(config.state_root, PathBuf::from("/tmp/hold-state"));
        assert!(config.foreground);
    }

    #[test]
    fn rejects_unknown_flags() {
        let args = ["--bogus".to_owned()];
        assert!(Config::from_args(args.into_iter()).is_err());
    }
}
