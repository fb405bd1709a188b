//! The container record: the persistent source of truth for one instance.

use std::path::PathBuf;

/// Lifecycle state of a container record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum State {
    /// Record exists, rootfs materialized, never started.
    Created,
    /// A supervised child process is executing.
    Running,
    /// Frozen via a freezer-cgroup operation.
    Paused,
    /// Transient: restart in progress.
    Restarting,
    /// Transient: teardown in progress.
    Removing,
    /// Process ran and exited; record retains exit metadata.
    Exited,
    /// Terminal: an unrecoverable cleanup failure occurred.
    Dead,
}

impl State {
    /// Whether a live process is expected to exist in this state.
    pub fn has_live_process(self) -> bool {
        matches!(self, Self::Running | Self::Paused | Self::Restarting)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
        };
        f.write_str(s)
    }
}

/// Resource caps applied via cgroup v2 when non-zero.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Memory cap in bytes. Zero means unlimited.
    #[serde(default)]
    pub memory_limit: u64,
    /// CPU cap in fractional cores (e.g. `1.5` == 150% of one core). Zero
    /// means unlimited.
    #[serde(default)]
    pub cpu_limit: f64,
    /// Maximum number of tasks. Zero means unlimited.
    #[serde(default)]
    pub pid_limit: u64,
}

impl ResourceLimits {
    /// Whether any cap is set, and so a cgroup must be created.
    pub fn any_set(&self) -> bool {
        self.memory_limit > 0 || self.cpu_limit > 0.0 || self.pid_limit > 0
    }
}

/// A persistent record describing a runnable (or running) container
/// instance.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Container {
    /// Opaque container id.
    pub id: String,
    /// Human name; defaults to `id` when not given explicitly.
    pub name: String,
    /// Source image reference (`name:tag` or id) this container was
    /// created from.
    pub image: String,
    /// Resolved command (after entrypoint/cmd precedence resolution).
    pub command: Vec<String>,
    /// Working directory inside the container.
    pub working_dir: Option<String>,
    /// Environment variables, `KEY=VALUE` form.
    pub env: Vec<String>,
    /// Host:container port mapping strings, e.g. `"8080:80"`.
    pub port_bindings: Vec<String>,
    /// Host:container bind mount strings, e.g. `"/data:/var/data"`.
    pub binds: Vec<String>,
    /// Whether a TTY should be allocated.
    pub tty: bool,
    /// Whether stdin should be kept open.
    pub interactive: bool,
    /// Whether `start` should return immediately rather than waiting for
    /// exit.
    pub detach: bool,
    /// Resource caps, enforced via cgroup v2 when any is non-zero.
    pub resources: ResourceLimits,
    /// Current lifecycle state.
    pub state: State,
    /// Pid of the supervised child while `Running`/`Paused`/`Restarting`.
    pub pid: Option<i32>,
    /// Path to the extracted rootfs directory.
    pub rootfs: PathBuf,
    /// Path to the container's combined stdout/stderr log file.
    pub log_path: PathBuf,
    /// RFC3339 creation timestamp.
    pub created: String,
    /// RFC3339 timestamp of the most recent `start`.
    pub started: Option<String>,
    /// RFC3339 timestamp of the most recent exit.
    pub finished: Option<String>,
    /// Exit code of the most recently finished run.
    pub exit_code: Option<i32>,
    /// Most recent failure message, if any (e.g. a failed start).
    pub error: Option<String>,
}

impl Container {
    /// Returns a human-facing status string matching the wire API's
    /// `Status` field (`"running"` or `"exited"`; other states map to
    /// their lowercase name).
    pub fn status(&self) -> String {
        self.state.to_string()
    }
}
