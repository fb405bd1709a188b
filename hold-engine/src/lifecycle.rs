//! The lifecycle engine: creates, starts, stops, removes containers, and
//! spawns the isolated processes that back them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use hold_store::{Catalog, Image, LayerStore, generate_id};
use log::{info, warn};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::container::{Container, ResourceLimits, State};
use crate::error::{Error, Result};
use crate::namespaces::{self, ChildSpec};
use crate::registry::Registry;

/// Default grace period between SIGTERM and SIGKILL on `stop`.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// How long `start` waits for `hold-shim` to publish the container's real
/// pid before giving up and treating the start as failed.
const PID_FILE_TIMEOUT: Duration = Duration::from_secs(5);

/// Inputs to [`Engine::create`], mirroring the `/containers/create` body.
#[derive(Debug, Clone, Default)]
pub struct CreateSpec {
    /// Source image reference (`name:tag` or id).
    pub image: String,
    /// Optional human name; defaults to the container id.
    pub name: Option<String>,
    /// Command override; falls back to image `CMD`/entrypoint when empty.
    pub command: Vec<String>,
    /// Working directory override.
    pub working_dir: Option<String>,
    /// Additional environment variables, appended to the image's defaults.
    pub env: Vec<String>,
    /// Port mapping strings.
    pub port_bindings: Vec<String>,
    /// Bind mount strings.
    pub binds: Vec<String>,
    /// Whether to allocate a TTY.
    pub tty: bool,
    /// Whether to keep stdin open.
    pub interactive: bool,
    /// Whether `start` should return without waiting for exit.
    pub detach: bool,
    /// Resource caps.
    pub resources: ResourceLimits,
}

/// Owns the registry, image catalog, and layer store, and drives container
/// state transitions.
pub struct Engine {
    state_root: PathBuf,
    shim_path: PathBuf,
    layers: LayerStore,
    catalog: Catalog,
    registry: Registry,
    running: Mutex<HashMap<String, i32>>,
}

impl Engine {
    /// Opens the engine against a state root, creating its subdirectories.
    pub fn open(state_root: &Path, shim_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(state_root.join("containers"))?;
        std::fs::create_dir_all(state_root.join("logs"))?;
        Ok(Self {
            state_root: state_root.to_path_buf(),
            shim_path,
            layers: LayerStore::open(state_root)?,
            catalog: Catalog::open(state_root)?,
            registry: Registry::open(state_root)?,
            running: Mutex::new(HashMap::new()),
        })
    }

    /// Read-only access to the registry, e.g. for `GET /containers/json`.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Read-only access to the layer store, e.g. for the build executor.
    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Read-only access to the image catalog, e.g. for `GET /images/json`.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn container_dir(&self, id: &str) -> PathBuf {
        self.state_root.join("containers").join(id)
    }

    fn log_path(&self, id: &str) -> PathBuf {
        self.state_root.join("logs").join(format!("{id}.log"))
    }

    /// Creates a container record in `Created` state: resolves the image,
    /// materializes its rootfs, resolves the effective command.
    pub fn create(&self, spec: CreateSpec) -> Result<Container> {
        if spec.image.trim().is_empty() {
            return Err(Error::InvalidArgument("image reference is required".into()));
        }

        let image = self
            .catalog
            .lookup_any(&spec.image)
            .map_err(|_| Error::NotFound(format!("image not found: {}", spec.image)))?;

        let id = generate_id(&spec.image);
        let dir = self.container_dir(&id);
        let rootfs = dir.join("rootfs");
        std::fs::create_dir_all(&rootfs)?;

        for layer_id in &image.layers {
            self.layers.extract(layer_id, &rootfs)?;
        }

        // Command precedence: explicit override > image CMD > image
        // entrypoint > engine default.
        let command = if !spec.command.is_empty() {
            spec.command
        } else if !image.config.cmd.is_empty() {
            image.config.cmd.clone()
        } else if !image.config.entrypoint.is_empty() {
            image.config.entrypoint.clone()
        } else {
            vec!["/bin/sh".to_owned()]
        };

        let mut env = image.config.env.clone();
        env.extend(spec.env);

        let working_dir = spec.working_dir.or_else(|| image.config.working_dir.clone());
        let name = spec.name.unwrap_or_else(|| id.clone());

        let record = Container {
            id: id.clone(),
            name,
            image: image.reference(),
            command,
            working_dir,
            env,
            port_bindings: spec.port_bindings,
            binds: spec.binds,
            tty: spec.tty,
            interactive: spec.interactive,
            detach: spec.detach,
            resources: spec.resources,
            state: State::Created,
            pid: None,
            rootfs,
            log_path: self.log_path(&id),
            created: now_rfc3339(),
            started: None,
            finished: None,
            exit_code: None,
            error: None,
        };
        self.registry.create_record(&record)?;
        Ok(record)
    }

    /// Starts a `Created` or `Exited` container.
    pub fn start(&self, id: &str) -> Result<()> {
        let mut record = self.registry.resolve(id)?;
        if !matches!(record.state, State::Created | State::Exited) {
            return Err(Error::Conflict(format!(
                "cannot start container in state {}",
                record.state
            )));
        }

        crate::cgroup::setup(&record.id, &record.resources)?;

        let dir = self.container_dir(&record.id);
        std::fs::create_dir_all(&dir)?;
        let pid_file = dir.join("pid");
        let _ = std::fs::remove_file(&pid_file);

        let spec = ChildSpec {
            container_id: record.id.clone(),
            rootfs: record.rootfs.clone(),
            hostname: record.name.clone(),
            command: record.command.clone(),
            working_dir: record.working_dir.clone(),
            env: record.env.clone(),
            shell: record.tty || record.interactive,
            log_path: record.log_path.clone(),
            pid_file: pid_file.clone(),
            resources: record.resources,
        };
        let spec_path = dir.join("spec.json");
        std::fs::write(&spec_path, serde_json::to_vec(&spec)?)?;

        let mut child = match namespaces::spawn(&self.shim_path, &spec_path) {
            Ok(child) => child,
            Err(e) => {
                record.state = State::Created;
                record.error = Some(format!("start failed: {e}"));
                self.registry.update(&record)?;
                return Err(e);
            }
        };

        let container_pid = match wait_for_pid_file(&pid_file, PID_FILE_TIMEOUT) {
            Ok(pid) => pid,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                record.state = State::Created;
                record.error = Some(format!("start failed: {e}"));
                self.registry.update(&record)?;
                return Err(e);
            }
        };

        record.state = State::Running;
        record.pid = Some(container_pid);
        record.started = Some(now_rfc3339());
        record.finished = None;
        record.exit_code = None;
        record.error = None;
        self.registry.update(&record)?;
        self.running.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(record.id.clone(), container_pid);

        info!("container {} started, pid {container_pid}", record.id);

        if record.detach {
            let registry_root = self.state_root.clone();
            let id = record.id.clone();
            std::thread::spawn(move || reap_in_background(registry_root, id, child));
            return Ok(());
        }

        let status = child.wait()?;
        finish_record(&self.registry, &record.id, exit_code_of(&status))?;
        self.running.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&record.id);
        crate::cgroup::teardown(&record.id);
        Ok(())
    }

    /// Sends SIGTERM to the container's pid, waits up to `grace`, then
    /// SIGKILL. Idempotent on already-stopped containers.
    pub fn stop(&self, id: &str, grace: Option<Duration>) -> Result<()> {
        let mut record = self.registry.resolve(id)?;
        if !record.state.has_live_process() {
            warn!("stop: container {} already stopped", record.id);
            return Ok(());
        }

        let Some(pid) = record.pid else {
            record.state = State::Exited;
            self.registry.update(&record)?;
            return Ok(());
        };

        let target = Pid::from_raw(pid);
        if kill(target, Signal::SIGTERM).is_ok() {
            let grace = grace.unwrap_or(DEFAULT_GRACE_PERIOD);
            let deadline = std::time::Instant::now() + grace;
            while std::time::Instant::now() < deadline {
                if kill(target, None).is_err() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            if kill(target, None).is_ok() {
                let _ = kill(target, Signal::SIGKILL);
            }
        }

        record.state = State::Exited;
        record.finished = Some(now_rfc3339());
        self.registry.update(&record)?;
        self.running.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&record.id);
        crate::cgroup::teardown(&record.id);
        Ok(())
    }

    /// Deletes a stopped container's rootfs, log file, and metadata.
    pub fn remove(&self, id: &str) -> Result<()> {
        let record = self.registry.resolve(id)?;
        if record.state.has_live_process() {
            return Err(Error::Conflict(format!(
                "cannot remove container in state {}",
                record.state
            )));
        }

        let cleanup = (|| -> std::io::Result<()> {
            if record.rootfs.is_dir() {
                std::fs::remove_dir_all(&record.rootfs)?;
            }
            if record.log_path.is_file() {
                std::fs::remove_file(&record.log_path)?;
            }
            let dir = self.container_dir(&record.id);
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir)?;
            }
            Ok(())
        })();

        if let Err(e) = cleanup {
            let mut dead = record.clone();
            dead.state = State::Dead;
            dead.error = Some(format!("cleanup failed: {e}"));
            let _ = self.registry.update(&dead);
            return Err(Error::Internal(format!("remove cleanup failed: {e}")));
        }

        self.registry.delete(&record.id)?;
        Ok(())
    }

    /// Joins the target container's mount and UTS namespaces and execs
    /// `command`, returning its exit code. The new process becomes PID 1
    /// of a fresh PID namespace nested under the target's view.
    /// `extra_env` is appended to the container's recorded environment.
    pub fn exec(&self, id: &str, command: Vec<String>, extra_env: Vec<String>) -> Result<i32> {
        let record = self.registry.resolve(id)?;
        if record.state != State::Running {
            return Err(Error::Conflict(format!(
                "cannot exec in container in state {}",
                record.state
            )));
        }
        let Some(pid) = record.pid else {
            return Err(Error::Conflict("container has no live process".into()));
        };
        let mut env = record.env.clone();
        env.extend(extra_env);
        crate::exec::exec_in(pid, &command, &env)
    }

    /// Reads the container's combined stdout/stderr log.
    pub fn logs(&self, id: &str) -> Result<Vec<u8>> {
        let record = self.registry.resolve(id)?;
        Ok(std::fs::read(&record.log_path).unwrap_or_default())
    }

    /// Commits a container's current rootfs as a new image under
    /// `name[:tag]`. The rootfs is captured whole as a single new layer
    /// (the layer store has no diffing mechanism, so this is not an
    /// incremental commit); the runtime config of the image the container
    /// was created from is carried forward unchanged.
    pub fn commit(
        &self,
        id: &str,
        name: &str,
        tag: Option<&str>,
        message: Option<&str>,
    ) -> Result<Image> {
        let record = self.registry.resolve(id)?;
        let source = self.catalog.lookup_any(&record.image)?;
        let instruction = match message {
            Some(m) => format!("commit: {m}"),
            None => "commit".to_owned(),
        };
        let layer_id = self.layers.create(None, &instruction, Some(&record.rootfs))?;
        Ok(self.catalog.create(name, tag, vec![layer_id], source.config)?)
    }
}

fn wait_for_pid_file(path: &Path, timeout: Duration) -> Result<i32> {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if let Ok(data) = std::fs::read_to_string(path)
            && let Ok(pid) = data.trim().parse::<i32>()
        {
            return Ok(pid);
        }
        if std::time::Instant::now() >= deadline {
            return Err(Error::Internal(
                "timed out waiting for container process to report its pid".into(),
            ));
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn exit_code_of(status: &std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.code().or_else(|| status.signal().map(|s| 128 + s)).unwrap_or(-1)
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(-1)
    }
}

fn finish_record(registry: &Registry, id: &str, code: i32) -> Result<()> {
    let mut record = registry.resolve(id)?;
    record.state = State::Exited;
    record.exit_code = Some(code);
    record.finished = Some(now_rfc3339());
    record.pid = None;
    registry.update(&record)
}

/// Background reaper for `detach=true` starts: waits on the shim child and
/// updates the record once it exits.
fn reap_in_background(state_root: PathBuf, id: String, mut child: std::process::Child) {
    let status = match child.wait() {
        Ok(status) => status,
        Err(e) => {
            warn!("reaper: failed to wait for container {id}: {e}");
            return;
        }
    };
    let Ok(registry) = Registry::open(&state_root) else {
        return;
    };
    if let Err(e) = finish_record(&registry, &id, exit_code_of(&status)) {
        warn!("reaper: failed to update container {id}: {e}");
    }
    crate::cgroup::teardown(&id);
}

/// Current time as RFC3339 (UTC, second precision), hand-rolled to avoid
/// pulling in a datetime crate for one formatting helper.
fn now_rfc3339() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let epoch_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let days = epoch_secs / 86400;
    let rem = epoch_secs % 86400;
    let (hour, minute, second) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    let z = days as i64 + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{y:04}-{m:02}-{d:02}T{hour:02}:{minute:02}:{second:02}Z")
}
