//! Cgroup v2 resource-limit enforcement.
//!
//! Mirrors the control-file sequence of the reference prototype's own
//! cgroup setup: enable controllers in the parent's `cgroup.subtree_control`,
//! create a child group, write the limit files, then move a pid in via
//! `cgroup.procs`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::container::ResourceLimits;
use crate::error::Result;

/// Base path for all hold-managed cgroups.
const CGROUP_BASE: &str = "/sys/fs/cgroup/hold";

/// Returns the cgroup directory for a given container id.
pub fn cgroup_path(container_id: &str) -> PathBuf {
    Path::new(CGROUP_BASE).join(container_id)
}

/// Creates the cgroup for `container_id` and writes the given limits.
/// No-op (returns `Ok`) if no limit is set.
pub fn setup(container_id: &str, limits: &ResourceLimits) -> Result<()> {
    if !limits.any_set() {
        return Ok(());
    }

    fs::create_dir_all(CGROUP_BASE)?;
    enable_controllers(Path::new(CGROUP_BASE), &["memory", "cpu", "pids"])?;

    let group = cgroup_path(container_id);
    fs::create_dir_all(&group)?;

    if limits.memory_limit > 0 {
        fs::write(group.join("memory.max"), limits.memory_limit.to_string())?;
    }
    if limits.cpu_limit > 0.0 {
        let quota = (limits.cpu_limit * 100_000.0) as u64;
        fs::write(group.join("cpu.max"), format!("{quota} 100000"))?;
    }
    if limits.pid_limit > 0 {
        fs::write(group.join("pids.max"), limits.pid_limit.to_string())?;
    }

    Ok(())
}

/// Writes `pid` into the container's `cgroup.procs`, joining the group.
/// No-op if no limit is set (the group was never created).
pub fn join(container_id: &str, limits: &ResourceLimits, pid: i32) -> Result<()> {
    if !limits.any_set() {
        return Ok(());
    }
    let procs = cgroup_path(container_id).join("cgroup.procs");
    fs::write(procs, pid.to_string())?;
    Ok(())
}

/// Removes the container's cgroup directory. Best-effort: teardown
/// failures are not surfaced to the caller.
pub fn teardown(container_id: &str) {
    let _ = fs::remove_dir(cgroup_path(container_id));
}

/// Enables the given controllers in `parent`'s `cgroup.subtree_control`,
/// e.g. writing `+memory +cpu +pids`. Ignores failures for controllers the
/// host kernel does not expose — controllers are only enabled for limits
/// that are actually non-zero.
fn enable_controllers(parent: &Path, names: &[&str]) -> Result<()> {
    let control = parent.join("cgroup.subtree_control");
    for name in names {
        let _ = fs::write(&control, format!("+{name}"));
    }
    Ok(())
}
