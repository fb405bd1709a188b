//! Namespace and pivot-root mechanics for starting a container process.
//!
//! The daemon is a multi-threaded tokio process, so it never calls
//! `fork()` directly — forking a multi-threaded process is undefined
//! behavior the moment another thread holds a lock the child can't release.
//! Instead the daemon `exec`s a fresh helper binary (`hold-shim`).
//! `hold-shim` is freshly exec'd and single-threaded, so the classic
//! double-fork dance to enter a new PID namespace is safe there.
//!
//! Sequence:
//! 1. Daemon: `Command::new(hold-shim).arg(spec_path)`, with a `pre_exec`
//!    hook that calls `unshare(CLONE_NEWUTS | CLONE_NEWNS)` — these two
//!    namespaces take effect for the calling process immediately, unlike
//!    PID namespaces.
//! 2. `hold-shim` (now running inside its own mount/UTS namespace): reads
//!    and deletes the [`ChildSpec`] file, calls `unshare(CLONE_NEWPID)`,
//!    then `fork()`s. The fork is safe here because `hold-shim` is a fresh,
//!    single-threaded process.
//! 3. The fork's parent writes the child's pid to `spec.pid_file` (so the
//!    daemon can later signal or `setns` into it) and waits for it,
//!    exiting with its status.
//! 4. The fork's child is PID 1 of the new PID namespace: it sets the
//!    hostname, remounts `/` private+recursive, bind-mounts the rootfs onto
//!    itself, pivots root, mounts `/proc`, joins the prepared cgroup,
//!    applies env/workdir, and execs the resolved command.

use std::ffi::CString;
use std::fs;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::Command;

use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::sched::CloneFlags;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid};

use crate::error::{Error, Result};

/// Everything `hold-shim` needs to bring a container process up. Written
/// by the engine to a temp JSON file and read (then deleted) by the shim.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChildSpec {
    /// Container id, used for the cgroup directory name.
    pub container_id: String,
    /// Extracted rootfs directory to pivot into.
    pub rootfs: PathBuf,
    /// Hostname to set inside the UTS namespace.
    pub hostname: String,
    /// Resolved argv to exec.
    pub command: Vec<String>,
    /// Working directory inside the container, relative to its rootfs.
    pub working_dir: Option<String>,
    /// Environment variables, `KEY=VALUE` form.
    pub env: Vec<String>,
    /// Whether to run the command through a shell (interactive/tty).
    pub shell: bool,
    /// Path to redirect stdout/stderr to.
    pub log_path: PathBuf,
    /// Path the shim writes the container's real pid (PID 1) to, once
    /// known, so the daemon can signal or `setns` into it later.
    pub pid_file: PathBuf,
    /// Resource limits, already written to the cgroup by the parent before
    /// `hold-shim` was spawned; only the join step happens here.
    pub resources: crate::container::ResourceLimits,
}

/// Spawns `hold-shim` against `spec`, which has already been serialized to
/// `spec_path`. Returns the spawned (host-pid-namespace) child handle; the
/// caller owns it and is responsible for waiting on it.
pub fn spawn(shim_path: &Path, spec_path: &Path) -> Result<std::process::Child> {
    let mut cmd = Command::new(shim_path);
    cmd.arg(spec_path);

    // SAFETY: unshare() is async-signal-safe and touches only this process's
    // namespace membership; no allocation beyond the already-captured flags.
    //
    // Deliberately no PR_SET_PDEATHSIG here: running containers must
    // survive a daemon restart, supervised by init once the daemon exits,
    // so the shim must not die with its parent.
    unsafe {
        cmd.pre_exec(|| {
            nix::sched::unshare(CloneFlags::CLONE_NEWUTS | CloneFlags::CLONE_NEWNS)
                .map_err(std::io::Error::from)?;
            Ok(())
        });
    }

    cmd.spawn().map_err(Error::Io)
}

/// Entered by `hold-shim`'s `main()`. Never returns on success: either the
/// grandchild execs the user command, or this process (the fork's parent)
/// exits with the grandchild's status.
pub fn enter_and_run(spec: &ChildSpec) -> Result<()> {
    nix::sched::unshare(CloneFlags::CLONE_NEWPID)?;

    // SAFETY: the immediate next steps in each branch are either a wait
    // loop (parent) or namespace/mount/exec setup (child) — no unsafe
    // Rust-runtime state is shared in a way that matters post-fork.
    match unsafe { nix::unistd::fork() }? {
        ForkResult::Parent { child } => {
            write_pid_file(&spec.pid_file, child)?;
            let status = wait_for(child)?;
            std::process::exit(status);
        }
        ForkResult::Child => {
            match run_init(spec) {
                Ok(()) => unreachable!("execve replaces the process on success"),
                Err(e) => {
                    log::error!("container init failed: {e}");
                    std::process::exit(127);
                }
            }
        }
    }
}

fn write_pid_file(path: &Path, pid: Pid) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, pid.as_raw().to_string())?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn wait_for(pid: Pid) -> Result<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(128 + sig as i32),
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(Error::Syscall(e)),
        }
    }
}

/// Runs as PID 1 of the new PID namespace: mounts, pivots, joins the
/// cgroup, and execs the resolved command. Only returns on failure.
fn run_init(spec: &ChildSpec) -> Result<()> {
    nix::unistd::sethostname(&spec.hostname)?;

    // Make our mount namespace private+recursive so later mounts here
    // don't propagate to (or get undone by) the host.
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_PRIVATE | MsFlags::MS_REC,
        None::<&str>,
    )?;

    // Bind-mount the rootfs onto itself so it qualifies as a mount point
    // for pivot_root. A tmpfs at a separate scratch dir would hide the
    // already-extracted layer content, so we reuse the populated directory.
    mount(
        Some(&spec.rootfs),
        &spec.rootfs,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )?;

    let old_root = spec.rootfs.join(".hold-old-root");
    fs::create_dir_all(&old_root)?;
    nix::unistd::pivot_root(&spec.rootfs, &old_root)?;
    nix::unistd::chdir("/")?;

    let old_root_after_pivot = Path::new("/.hold-old-root");
    umount2(old_root_after_pivot, MntFlags::MNT_DETACH)?;
    let _ = fs::remove_dir(old_root_after_pivot);

    mount(
        Some("proc"),
        "/proc",
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .or_else(|e| if e == nix::errno::Errno::EBUSY { Ok(()) } else { Err(e) })?;

    crate::cgroup::join(&spec.container_id, &spec.resources, std::process::id() as i32)?;

    if let Some(ref wd) = spec.working_dir
        && !wd.is_empty()
    {
        nix::unistd::chdir(wd.as_str()).or_else(|_| nix::unistd::chdir("/"))?;
    }

    redirect_logs(&spec.log_path)?;

    exec_command(&spec.command, &spec.env, spec.shell)
}

fn redirect_logs(log_path: &Path) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let fd = file.as_raw_fd();
    nix::unistd::dup2(fd, 1)?;
    nix::unistd::dup2(fd, 2)?;
    Ok(())
}

/// Execs the resolved command, never returning on success.
fn exec_command(command: &[String], env: &[String], shell: bool) -> Result<()> {
    if command.is_empty() {
        return Err(Error::InvalidArgument("no command to exec".to_owned()));
    }

    let argv: Vec<String> = if shell {
        vec!["/bin/sh".to_owned(), "-c".to_owned(), command.join(" ")]
    } else {
        command.to_vec()
    };

    close_inherited_fds();

    let program = to_cstring(&argv[0])?;
    let args: Vec<CString> = argv.iter().map(|a| to_cstring(a)).collect::<Result<_>>()?;
    let envp: Vec<CString> = env.iter().map(|e| to_cstring(e)).collect::<Result<_>>()?;

    nix::unistd::execve(&program, &args, &envp)?;
    Ok(())
}

/// Closes any file descriptor above stderr the shim inherited (from the
/// daemon's listener socket, pipes, etc.) before handing the process over
/// to the container's command.
fn close_inherited_fds() {
    // SAFETY: close_range is async-signal-safe and only affects this
    // process's own descriptor table.
    let ret = unsafe { libc::syscall(libc::SYS_close_range, 3_u32, u32::MAX, 0_u32) };
    if ret != 0 {
        for fd in 3..1024 {
            unsafe { libc::close(fd) };
        }
    }
}

fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidArgument(format!("NUL byte in argument: {s:?}")))
}
