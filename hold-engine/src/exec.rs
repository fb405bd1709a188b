//! `exec` — joins a running container's mount and UTS namespaces and execs
//! an additional command inside them.
//!
//! Contract: the executed process shares the target container's view of
//! mount, UTS, and PID namespaces — it lands among the container's own
//! processes rather than becoming PID 1 of a fresh namespace.

use std::ffi::CString;
use std::fs::File;
use std::os::fd::AsFd;

use nix::sched::CloneFlags;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::ForkResult;

use crate::error::{Error, Result};

/// Opens, `setns`s into, and execs `command` inside the mount, UTS, and PID
/// namespaces of the process identified by `target_pid`. Blocks until the
/// executed command exits and returns its exit code.
pub fn exec_in(target_pid: i32, command: &[String], env: &[String]) -> Result<i32> {
    if command.is_empty() {
        return Err(Error::InvalidArgument("no command given to exec".to_owned()));
    }

    let uts = File::open(format!("/proc/{target_pid}/ns/uts"))?;
    let mnt = File::open(format!("/proc/{target_pid}/ns/mnt"))?;
    let pid = File::open(format!("/proc/{target_pid}/ns/pid"))?;

    // SAFETY: the child branch only calls async-signal-safe syscalls
    // (setns, fork, execve) before either execing or exiting.
    match unsafe { nix::unistd::fork() }? {
        ForkResult::Parent { child } => Ok(wait_for(child)?),
        ForkResult::Child => match join_and_exec(&uts, &mnt, &pid, command, env) {
            Ok(()) => unreachable!("execve replaces the process on success"),
            Err(e) => {
                log::error!("exec: failed to join container namespaces: {e}");
                std::process::exit(127);
            }
        },
    }
}

fn join_and_exec(
    uts: &File,
    mnt: &File,
    pid: &File,
    command: &[String],
    env: &[String],
) -> Result<()> {
    nix::sched::setns(uts.as_fd(), CloneFlags::CLONE_NEWUTS)?;
    nix::sched::setns(mnt.as_fd(), CloneFlags::CLONE_NEWNS)?;
    // setns(CLONE_NEWPID) only takes effect for processes forked after this
    // call, not the caller itself — the inner fork below is what actually
    // lands inside the target's PID namespace.
    nix::sched::setns(pid.as_fd(), CloneFlags::CLONE_NEWPID)?;

    // SAFETY: same reasoning as the outer fork — the grandchild either
    // execs or exits immediately, the parent only waits.
    match unsafe { nix::unistd::fork() }? {
        ForkResult::Parent { child } => {
            let status = wait_for(child)?;
            std::process::exit(status);
        }
        ForkResult::Child => exec_command(command, env),
    }
}

fn exec_command(command: &[String], env: &[String]) -> Result<()> {
    let program = to_cstring(&command[0])?;
    let args: Vec<CString> = command.iter().map(|a| to_cstring(a)).collect::<Result<_>>()?;
    let envp: Vec<CString> = env.iter().map(|e| to_cstring(e)).collect::<Result<_>>()?;
    nix::unistd::execve(&program, &args, &envp)?;
    Ok(())
}

fn wait_for(pid: nix::unistd::Pid) -> Result<i32> {
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

fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidArgument(format!("NUL byte in argument: {s:?}")))
}
