//! Execution of `RUN` instructions inside the staging rootfs.
//!
//! The spawned shell is `chroot`ed into staging via a `pre_exec` hook, the
//! same hook-after-fork-before-exec shape the engine's pre-exec hardening
//! uses, adapted here from FD/PDEATHSIG cleanup to a root-directory swap.
//! This keeps the command's writes confined to staging without paying for
//! a full namespace sandbox during build.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Runs `argument` as a shell command with its root chrooted to `staging`.
pub fn run_in_staging(staging: &Path, argument: &str, line: usize) -> Result<()> {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(argument);
    apply_chroot(&mut cmd, staging);

    let status = cmd.status()?;
    if !status.success() {
        return Err(Error::RunFailed {
            line,
            argument: argument.to_owned(),
            status: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

/// Installs a pre-exec hook that chroots into `root` and changes directory
/// to `/` before the shell takes over.
fn apply_chroot(cmd: &mut Command, root: &Path) {
    use std::os::unix::process::CommandExt;

    let root = root.to_path_buf();
    // SAFETY: chroot + chdir are async-signal-safe syscalls; no allocation
    // beyond what's already captured in `root`.
    unsafe {
        cmd.pre_exec(move || {
            nix::unistd::chroot(&root).map_err(std::io::Error::from)?;
            nix::unistd::chdir("/").map_err(std::io::Error::from)?;
            Ok(())
        });
    }
}
