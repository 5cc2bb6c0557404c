// magic-core/src/pty_manager.rs

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, ExitStatus, Stdio};

use nix::pty::openpty;
use tracing::debug;

use crate::error::BridgeError;
use crate::hooks::ShellLaunch;
use crate::term::size::{set_window_size, WindowSize};

/// A shell running on the secondary side of a fresh PTY.
///
/// We keep the primary side and the child handle. The parent's copies of the
/// secondary side are gone once `spawn` returns, so the primary reads EOF
/// (or EIO) when the shell and everything it started have exited.
pub struct PtyManager {
    master: Option<OwnedFd>,
    child: Child,
}

impl std::fmt::Debug for PtyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyManager")
            .field("master", &self.master)
            .field("pid", &self.child.id())
            .finish()
    }
}

impl PtyManager {
    /// Open a PTY sized `size` and start `launch` on it as a session leader
    /// with the secondary side as its controlling terminal.
    pub fn spawn(launch: &ShellLaunch, size: WindowSize) -> Result<Self, BridgeError> {
        let pty = openpty(&size.to_winsize(), None).map_err(|e| BridgeError::spawn("openpty", e))?;

        // openpty(3) fds are inheritable; re-dup everything close-on-exec so the
        // shell only ever sees the secondary side on 0/1/2.
        let master = pty
            .master
            .try_clone()
            .map_err(|e| BridgeError::spawn("dup pty", e))?;
        let slave = pty
            .slave
            .try_clone()
            .map_err(|e| BridgeError::spawn("dup pty", e))?;
        drop(pty);

        let stdin = slave.try_clone().map_err(|e| BridgeError::spawn("dup pty", e))?;
        let stdout = slave.try_clone().map_err(|e| BridgeError::spawn("dup pty", e))?;
        let stderr = slave;

        let mut cmd = launch.command();
        cmd.stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // SAFETY: only async-signal-safe calls between fork and exec.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(io::Error::from)?;
                if libc::ioctl(0, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|e| BridgeError::spawn("exec shell", e))?;
        // Dropping the command closes our copies of the secondary side.
        drop(cmd);

        debug!(
            "spawned {} (pid {}) on a {}x{} pty",
            launch.program().display(),
            child.id(),
            size.cols,
            size.rows
        );

        Ok(Self {
            master: Some(master),
            child,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// The primary side, until `reap` closes it.
    pub fn master(&self) -> Option<BorrowedFd<'_>> {
        self.master.as_ref().map(AsFd::as_fd)
    }

    /// Independent handle for reading shell output.
    pub fn reader(&self) -> io::Result<File> {
        self.clone_master()
    }

    /// Independent handle for writing keystrokes to the shell.
    pub fn writer(&self) -> io::Result<File> {
        self.clone_master()
    }

    /// Apply `size` to the PTY; the shell receives SIGWINCH.
    pub fn resize(&self, size: WindowSize) -> io::Result<()> {
        match &self.master {
            Some(master) => set_window_size(master, size),
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    /// Close the primary side, then wait for the shell.
    ///
    /// Handles from `reader`/`writer` still keep the PTY open; stop the
    /// forwarding loops first.
    pub fn reap(mut self) -> io::Result<ExitStatus> {
        drop(self.master.take());
        let status = self.child.wait()?;
        debug!("shell (pid {}) exited: {}", self.child.id(), status);
        Ok(status)
    }

    fn clone_master(&self) -> io::Result<File> {
        match &self.master {
            Some(master) => Ok(File::from(master.try_clone()?)),
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }
}
