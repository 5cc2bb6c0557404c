//! Raw-mode controller for the real terminal.
//!
//! Captures the line discipline once, switches to raw, and puts the capture
//! back exactly once: on `restore()`, or on drop if nobody called it.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use nix::sys::termios::{self, SetArg, Termios};
use tracing::{debug, warn};

use crate::error::BridgeError;

/// Opaque capture of the terminal's attributes from before raw mode.
#[derive(Debug, Clone)]
pub struct TerminalModeSnapshot(Termios);

impl TerminalModeSnapshot {
    /// Read the current attributes of `fd` without changing anything.
    pub fn capture<Fd: AsFd>(fd: Fd) -> Result<Self, BridgeError> {
        termios::tcgetattr(fd)
            .map(Self)
            .map_err(|e| BridgeError::terminal_setup("tcgetattr", e))
    }

    pub fn termios(&self) -> &Termios {
        &self.0
    }
}

#[derive(Debug)]
pub struct TerminalModeController {
    fd: OwnedFd,
    snapshot: Option<TerminalModeSnapshot>,
}

impl TerminalModeController {
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd, snapshot: None }
    }

    /// Controller for whatever terminal is on our standard input.
    pub fn stdin() -> Result<Self, BridgeError> {
        let fd = std::io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .map_err(|e| BridgeError::terminal_setup("dup stdin", e))?;
        Ok(Self::new(fd))
    }

    /// Snapshot the attributes, then switch to raw.
    ///
    /// The snapshot is kept even when the switch itself fails, so the
    /// terminal is still put back on the way out.
    pub fn enter_raw(&mut self) -> Result<(), BridgeError> {
        if self.snapshot.is_some() {
            return Ok(());
        }

        let snapshot = TerminalModeSnapshot::capture(self.fd.as_fd())?;
        let mut raw = snapshot.termios().clone();
        self.snapshot = Some(snapshot);

        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(self.fd.as_fd(), SetArg::TCSANOW, &raw)
            .map_err(|e| BridgeError::terminal_setup("tcsetattr", e))?;

        debug!("terminal switched to raw mode");
        Ok(())
    }

    pub fn is_raw(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Best effort. A second call is a no-op.
    pub fn restore(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };

        match termios::tcsetattr(self.fd.as_fd(), SetArg::TCSADRAIN, snapshot.termios()) {
            Ok(()) => debug!("terminal mode restored"),
            Err(e) => warn!("could not restore terminal mode: {}", e),
        }
    }
}

impl AsFd for TerminalModeController {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl Drop for TerminalModeController {
    fn drop(&mut self) {
        self.restore();
    }
}
