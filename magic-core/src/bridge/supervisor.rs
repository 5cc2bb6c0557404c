// magic-core/src/bridge/supervisor.rs

use std::io;
use std::os::fd::AsFd;
use std::os::unix::process::ExitStatusExt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::pty_manager::PtyManager;
use crate::term::size::{set_window_size, window_size, WindowSize};

/// How the wrapped shell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
}

impl ExitStatus {
    pub fn from_std(status: std::process::ExitStatus) -> Option<Self> {
        if let Some(code) = status.code() {
            Some(ExitStatus::Exited(code))
        } else {
            status.signal().map(ExitStatus::Signaled)
        }
    }

    /// Shell convention: the code itself, or 128 + signal.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Exited(code) => code,
            ExitStatus::Signaled(signal) => 128 + signal,
        }
    }
}

/// Map a reap result to the code we exit with. Anything unexpected is 1.
pub fn exit_code(reaped: io::Result<std::process::ExitStatus>) -> i32 {
    match reaped {
        Ok(status) => match ExitStatus::from_std(status) {
            Some(status) => status.code(),
            None => {
                warn!("shell ended with unrecognised status {:?}", status);
                1
            }
        },
        Err(e) => {
            warn!("could not reap shell: {}", e);
            1
        }
    }
}

/// Window size of the real terminal. A 0x0 report counts as an error.
pub fn terminal_size<S: AsFd>(source: S) -> Result<WindowSize, BridgeError> {
    let size = window_size(source).map_err(BridgeError::Resize)?;
    if size.rows == 0 || size.cols == 0 {
        return Err(BridgeError::Resize(io::Error::new(
            io::ErrorKind::InvalidData,
            "terminal reports a 0x0 window",
        )));
    }
    Ok(size)
}

/// Copy the window size of `source` onto `target`.
pub fn sync_window_size<S: AsFd, T: AsFd>(source: S, target: T) -> Result<WindowSize, BridgeError> {
    let size = terminal_size(source)?;
    set_window_size(target, size).map_err(BridgeError::Resize)?;
    Ok(size)
}

/// SIGWINCH handler body. Never fails the session.
pub fn on_resize<S: AsFd>(terminal: S, pty: &PtyManager) {
    let resized = terminal_size(terminal).and_then(|size| {
        pty.resize(size).map_err(BridgeError::Resize)?;
        Ok(size)
    });
    match resized {
        Ok(size) => debug!("pty of pid {} resized to {}x{}", pty.pid(), size.cols, size.rows),
        Err(e) => debug!("{}", e),
    }
}

/// Close the PTY, wait for the shell off the runtime threads, map the result.
pub async fn reap(pty: PtyManager) -> i32 {
    match tokio::task::spawn_blocking(move || pty.reap()).await {
        Ok(reaped) => exit_code(reaped),
        Err(e) => {
            warn!("reaper task failed: {}", e);
            1
        }
    }
}
