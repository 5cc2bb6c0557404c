//! magic-core: a transparent PTY bridge around an interactive shell.
//!
//! The wrapped shell runs on a fresh pseudo-terminal; every byte typed goes
//! to it unchanged, every byte it prints comes back unchanged, except for the
//! four OSC 133 markers injected shell hooks print around commands and
//! prompts. Those are stripped from the stream and delivered to observers as
//! [`TimingEvent`]s.

#[cfg(not(unix))]
compile_error!("magic-core needs a Unix PTY (openpty, termios, TIOCSWINSZ)");

pub mod bridge;
pub mod error;
pub mod hooks;
pub mod pty_manager;
pub mod shell;
pub mod term;

use std::time::Instant;

pub use bridge::{BridgeConfig, ExitStatus, Observer, PtyBridge, ShellInfo};
pub use error::BridgeError;
pub use hooks::{HookProfile, HookRegistry, ShellFamily, ShellLaunch};
pub use shell::{LoginShellLocator, ResolvedShell, ShellLocator};
pub use term::MarkerKind;

/// A marker seen in the shell's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingEvent {
    pub kind: MarkerKind,
    /// When the output loop reached the marker.
    pub at: Instant,
}

impl TimingEvent {
    pub fn new(kind: MarkerKind, at: Instant) -> Self {
        Self { kind, at }
    }

    pub fn now(kind: MarkerKind) -> Self {
        Self::new(kind, Instant::now())
    }
}
