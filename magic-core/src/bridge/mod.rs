//! The session itself.
//!
//! [`PtyBridge::run`] owns one wrapped-shell session from start to finish:
//!
//! 1. put the real terminal in raw mode (fatal on failure)
//! 2. build the launch plan and spawn the shell on a PTY (fatal on failure)
//! 3. run the two forwarding loops until either stops, or until SIGTERM /
//!    SIGHUP; SIGWINCH is applied to the PTY along the way
//! 4. stop both loops, close the PTY, reap the shell, restore the terminal
//!
//! Only steps 1 and 2 can fail the call. Everything after the spawn ends
//! with the shell's exit code.

pub mod forwarder;
pub mod observer;
pub mod supervisor;

use std::fs::File;
use std::io;
use std::os::fd::AsFd;
use std::path::PathBuf;

use serde::Serialize;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::hooks::{HookRegistry, ShellLaunch};
use crate::pty_manager::PtyManager;
use crate::shell::ResolvedShell;
use crate::term::size::window_size_or_default;
use crate::term::TerminalModeController;

pub use forwarder::{ExitReason, Forwarder, LoopExit, OutputRelay, Side};
pub use observer::{Observer, ObserverSet};
pub use supervisor::ExitStatus;

/// Everything a session is built from.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub shell: ResolvedShell,
    /// Experimental features flag. Reported, never acted on.
    pub stage: bool,
    /// Inject hooks when the shell supports them.
    pub hooks: bool,
}

impl BridgeConfig {
    pub fn new(shell: ResolvedShell) -> Self {
        Self {
            shell,
            stage: false,
            hooks: true,
        }
    }

    pub fn stage(mut self, stage: bool) -> Self {
        self.stage = stage;
        self
    }

    pub fn hooks(mut self, hooks: bool) -> Self {
        self.hooks = hooks;
        self
    }
}

/// What `--info` prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellInfo {
    pub path: PathBuf,
    pub name: String,
    pub stage_mode: bool,
    pub hooks_supported: bool,
}

pub struct PtyBridge {
    config: BridgeConfig,
    registry: HookRegistry,
    observers: ObserverSet,
}

impl std::fmt::Debug for PtyBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyBridge")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl PtyBridge {
    /// Bridge with the built-in bash/zsh/fish hooks.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_registry(config, HookRegistry::default())
    }

    pub fn with_registry(config: BridgeConfig, registry: HookRegistry) -> Self {
        Self {
            config,
            registry,
            observers: ObserverSet::new(),
        }
    }

    /// Register an observer. Observers are called in subscription order.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.subscribe(observer);
    }

    pub fn shell_info(&self) -> ShellInfo {
        ShellInfo {
            path: self.config.shell.path.clone(),
            name: self.config.shell.name.clone(),
            stage_mode: self.config.stage,
            hooks_supported: self.registry.supports_hooks(&self.config.shell.name),
        }
    }

    /// The launch plan this bridge would use.
    pub fn launch(&self) -> ShellLaunch {
        if self.config.hooks {
            ShellLaunch::prepare(&self.config.shell, &self.registry)
        } else {
            ShellLaunch::plain(&self.config.shell)
        }
    }

    /// Run one session on the process's own terminal. Returns the exit code
    /// the program should end with.
    pub async fn run(self) -> Result<i32, BridgeError> {
        let launch = self.launch();
        let Self {
            config, observers, ..
        } = self;

        info!(
            "starting {} (hooks: {}, stage: {})",
            config.shell.path.display(),
            launch.hooked(),
            config.stage
        );

        let input = dup_stdio(io::stdin().as_fd()).map_err(|e| BridgeError::terminal_setup("dup stdin", e))?;
        let output = dup_stdio(io::stdout().as_fd()).map_err(|e| BridgeError::terminal_setup("dup stdout", e))?;

        // Restores on every return path below, via Drop.
        let mut terminal = TerminalModeController::stdin()?;
        terminal.enter_raw()?;
        let size = window_size_or_default(&terminal);

        let mut winch = listen(SignalKind::window_change());
        let mut term = listen(SignalKind::terminate());
        let mut hup = listen(SignalKind::hangup());

        let pty = PtyManager::spawn(&launch, size)?;
        if observers.is_empty() {
            debug!("shell pid {} has no observers, timing events are dropped", pty.pid());
        }
        let pty_in = pty.writer().map_err(|e| BridgeError::spawn("dup pty", e))?;
        let pty_out = pty.reader().map_err(|e| BridgeError::spawn("dup pty", e))?;
        let mut forwarder = Forwarder::start(input, pty_in, pty_out, output, observers)?;

        loop {
            tokio::select! {
                exit = forwarder.next_exit() => {
                    if let Some(exit) = exit {
                        log_exit(&exit);
                    }
                    break;
                }
                _ = next_signal(&mut winch) => supervisor::on_resize(&terminal, &pty),
                _ = next_signal(&mut term) => {
                    info!("SIGTERM received, ending session");
                    break;
                }
                _ = next_signal(&mut hup) => {
                    info!("SIGHUP received, ending session");
                    break;
                }
            }
        }

        for exit in forwarder.shutdown().await {
            log_exit(&exit);
        }

        let code = supervisor::reap(pty).await;
        terminal.restore();
        drop(launch);

        info!("session ended with exit code {}", code);
        Ok(code)
    }
}

fn dup_stdio(fd: std::os::fd::BorrowedFd<'_>) -> io::Result<File> {
    Ok(File::from(fd.try_clone_to_owned()?))
}

fn listen(kind: SignalKind) -> Option<Signal> {
    match signal(kind) {
        Ok(sig) => Some(sig),
        Err(e) => {
            warn!("cannot listen for signal {:?}: {}", kind, e);
            None
        }
    }
}

/// Resolves on the next delivery; never, if we are not listening.
async fn next_signal(sig: &mut Option<Signal>) {
    if let Some(sig) = sig {
        if sig.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await
}

fn log_exit(exit: &LoopExit) {
    match &exit.reason {
        ExitReason::Failed(e) => warn!("{:?} loop: {}", exit.side, e),
        reason => debug!("{:?} loop stopped: {:?}", exit.side, reason),
    }
}
