use std::path::PathBuf;

use clap::Parser;
use magic_core::{BridgeConfig, BridgeError, ShellLocator};

/// Wrap your interactive shell in a transparent PTY bridge.
///
/// Everything you type and everything the shell prints passes through
/// untouched; supported shells (bash, zsh, fish) additionally report when
/// each command starts and ends.
#[derive(Parser, Debug)]
#[command(name = "magic-shell", version, about)]
pub struct Cli {
    /// Shell to wrap instead of your login shell.
    #[arg(long, env = "MAGIC_SHELL", value_name = "PATH")]
    pub shell: Option<PathBuf>,

    /// Enable experimental features.
    #[arg(long)]
    pub stage: bool,

    /// Run the shell without timing hooks.
    #[arg(long)]
    pub no_hooks: bool,

    /// Print the resolved shell as JSON and exit.
    #[arg(long)]
    pub info: bool,

    /// Write logs here instead of the default state directory.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Resolve the shell and collect the session parameters.
    pub fn bridge_config(&self, locator: &impl ShellLocator) -> Result<BridgeConfig, BridgeError> {
        let shell = locator.resolve(self.shell.as_deref())?;
        Ok(BridgeConfig::new(shell)
            .stage(self.stage)
            .hooks(!self.no_hooks))
    }
}
