// magic-core/src/shell.rs

use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags, Uid, User};
use serde::Serialize;
use tracing::debug;

use crate::error::BridgeError;

/// Tried in order after the passwd entry and `$SHELL`.
const COMMON_SHELLS: &[&str] = &[
    "/bin/bash",
    "/usr/bin/bash",
    "/bin/zsh",
    "/usr/bin/zsh",
    "/bin/sh",
];

/// The shell a session will run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedShell {
    pub path: PathBuf,
    /// Executable basename, e.g. `bash`. Hook profiles are keyed on it.
    pub name: String,
}

impl ResolvedShell {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }
}

/// Finds the shell to wrap.
pub trait ShellLocator {
    fn resolve(&self, requested: Option<&Path>) -> Result<ResolvedShell, BridgeError>;
}

/// Requested path if given, otherwise the user's login shell with fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoginShellLocator;

impl ShellLocator for LoginShellLocator {
    fn resolve(&self, requested: Option<&Path>) -> Result<ResolvedShell, BridgeError> {
        if let Some(path) = requested {
            if is_usable(path) {
                return Ok(ResolvedShell::from_path(path));
            }
            return Err(BridgeError::Resolution(format!(
                "requested shell '{}' is not available or not executable",
                path.display()
            )));
        }

        let candidates = login_shell()
            .into_iter()
            .chain(std::env::var_os("SHELL").map(PathBuf::from))
            .chain(COMMON_SHELLS.iter().map(PathBuf::from));

        for candidate in candidates {
            if is_usable(&candidate) {
                debug!("resolved shell {}", candidate.display());
                return Ok(ResolvedShell::from_path(candidate));
            }
        }

        Err(BridgeError::Resolution(
            "could not detect any available shell".to_string(),
        ))
    }
}

/// Exists, is a regular file, and we may execute it.
pub fn is_usable(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

fn login_shell() -> Option<PathBuf> {
    match User::from_uid(Uid::current()) {
        Ok(Some(user)) => Some(user.shell),
        _ => None,
    }
}
