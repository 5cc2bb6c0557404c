//! Log setup.
//!
//! The shell owns the screen while a session runs, so records go to a file.
//! `MAGIC_SHELL_LOG` takes an `EnvFilter` directive (default `warn`), e.g.
//! `MAGIC_SHELL_LOG=magic_core=debug`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "MAGIC_SHELL_LOG";
pub const LOG_FILE_NAME: &str = "magic-shell.log";

/// Where records ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    /// Errors only; the log file could not be opened.
    Stderr,
}

/// `<state dir>/magic-shell.log`, or the cache dir where there is no state dir.
pub fn default_log_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "magic-shell")?;
    let dir = dirs.state_dir().unwrap_or_else(|| dirs.cache_dir());
    Some(dir.join(LOG_FILE_NAME))
}

/// Append-mode log file, creating parent directories as needed.
pub fn open_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Filter from `directive`, falling back to `warn` when absent or invalid.
pub fn build_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

pub fn init(log_file: Option<&Path>) -> LogTarget {
    let opened = log_file
        .map(Path::to_path_buf)
        .or_else(default_log_path)
        .and_then(|path| open_log(&path).ok().map(|file| (path, file)));

    match opened {
        Some((path, file)) => {
            let directive = std::env::var(LOG_ENV).ok();
            let _ = tracing_subscriber::fmt()
                .with_env_filter(build_filter(directive.as_deref()))
                .with_ansi(false)
                .with_target(true)
                .with_writer(Arc::new(file))
                .try_init();
            LogTarget::File(path)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("error"))
                .with_writer(std::io::stderr)
                .try_init();
            LogTarget::Stderr
        }
    }
}
