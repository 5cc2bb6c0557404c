// magic-core/src/hooks/launch.rs
//
// How the hook script reaches the shell. Nothing is ever typed into the
// session: bash gets an rc file, zsh a scratch ZDOTDIR, fish an
// --init-command. The user's own startup files still run first.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, warn};

use super::{HookRegistry, ShellFamily};
use crate::shell::ResolvedShell;

/// Where the user's zsh dotfiles live while our scratch ZDOTDIR is active.
pub const USER_ZDOTDIR_VAR: &str = "MAGIC_SHELL_USER_ZDOTDIR";

/// Program, arguments and extra environment for one shell session.
///
/// Owns the scratch directory holding any generated startup files; it is
/// removed when the launch is dropped, so keep it alive for the session.
#[derive(Debug)]
pub struct ShellLaunch {
    program: PathBuf,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
    hooked: bool,
    scratch: Option<TempDir>,
}

impl ShellLaunch {
    /// The shell with no arguments and no hooks.
    pub fn plain(shell: &ResolvedShell) -> Self {
        Self {
            program: shell.path.clone(),
            args: Vec::new(),
            env: Vec::new(),
            hooked: false,
            scratch: None,
        }
    }

    /// Any program with explicit arguments, no hooks.
    pub fn with_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            hooked: false,
            scratch: None,
        }
    }

    /// Hooked launch if the registry knows the shell, plain otherwise.
    ///
    /// Failing to write the startup files degrades to a plain launch.
    pub fn prepare(shell: &ResolvedShell, registry: &HookRegistry) -> Self {
        let Some(profile) = registry.profile(&shell.name) else {
            debug!("no hook profile for '{}', launching plain", shell.name);
            return Self::plain(shell);
        };

        let script = profile.script();
        let prepared = match profile.family() {
            ShellFamily::Bash => bash(shell, &script),
            ShellFamily::Zsh => zsh(shell, &script),
            ShellFamily::Fish => Ok(fish(shell, &script)),
        };

        match prepared {
            Ok(launch) => launch,
            Err(e) => {
                warn!("hook setup for '{}' failed, running without timing: {}", shell.name, e);
                Self::plain(shell)
            }
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn env(&self) -> &[(OsString, OsString)] {
        &self.env
    }

    /// Add (or replace) an environment variable for the shell.
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.env.push((key, value)),
        }
        self
    }

    /// Value of an extra environment variable set for this launch.
    pub fn env_var(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Whether hook code was wired into this launch.
    pub fn hooked(&self) -> bool {
        self.hooked
    }

    /// Directory holding generated startup files, if any.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    /// Base command; the caller wires up stdio and session setup.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

fn scratch_dir() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("magic-shell-").tempdir()
}

/// `bash --rcfile <file> -i`, where the file sources ~/.bashrc first.
fn bash(shell: &ResolvedShell, script: &str) -> io::Result<ShellLaunch> {
    let dir = scratch_dir()?;
    let rcfile = dir.path().join("bashrc");
    let contents = format!("[ -f \"$HOME/.bashrc\" ] && . \"$HOME/.bashrc\"\n{script}");
    fs::write(&rcfile, contents)?;

    Ok(ShellLaunch {
        program: shell.path.clone(),
        args: vec!["--rcfile".into(), rcfile.into_os_string(), "-i".into()],
        env: Vec::new(),
        hooked: true,
        scratch: Some(dir),
    })
}

/// Scratch ZDOTDIR whose `.zshenv`/`.zshrc` chain the user's files.
///
/// `.zshenv` sources the user's copy but leaves ZDOTDIR on the scratch dir so
/// zsh still reads our `.zshrc`; that one points ZDOTDIR back for good. A user
/// `.zshenv` that moves ZDOTDIR (the usual XDG setup) is followed: whatever
/// it leaves behind is where `.zshrc` is looked up.
fn zsh(shell: &ResolvedShell, script: &str) -> io::Result<ShellLaunch> {
    let user_zdotdir = std::env::var_os("ZDOTDIR")
        .or_else(|| std::env::var_os("HOME"))
        .unwrap_or_else(|| OsString::from("."));

    let dir = scratch_dir()?;
    let var = USER_ZDOTDIR_VAR;

    let zshenv = format!(
        "__magic_shell_zdotdir=\"$ZDOTDIR\"\n\
         ZDOTDIR=\"${var}\"\n\
         [[ -f \"$ZDOTDIR/.zshenv\" ]] && source \"$ZDOTDIR/.zshenv\"\n\
         {var}=\"${{ZDOTDIR:-$HOME}}\"\n\
         ZDOTDIR=\"$__magic_shell_zdotdir\"\n\
         unset __magic_shell_zdotdir\n"
    );
    let zshrc = format!(
        "ZDOTDIR=\"${var}\"\n\
         unset {var}\n\
         [[ -f \"$ZDOTDIR/.zshrc\" ]] && source \"$ZDOTDIR/.zshrc\"\n\
         {script}"
    );
    fs::write(dir.path().join(".zshenv"), zshenv)?;
    fs::write(dir.path().join(".zshrc"), zshrc)?;

    let scratch = dir.path().as_os_str().to_owned();
    let launch = ShellLaunch {
        program: shell.path.clone(),
        args: vec!["-i".into()],
        env: Vec::new(),
        hooked: true,
        scratch: Some(dir),
    };
    Ok(launch.with_env("ZDOTDIR", scratch).with_env(var, user_zdotdir))
}

/// fish runs `--init-command` after config.fish, nothing to write.
fn fish(shell: &ResolvedShell, script: &str) -> ShellLaunch {
    ShellLaunch {
        program: shell.path.clone(),
        args: vec!["--init-command".into(), script.into()],
        env: Vec::new(),
        hooked: true,
        scratch: None,
    }
}
