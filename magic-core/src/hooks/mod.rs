//! Shell hook injection.
//!
//! A [`HookRegistry`] maps a shell's executable basename to a [`HookProfile`]:
//! the ordered init commands that make that shell print the OSC 133 markers
//! around each command and prompt. Shells without a profile run unhooked,
//! which is a valid, degraded mode: bytes still flow, no timing events.
//!
//! The registry is a plain value built at startup and handed to the bridge,
//! so tests can swap in their own profiles.

pub mod launch;
pub mod profiles;

use std::collections::HashMap;

use serde::Serialize;

pub use launch::ShellLaunch;

/// The shell families we know how to hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellFamily {
    Bash,
    Zsh,
    Fish,
}

impl ShellFamily {
    pub fn from_name(shell_name: &str) -> Option<Self> {
        match normalize(shell_name).as_str() {
            "bash" => Some(ShellFamily::Bash),
            "zsh" => Some(ShellFamily::Zsh),
            "fish" => Some(ShellFamily::Fish),
            _ => None,
        }
    }
}

/// Ordered init commands for one shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookProfile {
    family: ShellFamily,
    init_commands: Vec<String>,
}

impl HookProfile {
    pub fn new(family: ShellFamily, init_commands: Vec<String>) -> Self {
        Self {
            family,
            init_commands,
        }
    }

    /// The built-in profile for `family`.
    pub fn builtin(family: ShellFamily) -> Self {
        let init_commands = match family {
            ShellFamily::Bash => profiles::bash(),
            ShellFamily::Zsh => profiles::zsh(),
            ShellFamily::Fish => profiles::fish(),
        };
        Self::new(family, init_commands)
    }

    pub fn family(&self) -> ShellFamily {
        self.family
    }

    pub fn init_commands(&self) -> &[String] {
        &self.init_commands
    }

    /// One command per line, newline-terminated.
    pub fn script(&self) -> String {
        let mut script = self.init_commands.join("\n");
        script.push('\n');
        script
    }
}

#[derive(Debug, Clone)]
pub struct HookRegistry {
    profiles: HashMap<String, HookProfile>,
}

impl Default for HookRegistry {
    /// bash, zsh and fish.
    fn default() -> Self {
        Self::empty()
            .with_profile("bash", HookProfile::builtin(ShellFamily::Bash))
            .with_profile("zsh", HookProfile::builtin(ShellFamily::Zsh))
            .with_profile("fish", HookProfile::builtin(ShellFamily::Fish))
    }
}

impl HookRegistry {
    /// No profiles: every shell runs unhooked.
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    pub fn with_profile(mut self, shell_name: &str, profile: HookProfile) -> Self {
        self.profiles.insert(normalize(shell_name), profile);
        self
    }

    pub fn profile(&self, shell_name: &str) -> Option<&HookProfile> {
        self.profiles.get(&normalize(shell_name))
    }

    pub fn supports_hooks(&self, shell_name: &str) -> bool {
        self.profile(shell_name).is_some()
    }

    /// Init script for `shell_name`, or an empty string if unsupported.
    pub fn build_init(&self, shell_name: &str) -> String {
        self.profile(shell_name)
            .map(HookProfile::script)
            .unwrap_or_default()
    }
}

/// `-bash` (login argv0 style) and `Bash` both mean `bash`.
fn normalize(shell_name: &str) -> String {
    shell_name.trim_start_matches('-').to_ascii_lowercase()
}
