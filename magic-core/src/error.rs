// magic-core/src/error.rs

use std::io;

use thiserror::Error;

/// Everything that can go wrong around a bridge session.
///
/// `Resolution`, `TerminalSetup` and `Spawn` abort the run before (or instead
/// of) starting the shell. The rest are absorbed where they happen and only
/// ever show up in logs.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no usable shell: {0}")]
    Resolution(String),

    #[error("cannot prepare terminal ({op}): {source}")]
    TerminalSetup {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot spawn shell ({op}): {source}")]
    Spawn {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("forwarding stopped: {0}")]
    Forwarding(#[source] io::Error),

    #[error("resize not applied: {0}")]
    Resize(#[source] io::Error),

    #[error("observer failed: {0}")]
    Observer(String),
}

impl BridgeError {
    pub fn terminal_setup(op: &'static str, source: impl Into<io::Error>) -> Self {
        BridgeError::TerminalSetup {
            op,
            source: source.into(),
        }
    }

    pub fn spawn(op: &'static str, source: impl Into<io::Error>) -> Self {
        BridgeError::Spawn {
            op,
            source: source.into(),
        }
    }

    /// Fatal errors end the program with a diagnostic; the others never
    /// interrupt the wrapped shell.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Resolution(_) | BridgeError::TerminalSetup { .. } | BridgeError::Spawn { .. }
        )
    }
}
