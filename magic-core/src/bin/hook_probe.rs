// magic-core/src/bin/hook_probe.rs
//
// Runs a hooked shell on a PTY without touching the real terminal, types
// `echo hi` and `exit`, then prints what the bridge saw.
//
//     cargo run -p magic-core --bin hook_probe -- [SHELL]

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use magic_core::bridge::supervisor;
use magic_core::bridge::{Forwarder, ObserverSet};
use magic_core::pty_manager::PtyManager;
use magic_core::term::WindowSize;
use magic_core::{HookRegistry, LoginShellLocator, ShellLaunch, ShellLocator, TimingEvent};

/// Cloneable in-memory sink for the cleaned output.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let requested = std::env::args_os().nth(1).map(PathBuf::from);
    let shell = LoginShellLocator
        .resolve(requested.as_deref())
        .context("shell resolution failed")?;

    let registry = HookRegistry::default();
    let launch = ShellLaunch::prepare(&shell, &registry);
    eprintln!(
        "[hook_probe] {} (hooked: {})",
        shell.path.display(),
        launch.hooked()
    );

    let pty = PtyManager::spawn(&launch, WindowSize::FALLBACK).context("PtyManager::spawn failed")?;

    let start = std::time::Instant::now();
    let events: Arc<Mutex<Vec<TimingEvent>>> = Arc::default();
    let mut observers = ObserverSet::new();
    let seen = Arc::clone(&events);
    observers.subscribe(move |ev: &TimingEvent| -> anyhow::Result<()> {
        seen.lock()
            .map_err(|_| anyhow::anyhow!("event log poisoned"))?
            .push(*ev);
        Ok(())
    });

    // Keystrokes come from a pipe we hold the write end of.
    let (keys_rx, mut keys) = std::io::pipe().context("pipe failed")?;
    let output = Captured::default();

    let mut forwarder = Forwarder::start(
        keys_rx,
        pty.writer().context("pty writer")?,
        pty.reader().context("pty reader")?,
        output.clone(),
        observers,
    )?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    keys.write_all(b"echo hi\r").context("typing failed")?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    keys.write_all(b"exit\r").context("typing failed")?;

    let first = tokio::time::timeout(Duration::from_secs(5), forwarder.next_exit()).await;
    match first {
        Ok(Some(exit)) => eprintln!("[hook_probe] {:?} loop stopped: {:?}", exit.side, exit.reason),
        Ok(None) => eprintln!("[hook_probe] forwarding loops vanished"),
        Err(_) => eprintln!("[hook_probe] shell still running after 5s, giving up"),
    }
    forwarder.shutdown().await;
    drop(keys);

    let code = supervisor::reap(pty).await;

    let cleaned = output.0.lock().map(|b| b.clone()).unwrap_or_default();
    eprintln!("[hook_probe] cleaned output:\n{}", String::from_utf8_lossy(&cleaned).escape_debug());
    if let Ok(events) = events.lock() {
        for ev in events.iter() {
            eprintln!(
                "[hook_probe] +{:>6}ms {}",
                ev.at.saturating_duration_since(start).as_millis(),
                ev.kind.as_str()
            );
        }
    }
    eprintln!("[hook_probe] shell exited with {}", code);
    Ok(())
}
