// magic-core/src/bridge/forwarder.rs
//
// The two byte pumps. Each runs on its own thread and blocks only in poll(2)
// on its source (or, for PTY writes, its sink) plus a shared cancel pipe;
// closing the pipe's write end wakes both with POLLHUP. Exits are reported
// over a channel so the async side can select on them next to signals.

use std::fs::File;
use std::io::{self, PipeWriter, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::thread::JoinHandle;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::observer::ObserverSet;
use crate::error::BridgeError;
use crate::term::osc::{MarkerScanner, Segment};
use crate::TimingEvent;

/// One read's worth of bytes.
pub const CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// real terminal -> PTY
    Input,
    /// PTY -> real terminal
    Output,
}

#[derive(Debug)]
pub enum ExitReason {
    EndOfStream,
    Cancelled,
    Failed(BridgeError),
}

/// Why a loop stopped.
#[derive(Debug)]
pub struct LoopExit {
    pub side: Side,
    pub reason: ExitReason,
}

enum Wake {
    Ready,
    Cancelled,
}

/// Block until `fd` is ready for `events` (or has an error or hangup
/// pending) or the cancel pipe is closed. Cancellation wins when both are
/// ready.
fn wait_ready(fd: BorrowedFd<'_>, events: PollFlags, cancel: BorrowedFd<'_>) -> io::Result<Wake> {
    loop {
        let mut fds = [PollFd::new(fd, events), PollFd::new(cancel, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }

        if fds[1].revents().is_some_and(|r| !r.is_empty()) {
            return Ok(Wake::Cancelled);
        }
        if fds[0].revents().is_some_and(|r| !r.is_empty()) {
            return Ok(Wake::Ready);
        }
    }
}

/// Put the PTY primary side in non-blocking mode.
///
/// The flag lives on the open file description, so it covers every handle
/// cloned from the same primary. Writes then never park the input thread
/// where the cancel pipe cannot reach it.
pub fn set_nonblocking<Fd: AsRawFd>(fd: &Fd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(raw, FcntlArg::F_GETFL)?);
    fcntl(raw, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

/// Write all of `buf`, waiting for room between partial writes.
/// `Ok(false)` if cancelled first.
fn write_cancellable<W: Write + AsFd>(out: &mut W, mut buf: &[u8], cancel: BorrowedFd<'_>) -> io::Result<bool> {
    while !buf.is_empty() {
        match wait_ready(out.as_fd(), PollFlags::POLLOUT, cancel)? {
            Wake::Ready => {}
            Wake::Cancelled => return Ok(false),
        }
        match out.write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {}
            Err(e) => return Err(e),
        }
    }
    out.flush()?;
    Ok(true)
}

/// Copy `input` to `pty` unchanged, one chunk at a time.
///
/// Both the read and the write side wait on the cancel pipe, so a shell that
/// stopped reading cannot hold the loop.
pub fn run_input<R, W>(mut input: R, mut pty: W, cancel: BorrowedFd<'_>) -> ExitReason
where
    R: Read + AsFd,
    W: Write + AsFd,
{
    let mut buf = [0u8; CHUNK];
    loop {
        match wait_ready(input.as_fd(), PollFlags::POLLIN, cancel) {
            Ok(Wake::Ready) => {}
            Ok(Wake::Cancelled) => return ExitReason::Cancelled,
            Err(e) => return ExitReason::Failed(BridgeError::Forwarding(e)),
        }

        let n = match input.read(&mut buf) {
            Ok(0) => return ExitReason::EndOfStream,
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => continue,
            Err(e) => return ExitReason::Failed(BridgeError::Forwarding(e)),
        };

        match write_cancellable(&mut pty, &buf[..n], cancel) {
            Ok(true) => {}
            Ok(false) => return ExitReason::Cancelled,
            Err(e) => return ExitReason::Failed(BridgeError::Forwarding(e)),
        }
    }
}

/// Output side: strips markers, writes the text, notifies observers.
///
/// Text that precedes a marker is written and flushed before the marker's
/// event is dispatched, so observers never run ahead of the screen.
#[derive(Debug)]
pub struct OutputRelay<W> {
    out: W,
    scanner: MarkerScanner,
    observers: ObserverSet,
}

impl<W: Write> OutputRelay<W> {
    pub fn new(out: W, observers: ObserverSet) -> Self {
        Self {
            out,
            scanner: MarkerScanner::new(),
            observers,
        }
    }

    pub fn relay(&mut self, chunk: &[u8]) -> io::Result<()> {
        let Self {
            out,
            scanner,
            observers,
        } = self;

        scanner.feed(chunk, |segment| {
            match segment {
                Segment::Text(text) => out.write_all(text)?,
                Segment::Marker(kind) => {
                    out.flush()?;
                    observers.dispatch(&TimingEvent::now(kind));
                }
            }
            Ok::<(), io::Error>(())
        })?;
        out.flush()
    }

    /// Write out anything the scanner was still holding back.
    pub fn finish(&mut self) -> io::Result<()> {
        let rest = self.scanner.finish();
        if !rest.is_empty() {
            self.out.write_all(&rest)?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Copy `pty` to the relay until end of stream, failure or cancellation.
///
/// Reading the primary side fails with EIO on Linux once the last holder of
/// the secondary side is gone; that is the normal end of a session.
pub fn run_output<R, W>(mut pty: R, relay: &mut OutputRelay<W>, cancel: BorrowedFd<'_>) -> ExitReason
where
    R: Read + AsFd,
    W: Write,
{
    let mut buf = [0u8; CHUNK];
    let reason = loop {
        match wait_ready(pty.as_fd(), PollFlags::POLLIN, cancel) {
            Ok(Wake::Ready) => {}
            Ok(Wake::Cancelled) => break ExitReason::Cancelled,
            Err(e) => break ExitReason::Failed(BridgeError::Forwarding(e)),
        }

        match pty.read(&mut buf) {
            Ok(0) => break ExitReason::EndOfStream,
            Ok(n) => {
                if let Err(e) = relay.relay(&buf[..n]) {
                    break ExitReason::Failed(BridgeError::Forwarding(e));
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => continue,
            Err(e) if e.raw_os_error() == Some(libc::EIO) => break ExitReason::EndOfStream,
            Err(e) => break ExitReason::Failed(BridgeError::Forwarding(e)),
        }
    };

    if let Err(e) = relay.finish() {
        debug!("final output flush failed: {}", e);
    }
    reason
}

/// Both loops for one session.
#[derive(Debug)]
pub struct Forwarder {
    cancel: Option<PipeWriter>,
    exits: mpsc::Receiver<LoopExit>,
    threads: Vec<JoinHandle<()>>,
    running: usize,
}

impl Forwarder {
    /// Start pumping `input` into `pty_in` and `pty_out` into `output`.
    pub fn start<I, W>(
        input: I,
        pty_in: File,
        pty_out: File,
        output: W,
        observers: ObserverSet,
    ) -> Result<Self, BridgeError>
    where
        I: Read + AsFd + Send + 'static,
        W: Write + Send + 'static,
    {
        set_nonblocking(&pty_in).map_err(BridgeError::Forwarding)?;

        let (cancel_rx, cancel_tx) = io::pipe().map_err(BridgeError::Forwarding)?;
        let input_cancel = cancel_rx.try_clone().map_err(BridgeError::Forwarding)?;
        let output_cancel = cancel_rx;

        let (tx, exits) = mpsc::channel(2);
        let mut threads = Vec::with_capacity(2);

        let input_tx = tx.clone();
        threads.push(
            std::thread::Builder::new()
                .name("magic-input".into())
                .spawn(move || {
                    let reason = run_input(input, pty_in, input_cancel.as_fd());
                    let _ = input_tx.blocking_send(LoopExit {
                        side: Side::Input,
                        reason,
                    });
                })
                .map_err(BridgeError::Forwarding)?,
        );

        let mut relay = OutputRelay::new(output, observers);
        let spawned = std::thread::Builder::new()
            .name("magic-output".into())
            .spawn(move || {
                let reason = run_output(pty_out, &mut relay, output_cancel.as_fd());
                let _ = tx.blocking_send(LoopExit {
                    side: Side::Output,
                    reason,
                });
            });

        let mut forwarder = Self {
            cancel: Some(cancel_tx),
            exits,
            threads,
            running: 1,
        };
        match spawned {
            Ok(handle) => {
                forwarder.threads.push(handle);
                forwarder.running = 2;
                Ok(forwarder)
            }
            Err(e) => {
                // Stop the input thread we already started.
                forwarder.cancel();
                Err(BridgeError::Forwarding(e))
            }
        }
    }

    /// Wait for the next loop to stop. `None` once both have reported.
    pub async fn next_exit(&mut self) -> Option<LoopExit> {
        if self.running == 0 {
            return None;
        }
        let exit = self.exits.recv().await;
        if exit.is_some() {
            self.running -= 1;
        } else {
            self.running = 0;
        }
        exit
    }

    /// Wake both loops. Idempotent.
    pub fn cancel(&mut self) {
        if self.cancel.take().is_some() {
            debug!("forwarding cancelled");
        }
    }

    /// Cancel, then wait for every loop still running. Returns their exits.
    pub async fn shutdown(mut self) -> Vec<LoopExit> {
        self.cancel();

        let mut rest = Vec::new();
        while let Some(exit) = self.next_exit().await {
            rest.push(exit);
        }

        let threads = std::mem::take(&mut self.threads);
        let joined = tokio::task::spawn_blocking(move || {
            threads
                .into_iter()
                .filter_map(|t| t.join().err())
                .count()
        })
        .await;
        match joined {
            Ok(0) => {}
            Ok(n) => warn!("{} forwarding thread(s) panicked", n),
            Err(e) => warn!("could not join forwarding threads: {}", e),
        }
        rest
    }
}
