use std::io;
use std::os::fd::{AsFd, AsRawFd};

use nix::pty::Winsize;
use serde::Serialize;

nix::ioctl_read_bad!(tiocgwinsz, libc::TIOCGWINSZ, Winsize);
nix::ioctl_write_ptr_bad!(tiocswinsz, libc::TIOCSWINSZ, Winsize);

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    /// Used when the real terminal won't tell us (or says 0x0).
    pub const FALLBACK: WindowSize = WindowSize { rows: 24, cols: 80 };

    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    pub fn to_winsize(self) -> Winsize {
        Winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }
}

/// `TIOCGWINSZ` on `fd`.
pub fn window_size<Fd: AsFd>(fd: Fd) -> io::Result<WindowSize> {
    let mut ws = WindowSize::new(0, 0).to_winsize();
    // SAFETY: `ws` is a valid, writable winsize for the duration of the call.
    unsafe { tiocgwinsz(fd.as_fd().as_raw_fd(), &mut ws) }.map_err(io::Error::from)?;
    Ok(WindowSize::new(ws.ws_row, ws.ws_col))
}

/// `TIOCSWINSZ` on `fd`. On a PTY primary this also raises SIGWINCH in the
/// foreground process group of the secondary side.
pub fn set_window_size<Fd: AsFd>(fd: Fd, size: WindowSize) -> io::Result<()> {
    let ws = size.to_winsize();
    // SAFETY: `ws` outlives the call and is only read.
    unsafe { tiocswinsz(fd.as_fd().as_raw_fd(), &ws) }.map_err(io::Error::from)?;
    Ok(())
}

/// Current size of `fd`, or [`WindowSize::FALLBACK`] when unknown.
pub fn window_size_or_default<Fd: AsFd>(fd: Fd) -> WindowSize {
    match window_size(fd) {
        Ok(size) if size.rows > 0 && size.cols > 0 => size,
        _ => WindowSize::FALLBACK,
    }
}
