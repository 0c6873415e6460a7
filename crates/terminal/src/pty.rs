//! PTY management for the embedded terminal.
//!
//! Opens a master/slave pair, runs the child with the slave as its
//! controlling terminal, and exposes the master for event-loop driven
//! IO. The master fd is switched to non-blocking mode once at spawn:
//! everything here runs on the single cooperative event-loop thread,
//! so neither reads nor writes may ever park it.

use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use rustix::io::Errno;
use rustix::termios::{tcsetwinsize, Winsize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("failed to open PTY: {0}")]
    Open(std::io::Error),

    #[error("failed to spawn child: {0}")]
    Spawn(std::io::Error),

    #[error("failed to set window size: {0}")]
    Winsize(rustix::io::Errno),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn errno(e: Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(e.raw_os_error())
}

fn os_err(e: Errno) -> PtyError {
    PtyError::Open(errno(e))
}

fn winsize(cols: u16, rows: u16) -> Winsize {
    Winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    }
}

/// Master side of a PTY with the child it feeds.
pub struct Pty {
    master: OwnedFd,
    child: Child,
    cols: u16,
    rows: u16,
    /// Set once the child has been observed dead (or waiting failed).
    reaped: bool,
}

impl Pty {
    /// Spawn `program` with `args` on a fresh PTY sized cols x rows.
    /// The child gets the slave as stdin/stdout/stderr and as its
    /// controlling terminal, with TERM set for a 256-color display.
    pub fn spawn(program: &str, args: &[&str], cols: u16, rows: u16) -> Result<Self, PtyError> {
        let master = rustix::pty::openpt(
            rustix::pty::OpenptFlags::RDWR | rustix::pty::OpenptFlags::NOCTTY,
        )
        .map_err(os_err)?;
        rustix::pty::grantpt(&master).map_err(os_err)?;
        rustix::pty::unlockpt(&master).map_err(os_err)?;

        let name_buf = [0u8; 256];
        let slave_name = rustix::pty::ptsname(&master, name_buf).map_err(os_err)?;
        let slave_path = slave_name.to_str().map_err(|_| {
            PtyError::Open(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid PTY slave name",
            ))
        })?;

        tcsetwinsize(&master, winsize(cols, rows)).map_err(PtyError::Winsize)?;

        // The event loop owns this fd; it must never block it.
        let flags = rustix::fs::fcntl_getfl(&master).map_err(os_err)?;
        rustix::fs::fcntl_setfl(&master, flags | rustix::fs::OFlags::NONBLOCK).map_err(os_err)?;

        let slave = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(slave_path)
            .map_err(PtyError::Open)?;
        let slave_fd = slave.into_raw_fd();

        // Each Stdio must own a distinct fd.
        let slave_fd_out = unsafe { libc::dup(slave_fd) };
        let slave_fd_err = unsafe { libc::dup(slave_fd) };
        if slave_fd_out < 0 || slave_fd_err < 0 {
            unsafe {
                libc::close(slave_fd);
                if slave_fd_out >= 0 {
                    libc::close(slave_fd_out);
                }
            }
            return Err(PtyError::Open(std::io::Error::last_os_error()));
        }

        let child = unsafe {
            Command::new(program)
                .args(args)
                .env("TERM", "xterm-256color")
                .stdin(Stdio::from_raw_fd(slave_fd))
                .stdout(Stdio::from_raw_fd(slave_fd_out))
                .stderr(Stdio::from_raw_fd(slave_fd_err))
                .pre_exec(move || {
                    // New session with the slave as controlling terminal.
                    libc::setsid();
                    libc::ioctl(slave_fd, libc::TIOCSCTTY, 0);
                    Ok(())
                })
                .spawn()
                .map_err(PtyError::Spawn)?
        };

        tracing::debug!(program, cols, rows, "spawned PTY child");
        Ok(Self {
            master,
            child,
            cols,
            rows,
            reaped: false,
        })
    }

    /// Update the PTY winsize and nudge the child with SIGWINCH.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        tcsetwinsize(&self.master, winsize(cols, rows)).map_err(PtyError::Winsize)?;
        self.cols = cols;
        self.rows = rows;
        unsafe {
            libc::kill(self.child.id() as i32, libc::SIGWINCH);
        }
        Ok(())
    }

    /// Read whatever output is ready; `Ok(0)` when there is none.
    ///
    /// The master reports EIO once the slave side is fully closed;
    /// that is end-of-stream here, and `is_running` picks up the exit.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, PtyError> {
        match rustix::io::read(&self.master, buf) {
            Ok(n) => Ok(n),
            Err(e) if e == Errno::AGAIN || e == Errno::INTR || e == Errno::IO => Ok(0),
            Err(e) => Err(PtyError::Io(errno(e))),
        }
    }

    /// Write input bytes, accepting as many as the kernel buffer takes.
    ///
    /// Returns the number of bytes accepted; a full buffer produces a
    /// short (possibly zero) count instead of stalling the event loop.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, PtyError> {
        let mut written = 0;
        while written < data.len() {
            match rustix::io::write(&self.master, &data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e == Errno::AGAIN => break,
                Err(e) if e == Errno::INTR => continue,
                Err(e) => return Err(PtyError::Io(errno(e))),
            }
        }
        Ok(written)
    }

    /// Master fd for event-loop polling.
    pub fn as_raw_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    /// Whether the child is still alive. Once it has been seen dead the
    /// answer stays false without further syscalls.
    pub fn is_running(&mut self) -> bool {
        if !self.reaped {
            self.reaped = !matches!(self.child.try_wait(), Ok(None));
            if self.reaped {
                tracing::debug!("PTY child exited");
            }
        }
        !self.reaped
    }

    /// Current winsize as (columns, rows).
    pub fn winsize(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }

        // SIGHUP first so shells get to save history; escalate to
        // SIGKILL only if the child ignores the hangup.
        unsafe {
            libc::kill(self.child.id() as i32, libc::SIGHUP);
        }
        for _ in 0..50 {
            if !matches!(self.child.try_wait(), Ok(None)) {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
