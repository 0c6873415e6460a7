//! SIGWINCH handling via a signal-safe self-pipe.
//!
//! The handler is restricted to async-signal-safe work: one atomic flag
//! swap, one `write(2)` to the pipe, and chaining whatever plain
//! handler was installed before us. Everything else (draining, size
//! query, tree reshaping) happens on the main thread when the loop
//! reports the read end readable.

use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

/// Write end of the self-pipe; -1 while no manager is installed.
static PIPE_WRITE_FD: AtomicI32 = AtomicI32::new(-1);

/// Single-writer flag: set by the handler, cleared by the drain. While
/// set, further signals write nothing, so any number of SIGWINCH
/// deliveries collapse into one byte in the pipe.
static SIGNALED: AtomicBool = AtomicBool::new(false);

/// Previously installed plain handler to chain to (SIG_DFL when none).
static PREV_HANDLER: AtomicUsize = AtomicUsize::new(0);

extern "C" fn on_sigwinch(signum: libc::c_int) {
    if !SIGNALED.swap(true, Ordering::SeqCst) {
        let fd = PIPE_WRITE_FD.load(Ordering::SeqCst);
        if fd >= 0 {
            unsafe {
                libc::write(fd, b"w".as_ptr().cast(), 1);
            }
        }
    }

    let prev = PREV_HANDLER.load(Ordering::SeqCst);
    if prev != libc::SIG_DFL && prev != libc::SIG_IGN {
        let handler: extern "C" fn(libc::c_int) = unsafe { std::mem::transmute(prev) };
        handler(signum);
    }
}

/// Installed SIGWINCH disposition plus the pipe it pokes.
pub(crate) struct ResizePipe {
    read: Rc<OwnedFd>,
    _write: OwnedFd,
    saved: libc::sigaction,
}

impl ResizePipe {
    pub(crate) fn install() -> std::io::Result<Self> {
        let (read, write) = rustix::pipe::pipe_with(
            rustix::pipe::PipeFlags::NONBLOCK | rustix::pipe::PipeFlags::CLOEXEC,
        )
        .map_err(|e| std::io::Error::from_raw_os_error(e.raw_os_error()))?;

        SIGNALED.store(false, Ordering::SeqCst);
        PIPE_WRITE_FD.store(write.as_raw_fd(), Ordering::SeqCst);

        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = on_sigwinch as usize;
        action.sa_flags = libc::SA_RESTART;
        let mut saved: libc::sigaction = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::sigaction(libc::SIGWINCH, &action, &mut saved) };
        if rc != 0 {
            PIPE_WRITE_FD.store(-1, Ordering::SeqCst);
            return Err(std::io::Error::last_os_error());
        }

        // Only a plain function disposition can be chained from signal
        // context; SA_SIGINFO handlers expect a siginfo we cannot forge.
        let chain = if saved.sa_flags & libc::SA_SIGINFO == 0 {
            saved.sa_sigaction
        } else {
            libc::SIG_DFL
        };
        PREV_HANDLER.store(chain, Ordering::SeqCst);

        tracing::debug!(read_fd = read.as_raw_fd(), "SIGWINCH self-pipe installed");
        Ok(Self {
            read: Rc::new(read),
            _write: write,
            saved,
        })
    }

    /// Shared read end for event-loop registration.
    pub(crate) fn shared_read_fd(&self) -> Rc<OwnedFd> {
        self.read.clone()
    }

    pub(crate) fn raw_read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    /// Drain the coalesced byte when the handler flagged one.
    ///
    /// One byte covers any number of signal deliveries since the last
    /// drain; the flag is cleared after the read so a signal arriving
    /// mid-drain starts a fresh byte.
    pub(crate) fn drain_if_signaled(&self) {
        if SIGNALED.load(Ordering::SeqCst) {
            let mut byte = [0u8; 1];
            let _ = rustix::io::read(self.read.as_fd(), &mut byte);
            SIGNALED.store(false, Ordering::SeqCst);
        }
    }

    /// Restore the saved disposition and detach the statics.
    pub(crate) fn uninstall(self) {
        unsafe {
            libc::sigaction(libc::SIGWINCH, &self.saved, std::ptr::null_mut());
        }
        PIPE_WRITE_FD.store(-1, Ordering::SeqCst);
        PREV_HANDLER.store(libc::SIG_DFL, Ordering::SeqCst);
        SIGNALED.store(false, Ordering::SeqCst);
        tracing::debug!("SIGWINCH disposition restored");
    }
}
