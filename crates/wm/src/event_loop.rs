//! Calloop integration.
//!
//! The message-loop contract the manager consumes, in calloop terms:
//! a ping source is the idle hook (`update()` runs when it fires, and
//! marking a leaf dirty pings it), and the self-pipe's read end is a
//! level-triggered readable source driving `resize()`.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::rc::Rc;

use calloop::generic::Generic;
use calloop::{Interest, LoopHandle, Mode, PostAction};

use crate::manager::WindowManager;
use crate::WmError;

/// The pipe read end stays owned by the manager; calloop gets a shared
/// view of it.
struct SharedFd(Rc<OwnedFd>);

impl AsFd for SharedFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl WindowManager {
    /// Register the manager's sources on a calloop loop: the resize
    /// self-pipe and the idle ping that drives paint cycles.
    ///
    /// Pending invalidations (the root is invalidated during init) are
    /// re-armed so the first dispatch paints them.
    pub fn attach<D: 'static>(&self, handle: &LoopHandle<'static, D>) -> Result<(), WmError> {
        let (ping, ping_source) =
            calloop::ping::make_ping().map_err(|e| WmError::EventLoop(e.to_string()))?;

        let wm = self.clone();
        handle
            .insert_source(ping_source, move |_, _, _| {
                if let Err(e) = wm.update() {
                    tracing::error!(error = %e, "paint cycle failed");
                }
            })
            .map_err(|e| WmError::EventLoop(e.to_string()))?;

        let read_fd = {
            let pipe = self.shared.resize_pipe.borrow();
            pipe.as_ref()
                .map(|p| p.shared_read_fd())
                .ok_or(WmError::NotInitialized)?
        };
        let wm = self.clone();
        handle
            .insert_source(
                Generic::new(SharedFd(read_fd), Interest::READ, Mode::Level),
                move |_, _, _| {
                    if let Err(e) = wm.resize() {
                        tracing::error!(error = %e, "resize reconciliation failed");
                    }
                    Ok(PostAction::Continue)
                },
            )
            .map_err(|e| WmError::EventLoop(e.to_string()))?;

        *self.shared.idle.borrow_mut() = Some(ping);
        if self.shared.any_dirty.get() {
            self.shared.mark_dirty();
        }
        Ok(())
    }
}
