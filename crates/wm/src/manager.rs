//! The window manager singleton and paint scheduler.
//!
//! One manager exists per process. It owns the screen, the root window
//! and the resize self-pipe; `update()` drains dirty leaves into the
//! virtual screen and commits one frame per quiescence.

use std::cell::{Cell, RefCell};
use std::os::fd::RawFd;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use screen::backend::CrosstermBackend;
use screen::{Backend, Key, Screen};

use crate::geom::Rect;
use crate::resize::ResizePipe;
use crate::window::{Window, WindowEvent};
use crate::WmError;

thread_local! {
    static MANAGER: RefCell<Option<WindowManager>> = const { RefCell::new(None) };
}

/// Process-wide guard: the SIGWINCH statics allow one installation.
static ACTIVE: AtomicBool = AtomicBool::new(false);

pub(crate) struct ManagerShared {
    pub(crate) screen: RefCell<Screen>,
    pub(crate) root: RefCell<Option<Window>>,
    pub(crate) any_dirty: Cell<bool>,
    pub(crate) idle: RefCell<Option<calloop::ping::Ping>>,
    pub(crate) resize_pipe: RefCell<Option<ResizePipe>>,
}

impl ManagerShared {
    pub(crate) fn root_window(&self) -> Option<Window> {
        self.root.borrow().clone()
    }

    /// Record that some leaf went dirty and arm the idle hook.
    pub(crate) fn mark_dirty(&self) {
        self.any_dirty.set(true);
        if let Some(ping) = self.idle.borrow().as_ref() {
            ping.ping();
        }
    }
}

/// Cheap-clone handle to the process's window manager.
#[derive(Clone)]
pub struct WindowManager {
    pub(crate) shared: Rc<ManagerShared>,
}

impl WindowManager {
    /// Initialize over the real terminal. Idempotent: when a manager
    /// already exists on this thread, the existing handle is returned
    /// without touching the terminal again.
    pub fn init() -> Result<WindowManager, WmError> {
        Self::init_with(Box::new(CrosstermBackend::new()))
    }

    /// Initialize over an explicit backend (tests use the headless one).
    pub fn init_with(backend: Box<dyn Backend>) -> Result<WindowManager, WmError> {
        if let Some(existing) = MANAGER.with(|m| m.borrow().clone()) {
            return Ok(existing);
        }
        if ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(WmError::AlreadyActive);
        }

        // Terminal first; nothing to tear down if this fails.
        let screen = match Screen::new(backend) {
            Ok(screen) => screen,
            Err(e) => {
                ACTIVE.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        let (cols, rows) = screen.size();

        let shared = Rc::new(ManagerShared {
            screen: RefCell::new(screen),
            root: RefCell::new(None),
            any_dirty: Cell::new(false),
            idle: RefCell::new(None),
            resize_pipe: RefCell::new(None),
        });
        let wm = WindowManager {
            shared: shared.clone(),
        };

        let root_rect = Rect::new(0, 0, cols as i32, rows as i32);
        let root = Window::new_root(Rc::downgrade(&shared), root_rect);
        *shared.root.borrow_mut() = Some(root.clone());
        MANAGER.with(|m| *m.borrow_mut() = Some(wm.clone()));

        // Signal handler last; a failure here unwinds everything that
        // came before and surfaces at the init boundary.
        match ResizePipe::install() {
            Ok(pipe) => *shared.resize_pipe.borrow_mut() = Some(pipe),
            Err(e) => {
                wm.shutdown();
                return Err(WmError::SignalInstall(e));
            }
        }

        root.invalidate();
        tracing::info!(cols, rows, "window manager initialized");
        Ok(wm)
    }

    /// The manager active on this thread, if any.
    pub fn get() -> Option<WindowManager> {
        MANAGER.with(|m| m.borrow().clone())
    }

    /// Tear down: destroy the window tree, restore the SIGWINCH
    /// disposition, leave the terminal. Idempotent and safe to call
    /// when nothing is initialized.
    pub fn shutdown(&self) {
        let Some(wm) = MANAGER.with(|m| m.borrow_mut().take()) else {
            return;
        };

        let root = wm.shared.root.borrow_mut().take();
        if let Some(root) = root {
            let _ = root.destroy();
        }
        if let Some(pipe) = wm.shared.resize_pipe.borrow_mut().take() {
            pipe.uninstall();
        }
        wm.shared.idle.borrow_mut().take();
        wm.shared.any_dirty.set(false);
        if let Err(e) = wm.shared.screen.borrow_mut().leave() {
            tracing::warn!(error = %e, "failed to restore terminal");
        }
        ACTIVE.store(false, Ordering::SeqCst);
        tracing::info!("window manager shut down");
    }

    /// The root window covering the whole terminal.
    pub fn root(&self) -> Result<Window, WmError> {
        self.shared.root_window().ok_or(WmError::NotInitialized)
    }

    /// Whether any leaf is marked dirty.
    pub fn any_dirty(&self) -> bool {
        self.shared.any_dirty.get()
    }

    /// Run the paint cycle to quiescence.
    ///
    /// While the dirty flag is set: find the first dirty visible leaf
    /// (depth first, insertion order), clear its flag, deliver `Paint`,
    /// and overlay its drawable onto the virtual screen. When no dirty
    /// leaf remains, commit the frame in a single flip and clear the
    /// flag. The physical terminal is never touched mid-frame.
    pub fn update(&self) -> Result<(), WmError> {
        while self.shared.any_dirty.get() {
            let root = self.root()?;
            match find_invalid(&root) {
                Some(leaf) => {
                    leaf.node.borrow_mut().dirty = false;
                    leaf.dispatch(WindowEvent::Paint);

                    let n = leaf.node.borrow();
                    if let Some(d) = n.drawable.as_ref() {
                        self.shared.screen.borrow_mut().copy_to_virtual(d);
                    }
                }
                None => {
                    self.shared.screen.borrow_mut().flip()?;
                    self.shared.any_dirty.set(false);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Reconcile geometry with the terminal after a SIGWINCH (or on
    /// explicit request).
    ///
    /// Drains the self-pipe flag, queries the OS for the current size,
    /// and — when it differs from the root — resizes the screen grids,
    /// repositions the root (children hear `PosChanged` through their
    /// ancestors) and forces an immediate paint cycle.
    pub fn resize(&self) -> Result<(), WmError> {
        if let Some(pipe) = self.shared.resize_pipe.borrow().as_ref() {
            pipe.drain_if_signaled();
        }

        let (cols, rows) = self.shared.screen.borrow().query_terminal_size()?;
        let root = self.root()?;
        let new = Rect::new(0, 0, cols as i32, rows as i32);
        if root.screen_rect() == new {
            return Ok(());
        }

        tracing::info!(cols, rows, "terminal resized");
        self.shared.screen.borrow_mut().handle_resize(cols, rows);
        root.set_pos(new)?;
        self.update()
    }

    /// Read end of the resize self-pipe, for external pollers.
    pub fn resize_fd(&self) -> Option<RawFd> {
        self.shared
            .resize_pipe
            .borrow()
            .as_ref()
            .map(|p| p.raw_read_fd())
    }

    /// Read one key from the terminal (see `Screen::read_key`).
    pub fn read_key(
        &self,
        timeout: Option<std::time::Duration>,
    ) -> Result<Option<Key>, WmError> {
        Ok(self.shared.screen.borrow_mut().read_key(timeout)?)
    }

    /// Run a closure against the screen (palette, pairs, bell).
    pub fn with_screen<R>(&self, f: impl FnOnce(&mut Screen) -> R) -> R {
        f(&mut self.shared.screen.borrow_mut())
    }
}

/// Depth-first search for the first visible dirty leaf.
///
/// Subtrees behind an invisible window are skipped; windows with
/// children are never returned (children cover their parents).
fn find_invalid(window: &Window) -> Option<Window> {
    let children = {
        let n = window.node.borrow();
        if !n.visible {
            return None;
        }
        if n.children.is_empty() {
            return n.dirty.then(|| window.clone());
        }
        n.children.clone()
    };

    children.iter().find_map(find_invalid)
}
