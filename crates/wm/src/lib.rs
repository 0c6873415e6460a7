//! Window manager core
//!
//! A tree of rectangular windows over the character-cell screen layer:
//! parent/child topology, screen-vs-parent coordinate arithmetic,
//! visibility propagation, rectangle invalidation with deferred
//! coalesced repaint, and asynchronous terminal-resize handling through
//! a signal-safe self-pipe.
//!
//! The manager is a process-wide singleton created by
//! [`WindowManager::init`] (or [`WindowManager::init_with`] for a
//! non-terminal backend in tests). All mutation is single-threaded and
//! cooperative; handlers run synchronously and may re-enter the
//! manager.

pub mod geom;

mod event_loop;
mod manager;
mod resize;
mod window;

pub use manager::WindowManager;
pub use window::{Window, WindowEvent, WindowHandler};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WmError {
    #[error("window manager is not initialized")]
    NotInitialized,

    #[error("a window manager is already active in this process")]
    AlreadyActive,

    #[error("window has been destroyed")]
    WindowDestroyed,

    #[error("window has no backing drawable")]
    NoDrawable,

    #[error("screen error: {0}")]
    Screen(#[from] screen::ScreenError),

    #[error("SIGWINCH handler installation failed: {0}")]
    SignalInstall(std::io::Error),

    #[error("event loop registration failed: {0}")]
    EventLoop(String),
}
