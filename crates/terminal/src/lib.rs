//! Virtual-terminal renderer
//!
//! Bridges an embedded terminal emulator onto the cell screen: damage
//! accumulation, palette capture with nearest-color matching, color
//! pair interning, and per-cell composition into a window's drawable.
//! The emulator surface is a trait; the production binding wraps
//! `alacritty_terminal`, tests use a scripted mock.

pub mod adapter;
pub mod color;
pub mod damage;
pub mod emulator;
pub mod palette;
pub mod pty;

pub use adapter::TermAdapter;
pub use color::ColorTable;
pub use damage::DamageAccumulator;
pub use emulator::{
    AlacrittyEmulator, CursorPos, EmuCell, EmuColor, Emulator, EmulatorEvent, TermProp,
};
pub use pty::{Pty, PtyError};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("PTY error: {0}")]
    Pty(#[from] PtyError),

    #[error("screen error: {0}")]
    Screen(#[from] screen::ScreenError),

    /// Cell writes during damage drawing only fail on programmer error
    /// or terminal death; callers treat this as fatal.
    #[error("cell draw failed at ({row}, {col}): {source}")]
    Draw {
        row: u16,
        col: u16,
        source: screen::ScreenError,
    },
}
