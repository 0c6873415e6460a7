//! Character-cell screen layer
//!
//! A curses-style display stack: per-window off-screen cell buffers
//! ([`Drawable`]), a virtual screen that aggregates them, and a single
//! atomic flush to the physical terminal. Color pairs and palette slots
//! follow the curses model (pair ids tag cells, palette entries live in
//! 0–1000 units terminal-side).
//!
//! The physical terminal is reached through the [`Backend`] trait; the
//! crossterm implementation drives a real terminal and the headless one
//! backs every test.

pub mod backend;
mod cell;
mod drawable;
mod input;
mod screen;

pub use backend::{Backend, BackendCaps, CellPatch, ColorSpec, RawInput, ResolvedStyle};
pub use cell::{Attrs, Cell, PairId, Rgb};
pub use drawable::Drawable;
pub use input::{Key, RESIZE_FLOOD_LIMIT};
pub use screen::Screen;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenError {
    #[error("cell ({row}, {col}) outside drawable of {rows} rows x {cols} cols")]
    OutOfBounds {
        row: u16,
        col: u16,
        rows: u16,
        cols: u16,
    },

    #[error("drawable would extend past the screen edge")]
    OffScreen,

    #[error("terminal reports no color support")]
    NoColors,

    #[error("palette does not support redefinition")]
    FixedPalette,

    #[error("color index {0} out of range")]
    BadColorIndex(u16),

    #[error("color pair {0} out of range")]
    BadPair(u32),

    #[error("terminal backend error: {0}")]
    Backend(#[from] std::io::Error),
}
