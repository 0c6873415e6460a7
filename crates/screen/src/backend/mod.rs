//! Backend abstraction for the screen layer
//!
//! A [`Backend`] owns the physical terminal: entering and leaving the
//! cell-display mode, advertising color capabilities, applying batched
//! cell writes, and decoding input.
//!
//! # Backends
//!
//! - [`CrosstermBackend`]: the real terminal, via crossterm (raw mode,
//!   alternate screen, styled writes, key decoding).
//! - [`HeadlessBackend`]: an in-memory grid with scripted input and
//!   recorded side effects. Every test runs on it.
//!
//! Backends never see drawables or color pairs; [`crate::Screen`]
//! resolves pairs to concrete colors before handing cells down.

pub mod headless;
mod term;

pub use headless::{HeadlessBackend, HeadlessHandle};
pub use term::CrosstermBackend;

use std::time::Duration;

use crate::cell::{Attrs, Rgb};
use crate::input::Key;
use crate::ScreenError;

/// Color capabilities advertised by the terminal.
#[derive(Debug, Clone, Copy)]
pub struct BackendCaps {
    /// Number of palette colors (0 = monochrome terminal).
    pub colors: u16,

    /// Number of color pairs the display can tag cells with.
    pub pairs: u32,

    /// Whether palette slots can be redefined.
    pub can_change_color: bool,
}

/// A pair resolved down to concrete colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpec {
    /// Terminal default foreground/background.
    Default,
    /// Palette index as the terminal defines it.
    Indexed(u8),
    /// Redefined palette slot, sent as direct color.
    Rgb(Rgb),
}

/// Style of one flushed cell after pair resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub fg: ColorSpec,
    pub bg: ColorSpec,
    pub attrs: Attrs,
}

/// One changed cell in a flush batch.
#[derive(Debug, Clone, Copy)]
pub struct CellPatch {
    pub col: u16,
    pub row: u16,
    pub ch: char,
    pub style: ResolvedStyle,
}

/// Undecoded input from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    Key(Key),
    /// The terminal reports a new size (columns, rows).
    Resize(u16, u16),
}

/// Physical terminal operations.
pub trait Backend {
    /// Enter cell-display mode: raw input, no echo, alternate screen,
    /// hidden cursor, function-key decoding.
    fn enter(&mut self) -> Result<(), ScreenError>;

    /// Leave cell-display mode, restoring the terminal.
    fn leave(&mut self) -> Result<(), ScreenError>;

    fn caps(&self) -> BackendCaps;

    /// Current terminal size as (columns, rows), queried from the OS.
    fn size(&self) -> Result<(u16, u16), ScreenError>;

    /// Apply a batch of cell writes. The batch is not visible until
    /// [`Backend::flush`].
    fn draw(&mut self, patches: &[CellPatch]) -> Result<(), ScreenError>;

    /// Park the physical cursor.
    fn set_cursor(&mut self, col: u16, row: u16) -> Result<(), ScreenError>;

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), ScreenError>;

    /// Audible bell.
    fn beep(&mut self) -> Result<(), ScreenError>;

    /// Commit everything queued by [`Backend::draw`] in one write.
    fn flush(&mut self) -> Result<(), ScreenError>;

    /// Read one input event, waiting up to `timeout` (`None` = block).
    /// Returns `Ok(None)` on timeout.
    fn poll_input(&mut self, timeout: Option<Duration>) -> Result<Option<RawInput>, ScreenError>;

    /// Discard everything in the input queue.
    fn drain_input(&mut self) -> Result<(), ScreenError>;
}
