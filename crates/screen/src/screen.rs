//! The screen: virtual grid, pair registry, palette, atomic flush.
//!
//! Drawables are overlaid onto the virtual grid (`copy_to_virtual`,
//! the `wnoutrefresh` analogue); `flip` diffs the virtual grid against
//! the last flushed state and commits the difference to the backend in
//! one batch (the `doupdate` analogue). Nothing reaches the physical
//! terminal between flips.

use std::time::Duration;

use crate::backend::{Backend, CellPatch, ColorSpec, RawInput, ResolvedStyle};
use crate::cell::{Cell, PairId, Rgb};
use crate::drawable::Drawable;
use crate::input::{Key, RESIZE_FLOOD_LIMIT};
use crate::ScreenError;

/// Cell value that can never come out of a drawable; seeds the physical
/// grid so the first flip rewrites every position.
const UNKNOWN: Cell = Cell {
    ch: '\0',
    attrs: crate::cell::Attrs::NONE,
    pair: PairId(u32::MAX),
};

pub struct Screen {
    backend: Box<dyn Backend>,

    cols: u16,
    rows: u16,

    /// Aggregated drawable content since the last flip.
    virt: Vec<Cell>,

    /// What the physical terminal currently shows.
    phys: Vec<Cell>,

    /// Pair id -> (fg, bg) palette indices; -1 means terminal default.
    pairs: Vec<(i16, i16)>,

    /// Redefined palette slots in curses 0–1000 units.
    palette: Vec<Option<(u16, u16, u16)>>,

    /// Physical cursor position to park at on the next flip (col, row).
    pending_cursor: Option<(u16, u16)>,

    left: bool,
}

impl Screen {
    /// Take over the terminal: enter cell-display mode and size the
    /// grids to it.
    pub fn new(mut backend: Box<dyn Backend>) -> Result<Self, ScreenError> {
        backend.enter()?;
        let (cols, rows) = backend.size()?;
        let caps = backend.caps();
        let area = cols as usize * rows as usize;
        Ok(Self {
            backend,
            cols,
            rows,
            virt: vec![Cell::default(); area],
            phys: vec![UNKNOWN; area],
            pairs: vec![(-1, -1)],
            palette: vec![None; caps.colors as usize],
            pending_cursor: None,
            left: false,
        })
    }

    /// Restore the terminal. Idempotent.
    pub fn leave(&mut self) -> Result<(), ScreenError> {
        if self.left {
            return Ok(());
        }
        self.left = true;
        self.backend.leave()
    }

    /// Current grid size as (columns, rows).
    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Ask the OS for the terminal size (may differ from the grids
    /// until [`Screen::handle_resize`] runs).
    pub fn query_terminal_size(&self) -> Result<(u16, u16), ScreenError> {
        self.backend.size()
    }

    /// Adopt new terminal dimensions. The virtual grid is cleared and
    /// the physical grid invalidated; callers repaint everything after.
    pub fn handle_resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        let area = cols as usize * rows as usize;
        self.virt = vec![Cell::default(); area];
        self.phys = vec![UNKNOWN; area];
        self.pending_cursor = None;
    }

    // --- color capabilities ------------------------------------------------

    pub fn colors(&self) -> u16 {
        self.backend.caps().colors
    }

    pub fn pair_capacity(&self) -> u32 {
        self.backend.caps().pairs
    }

    pub fn can_change_color(&self) -> bool {
        self.backend.caps().can_change_color
    }

    /// Redefine a palette slot. The value is stored quantized to the
    /// 0–1000 unit range; [`Screen::color_content`] reads back exactly
    /// what the terminal will render.
    pub fn set_color(&mut self, idx: u16, rgb: Rgb) -> Result<(), ScreenError> {
        if !self.can_change_color() {
            return Err(ScreenError::FixedPalette);
        }
        if idx >= self.colors() {
            return Err(ScreenError::BadColorIndex(idx));
        }
        self.palette[idx as usize] = Some(rgb.to_curses_units());
        Ok(())
    }

    /// Report a palette slot: `Some` with the quantized redefined color,
    /// `None` when the slot still holds the terminal's own default.
    pub fn color_content(&self, idx: u16) -> Result<Option<Rgb>, ScreenError> {
        if idx >= self.colors() {
            return Err(ScreenError::BadColorIndex(idx));
        }
        Ok(self.palette[idx as usize].map(|(r, g, b)| Rgb::from_curses_units(r, g, b)))
    }

    /// Bind a pair id to palette indices (-1 = terminal default).
    /// Pair 0 is fixed to the default coloring; redefinable ids run
    /// from 1 through the advertised pair capacity.
    pub fn init_pair(&mut self, pair: PairId, fg: i16, bg: i16) -> Result<(), ScreenError> {
        if pair.0 == 0 || pair.0 > self.pair_capacity() {
            return Err(ScreenError::BadPair(pair.0));
        }
        let colors = self.colors() as i16;
        if fg < -1 || fg >= colors || bg < -1 || bg >= colors {
            return Err(ScreenError::BadColorIndex(fg.max(bg) as u16));
        }
        let idx = pair.0 as usize;
        if idx >= self.pairs.len() {
            self.pairs.resize(idx + 1, (-1, -1));
        }
        self.pairs[idx] = (fg, bg);
        Ok(())
    }

    /// Palette indices behind a pair id.
    pub fn pair_content(&self, pair: PairId) -> Option<(i16, i16)> {
        self.pairs.get(pair.0 as usize).copied()
    }

    // --- paint pipeline ----------------------------------------------------

    /// Overlay a drawable onto the virtual grid, clipped to the screen,
    /// and adopt its cursor as the pending physical cursor.
    pub fn copy_to_virtual(&mut self, drawable: &Drawable) {
        let (ox, oy) = drawable.origin();
        for (row, col, cell) in drawable.iter() {
            let x = ox + col as i32;
            let y = oy + row as i32;
            if x < 0 || y < 0 || x >= self.cols as i32 || y >= self.rows as i32 {
                continue;
            }
            self.virt[y as usize * self.cols as usize + x as usize] = *cell;
        }

        let (crow, ccol) = drawable.cursor();
        let cx = ox + ccol as i32;
        let cy = oy + crow as i32;
        if cx >= 0 && cy >= 0 && cx < self.cols as i32 && cy < self.rows as i32 {
            self.pending_cursor = Some((cx as u16, cy as u16));
        }
    }

    /// Commit the virtual grid to the physical terminal in one batch.
    pub fn flip(&mut self) -> Result<(), ScreenError> {
        let mut patches = Vec::new();
        for (i, (v, p)) in self.virt.iter().zip(self.phys.iter()).enumerate() {
            if v == p {
                continue;
            }
            let col = (i % self.cols as usize) as u16;
            let row = (i / self.cols as usize) as u16;
            patches.push(CellPatch {
                col,
                row,
                ch: v.ch,
                style: self.resolve(v),
            });
        }

        if !patches.is_empty() {
            tracing::trace!(cells = patches.len(), "flipping virtual screen");
            self.backend.draw(&patches)?;
        }
        if let Some((col, row)) = self.pending_cursor {
            self.backend.set_cursor(col, row)?;
        }
        self.backend.flush()?;
        self.phys.copy_from_slice(&self.virt);
        Ok(())
    }

    fn resolve(&self, cell: &Cell) -> ResolvedStyle {
        let (fg, bg) = self
            .pairs
            .get(cell.pair.0 as usize)
            .copied()
            .unwrap_or((-1, -1));
        ResolvedStyle {
            fg: self.spec(fg),
            bg: self.spec(bg),
            attrs: cell.attrs,
        }
    }

    fn spec(&self, idx: i16) -> ColorSpec {
        if idx < 0 {
            return ColorSpec::Default;
        }
        match self.palette.get(idx as usize) {
            Some(Some((r, g, b))) => ColorSpec::Rgb(Rgb::from_curses_units(*r, *g, *b)),
            _ => ColorSpec::Indexed(idx as u8),
        }
    }

    // --- drawable geometry -------------------------------------------------

    /// Move a drawable to a new screen-absolute origin. Fails without
    /// moving when the drawable would extend past the screen edge, so
    /// callers resize-to-fit before moving (the `mvwin` contract).
    pub fn move_drawable(&self, drawable: &mut Drawable, x: i32, y: i32) -> Result<(), ScreenError> {
        let (cols, rows) = drawable.size();
        if x < 0
            || y < 0
            || x + cols as i32 > self.cols as i32
            || y + rows as i32 > self.rows as i32
        {
            return Err(ScreenError::OffScreen);
        }
        drawable.set_origin(x, y);
        Ok(())
    }

    /// Resize a drawable in place. Fails when the new size does not fit
    /// at the drawable's current origin.
    pub fn resize_drawable(
        &self,
        drawable: &mut Drawable,
        cols: u16,
        rows: u16,
    ) -> Result<(), ScreenError> {
        let (x, y) = drawable.origin();
        let cols = cols.max(1);
        let rows = rows.max(1);
        if x < 0
            || y < 0
            || x + cols as i32 > self.cols as i32
            || y + rows as i32 > self.rows as i32
        {
            return Err(ScreenError::OffScreen);
        }
        drawable.resize(cols, rows);
        Ok(())
    }

    // --- terminal effects --------------------------------------------------

    pub fn beep(&mut self) -> Result<(), ScreenError> {
        self.backend.beep()
    }

    pub fn set_cursor_visible(&mut self, visible: bool) -> Result<(), ScreenError> {
        self.backend.set_cursor_visible(visible)
    }

    // --- input -------------------------------------------------------------

    /// Read one key, waiting up to `timeout` (`None` = block).
    ///
    /// Resize events are swallowed (the resize subsystem owns geometry);
    /// after [`RESIZE_FLOOD_LIMIT`] consecutive resizes inside one call
    /// the input queue is flushed and [`Key::Flood`] returned.
    pub fn read_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>, ScreenError> {
        let mut resizes = 0usize;
        loop {
            match self.backend.poll_input(timeout)? {
                None => return Ok(None),
                Some(RawInput::Key(key)) => return Ok(Some(key)),
                Some(RawInput::Resize(..)) => {
                    resizes += 1;
                    if resizes >= RESIZE_FLOOD_LIMIT {
                        tracing::warn!(events = resizes, "resize event flood, flushing input");
                        self.backend.drain_input()?;
                        return Ok(Some(Key::Flood));
                    }
                }
            }
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}
