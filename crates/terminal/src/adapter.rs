//! Terminal adapter: emulator events onto a window drawable.
//!
//! Damage reports coalesce in a [`DamageAccumulator`]; a draw clamps
//! the accumulated rectangle to the drawable's interior (one cell of
//! frame on every side), composes each emulated cell through the color
//! table, and restores the cursor. Bell and property changes map onto
//! screen effects.

use screen::{Cell, Drawable, PairId, Screen};
use wm::geom::Rect;

use crate::color::ColorTable;
use crate::damage::DamageAccumulator;
use crate::emulator::{CursorPos, Emulator, EmulatorEvent, TermProp};
use crate::TerminalError;

pub struct TermAdapter {
    colors: Option<ColorTable>,
    damage: DamageAccumulator,
}

impl TermAdapter {
    /// Bind the adapter to a screen and emulator.
    ///
    /// On terminals without color support the table is skipped and all
    /// cells are written with the default pair.
    pub fn new(screen: &mut Screen, emulator: &dyn Emulator) -> Self {
        let colors = match ColorTable::bind(screen, emulator) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!(error = %e, "color table unavailable, skipping color tagging");
                None
            }
        };
        Self {
            colors,
            damage: DamageAccumulator::new(),
        }
    }

    pub fn color_table(&self) -> Option<&ColorTable> {
        self.colors.as_ref()
    }

    /// Record damage in emulator coordinates.
    pub fn damage(&mut self, rect: Rect) {
        self.damage.add(rect);
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    /// Route one emulator event. `PtyWrite` is the owner's business and
    /// passes through untouched.
    pub fn handle_event(
        &mut self,
        event: &EmulatorEvent,
        drawable: &mut Drawable,
        screen: &mut Screen,
    ) -> Result<(), TerminalError> {
        match event {
            EmulatorEvent::Damage(rect) => self.damage(*rect),
            EmulatorEvent::CursorMove { new, visible, .. } => {
                self.move_cursor(*new, *visible, drawable);
            }
            EmulatorEvent::Bell => screen.beep()?,
            EmulatorEvent::Prop(prop) => self.set_term_prop(prop, screen)?,
            EmulatorEvent::PtyWrite(_) => {}
        }
        Ok(())
    }

    /// Track the emulator cursor on the drawable, offset past the frame.
    /// Out-of-range positions are logged and dropped.
    pub fn move_cursor(&self, new: CursorPos, _visible: bool, drawable: &mut Drawable) {
        let (cols, rows) = drawable.size();
        if cols < 3 || rows < 3 {
            return;
        }
        if new.row >= rows - 2 || new.col >= cols - 2 {
            tracing::warn!(row = new.row, col = new.col, "cursor move out of range, ignoring");
            return;
        }
        let _ = drawable.set_cursor(new.row + 1, new.col + 1);
    }

    /// Apply a terminal property change. Only cursor visibility has an
    /// effect; the rest are acknowledged and dropped.
    pub fn set_term_prop(&self, prop: &TermProp, screen: &mut Screen) -> Result<(), TerminalError> {
        match prop {
            TermProp::CursorVisible(visible) => screen.set_cursor_visible(*visible)?,
            other => {
                tracing::debug!(prop = ?other, "terminal property not implemented");
            }
        }
        Ok(())
    }

    /// Redraw the accumulated damage into the drawable.
    ///
    /// The damage is clamped to the interior; when it touches any edge
    /// the whole frame is redrawn too. Cells are composed at
    /// `(row + 1, col + 1)` with blank substitution for empty content.
    /// The cursor position is restored afterwards and the accumulator
    /// cleared. A failed cell write is a fatal error.
    pub fn draw(
        &mut self,
        emulator: &dyn Emulator,
        drawable: &mut Drawable,
    ) -> Result<(), TerminalError> {
        if self.damage.is_empty() {
            return Ok(());
        }
        let accumulated = self.damage.take();

        let (d_cols, d_rows) = drawable.size();
        if d_cols < 3 || d_rows < 3 {
            // No interior to draw into.
            return Ok(());
        }
        let interior_cols = (d_cols - 2) as i32;
        let interior_rows = (d_rows - 2) as i32;

        let (emu_rows, emu_cols) = emulator.size();
        let clamped = accumulated.intersect(Rect::new(
            0,
            0,
            interior_cols.min(emu_cols as i32),
            interior_rows.min(emu_rows as i32),
        ));
        if clamped.is_empty() {
            return Ok(());
        }

        let saved_cursor = drawable.cursor();

        if clamped.left == 0
            || clamped.top == 0
            || clamped.right >= interior_cols
            || clamped.bottom >= interior_rows
        {
            drawable.draw_border(self.border_pair());
        }

        for row in clamped.top..clamped.bottom {
            for col in clamped.left..clamped.right {
                let emu_cell = emulator.cell(row as u16, col as u16);
                let ch = if emu_cell.ch == '\0' { ' ' } else { emu_cell.ch };
                let pair = match self.colors.as_mut() {
                    Some(table) => {
                        let fg = table.index_of(emu_cell.fg);
                        let bg = table.index_of(emu_cell.bg);
                        table.pair(fg, bg)
                    }
                    None => PairId::DEFAULT,
                };
                drawable
                    .put(row as u16 + 1, col as u16 + 1, Cell::new(ch, emu_cell.attrs, pair))
                    .map_err(|source| TerminalError::Draw {
                        row: row as u16,
                        col: col as u16,
                        source,
                    })?;
            }
        }

        drawable
            .set_cursor(saved_cursor.0, saved_cursor.1)
            .map_err(|source| TerminalError::Draw {
                row: saved_cursor.0,
                col: saved_cursor.1,
                source,
            })?;
        Ok(())
    }

    fn border_pair(&self) -> PairId {
        match self.colors.as_ref() {
            Some(table) => table.pair(7, 0),
            None => PairId::DEFAULT,
        }
    }
}
