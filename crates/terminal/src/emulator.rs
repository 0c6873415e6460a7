//! The emulator surface and its alacritty_terminal binding.
//!
//! The renderer consumes a small view of the embedded emulator: grid
//! size, cell lookup, default palette, cursor — plus a stream of
//! events (damage, cursor moves, bell, property changes). Anything
//! satisfying [`Emulator`] can sit behind the adapter; production code
//! uses [`AlacrittyEmulator`].

use std::sync::mpsc;

use alacritty_terminal::event::{Event, EventListener};
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::cell::Flags;
use alacritty_terminal::term::{Config as TermConfig, Term, TermDamage, TermMode};
use alacritty_terminal::vte::ansi;

use screen::{Attrs, Rgb};
use wm::geom::Rect;

use crate::palette;

/// A color as the emulator reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmuColor {
    /// Palette index (0-255).
    Indexed(u8),
    /// Direct color from a truecolor escape.
    Rgb(Rgb),
}

/// One emulated cell, already reduced to what the renderer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuCell {
    /// `'\0'` means empty; the renderer substitutes a blank.
    pub ch: char,
    pub attrs: Attrs,
    pub fg: EmuColor,
    pub bg: EmuColor,
}

/// Cursor position in emulator grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPos {
    pub row: u16,
    pub col: u16,
}

/// Terminal properties the emulator can toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermProp {
    CursorVisible(bool),
    Title(String),
    AltScreen(bool),
}

/// Events flowing from the emulator to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulatorEvent {
    /// A region of the grid changed (emulator coordinates).
    Damage(Rect),

    /// The cursor moved.
    CursorMove {
        new: CursorPos,
        old: CursorPos,
        visible: bool,
    },

    Bell,

    Prop(TermProp),

    /// The emulator answers a query; the owner writes this to the PTY.
    PtyWrite(String),
}

/// Read-only emulator state the renderer draws from.
pub trait Emulator {
    /// Grid size as (rows, columns).
    fn size(&self) -> (u16, u16);

    /// Cell content at (row, col); blank for out-of-range positions.
    fn cell(&self, row: u16, col: u16) -> EmuCell;

    /// Default palette entry, before any terminal round trip.
    fn palette_color(&self, idx: u8) -> Rgb;

    /// Cursor position and visibility.
    fn cursor(&self) -> (CursorPos, bool);
}

// --- alacritty binding -----------------------------------------------------

/// Forwards alacritty events onto a channel drained by `advance`.
struct EventProxy(mpsc::Sender<Event>);

impl EventListener for EventProxy {
    fn send_event(&self, event: Event) {
        let _ = self.0.send(event);
    }
}

/// Fixed grid dimensions for alacritty.
struct GridSize {
    cols: usize,
    rows: usize,
}

impl Dimensions for GridSize {
    fn total_lines(&self) -> usize {
        self.rows
    }

    fn screen_lines(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.cols
    }
}

/// Embedded terminal emulator backed by `alacritty_terminal`.
pub struct AlacrittyEmulator {
    term: Term<EventProxy>,
    parser: ansi::Processor,
    events: mpsc::Receiver<Event>,
    rows: u16,
    cols: u16,
    last_cursor: CursorPos,
}

impl AlacrittyEmulator {
    pub fn new(rows: u16, cols: u16) -> Self {
        let (sender, receiver) = mpsc::channel();
        let size = GridSize {
            cols: cols as usize,
            rows: rows as usize,
        };
        let term = Term::new(TermConfig::default(), &size, EventProxy(sender));
        Self {
            term,
            parser: ansi::Processor::new(),
            events: receiver,
            rows,
            cols,
            last_cursor: CursorPos { row: 0, col: 0 },
        }
    }

    /// Feed output bytes through the VTE parser and report what changed.
    pub fn advance(&mut self, bytes: &[u8]) -> Vec<EmulatorEvent> {
        let old_cursor = self.last_cursor;
        let was_visible = self.cursor_visible();
        let was_alt = self.term.mode().contains(TermMode::ALT_SCREEN);

        for byte in bytes {
            self.parser.advance(&mut self.term, *byte);
        }

        let mut events = Vec::new();

        match self.term.damage() {
            TermDamage::Full => {
                events.push(EmulatorEvent::Damage(Rect::new(
                    0,
                    0,
                    self.cols as i32,
                    self.rows as i32,
                )));
            }
            TermDamage::Partial(lines) => {
                for bounds in lines {
                    events.push(EmulatorEvent::Damage(Rect::new(
                        bounds.left as i32,
                        bounds.line as i32,
                        bounds.right as i32 + 1,
                        bounds.line as i32 + 1,
                    )));
                }
            }
        }
        self.term.reset_damage();

        for event in self.events.try_iter() {
            match event {
                Event::Bell => events.push(EmulatorEvent::Bell),
                Event::Title(title) => {
                    events.push(EmulatorEvent::Prop(TermProp::Title(title)));
                }
                Event::PtyWrite(text) => events.push(EmulatorEvent::PtyWrite(text)),
                _ => {}
            }
        }

        let visible = self.cursor_visible();
        if visible != was_visible {
            events.push(EmulatorEvent::Prop(TermProp::CursorVisible(visible)));
        }
        let alt = self.term.mode().contains(TermMode::ALT_SCREEN);
        if alt != was_alt {
            events.push(EmulatorEvent::Prop(TermProp::AltScreen(alt)));
        }

        let new_cursor = self.cursor_position();
        if new_cursor != old_cursor {
            self.last_cursor = new_cursor;
            events.push(EmulatorEvent::CursorMove {
                new: new_cursor,
                old: old_cursor,
                visible,
            });
        }

        events
    }

    /// Resize the emulator grid (after the window reshaped).
    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.rows = rows;
        self.cols = cols;
        self.term.resize(GridSize {
            cols: cols as usize,
            rows: rows as usize,
        });
    }

    fn cursor_position(&self) -> CursorPos {
        let point = self.term.grid().cursor.point;
        CursorPos {
            row: point.line.0.max(0) as u16,
            col: point.column.0 as u16,
        }
    }

    fn cursor_visible(&self) -> bool {
        self.term.mode().contains(TermMode::SHOW_CURSOR)
    }
}

impl Emulator for AlacrittyEmulator {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn cell(&self, row: u16, col: u16) -> EmuCell {
        if row >= self.rows || col >= self.cols {
            return blank_cell();
        }
        let grid = self.term.grid();
        let cell = &grid[Line(row as i32)][Column(col as usize)];

        let ch = if cell.flags.intersects(Flags::WIDE_CHAR_SPACER) {
            ' '
        } else {
            cell.c
        };
        EmuCell {
            ch,
            attrs: Attrs {
                bold: cell.flags.contains(Flags::BOLD),
                underline: cell
                    .flags
                    .intersects(Flags::UNDERLINE | Flags::DOUBLE_UNDERLINE | Flags::UNDERCURL),
                // alacritty_terminal drops blink; cells never carry it.
                blink: false,
                reverse: cell.flags.contains(Flags::INVERSE),
            },
            fg: convert_color(cell.fg),
            bg: convert_color(cell.bg),
        }
    }

    fn palette_color(&self, idx: u8) -> Rgb {
        match self.term.colors()[idx as usize] {
            Some(rgb) => Rgb::new(rgb.r, rgb.g, rgb.b),
            None => palette::color(idx),
        }
    }

    fn cursor(&self) -> (CursorPos, bool) {
        (self.cursor_position(), self.cursor_visible())
    }
}

fn blank_cell() -> EmuCell {
    EmuCell {
        ch: ' ',
        attrs: Attrs::NONE,
        fg: EmuColor::Indexed(7),
        bg: EmuColor::Indexed(0),
    }
}

fn convert_color(color: ansi::Color) -> EmuColor {
    use ansi::NamedColor;

    match color {
        ansi::Color::Spec(rgb) => EmuColor::Rgb(Rgb::new(rgb.r, rgb.g, rgb.b)),
        ansi::Color::Indexed(idx) => EmuColor::Indexed(idx),
        ansi::Color::Named(named) => EmuColor::Indexed(match named {
            NamedColor::Black | NamedColor::DimBlack => 0,
            NamedColor::Red | NamedColor::DimRed => 1,
            NamedColor::Green | NamedColor::DimGreen => 2,
            NamedColor::Yellow | NamedColor::DimYellow => 3,
            NamedColor::Blue | NamedColor::DimBlue => 4,
            NamedColor::Magenta | NamedColor::DimMagenta => 5,
            NamedColor::Cyan | NamedColor::DimCyan => 6,
            NamedColor::White | NamedColor::DimWhite => 7,
            NamedColor::BrightBlack => 8,
            NamedColor::BrightRed => 9,
            NamedColor::BrightGreen => 10,
            NamedColor::BrightYellow => 11,
            NamedColor::BrightBlue => 12,
            NamedColor::BrightMagenta => 13,
            NamedColor::BrightCyan => 14,
            NamedColor::BrightWhite => 15,
            NamedColor::Background => 0,
            // Foreground, cursor and the rest render as default text.
            _ => 7,
        }),
    }
}
