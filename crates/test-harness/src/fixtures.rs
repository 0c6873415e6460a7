//! Test fixtures for common scenarios.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, OnceLock};

use screen::backend::{HeadlessBackend, HeadlessHandle};
use screen::{Attrs, Rgb};
use terminal::emulator::{CursorPos, EmuCell, EmuColor, Emulator};
use terminal::palette;
use wm::geom::Rect;
use wm::{Window, WindowEvent, WindowHandler, WindowManager};

/// Standard test terminal dimensions.
pub const TEST_COLS: u16 = 80;
pub const TEST_ROWS: u16 = 24;

/// The manager and its SIGWINCH statics are process-global; scenario
/// tests hold this lock for their whole lifetime so suites can run on
/// parallel test threads.
static MANAGER_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// A headless window manager that tears itself down on drop.
pub struct ManagerFixture {
    pub wm: WindowManager,
    pub screen: HeadlessHandle,
    _guard: MutexGuard<'static, ()>,
}

impl ManagerFixture {
    pub fn new() -> Self {
        Self::with_size(TEST_COLS, TEST_ROWS)
    }

    pub fn with_size(cols: u16, rows: u16) -> Self {
        let guard = MANAGER_LOCK
            .get_or_init(Mutex::default)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (backend, screen) = HeadlessBackend::new(cols, rows);
        let wm = WindowManager::init_with(Box::new(backend)).expect("manager init");
        Self {
            wm,
            screen,
            _guard: guard,
        }
    }

    /// Fixture with the initial root repaint already flushed, so tests
    /// observe only their own paints.
    pub fn settled() -> Self {
        let fixture = Self::new();
        fixture.wm.update().expect("initial update");
        fixture
    }

    pub fn root(&self) -> Window {
        self.wm.root().expect("root window")
    }
}

impl Drop for ManagerFixture {
    fn drop(&mut self) {
        self.wm.shutdown();
    }
}

impl Default for ManagerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// What a [`RecordingHandler`] writes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Created,
    Destroyed,
    Paint,
    PosChanged { old: Rect, new: Rect },
}

/// Shared, cloneable event log keyed by window id.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<(u32, Recorded)>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(u32, Recorded)> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn count(&self, id: u32, event: Recorded) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|(i, e)| *i == id && *e == event)
            .count()
    }

    pub fn paints(&self, id: u32) -> usize {
        self.count(id, Recorded::Paint)
    }

    /// PosChanged payloads recorded for a window, in order.
    pub fn pos_changes(&self, id: u32) -> Vec<(Rect, Rect)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|(i, e)| match e {
                Recorded::PosChanged { old, new } if *i == id => Some((*old, *new)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, id: u32, event: Recorded) {
        self.0.borrow_mut().push((id, event));
    }
}

/// Handler that records every message; on `Paint` it optionally fills
/// the drawable with a marker character.
pub struct RecordingHandler {
    log: EventLog,
    fill: Option<char>,
}

impl WindowHandler for RecordingHandler {
    fn on_event(&mut self, window: &Window, event: WindowEvent) -> u32 {
        let recorded = match event {
            WindowEvent::Created => Recorded::Created,
            WindowEvent::Destroyed => Recorded::Destroyed,
            WindowEvent::Paint => {
                if let Some(ch) = self.fill {
                    let cell = screen::Cell::new(ch, Attrs::NONE, screen::PairId::DEFAULT);
                    let _ = window.with_drawable(|d| d.fill(cell));
                }
                Recorded::Paint
            }
            WindowEvent::PosChanged { old, new } => Recorded::PosChanged { old, new },
        };
        self.log.push(window.id(), recorded);
        0
    }
}

/// A recording handler that paints nothing.
pub fn recording_handler(log: &EventLog) -> Box<dyn WindowHandler> {
    Box::new(RecordingHandler {
        log: log.clone(),
        fill: None,
    })
}

/// A recording handler that fills its drawable with `ch` on paint.
pub fn fill_handler(log: &EventLog, ch: char) -> Box<dyn WindowHandler> {
    Box::new(RecordingHandler {
        log: log.clone(),
        fill: Some(ch),
    })
}

/// Scripted emulator with a settable grid, cursor and palette.
pub struct MockEmulator {
    rows: u16,
    cols: u16,
    cells: Vec<EmuCell>,
    cursor: CursorPos,
    cursor_visible: bool,
}

impl MockEmulator {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Self::blank(); rows as usize * cols as usize],
            cursor: CursorPos { row: 0, col: 0 },
            cursor_visible: true,
        }
    }

    fn blank() -> EmuCell {
        EmuCell {
            ch: '\0',
            attrs: Attrs::NONE,
            fg: EmuColor::Indexed(7),
            bg: EmuColor::Indexed(0),
        }
    }

    pub fn set_cell(&mut self, row: u16, col: u16, cell: EmuCell) {
        self.cells[row as usize * self.cols as usize + col as usize] = cell;
    }

    /// Write `text` at (row, col) with the default colors.
    pub fn set_text(&mut self, row: u16, col: u16, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            self.set_cell(
                row,
                col + i as u16,
                EmuCell {
                    ch,
                    attrs: Attrs::NONE,
                    fg: EmuColor::Indexed(7),
                    bg: EmuColor::Indexed(0),
                },
            );
        }
    }

    pub fn set_cursor(&mut self, row: u16, col: u16, visible: bool) {
        self.cursor = CursorPos { row, col };
        self.cursor_visible = visible;
    }
}

impl Emulator for MockEmulator {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn cell(&self, row: u16, col: u16) -> EmuCell {
        if row < self.rows && col < self.cols {
            self.cells[row as usize * self.cols as usize + col as usize]
        } else {
            Self::blank()
        }
    }

    fn palette_color(&self, idx: u8) -> Rgb {
        palette::color(idx)
    }

    fn cursor(&self) -> (CursorPos, bool) {
        (self.cursor, self.cursor_visible)
    }
}
