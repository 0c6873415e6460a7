//! Headless backend for testing without a terminal.
//!
//! Applies flushed cells to an in-memory grid and records side effects
//! (beeps, cursor visibility, flush counts). Input is scripted through a
//! [`HeadlessHandle`], which shares state with the backend so tests can
//! inspect the grid after the `Screen` has taken ownership of the
//! backend itself.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use super::{Backend, BackendCaps, CellPatch, ColorSpec, RawInput, ResolvedStyle};
use crate::cell::Attrs;
use crate::ScreenError;

const BLANK_STYLE: ResolvedStyle = ResolvedStyle {
    fg: ColorSpec::Default,
    bg: ColorSpec::Default,
    attrs: Attrs::NONE,
};

struct HeadlessState {
    cols: u16,
    rows: u16,
    grid: Vec<(char, ResolvedStyle)>,
    pending: Vec<CellPatch>,
    inputs: VecDeque<RawInput>,
    caps: BackendCaps,
    cursor: (u16, u16),
    cursor_visible: bool,
    entered: bool,
    flushes: usize,
    beeps: usize,
    cells_in_last_flush: usize,
}

/// In-memory terminal backend.
pub struct HeadlessBackend {
    state: Rc<RefCell<HeadlessState>>,
}

/// Test-side view of a [`HeadlessBackend`], valid after the backend has
/// been moved into a `Screen`.
#[derive(Clone)]
pub struct HeadlessHandle {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessBackend {
    /// 256-color terminal with a mutable palette.
    pub fn new(cols: u16, rows: u16) -> (Self, HeadlessHandle) {
        Self::with_caps(
            cols,
            rows,
            BackendCaps {
                colors: 256,
                pairs: 256 * 256,
                can_change_color: true,
            },
        )
    }

    pub fn with_caps(cols: u16, rows: u16, caps: BackendCaps) -> (Self, HeadlessHandle) {
        let state = Rc::new(RefCell::new(HeadlessState {
            cols,
            rows,
            grid: vec![(' ', BLANK_STYLE); cols as usize * rows as usize],
            pending: Vec::new(),
            inputs: VecDeque::new(),
            caps,
            cursor: (0, 0),
            cursor_visible: false,
            entered: false,
            flushes: 0,
            beeps: 0,
            cells_in_last_flush: 0,
        }));
        (
            Self {
                state: state.clone(),
            },
            HeadlessHandle { state },
        )
    }
}

impl Backend for HeadlessBackend {
    fn enter(&mut self) -> Result<(), ScreenError> {
        let mut s = self.state.borrow_mut();
        s.entered = true;
        s.cursor_visible = false;
        Ok(())
    }

    fn leave(&mut self) -> Result<(), ScreenError> {
        self.state.borrow_mut().entered = false;
        Ok(())
    }

    fn caps(&self) -> BackendCaps {
        self.state.borrow().caps
    }

    fn size(&self) -> Result<(u16, u16), ScreenError> {
        let s = self.state.borrow();
        Ok((s.cols, s.rows))
    }

    fn draw(&mut self, patches: &[CellPatch]) -> Result<(), ScreenError> {
        self.state.borrow_mut().pending.extend_from_slice(patches);
        Ok(())
    }

    fn set_cursor(&mut self, col: u16, row: u16) -> Result<(), ScreenError> {
        self.state.borrow_mut().cursor = (col, row);
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), ScreenError> {
        self.state.borrow_mut().cursor_visible = visible;
        Ok(())
    }

    fn beep(&mut self) -> Result<(), ScreenError> {
        self.state.borrow_mut().beeps += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ScreenError> {
        let mut s = self.state.borrow_mut();
        let pending = std::mem::take(&mut s.pending);
        s.cells_in_last_flush = pending.len();
        for p in &pending {
            if p.col < s.cols && p.row < s.rows {
                let cols = s.cols as usize;
                s.grid[p.row as usize * cols + p.col as usize] = (p.ch, p.style);
            }
        }
        s.flushes += 1;
        Ok(())
    }

    fn poll_input(&mut self, _timeout: Option<Duration>) -> Result<Option<RawInput>, ScreenError> {
        Ok(self.state.borrow_mut().inputs.pop_front())
    }

    fn drain_input(&mut self) -> Result<(), ScreenError> {
        self.state.borrow_mut().inputs.clear();
        Ok(())
    }
}

impl HeadlessHandle {
    /// Pretend the user resized the terminal; the next OS size query
    /// reports the new dimensions.
    pub fn set_size(&self, cols: u16, rows: u16) {
        let mut s = self.state.borrow_mut();
        s.cols = cols;
        s.rows = rows;
        s.grid = vec![(' ', BLANK_STYLE); cols as usize * rows as usize];
    }

    /// Queue input for the next `poll_input`.
    pub fn push_input(&self, input: RawInput) {
        self.state.borrow_mut().inputs.push_back(input);
    }

    pub fn queued_inputs(&self) -> usize {
        self.state.borrow().inputs.len()
    }

    /// Character at a physical position after the last flush.
    pub fn char_at(&self, col: u16, row: u16) -> char {
        let s = self.state.borrow();
        s.grid[row as usize * s.cols as usize + col as usize].0
    }

    /// Resolved style at a physical position after the last flush.
    pub fn style_at(&self, col: u16, row: u16) -> ResolvedStyle {
        let s = self.state.borrow();
        s.grid[row as usize * s.cols as usize + col as usize].1
    }

    /// One physical row as text.
    pub fn row_text(&self, row: u16) -> String {
        let s = self.state.borrow();
        (0..s.cols)
            .map(|col| s.grid[row as usize * s.cols as usize + col as usize].0)
            .collect()
    }

    pub fn flushes(&self) -> usize {
        self.state.borrow().flushes
    }

    pub fn beeps(&self) -> usize {
        self.state.borrow().beeps
    }

    pub fn cells_in_last_flush(&self) -> usize {
        self.state.borrow().cells_in_last_flush
    }

    pub fn cursor(&self) -> (u16, u16) {
        self.state.borrow().cursor
    }

    pub fn cursor_visible(&self) -> bool {
        self.state.borrow().cursor_visible
    }

    pub fn entered(&self) -> bool {
        self.state.borrow().entered
    }
}
