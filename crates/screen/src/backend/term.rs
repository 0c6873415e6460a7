//! Real-terminal backend over crossterm.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::{cursor, event, execute, queue, terminal};

use super::{Backend, BackendCaps, CellPatch, ColorSpec, RawInput};
use crate::input::Key;
use crate::ScreenError;

/// Backend driving the process's controlling terminal.
pub struct CrosstermBackend {
    out: io::Stdout,
    caps: BackendCaps,
    entered: bool,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        let caps = detect_caps();
        tracing::debug!(
            colors = caps.colors,
            pairs = caps.pairs,
            can_change_color = caps.can_change_color,
            "detected terminal color capabilities"
        );
        Self {
            out: io::stdout(),
            caps,
            entered: false,
        }
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability detection from the environment, the way terminfo would
/// report `colors`/`pairs`/`ccc`.
fn detect_caps() -> BackendCaps {
    let term = std::env::var("TERM").unwrap_or_default();
    let colorterm = std::env::var("COLORTERM").unwrap_or_default();

    let truecolor = colorterm == "truecolor" || colorterm == "24bit";
    let colors: u16 = if term.contains("256color") || truecolor {
        256
    } else if term.is_empty() || term == "dumb" {
        0
    } else {
        8
    };

    BackendCaps {
        colors,
        pairs: colors as u32 * colors as u32,
        // Redefined slots are emitted as direct color, so redefinition
        // only works where the terminal accepts RGB.
        can_change_color: truecolor,
    }
}

fn spec_to_color(spec: ColorSpec) -> Color {
    match spec {
        ColorSpec::Default => Color::Reset,
        ColorSpec::Indexed(i) => Color::AnsiValue(i),
        ColorSpec::Rgb(rgb) => Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        },
    }
}

impl Backend for CrosstermBackend {
    fn enter(&mut self) -> Result<(), ScreenError> {
        terminal::enable_raw_mode()?;
        execute!(
            self.out,
            terminal::EnterAlternateScreen,
            terminal::Clear(terminal::ClearType::All),
            cursor::Hide,
        )?;
        self.entered = true;
        Ok(())
    }

    fn leave(&mut self) -> Result<(), ScreenError> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    fn caps(&self) -> BackendCaps {
        self.caps
    }

    fn size(&self) -> Result<(u16, u16), ScreenError> {
        let winsize = rustix::termios::tcgetwinsize(rustix::stdio::stdout())
            .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))?;
        Ok((winsize.ws_col, winsize.ws_row))
    }

    fn draw(&mut self, patches: &[CellPatch]) -> Result<(), ScreenError> {
        for p in patches {
            queue!(
                self.out,
                cursor::MoveTo(p.col, p.row),
                SetAttribute(Attribute::Reset),
                ResetColor,
            )?;
            if p.style.attrs.bold {
                queue!(self.out, SetAttribute(Attribute::Bold))?;
            }
            if p.style.attrs.underline {
                queue!(self.out, SetAttribute(Attribute::Underlined))?;
            }
            if p.style.attrs.blink {
                queue!(self.out, SetAttribute(Attribute::SlowBlink))?;
            }
            if p.style.attrs.reverse {
                queue!(self.out, SetAttribute(Attribute::Reverse))?;
            }
            queue!(
                self.out,
                SetForegroundColor(spec_to_color(p.style.fg)),
                SetBackgroundColor(spec_to_color(p.style.bg)),
                Print(p.ch),
            )?;
        }
        Ok(())
    }

    fn set_cursor(&mut self, col: u16, row: u16) -> Result<(), ScreenError> {
        queue!(self.out, cursor::MoveTo(col, row))?;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), ScreenError> {
        if visible {
            execute!(self.out, cursor::Show)?;
        } else {
            execute!(self.out, cursor::Hide)?;
        }
        Ok(())
    }

    fn beep(&mut self) -> Result<(), ScreenError> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ScreenError> {
        self.out.flush()?;
        Ok(())
    }

    fn poll_input(&mut self, timeout: Option<Duration>) -> Result<Option<RawInput>, ScreenError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let wait = match deadline {
                Some(d) => d.saturating_duration_since(Instant::now()),
                // Long slices instead of a true block so callers can
                // still be interrupted by signals.
                None => Duration::from_secs(3600),
            };
            if !event::poll(wait)? {
                if deadline.is_some() {
                    return Ok(None);
                }
                continue;
            }
            match event::read()? {
                event::Event::Key(key) if key.kind != event::KeyEventKind::Release => {
                    if let Some(key) = decode_key(key) {
                        return Ok(Some(RawInput::Key(key)));
                    }
                }
                event::Event::Resize(cols, rows) => {
                    return Ok(Some(RawInput::Resize(cols, rows)));
                }
                // Mouse, focus and paste events are not part of the
                // input surface; keep polling until the deadline.
                _ => {}
            }
            if let Some(d) = deadline {
                if Instant::now() >= d {
                    return Ok(None);
                }
            }
        }
    }

    fn drain_input(&mut self) -> Result<(), ScreenError> {
        while event::poll(Duration::ZERO)? {
            let _ = event::read()?;
        }
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        // Last-chance restore when shutdown was skipped (panic paths).
        if self.entered {
            let _ = self.leave();
        }
    }
}

fn decode_key(key: event::KeyEvent) -> Option<Key> {
    use event::KeyCode;

    let ctrl = key.modifiers.contains(event::KeyModifiers::CONTROL);
    Some(match key.code {
        KeyCode::Char(c) if ctrl => Key::Ctrl(c.to_ascii_lowercase()),
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Esc => Key::Esc,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Delete => Key::Delete,
        KeyCode::Insert => Key::Insert,
        KeyCode::F(n) => Key::F(n),
        _ => return None,
    })
}
