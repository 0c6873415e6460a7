//! cellterm - run a shell inside a managed terminal window.
//!
//! Wires the pieces together: a window manager over the real terminal,
//! one full-screen bordered window, an embedded emulator fed from a
//! PTY, and a calloop event loop multiplexing PTY output, keyboard
//! input and the resize self-pipe.

mod cli;
mod config;

use std::cell::{Cell, RefCell};
use std::io;
use std::os::fd::{AsFd, BorrowedFd, RawFd};
use std::rc::{Rc, Weak};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use calloop::generic::Generic;
use calloop::{EventLoop, Interest, LoopSignal, Mode, PostAction};

use screen::Key;
use terminal::{AlacrittyEmulator, EmulatorEvent, Pty, TermAdapter};
use wm::geom::Rect;
use wm::{Window, WindowEvent, WindowHandler, WindowManager};

use config::Config;

struct App;

/// Everything the event-loop callbacks share.
struct Session {
    wm: WindowManager,
    /// Filled in right after `create_child` returns.
    window: Option<Window>,
    emulator: AlacrittyEmulator,
    adapter: TermAdapter,
    pty: Pty,
}

impl Session {
    /// Drain the PTY, feed the emulator, apply its events, and arm a
    /// repaint when damage accumulated. Returns whether the child is
    /// still running.
    fn pump_pty(&mut self) -> Result<bool> {
        let mut buf = [0u8; 4096];
        loop {
            let n = self.pty.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let events = self.emulator.advance(&buf[..n]);
            self.apply_events(events)?;
        }

        if self.adapter.has_damage() {
            if let Some(window) = &self.window {
                window.invalidate();
            }
        }
        Ok(self.pty.is_running())
    }

    fn apply_events(&mut self, events: Vec<EmulatorEvent>) -> Result<()> {
        for event in events {
            match event {
                EmulatorEvent::PtyWrite(text) => {
                    let sent = self.pty.write(text.as_bytes())?;
                    if sent < text.len() {
                        tracing::warn!(sent, len = text.len(), "PTY buffer full, reply truncated");
                    }
                }
                event => {
                    let Some(window) = self.window.clone() else {
                        continue;
                    };
                    let adapter = &mut self.adapter;
                    self.wm
                        .with_screen(|screen| {
                            window.with_drawable(|d| adapter.handle_event(&event, d, screen))
                        })
                        .context("terminal window is gone")??;
                }
            }
        }
        Ok(())
    }

    fn send_key(&mut self, key: Key) -> Result<()> {
        if let Some(bytes) = encode_key(key) {
            let sent = self.pty.write(&bytes)?;
            if sent < bytes.len() {
                tracing::warn!(sent, len = bytes.len(), "PTY buffer full, key dropped");
            }
        }
        Ok(())
    }
}

/// Paints the emulator into the window and tracks geometry changes.
struct TermWindowHandler {
    session: Weak<RefCell<Session>>,
    signal: LoopSignal,
    fatal: Rc<Cell<bool>>,
}

impl WindowHandler for TermWindowHandler {
    fn on_event(&mut self, window: &Window, event: WindowEvent) -> u32 {
        let Some(session) = self.session.upgrade() else {
            return 0;
        };
        match event {
            WindowEvent::Paint => {
                let mut s = session.borrow_mut();
                let s = &mut *s;
                match window.with_drawable(|d| s.adapter.draw(&s.emulator, d)) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        // Out-of-bounds writes or a dead terminal; the
                        // session cannot continue.
                        tracing::error!(error = %e, "cell draw failed");
                        self.fatal.set(true);
                        self.signal.stop();
                    }
                    Err(e) => tracing::warn!(error = %e, "paint without drawable"),
                }
            }
            WindowEvent::PosChanged { new, .. } => {
                let mut s = session.borrow_mut();
                let cols = (new.width() - 2).max(1) as u16;
                let rows = (new.height() - 2).max(1) as u16;
                s.emulator.resize(rows, cols);
                if let Err(e) = s.pty.resize(cols, rows) {
                    tracing::warn!(error = %e, "PTY resize failed");
                }
                s.adapter.damage(Rect::new(0, 0, cols as i32, rows as i32));
                drop(s);
                window.invalidate();
            }
            WindowEvent::Created | WindowEvent::Destroyed => {}
        }
        0
    }
}

/// Keeps the terminal window tracking the root when SIGWINCH reshapes it.
struct RootResizeHandler {
    window: Window,
}

impl WindowHandler for RootResizeHandler {
    fn on_event(&mut self, _root: &Window, event: WindowEvent) -> u32 {
        if let WindowEvent::PosChanged { new, .. } = event {
            if let Err(e) = self
                .window
                .set_pos(Rect::new(0, 0, new.width(), new.height()))
            {
                tracing::warn!(error = %e, "failed to track terminal size");
            }
        }
        0
    }
}

/// The PTY master stays owned by the session; calloop polls a borrowed
/// view of its fd. The loop stops before the session drops.
struct PollFd(RawFd);

impl AsFd for PollFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        unsafe { BorrowedFd::borrow_raw(self.0) }
    }
}

fn main() -> Result<()> {
    let parsed = match cli::parse(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}\n\n{}", cli::USAGE);
            std::process::exit(2);
        }
    };
    let args = match parsed {
        cli::Cli::Help => {
            print!("{}", cli::USAGE);
            return Ok(());
        }
        cli::Cli::Version => {
            println!("cellterm {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        cli::Cli::Run(args) => args,
    };

    let _log_guard = setup_logging();
    let config = Config::load(args.config.as_deref());
    run(&args, &config)
}

fn run(args: &cli::Args, config: &Config) -> Result<()> {
    let mut event_loop: EventLoop<App> =
        EventLoop::try_new().context("failed to create event loop")?;
    let wm = WindowManager::init().context("failed to initialize window manager")?;

    // Keep the teardown on every exit path so the terminal is restored.
    let result = session_loop(&wm, &mut event_loop, args, config);
    wm.shutdown();
    result
}

fn session_loop(
    wm: &WindowManager,
    event_loop: &mut EventLoop<'static, App>,
    args: &cli::Args,
    config: &Config,
) -> Result<()> {
    wm.attach(&event_loop.handle())?;

    let root = wm.root()?;
    let root_rect = root.rect();
    let cols = (root_rect.width() - 2).max(1) as u16;
    let rows = (root_rect.height() - 2).max(1) as u16;

    let emulator = AlacrittyEmulator::new(rows, cols);
    let adapter = wm.with_screen(|screen| TermAdapter::new(screen, &emulator));
    wm.with_screen(|screen| screen.set_cursor_visible(config.show_cursor))?;

    let pty = match &args.command {
        Some(command) => Pty::spawn("/bin/sh", &["-c", command], cols, rows)?,
        None => {
            let shell = config.resolve_shell();
            Pty::spawn(&shell, &[], cols, rows)?
        }
    };
    let pty_fd = pty.as_raw_fd();

    let session = Rc::new(RefCell::new(Session {
        wm: wm.clone(),
        window: None,
        emulator,
        adapter,
        pty,
    }));
    let fatal = Rc::new(Cell::new(false));

    let window = root.create_child(
        Rect::new(0, 0, root_rect.width(), root_rect.height()),
        Box::new(TermWindowHandler {
            session: Rc::downgrade(&session),
            signal: event_loop.get_signal(),
            fatal: fatal.clone(),
        }),
        1,
    )?;
    session.borrow_mut().window = Some(window.clone());
    root.set_handler(Box::new(RootResizeHandler { window }));

    let signal = event_loop.get_signal();
    let pty_session = session.clone();
    event_loop
        .handle()
        .insert_source(
            Generic::new(PollFd(pty_fd), Interest::READ, Mode::Level),
            move |_, _, _| {
                match pty_session.borrow_mut().pump_pty() {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::info!("child exited");
                        signal.stop();
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "PTY processing failed");
                        signal.stop();
                    }
                }
                Ok(PostAction::Continue)
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to register PTY source: {e}"))?;

    let key_wm = wm.clone();
    let key_session = session.clone();
    event_loop
        .handle()
        .insert_source(
            Generic::new(io::stdin(), Interest::READ, Mode::Level),
            move |_, _, _| {
                loop {
                    match key_wm.read_key(Some(Duration::ZERO)) {
                        Ok(Some(Key::Flood)) => {
                            tracing::warn!("dropping flooded input");
                        }
                        Ok(Some(key)) => {
                            if let Err(e) = key_session.borrow_mut().send_key(key) {
                                tracing::warn!(error = %e, "key forward failed");
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            tracing::warn!(error = %e, "key read failed");
                            break;
                        }
                    }
                }
                Ok(PostAction::Continue)
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to register keyboard source: {e}"))?;

    let mut app = App;
    event_loop
        .run(None::<Duration>, &mut app, |_| {})
        .context("event loop failed")?;

    if fatal.get() {
        bail!("cell draw failed; terminal session aborted");
    }
    Ok(())
}

/// Escape-sequence encoding for keys forwarded to the PTY.
fn encode_key(key: Key) -> Option<Vec<u8>> {
    let mut buf = [0u8; 4];
    Some(match key {
        Key::Char(c) => c.encode_utf8(&mut buf).as_bytes().to_vec(),
        Key::Ctrl(c) => vec![(c as u8) & 0x1f],
        Key::Enter => b"\r".to_vec(),
        Key::Tab => b"\t".to_vec(),
        Key::Backspace => b"\x7f".to_vec(),
        Key::Esc => b"\x1b".to_vec(),
        Key::Up => b"\x1b[A".to_vec(),
        Key::Down => b"\x1b[B".to_vec(),
        Key::Right => b"\x1b[C".to_vec(),
        Key::Left => b"\x1b[D".to_vec(),
        Key::Home => b"\x1b[H".to_vec(),
        Key::End => b"\x1b[F".to_vec(),
        Key::PageUp => b"\x1b[5~".to_vec(),
        Key::PageDown => b"\x1b[6~".to_vec(),
        Key::Delete => b"\x1b[3~".to_vec(),
        Key::Insert => b"\x1b[2~".to_vec(),
        Key::F(n @ 1..=4) => {
            vec![0x1b, b'O', b'P' + n - 1]
        }
        Key::F(n @ 5..=12) => {
            let code = match n {
                5 => 15,
                6 => 17,
                7 => 18,
                8 => 19,
                9 => 20,
                10 => 21,
                11 => 23,
                _ => 24,
            };
            format!("\x1b[{}~", code).into_bytes()
        }
        Key::F(_) => return None,
        Key::Flood => return None,
    })
}

/// File logging, enabled by CELLTERM_LOG=<directory>. Stdout belongs to
/// the display, so nothing is logged without it.
fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = std::env::var("CELLTERM_LOG").ok()?;
    let appender = tracing_appender::rolling::never(dir, "cellterm.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_keys_encode_as_utf8() {
        assert_eq!(encode_key(Key::Char('a')), Some(b"a".to_vec()));
        assert_eq!(encode_key(Key::Char('é')), Some("é".as_bytes().to_vec()));
    }

    #[test]
    fn control_keys_fold_to_control_bytes() {
        assert_eq!(encode_key(Key::Ctrl('c')), Some(vec![0x03]));
        assert_eq!(encode_key(Key::Ctrl('d')), Some(vec![0x04]));
    }

    #[test]
    fn arrows_use_csi_sequences() {
        assert_eq!(encode_key(Key::Up), Some(b"\x1b[A".to_vec()));
        assert_eq!(encode_key(Key::Left), Some(b"\x1b[D".to_vec()));
    }

    #[test]
    fn function_keys_split_between_ss3_and_csi() {
        assert_eq!(encode_key(Key::F(1)), Some(b"\x1bOP".to_vec()));
        assert_eq!(encode_key(Key::F(5)), Some(b"\x1b[15~".to_vec()));
    }

    #[test]
    fn flood_sentinel_is_discarded() {
        assert_eq!(encode_key(Key::Flood), None);
    }
}
