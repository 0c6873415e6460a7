//! Resize subsystem: SIGWINCH coalescing through the self-pipe and
//! geometry reconciliation.

use test_harness::fixtures::{fill_handler, recording_handler, EventLog, ManagerFixture};
use wm::geom::Rect;
use wm::{Window, WindowEvent, WindowHandler};

#[test]
fn resize_reshapes_the_root_and_notifies_its_handler() {
    let fixture = ManagerFixture::with_size(100, 40);
    fixture.wm.update().unwrap();
    let log = EventLog::new();
    fixture.root().set_handler(recording_handler(&log));

    fixture.screen.set_size(80, 24);
    fixture.wm.resize().unwrap();

    assert_eq!(fixture.root().screen_rect(), Rect::new(0, 0, 80, 24));
    assert_eq!(
        log.pos_changes(0),
        vec![(Rect::new(0, 0, 100, 40), Rect::new(0, 0, 80, 24))]
    );
    // resize() forces an immediate paint cycle at the new size.
    assert_eq!(fixture.screen.row_text(0).len(), 80);
}

#[test]
fn resize_with_unchanged_size_does_nothing() {
    let fixture = ManagerFixture::new();
    fixture.wm.update().unwrap();
    let log = EventLog::new();
    fixture.root().set_handler(recording_handler(&log));
    let flushes = fixture.screen.flushes();

    fixture.wm.resize().unwrap();

    assert!(log.events().is_empty());
    assert_eq!(fixture.screen.flushes(), flushes);
}

#[test]
fn repeated_sigwinch_coalesces_to_a_single_pipe_byte() {
    let fixture = ManagerFixture::new();
    let fd = fixture.wm.resize_fd().expect("self-pipe installed");

    unsafe {
        libc::raise(libc::SIGWINCH);
        libc::raise(libc::SIGWINCH);
        libc::raise(libc::SIGWINCH);
    }

    let mut buf = [0u8; 8];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    assert_eq!(n, 1, "any number of signals collapse into one byte");

    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    assert_eq!(n, -1, "pipe is empty after the coalesced byte");

    // The drain path clears the flag, re-arming the handler.
    fixture.wm.resize().unwrap();
    unsafe {
        libc::raise(libc::SIGWINCH);
    }
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    assert_eq!(n, 1, "a fresh signal after the drain writes again");
    fixture.wm.resize().unwrap();
}

/// The front-end pattern: a root handler that keeps a child tracking
/// the full terminal.
struct TrackRoot {
    window: Window,
}

impl WindowHandler for TrackRoot {
    fn on_event(&mut self, _root: &Window, event: WindowEvent) -> u32 {
        if let WindowEvent::PosChanged { new, .. } = event {
            self.window
                .set_pos(Rect::new(0, 0, new.width(), new.height()))
                .expect("child reshapes with root");
        }
        0
    }
}

#[test]
fn children_follow_the_root_through_a_handler() {
    let fixture = ManagerFixture::with_size(100, 40);
    let log = EventLog::new();
    let child = fixture
        .root()
        .create_child(Rect::new(0, 0, 100, 40), fill_handler(&log, 'c'), 1)
        .unwrap();
    fixture.root().set_handler(Box::new(TrackRoot {
        window: child.clone(),
    }));
    fixture.wm.update().unwrap();
    log.clear();

    fixture.screen.set_size(60, 20);
    fixture.wm.resize().unwrap();

    assert_eq!(child.screen_rect(), Rect::new(0, 0, 60, 20));
    assert_eq!(
        log.pos_changes(1),
        vec![(Rect::new(0, 0, 100, 40), Rect::new(0, 0, 60, 20))]
    );
    assert_eq!(log.paints(1), 1, "forced update repaints the child");
    assert_eq!(fixture.screen.char_at(30, 10), 'c');
}
