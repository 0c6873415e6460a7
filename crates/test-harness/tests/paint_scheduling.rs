//! Paint scheduler behavior: coalescing, ordering, quiescence, and the
//! single-flush frame commit.

use test_harness::assertions::{assert_quiescent, assert_tree_invariants};
use test_harness::fixtures::{fill_handler, recording_handler, EventLog, ManagerFixture, Recorded};
use wm::geom::Rect;

#[test]
fn invalidations_coalesce_into_one_paint_per_leaf() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let a = fixture
        .root()
        .create_child(Rect::new(0, 0, 10, 10), fill_handler(&log, 'a'), 1)
        .unwrap();
    let b = fixture
        .root()
        .create_child(Rect::new(10, 0, 20, 10), fill_handler(&log, 'b'), 2)
        .unwrap();
    fixture.wm.update().unwrap();
    log.clear();
    let flushes_before = fixture.screen.flushes();

    a.invalidate();
    b.invalidate();
    a.invalidate();
    fixture.wm.update().unwrap();

    assert_eq!(log.paints(1), 1, "A painted exactly once");
    assert_eq!(log.paints(2), 1, "B painted exactly once");
    assert_eq!(
        fixture.screen.flushes(),
        flushes_before + 1,
        "one frame commit for the whole cycle"
    );
    assert_quiescent(&fixture.wm);
}

#[test]
fn update_without_dirt_does_not_touch_the_terminal() {
    let fixture = ManagerFixture::settled();
    let flushes = fixture.screen.flushes();
    fixture.wm.update().unwrap();
    assert_eq!(fixture.screen.flushes(), flushes);
}

#[test]
fn paint_order_follows_child_insertion_order() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let _a = fixture
        .root()
        .create_child(Rect::new(0, 0, 10, 10), recording_handler(&log), 1)
        .unwrap();
    let _b = fixture
        .root()
        .create_child(Rect::new(10, 0, 20, 10), recording_handler(&log), 2)
        .unwrap();

    log.clear();
    fixture.root().invalidate_rect(Rect::new(0, 0, 80, 24));
    fixture.wm.update().unwrap();

    let paints: Vec<u32> = log
        .events()
        .into_iter()
        .filter_map(|(id, e)| (e == Recorded::Paint).then_some(id))
        .collect();
    assert_eq!(paints, vec![1, 2]);
}

#[test]
fn set_pos_with_unchanged_rect_is_a_no_op() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let window = fixture
        .root()
        .create_child(Rect::new(3, 3, 13, 13), recording_handler(&log), 1)
        .unwrap();
    fixture.wm.update().unwrap();
    log.clear();

    window.set_pos(window.rect()).unwrap();

    assert!(log.events().is_empty(), "no message for identical geometry");
    assert!(!fixture.wm.any_dirty(), "no repaint armed");
}

#[test]
fn set_pos_reports_old_and_new_parent_relative_rects() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let window = fixture
        .root()
        .create_child(Rect::new(0, 0, 10, 10), fill_handler(&log, 'w'), 1)
        .unwrap();
    fixture.wm.update().unwrap();
    log.clear();

    window.set_pos(Rect::new(5, 5, 15, 15)).unwrap();

    assert_eq!(
        log.pos_changes(1),
        vec![(Rect::new(0, 0, 10, 10), Rect::new(5, 5, 15, 15))]
    );
    assert!(fixture.wm.any_dirty(), "move invalidates old and new area");
    fixture.wm.update().unwrap();
    assert_eq!(log.paints(1), 1);
    assert_tree_invariants(&fixture.wm);
}

#[test]
fn hiding_the_only_leaf_leaves_its_container_unpainted() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let container = fixture
        .root()
        .create_child(Rect::new(0, 0, 20, 20), recording_handler(&log), 1)
        .unwrap();
    let leaf = container
        .create_child(Rect::new(0, 0, 20, 20), fill_handler(&log, 'x'), 2)
        .unwrap();
    fixture.wm.update().unwrap();
    log.clear();
    let flushes = fixture.screen.flushes();

    leaf.set_visible(false).unwrap();
    // The parent's rect was reinvalidated, but the only leaf under it
    // is now invisible: nothing becomes dirty.
    assert!(!fixture.wm.any_dirty());

    fixture.wm.update().unwrap();
    assert_eq!(log.paints(1), 0, "containers never receive paint");
    assert_eq!(log.paints(2), 0, "hidden leaves never receive paint");
    assert_eq!(fixture.screen.flushes(), flushes);
}

#[test]
fn visibility_toggles_are_idempotent() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let window = fixture
        .root()
        .create_child(Rect::new(0, 0, 10, 10), fill_handler(&log, 'v'), 1)
        .unwrap();
    fixture.wm.update().unwrap();

    window.set_visible(false).unwrap();
    window.set_visible(false).unwrap();
    fixture.wm.update().unwrap();
    log.clear();

    window.set_visible(true).unwrap();
    window.set_visible(true).unwrap();
    fixture.wm.update().unwrap();

    assert_eq!(log.paints(1), 1, "double show collapses into one paint");
    assert_quiescent(&fixture.wm);
}

#[test]
fn hiding_a_sibling_repaints_the_leaf_underneath() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let _under = fixture
        .root()
        .create_child(Rect::new(0, 0, 80, 24), fill_handler(&log, 'u'), 1)
        .unwrap();
    let over = fixture
        .root()
        .create_child(Rect::new(10, 5, 40, 15), fill_handler(&log, 'o'), 2)
        .unwrap();
    fixture.wm.update().unwrap();
    log.clear();

    over.set_visible(false).unwrap();
    fixture.wm.update().unwrap();

    assert_eq!(log.paints(1), 1, "revealed leaf repaints");
    assert_eq!(log.paints(2), 0);
    // The underlying window's content now covers the revealed area.
    assert_eq!(fixture.screen.char_at(15, 8), 'u');
}

#[test]
fn painted_cells_land_on_the_physical_screen_after_update() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let _window = fixture
        .root()
        .create_child(Rect::new(2, 1, 12, 4), fill_handler(&log, '#'), 1)
        .unwrap();

    // Nothing physical before the cycle runs.
    assert_eq!(fixture.screen.char_at(2, 1), ' ');
    fixture.wm.update().unwrap();

    assert_eq!(fixture.screen.char_at(2, 1), '#');
    assert_eq!(fixture.screen.char_at(11, 3), '#');
    assert_eq!(fixture.screen.char_at(12, 1), ' ', "outside stays blank");
}

#[test]
fn invalidate_on_a_window_under_an_invisible_ancestor_is_a_no_op() {
    let fixture = ManagerFixture::settled();
    let log = EventLog::new();
    let container = fixture
        .root()
        .create_child(Rect::new(0, 0, 20, 20), recording_handler(&log), 1)
        .unwrap();
    let leaf = container
        .create_child(Rect::new(0, 0, 10, 10), fill_handler(&log, 'x'), 2)
        .unwrap();
    fixture.wm.update().unwrap();

    container.set_visible(false).unwrap();
    fixture.wm.update().unwrap();
    log.clear();

    leaf.invalidate();
    assert!(!fixture.wm.any_dirty(), "clipped out by invisible ancestor");
    fixture.wm.update().unwrap();
    assert_eq!(log.paints(2), 0);
}
