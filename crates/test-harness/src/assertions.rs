//! Structural assertions over the window tree.

use wm::geom::Rect;
use wm::{Window, WindowManager};

/// Check the tree invariants on a well-nested tree:
///
/// - every window's rectangle lies inside the intersection of its
///   ancestors' rectangles;
/// - a window with children is never dirty;
/// - only visible leaves are dirty;
/// - a dirty leaf implies the manager's dirty flag.
pub fn assert_tree_invariants(wm: &WindowManager) {
    let root = wm.root().expect("root window");
    let mut any_dirty_leaf = false;
    walk(&root, root.screen_rect(), &mut any_dirty_leaf);

    if any_dirty_leaf {
        assert!(
            wm.any_dirty(),
            "a leaf is dirty but the manager's dirty flag is clear"
        );
    }
}

fn walk(window: &Window, ancestor_clip: Rect, any_dirty_leaf: &mut bool) {
    let rect = window.screen_rect();
    assert!(
        ancestor_clip.contains(rect),
        "window {} rect {:?} escapes its ancestors' clip {:?}",
        window.id(),
        rect,
        ancestor_clip
    );

    let children = window.children();
    if children.is_empty() {
        if window.is_dirty() {
            assert!(
                window.is_visible(),
                "invisible leaf {} is marked dirty",
                window.id()
            );
            *any_dirty_leaf = true;
        }
    } else {
        assert!(
            !window.is_dirty(),
            "non-leaf window {} is marked dirty",
            window.id()
        );
        let clip = ancestor_clip.intersect(rect);
        for child in children {
            walk(&child, clip, any_dirty_leaf);
        }
    }
}

/// After `update()` the tree must be fully painted: no dirty leaf
/// anywhere and the manager flag clear.
pub fn assert_quiescent(wm: &WindowManager) {
    assert!(!wm.any_dirty(), "manager still flagged dirty after update");
    let root = wm.root().expect("root window");
    assert_no_dirty(&root);
}

fn assert_no_dirty(window: &Window) {
    assert!(
        !window.is_dirty(),
        "window {} still dirty after update",
        window.id()
    );
    for child in window.children() {
        assert_no_dirty(&child);
    }
}
