//! Property-based tests for rectangle arithmetic.

use proptest::prelude::*;
use wm::geom::Rect;

fn arb_rect() -> impl Strategy<Value = Rect> {
    (-50i32..100, -50i32..100, 0i32..80, 0i32..80)
        .prop_map(|(l, t, w, h)| Rect::new(l, t, l + w, t + h))
}

proptest! {
    #[test]
    fn intersection_is_commutative(a in arb_rect(), b in arb_rect()) {
        prop_assert_eq!(a.intersect(b), b.intersect(a));
    }

    #[test]
    fn intersection_is_contained_in_both(a in arb_rect(), b in arb_rect()) {
        let i = a.intersect(b);
        prop_assert!(a.contains(i), "{:?} not in {:?}", i, a);
        prop_assert!(b.contains(i), "{:?} not in {:?}", i, b);
    }

    #[test]
    fn intersection_with_self_is_identity(a in arb_rect()) {
        if !a.is_empty() {
            prop_assert_eq!(a.intersect(a), a);
        }
    }

    #[test]
    fn union_contains_both_operands(a in arb_rect(), b in arb_rect()) {
        let u = a.union(b);
        prop_assert!(u.contains(a) || a.is_empty());
        prop_assert!(u.contains(b) || b.is_empty());
    }

    #[test]
    fn union_is_commutative(a in arb_rect(), b in arb_rect()) {
        prop_assert_eq!(a.union(b), b.union(a));
    }

    #[test]
    fn offset_preserves_dimensions(a in arb_rect(), dx in -100i32..100, dy in -100i32..100) {
        let moved = a.offset(dx, dy);
        prop_assert_eq!(moved.width(), a.width());
        prop_assert_eq!(moved.height(), a.height());
    }

    #[test]
    fn offset_round_trips(a in arb_rect(), dx in -100i32..100, dy in -100i32..100) {
        prop_assert_eq!(a.offset(dx, dy).offset(-dx, -dy), a);
    }

    #[test]
    fn clipping_twice_equals_clipping_once(a in arb_rect(), clip in arb_rect()) {
        prop_assert_eq!(a.intersect(clip).intersect(clip), a.intersect(clip));
    }
}
