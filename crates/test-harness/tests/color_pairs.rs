//! Color table behavior against headless screens.

use proptest::prelude::*;

use screen::backend::HeadlessBackend;
use screen::{BackendCaps, PairId, Rgb, Screen};
use terminal::{ColorTable, TermAdapter};
use test_harness::fixtures::MockEmulator;

fn screen_with_colors(colors: u16, can_change: bool) -> Screen {
    let (backend, _) = HeadlessBackend::with_caps(
        40,
        12,
        BackendCaps {
            colors,
            pairs: colors as u32 * colors as u32,
            can_change_color: can_change,
        },
    );
    Screen::new(Box::new(backend)).unwrap()
}

#[test]
fn pair_queries_are_stable_and_order_sensitive() {
    let mut screen = screen_with_colors(16, false);
    let emulator = MockEmulator::new(4, 4);
    let table = ColorTable::bind(&mut screen, &emulator).unwrap();

    let first = table.pair(1, 2);
    let second = table.pair(1, 2);
    let swapped = table.pair(2, 1);

    assert_eq!(first, second, "repeated query returns the same id");
    assert_ne!(first, swapped, "foreground and background are distinct");
    assert_ne!(first, PairId::DEFAULT);
}

#[test]
fn binding_fails_without_color_support() {
    let mut screen = screen_with_colors(0, false);
    let emulator = MockEmulator::new(4, 4);
    assert!(ColorTable::bind(&mut screen, &emulator).is_err());
}

#[test]
fn adapter_survives_a_monochrome_terminal() {
    let mut screen = screen_with_colors(0, false);
    let emulator = MockEmulator::new(4, 4);
    let adapter = TermAdapter::new(&mut screen, &emulator);
    assert!(adapter.color_table().is_none(), "color tagging is skipped");
}

#[test]
fn exact_palette_hits_win_over_distance() {
    let mut screen = screen_with_colors(16, false);
    let emulator = MockEmulator::new(4, 4);
    let mut table = ColorTable::bind(&mut screen, &emulator).unwrap();

    for idx in 0..16u8 {
        let rgb = terminal::palette::color(idx);
        let found = table.nearest(rgb);
        assert_eq!(
            table.palette_color(found).unwrap(),
            rgb,
            "palette color {idx} must resolve to an exact match"
        );
    }
}

proptest! {
    /// Colors agreeing in the high 5 bits of every channel share a hash
    /// bucket and therefore an answer.
    #[test]
    fn nearest_is_constant_within_a_hash_bucket(
        r in 0u8..=255,
        g in 0u8..=255,
        b in 0u8..=255,
        dr in 0u8..8,
        dg in 0u8..8,
        db in 0u8..8,
    ) {
        let mut screen = screen_with_colors(16, false);
        let emulator = MockEmulator::new(2, 2);
        let mut table = ColorTable::bind(&mut screen, &emulator).unwrap();

        let base = Rgb::new(r & 0xF8, g & 0xF8, b & 0xF8);
        let nudged = Rgb::new(
            (r & 0xF8) | dr,
            (g & 0xF8) | dg,
            (b & 0xF8) | db,
        );
        prop_assert_eq!(table.nearest(base), table.nearest(nudged));
    }

    /// The nearest index is never beaten by another palette entry.
    #[test]
    fn nearest_minimizes_squared_distance(
        r in 0u8..=255,
        g in 0u8..=255,
        b in 0u8..=255,
    ) {
        let mut screen = screen_with_colors(16, false);
        let emulator = MockEmulator::new(2, 2);
        let mut table = ColorTable::bind(&mut screen, &emulator).unwrap();

        let probe = Rgb::new(r, g, b);
        let chosen = table.nearest(probe);
        let chosen_dist = table.palette_color(chosen).unwrap().distance_sq(probe);
        for idx in 0..16u8 {
            let dist = table.palette_color(idx).unwrap().distance_sq(probe);
            prop_assert!(chosen_dist <= dist, "index {} is closer than {}", idx, chosen);
        }
    }
}
