//! Terminal adapter: damage coalescing, framed cell composition,
//! cursor and bell handling.

use screen::backend::HeadlessBackend;
use screen::{Attrs, Drawable, Screen};
use terminal::emulator::{CursorPos, EmuCell, EmuColor, EmulatorEvent, TermProp};
use terminal::TermAdapter;
use test_harness::fixtures::MockEmulator;
use wm::geom::Rect;

fn setup() -> (Screen, screen::backend::HeadlessHandle, MockEmulator, TermAdapter, Drawable) {
    let (backend, handle) = HeadlessBackend::new(40, 20);
    let mut screen = Screen::new(Box::new(backend)).unwrap();
    let emulator = MockEmulator::new(10, 10);
    let adapter = TermAdapter::new(&mut screen, &emulator);
    // 12x12 drawable leaves a 10x10 interior behind the frame.
    let drawable = Drawable::new(0, 0, 12, 12);
    (screen, handle, emulator, adapter, drawable)
}

#[test]
fn damage_reports_coalesce_and_redraw_the_bounding_rect() {
    let (_screen, _handle, mut emulator, mut adapter, mut drawable) = setup();
    emulator.set_text(0, 0, "ab");
    // (8, 1) is in neither reported rect but inside their bounding box.
    emulator.set_text(8, 1, "q");

    adapter.damage(Rect::new(0, 0, 5, 5));
    adapter.damage(Rect::new(3, 3, 10, 10));
    adapter.draw(&emulator, &mut drawable).unwrap();

    assert_eq!(drawable.cell(1, 1).unwrap().ch, 'a');
    assert_eq!(drawable.cell(1, 2).unwrap().ch, 'b');
    assert_eq!(
        drawable.cell(9, 2).unwrap().ch,
        'q',
        "cells between the reported rects redraw too"
    );
    assert!(!adapter.has_damage(), "accumulator cleared after draw");
}

#[test]
fn edge_touching_damage_redraws_the_frame() {
    let (_screen, _handle, emulator, mut adapter, mut drawable) = setup();

    adapter.damage(Rect::new(0, 0, 3, 3));
    adapter.draw(&emulator, &mut drawable).unwrap();

    assert_eq!(drawable.cell(0, 0).unwrap().ch, '┌');
    assert_eq!(drawable.cell(0, 11).unwrap().ch, '┐');
    assert_eq!(drawable.cell(11, 0).unwrap().ch, '└');
    assert_eq!(drawable.cell(11, 11).unwrap().ch, '┘');
}

#[test]
fn interior_damage_leaves_the_frame_alone() {
    let (_screen, _handle, emulator, mut adapter, mut drawable) = setup();

    adapter.damage(Rect::new(2, 2, 4, 4));
    adapter.draw(&emulator, &mut drawable).unwrap();

    assert_eq!(drawable.cell(0, 0).unwrap().ch, ' ', "no border redraw");
}

#[test]
fn empty_cells_substitute_a_blank() {
    let (_screen, _handle, mut emulator, mut adapter, mut drawable) = setup();
    emulator.set_text(0, 0, "hi");

    adapter.damage(Rect::new(0, 0, 10, 10));
    adapter.draw(&emulator, &mut drawable).unwrap();

    assert_eq!(drawable.cell(1, 1).unwrap().ch, 'h');
    assert_eq!(drawable.cell(1, 2).unwrap().ch, 'i');
    assert_eq!(drawable.cell(1, 3).unwrap().ch, ' ', "NUL renders blank");
}

#[test]
fn cell_colors_map_through_the_pair_table() {
    let (_screen, _handle, mut emulator, mut adapter, mut drawable) = setup();
    emulator.set_cell(
        2,
        3,
        EmuCell {
            ch: 'c',
            attrs: Attrs {
                bold: true,
                underline: false,
                blink: false,
                reverse: false,
            },
            fg: EmuColor::Indexed(1),
            bg: EmuColor::Indexed(4),
        },
    );

    adapter.damage(Rect::new(0, 0, 10, 10));
    adapter.draw(&emulator, &mut drawable).unwrap();

    let cell = drawable.cell(3, 4).unwrap();
    assert_eq!(cell.ch, 'c');
    assert!(cell.attrs.bold);
    let expected = adapter.color_table().unwrap().pair(1, 4);
    assert_eq!(cell.pair, expected);
}

#[test]
fn cursor_position_survives_a_draw() {
    let (_screen, _handle, emulator, mut adapter, mut drawable) = setup();
    drawable.set_cursor(5, 5).unwrap();

    adapter.damage(Rect::new(0, 0, 10, 10));
    adapter.draw(&emulator, &mut drawable).unwrap();

    assert_eq!(drawable.cursor(), (5, 5));
}

#[test]
fn cursor_moves_land_past_the_frame() {
    let (_screen, _handle, _emulator, adapter, mut drawable) = setup();
    adapter.move_cursor(CursorPos { row: 2, col: 3 }, true, &mut drawable);
    assert_eq!(drawable.cursor(), (3, 4));
}

#[test]
fn out_of_range_cursor_moves_are_dropped() {
    let (_screen, _handle, _emulator, adapter, mut drawable) = setup();
    drawable.set_cursor(1, 1).unwrap();
    adapter.move_cursor(CursorPos { row: 20, col: 0 }, true, &mut drawable);
    assert_eq!(drawable.cursor(), (1, 1), "move ignored");
}

#[test]
fn bell_events_reach_the_terminal() {
    let (mut screen, handle, _emulator, mut adapter, mut drawable) = setup();
    adapter
        .handle_event(&EmulatorEvent::Bell, &mut drawable, &mut screen)
        .unwrap();
    assert_eq!(handle.beeps(), 1);
}

#[test]
fn cursor_visibility_property_toggles_the_terminal_cursor() {
    let (mut screen, handle, _emulator, mut adapter, mut drawable) = setup();

    adapter
        .handle_event(
            &EmulatorEvent::Prop(TermProp::CursorVisible(true)),
            &mut drawable,
            &mut screen,
        )
        .unwrap();
    assert!(handle.cursor_visible());

    adapter
        .handle_event(
            &EmulatorEvent::Prop(TermProp::CursorVisible(false)),
            &mut drawable,
            &mut screen,
        )
        .unwrap();
    assert!(!handle.cursor_visible());
}

#[test]
fn other_properties_are_acknowledged_without_effect() {
    let (mut screen, _handle, _emulator, mut adapter, mut drawable) = setup();
    adapter
        .handle_event(
            &EmulatorEvent::Prop(TermProp::Title("hello".into())),
            &mut drawable,
            &mut screen,
        )
        .unwrap();
}

#[test]
fn damage_events_feed_the_accumulator() {
    let (mut screen, _handle, _emulator, mut adapter, mut drawable) = setup();
    assert!(!adapter.has_damage());
    adapter
        .handle_event(
            &EmulatorEvent::Damage(Rect::new(1, 1, 2, 2)),
            &mut drawable,
            &mut screen,
        )
        .unwrap();
    assert!(adapter.has_damage());
}
