//! Default 256-entry terminal palette.
//!
//! The 16 ANSI colors, the 6x6x6 color cube, and the grayscale ramp.
//! Emulator bindings fall back to these values for palette slots the
//! application has not overridden.

use screen::Rgb;

pub const PALETTE_SIZE: usize = 256;

/// The 16 ANSI colors (normal + bright).
const ANSI: [Rgb; 16] = [
    Rgb::new(0x00, 0x00, 0x00), // black
    Rgb::new(0xCC, 0x00, 0x00), // red
    Rgb::new(0x00, 0xCC, 0x00), // green
    Rgb::new(0xCC, 0xCC, 0x00), // yellow
    Rgb::new(0x00, 0x00, 0xCC), // blue
    Rgb::new(0xCC, 0x00, 0xCC), // magenta
    Rgb::new(0x00, 0xCC, 0xCC), // cyan
    Rgb::new(0xCC, 0xCC, 0xCC), // white
    Rgb::new(0x66, 0x66, 0x66), // bright black
    Rgb::new(0xFF, 0x00, 0x00), // bright red
    Rgb::new(0x00, 0xFF, 0x00), // bright green
    Rgb::new(0xFF, 0xFF, 0x00), // bright yellow
    Rgb::new(0x00, 0x00, 0xFF), // bright blue
    Rgb::new(0xFF, 0x00, 0xFF), // bright magenta
    Rgb::new(0x00, 0xFF, 0xFF), // bright cyan
    Rgb::new(0xFF, 0xFF, 0xFF), // bright white
];

/// Default color for a palette index.
pub fn color(idx: u8) -> Rgb {
    if idx < 16 {
        ANSI[idx as usize]
    } else if idx < 232 {
        // 6x6x6 color cube
        let idx = idx - 16;
        let r = ((idx / 36) % 6) * 51;
        let g = ((idx / 6) % 6) * 51;
        let b = (idx % 6) * 51;
        Rgb::new(r, g, b)
    } else {
        // Grayscale ramp
        let gray = (idx - 232) * 10 + 8;
        Rgb::new(gray, gray, gray)
    }
}
