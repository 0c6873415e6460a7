//! Color table: palette capture, pair interning, nearest-color lookup.
//!
//! Maps emulator colors to screen color pairs. On bind, the emulator's
//! default palette is captured; slots 16 and up are pushed into the
//! terminal's mutable palette where supported and read back, so later
//! nearest-match queries are measured against colors the terminal can
//! actually draw. All N x N (fg, bg) pairs are interned eagerly, making
//! the per-cell lookup a table read.

use screen::{PairId, Rgb, Screen, ScreenError};

use crate::emulator::{EmuColor, Emulator};
use crate::palette;

/// Side length of the (fg, bg) lookup table.
const PAIR_TABLE_DIM: usize = 256;

/// 5 bits per channel.
const RGB_HASH_SIZE: usize = 1 << 15;

pub struct ColorTable {
    /// Captured palette size: min(colors, floor(sqrt(pairs)), 256).
    n: u16,

    /// Canonical palette, after the terminal round trip.
    colors: Vec<Rgb>,

    /// (fg, bg) -> interned pair id, O(1).
    pairs: Vec<PairId>,

    /// RGB -> nearest palette index, keyed `rrrrrgggggbbbbb`; -1 empty.
    nearest: Vec<i16>,
}

impl ColorTable {
    /// Capture the emulator palette and intern every pair.
    ///
    /// Fails with [`ScreenError::NoColors`] on monochrome terminals;
    /// the adapter then skips color tagging entirely.
    pub fn bind(screen: &mut Screen, emulator: &dyn Emulator) -> Result<Self, ScreenError> {
        let colors = screen.colors();
        if colors == 0 {
            return Err(ScreenError::NoColors);
        }

        let n = (colors as u32)
            .min((screen.pair_capacity() as f64).sqrt() as u32)
            .min(PAIR_TABLE_DIM as u32) as u16;

        let mut captured = Vec::with_capacity(n as usize);
        for i in 0..n {
            let mut rgb = emulator.palette_color(i as u8);
            if i >= 16 && screen.can_change_color() {
                // Round-trip through the terminal so the canonical value
                // is what the terminal will actually render.
                screen.set_color(i, rgb)?;
                if let Some(read_back) = screen.color_content(i)? {
                    rgb = read_back;
                }
            }
            captured.push(rgb);
        }

        let mut pairs = vec![PairId::DEFAULT; PAIR_TABLE_DIM * PAIR_TABLE_DIM];
        for fg in 0..n {
            for bg in 0..n {
                let pair = PairId(fg as u32 * n as u32 + bg as u32 + 1);
                screen.init_pair(pair, fg as i16, bg as i16)?;
                pairs[fg as usize * PAIR_TABLE_DIM + bg as usize] = pair;
            }
        }

        tracing::debug!(n, "color table bound");
        Ok(Self {
            n,
            colors: captured,
            pairs,
            nearest: vec![-1; RGB_HASH_SIZE],
        })
    }

    /// Captured palette size.
    pub fn len(&self) -> u16 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Canonical color of a captured palette index.
    pub fn palette_color(&self, idx: u8) -> Option<Rgb> {
        self.colors.get(idx as usize).copied()
    }

    /// Interned pair for captured (fg, bg) indices. Out-of-range
    /// indices fall back to the default pair.
    pub fn pair(&self, fg: u8, bg: u8) -> PairId {
        if (fg as u16) < self.n && (bg as u16) < self.n {
            self.pairs[fg as usize * PAIR_TABLE_DIM + bg as usize]
        } else {
            PairId::DEFAULT
        }
    }

    /// Nearest captured palette index for an arbitrary color.
    ///
    /// Cached on the high 5 bits of each channel; an exact palette hit
    /// short-circuits the scan, otherwise the minimum squared-distance
    /// index wins.
    pub fn nearest(&mut self, rgb: Rgb) -> u8 {
        let key = ((rgb.r as usize >> 3) << 10) | ((rgb.g as usize >> 3) << 5) | (rgb.b as usize >> 3);
        if self.nearest[key] >= 0 {
            return self.nearest[key] as u8;
        }

        let mut best = 0u8;
        let mut best_dist = u32::MAX;
        for (i, &candidate) in self.colors.iter().enumerate() {
            if candidate == rgb {
                best = i as u8;
                best_dist = 0;
                break;
            }
            let dist = candidate.distance_sq(rgb);
            if dist < best_dist {
                best = i as u8;
                best_dist = dist;
            }
        }

        self.nearest[key] = best as i16;
        best
    }

    /// Resolve an emulator color to a captured palette index.
    pub fn index_of(&mut self, color: EmuColor) -> u8 {
        match color {
            EmuColor::Indexed(i) if (i as u16) < self.n => i,
            EmuColor::Indexed(i) => self.nearest(palette::color(i)),
            EmuColor::Rgb(rgb) => self.nearest(rgb),
        }
    }
}
