//! Damage accumulation.
//!
//! The emulator reports changed regions one rectangle at a time; all
//! reports between two draws coalesce into a single bounding rectangle.
//! The accumulator is empty exactly when both `right` and `bottom` are
//! zero, which the all-zero rectangle satisfies.

use wm::geom::Rect;

#[derive(Debug, Default)]
pub struct DamageAccumulator {
    rect: Rect,
}

impl DamageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rect.right == 0 && self.rect.bottom == 0
    }

    /// Fold another damaged region into the bounding rectangle.
    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.rect = if self.is_empty() {
            rect
        } else {
            self.rect.union(rect)
        };
    }

    /// Current bounding rectangle without clearing it.
    pub fn peek(&self) -> Rect {
        self.rect
    }

    /// Hand out the accumulated rectangle and reset to empty.
    pub fn take(&mut self) -> Rect {
        std::mem::take(&mut self.rect)
    }
}
