/// Axis-aligned rectangle in PDF space (origin bottom-left, y grows upward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle hanging down from a top-left corner.
    pub fn from_top(x: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(x, top - height, width, height)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Shrink by `m` on each side, never below zero size.
    pub fn inset(&self, m: &crate::model::Margins) -> Rect {
        Rect::new(
            self.x + m.left,
            self.y + m.bottom,
            (self.width - m.horizontal()).max(0.0),
            (self.height - m.vertical()).max(0.0),
        )
    }
}

/// Current draw position on a page, in absolute PDF coordinates, bounded by
/// the page's body rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    x: f32,
    y: f32,
    bounds: Rect,
}

impl Cursor {
    pub fn new(bounds: Rect) -> Self {
        Self {
            x: bounds.left(),
            y: bounds.top(),
            bounds,
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Move down by `height`; returns the y before the move.
    pub fn advance(&mut self, height: f32) -> f32 {
        let before = self.y;
        self.y -= height;
        before
    }

    /// Vertical space left above the bottom boundary.
    pub fn remaining(&self) -> f32 {
        self.y - self.bounds.bottom()
    }

    pub fn reset(&mut self, bounds: Rect) {
        *self = Cursor::new(bounds);
    }

    pub fn is_at_top(&self) -> bool {
        (self.y - self.bounds.top()).abs() < 0.01
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_returns_previous_y() {
        let mut c = Cursor::new(Rect::new(50.0, 50.0, 500.0, 700.0));
        assert_eq!(c.y(), 750.0);
        assert_eq!(c.advance(100.0), 750.0);
        assert_eq!(c.y(), 650.0);
        assert_eq!(c.remaining(), 600.0);
        assert!(!c.is_at_top());
    }

    #[test]
    fn reset_moves_to_top_left_of_new_bounds() {
        let mut c = Cursor::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        c.advance(40.0);
        c.reset(Rect::new(10.0, 20.0, 80.0, 60.0));
        assert_eq!((c.x(), c.y()), (10.0, 80.0));
        assert_eq!(c.remaining(), 60.0);
        assert!(c.is_at_top());
    }
}
