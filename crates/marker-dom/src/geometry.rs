//! Geometry
//!
//! `DOMRect` in CSS pixels. Layout stores boxes in document coordinates;
//! `Document` translates them into viewport coordinates on query.

/// Axis-aligned box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Box spanning the given edges
    pub fn from_ltrb(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { x: left, y: top, width: right - left, height: bottom - top }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// No area
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Overlap of two boxes; boxes that only touch give an empty rect,
    /// disjoint boxes give `None`
    pub fn intersection(&self, other: &DOMRect) -> Option<DOMRect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (left <= right && top <= bottom).then(|| DOMRect::from_ltrb(left, top, right, bottom))
    }

    /// Smallest box covering both
    pub fn union(&self, other: &DOMRect) -> DOMRect {
        DOMRect::from_ltrb(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> DOMRect {
        DOMRect { x: self.x + dx, y: self.y + dy, ..*self }
    }
}
