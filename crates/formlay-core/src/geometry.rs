//! Geometric primitives in design-surface pixels.

use serde::{Deserialize, Serialize};

use crate::types::Dimension;

/// A point on the design surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coordinate along one axis.
    #[inline]
    pub const fn along(&self, dim: Dimension) -> i32 {
        match dim {
            Dimension::Horizontal => self.x,
            Dimension::Vertical => self.y,
        }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn along(&self, dim: Dimension) -> i32 {
        match dim {
            Dimension::Horizontal => self.width,
            Dimension::Vertical => self.height,
        }
    }
}

/// A rectangle with an exclusive right/bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: i32,
    /// Top edge (inclusive).
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from origin with given size.
    #[inline]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Build a rectangle from its leading/trailing positions on both axes.
    #[inline]
    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Leading position along an axis.
    #[inline]
    pub const fn start(&self, dim: Dimension) -> i32 {
        match dim {
            Dimension::Horizontal => self.x,
            Dimension::Vertical => self.y,
        }
    }

    /// Trailing position along an axis.
    #[inline]
    pub const fn end(&self, dim: Dimension) -> i32 {
        match dim {
            Dimension::Horizontal => self.right(),
            Dimension::Vertical => self.bottom(),
        }
    }

    /// Extent along an axis.
    #[inline]
    pub const fn extent(&self, dim: Dimension) -> i32 {
        match dim {
            Dimension::Horizontal => self.width,
            Dimension::Vertical => self.height,
        }
    }

    /// Copy with one axis replaced by `[start, end)`.
    #[must_use]
    pub const fn with_span(&self, dim: Dimension, start: i32, end: i32) -> Self {
        match dim {
            Dimension::Horizontal => Self::new(start, self.y, end - start, self.height),
            Dimension::Vertical => Self::new(self.x, start, self.width, end - start),
        }
    }

    /// Copy shifted by the given offsets.
    #[must_use]
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::from_edges(x, y, right, bottom)
    }

    /// Intersection, or `None` when the rectangles don't overlap.
    #[must_use]
    pub fn intersection_opt(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (x < right && y < bottom).then(|| Rect::from_edges(x, y, right, bottom))
    }
}
