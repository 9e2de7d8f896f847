//! Cached positional state of an interval.
//!
//! A [`LayoutRegion`] keeps the leading, trailing and center positions of an
//! interval on both axes, plus an optional baseline on the vertical axis. It
//! is a cache recomputed after edits, never the source of truth.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::types::{Alignment, Dimension, Edge};

const LEADING: usize = 0;
const TRAILING: usize = 1;
const CENTER: usize = 2;
const BASELINE: usize = 3;

/// Leading/trailing/center/baseline positions on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutRegion {
    positions: [[i32; 4]; 2],
}

impl Default for LayoutRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutRegion {
    /// Marker for a position that was never computed.
    pub const UNKNOWN: i32 = i32::MIN;

    /// A region with every position unknown.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positions: [[Self::UNKNOWN; 4]; 2],
        }
    }

    /// Region covering a rectangle, with an optional absolute baseline.
    #[must_use]
    pub fn from_rect(rect: Rect, baseline: Option<i32>) -> Self {
        let mut region = Self::new();
        region.set_rect(rect, baseline);
        region
    }

    pub fn set_rect(&mut self, rect: Rect, baseline: Option<i32>) {
        for dim in Dimension::ALL {
            self.set(dim, rect.start(dim), rect.end(dim));
        }
        self.positions[Dimension::Vertical.index()][BASELINE] = baseline.unwrap_or(Self::UNKNOWN);
    }

    /// Set both edges of one axis; the center follows.
    pub fn set(&mut self, dim: Dimension, leading: i32, trailing: i32) {
        let pos = &mut self.positions[dim.index()];
        pos[LEADING] = leading;
        pos[TRAILING] = trailing;
        pos[CENTER] = if leading == Self::UNKNOWN || trailing == Self::UNKNOWN {
            Self::UNKNOWN
        } else {
            leading + (trailing - leading) / 2
        };
    }

    /// Copy one axis from another region, baseline included.
    pub fn set_dimension(&mut self, dim: Dimension, other: &LayoutRegion) {
        self.positions[dim.index()] = other.positions[dim.index()];
    }

    pub fn set_baseline(&mut self, baseline: Option<i32>) {
        self.positions[Dimension::Vertical.index()][BASELINE] = baseline.unwrap_or(Self::UNKNOWN);
    }

    /// Position of one alignment point; `Default` reads the leading edge.
    #[must_use]
    pub const fn position(&self, dim: Dimension, alignment: Alignment) -> i32 {
        self.positions[dim.index()][alignment.region_slot()]
    }

    #[must_use]
    pub const fn edge(&self, dim: Dimension, edge: Edge) -> i32 {
        self.positions[dim.index()][edge.index()]
    }

    #[must_use]
    pub const fn leading(&self, dim: Dimension) -> i32 {
        self.positions[dim.index()][LEADING]
    }

    #[must_use]
    pub const fn trailing(&self, dim: Dimension) -> i32 {
        self.positions[dim.index()][TRAILING]
    }

    #[must_use]
    pub const fn baseline(&self) -> Option<i32> {
        let pos = self.positions[Dimension::Vertical.index()][BASELINE];
        if pos == Self::UNKNOWN { None } else { Some(pos) }
    }

    /// Extent along an axis, or [`Self::UNKNOWN`] when unset.
    #[must_use]
    pub const fn size(&self, dim: Dimension) -> i32 {
        let pos = self.positions[dim.index()];
        if pos[LEADING] == Self::UNKNOWN || pos[TRAILING] == Self::UNKNOWN {
            Self::UNKNOWN
        } else {
            pos[TRAILING] - pos[LEADING]
        }
    }

    #[must_use]
    pub const fn is_set(&self, dim: Dimension) -> bool {
        let pos = self.positions[dim.index()];
        pos[LEADING] != Self::UNKNOWN && pos[TRAILING] != Self::UNKNOWN
    }

    #[must_use]
    pub const fn is_set_all(&self) -> bool {
        self.is_set(Dimension::Horizontal) && self.is_set(Dimension::Vertical)
    }

    /// Grow to include `other` on one axis (or both when `dim` is `None`).
    pub fn expand(&mut self, other: &LayoutRegion, dim: Option<Dimension>) {
        for d in Dimension::ALL {
            if dim.is_some_and(|only| only != d) || !other.is_set(d) {
                continue;
            }
            if !self.is_set(d) {
                self.set_dimension(d, other);
                continue;
            }
            let leading = self.leading(d).min(other.leading(d));
            let trailing = self.trailing(d).max(other.trailing(d));
            self.set(d, leading, trailing);
        }
    }

    /// Move a single edge by `offset`, keeping the other in place.
    pub fn reshape(&mut self, dim: Dimension, edge: Edge, offset: i32) {
        if !self.is_set(dim) {
            return;
        }
        let (leading, trailing) = match edge {
            Edge::Leading => (self.leading(dim) + offset, self.trailing(dim)),
            Edge::Trailing => (self.leading(dim), self.trailing(dim) + offset),
        };
        self.set(dim, leading, trailing);
    }

    /// Shift a whole axis by `offset`.
    pub fn translate(&mut self, dim: Dimension, offset: i32) {
        for slot in &mut self.positions[dim.index()] {
            if *slot != Self::UNKNOWN {
                *slot += offset;
            }
        }
    }

    /// Rectangle view of a fully set region.
    #[must_use]
    pub fn to_rect(&self) -> Option<Rect> {
        self.is_set_all().then(|| {
            Rect::from_edges(
                self.leading(Dimension::Horizontal),
                self.leading(Dimension::Vertical),
                self.trailing(Dimension::Horizontal),
                self.trailing(Dimension::Vertical),
            )
        })
    }

    /// Signed distance `r2[e2] - r1[e1]`, or [`Self::UNKNOWN`] if either is unset.
    #[must_use]
    pub fn distance(
        r1: &LayoutRegion,
        r2: &LayoutRegion,
        dim: Dimension,
        e1: Alignment,
        e2: Alignment,
    ) -> i32 {
        let p1 = r1.position(dim, e1);
        let p2 = r2.position(dim, e2);
        if p1 == Self::UNKNOWN || p2 == Self::UNKNOWN {
            Self::UNKNOWN
        } else {
            p2 - p1
        }
    }

    /// Non-negative gap between two regions on an axis; 0 when they overlap.
    #[must_use]
    pub fn min_distance(r1: &LayoutRegion, r2: &LayoutRegion, dim: Dimension) -> i32 {
        if !r1.is_set(dim) || !r2.is_set(dim) {
            return Self::UNKNOWN;
        }
        if r1.trailing(dim) <= r2.leading(dim) {
            r2.leading(dim) - r1.trailing(dim)
        } else if r2.trailing(dim) <= r1.leading(dim) {
            r1.leading(dim) - r2.trailing(dim)
        } else {
            0
        }
    }

    /// True if the regions overlap on `dim`; a positive `margin` enlarges
    /// the detection area, a negative one requires a deeper overlap.
    #[must_use]
    pub fn overlap(r1: &LayoutRegion, r2: &LayoutRegion, dim: Dimension, margin: i32) -> bool {
        if !r1.is_set(dim) || !r2.is_set(dim) {
            return false;
        }
        r1.trailing(dim) + margin > r2.leading(dim) && r1.leading(dim) - margin < r2.trailing(dim)
    }

    /// True if `point` lies within the region on `dim` (edges inclusive).
    #[must_use]
    pub fn point_inside(&self, point: Point, dim: Dimension) -> bool {
        self.is_set(dim)
            && point.along(dim) >= self.leading(dim)
            && point.along(dim) <= self.trailing(dim)
    }

    /// True if `inner` fits inside this region on `dim`.
    #[must_use]
    pub fn contains(&self, inner: &LayoutRegion, dim: Dimension) -> bool {
        self.is_set(dim)
            && inner.is_set(dim)
            && inner.leading(dim) >= self.leading(dim)
            && inner.trailing(dim) <= self.trailing(dim)
    }
}
