//! Inclusion descriptors: candidate insertion points for one edit.
//!
//! Descriptors live only for the duration of a single gesture commit.

use std::cmp::Ordering;

use formlay_core::{Alignment, Dimension, Edge, IntervalId, LayoutModel, LayoutRegion, PaddingType};

/// One candidate place for an interval in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeDesc {
    /// Group receiving the interval.
    pub parent: IntervalId,
    /// Insertion index among `parent`'s children.
    pub index: usize,
    /// Last index of a sequence range the interval goes parallel with.
    pub parallel_end: Option<usize>,
    /// `neighbor` must first be wrapped in a new sequence with the interval.
    pub new_sub_group: bool,
    pub neighbor: Option<IntervalId>,
    pub alignment: Alignment,
    pub snapped_parallel: Option<IntervalId>,
    pub snapped_next_to: Option<IntervalId>,
    pub padding: Option<PaddingType>,
    /// Both edges are pinned, the interval fills the span.
    pub fill: bool,
    /// The position comes from a snap or a fixed edge and must be kept.
    pub fixed_position: bool,
    /// Directional distance to the nearest neighbor.
    pub distance: i32,
    /// Distance to the neighbors on the orthogonal axis; 0 when overlapping.
    pub ort_distance: i32,
    pub depth: usize,
}

impl IncludeDesc {
    #[must_use]
    pub const fn new(parent: IntervalId, index: usize) -> Self {
        Self {
            parent,
            index,
            parallel_end: None,
            new_sub_group: false,
            neighbor: None,
            alignment: Alignment::Default,
            snapped_parallel: None,
            snapped_next_to: None,
            padding: None,
            fill: false,
            fixed_position: false,
            distance: 0,
            ort_distance: i32::MAX,
            depth: 0,
        }
    }

    #[must_use]
    pub fn is_snapped(&self) -> bool {
        self.snapped_parallel.is_some() || self.snapped_next_to.is_some()
    }

    #[must_use]
    pub const fn ort_overlap(&self) -> bool {
        self.ort_distance == 0
    }

    /// Ranking: snapped first, then orthogonal overlap (or the nearer
    /// orthogonal neighbor), then the smaller distance, then the deeper
    /// nesting.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .is_snapped()
            .cmp(&self.is_snapped())
            .then(self.ort_distance.max(0).cmp(&other.ort_distance.max(0)))
            .then(self.distance.cmp(&other.distance))
            .then(other.depth.cmp(&self.depth))
    }

    /// True if neither candidate ranks above the other.
    #[must_use]
    pub fn ranks_equal(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }

    /// Same parent and insertion slot.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.parent == other.parent
            && self.parallel_end == other.parallel_end
            && self.snapped_parallel == other.snapped_parallel
            && (self.new_sub_group == other.new_sub_group)
            && if self.new_sub_group {
                self.neighbor == other.neighbor
            } else {
                self.index == other.index
            }
    }
}

/// Where a component sat on one axis before the current edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalPosition {
    pub interval: IntervalId,
    pub dim: Dimension,
    pub root: IntervalId,
    pub parent: Option<IntervalId>,
    pub index: Option<usize>,
    pub alignment: Alignment,
    /// Nearest non-gap siblings in a sequential parent.
    pub neighbors: [Option<IntervalId>; 2],
    pub space: LayoutRegion,
}

impl OriginalPosition {
    #[must_use]
    pub fn capture(model: &LayoutModel, interval: IntervalId) -> Self {
        let dim = model.dimension(interval).unwrap_or(Dimension::Horizontal);
        Self {
            interval,
            dim,
            root: model.root_of(interval),
            parent: model.parent(interval),
            index: model.index_in_parent(interval),
            alignment: model.alignment(interval),
            neighbors: [
                model.neighbor(interval, Edge::Leading, true),
                model.neighbor(interval, Edge::Trailing, true),
            ],
            space: model.current_space(interval),
        }
    }

    /// Descriptor that would put the interval back where it was, judged
    /// against the tree after the interval was taken out.
    #[must_use]
    pub fn to_include_desc(&self, model: &LayoutModel) -> Option<IncludeDesc> {
        let parent = self.parent.filter(|parent| model.interval(*parent).is_some())?;
        if model.root_of(parent) != self.root {
            return None;
        }
        let index = if model.is_sequential(parent) {
            match self.neighbors {
                [Some(leading), _] if model.parent(leading) == Some(parent) => {
                    model.index_in_parent(leading).map_or(0, |index| index + 1)
                }
                [_, Some(trailing)] if model.parent(trailing) == Some(parent) => {
                    model.index_in_parent(trailing).unwrap_or(0)
                }
                _ => self.index.unwrap_or(0).min(model.child_count(parent)),
            }
        } else {
            model.child_count(parent)
        };
        let mut desc = IncludeDesc::new(parent, index);
        desc.alignment = self.alignment;
        desc.ort_distance = 0;
        desc.depth = model.depth(parent) + 1;
        Some(desc)
    }

    /// True if `desc` puts the interval back between the same neighbors.
    #[must_use]
    pub fn matches(&self, model: &LayoutModel, desc: &IncludeDesc) -> bool {
        if desc.is_snapped() || desc.parallel_end.is_some() || desc.new_sub_group {
            return false;
        }
        self.to_include_desc(model)
            .is_some_and(|original| original.parent == desc.parent && original.index == desc.index)
    }
}
