//! Structural editing primitives shared by the feeder and the designer.
//!
//! Every mutation goes through [`LayoutModel`] so it lands in the change
//! journal. A model call that fails here means the tree no longer matches
//! what the algorithm expected; it is raised as a [`ConsistencyViolation`].
//!
//! # Gap conventions
//!
//! - fixed gap: `USE_PREFERRED_SIZE / n / USE_PREFERRED_SIZE`
//! - resizing gap: `NOT_EXPLICITLY_DEFINED / n / MAX_SIZE`
//! - default padding: preferred size `NOT_EXPLICITLY_DEFINED`, resolved
//!   through the mapper

use formlay_core::{
    Alignment, ComponentId, Dimension, Edge, GroupKind, IntervalAttributes, IntervalId,
    IntervalSizes, LayoutModel, LayoutRegion, MAX_SIZE, ModelError, NOT_EXPLICITLY_DEFINED,
    PaddingType, USE_PREFERRED_SIZE,
};

use crate::error::ConsistencyViolation;
use crate::mapper::VisualMapper;

/// Intervals cut off a sequence by [`LayoutOperations::extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remainder {
    /// Effective alignment of the first interval before it was cut off.
    pub alignment: Alignment,
    pub intervals: Vec<IntervalId>,
}

/// Editing library bound to one model and one mapper for a gesture.
pub struct LayoutOperations<'a> {
    model: &'a mut LayoutModel,
    mapper: &'a dyn VisualMapper,
}

impl<'a> LayoutOperations<'a> {
    pub fn new(model: &'a mut LayoutModel, mapper: &'a dyn VisualMapper) -> Self {
        Self { model, mapper }
    }

    #[must_use]
    pub fn model(&self) -> &LayoutModel {
        self.model
    }

    pub fn model_mut(&mut self) -> &mut LayoutModel {
        self.model
    }

    #[must_use]
    pub fn mapper(&self) -> &dyn VisualMapper {
        self.mapper
    }

    // -------------------------------------------------------------------
    // Checked primitives
    // -------------------------------------------------------------------

    /// Unwrap a model result or abort with a dump of every layer.
    pub(crate) fn check<T>(&self, result: Result<T, ModelError>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => ConsistencyViolation::new(err.to_string(), self.dump_all()).raise(),
        }
    }

    /// Abort unless `interval` hangs under `root`.
    pub(crate) fn check_root(&self, interval: IntervalId, root: IntervalId) {
        let actual = self.model.root_of(interval);
        if actual != root {
            ConsistencyViolation::new(
                format!("interval {interval} ended up under root {actual}, expected {root}"),
                format!("{}{}", self.model.dump(root), self.model.dump(actual)),
            )
            .raise();
        }
    }

    pub(crate) fn dump_all(&self) -> String {
        let mut out = String::new();
        for component in self.model.components() {
            for roots in component.layers() {
                for root in roots {
                    out.push_str(&self.model.dump(*root));
                }
            }
        }
        out
    }

    pub(crate) fn add(&mut self, id: IntervalId, parent: IntervalId, index: Option<usize>) -> usize {
        let result = self.model.add_interval(id, parent, index);
        self.check(result)
    }

    pub(crate) fn remove(&mut self, id: IntervalId) -> usize {
        let result = self.model.remove_interval(id);
        self.check(result)
    }

    pub(crate) fn set_sizes(&mut self, id: IntervalId, sizes: IntervalSizes) -> bool {
        let result = self.model.set_interval_sizes(id, sizes);
        self.check(result)
    }

    pub(crate) fn set_alignment(&mut self, id: IntervalId, alignment: Alignment) -> bool {
        let result = self.model.set_interval_alignment(id, alignment);
        self.check(result)
    }

    pub(crate) fn set_group_alignment(&mut self, id: IntervalId, alignment: Alignment) -> bool {
        let result = self.model.set_group_alignment(id, alignment);
        self.check(result)
    }

    pub(crate) fn set_padding(&mut self, id: IntervalId, padding: Option<PaddingType>) -> bool {
        let result = self.model.set_padding_type(id, padding);
        self.check(result)
    }

    pub(crate) fn set_attribute(&mut self, id: IntervalId, flag: IntervalAttributes, on: bool) {
        let result = self.model.set_attribute(id, flag, on);
        self.check(result);
    }

    pub(crate) fn new_gap(&mut self, dim: Dimension, sizes: IntervalSizes) -> IntervalId {
        let result = self.model.create_gap(dim, sizes);
        self.check(result)
    }

    pub(crate) fn new_group(&mut self, dim: Dimension, kind: GroupKind) -> IntervalId {
        let result = self.model.create_group(dim, kind);
        self.check(result)
    }

    pub(crate) fn space(&self, id: IntervalId) -> LayoutRegion {
        self.model.current_space(id)
    }

    pub(crate) fn set_span(&mut self, id: IntervalId, dim: Dimension, leading: i32, trailing: i32) {
        self.model.set_current_span(id, dim, leading, trailing);
    }

    /// Give a new group the union of its children's spaces.
    pub(crate) fn update_group_space(&mut self, group: IntervalId) {
        let mut region = LayoutRegion::new();
        for child in self.model.children(group) {
            region.expand(&self.model.current_space(*child), None);
        }
        self.model.set_current_space(group, region);
    }

    fn dimension_of(&self, id: IntervalId) -> Dimension {
        match self.model.dimension(id) {
            Some(dim) => dim,
            None => ConsistencyViolation::new(
                format!("interval {id} is not in the model"),
                self.dump_all(),
            )
            .raise(),
        }
    }

    /// Size of an interval as laid out, falling back to its definition.
    #[must_use]
    pub fn current_size(&self, id: IntervalId, dim: Dimension) -> i32 {
        let space = self.space(id);
        if space.is_set(dim) {
            return space.size(dim);
        }
        let pref = self.model.preferred_size(id);
        if pref >= 0 {
            pref
        } else if self.model.is_gap(id) {
            self.default_gap_size(id, dim)
        } else {
            0
        }
    }

    /// Padding a default-sized gap resolves to, asked from the mapper.
    #[must_use]
    pub fn default_gap_size(&self, gap: IntervalId, dim: Dimension) -> i32 {
        let padding = self.model.padding(gap).unwrap_or(PaddingType::Related);
        let leading = self
            .model
            .neighbor(gap, Edge::Leading, true)
            .and_then(|id| self.edge_component(id, Edge::Trailing));
        let trailing = self
            .model
            .neighbor(gap, Edge::Trailing, true)
            .and_then(|id| self.edge_component(id, Edge::Leading));
        match (leading, trailing) {
            (Some(l), Some(t)) => self.mapper.preferred_padding(&l, &t, dim, padding),
            (Some(l), None) => self.mapper.preferred_border_padding(&l, dim, Edge::Trailing),
            (None, Some(t)) => self.mapper.preferred_border_padding(&t, dim, Edge::Leading),
            (None, None) => 0,
        }
    }

    /// Some component at the given edge of an interval's content.
    fn edge_component(&self, id: IntervalId, edge: Edge) -> Option<ComponentId> {
        if let Some(component) = self.model.component_of(id) {
            return Some(component.clone());
        }
        let children = self.model.children(id);
        if self.model.is_sequential(id) {
            let child = match edge {
                Edge::Leading => children.iter().find(|c| !self.model.is_gap(**c)),
                Edge::Trailing => children.iter().rev().find(|c| !self.model.is_gap(**c)),
            };
            child.and_then(|c| self.edge_component(*c, edge))
        } else {
            children.iter().find_map(|c| self.edge_component(*c, edge))
        }
    }

    // -------------------------------------------------------------------
    // Alignment queries
    // -------------------------------------------------------------------

    /// Edge an interval effectively sticks to when its container resizes.
    #[must_use]
    pub fn effective_alignment(&self, id: IntervalId) -> Alignment {
        effective_alignment(self.model, id)
    }

    // -------------------------------------------------------------------
    // Content moves
    // -------------------------------------------------------------------

    /// Add an interval into a group, flattening compatible groups.
    ///
    /// A sequence added to a sequence contributes its children; so does a
    /// parallel group added to a parallel group, with alignments kept.
    /// Returns the index where the content started.
    pub fn add_content(
        &mut self,
        interval: IntervalId,
        group: IntervalId,
        index: Option<usize>,
    ) -> usize {
        let dim = self.dimension_of(group);
        let start = index.unwrap_or_else(|| self.model.child_count(group));
        if self.model.is_sequential(interval) && self.model.is_sequential(group) {
            let mut at = start;
            while let Some(child) = self.model.children(interval).first().copied() {
                self.remove(child);
                self.add(child, group, Some(at));
                at += 1;
            }
            if at > start {
                self.merge_consecutive_gaps(group, at, dim);
                self.merge_consecutive_gaps(group, start, dim);
            }
            start
        } else if self.model.is_parallel(interval) && self.model.is_parallel(group) {
            let target_alignment = self.model.group_alignment(group);
            let mut at = start;
            while let Some(child) = self.model.children(interval).first().copied() {
                let alignment = self.model.alignment(child);
                self.remove(child);
                self.add(child, group, Some(at));
                let raw = if alignment == target_alignment {
                    Alignment::Default
                } else {
                    alignment
                };
                self.set_alignment(child, raw);
                at += 1;
            }
            start
        } else {
            self.add(interval, group, Some(start))
        }
    }

    // -------------------------------------------------------------------
    // Gaps
    // -------------------------------------------------------------------

    /// Merge `eaten` into `main`; `merged_size` is the combined current
    /// size, or negative when unknown.
    pub fn eat_gap(&mut self, main: IntervalId, eaten: IntervalId, merged_size: i32) {
        let a = self.model.sizes(main);
        let b = self.model.sizes(eaten);
        let resolved_min = |sizes: IntervalSizes| {
            if sizes.min == USE_PREFERRED_SIZE {
                sizes.pref
            } else {
                sizes.min
            }
        };
        let (min1, min2) = (resolved_min(a), resolved_min(b));
        let mut min = if min1 == 0 {
            min2
        } else if min2 == 0 {
            min1
        } else if min1 == NOT_EXPLICITLY_DEFINED || min2 == NOT_EXPLICITLY_DEFINED {
            NOT_EXPLICITLY_DEFINED
        } else {
            min1 + min2
        };

        let pref = if a.pref == 0 {
            b.pref
        } else if b.pref == 0 {
            a.pref
        } else if merged_size >= 0 {
            merged_size
        } else if a.pref == NOT_EXPLICITLY_DEFINED && b.pref == NOT_EXPLICITLY_DEFINED {
            NOT_EXPLICITLY_DEFINED
        } else {
            a.pref.max(0) + b.pref.max(0)
        };

        let mut max = if a.max >= MAX_SIZE || b.max >= MAX_SIZE {
            MAX_SIZE
        } else {
            USE_PREFERRED_SIZE
        };
        if min == pref && pref >= 0 {
            min = USE_PREFERRED_SIZE;
        }
        if max == pref {
            max = USE_PREFERRED_SIZE;
        }
        self.set_sizes(main, IntervalSizes::new(min, pref, max));
        if self.model.has_attribute(eaten, IntervalAttributes::FLEX_SIZEDEF) {
            self.set_attribute(main, IntervalAttributes::FLEX_SIZEDEF, true);
        }
        if self.model.padding(main).is_none()
            && let Some(padding) = self.model.padding(eaten)
        {
            self.set_padding(main, Some(padding));
        }
        if self.model.parent(eaten).is_some() {
            self.remove(eaten);
        }
        #[cfg(feature = "tracing")]
        log_gap_eaten(main, eaten, pref);
    }

    /// Merge the gaps at `index - 1` and `index` of a sequence.
    pub fn merge_consecutive_gaps(&mut self, seq: IntervalId, index: usize, _dim: Dimension) -> bool {
        if index == 0 || index >= self.model.child_count(seq) {
            return false;
        }
        let children = self.model.children(seq);
        let (first, second) = (children[index - 1], children[index]);
        if !self.model.is_gap(first) || !self.model.is_gap(second) {
            return false;
        }
        let merged = self.merged_size(first, second);
        self.eat_gap(first, second, merged);
        true
    }

    /// Merge every run of adjacent gaps in a sequence.
    pub fn merge_all_gaps(&mut self, seq: IntervalId, dim: Dimension) -> bool {
        let mut merged = false;
        let mut index = self.model.child_count(seq);
        while index > 1 {
            index -= 1;
            if self.merge_consecutive_gaps(seq, index, dim) {
                merged = true;
            }
        }
        merged
    }

    fn merged_size(&self, first: IntervalId, second: IntervalId) -> i32 {
        let dim = self.dimension_of(first);
        let (s1, s2) = (self.space(first), self.space(second));
        if s1.is_set(dim) && s2.is_set(dim) {
            (s2.trailing(dim) - s1.leading(dim)).max(0)
        } else {
            -1
        }
    }

    /// Insert a gap into a sequence, merging with a gap already there.
    /// Returns the index of the resulting gap.
    pub fn insert_gap_into_sequence(
        &mut self,
        gap: IntervalId,
        seq: IntervalId,
        index: Option<usize>,
        _dim: Dimension,
    ) -> usize {
        let count = self.model.child_count(seq);
        let mut index = index.unwrap_or(count).min(count);
        let mut other = None;
        if index > 0 {
            let neighbor = self.model.children(seq)[index - 1];
            if self.model.is_gap(neighbor) {
                other = Some(neighbor);
                index -= 1;
            }
        }
        if other.is_none()
            && index < count
            && let Some(neighbor) = self.model.child(seq, index)
            && self.model.is_gap(neighbor)
        {
            other = Some(neighbor);
        }
        match other {
            Some(other) => self.eat_gap(other, gap, -1),
            None => {
                self.add(gap, seq, Some(index));
            }
        }
        index
    }

    /// Put a gap next to an interval on `edge`, wrapping the interval in a
    /// sequence if it sits in a parallel group.
    pub fn insert_gap(&mut self, gap: IntervalId, interval: IntervalId, dim: Dimension, edge: Edge) {
        if self.model.is_sequential(interval) {
            let index = match edge {
                Edge::Leading => Some(0),
                Edge::Trailing => None,
            };
            self.insert_gap_into_sequence(gap, interval, index, dim);
            return;
        }
        let Some(parent) = self.model.parent(interval) else {
            return;
        };
        if self.model.is_sequential(parent) {
            let index = self.model.index_in_parent(interval).unwrap_or(0);
            let index = match edge {
                Edge::Leading => index,
                Edge::Trailing => index + 1,
            };
            self.insert_gap_into_sequence(gap, parent, Some(index), dim);
            return;
        }
        let seq = self.wrap_in_sequence(interval);
        match edge {
            Edge::Leading => self.add(gap, seq, Some(0)),
            Edge::Trailing => self.add(gap, seq, None),
        };
        let mut region = self.space(interval);
        if region.is_set(dim) {
            let size = self.current_size(gap, dim);
            match edge {
                Edge::Leading => {
                    region.reshape(dim, Edge::Leading, -size);
                    self.set_span(gap, dim, region.leading(dim), region.leading(dim) + size);
                }
                Edge::Trailing => {
                    region.reshape(dim, Edge::Trailing, size);
                    self.set_span(gap, dim, region.trailing(dim) - size, region.trailing(dim));
                }
            }
            self.model.set_current_space(seq, region);
        }
    }

    /// Replace `interval` in its parent by a new sequence holding it.
    pub(crate) fn wrap_in_sequence(&mut self, interval: IntervalId) -> IntervalId {
        let dim = self.dimension_of(interval);
        let seq = self.new_group(dim, GroupKind::Sequential);
        if let Some(parent) = self.model.parent(interval) {
            let alignment = self.model.raw_alignment(interval);
            let index = self.remove(interval);
            self.add(seq, parent, Some(index));
            self.set_alignment(seq, alignment);
            self.set_alignment(interval, Alignment::Default);
        }
        self.add(interval, seq, None);
        let space = self.space(interval);
        self.model.set_current_space(seq, space);
        seq
    }

    /// Refit a gap to the distance between its neighbors.
    pub fn accommodate_gap(&mut self, gap: IntervalId, dim: Dimension) {
        let Some(parent) = self.model.parent(gap) else {
            return;
        };
        if !self.model.is_sequential(parent) || self.model.preferred_size(gap) < 0 {
            return;
        }
        let parent_space = self.space(parent);
        let leading = match self.model.neighbor(gap, Edge::Leading, false) {
            Some(neighbor) => self.space(neighbor).trailing(dim),
            None => parent_space.leading(dim),
        };
        let trailing = match self.model.neighbor(gap, Edge::Trailing, false) {
            Some(neighbor) => self.space(neighbor).leading(dim),
            None => parent_space.trailing(dim),
        };
        if leading == LayoutRegion::UNKNOWN || trailing == LayoutRegion::UNKNOWN {
            return;
        }
        let size = (trailing - leading).max(0);
        if size != self.model.preferred_size(gap) {
            self.resize_interval(gap, size);
        }
        self.set_span(gap, dim, leading, leading + size);
    }

    /// Drop a rigid zero-size gap. Returns true if removed.
    pub fn eliminate_unwanted_zero_gap(&mut self, gap: IntervalId) -> bool {
        if self.model.is_gap(gap)
            && self.model.preferred_size(gap) == 0
            && !self.model.can_resize(gap)
            && self.model.parent(gap).is_some()
        {
            self.remove(gap);
            return true;
        }
        false
    }

    /// Move common fixed edge gaps of a parallel group's sequences out into
    /// the enclosing sequence, and drop gaps standing alone in the group.
    pub fn optimize_gaps(&mut self, group: IntervalId, dim: Dimension) -> bool {
        if !self.model.is_parallel(group) {
            return false;
        }
        let mut changed = false;
        let has_content = self
            .model
            .children(group)
            .iter()
            .any(|child| !self.model.is_gap(*child));
        if has_content {
            let lone: Vec<IntervalId> = self
                .model
                .children(group)
                .iter()
                .copied()
                .filter(|child| self.model.is_gap(*child))
                .collect();
            for gap in lone {
                self.remove(gap);
                changed = true;
            }
        }
        let Some(parent) = self.model.parent(group) else {
            return changed;
        };
        if !self.model.is_sequential(parent) || self.model.child_count(group) < 2 {
            return changed;
        }
        for edge in Edge::ALL {
            let mut edge_gaps = Vec::new();
            for child in self.model.children(group) {
                if !self.model.is_sequential(*child) {
                    break;
                }
                let children = self.model.children(*child);
                let candidate = match edge {
                    Edge::Leading => children.first(),
                    Edge::Trailing => children.last(),
                };
                match candidate {
                    Some(gap)
                        if self.model.is_gap(*gap)
                            && !self.model.can_resize(*gap)
                            && self.model.preferred_size(*gap) > 0 =>
                    {
                        edge_gaps.push((*child, *gap));
                    }
                    _ => break,
                }
            }
            if edge_gaps.len() != self.model.child_count(group) {
                continue;
            }
            let common = edge_gaps
                .iter()
                .map(|(_, gap)| self.model.preferred_size(*gap))
                .min()
                .unwrap_or(0);
            if common <= 0 {
                continue;
            }
            for (seq, gap) in edge_gaps {
                let rest = self.model.preferred_size(gap) - common;
                if rest == 0 {
                    self.remove(gap);
                    self.dissolve_redundant_group(seq);
                } else {
                    self.resize_interval(gap, rest);
                }
            }
            let outer = self.new_gap(dim, IntervalSizes::fixed(common));
            let index = self.model.index_in_parent(group).unwrap_or(0);
            let index = match edge {
                Edge::Leading => index,
                Edge::Trailing => index + 1,
            };
            self.insert_gap_into_sequence(outer, parent, Some(index), dim);
            changed = true;
        }
        changed
    }

    /// Remove resizing end gaps of a non-resizing parallel group's
    /// sequences when another child already defines the group's extent.
    pub fn eliminate_ending_gaps(&mut self, group: IntervalId, dim: Dimension) -> usize {
        if !self.model.is_parallel(group)
            || self.model.parent(group).is_none()
            || self.model.want_resize(group)
        {
            return 0;
        }
        let widest = self
            .model
            .children(group)
            .iter()
            .map(|child| self.current_size(*child, dim))
            .max()
            .unwrap_or(0);
        let mut removed = 0;
        let children: Vec<IntervalId> = self.model.children(group).to_vec();
        for seq in children {
            if !self.model.is_sequential(seq) {
                continue;
            }
            let ending = match self.model.alignment(seq) {
                Alignment::Leading => self.model.children(seq).last().copied(),
                Alignment::Trailing => self.model.children(seq).first().copied(),
                _ => None,
            };
            let Some(gap) = ending.filter(|gap| self.model.is_gap(*gap)) else {
                continue;
            };
            if !self.model.can_resize(gap) {
                continue;
            }
            let others_widest = self
                .model
                .children(group)
                .iter()
                .filter(|child| **child != seq)
                .map(|child| self.current_size(*child, dim))
                .max()
                .unwrap_or(0);
            if others_widest < widest && self.current_size(seq, dim) == widest {
                continue;
            }
            self.remove(gap);
            removed += 1;
            self.dissolve_redundant_group(seq);
        }
        removed
    }

    // -------------------------------------------------------------------
    // Sizes and resizing
    // -------------------------------------------------------------------

    /// Set a new preferred size, keeping min/max tied to it where they were.
    pub fn resize_interval(&mut self, interval: IntervalId, size: i32) -> bool {
        let old = self.model.sizes(interval);
        let mut min = if old.min == old.pref && old.pref >= 0 {
            size
        } else {
            old.min
        };
        if min >= 0 && size >= 0 && min > size {
            min = size;
        }
        let max = if old.max == old.pref {
            if size == NOT_EXPLICITLY_DEFINED {
                USE_PREFERRED_SIZE
            } else {
                size
            }
        } else {
            old.max
        };
        self.set_sizes(interval, IntervalSizes::new(min, size, max))
    }

    /// Make an interval grow with its container, or stop it from growing.
    pub fn set_interval_resizing(&mut self, interval: IntervalId, resizing: bool) -> bool {
        if self.model.is_group(interval) {
            return if resizing {
                self.enable_group_resizing(interval)
            } else {
                self.suppress_group_resizing(interval)
            };
        }
        let old = self.model.sizes(interval);
        let sizes = if resizing {
            let min = if old.min == USE_PREFERRED_SIZE {
                NOT_EXPLICITLY_DEFINED
            } else {
                old.min
            };
            IntervalSizes::new(min, old.pref, MAX_SIZE)
        } else {
            let min = if old.min == NOT_EXPLICITLY_DEFINED || old.min == 0 {
                USE_PREFERRED_SIZE
            } else {
                old.min
            };
            IntervalSizes::new(min, old.pref, USE_PREFERRED_SIZE)
        };
        self.set_sizes(interval, sizes)
    }

    pub fn suppress_group_resizing(&mut self, group: IntervalId) -> bool {
        let sizes = self.model.sizes(group);
        self.set_sizes(
            group,
            IntervalSizes::new(sizes.min, sizes.pref, USE_PREFERRED_SIZE),
        )
    }

    pub fn enable_group_resizing(&mut self, group: IntervalId) -> bool {
        let sizes = self.model.sizes(group);
        self.set_sizes(
            group,
            IntervalSizes::new(sizes.min, sizes.pref, NOT_EXPLICITLY_DEFINED),
        )
    }

    /// Fix every resizing gap in the sequences around `interval`, up to the root.
    pub fn suppress_resizing_of_surrounding_gaps(&mut self, interval: IntervalId) {
        let mut current = interval;
        while let Some(parent) = self.model.parent(current) {
            if self.model.is_sequential(parent) {
                let gaps: Vec<IntervalId> = self
                    .model
                    .children(parent)
                    .iter()
                    .copied()
                    .filter(|c| *c != current && self.model.is_gap(*c) && self.model.can_resize(*c))
                    .collect();
                for gap in gaps {
                    self.set_interval_resizing(gap, false);
                }
            }
            current = parent;
        }
    }

    /// Stop an interval and its content from growing; the changed
    /// intervals are collected in `eliminated`.
    pub fn eliminate_resizing(&mut self, interval: IntervalId, eliminated: &mut Vec<IntervalId>) {
        if self.model.is_group(interval) {
            let children: Vec<IntervalId> = self.model.children(interval).to_vec();
            for child in children {
                self.eliminate_resizing(child, eliminated);
            }
        } else if self.model.want_resize(interval) && self.set_interval_resizing(interval, false) {
            self.set_attribute(interval, IntervalAttributes::SIZE_DIFF, true);
            eliminated.push(interval);
        }
    }

    /// Lift resizing suppression that no longer suppresses anything,
    /// walking up from `group`. Returns the groups changed.
    pub fn eliminate_redundant_suppressed_resizing(&mut self, group: IntervalId) -> Vec<IntervalId> {
        let mut changed = Vec::new();
        let mut current = Some(group);
        while let Some(id) = current {
            if self.model.is_group(id)
                && self.model.parent(id).is_some()
                && !self.model.can_resize(id)
                && !self.model.content_want_resize(id)
                && self.enable_group_resizing(id)
            {
                changed.push(id);
            }
            current = self.model.parent(id);
        }
        changed
    }

    /// In a resizing parallel group, give non-resizing edge-aligned
    /// children a resizing gap on their free side so the group stays filled.
    pub fn complete_group_resizing(&mut self, group: IntervalId, dim: Dimension) -> bool {
        if !self.model.is_parallel(group) || !self.model.want_resize(group) {
            return false;
        }
        let group_size = self.current_size(group, dim);
        let mut added = false;
        let children: Vec<IntervalId> = self.model.children(group).to_vec();
        for child in children {
            if self.model.is_gap(child) || self.model.want_resize(child) {
                continue;
            }
            let Some(edge) = self.model.alignment(child).edge() else {
                continue;
            };
            let diff = group_size - self.current_size(child, dim);
            if diff <= 0 {
                continue;
            }
            let gap = self.new_gap(dim, IntervalSizes::resizing(diff));
            self.insert_gap(gap, child, dim, edge.opposite());
            added = true;
        }
        added
    }

    /// Mark explicit gaps in a subtree as freely adjustable.
    pub fn enable_flexible_size_definition(&mut self, interval: IntervalId, subcontainers: bool) {
        if self.model.is_gap(interval) {
            if self.model.preferred_size(interval) >= 0 {
                self.set_attribute(interval, IntervalAttributes::FLEX_SIZEDEF, true);
            }
            return;
        }
        if subcontainers
            && let Some(component) = self.model.component_of(interval).cloned()
        {
            let dim = self.dimension_of(interval);
            let roots: Vec<IntervalId> = self
                .model
                .component(&component)
                .map(|c| c.layers().iter().map(|pair| pair[dim.index()]).collect())
                .unwrap_or_default();
            for root in roots {
                self.enable_flexible_size_definition(root, true);
            }
            return;
        }
        let children: Vec<IntervalId> = self.model.children(interval).to_vec();
        for child in children {
            self.enable_flexible_size_definition(child, subcontainers);
        }
    }

    /// Make `aligned` and every same-sized sibling component auto-resizing
    /// so they keep sharing the parallel group's size.
    pub fn set_parallel_same_size(&mut self, group: IntervalId, aligned: IntervalId, dim: Dimension) {
        let reference = self.space(aligned);
        let children: Vec<IntervalId> = self.model.children(group).to_vec();
        for child in children {
            if !self.model.is_component(child) {
                continue;
            }
            let space = self.space(child);
            let same = child == aligned
                || (space.is_set(dim)
                    && space.leading(dim) == reference.leading(dim)
                    && space.trailing(dim) == reference.trailing(dim));
            if !same {
                continue;
            }
            let sizes = self.model.sizes(child);
            let min = if sizes.min == USE_PREFERRED_SIZE {
                NOT_EXPLICITLY_DEFINED
            } else {
                sizes.min
            };
            self.set_sizes(child, IntervalSizes::new(min, sizes.pref, MAX_SIZE));
            self.set_alignment(child, Alignment::Default);
        }
    }

    /// Compensate a parallel group that lost its biggest child so that its
    /// size, and so the positions around it, stay the same.
    ///
    /// `excluded` names an interval (with its size) standing in for the
    /// removed content. Returns the interval that received the filler gap.
    pub fn maintain_size(
        &mut self,
        group: IntervalId,
        was_resizing: bool,
        dim: Dimension,
        excluded: Option<(IntervalId, i32)>,
    ) -> Option<IntervalId> {
        if !self.model.is_parallel(group) {
            return None;
        }
        let parent = self.model.parent(group)?;
        let group_size = self.space(group).size(dim);
        if group_size == LayoutRegion::UNKNOWN {
            return None;
        }
        let mut biggest: Option<(IntervalId, i32)> = None;
        let mut common_alignment = None;
        let mut same_alignment = true;
        for child in self.model.children(group) {
            if self.model.want_resize(*child) {
                return None;
            }
            let size = match excluded {
                Some((id, size)) if id == *child => size,
                _ => self.current_size(*child, dim),
            };
            if biggest.is_none_or(|(_, best)| size > best) {
                biggest = Some((*child, size));
            }
            let alignment = self.model.alignment(*child);
            match common_alignment {
                None => common_alignment = Some(alignment),
                Some(existing) if existing != alignment => same_alignment = false,
                Some(_) => {}
            }
        }
        let (biggest, biggest_size) = biggest?;
        let missing = group_size - biggest_size;
        if missing <= 0 {
            return None;
        }
        let sizes = if was_resizing {
            IntervalSizes::resizing(missing)
        } else {
            IntervalSizes::fixed(missing)
        };
        let alignment = common_alignment.unwrap_or(Alignment::Leading);
        if same_alignment
            && let Some(edge) = alignment.edge()
            && self.model.is_sequential(parent)
        {
            let gap = self.new_gap(dim, sizes);
            self.insert_gap(gap, group, dim, edge.opposite());
            return Some(group);
        }
        let edge = self.model.alignment(biggest).edge()?;
        let gap = self.new_gap(dim, sizes);
        self.insert_gap(gap, biggest, dim, edge.opposite());
        self.model.parent(gap)
    }

    // -------------------------------------------------------------------
    // Groups
    // -------------------------------------------------------------------

    /// Dissolve a group that adds nothing to the structure. Returns true
    /// if it was taken out of the tree.
    pub fn dissolve_redundant_group(&mut self, group: IntervalId) -> bool {
        let Some(parent) = self.model.parent(group) else {
            return false;
        };
        if !self.model.is_group(group) {
            return false;
        }
        let dim = self.dimension_of(group);
        let count = self.model.child_count(group);
        if count == 0 {
            self.remove(group);
            return true;
        }
        let dissolve = count == 1
            || (self.model.is_sequential(group) && self.model.is_sequential(parent))
            || (self.model.is_parallel(group)
                && self.model.is_parallel(parent)
                && self.parallel_compatible(group, parent));
        if !dissolve {
            return false;
        }
        #[cfg(feature = "tracing")]
        log_dissolve(group, parent, count);

        if count > 1 {
            let index = self.remove(group);
            self.add_content(group, parent, Some(index));
            return true;
        }

        let sub = self.model.children(group)[0];
        let alignment = self.model.raw_alignment(group);
        let suppressed = !self.model.can_resize(group);
        self.remove(sub);
        let index = self.remove(group);
        if self.model.is_gap(sub) && self.model.is_parallel(parent) {
            return true;
        }
        if self.model.is_sequential(sub) && self.model.is_sequential(parent) {
            self.add_content(sub, parent, Some(index));
        } else {
            self.add(sub, parent, Some(index));
            if self.model.is_parallel(parent) {
                self.set_alignment(sub, alignment);
            } else {
                self.set_alignment(sub, Alignment::Default);
                self.merge_consecutive_gaps(parent, index + 1, dim);
                self.merge_consecutive_gaps(parent, index, dim);
            }
        }
        if suppressed && self.model.want_resize(sub) {
            let mut eliminated = Vec::new();
            self.eliminate_resizing(sub, &mut eliminated);
        }
        true
    }

    fn parallel_compatible(&self, group: IntervalId, parent: IntervalId) -> bool {
        let group_alignment = self.model.group_alignment(group);
        let raw = self.model.raw_alignment(group);
        group_alignment == self.model.group_alignment(parent)
            && (raw == Alignment::Default || raw == group_alignment)
            && self.model.sizes(group) == IntervalSizes::DEFAULT
    }

    /// Dissolve redundant groups in a whole subtree, bottom-up.
    pub fn destroy_redundant_groups(&mut self, group: IntervalId) {
        if !self.model.is_group(group) {
            return;
        }
        let dim = self.dimension_of(group);
        let children: Vec<IntervalId> = self.model.children(group).to_vec();
        for child in children {
            self.destroy_redundant_groups(child);
        }
        if self.model.is_sequential(group) {
            self.merge_all_gaps(group, dim);
        }
        self.dissolve_redundant_group(group);
    }

    /// Flatten nested parallel groups with identical alignment.
    pub fn merge_parallel_groups(&mut self, group: IntervalId) {
        let children: Vec<IntervalId> = self.model.children(group).to_vec();
        for child in &children {
            if self.model.is_group(*child) {
                self.merge_parallel_groups(*child);
            }
        }
        if !self.model.is_parallel(group) {
            return;
        }
        let nested: Vec<IntervalId> = self
            .model
            .children(group)
            .iter()
            .copied()
            .filter(|child| self.model.is_parallel(*child) && self.parallel_compatible(*child, group))
            .collect();
        for sub in nested {
            let index = self.remove(sub);
            self.add_content(sub, group, Some(index));
        }
    }

    /// Move children `start..=end` of `seq` into a new parallel group put in
    /// their place. Returns the new group.
    pub fn extract_parallel_sequence(
        &mut self,
        seq: IntervalId,
        start: usize,
        end: usize,
        dim: Dimension,
    ) -> IntervalId {
        let count = self.model.child_count(seq);
        let end = end.min(count.saturating_sub(1));
        let group = self.new_group(dim, GroupKind::Parallel);
        if start == end {
            let only = self.model.children(seq)[start];
            self.remove(only);
            self.add(only, group, None);
        } else {
            let sub = self.new_group(dim, GroupKind::Sequential);
            for _ in start..=end {
                let child = self.model.children(seq)[start];
                self.remove(child);
                self.add(child, sub, None);
            }
            self.update_group_space(sub);
            self.add(sub, group, None);
        }
        self.add(group, seq, Some(start));
        self.update_group_space(group);
        group
    }

    /// Put `interval` in parallel with children `start..=end` of `seq`.
    pub fn add_parallel_with_sequence(
        &mut self,
        interval: IntervalId,
        seq: IntervalId,
        start: usize,
        end: usize,
        dim: Dimension,
        alignment: Alignment,
    ) -> IntervalId {
        let group = self.extract_parallel_sequence(seq, start, end, dim);
        self.add(interval, group, None);
        let raw = if alignment == self.model.group_alignment(group) {
            Alignment::Default
        } else {
            alignment
        };
        self.set_alignment(interval, raw);
        self.update_group_space(group);
        group
    }

    /// Take `interval` out of its parallel group and put it in parallel with
    /// the enclosing sequence from the group's position to `end_index`.
    pub fn parallelize_with_parent_sequence(
        &mut self,
        interval: IntervalId,
        end_index: Option<usize>,
        dim: Dimension,
    ) -> Option<IntervalId> {
        let parent = self.model.parent(interval)?;
        if !self.model.is_parallel(parent) {
            return None;
        }
        let mut branch = parent;
        let seq = loop {
            let up = self.model.parent(branch)?;
            if self.model.is_sequential(up) {
                break up;
            }
            branch = up;
        };
        let position = self.model.index_in_parent(branch)?;
        let last = self.model.child_count(seq).saturating_sub(1);
        let end = end_index.unwrap_or(last).min(last);
        let (start, end) = if end < position {
            (end, position)
        } else {
            (position, end)
        };
        let alignment = self.model.alignment(interval);
        self.remove(interval);
        let group = self.add_parallel_with_sequence(interval, seq, start, end, dim, alignment);
        if self.model.parent(parent).is_some() && self.model.child_count(parent) <= 1 {
            self.dissolve_redundant_group(parent);
        }
        Some(group)
    }

    /// Cut a sequence down around `leading..=trailing`.
    ///
    /// A closed extraction keeps exactly that range. An open one also keeps
    /// everything toward the side opposite to `alignment`. What is cut off
    /// is returned as leading and trailing remainders.
    pub fn extract(
        &mut self,
        leading: IntervalId,
        trailing: IntervalId,
        alignment: Alignment,
        closed: bool,
    ) -> (usize, Option<Remainder>, Option<Remainder>) {
        let Some(seq) = self.model.parent(leading).filter(|p| self.model.is_sequential(*p)) else {
            return (1, None, None);
        };
        let count = self.model.child_count(seq);
        let first = self.model.index_in_parent(leading).unwrap_or(0);
        let last = self.model.index_in_parent(trailing).unwrap_or(first).max(first);
        let (start, end) = if closed {
            (first, last)
        } else {
            match alignment {
                Alignment::Leading => (first, count - 1),
                Alignment::Trailing => (0, last),
                _ => (first, last),
            }
        };
        let kept = end - start + 1;
        if kept >= count {
            return (kept, None, None);
        }
        let children: Vec<IntervalId> = self.model.children(seq).to_vec();
        let take = |ops: &mut Self, range: &[IntervalId]| -> Option<Remainder> {
            let first = *range.first()?;
            let alignment = ops.effective_alignment(first);
            for id in range {
                ops.remove(*id);
            }
            Some(Remainder {
                alignment,
                intervals: range.to_vec(),
            })
        };
        let rest_trailing = take(self, &children[end + 1..]);
        let rest_leading = take(self, &children[..start]);
        (kept, rest_leading, rest_trailing)
    }

    /// Re-insert remainders cut by [`Self::extract`] into `seq` at `index`.
    ///
    /// Several remainders are stacked in a new parallel group. Returns the
    /// group created for them, if any.
    pub fn add_group_content(
        &mut self,
        list: Vec<Remainder>,
        seq: IntervalId,
        index: usize,
        dim: Dimension,
        position: Edge,
    ) -> Option<IntervalId> {
        let mut list: Vec<Remainder> = list
            .into_iter()
            .filter(|rest| !rest.intervals.is_empty())
            .collect();
        match list.len() {
            0 => None,
            1 => {
                let rest = list.remove(0);
                self.insert_run(&rest.intervals, seq, index, dim);
                None
            }
            _ => {
                let group = self.new_group(dim, GroupKind::Parallel);
                for rest in list {
                    let content: Vec<IntervalId> = rest
                        .intervals
                        .iter()
                        .copied()
                        .filter(|id| !self.model.is_gap(*id))
                        .collect();
                    if content.is_empty() {
                        continue;
                    }
                    let item = if rest.intervals.len() == 1 {
                        rest.intervals[0]
                    } else {
                        let sub = self.new_group(dim, GroupKind::Sequential);
                        self.insert_run(&rest.intervals, sub, 0, dim);
                        self.trim_ending_gaps(sub, position);
                        self.update_group_space(sub);
                        sub
                    };
                    self.add(item, group, None);
                    let alignment = if rest.alignment.edge().is_some() {
                        rest.alignment
                    } else {
                        position.opposite().alignment()
                    };
                    self.set_alignment(item, alignment);
                }
                if self.model.child_count(group) == 0 {
                    return None;
                }
                self.update_group_space(group);
                let at = index.min(self.model.child_count(seq));
                self.add(group, seq, Some(at));
                let at = self.model.index_in_parent(group).unwrap_or(at);
                self.merge_consecutive_gaps(seq, at + 1, dim);
                self.merge_consecutive_gaps(seq, at, dim);
                Some(group)
            }
        }
    }

    fn insert_run(&mut self, intervals: &[IntervalId], seq: IntervalId, index: usize, dim: Dimension) {
        let mut at = index.min(self.model.child_count(seq));
        for id in intervals {
            if self.model.is_gap(*id) {
                at = self.insert_gap_into_sequence(*id, seq, Some(at), dim) + 1;
            } else {
                self.add(*id, seq, Some(at));
                at += 1;
            }
        }
        self.merge_consecutive_gaps(seq, at, dim);
    }

    fn trim_ending_gaps(&mut self, seq: IntervalId, position: Edge) {
        let ending = match position {
            Edge::Leading => self.model.children(seq).last().copied(),
            Edge::Trailing => self.model.children(seq).first().copied(),
        };
        if let Some(gap) = ending.filter(|gap| self.model.is_gap(*gap)) {
            self.remove(gap);
        }
    }

    /// Reset an emptied root to a single filling gap.
    pub fn prop_empty_container(&mut self, root: IntervalId, dim: Dimension) {
        let children: Vec<IntervalId> = self.model.children(root).to_vec();
        for child in children {
            self.remove(child);
        }
        let space = self.space(root);
        let size = if space.is_set(dim) {
            space.size(dim).max(0)
        } else {
            0
        };
        let gap = self.new_gap(dim, IntervalSizes::new(0, size, MAX_SIZE));
        self.add(gap, root, None);
        if space.is_set(dim) {
            self.set_span(gap, dim, space.leading(dim), space.trailing(dim));
        }
    }

    // -------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------

    /// Repair the tree after the child at `index` of `parent` was taken out.
    ///
    /// Gaps around the hole are collapsed into one placeholder keeping the
    /// visual size, or removed at an open end with the parent's size
    /// maintained. Emptied groups go away recursively.
    pub fn interval_removed(
        &mut self,
        parent: IntervalId,
        index: usize,
        was_resizing: bool,
        dim: Dimension,
    ) {
        #[cfg(feature = "tracing")]
        log_interval_removed(parent, index, was_resizing);

        if self.model.is_sequential(parent) {
            self.removed_from_sequence(parent, index, was_resizing, dim);
            return;
        }
        if self.model.parent(parent).is_none() && self.model.child_count(parent) == 0 {
            return;
        }
        if self.model.group_alignment(parent).edge().is_some() {
            self.eliminate_redundant_suppressed_resizing(parent);
            let adjusted = self.maintain_size(parent, was_resizing, dim, None);
            self.optimize_gaps(adjusted.unwrap_or(parent), dim);
            self.eliminate_ending_gaps(parent, dim);
        }
        if self.model.parent(parent).is_some() {
            let mut group = parent;
            let super_parent = self.model.first_parent(parent, GroupKind::Parallel);
            if self.dissolve_redundant_group(parent) {
                match super_parent {
                    Some(up) => group = up,
                    None => return,
                }
            }
            if self.model.parent(group).is_some()
                && self.model.child_count(group) > 1
                && was_resizing
                && !self.model.content_want_resize(group)
            {
                self.enable_group_resizing(group);
            }
        }
    }

    fn removed_from_sequence(
        &mut self,
        parent: IntervalId,
        index: usize,
        was_resizing: bool,
        dim: Dimension,
    ) {
        let mut index = index;
        let (leading_gap, leading_neighbor) = if index > 0 {
            let li = self.model.children(parent)[index - 1];
            if self.model.is_gap(li) {
                self.remove(li);
                index -= 1;
                let neighbor = (index > 0).then(|| self.model.children(parent)[index - 1]);
                (Some(li), neighbor)
            } else {
                (None, Some(li))
            }
        } else {
            (None, None)
        };
        let (trailing_gap, trailing_neighbor) = match self.model.child(parent, index) {
            Some(li) if self.model.is_gap(li) => {
                self.remove(li);
                (Some(li), self.model.child(parent, index))
            }
            Some(li) => (None, Some(li)),
            None => (None, None),
        };

        let resizing_gap = |gap: Option<IntervalId>, model: &LayoutModel| {
            gap.is_some_and(|gap| model.can_resize(gap))
        };
        let gaps_resizing =
            resizing_gap(leading_gap, self.model()) || resizing_gap(trailing_gap, self.model());
        let Some(super_parent) = self.model.parent(parent) else {
            return;
        };

        if self.model.child_count(parent) == 0 {
            let removed_at = self.remove(parent);
            self.interval_removed(super_parent, removed_at, was_resizing || gaps_resizing, dim);
            return;
        }

        let restore_resizing =
            gaps_resizing || (was_resizing && !self.model.content_want_resize(parent));
        let anchored_to = |ops: &Self, neighbor: IntervalId, edge: Alignment| {
            !restore_resizing && ops.effective_alignment(neighbor) == edge
        };
        let middle_or_aligned = (leading_neighbor.is_some() && trailing_neighbor.is_some())
            || leading_neighbor.is_some_and(|l| {
                resizing_gap(trailing_gap, self.model()) || anchored_to(self, l, Alignment::Trailing)
            })
            || trailing_neighbor.is_some_and(|t| {
                resizing_gap(leading_gap, self.model()) || anchored_to(self, t, Alignment::Leading)
            });

        if middle_or_aligned {
            let (min, max) = if restore_resizing {
                let zero_min = |neighbor: Option<IntervalId>, gap: Option<IntervalId>| {
                    neighbor.is_none() && gap.is_some_and(|g| self.model.min_size(g) == 0)
                };
                let min = if zero_min(leading_neighbor, leading_gap)
                    || zero_min(trailing_neighbor, trailing_gap)
                {
                    0
                } else {
                    NOT_EXPLICITLY_DEFINED
                };
                (min, MAX_SIZE)
            } else {
                (USE_PREFERRED_SIZE, USE_PREFERRED_SIZE)
            };
            let parent_space = self.space(parent);
            let from = match leading_neighbor {
                Some(l) => self.space(l).trailing(dim),
                None => parent_space.leading(dim),
            };
            let to = match trailing_neighbor {
                Some(t) => self.space(t).leading(dim),
                None => parent_space.trailing(dim),
            };
            let pref = if from == LayoutRegion::UNKNOWN || to == LayoutRegion::UNKNOWN {
                [leading_gap, trailing_gap]
                    .into_iter()
                    .flatten()
                    .map(|gap| self.model.preferred_size(gap).max(0))
                    .sum()
            } else {
                (to - from).max(0)
            };
            let gap = self.new_gap(dim, IntervalSizes::new(min, pref, max));
            self.set_attribute(gap, IntervalAttributes::FLEX_SIZEDEF, true);
            self.add(gap, parent, Some(index));
            if from != LayoutRegion::UNKNOWN && to != LayoutRegion::UNKNOWN {
                self.set_span(gap, dim, from, from + pref);
            }
            if let Some(t) = trailing_neighbor
                && self.model.is_parallel(t)
                && trailing_gap.is_none()
            {
                self.eliminate_ending_gaps(t, dim);
            }
            if let Some(l) = leading_neighbor
                && self.model.is_parallel(l)
                && leading_gap.is_none()
            {
                self.eliminate_ending_gaps(l, dim);
            }
            if self.eliminate_unwanted_zero_gap(gap) {
                self.merge_all_gaps(parent, dim);
            }
            if (leading_neighbor.is_none() && leading_gap.is_none())
                || (trailing_neighbor.is_none() && trailing_gap.is_none())
            {
                self.optimize_gaps(super_parent, dim);
            }
            self.destroy_redundant_groups(super_parent);
        } else {
            let mut resizing_alignment = None;
            if restore_resizing {
                if leading_neighbor.is_none() && self.model.alignment(parent) == Alignment::Leading {
                    self.set_alignment(parent, Alignment::Trailing);
                    resizing_alignment = Some(Alignment::Leading);
                } else if trailing_neighbor.is_none()
                    && self.model.alignment(parent) == Alignment::Trailing
                {
                    self.set_alignment(parent, Alignment::Leading);
                    resizing_alignment = Some(Alignment::Trailing);
                }
            }
            if let (Some(_), Some(gap)) = (leading_neighbor, trailing_gap) {
                self.add(gap, parent, None);
            } else if let (Some(_), Some(gap)) = (trailing_neighbor, leading_gap) {
                self.add(gap, parent, Some(0));
            }

            let exclude = if self.model.child_count(parent) == 1 {
                let last = self.model.children(parent)[0];
                let alignment = self.model.raw_alignment(parent);
                self.remove(last);
                let at = self.remove(parent);
                if self.model.is_gap(last) && self.model.is_parallel(super_parent) {
                    None
                } else {
                    self.add(last, super_parent, Some(at));
                    self.set_alignment(last, alignment);
                    Some(last)
                }
            } else {
                let parent_space = self.space(parent);
                let leading = match (leading_neighbor, trailing_neighbor) {
                    (None, Some(t)) => self.space(t).leading(dim),
                    _ => parent_space.leading(dim),
                };
                let trailing = match (leading_neighbor, trailing_neighbor) {
                    (Some(l), None) => self.space(l).trailing(dim),
                    _ => parent_space.trailing(dim),
                };
                self.set_span(parent, dim, leading, trailing);
                Some(parent)
            };
            let excluded = exclude.map(|id| (id, self.current_size(id, dim)));
            match self.maintain_size(super_parent, restore_resizing, dim, excluded) {
                Some(adjusted) => {
                    self.optimize_gaps(adjusted, dim);
                }
                None => {
                    let unresized = self.eliminate_redundant_suppressed_resizing(super_parent);
                    if unresized.is_empty() && self.complete_group_resizing(super_parent, dim) {
                        self.optimize_gaps(super_parent, dim);
                    }
                }
            }
            if let Some(alignment) = resizing_alignment {
                let neighbor = match alignment {
                    Alignment::Leading => trailing_neighbor,
                    _ => leading_neighbor,
                };
                if let Some(seq) = neighbor.and_then(|n| self.model.parent(n))
                    && self.model.is_sequential(seq)
                    && self.model.want_resize(seq)
                {
                    self.set_alignment(seq, alignment);
                }
            }
        }

        if restore_resizing
            && self.model.interval(super_parent).is_some()
            && self.model.parent(super_parent).is_some()
            && !self.model.can_resize(super_parent)
            && !self.model.content_want_resize(super_parent)
        {
            self.enable_group_resizing(super_parent);
        }
    }
}

/// Edge an interval effectively sticks to when its container resizes.
///
/// In a sequence this follows the resizing siblings; with none on either
/// side the sequence's own anchoring applies.
#[must_use]
pub fn effective_alignment(model: &LayoutModel, id: IntervalId) -> Alignment {
    let Some(parent) = model.parent(id) else {
        return Alignment::Leading;
    };
    if model.is_parallel(parent) {
        if model.want_resize(id) {
            return Alignment::Default;
        }
        let alignment = model.alignment(id);
        if alignment.edge().is_none() || model.parent(parent).is_none() {
            return alignment;
        }
        if model.want_resize(parent) {
            return alignment;
        }
        return effective_alignment(model, parent);
    }
    let siblings = model.children(parent);
    let Some(index) = siblings.iter().position(|c| *c == id) else {
        return Alignment::Default;
    };
    let before = siblings[..index].iter().any(|c| model.want_resize(*c));
    let after = siblings[index + 1..].iter().any(|c| model.want_resize(*c));
    match (before, after) {
        (false, true) => Alignment::Leading,
        (true, false) => Alignment::Trailing,
        (false, false) => effective_alignment(model, parent),
        (true, true) => Alignment::Default,
    }
}

#[cfg(feature = "tracing")]
fn log_gap_eaten(main: IntervalId, eaten: IntervalId, pref: i32) {
    tracing::trace!(
        message = "operations.eat_gap",
        main = main.get(),
        eaten = eaten.get(),
        pref
    );
}

#[cfg(feature = "tracing")]
fn log_dissolve(group: IntervalId, parent: IntervalId, children: usize) {
    tracing::debug!(
        message = "operations.dissolve_group",
        group = group.get(),
        parent = parent.get(),
        children
    );
}

#[cfg(feature = "tracing")]
fn log_interval_removed(parent: IntervalId, index: usize, was_resizing: bool) {
    tracing::debug!(
        message = "operations.interval_removed",
        parent = parent.get(),
        index,
        was_resizing
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::StaticMapper;
    use formlay_core::{Rect, Size};

    const H: Dimension = Dimension::Horizontal;

    struct Fixture {
        model: LayoutModel,
        mapper: StaticMapper,
        root: IntervalId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut model = LayoutModel::new();
            let roots = model
                .create_container(ComponentId::from("form"), Size::new(400, 300))
                .expect("container");
            let root = roots[0];
            let filler = model.children(root)[0];
            model.remove_interval(filler).expect("drop filler");
            model.set_current_span(root, H, 0, 400);
            Self {
                model,
                mapper: StaticMapper::new(),
                root,
            }
        }

        fn ops(&mut self) -> LayoutOperations<'_> {
            LayoutOperations::new(&mut self.model, &self.mapper)
        }

        fn component(&mut self, name: &str, leading: i32, trailing: i32) -> IntervalId {
            let id = self
                .model
                .create_component(ComponentId::from(name))
                .expect("component")[0];
            self.model.set_current_space(
                id,
                LayoutRegion::from_rect(Rect::from_edges(leading, 0, trailing, 20), None),
            );
            id
        }

        fn gap(&mut self, sizes: IntervalSizes) -> IntervalId {
            self.model.create_gap(H, sizes).expect("gap")
        }

        fn seq(&mut self, parent: IntervalId, children: &[IntervalId]) -> IntervalId {
            let seq = self.model.create_group(H, GroupKind::Sequential).expect("seq");
            self.model.add_interval(seq, parent, None).expect("add seq");
            for child in children {
                self.model.add_interval(*child, seq, None).expect("add child");
            }
            seq
        }

        fn structure(&self) -> String {
            self.model.dump_structure(self.root)
        }
    }

    #[test]
    fn eat_gap_merges_fixed_sizes() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 0, 10);
        let g1 = fx.gap(IntervalSizes::fixed(10));
        let g2 = fx.gap(IntervalSizes::fixed(5));
        let seq = fx.seq(fx.root, &[a, g1, g2]);
        assert!(fx.ops().merge_consecutive_gaps(seq, 2, H));
        assert_eq!(fx.model.children(seq), &[a, g1]);
        assert_eq!(fx.model.sizes(g1), IntervalSizes::fixed(15));
    }

    #[test]
    fn eat_gap_keeps_resizing() {
        let mut fx = Fixture::new();
        let g1 = fx.gap(IntervalSizes::resizing(20));
        let g2 = fx.gap(IntervalSizes::fixed(5));
        fx.ops().eat_gap(g1, g2, 30);
        assert_eq!(fx.model.sizes(g1), IntervalSizes::resizing(30));
    }

    #[test]
    fn insert_gap_merges_with_neighbor_gap() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 0, 10);
        let g1 = fx.gap(IntervalSizes::fixed(10));
        let b = fx.component("b", 20, 30);
        let seq = fx.seq(fx.root, &[a, g1, b]);
        let extra = fx.gap(IntervalSizes::fixed(4));
        let at = fx.ops().insert_gap_into_sequence(extra, seq, Some(2), H);
        assert_eq!(at, 1);
        assert_eq!(fx.model.child_count(seq), 3);
        assert_eq!(fx.model.preferred_size(g1), 14);
    }

    #[test]
    fn insert_gap_wraps_parallel_child() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 10, 50);
        let b = fx.component("b", 10, 90);
        let group = fx.model.create_group(H, GroupKind::Parallel).expect("group");
        let seq = fx.seq(fx.root, &[]);
        fx.model.add_interval(group, seq, None).expect("group");
        fx.model.add_interval(a, group, None).expect("a");
        fx.model.add_interval(b, group, None).expect("b");
        let gap = fx.gap(IntervalSizes::fixed(40));
        fx.ops().insert_gap(gap, a, H, Edge::Trailing);
        let wrapper = fx.model.parent(a).expect("wrapped");
        assert!(fx.model.is_sequential(wrapper));
        assert_eq!(fx.model.parent(wrapper), Some(group));
        assert_eq!(fx.model.children(wrapper), &[a, gap]);
        assert_eq!(fx.model.current_space(wrapper).trailing(H), 90);
    }

    #[test]
    fn dissolving_single_child_group_moves_it_up() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 10, 50);
        let lead = fx.gap(IntervalSizes::fixed(10));
        let outer = fx.seq(fx.root, &[lead]);
        let group = fx.model.create_group(H, GroupKind::Parallel).expect("group");
        fx.model.add_interval(group, outer, None).expect("group");
        fx.model.add_interval(a, group, None).expect("a");
        assert!(fx.ops().dissolve_redundant_group(group));
        assert_eq!(fx.model.children(outer), &[lead, a]);
        assert!(fx.model.interval(group).is_some_and(|n| n.parent().is_none()));
    }

    #[test]
    fn sequence_in_sequence_is_flattened_with_gap_merge() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 0, 10);
        let g1 = fx.gap(IntervalSizes::fixed(10));
        let outer = fx.seq(fx.root, &[a, g1]);
        let g2 = fx.gap(IntervalSizes::fixed(5));
        let b = fx.component("b", 25, 40);
        let inner = fx.model.create_group(H, GroupKind::Sequential).expect("inner");
        fx.model.add_interval(g2, inner, None).expect("g2");
        fx.model.add_interval(b, inner, None).expect("b");
        fx.model.add_interval(inner, outer, None).expect("inner");
        assert!(fx.ops().dissolve_redundant_group(inner));
        assert_eq!(fx.model.children(outer), &[a, g1, b]);
        assert_eq!(fx.model.preferred_size(g1), 15);
    }

    #[test]
    fn optimize_gaps_extracts_common_leading_gap() {
        let mut fx = Fixture::new();
        let lead = fx.gap(IntervalSizes::fixed(10));
        let outer = fx.seq(fx.root, &[lead]);
        let group = fx.model.create_group(H, GroupKind::Parallel).expect("group");
        fx.model.add_interval(group, outer, None).expect("group");
        let a = fx.component("a", 30, 60);
        let b = fx.component("b", 35, 70);
        let ga = fx.gap(IntervalSizes::fixed(20));
        let gb = fx.gap(IntervalSizes::fixed(25));
        fx.seq(group, &[ga, a]);
        fx.seq(group, &[gb, b]);
        assert!(fx.ops().optimize_gaps(group, H));
        assert_eq!(fx.model.children(outer), &[lead, group]);
        assert_eq!(fx.model.preferred_size(lead), 30);
        let children = fx.model.children(group).to_vec();
        assert_eq!(children[0], a);
        assert!(fx.model.is_sequential(children[1]));
        assert_eq!(fx.model.preferred_size(gb), 5);
    }

    #[test]
    fn resize_interval_keeps_rigid_bounds_tied() {
        let mut fx = Fixture::new();
        let gap = fx.gap(IntervalSizes::new(15, 15, 15));
        assert!(fx.ops().resize_interval(gap, 30));
        assert_eq!(fx.model.sizes(gap), IntervalSizes::new(30, 30, 30));
        let spring = fx.gap(IntervalSizes::resizing(10));
        fx.ops().resize_interval(spring, 40);
        assert_eq!(fx.model.sizes(spring), IntervalSizes::resizing(40));
    }

    #[test]
    fn interval_resizing_toggles_max() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 0, 10);
        assert!(fx.ops().set_interval_resizing(a, true));
        assert!(fx.model.want_resize(a));
        assert!(fx.ops().set_interval_resizing(a, false));
        assert!(!fx.model.want_resize(a));
        assert!(!fx.ops().set_interval_resizing(a, false));
    }

    #[test]
    fn surrounding_gaps_stop_resizing() {
        let mut fx = Fixture::new();
        let lead = fx.gap(IntervalSizes::resizing(10));
        let a = fx.component("a", 10, 50);
        let trail = fx.gap(IntervalSizes::resizing(350));
        fx.seq(fx.root, &[lead, a, trail]);
        fx.ops().suppress_resizing_of_surrounding_gaps(a);
        assert!(!fx.model.can_resize(lead));
        assert!(!fx.model.can_resize(trail));
    }

    #[test]
    fn removal_in_the_middle_leaves_placeholder_gap() {
        let mut fx = Fixture::new();
        let g0 = fx.gap(IntervalSizes::fixed(10));
        let a = fx.component("a", 10, 50);
        let g1 = fx.gap(IntervalSizes::fixed(10));
        let b = fx.component("b", 60, 100);
        let g2 = fx.gap(IntervalSizes::fixed(10));
        let c = fx.component("c", 110, 150);
        let tail = fx.gap(IntervalSizes::resizing(250));
        let seq = fx.seq(fx.root, &[g0, a, g1, b, g2, c, tail]);
        fx.model.set_current_span(seq, H, 0, 400);
        let index = fx.model.remove_interval(b).expect("remove b");
        fx.ops().interval_removed(seq, index, false, H);
        let children = fx.model.children(seq).to_vec();
        assert_eq!(children.len(), 5);
        assert_eq!(children[1], a);
        assert_eq!(children[3], c);
        assert_eq!(fx.model.sizes(children[2]), IntervalSizes::fixed(60));
        assert!(fx.model.has_attribute(children[2], IntervalAttributes::FLEX_SIZEDEF));
    }

    #[test]
    fn removing_the_only_component_empties_the_sequence() {
        let mut fx = Fixture::new();
        let lead = fx.gap(IntervalSizes::fixed(10));
        let a = fx.component("a", 10, 100);
        let trail = fx.gap(IntervalSizes::resizing(300));
        let seq = fx.seq(fx.root, &[lead, a, trail]);
        let index = fx.model.remove_interval(a).expect("remove a");
        fx.ops().interval_removed(seq, index, false, H);
        assert_eq!(fx.model.child_count(fx.root), 0);
        let root = fx.root;
        fx.ops().prop_empty_container(root, H);
        assert_eq!(fx.structure(), "parallel group=leading\n  gap size=0/400/max\n");
    }

    #[test]
    fn extract_and_restore_remainders() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 0, 10);
        let g1 = fx.gap(IntervalSizes::fixed(10));
        let b = fx.component("b", 20, 30);
        let g2 = fx.gap(IntervalSizes::fixed(10));
        let c = fx.component("c", 40, 50);
        let seq = fx.seq(fx.root, &[a, g1, b, g2, c]);
        let (kept, lead, trail) = fx.ops().extract(b, b, Alignment::Leading, true);
        assert_eq!(kept, 1);
        assert_eq!(fx.model.children(seq), &[b]);
        let lead = lead.expect("leading remainder");
        assert_eq!(lead.intervals, vec![a, g1]);
        let trail = trail.expect("trailing remainder");
        assert_eq!(trail.intervals, vec![g2, c]);

        fx.ops().add_group_content(vec![trail], seq, 1, H, Edge::Trailing);
        fx.ops().add_group_content(vec![lead], seq, 0, H, Edge::Leading);
        assert_eq!(fx.model.children(seq), &[a, g1, b, g2, c]);
    }

    #[test]
    fn open_extract_keeps_the_far_side() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 0, 10);
        let g1 = fx.gap(IntervalSizes::fixed(10));
        let b = fx.component("b", 20, 30);
        let g2 = fx.gap(IntervalSizes::fixed(10));
        let c = fx.component("c", 40, 50);
        let seq = fx.seq(fx.root, &[a, g1, b, g2, c]);
        let (kept, lead, trail) = fx.ops().extract(b, b, Alignment::Leading, false);
        assert_eq!(kept, 3);
        assert_eq!(fx.model.children(seq), &[b, g2, c]);
        assert!(trail.is_none());
        assert_eq!(lead.map(|rest| rest.intervals), Some(vec![a, g1]));
    }

    #[test]
    fn parallel_with_sequence_range() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 10, 50);
        let g1 = fx.gap(IntervalSizes::fixed(10));
        let b = fx.component("b", 60, 100);
        let tail = fx.gap(IntervalSizes::resizing(300));
        let seq = fx.seq(fx.root, &[a, g1, b, tail]);
        let c = fx.component("c", 10, 100);
        let group = fx
            .ops()
            .add_parallel_with_sequence(c, seq, 0, 2, H, Alignment::Leading);
        assert_eq!(fx.model.children(seq), &[group, tail]);
        assert_eq!(fx.model.child_count(group), 2);
        assert_eq!(fx.model.parent(c), Some(group));
        assert_eq!(fx.model.current_space(group).trailing(H), 100);
    }

    #[test]
    fn maintain_size_adds_compensating_gap() {
        let mut fx = Fixture::new();
        let lead = fx.gap(IntervalSizes::fixed(10));
        let outer = fx.seq(fx.root, &[lead]);
        let group = fx.model.create_group(H, GroupKind::Parallel).expect("group");
        fx.model.add_interval(group, outer, None).expect("group");
        let a = fx.component("a", 10, 50);
        let b = fx.component("b", 10, 40);
        fx.model.add_interval(a, group, None).expect("a");
        fx.model.add_interval(b, group, None).expect("b");
        fx.model.set_current_span(group, H, 10, 90);
        let adjusted = fx.ops().maintain_size(group, false, H, None);
        assert_eq!(adjusted, Some(group));
        let children = fx.model.children(outer).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(fx.model.sizes(children[2]), IntervalSizes::fixed(40));
    }

    #[test]
    fn same_size_members_become_resizing() {
        let mut fx = Fixture::new();
        let group = fx.model.create_group(H, GroupKind::Parallel).expect("group");
        let lead = fx.gap(IntervalSizes::fixed(10));
        let outer = fx.seq(fx.root, &[lead]);
        fx.model.add_interval(group, outer, None).expect("group");
        let a = fx.component("a", 10, 150);
        let b = fx.component("b", 10, 150);
        let c = fx.component("c", 10, 60);
        for id in [a, b, c] {
            fx.model.add_interval(id, group, None).expect("child");
        }
        fx.ops().set_parallel_same_size(group, a, H);
        assert!(fx.model.want_resize(a));
        assert!(fx.model.want_resize(b));
        assert!(!fx.model.want_resize(c));
    }

    #[test]
    fn merge_parallel_groups_flattens_compatible_nesting() {
        let mut fx = Fixture::new();
        let outer = fx.model.create_group(H, GroupKind::Parallel).expect("outer");
        let lead = fx.gap(IntervalSizes::fixed(10));
        let seq = fx.seq(fx.root, &[lead]);
        fx.model.add_interval(outer, seq, None).expect("outer");
        let inner = fx.model.create_group(H, GroupKind::Parallel).expect("inner");
        fx.model.add_interval(inner, outer, None).expect("inner");
        let a = fx.component("a", 10, 50);
        let b = fx.component("b", 10, 60);
        let c = fx.component("c", 10, 70);
        fx.model.add_interval(a, inner, None).expect("a");
        fx.model.add_interval(b, inner, None).expect("b");
        fx.model.add_interval(c, outer, None).expect("c");
        fx.ops().merge_parallel_groups(outer);
        assert_eq!(fx.model.children(outer), &[a, b, c]);
    }

    #[test]
    #[should_panic(expected = "layout consistency violation")]
    fn wrong_root_is_fatal() {
        let mut fx = Fixture::new();
        let a = fx.component("a", 0, 10);
        let ops = fx.ops();
        let detached = ops.model().root_of(a);
        ops.check_root(a, IntervalId::new(detached.get() + 1000).expect("id"));
    }
}
