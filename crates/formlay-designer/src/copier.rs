//! Copying parts of a layout for other components.
//!
//! A restricted copy rebuilds an interval subtree for a different set of
//! components. Members without a counterpart are left out. In a sequence
//! the room they took becomes a fixed gap, so the copied members keep their
//! distances. A group left with a single member collapses into it.
//!
//! Duplication copies whole sections of a sequence: the run from the first
//! to the last duplicated member, with the gaps between them, goes in once
//! next to the original run.

use rustc_hash::FxHashMap;

use formlay_core::{
    Alignment, Dimension, Edge, GroupKind, IntervalId, IntervalSizes, LayoutModel, LayoutRegion,
    NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE,
};

use crate::operations::{LayoutOperations, effective_alignment};

/// Source component interval to the interval standing in for it in a copy.
pub type IntervalMap = FxHashMap<IntervalId, IntervalId>;

pub struct LayoutCopier<'a> {
    ops: LayoutOperations<'a>,
}

impl<'a> LayoutCopier<'a> {
    pub fn new(ops: LayoutOperations<'a>) -> Self {
        Self { ops }
    }

    pub fn operations(&mut self) -> &mut LayoutOperations<'a> {
        &mut self.ops
    }

    /// Give `target` the size definition, alignment, padding and
    /// attributes of `source`.
    pub fn clone_interval(&mut self, source: IntervalId, target: IntervalId) {
        let model = self.ops.model();
        let sizes = model.sizes(source);
        let alignment = model.raw_alignment(source);
        let attributes = model.attributes(source);
        let padding = (model.is_gap(source) && model.is_gap(target)).then(|| model.padding(source));
        let group_alignment = (model.is_group(source) && model.is_group(target))
            .then(|| model.group_alignment(source));

        self.ops.set_sizes(target, sizes);
        self.ops.set_alignment(target, alignment);
        if let Some(padding) = padding {
            self.ops.set_padding(target, padding);
        }
        if let Some(group_alignment) = group_alignment {
            self.ops.set_group_alignment(target, group_alignment);
        }
        let result = self.ops.model_mut().set_attributes(target, attributes);
        self.ops.check(result);
    }

    /// Copy `interval` for the components in `map`, keeping only what lies
    /// within `space` on `dim`. Returns `None` when nothing is left.
    ///
    /// Mapped component intervals are used as they are, so they must not
    /// be placed anywhere yet.
    pub fn restricted_copy(
        &mut self,
        interval: IntervalId,
        map: &IntervalMap,
        space: &LayoutRegion,
        dim: Dimension,
    ) -> Option<IntervalId> {
        let model = self.ops.model();
        if model.is_gap(interval) {
            return self.copy_gap(interval, space, dim);
        }
        if model.is_component(interval) {
            let target = *map.get(&interval)?;
            self.clone_interval(interval, target);
            return Some(target);
        }

        let sequential = model.is_sequential(interval);
        let children = model.children(interval).to_vec();
        let group_space = model.current_space(interval);
        let mut copies: Vec<IntervalId> = Vec::with_capacity(children.len());
        // Content dropped since the last copied member, to be bridged.
        let mut dropped = false;
        let mut boundary = 0;
        let mut gap_start = group_space.leading(dim);

        for child in children {
            let is_gap = self.ops.model().is_gap(child);
            let Some(copy) = self.restricted_copy(child, map, space, dim) else {
                dropped |= sequential;
                continue;
            };
            if !is_gap {
                let child_space = self.ops.model().current_space(child);
                if dropped {
                    let from = gap_start.max(space.leading(dim));
                    self.integrate_gap(&mut copies, child_space.leading(dim) - from, boundary, dim);
                    dropped = false;
                }
                gap_start = child_space.trailing(dim);
                boundary = copies.len() + 1;
            }
            copies.push(copy);
        }
        if dropped {
            let from = gap_start.max(space.leading(dim));
            let to = space.trailing(dim).min(group_space.trailing(dim));
            self.integrate_gap(&mut copies, to - from, boundary, dim);
        }

        if copies.iter().all(|copy| self.ops.model().is_gap(*copy)) {
            return None;
        }
        if let &[only] = copies.as_slice() {
            let alignment = self.ops.model().raw_alignment(interval);
            self.ops.set_alignment(only, alignment);
            return Some(only);
        }
        let kind = if sequential {
            GroupKind::Sequential
        } else {
            GroupKind::Parallel
        };
        let group = self.ops.new_group(dim, kind);
        self.clone_interval(interval, group);
        for copy in copies {
            self.ops.add(copy, group, None);
        }
        Some(group)
    }

    /// Copy of a gap, cut down to the part inside `space`.
    fn copy_gap(&mut self, gap: IntervalId, space: &LayoutRegion, dim: Dimension) -> Option<IntervalId> {
        let sizes = self.ops.model().sizes(gap);
        let (lead, trail) = self.gap_bounds(gap, dim);
        let known = space.is_set(dim) && lead != LayoutRegion::UNKNOWN && trail != LayoutRegion::UNKNOWN;
        let (from, to) = (space.leading(dim), space.trailing(dim));
        if known && (lead >= to || trail <= from) {
            return None;
        }
        let copy = if known && (lead < from || trail > to) {
            let open = |size: i32| if size >= 0 { USE_PREFERRED_SIZE } else { size };
            let pref = trail.min(to) - lead.max(from);
            let copy = self.ops.new_gap(dim, IntervalSizes::new(open(sizes.min), pref, open(sizes.max)));
            let attributes = self.ops.model().attributes(gap);
            let result = self.ops.model_mut().set_attributes(copy, attributes);
            self.ops.check(result);
            copy
        } else {
            let copy = self.ops.new_gap(dim, sizes);
            self.clone_interval(gap, copy);
            copy
        };
        Some(copy)
    }

    /// Where a gap currently starts and ends, from its own span or from
    /// its neighbors.
    fn gap_bounds(&self, gap: IntervalId, dim: Dimension) -> (i32, i32) {
        let model = self.ops.model();
        let space = model.current_space(gap);
        if space.is_set(dim) {
            return (space.leading(dim), space.trailing(dim));
        }
        let parent = model.parent(gap).map(|parent| model.current_space(parent));
        let lead = match model.neighbor(gap, Edge::Leading, false) {
            Some(prev) => model.current_space(prev).trailing(dim),
            None => parent.map_or(LayoutRegion::UNKNOWN, |p| p.leading(dim)),
        };
        let trail = match model.neighbor(gap, Edge::Trailing, false) {
            Some(next) => model.current_space(next).leading(dim),
            None => parent.map_or(LayoutRegion::UNKNOWN, |p| p.trailing(dim)),
        };
        (lead, trail)
    }

    /// Replace gaps copied after `boundary` by one fixed gap of `size`.
    fn integrate_gap(&mut self, copies: &mut Vec<IntervalId>, size: i32, boundary: usize, dim: Dimension) {
        while copies.len() > boundary && copies.last().is_some_and(|copy| self.ops.model().is_gap(*copy)) {
            copies.pop();
        }
        if size > 0 {
            copies.push(self.ops.new_gap(dim, IntervalSizes::fixed(size)));
        }
    }

    // -------------------------------------------------------------------
    // Sequential duplication
    // -------------------------------------------------------------------

    /// Duplicate the layout of `sources` along `dim`.
    ///
    /// Sources sharing a sequence are copied as one section spanning all
    /// of them, inserted once on the `direction` side of the original
    /// section. The gap between the two is a copy of the gap on the
    /// section's outer side on that side of it. Copied component intervals
    /// get the source spaces moved past the original section.
    pub fn duplicate_sequentially(
        &mut self,
        sources: &[IntervalId],
        map: &IntervalMap,
        dim: Dimension,
        direction: Edge,
    ) {
        let mut roots = self.duplication_roots(sources);
        while !roots.is_empty() {
            let root = roots.remove(0);
            let (seq, marked) = self.duplication_sequence(root, dim);
            let whole = seq == marked;
            let children = self.ops.model().children(seq).to_vec();
            let gaps: Vec<bool> = children.iter().map(|child| self.ops.model().is_gap(*child)).collect();
            let duplicated: Vec<bool> = children
                .iter()
                .zip(&gaps)
                .map(|(child, gap)| !gap && (whole || *child == marked || take(&mut roots, *child)))
                .collect();
            let space = match self.ops.model().parent(seq) {
                Some(parent) => self.ops.space(parent),
                None => self.ops.space(seq),
            };

            // Later sections first, so earlier indices stay valid.
            for (start, count) in sections(&gaps, &duplicated).into_iter().rev() {
                let section = &children[start..start + count];
                self.duplicate_section(seq, section, &children, start, map, &space, dim, direction);
            }
            self.ops.merge_all_gaps(seq, dim);
            #[cfg(feature = "tracing")]
            log_duplicated(seq, whole);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn duplicate_section(
        &mut self,
        seq: IntervalId,
        section: &[IntervalId],
        children: &[IntervalId],
        start: usize,
        map: &IntervalMap,
        space: &LayoutRegion,
        dim: Dimension,
        direction: Edge,
    ) {
        let copies: Vec<IntervalId> = section
            .iter()
            .filter_map(|sub| self.restricted_copy(*sub, map, space, dim))
            .collect();
        if copies.is_empty() {
            return;
        }
        let end = start + section.len();
        let outer = match direction {
            Edge::Trailing => start.checked_sub(1).map(|index| children[index]),
            Edge::Leading => children.get(end).copied(),
        }
        .filter(|gap| self.ops.model().is_gap(*gap));
        let gap = match outer {
            Some(outer) => {
                let sizes = self.ops.model().sizes(outer);
                let gap = self.ops.new_gap(dim, sizes);
                self.clone_interval(outer, gap);
                gap
            }
            None => self.ops.new_gap(
                dim,
                IntervalSizes::new(USE_PREFERRED_SIZE, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE),
            ),
        };

        let mut at = match direction {
            Edge::Trailing => {
                self.ops.add(gap, seq, Some(end));
                end + 1
            }
            Edge::Leading => start,
        };
        for copy in copies {
            if self.ops.model().is_sequential(copy) {
                for child in self.ops.model().children(copy).to_vec() {
                    self.ops.remove(child);
                    self.ops.add(child, seq, Some(at));
                    at += 1;
                }
            } else {
                self.ops.add(copy, seq, Some(at));
                at += 1;
            }
        }
        if direction == Edge::Leading {
            self.ops.add(gap, seq, Some(at));
        }

        let shift = section_extent(self.ops.model(), section, dim) + self.ops.current_size(gap, dim);
        let offset = match direction {
            Edge::Leading => -shift,
            Edge::Trailing => shift,
        };
        for (&source, &target) in map {
            let inside = section
                .iter()
                .any(|sub| *sub == source || self.ops.model().is_parent_of(*sub, source));
            if !inside {
                continue;
            }
            let mut region = self.ops.space(source);
            if region.is_set(dim) {
                region.translate(dim, offset);
            }
            self.ops.model_mut().set_current_space(target, region);
        }
    }

    /// Topmost intervals whose whole content is duplicated, nested ones
    /// dropped.
    fn duplication_roots(&self, sources: &[IntervalId]) -> Vec<IntervalId> {
        let model = self.ops.model();
        let mut roots: Vec<IntervalId> = Vec::new();
        for &source in sources {
            if roots.iter().any(|root| *root == source || model.is_parent_of(*root, source)) {
                continue;
            }
            let mut current = source;
            loop {
                let Some(parent) = model.parent(current) else {
                    // The whole layout root goes.
                    return vec![current];
                };
                if self.whole_group_duplicated(parent, Some(current), sources) {
                    current = parent;
                    continue;
                }
                if model.is_group(current) {
                    roots.retain(|root| !model.is_parent_of(current, *root));
                }
                roots.push(current);
                break;
            }
        }
        roots
    }

    /// True if duplicating `known` (inside `group`) means duplicating the
    /// whole group: a sequence needs all its members duplicated, a parallel
    /// group one of them. A centered or baseline member drags its parallel
    /// group along.
    fn whole_group_duplicated(
        &self,
        group: IntervalId,
        known: Option<IntervalId>,
        sources: &[IntervalId],
    ) -> bool {
        let model = self.ops.model();
        let parallel = model.is_parallel(group);
        if parallel
            && let Some(known) = known
            && !matches!(effective_alignment(model, known), Alignment::Leading | Alignment::Trailing)
        {
            return true;
        }
        for &sub in model.children(group) {
            if Some(sub) == known || model.is_gap(sub) {
                continue;
            }
            let included = if model.is_group(sub) {
                self.whole_group_duplicated(sub, None, sources)
            } else {
                sources.contains(&sub)
            };
            if included && parallel {
                return true;
            }
            if !included && !parallel {
                return false;
            }
        }
        !parallel
    }

    /// Sequence the copy of `root` goes into, and the interval marking what
    /// in it is duplicated.
    fn duplication_sequence(&mut self, root: IntervalId, dim: Dimension) -> (IntervalId, IntervalId) {
        let model = self.ops.model();
        let parent = model.parent(root);
        let root_sequential = model.is_sequential(root);
        let parent_sequential = parent.is_some_and(|p| model.is_sequential(p));
        match parent {
            Some(_) if root_sequential => (root, root),
            Some(parent) if parent_sequential => (parent, root),
            Some(_) => (self.ops.wrap_in_sequence(root), root),
            None => {
                // Move the whole layout into a group of its own and put a
                // sequence around it under the root.
                let space = self.ops.space(root);
                let alignment = self.ops.model().group_alignment(root);
                let group = self.ops.new_group(dim, GroupKind::Parallel);
                self.ops.set_group_alignment(group, alignment);
                while let Some(child) = self.ops.model().children(root).first().copied() {
                    self.ops.remove(child);
                    self.ops.add(child, group, None);
                }
                let seq = self.ops.new_group(dim, GroupKind::Sequential);
                self.ops.add(group, seq, None);
                self.ops.add(seq, root, None);
                self.ops.model_mut().set_current_space(group, space);
                self.ops.model_mut().set_current_space(seq, space);
                (seq, group)
            }
        }
    }
}

/// Remove `id` from `roots`, reporting whether it was there.
fn take(roots: &mut Vec<IntervalId>, id: IntervalId) -> bool {
    match roots.iter().position(|root| *root == id) {
        Some(index) => {
            roots.remove(index);
            true
        }
        None => false,
    }
}

/// Continuous runs `(start, count)` of a sequence to duplicate.
///
/// A run starts at a duplicated member and ends before the next member
/// that is not; gaps inside a run belong to it, a gap closing it does not.
fn sections(gaps: &[bool], duplicated: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let len = gaps.len();
    for (index, (&gap, &dup)) in gaps.iter().zip(duplicated).enumerate() {
        let last = index + 1 == len;
        if dup && start.is_none() {
            start = Some(index);
        }
        let Some(first) = start else {
            continue;
        };
        if (!dup && !gap) || last {
            let mut count = index - first;
            if last && dup {
                count += 1;
            } else if gaps[index - 1] {
                count -= 1;
            }
            if count > 0 {
                runs.push((first, count));
            }
            start = None;
        }
    }
    runs
}

/// Distance from the first member's leading edge to the last member's
/// trailing edge, or zero when unknown.
fn section_extent(model: &LayoutModel, section: &[IntervalId], dim: Dimension) -> i32 {
    let mut region = LayoutRegion::new();
    for sub in section.iter().filter(|sub| !model.is_gap(**sub)) {
        region.expand(&model.current_space(*sub), Some(dim));
    }
    if region.is_set(dim) { region.size(dim) } else { 0 }
}

#[cfg(feature = "tracing")]
fn log_duplicated(seq: IntervalId, whole: bool) {
    tracing::debug!(message = "copier.duplicate_section", seq = %seq, whole);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(pattern: &str) -> Vec<(usize, usize)> {
        // g = gap, d = duplicated member, k = kept member
        let gaps: Vec<bool> = pattern.chars().map(|c| c == 'g').collect();
        let duplicated: Vec<bool> = pattern.chars().map(|c| c == 'd').collect();
        sections(&gaps, &duplicated)
    }

    #[test]
    fn run_spans_the_gaps_between_duplicated_members() {
        assert_eq!(runs("gdgdg"), vec![(1, 3)]);
    }

    #[test]
    fn kept_member_splits_runs() {
        assert_eq!(runs("gdgkgdg"), vec![(1, 1), (5, 1)]);
    }

    #[test]
    fn run_at_the_end_takes_its_last_member() {
        assert_eq!(runs("gkgd"), vec![(3, 1)]);
        assert_eq!(runs("d"), vec![(0, 1)]);
    }

    #[test]
    fn nothing_duplicated_gives_no_runs() {
        assert!(runs("gkgkg").is_empty());
    }
}
