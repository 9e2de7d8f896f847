//! Position resolution and splicing of one interval into one axis tree.
//!
//! The feeder walks the tree for a target space and collects candidate
//! insertion points ([`IncludeDesc`]), reduces them to a single plan and
//! performs the splice through [`LayoutOperations`]. It never fails to find
//! a place: without any better candidate the interval goes into the root.
//!
//! # Search
//!
//! - Parallel groups are entered when the target overlaps them on both
//!   axes; closed groups (suppressed resizing, center or baseline) need a
//!   deeper overlap, see [`DesignerConfig::closed_group_margin`]. A snap
//!   target inside a group always opens it.
//! - Sequences are scanned in order. Children overlapping the target on
//!   the orthogonal axis fix the insertion index; children that don't turn
//!   the candidate into "parallel with that part of the sequence".
//! - A leaf in a parallel group that overlaps orthogonally offers a new
//!   sequence with that leaf as neighbor.
//!
//! Candidates are ranked by [`IncludeDesc::rank_cmp`]. Sequence candidates
//! compatible with the winner are joined into one sequence around a shared
//! slot, see [`LayoutFeeder::merge_parallel_inclusions`].

use formlay_core::{
    Alignment, Dimension, Edge, GroupKind, IntervalId, IntervalSizes, LayoutModel, LayoutRegion,
    NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
};

use crate::config::DesignerConfig;
use crate::dragger::PositionDef;
use crate::operations::LayoutOperations;
use crate::position::{IncludeDesc, OriginalPosition};

/// Everything needed to place one interval on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRequest {
    /// Detached interval to place.
    pub interval: IntervalId,
    pub dim: Dimension,
    pub root: IntervalId,
    /// Target space of the interval (both axes).
    pub space: LayoutRegion,
    /// Snap on this axis, if any.
    pub position: Option<PositionDef>,
    /// Where the interval was before the edit, if it was placed.
    pub original: Option<OriginalPosition>,
    /// Fall back to `original` when no candidate matches it.
    pub keep_original: bool,
}

impl PlacementRequest {
    #[must_use]
    pub const fn new(interval: IntervalId, dim: Dimension, root: IntervalId, space: LayoutRegion) -> Self {
        Self {
            interval,
            dim,
            root,
            space,
            position: None,
            original: None,
            keep_original: false,
        }
    }

    #[must_use]
    pub const fn with_position(mut self, position: Option<PositionDef>) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub const fn with_original(mut self, original: Option<OriginalPosition>) -> Self {
        self.original = original;
        self
    }

    /// Like [`Self::with_original`], but the original position must survive.
    #[must_use]
    pub const fn keeping_original(mut self, original: OriginalPosition) -> Self {
        self.original = Some(original);
        self.keep_original = true;
        self
    }
}

/// Search parameters derived from a request.
struct Search {
    dim: Dimension,
    ort: Dimension,
    root: IntervalId,
    space: LayoutRegion,
    edge: Option<Edge>,
    alignment: Alignment,
    snapped_parallel: Option<IntervalId>,
    snapped_next_to: Option<IntervalId>,
    padding: Option<PaddingType>,
    ort_margin: i32,
}

/// Outcome of cutting one sequence at an insertion index.
#[derive(Debug, Clone, Copy)]
struct SplitParts {
    lead: Option<IntervalId>,
    trail: Option<IntervalId>,
    lead_resizing: bool,
    trail_resizing: bool,
}

pub struct LayoutFeeder<'a> {
    ops: LayoutOperations<'a>,
    config: DesignerConfig,
}

impl<'a> LayoutFeeder<'a> {
    pub fn new(ops: LayoutOperations<'a>, config: DesignerConfig) -> Self {
        Self { ops, config }
    }

    pub fn operations(&mut self) -> &mut LayoutOperations<'a> {
        &mut self.ops
    }

    #[must_use]
    pub fn into_operations(self) -> LayoutOperations<'a> {
        self.ops
    }

    fn model(&self) -> &LayoutModel {
        self.ops.model()
    }

    fn search(&self, request: &PlacementRequest) -> Search {
        let mut search = Search {
            dim: request.dim,
            ort: request.dim.other(),
            root: request.root,
            space: request.space,
            edge: None,
            alignment: Alignment::Default,
            snapped_parallel: None,
            snapped_next_to: None,
            padding: None,
            ort_margin: match request.dim {
                Dimension::Vertical => -self.config.vertical_overlap_margin,
                Dimension::Horizontal => 0,
            },
        };
        if let Some(position) = request.position.filter(|p| p.snapped) {
            let target = position.interval.unwrap_or(request.root);
            search.alignment = position.alignment;
            search.edge = position.alignment.edge();
            if position.next_to {
                search.snapped_next_to = Some(target);
                search.padding = position.padding;
            } else {
                search.snapped_parallel = Some(target);
            }
        }
        search
    }

    // -------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------

    /// Candidate insertion points for a request, unordered.
    #[must_use]
    pub fn collect_inclusions(&self, request: &PlacementRequest) -> Vec<IncludeDesc> {
        let search = self.search(request);
        let mut inclusions = Vec::new();
        self.analyze_parallel(&search, request.root, 0, &mut inclusions);
        self.add_aligning_inclusion(&search, &mut inclusions);
        #[cfg(feature = "tracing")]
        log_inclusions(request, &inclusions);
        inclusions
    }

    fn new_desc(
        &self,
        search: &Search,
        parent: IntervalId,
        index: usize,
        distance: i32,
        ort_distance: i32,
        depth: usize,
    ) -> IncludeDesc {
        let mut desc = IncludeDesc::new(parent, index);
        desc.alignment = search.alignment;
        desc.snapped_parallel = search.snapped_parallel;
        if distance == -1 {
            desc.snapped_next_to = search.snapped_next_to;
            desc.padding = search.padding;
            desc.fixed_position = true;
        }
        desc.distance = distance;
        desc.ort_distance = ort_distance;
        desc.depth = depth;
        desc
    }

    fn ort_overlaps(&self, search: &Search, id: IntervalId) -> bool {
        LayoutRegion::overlap(
            &search.space,
            &self.model().current_space(id),
            search.ort,
            search.ort_margin,
        )
    }

    fn distance_to(&self, search: &Search, id: IntervalId) -> i32 {
        let space = self.model().current_space(id);
        if LayoutRegion::overlap(&search.space, &space, search.dim, 0) {
            0
        } else {
            match LayoutRegion::min_distance(&search.space, &space, search.dim) {
                LayoutRegion::UNKNOWN => i32::MAX,
                distance => distance,
            }
        }
    }

    /// Side of `id` the target lies on, judged by centers.
    fn add_direction(&self, search: &Search, id: IntervalId) -> Edge {
        let space = self.model().current_space(id);
        let target = search.space.position(search.dim, Alignment::Center);
        let center = space.position(search.dim, Alignment::Center);
        if target < center {
            Edge::Leading
        } else {
            Edge::Trailing
        }
    }

    fn next_to_relevant(&self, search: &Search, id: IntervalId) -> bool {
        search
            .snapped_next_to
            .is_some_and(|next_to| next_to == id || self.model().is_parent_of(id, next_to))
    }

    /// True if the search should descend into `group`.
    ///
    /// A snap target inside the group always pulls the search in. Closed
    /// groups (suppressed resizing, center or baseline) need a deep overlap.
    /// Open groups are entered on any overlap, unless the target sticks out
    /// past the open edge into a sibling that already sits there.
    fn should_enter_group(&self, search: &Search, group: IntervalId) -> bool {
        let model = self.model();
        if let Some(target) = search.snapped_parallel.or(search.snapped_next_to)
            && target != search.root
            && (target == group || model.is_parent_of(group, target))
        {
            return true;
        }
        if model.group_alignment(group) == Alignment::Baseline && search.snapped_parallel.is_none() {
            return false;
        }
        let closed = !model.can_resize(group)
            || matches!(
                model.group_alignment(group),
                Alignment::Center | Alignment::Baseline
            );
        let margin = if closed {
            -self.config.closed_group_margin
        } else {
            0
        };
        let space = model.current_space(group);
        if !LayoutRegion::overlap(&search.space, &space, search.dim, margin)
            || !LayoutRegion::overlap(&search.space, &space, search.ort, 0)
        {
            return false;
        }
        closed || self.open_edge_unclaimed(search, group)
    }

    /// False if the target sticks out past the open edge of `group` and the
    /// sibling on that side overlaps it too.
    fn open_edge_unclaimed(&self, search: &Search, group: IntervalId) -> bool {
        let model = self.model();
        let open = match model.group_alignment(group) {
            Alignment::Leading => Edge::Trailing,
            Alignment::Trailing => Edge::Leading,
            _ => return true,
        };
        let space = model.current_space(group);
        let sticks_out = match open {
            Edge::Leading => search.space.leading(search.dim) < space.leading(search.dim),
            Edge::Trailing => search.space.trailing(search.dim) > space.trailing(search.dim),
        };
        !sticks_out
            || model.neighbor(group, open, true).is_none_or(|neighbor| {
                !LayoutRegion::overlap(&search.space, &model.current_space(neighbor), search.dim, 0)
            })
    }

    fn analyze_parallel(
        &self,
        search: &Search,
        group: IntervalId,
        depth: usize,
        out: &mut Vec<IncludeDesc>,
    ) {
        let model = self.model();
        for &sub in model.children(group) {
            if model.is_gap(sub) {
                continue;
            }
            if model.is_parallel(sub) && self.should_enter_group(search, sub) {
                self.analyze_parallel(search, sub, depth + 1, out);
                continue;
            }
            if model.is_sequential(sub) {
                self.analyze_sequential(search, sub, depth + 1, out);
                continue;
            }
            if !self.ort_overlaps(search, sub) {
                continue;
            }
            let distance = if self.next_to_relevant(search, sub) {
                -1
            } else {
                self.distance_to(search, sub)
            };
            let mut desc = self.new_desc(search, group, 0, distance, 0, depth + 1);
            desc.new_sub_group = true;
            desc.neighbor = Some(sub);
            desc.index = match self.add_direction(search, sub) {
                Edge::Leading => 0,
                Edge::Trailing => 1,
            };
            out.push(desc);
        }

        if out.is_empty() && model.parent(group).is_none() {
            let distance = if search.snapped_next_to == Some(group) {
                -1
            } else {
                i32::MAX
            };
            let desc = self.new_desc(search, group, model.child_count(group), distance, i32::MAX, depth);
            out.push(desc);
        }
    }

    fn analyze_sequential(
        &self,
        search: &Search,
        seq: IntervalId,
        depth: usize,
        out: &mut Vec<IncludeDesc>,
    ) {
        let model = self.model();
        let children = model.children(seq);
        let mut start = None;
        let mut end = None;
        let mut in_sequence = false;
        let mut parallel_with = false;
        let mut distance = i32::MAX;

        for (index, &sub) in children.iter().enumerate() {
            if model.is_gap(sub) {
                continue;
            }
            if model.is_parallel(sub) && self.should_enter_group(search, sub) {
                let before = out.len();
                self.analyze_parallel(search, sub, depth + 1, out);
                if out.len() > before {
                    return;
                }
            }
            if !self.ort_overlaps(search, sub) {
                parallel_with = true;
                continue;
            }
            distance = distance.min(self.distance_to(search, sub));
            in_sequence = true;
            if self.add_direction(search, sub) == Edge::Leading {
                end = Some(index);
                break;
            }
            parallel_with = false;
            start = Some(index + 1);
        }
        if !in_sequence {
            return;
        }

        let start = start.unwrap_or(0);
        let end = end.unwrap_or(children.len());
        if search
            .snapped_next_to
            .is_some_and(|next_to| next_to == search.root || model.is_parent_of(seq, next_to))
        {
            distance = -1;
        }
        let mut desc = self.new_desc(search, seq, end, distance, 0, depth);
        if search.edge == Some(Edge::Leading) {
            desc.index = start;
        }
        if parallel_with && start < end && children[start..end].iter().any(|c| !model.is_gap(*c)) {
            desc.index = start;
            desc.parallel_end = Some(end - 1);
        }
        out.push(desc);
    }

    /// Force a candidate aligned with the parallel snap target when no
    /// candidate can host that alignment. Returns true if one was added.
    fn add_aligning_inclusion(&self, search: &Search, out: &mut Vec<IncludeDesc>) -> bool {
        let Some(with) = search.snapped_parallel else {
            return false;
        };
        let model = self.model();
        let compatible = out
            .iter()
            .any(|desc| desc.parent == with || model.is_parent_of(desc.parent, with));
        if compatible {
            return false;
        }
        let parent = if model.is_parallel(with) {
            with
        } else {
            model.first_parent(with, GroupKind::Parallel).unwrap_or(search.root)
        };
        let mut desc = self.new_desc(search, parent, model.child_count(parent), 0, 0, model.depth(parent));
        desc.fixed_position = true;
        out.push(desc);
        true
    }

    // -------------------------------------------------------------------
    // Merging
    // -------------------------------------------------------------------

    /// Pick the candidate to build on, keeping the original position when it
    /// ranks as well as the best.
    ///
    /// With `preserve_original`, a set of candidates none of which matches
    /// the original yields the original descriptor verbatim, reported by the
    /// returned flag.
    #[must_use]
    pub fn choose_representative(
        &self,
        inclusions: &mut [IncludeDesc],
        original: Option<&OriginalPosition>,
        preserve_original: bool,
    ) -> Option<(IncludeDesc, bool)> {
        let model = self.model();
        inclusions.sort_by(IncludeDesc::rank_cmp);
        let best = inclusions.first().copied();
        if let Some(original) = original {
            let matching = inclusions
                .iter()
                .take_while(|desc| best.is_some_and(|best| desc.ranks_equal(&best)))
                .find(|desc| original.matches(model, desc));
            if let Some(desc) = matching {
                return Some((*desc, false));
            }
            if preserve_original && let Some(desc) = original.to_include_desc(model) {
                return Some((desc, true));
            }
        }
        best.map(|best| (best, false))
    }

    /// Reduce candidates to one plan.
    ///
    /// Sequence candidates compatible with the chosen one are joined with
    /// it: every such sequence is cut at its candidate index and the parts
    /// go into one new sequence of the common parallel group, leading parts
    /// before the slot and trailing parts after it. The returned plan points
    /// at that slot, so an interval overlapping several rows lands after
    /// (or before) all of them at once.
    pub fn merge_parallel_inclusions(
        &mut self,
        mut inclusions: Vec<IncludeDesc>,
        original: Option<&OriginalPosition>,
        preserve_original: bool,
    ) -> Option<IncludeDesc> {
        let (best, verbatim) =
            self.choose_representative(&mut inclusions, original, preserve_original)?;
        if verbatim || !self.is_plain_sequence_inclusion(&best) {
            return Some(best);
        }
        let joined = self.compatible_inclusions(&best, &inclusions);
        if joined.is_empty() {
            return Some(best);
        }
        #[cfg(feature = "tracing")]
        log_joined(&best, joined.len());
        Some(self.join_sequences(best, &joined))
    }

    /// A candidate that only names an index in a sequence of a parallel
    /// group.
    fn is_plain_sequence_inclusion(&self, desc: &IncludeDesc) -> bool {
        let model = self.model();
        model.is_sequential(desc.parent)
            && !desc.new_sub_group
            && !desc.fill
            && desc.parallel_end.is_none()
            && !desc.is_snapped()
            && model.parent(desc.parent).is_some_and(|p| model.is_parallel(p))
    }

    /// Parallel groups above `seq`, nearest first, up to the first
    /// non-parallel ancestor.
    fn parallel_chain(&self, seq: IntervalId) -> Vec<IntervalId> {
        let model = self.model();
        let mut chain = Vec::new();
        let mut current = model.parent(seq);
        while let Some(group) = current.filter(|g| model.is_parallel(*g)) {
            chain.push(group);
            current = model.parent(group);
        }
        chain
    }

    /// Candidates in other sequences that can share the slot of `best`.
    ///
    /// A sequence qualifies when it sits in the same parallel group as the
    /// sequence of `best`, or in a shallower one reached through parallel
    /// groups only and its components fit into the deeper group.
    fn compatible_inclusions(&self, best: &IncludeDesc, inclusions: &[IncludeDesc]) -> Vec<IncludeDesc> {
        let model = self.model();
        let chain = self.parallel_chain(best.parent);
        let Some(&common) = chain.first() else {
            return Vec::new();
        };
        let Some(dim) = model.dimension(best.parent) else {
            return Vec::new();
        };
        let mut seen = vec![best.parent];
        let mut out = Vec::new();
        for desc in inclusions {
            if seen.contains(&desc.parent) || !self.is_plain_sequence_inclusion(desc) {
                continue;
            }
            let Some(parent) = model.parent(desc.parent) else {
                continue;
            };
            let compatible = parent == common
                || (chain.contains(&parent) && self.fits_into(desc.parent, common, dim));
            if compatible {
                seen.push(desc.parent);
                out.push(*desc);
            }
        }
        out
    }

    /// Extent of the non-gap children of `seq`, if all of them are known.
    fn content_span(&self, seq: IntervalId, dim: Dimension) -> Option<(i32, i32)> {
        let model = self.model();
        let mut span: Option<(i32, i32)> = None;
        for &child in model.children(seq) {
            if model.is_gap(child) {
                continue;
            }
            let space = model.current_space(child);
            if !space.is_set(dim) {
                return None;
            }
            span = Some(match span {
                Some((lo, hi)) => (lo.min(space.leading(dim)), hi.max(space.trailing(dim))),
                None => (space.leading(dim), space.trailing(dim)),
            });
        }
        span
    }

    fn fits_into(&self, seq: IntervalId, group: IntervalId, dim: Dimension) -> bool {
        let space = self.model().current_space(group);
        space.is_set(dim)
            && self
                .content_span(seq, dim)
                .is_some_and(|(lo, hi)| lo >= space.leading(dim) && hi <= space.trailing(dim))
    }

    /// Move a sequence into `group`, resizing its fixed ending gaps to the
    /// group's edges.
    fn relocate_sequence(&mut self, seq: IntervalId, group: IntervalId, dim: Dimension) {
        let Some(old) = self.model().parent(seq) else {
            return;
        };
        let group_space = self.model().current_space(group);
        let content = self.content_span(seq, dim);
        self.ops.remove(seq);
        self.ops.add(seq, group, None);
        if let Some((lo, hi)) = content {
            for (edge, size, span) in [
                (Edge::Leading, lo - group_space.leading(dim), (group_space.leading(dim), lo)),
                (Edge::Trailing, group_space.trailing(dim) - hi, (hi, group_space.trailing(dim))),
            ] {
                let ending = match edge {
                    Edge::Leading => self.model().children(seq).first().copied(),
                    Edge::Trailing => self.model().children(seq).last().copied(),
                };
                let Some(gap) = ending.filter(|g| self.model().is_gap(*g)) else {
                    continue;
                };
                if !self.model().can_resize(gap) {
                    self.ops.resize_interval(gap, size.max(0));
                }
                self.ops.set_span(gap, dim, span.0, span.0.max(span.1));
            }
            self.ops.update_group_space(seq);
        }
        if self.model().parent(old).is_some() && self.model().child_count(old) == 1 {
            self.ops.dissolve_redundant_group(old);
        }
    }

    /// Cut `seq` before `index`. The sequence keeps the leading part and a
    /// new sequence gets the trailing one; gaps next to the cut are dropped.
    ///
    /// Returns the parts that still hold content, plus whether a resizing
    /// gap was dropped on either side.
    fn split_sequence(&mut self, seq: IntervalId, index: usize, dim: Dimension) -> SplitParts {
        let count = self.model().child_count(seq);
        let index = index.min(count);
        let trail = self.ops.new_group(dim, GroupKind::Sequential);
        while self.model().child_count(seq) > index {
            let child = self.model().children(seq)[index];
            self.ops.remove(child);
            self.ops.add(child, trail, None);
        }
        let lead_resizing = self.drop_ending_gaps(seq, Edge::Trailing);
        let trail_resizing = self.drop_ending_gaps(trail, Edge::Leading);
        let mut keep = |part: IntervalId| {
            let filled = self.model().child_count(part) > 0;
            if filled {
                self.ops.update_group_space(part);
            }
            filled.then_some(part)
        };
        SplitParts {
            lead: keep(seq),
            trail: keep(trail),
            lead_resizing,
            trail_resizing,
        }
    }

    /// Drop gaps from one end of a sequence. Returns true if a dropped gap
    /// was resizing.
    fn drop_ending_gaps(&mut self, seq: IntervalId, edge: Edge) -> bool {
        let mut resizing = false;
        loop {
            let ending = match edge {
                Edge::Leading => self.model().children(seq).first().copied(),
                Edge::Trailing => self.model().children(seq).last().copied(),
            };
            let Some(gap) = ending.filter(|g| self.model().is_gap(*g)) else {
                break;
            };
            resizing |= self.model().can_resize(gap);
            self.ops.remove(gap);
        }
        resizing
    }

    /// Replace the sequences of `best` and `others` with one sequence built
    /// around a slot for the new interval.
    fn join_sequences(&mut self, best: IncludeDesc, others: &[IncludeDesc]) -> IncludeDesc {
        let (Some(dim), Some(common)) = (
            self.model().dimension(best.parent),
            self.model().parent(best.parent),
        ) else {
            return best;
        };
        for desc in others {
            if self.model().parent(desc.parent) != Some(common) {
                self.relocate_sequence(desc.parent, common, dim);
            }
        }
        let Some(common) = self.model().parent(best.parent) else {
            return best;
        };

        let at = self.model().index_in_parent(best.parent).unwrap_or(0);
        let alignment = self.model().raw_alignment(best.parent);
        let joined = self.ops.new_group(dim, GroupKind::Sequential);
        self.ops.add(joined, common, Some(at));
        self.ops.set_alignment(joined, alignment);
        let common_space = self.model().current_space(common);
        if common_space.is_set(dim) {
            self.ops
                .set_span(joined, dim, common_space.leading(dim), common_space.trailing(dim));
        }

        let mut leads = Vec::new();
        let mut trails = Vec::new();
        let (mut lead_resizing, mut trail_resizing) = (false, false);
        for (seq, index) in std::iter::once((best.parent, best.index))
            .chain(others.iter().map(|desc| (desc.parent, desc.index)))
        {
            let raw = self.model().raw_alignment(seq);
            self.ops.remove(seq);
            let parts = self.split_sequence(seq, index, dim);
            lead_resizing |= parts.lead_resizing;
            trail_resizing |= parts.trail_resizing;
            leads.extend(parts.lead.map(|part| (part, raw)));
            trails.extend(parts.trail.map(|part| (part, raw)));
        }

        self.add_side(joined, &leads, Edge::Leading, dim);
        if lead_resizing && !leads.iter().any(|(part, _)| self.model().want_resize(*part)) {
            self.add_resizing_placeholder(joined, dim);
        }
        let slot = self.model().child_count(joined);
        if trail_resizing && !trails.iter().any(|(part, _)| self.model().want_resize(*part)) {
            self.add_resizing_placeholder(joined, dim);
        }
        self.add_side(joined, &trails, Edge::Trailing, dim);

        let mut desc = best;
        desc.parent = joined;
        desc.index = slot;
        desc.depth = self.model().depth(joined);
        desc
    }

    /// Resizing gap next to the slot; the splice replaces it and hands its
    /// resizing over to the gap it creates on that side.
    fn add_resizing_placeholder(&mut self, seq: IntervalId, dim: Dimension) {
        let gap = self.ops.new_gap(dim, IntervalSizes::resizing(0));
        self.ops.add(gap, seq, None);
    }

    /// Append the parts of one side of the slot. A single part is inlined,
    /// several are stacked in a parallel group.
    fn add_side(&mut self, seq: IntervalId, parts: &[(IntervalId, Alignment)], side: Edge, dim: Dimension) {
        match parts {
            [] => {}
            [(part, _)] => {
                self.ops.add_content(*part, seq, None);
            }
            _ => {
                let group = self.ops.new_group(dim, GroupKind::Parallel);
                let start = parts
                    .iter()
                    .map(|(part, _)| self.model().current_space(*part))
                    .filter(|space| space.is_set(dim))
                    .map(|space| space.leading(dim))
                    .min();
                for &(part, raw) in parts {
                    // Trailing parts start at different positions; an indent
                    // keeps each where it was.
                    let space = self.model().current_space(part);
                    if side == Edge::Trailing
                        && let Some(start) = start
                        && space.is_set(dim)
                        && space.leading(dim) > start
                    {
                        let indent = self
                            .ops
                            .new_gap(dim, IntervalSizes::fixed(space.leading(dim) - start));
                        self.ops.set_span(indent, dim, start, space.leading(dim));
                        self.ops.add(indent, part, Some(0));
                        self.ops.update_group_space(part);
                    }
                    self.ops.add(part, group, None);
                    self.ops.set_alignment(part, raw);
                }
                self.ops.update_group_space(group);
                self.ops.add(group, seq, None);
                if self.ops.optimize_gaps(group, dim) {
                    for &(part, _) in parts {
                        self.ops.update_group_space(part);
                    }
                    self.ops.update_group_space(group);
                }
            }
        }
    }

    /// Combine the descriptors of the two edges of one interval.
    ///
    /// When both edges refer to intervals in different branches of a common
    /// sequence, the result spans that range of the sequence and fills it.
    /// A common parallel group is filled directly. Otherwise `first` wins.
    #[must_use]
    pub fn merge_sequential_inclusions(&self, first: &IncludeDesc, second: &IncludeDesc) -> IncludeDesc {
        let model = self.model();
        let (Some(a), Some(b)) = (
            first.snapped_parallel.or(first.neighbor),
            second.snapped_parallel.or(second.neighbor),
        ) else {
            return *first;
        };
        let Some(common) = model.common_parent(a, b) else {
            return *first;
        };
        if common == a || common == b {
            return *first;
        }
        let branch = |id: IntervalId| {
            let mut current = id;
            while let Some(parent) = model.parent(current) {
                if parent == common {
                    return model.index_in_parent(current);
                }
                current = parent;
            }
            None
        };
        let mut desc = if model.is_sequential(common) {
            let (Some(ia), Some(ib)) = (branch(a), branch(b)) else {
                return *first;
            };
            let mut desc = IncludeDesc::new(common, ia.min(ib));
            desc.parallel_end = Some(ia.max(ib));
            desc
        } else {
            IncludeDesc::new(common, model.child_count(common))
        };
        desc.fill = true;
        desc.fixed_position = true;
        desc.ort_distance = 0;
        desc.depth = model.depth(common);
        desc
    }

    /// Candidate aligned with a component whose `edge` sits exactly at `pos`.
    #[must_use]
    pub fn find_edge_inclusion(
        &self,
        root: IntervalId,
        dim: Dimension,
        edge: Edge,
        pos: i32,
        exclude: IntervalId,
    ) -> Option<IncludeDesc> {
        let model = self.model();
        let with = model.components_in(root).into_iter().find(|comp| {
            *comp != exclude && {
                let space = model.current_space(*comp);
                space.is_set(dim) && space.edge(dim, edge) == pos
            }
        })?;
        let parent = model.parent(with)?;
        let mut desc = IncludeDesc::new(parent, model.index_in_parent(with).unwrap_or(0));
        desc.snapped_parallel = Some(with);
        desc.alignment = edge.alignment();
        desc.fixed_position = true;
        desc.ort_distance = 0;
        desc.depth = model.depth(with);
        Some(desc)
    }

    // -------------------------------------------------------------------
    // Splicing
    // -------------------------------------------------------------------

    /// Resolve and splice in one step. Returns the plan that was used.
    pub fn add_interval(&mut self, request: &PlacementRequest) -> IncludeDesc {
        let inclusions = self.collect_inclusions(request);
        let desc = self
            .merge_parallel_inclusions(inclusions, request.original.as_ref(), request.keep_original)
            .unwrap_or_else(|| {
                IncludeDesc::new(request.root, self.model().child_count(request.root))
            });
        self.add_to_group(request, &desc);
        self.ops.check_root(request.interval, request.root);
        desc
    }

    /// Splice the interval according to `desc`, then normalize upward.
    pub fn add_to_group(&mut self, request: &PlacementRequest, desc: &IncludeDesc) {
        let interval = request.interval;
        let dim = request.dim;
        self.ops
            .model_mut()
            .set_current_space(interval, request.space);
        #[cfg(feature = "tracing")]
        log_add(request, desc);

        let parent_is_parallel = self.model().is_parallel(desc.parent);
        match (desc.snapped_parallel, desc.parallel_end) {
            (Some(with), None)
                if !desc.new_sub_group && (with != request.root || parent_is_parallel) =>
            {
                self.align_in_parallel(interval, with, desc.alignment, &request.space, dim, request.root);
            }
            (_, Some(end)) if self.model().is_sequential(desc.parent) => {
                let group = self
                    .ops
                    .extract_parallel_sequence(desc.parent, desc.index, end, dim);
                if desc.fill {
                    self.ops.add(interval, group, None);
                    self.ops.set_interval_resizing(interval, true);
                } else {
                    self.add_to_parallel(interval, group, desc, &request.space, dim);
                }
                self.ops.update_group_space(group);
            }
            _ if desc.new_sub_group => {
                self.add_in_new_sequence(interval, desc, &request.space, dim);
            }
            _ if self.model().is_sequential(desc.parent) => {
                self.add_to_sequence(interval, desc.parent, desc, &request.space, dim);
            }
            _ => {
                if desc.fill {
                    self.ops.add(interval, desc.parent, None);
                    self.ops.set_interval_resizing(interval, true);
                } else {
                    self.add_to_parallel(interval, desc.parent, desc, &request.space, dim);
                }
            }
        }
        self.normalize_upward(interval, dim);
    }

    /// Gap sizes for a span; `snapped` spans become padding gaps.
    fn gap_sizes(size: i32, padding: Option<PaddingType>, snapped: bool) -> (IntervalSizes, Option<PaddingType>) {
        if snapped && padding.is_some() {
            (
                IntervalSizes::new(USE_PREFERRED_SIZE, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE),
                padding,
            )
        } else {
            (IntervalSizes::fixed(size.max(0)), None)
        }
    }

    fn make_gap(&mut self, dim: Dimension, size: i32, padding: Option<PaddingType>, snapped: bool, span: (i32, i32)) -> IntervalId {
        let (sizes, padding) = Self::gap_sizes(size, padding, snapped);
        let gap = self.ops.new_gap(dim, sizes);
        if padding.is_some() {
            self.ops.set_padding(gap, padding);
        }
        if span.0 != LayoutRegion::UNKNOWN && span.1 != LayoutRegion::UNKNOWN {
            self.ops.set_span(gap, dim, span.0, span.0.max(span.1));
        }
        gap
    }

    /// Insert between the neighbors around `desc.index`, replacing the gaps
    /// there with new leading and trailing gaps.
    fn add_to_sequence(
        &mut self,
        interval: IntervalId,
        seq: IntervalId,
        desc: &IncludeDesc,
        space: &LayoutRegion,
        dim: Dimension,
    ) {
        let model = self.model();
        let children = model.children(seq).to_vec();
        let index = desc.index.min(children.len());
        let leading = children[..index]
            .iter()
            .rposition(|c| !model.is_gap(*c));
        let trailing = children[index..]
            .iter()
            .position(|c| !model.is_gap(*c))
            .map(|offset| index + offset);
        let lo = leading.map_or(0, |i| i + 1);
        let hi = trailing.unwrap_or(children.len());
        let seq_space = model.current_space(seq);
        let from = match leading {
            Some(i) => model.current_space(children[i]).trailing(dim),
            None => seq_space.leading(dim),
        };
        let to = match trailing {
            Some(i) => model.current_space(children[i]).leading(dim),
            None => seq_space.trailing(dim),
        };
        let removed_any = hi > lo;
        let resizing_before = children[lo..index].iter().any(|c| model.can_resize(*c));
        let resizing_after = children[index..hi].iter().any(|c| model.can_resize(*c));
        let space = &Self::fit_span(*space, dim, from, to);
        self.ops.model_mut().set_current_space(interval, *space);

        for gap in children[lo..hi].iter().rev() {
            self.ops.remove(*gap);
        }

        let known = |pos: i32| pos != LayoutRegion::UNKNOWN;
        let lead_size = if known(from) { space.leading(dim) - from } else { 0 };
        let trail_size = if known(to) { to - space.trailing(dim) } else { 0 };
        let snap_edge = desc.snapped_next_to.and(desc.alignment.edge());
        let make_lead = leading.is_some() || lead_size > 0;
        let make_trail = trailing.is_some() || removed_any;

        let mut at = lo;
        let mut lead_gap = None;
        if make_lead {
            let gap = self.make_gap(
                dim,
                lead_size,
                desc.padding,
                snap_edge == Some(Edge::Leading),
                (from, space.leading(dim)),
            );
            self.ops.add(gap, seq, Some(at));
            at += 1;
            lead_gap = Some(gap);
        }
        self.ops.add(interval, seq, Some(at));
        at += 1;
        let mut trail_gap = None;
        if make_trail {
            let gap = self.make_gap(
                dim,
                trail_size,
                desc.padding,
                snap_edge == Some(Edge::Trailing),
                (space.trailing(dim), to),
            );
            self.ops.add(gap, seq, Some(at));
            trail_gap = Some(gap);
        }
        let resizing_gap = if resizing_before && !resizing_after && trailing.is_some() {
            lead_gap.or(trail_gap)
        } else if resizing_before || resizing_after {
            trail_gap.or(lead_gap)
        } else {
            None
        };
        if let Some(gap) = resizing_gap {
            self.ops.set_interval_resizing(gap, true);
        }
    }

    /// Shift `space` on `dim` so it starts no earlier than `from` and, room
    /// permitting, ends no later than `to`. Unknown bounds are ignored.
    fn fit_span(space: LayoutRegion, dim: Dimension, from: i32, to: i32) -> LayoutRegion {
        if !space.is_set(dim) {
            return space;
        }
        let known = |pos: i32| pos != LayoutRegion::UNKNOWN;
        let (start, end) = (space.leading(dim), space.trailing(dim));
        let shift = if known(from) && start < from {
            from - start
        } else if known(to) && end > to {
            let back = end - to;
            let room = if known(from) { back.min(start - from) } else { back };
            -room
        } else {
            0
        };
        let mut fitted = space;
        if shift != 0 {
            fitted.translate(dim, shift);
        }
        fitted
    }

    /// Put the interval in a parallel group, positioned by an edge gap.
    ///
    /// At the root the interval gets a sequence of its own with a fixed gap
    /// on the anchored side and a resizing gap toward the other edge.
    fn add_to_parallel(
        &mut self,
        interval: IntervalId,
        group: IntervalId,
        desc: &IncludeDesc,
        space: &LayoutRegion,
        dim: Dimension,
    ) {
        let group_space = self.model().current_space(group);
        let known = group_space.is_set(dim) && space.is_set(dim);
        let space = &if known {
            Self::fit_span(*space, dim, group_space.leading(dim), group_space.trailing(dim))
        } else {
            *space
        };
        self.ops.model_mut().set_current_space(interval, *space);
        let lead_size = if known {
            (space.leading(dim) - group_space.leading(dim)).max(0)
        } else {
            0
        };
        let trail_size = if known {
            (group_space.trailing(dim) - space.trailing(dim)).max(0)
        } else {
            0
        };
        let trailing_anchor = desc.alignment == Alignment::Trailing;
        let snapped_border = desc.snapped_next_to == Some(group);

        if self.model().parent(group).is_none() {
            let gaps: Vec<IntervalId> = self
                .model()
                .children(group)
                .iter()
                .copied()
                .filter(|c| self.model().is_gap(*c))
                .collect();
            for gap in gaps {
                self.ops.remove(gap);
            }
            let seq = self.ops.new_group(dim, GroupKind::Sequential);
            let (fixed_span, spring_span) = if trailing_anchor {
                ((space.trailing(dim), group_space.trailing(dim)), (group_space.leading(dim), space.leading(dim)))
            } else {
                ((group_space.leading(dim), space.leading(dim)), (space.trailing(dim), group_space.trailing(dim)))
            };
            let fixed_size = if trailing_anchor { trail_size } else { lead_size };
            let spring_size = if trailing_anchor { lead_size } else { trail_size };
            let fixed = self.make_gap(dim, fixed_size, desc.padding, snapped_border, fixed_span);
            let spring = self.ops.new_gap(dim, IntervalSizes::resizing(spring_size));
            self.ops.set_span(spring, dim, spring_span.0, spring_span.0.max(spring_span.1));
            let items = if trailing_anchor {
                [spring, interval, fixed]
            } else {
                [fixed, interval, spring]
            };
            for item in items {
                self.ops.add(item, seq, None);
            }
            if trailing_anchor {
                self.ops.set_alignment(seq, Alignment::Trailing);
            }
            self.ops.add(seq, group, None);
            if known {
                self.ops
                    .set_span(seq, dim, group_space.leading(dim), group_space.trailing(dim));
            }
            return;
        }

        let (offset, edge) = if trailing_anchor {
            (trail_size, Edge::Trailing)
        } else {
            (lead_size, Edge::Leading)
        };
        let item = if offset > 0 {
            let seq = self.ops.new_group(dim, GroupKind::Sequential);
            let gap = self.ops.new_gap(dim, IntervalSizes::fixed(offset));
            let items = match edge {
                Edge::Leading => [gap, interval],
                Edge::Trailing => [interval, gap],
            };
            for item in items {
                self.ops.add(item, seq, None);
            }
            self.ops.update_group_space(seq);
            seq
        } else {
            interval
        };
        self.ops.add(item, group, None);
        let alignment = edge.alignment();
        let raw = if self.model().group_alignment(group) == alignment {
            Alignment::Default
        } else {
            alignment
        };
        self.ops.set_alignment(item, raw);
    }

    /// Wrap the neighbor in a new sequence and add the interval beside it.
    fn add_in_new_sequence(
        &mut self,
        interval: IntervalId,
        desc: &IncludeDesc,
        space: &LayoutRegion,
        dim: Dimension,
    ) {
        let Some(neighbor) = desc.neighbor.filter(|n| self.model().parent(*n).is_some()) else {
            self.add_to_parallel(interval, desc.parent, desc, space, dim);
            return;
        };
        let seq = self.ops.wrap_in_sequence(neighbor);
        let neighbor_space = self.model().current_space(neighbor);
        let after = desc.index > 0;
        let (from, to) = if after {
            (neighbor_space.trailing(dim), space.leading(dim))
        } else {
            (space.trailing(dim), neighbor_space.leading(dim))
        };
        let size = if from == LayoutRegion::UNKNOWN || to == LayoutRegion::UNKNOWN {
            0
        } else {
            to - from
        };
        let snapped = desc.snapped_next_to == Some(neighbor);
        let gap = self.make_gap(dim, size, desc.padding, snapped, (from, to));
        if after {
            self.ops.add(gap, seq, None);
            self.ops.add(interval, seq, None);
        } else {
            self.ops.add(interval, seq, Some(0));
            self.ops.add(gap, seq, Some(1));
        }
        self.ops.update_group_space(seq);
    }

    /// Put `interval` in parallel with `with`, aligned at `alignment`.
    ///
    /// An existing parallel group already aligning `with` that way is
    /// reused; otherwise `with` (plus any later siblings the interval
    /// reaches over) is wrapped in a new group. A non-zero offset between
    /// the edges becomes an indent gap in front of the interval.
    pub fn align_in_parallel(
        &mut self,
        interval: IntervalId,
        with: IntervalId,
        alignment: Alignment,
        space: &LayoutRegion,
        dim: Dimension,
        root: IntervalId,
    ) {
        let model = self.model();
        if with == root || model.parent(with).is_none() || model.root_of(with) != root {
            let mut desc = IncludeDesc::new(root, model.child_count(root));
            desc.alignment = alignment;
            self.add_to_parallel(interval, root, &desc, space, dim);
            return;
        }
        let with_space = model.current_space(with);
        let edge = alignment.edge();
        let offset = match edge {
            Some(Edge::Leading) if space.is_set(dim) && with_space.is_set(dim) => {
                space.leading(dim) - with_space.leading(dim)
            }
            Some(Edge::Trailing) if space.is_set(dim) && with_space.is_set(dim) => {
                with_space.trailing(dim) - space.trailing(dim)
            }
            _ => 0,
        };

        let group = if model.is_parallel(with) && model.group_alignment(with) == alignment {
            with
        } else if let Some(parent) = model.parent(with).filter(|p| {
            model.is_parallel(*p) && model.parent(*p).is_some() && model.alignment(with) == alignment
        }) {
            parent
        } else {
            self.wrap_for_alignment(with, alignment, space, dim)
        };

        let item = if offset > 0 && edge.is_some() {
            let seq = self.ops.new_group(dim, GroupKind::Sequential);
            let gap = self.ops.new_gap(dim, IntervalSizes::fixed(offset));
            match edge {
                Some(Edge::Trailing) => {
                    self.ops.add(interval, seq, None);
                    self.ops.add(gap, seq, None);
                }
                _ => {
                    self.ops.add(gap, seq, None);
                    self.ops.add(interval, seq, None);
                }
            }
            self.ops.update_group_space(seq);
            seq
        } else {
            interval
        };
        self.ops.add(item, group, None);
        let raw = if self.model().group_alignment(group) == alignment {
            Alignment::Default
        } else {
            alignment
        };
        self.ops.set_alignment(item, raw);
        self.ops.update_group_space(group);
        #[cfg(feature = "tracing")]
        log_aligned(interval, with, alignment, offset);
    }

    /// New parallel group around `with` for aligning. Later siblings in a
    /// sequence that the target overlaps are taken into the group too.
    fn wrap_for_alignment(
        &mut self,
        with: IntervalId,
        alignment: Alignment,
        space: &LayoutRegion,
        dim: Dimension,
    ) -> IntervalId {
        let model = self.model();
        let Some(parent) = model.parent(with) else {
            return with;
        };
        if model.is_sequential(parent) {
            let children = model.children(parent);
            let at = model.index_in_parent(with).unwrap_or(0);
            let reach = |id: IntervalId| {
                let s = model.current_space(id);
                s.is_set(dim)
                    && match alignment.edge() {
                        Some(Edge::Trailing) => s.trailing(dim) > space.leading(dim),
                        _ => s.leading(dim) < space.trailing(dim),
                    }
            };
            let (mut start, mut end) = (at, at);
            if alignment == Alignment::Trailing {
                for index in (0..at).rev() {
                    if model.is_gap(children[index]) {
                        continue;
                    }
                    if !reach(children[index]) {
                        break;
                    }
                    start = index;
                }
            } else {
                for (index, child) in children.iter().enumerate().skip(at + 1) {
                    if model.is_gap(*child) {
                        continue;
                    }
                    if !reach(*child) {
                        break;
                    }
                    end = index;
                }
            }
            return self.extract_range(parent, start, end, alignment, dim);
        }
        let raw = model.raw_alignment(with);
        let group = self.ops.new_group(dim, GroupKind::Parallel);
        self.ops.set_group_alignment(group, alignment);
        let index = self.ops.remove(with);
        self.ops.add(group, parent, Some(index));
        self.ops.set_alignment(group, raw);
        self.ops.add(with, group, None);
        self.ops.set_alignment(with, Alignment::Default);
        self.ops.update_group_space(group);
        group
    }

    fn extract_range(
        &mut self,
        seq: IntervalId,
        start: usize,
        end: usize,
        alignment: Alignment,
        dim: Dimension,
    ) -> IntervalId {
        let group = self.ops.extract_parallel_sequence(seq, start, end, dim);
        self.ops.set_group_alignment(group, alignment);
        let children: Vec<IntervalId> = self.model().children(group).to_vec();
        for child in children {
            if self.model().is_sequential(child) {
                self.ops.set_alignment(child, Alignment::Default);
            }
        }
        group
    }

    /// Clean up from the interval's parent to the root.
    fn normalize_upward(&mut self, interval: IntervalId, dim: Dimension) {
        let mut current = self.model().parent(interval);
        while let Some(group) = current {
            let parent = self.model().parent(group);
            if self.model().is_sequential(group) {
                self.ops.merge_all_gaps(group, dim);
            } else {
                self.ops.optimize_gaps(group, dim);
            }
            if parent.is_some() && !self.ops.dissolve_redundant_group(group) {
                self.ops.update_group_space(group);
                for edge in Edge::ALL {
                    if let Some(gap) = self
                        .model()
                        .neighbor(group, edge, false)
                        .filter(|n| self.model().is_gap(*n))
                    {
                        self.ops.accommodate_gap(gap, dim);
                    }
                }
            }
            current = parent;
        }
    }
}

#[cfg(feature = "tracing")]
fn log_inclusions(request: &PlacementRequest, inclusions: &[IncludeDesc]) {
    tracing::debug!(
        message = "feeder.inclusions",
        interval = request.interval.get(),
        dim = request.dim.as_str(),
        count = inclusions.len()
    );
}

#[cfg(feature = "tracing")]
fn log_joined(best: &IncludeDesc, others: usize) {
    tracing::debug!(
        message = "feeder.join_sequences",
        sequence = best.parent.get(),
        index = best.index,
        others
    );
}

#[cfg(feature = "tracing")]
fn log_add(request: &PlacementRequest, desc: &IncludeDesc) {
    tracing::debug!(
        message = "feeder.add",
        interval = request.interval.get(),
        dim = request.dim.as_str(),
        parent = desc.parent.get(),
        index = desc.index,
        distance = desc.distance,
        new_sub_group = desc.new_sub_group,
        snapped = desc.is_snapped()
    );
}

#[cfg(feature = "tracing")]
fn log_aligned(interval: IntervalId, with: IntervalId, alignment: Alignment, offset: i32) {
    tracing::debug!(
        message = "feeder.align_in_parallel",
        interval = interval.get(),
        with = with.get(),
        alignment = alignment.as_str(),
        offset
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::StaticMapper;
    use formlay_core::{ComponentId, Rect, Size};

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
            model.set_current_span(root, H, 0, 400);
            Self {
                model,
                mapper: StaticMapper::new(),
                root,
            }
        }

        fn clear_root(&mut self) {
            let filler = self.model.children(self.root)[0];
            self.model.remove_interval(filler).expect("drop filler");
        }

        fn feeder(&mut self) -> LayoutFeeder<'_> {
            LayoutFeeder::new(
                LayoutOperations::new(&mut self.model, &self.mapper),
                DesignerConfig::default(),
            )
        }

        fn component(&mut self, name: &str, rect: Rect) -> IntervalId {
            let id = self
                .model
                .create_component(ComponentId::from(name))
                .expect("component")[0];
            self.model
                .set_current_space(id, LayoutRegion::from_rect(rect, None));
            id
        }

        fn gap(&mut self, sizes: IntervalSizes, leading: i32, trailing: i32) -> IntervalId {
            let gap = self.model.create_gap(H, sizes).expect("gap");
            self.model.set_current_span(gap, H, leading, trailing);
            gap
        }

        fn row(&mut self, children: &[IntervalId]) -> IntervalId {
            let seq = self.model.create_group(H, GroupKind::Sequential).expect("seq");
            self.model.add_interval(seq, self.root, None).expect("add seq");
            for child in children {
                self.model.add_interval(*child, seq, None).expect("add child");
            }
            self.model.set_current_span(seq, H, 0, 400);
            seq
        }

        fn request(&self, interval: IntervalId, rect: Rect) -> PlacementRequest {
            PlacementRequest::new(interval, H, self.root, LayoutRegion::from_rect(rect, None))
        }

        fn structure(&self) -> String {
            self.model.dump_structure(self.root)
        }
    }

    #[test]
    fn empty_container_gets_a_positioned_row() {
        let mut fx = Fixture::new();
        let rect = Rect::from_edges(10, 10, 100, 30);
        let a = fx.component("a", rect);
        let request = fx.request(a, rect);
        let desc = fx.feeder().add_interval(&request);
        assert_eq!(desc.parent, fx.root);
        assert_eq!(
            fx.structure(),
            "parallel group=leading\n  sequential\n    gap size=pref/10/pref\n    component 'a'\n    gap size=-/300/max\n"
        );
        assert!(!fx.model.invariant_report().has_errors());
    }

    #[test]
    fn appending_to_a_row_takes_over_the_resizing_gap() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(0, 0, 50, 20));
        let g = fx.gap(IntervalSizes::fixed(10), 50, 60);
        let b = fx.component("b", Rect::from_edges(60, 0, 110, 20));
        let tail = fx.gap(IntervalSizes::resizing(290), 110, 400);
        let row = fx.row(&[a, g, b, tail]);

        let rect = Rect::from_edges(150, 0, 200, 20);
        let c = fx.component("c", rect);
        let request = fx.request(c, rect);
        let desc = fx.feeder().add_interval(&request);
        assert_eq!(desc.parent, row);
        assert_eq!(fx.model.children(row)[4], c);
        assert_eq!(fx.model.sizes(fx.model.children(row)[3]), IntervalSizes::fixed(40));
        assert_eq!(
            fx.model.sizes(fx.model.children(row)[5]),
            IntervalSizes::resizing(200)
        );
    }

    #[test]
    fn leaf_in_parallel_group_gets_wrapped_with_the_new_interval() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(10, 0, 60, 20));
        fx.model.add_interval(a, fx.root, None).expect("add a");

        let rect = Rect::from_edges(100, 0, 150, 20);
        let b = fx.component("b", rect);
        let request = fx.request(b, rect);
        let desc = fx.feeder().add_interval(&request);
        assert!(desc.new_sub_group);
        assert_eq!(desc.neighbor, Some(a));
        assert_eq!(
            fx.structure(),
            "parallel group=leading\n  sequential\n    component 'a'\n    gap size=pref/40/pref\n    component 'b'\n"
        );
    }

    #[test]
    fn parallel_snap_builds_an_aligned_group() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let lead = fx.gap(IntervalSizes::fixed(10), 0, 10);
        let a = fx.component("a", Rect::from_edges(10, 0, 80, 20));
        let tail = fx.gap(IntervalSizes::resizing(320), 80, 400);
        fx.row(&[lead, a, tail]);

        let rect = Rect::from_edges(10, 40, 80, 60);
        let b = fx.component("b", rect);
        let request = fx
            .request(b, rect)
            .with_position(Some(PositionDef::aligned(a, Alignment::Leading)));
        fx.feeder().add_interval(&request);
        assert_eq!(
            fx.structure(),
            "parallel group=leading\n  sequential\n    gap size=pref/10/pref\n    parallel group=leading\n      component 'a'\n      component 'b'\n    gap size=-/320/max\n"
        );
        assert!(!fx.model.invariant_report().has_errors());
    }

    #[test]
    fn deeper_candidate_wins_a_tie() {
        // root
        //   row0: [10] a [max]          a at y 0..20
        //   parallel 10..200, y 30..80
        //     row1: [10] b              b at y 30..50
        //     d                         d at y 60..80
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(10, 0, 60, 20));
        let g0 = fx.gap(IntervalSizes::fixed(10), 0, 10);
        let t0 = fx.gap(IntervalSizes::resizing(340), 60, 400);
        fx.row(&[g0, a, t0]);

        let b = fx.component("b", Rect::from_edges(10, 30, 60, 50));
        let d = fx.component("d", Rect::from_edges(10, 60, 200, 80));
        let g1 = fx.gap(IntervalSizes::fixed(10), 0, 10);
        let group = fx.model.create_group(H, GroupKind::Parallel).expect("group");
        fx.model.add_interval(group, fx.root, None).expect("add group");
        let row1 = fx.model.create_group(H, GroupKind::Sequential).expect("row1");
        fx.model.add_interval(row1, group, None).expect("add row1");
        fx.model.add_interval(g1, row1, None).expect("g1");
        fx.model.add_interval(b, row1, None).expect("b");
        fx.model.add_interval(d, group, None).expect("d");
        fx.model.set_current_space(row1, LayoutRegion::from_rect(Rect::from_edges(0, 30, 60, 50), None));
        fx.model.set_current_space(group, LayoutRegion::from_rect(Rect::from_edges(10, 30, 200, 80), None));

        // Ties with both rows: same distance (40), both overlap orthogonally.
        let rect = Rect::from_edges(100, 0, 150, 50);
        let x = fx.component("x", rect);
        let request = fx.request(x, rect);
        let mut feeder = fx.feeder();
        let mut inclusions = feeder.collect_inclusions(&request);
        assert_eq!(inclusions.len(), 2);
        let (best, _) = feeder
            .choose_representative(&mut inclusions, None, false)
            .expect("candidate");
        assert_eq!(best.parent, row1);
        assert_eq!(best.depth, 2);

        let plan = feeder
            .merge_parallel_inclusions(inclusions, None, false)
            .expect("plan");
        assert_eq!(feeder.model().parent(plan.parent), Some(group));
        feeder.add_to_group(&request, &plan);

        // Both rows now lead into x from one parallel group.
        let model = &fx.model;
        let seq = model.parent(x).expect("placed");
        let index = model.index_in_parent(x).expect("index");
        let lead = model.children(seq)[..index]
            .iter()
            .copied()
            .find(|child| model.is_parallel(*child))
            .expect("lead group");
        assert!(model.is_parent_of(lead, a));
        assert!(model.is_parent_of(lead, b));
        assert!(!model.is_parent_of(seq, d));
        assert!(!model.invariant_report().has_errors());
    }

    #[test]
    fn drop_over_two_rows_lands_after_both() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(10, 10, 60, 30));
        let b = fx.component("b", Rect::from_edges(100, 10, 160, 30));
        let g1 = fx.gap(IntervalSizes::fixed(10), 0, 10);
        let g2 = fx.gap(IntervalSizes::fixed(40), 60, 100);
        let t1 = fx.gap(IntervalSizes::resizing(240), 160, 400);
        let row1 = fx.row(&[g1, a, g2, b, t1]);

        let c = fx.component("c", Rect::from_edges(10, 50, 60, 70));
        let e = fx.component("e", Rect::from_edges(100, 50, 200, 70));
        let g3 = fx.gap(IntervalSizes::fixed(10), 0, 10);
        let g4 = fx.gap(IntervalSizes::fixed(40), 60, 100);
        let t2 = fx.gap(IntervalSizes::resizing(200), 200, 400);
        let row2 = fx.row(&[g3, c, g4, e, t2]);

        let rect = Rect::from_edges(240, 10, 300, 70);
        let x = fx.component("x", rect);
        let request = fx.request(x, rect);
        fx.feeder().add_interval(&request);

        assert_eq!(
            fx.structure(),
            "parallel group=leading\n  sequential\n    gap size=pref/10/pref\n    parallel group=leading\n      sequential\n        component 'c'\n        gap size=pref/40/pref\n        component 'e'\n      sequential\n        component 'a'\n        gap size=pref/40/pref\n        component 'b'\n    gap size=pref/40/pref\n    component 'x'\n    gap size=-/100/max\n"
        );
        // The rows are cut, not rebuilt.
        assert_eq!(fx.model.children(row1), &[a, g2, b]);
        assert_eq!(fx.model.children(row2), &[c, g4, e]);
        assert!(fx.model.invariant_report().issues.is_empty());
    }

    #[test]
    fn target_before_the_row_is_shifted_inside_it() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(100, 0, 150, 20));
        let lead = fx.gap(IntervalSizes::fixed(100), 0, 100);
        let tail = fx.gap(IntervalSizes::resizing(250), 150, 400);
        let row = fx.row(&[lead, a, tail]);

        let rect = Rect::from_edges(-30, 0, 20, 20);
        let x = fx.component("x", rect);
        let request = fx.request(x, rect);
        fx.feeder().add_interval(&request);

        let space = fx.model.current_space(x);
        assert_eq!((space.leading(H), space.trailing(H)), (0, 50));
        assert_eq!(fx.model.children(row)[0], x);
        let gap = fx.model.children(row)[1];
        assert_eq!(fx.model.sizes(gap), IntervalSizes::fixed(50));
        assert!(fx.model.invariant_report().issues.is_empty());
    }

    /// Row `[10] group [max]` where the group stacks `a` (y 0..20, x 10..60)
    /// over `b` (y 30..50, x 10..120), optionally followed by `c`.
    fn stacked_group(fx: &mut Fixture, closed: bool, c: Option<Rect>) -> (IntervalId, IntervalId) {
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(10, 0, 60, 20));
        let b = fx.component("b", Rect::from_edges(10, 30, 120, 50));
        let group = fx.model.create_group(H, GroupKind::Parallel).expect("group");
        fx.model.add_interval(a, group, None).expect("a");
        fx.model.add_interval(b, group, None).expect("b");
        if closed {
            fx.model
                .set_interval_sizes(
                    group,
                    IntervalSizes::new(NOT_EXPLICITLY_DEFINED, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE),
                )
                .expect("suppress");
        }
        fx.model.set_current_space(group, LayoutRegion::from_rect(Rect::from_edges(10, 0, 120, 50), None));
        let lead = fx.gap(IntervalSizes::fixed(10), 0, 10);
        let mut items = vec![lead, group];
        if let Some(rect) = c {
            let between = fx.gap(IntervalSizes::fixed(20), 120, rect.x);
            let c = fx.component("c", rect);
            items.extend([between, c]);
        }
        let tail = fx.gap(IntervalSizes::resizing(100), 300, 400);
        items.push(tail);
        fx.row(&items);
        (group, b)
    }

    #[test]
    fn snap_target_inside_a_group_opens_it() {
        let mut fx = Fixture::new();
        let (group, b) = stacked_group(&mut fx, true, None);
        let rect = Rect::from_edges(200, 30, 240, 50);
        let x = fx.component("x", rect);
        let plain = fx.request(x, rect);
        let snapped = plain.with_position(Some(PositionDef::aligned(b, Alignment::Leading)));
        let feeder = fx.feeder();
        assert!(!feeder.should_enter_group(&feeder.search(&plain), group));
        assert!(feeder.should_enter_group(&feeder.search(&snapped), group));
    }

    #[test]
    fn open_group_edge_claimed_by_a_sibling_keeps_the_search_out() {
        let mut fx = Fixture::new();
        let (group, _) = stacked_group(&mut fx, false, Some(Rect::from_edges(140, 0, 190, 50)));
        let inside = Rect::from_edges(70, 0, 110, 20);
        let past_edge = Rect::from_edges(100, 0, 130, 20);
        let into_sibling = Rect::from_edges(100, 0, 150, 20);
        let x = fx.component("x", inside);
        let requests = [inside, past_edge, into_sibling].map(|rect| fx.request(x, rect));
        let feeder = fx.feeder();
        let enters = requests.map(|request| feeder.should_enter_group(&feeder.search(&request), group));
        assert_eq!(enters, [true, true, false]);
    }

    #[test]
    fn original_position_is_kept_among_equals() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(0, 0, 50, 20));
        let g = fx.gap(IntervalSizes::fixed(10), 50, 60);
        let b = fx.component("b", Rect::from_edges(60, 0, 110, 20));
        let row = fx.row(&[a, g, b]);
        let original = OriginalPosition::capture(&fx.model, b);
        fx.model.remove_interval(b).expect("take b out");

        let mut elsewhere = IncludeDesc::new(row, 0);
        elsewhere.ort_distance = 0;
        let mut back = elsewhere;
        back.index = 1;
        let best = fx
            .feeder()
            .merge_parallel_inclusions(vec![elsewhere, back], Some(&original), false)
            .expect("candidate");
        assert_eq!(best.index, 1);

        let mut far = IncludeDesc::new(fx.root, 1);
        far.ort_distance = 0;
        let kept = fx
            .feeder()
            .merge_parallel_inclusions(vec![far], Some(&original), true)
            .expect("original");
        assert_eq!((kept.parent, kept.index), (row, 1));
    }

    #[test]
    fn opposite_edges_in_one_row_merge_into_a_filling_range() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(0, 0, 50, 20));
        let g1 = fx.gap(IntervalSizes::fixed(10), 50, 60);
        let b = fx.component("b", Rect::from_edges(60, 0, 110, 20));
        let g2 = fx.gap(IntervalSizes::fixed(10), 110, 120);
        let c = fx.component("c", Rect::from_edges(120, 0, 170, 20));
        let row = fx.row(&[a, g1, b, g2, c]);

        let mut first = IncludeDesc::new(row, 0);
        first.neighbor = Some(a);
        let mut second = IncludeDesc::new(row, 4);
        second.neighbor = Some(c);
        let merged = fx.feeder().merge_sequential_inclusions(&first, &second);
        assert_eq!(merged.parent, row);
        assert_eq!((merged.index, merged.parallel_end), (0, Some(4)));
        assert!(merged.fill);
    }

    #[test]
    fn edge_inclusion_finds_the_component_on_that_edge() {
        let mut fx = Fixture::new();
        fx.clear_root();
        let a = fx.component("a", Rect::from_edges(10, 0, 80, 20));
        let tail = fx.gap(IntervalSizes::resizing(320), 80, 400);
        fx.row(&[a, tail]);
        let b = fx.component("b", Rect::from_edges(20, 40, 60, 60));
        let feeder = fx.feeder();
        let desc = feeder
            .find_edge_inclusion(feeder.model().root_of(a), H, Edge::Trailing, 80, b)
            .expect("a ends at 80");
        assert_eq!(desc.snapped_parallel, Some(a));
        assert_eq!(desc.alignment, Alignment::Trailing);
        assert!(feeder
            .find_edge_inclusion(feeder.model().root_of(a), H, Edge::Trailing, 81, b)
            .is_none());
    }
}
