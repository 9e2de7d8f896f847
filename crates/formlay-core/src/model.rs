//! The layout model: an arena of interval trees plus the component registry.
//!
//! All structural state lives here and every mutation goes through a
//! journaled primitive:
//!
//! - Each primitive stamps a new [`ChangeMark`], so "did anything change since
//!   mark X" is a single comparison.
//! - [`LayoutModel::revert`] undoes an arbitrary mark range exactly.
//! - Cached current spaces are not journaled; they are recomputed from the
//!   visual side after edits.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;

use crate::component::{ComponentId, LayoutComponent};
use crate::error::ModelError;
use crate::geometry::Size;
use crate::interval::{
    GroupKind, IntervalAttributes, IntervalId, IntervalKind, IntervalNode, IntervalSizes,
};
use crate::journal::{Change, ChangeMark, ChangeRecord};
use crate::region::LayoutRegion;
use crate::types::{Alignment, Dimension, Edge, MAX_SIZE, PaddingType, USE_PREFERRED_SIZE};

/// Arena of intervals and components for one design session.
#[derive(Debug, Clone)]
pub struct LayoutModel {
    pub(crate) intervals: BTreeMap<IntervalId, IntervalNode>,
    pub(crate) components: BTreeMap<ComponentId, LayoutComponent>,
    pub(crate) next_interval: IntervalId,
    pub(crate) sequence: u64,
    pub(crate) journal_floor: u64,
    pub(crate) journal: Vec<ChangeRecord>,
}

impl Default for LayoutModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutModel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            intervals: BTreeMap::new(),
            components: BTreeMap::new(),
            next_interval: IntervalId::MIN,
            sequence: 0,
            journal_floor: 0,
            journal: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Change tracking
    // -------------------------------------------------------------------

    /// Stamp of the latest primitive mutation.
    #[must_use]
    pub const fn change_mark(&self) -> ChangeMark {
        ChangeMark(self.sequence)
    }

    #[must_use]
    pub const fn changed_since(&self, mark: ChangeMark) -> bool {
        self.sequence != mark.0
    }

    /// Number of journaled primitives still revertible.
    #[must_use]
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    fn record(&mut self, change: Change) {
        self.sequence += 1;
        #[cfg(feature = "tracing")]
        log_change(&change, self.sequence);
        self.journal.push(ChangeRecord {
            sequence: self.sequence,
            change,
        });
    }

    /// Undo every change stamped in `(start, end]`, newest first.
    ///
    /// When `end` is the current head the mark itself rolls back to `start`,
    /// so a speculative edit followed by a revert leaves [`Self::change_mark`]
    /// unchanged. Returns whether anything was undone.
    pub fn revert(&mut self, start: ChangeMark, end: ChangeMark) -> Result<bool, ModelError> {
        if start.0 > end.0 || end.0 > self.sequence || start.0 < self.journal_floor {
            return Err(ModelError::StaleMark {
                start: start.0,
                end: end.0,
                floor: self.journal_floor,
                head: self.sequence,
            });
        }
        let first = self.journal.partition_point(|r| r.sequence <= start.0);
        let last = self.journal.partition_point(|r| r.sequence <= end.0);
        let undone: Vec<ChangeRecord> = self.journal.drain(first..last).collect();
        let any = !undone.is_empty();
        for record in undone.into_iter().rev() {
            self.undo(record.change);
        }
        if end.0 == self.sequence {
            self.sequence = start.0;
        }
        Ok(any)
    }

    fn undo(&mut self, change: Change) {
        match change {
            Change::IntervalCreated { id } => {
                self.intervals.remove(&id);
                if id.checked_next().ok() == Some(self.next_interval) {
                    self.next_interval = id;
                }
            }
            Change::IntervalAdded { id, parent, index } => {
                if let Some(node) = self.intervals.get_mut(&parent)
                    && index < node.children.len()
                {
                    node.children.remove(index);
                }
                if let Some(node) = self.intervals.get_mut(&id) {
                    node.parent = None;
                }
            }
            Change::IntervalRemoved { id, parent, index } => {
                if let Some(node) = self.intervals.get_mut(&parent) {
                    let index = index.min(node.children.len());
                    node.children.insert(index, id);
                }
                if let Some(node) = self.intervals.get_mut(&id) {
                    node.parent = Some(parent);
                }
            }
            Change::SizesChanged { id, old } => {
                if let Some(node) = self.intervals.get_mut(&id) {
                    node.sizes = old;
                }
            }
            Change::AlignmentChanged { id, old } => {
                if let Some(node) = self.intervals.get_mut(&id) {
                    node.alignment = old;
                }
            }
            Change::GroupAlignmentChanged { id, old } => {
                if let Some(node) = self.intervals.get_mut(&id)
                    && let IntervalKind::Parallel { group_alignment } = &mut node.kind
                {
                    *group_alignment = old;
                }
            }
            Change::PaddingChanged { id, old } => {
                if let Some(node) = self.intervals.get_mut(&id)
                    && let IntervalKind::Gap { padding } = &mut node.kind
                {
                    *padding = old;
                }
            }
            Change::AttributesChanged { id, old } => {
                if let Some(node) = self.intervals.get_mut(&id) {
                    node.attributes = old;
                }
            }
            Change::ComponentCreated { id } => {
                self.components.remove(&id);
            }
            Change::ComponentAttached { id, parent, index } => {
                if let Some(container) = self.components.get_mut(&parent)
                    && index < container.sub_components.len()
                {
                    container.sub_components.remove(index);
                }
                if let Some(component) = self.components.get_mut(&id) {
                    component.parent = None;
                }
            }
            Change::ComponentDetached { id, parent, index } => {
                if let Some(container) = self.components.get_mut(&parent) {
                    let index = index.min(container.sub_components.len());
                    container.sub_components.insert(index, id.clone());
                }
                if let Some(component) = self.components.get_mut(&id) {
                    component.parent = Some(parent);
                }
            }
            Change::ComponentDiscarded { component } => {
                self.components.insert(component.id.clone(), component);
            }
            Change::LayerAdded { container, index } => {
                if let Some(component) = self.components.get_mut(&container)
                    && index < component.layers.len()
                {
                    component.layers.remove(index);
                }
            }
            Change::LayerRemoved {
                container,
                index,
                roots,
            } => {
                if let Some(component) = self.components.get_mut(&container) {
                    let index = index.min(component.layers.len());
                    component.layers.insert(index, roots);
                }
            }
        }
    }

    /// Drop intervals unreachable from any component or layer root and
    /// forget the journal; earlier marks become unrevertible.
    pub fn compact(&mut self) -> usize {
        let mut live = FxHashSet::default();
        let mut stack: Vec<IntervalId> = Vec::new();
        for component in self.components.values() {
            stack.extend(component.intervals);
            for roots in &component.layers {
                stack.extend(roots);
            }
        }
        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            if let Some(node) = self.intervals.get(&id) {
                stack.extend(node.children.iter().copied());
            }
        }
        let before = self.intervals.len();
        self.intervals.retain(|id, _| live.contains(id));
        self.journal.clear();
        self.journal_floor = self.sequence;
        before - self.intervals.len()
    }

    // -------------------------------------------------------------------
    // Interval queries
    // -------------------------------------------------------------------

    #[must_use]
    pub fn interval(&self, id: IntervalId) -> Option<&IntervalNode> {
        self.intervals.get(&id)
    }

    pub(crate) fn node(&self, id: IntervalId) -> Result<&IntervalNode, ModelError> {
        self.intervals
            .get(&id)
            .ok_or(ModelError::UnknownInterval { interval: id })
    }

    fn node_mut(&mut self, id: IntervalId) -> Result<&mut IntervalNode, ModelError> {
        self.intervals
            .get_mut(&id)
            .ok_or(ModelError::UnknownInterval { interval: id })
    }

    /// Iterate every interval in id order.
    pub fn intervals(&self) -> impl Iterator<Item = &IntervalNode> {
        self.intervals.values()
    }

    #[must_use]
    pub fn kind(&self, id: IntervalId) -> Option<&IntervalKind> {
        self.intervals.get(&id).map(IntervalNode::kind)
    }

    #[must_use]
    pub fn is_gap(&self, id: IntervalId) -> bool {
        self.intervals.get(&id).is_some_and(IntervalNode::is_gap)
    }

    #[must_use]
    pub fn is_component(&self, id: IntervalId) -> bool {
        self.intervals.get(&id).is_some_and(IntervalNode::is_component)
    }

    #[must_use]
    pub fn is_sequential(&self, id: IntervalId) -> bool {
        self.intervals.get(&id).is_some_and(IntervalNode::is_sequential)
    }

    #[must_use]
    pub fn is_parallel(&self, id: IntervalId) -> bool {
        self.intervals.get(&id).is_some_and(IntervalNode::is_parallel)
    }

    #[must_use]
    pub fn is_group(&self, id: IntervalId) -> bool {
        self.intervals.get(&id).is_some_and(IntervalNode::is_group)
    }

    #[must_use]
    pub fn dimension(&self, id: IntervalId) -> Option<Dimension> {
        self.intervals.get(&id).map(IntervalNode::dimension)
    }

    #[must_use]
    pub fn parent(&self, id: IntervalId) -> Option<IntervalId> {
        self.intervals.get(&id).and_then(IntervalNode::parent)
    }

    /// Children of a group; empty for leaves and unknown ids.
    #[must_use]
    pub fn children(&self, id: IntervalId) -> &[IntervalId] {
        self.intervals
            .get(&id)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    #[must_use]
    pub fn child(&self, id: IntervalId, index: usize) -> Option<IntervalId> {
        self.children(id).get(index).copied()
    }

    #[must_use]
    pub fn child_count(&self, id: IntervalId) -> usize {
        self.children(id).len()
    }

    /// Position of `id` within its parent.
    #[must_use]
    pub fn index_in_parent(&self, id: IntervalId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    #[must_use]
    pub fn sizes(&self, id: IntervalId) -> IntervalSizes {
        self.intervals
            .get(&id)
            .map_or(IntervalSizes::DEFAULT, IntervalNode::sizes)
    }

    #[must_use]
    pub fn min_size(&self, id: IntervalId) -> i32 {
        self.sizes(id).min
    }

    #[must_use]
    pub fn preferred_size(&self, id: IntervalId) -> i32 {
        self.sizes(id).pref
    }

    #[must_use]
    pub fn max_size(&self, id: IntervalId) -> i32 {
        self.sizes(id).max
    }

    /// Stored alignment relative to the parent.
    #[must_use]
    pub fn raw_alignment(&self, id: IntervalId) -> Alignment {
        self.intervals
            .get(&id)
            .map_or(Alignment::Default, IntervalNode::raw_alignment)
    }

    /// Group alignment of a parallel group; `Default` for anything else.
    #[must_use]
    pub fn group_alignment(&self, id: IntervalId) -> Alignment {
        match self.kind(id) {
            Some(IntervalKind::Parallel { group_alignment }) => *group_alignment,
            _ => Alignment::Default,
        }
    }

    /// Alignment in the parent parallel group with `Default` resolved.
    #[must_use]
    pub fn alignment(&self, id: IntervalId) -> Alignment {
        let raw = self.raw_alignment(id);
        match self.parent(id) {
            Some(parent) if raw == Alignment::Default && self.is_parallel(parent) => {
                self.group_alignment(parent)
            }
            _ => raw,
        }
    }

    #[must_use]
    pub fn padding(&self, id: IntervalId) -> Option<PaddingType> {
        match self.kind(id) {
            Some(IntervalKind::Gap { padding }) => *padding,
            _ => None,
        }
    }

    #[must_use]
    pub fn attributes(&self, id: IntervalId) -> IntervalAttributes {
        self.intervals
            .get(&id)
            .map_or(IntervalAttributes::empty(), IntervalNode::attributes)
    }

    #[must_use]
    pub fn has_attribute(&self, id: IntervalId, flag: IntervalAttributes) -> bool {
        self.attributes(id).contains(flag)
    }

    /// Component wrapped by a component leaf.
    #[must_use]
    pub fn component_of(&self, id: IntervalId) -> Option<&ComponentId> {
        match self.kind(id) {
            Some(IntervalKind::Component { component }) => Some(component),
            _ => None,
        }
    }

    /// Cached current space; an unset region for unknown ids.
    #[must_use]
    pub fn current_space(&self, id: IntervalId) -> LayoutRegion {
        self.intervals
            .get(&id)
            .map_or_else(LayoutRegion::new, |node| node.current)
    }

    /// Topmost ancestor (the interval itself when detached).
    #[must_use]
    pub fn root_of(&self, id: IntervalId) -> IntervalId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// True if `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_parent_of(&self, ancestor: IntervalId, id: IntervalId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Nearest strict ancestor of the given group kind.
    #[must_use]
    pub fn first_parent(&self, id: IntervalId, kind: GroupKind) -> Option<IntervalId> {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if self.kind(parent).and_then(IntervalKind::group_kind) == Some(kind) {
                return Some(parent);
            }
            current = self.parent(parent);
        }
        None
    }

    /// Lowest common ancestor of two intervals (inclusive).
    #[must_use]
    pub fn common_parent(&self, a: IntervalId, b: IntervalId) -> Option<IntervalId> {
        let mut ancestors = BTreeSet::new();
        let mut current = Some(a);
        while let Some(id) = current {
            ancestors.insert(id);
            current = self.parent(id);
        }
        let mut current = Some(b);
        while let Some(id) = current {
            if ancestors.contains(&id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Sibling next to `id` on `edge` inside a sequential parent.
    ///
    /// With `skip_gaps` the first non-gap sibling is returned.
    #[must_use]
    pub fn neighbor(&self, id: IntervalId, edge: Edge, skip_gaps: bool) -> Option<IntervalId> {
        let parent = self.parent(id)?;
        if !self.is_sequential(parent) {
            return None;
        }
        let siblings = self.children(parent);
        let index = siblings.iter().position(|child| *child == id)?;
        let accept = |child: &&IntervalId| !skip_gaps || !self.is_gap(**child);
        match edge {
            Edge::Leading => siblings[..index].iter().rev().find(accept).copied(),
            Edge::Trailing => siblings[index + 1..].iter().find(accept).copied(),
        }
    }

    /// Depth below the root (root = 0).
    #[must_use]
    pub fn depth(&self, id: IntervalId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// True if the interval's own size definition allows growth.
    ///
    /// A group can resize unless its maximum is [`USE_PREFERRED_SIZE`].
    #[must_use]
    pub fn can_resize(&self, id: IntervalId) -> bool {
        let Some(node) = self.intervals.get(&id) else {
            return false;
        };
        if node.is_group() {
            node.sizes.max != USE_PREFERRED_SIZE
        } else {
            node.sizes.allows_growth()
        }
    }

    /// True if the interval actually grows with its container.
    ///
    /// Groups grow only if not suppressed and some child wants to grow.
    #[must_use]
    pub fn want_resize(&self, id: IntervalId) -> bool {
        let Some(node) = self.intervals.get(&id) else {
            return false;
        };
        if node.is_group() {
            node.sizes.max != USE_PREFERRED_SIZE
                && node.children.iter().any(|child| self.want_resize(*child))
        } else {
            node.sizes.allows_growth()
        }
    }

    /// True if some child of the group wants to grow, ignoring the group's
    /// own suppression.
    #[must_use]
    pub fn content_want_resize(&self, id: IntervalId) -> bool {
        self.children(id).iter().any(|child| self.want_resize(*child))
    }

    /// True if the interval or one of its descendants is a component leaf.
    #[must_use]
    pub fn contains_component(&self, id: IntervalId) -> bool {
        self.is_component(id)
            || self
                .children(id)
                .iter()
                .any(|child| self.contains_component(*child))
    }

    /// Component leaves in the subtree, in tree order.
    #[must_use]
    pub fn components_in(&self, id: IntervalId) -> Vec<IntervalId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.is_component(current) {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    // -------------------------------------------------------------------
    // Interval mutation
    // -------------------------------------------------------------------

    /// Create a detached interval.
    pub fn create_interval(
        &mut self,
        dimension: Dimension,
        kind: IntervalKind,
        sizes: IntervalSizes,
    ) -> Result<IntervalId, ModelError> {
        let id = self.next_interval;
        let next = id.checked_next()?;
        let mut node = IntervalNode::new(id, dimension, kind);
        node.sizes = sizes;
        self.intervals.insert(id, node);
        self.next_interval = next;
        self.record(Change::IntervalCreated { id });
        Ok(id)
    }

    pub fn create_gap(
        &mut self,
        dimension: Dimension,
        sizes: IntervalSizes,
    ) -> Result<IntervalId, ModelError> {
        self.create_interval(dimension, IntervalKind::Gap { padding: None }, sizes)
    }

    /// Create an empty group; parallel groups start leading-aligned.
    pub fn create_group(
        &mut self,
        dimension: Dimension,
        kind: GroupKind,
    ) -> Result<IntervalId, ModelError> {
        let kind = match kind {
            GroupKind::Sequential => IntervalKind::Sequential,
            GroupKind::Parallel => IntervalKind::Parallel {
                group_alignment: Alignment::Leading,
            },
        };
        self.create_interval(dimension, kind, IntervalSizes::DEFAULT)
    }

    /// Insert a detached interval under `parent` at `index` (append on `None`).
    pub fn add_interval(
        &mut self,
        id: IntervalId,
        parent: IntervalId,
        index: Option<usize>,
    ) -> Result<usize, ModelError> {
        let node = self.node(id)?;
        if let Some(current) = node.parent {
            return Err(ModelError::AlreadyAttached {
                interval: id,
                parent: current,
            });
        }
        let dimension = node.dimension;
        let parent_node = self.node(parent)?;
        if !parent_node.is_group() {
            return Err(ModelError::NotAGroup { interval: parent });
        }
        if parent_node.dimension != dimension {
            return Err(ModelError::DimensionMismatch {
                interval: id,
                parent,
            });
        }
        let len = parent_node.children.len();
        if id == parent || self.is_parent_of(id, parent) {
            return Err(ModelError::CycleDetected {
                interval: id,
                parent,
            });
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(ModelError::InvalidIndex { parent, index, len });
        }
        self.node_mut(parent)?.children.insert(index, id);
        self.node_mut(id)?.parent = Some(parent);
        self.record(Change::IntervalAdded { id, parent, index });
        Ok(index)
    }

    /// Detach an interval from its parent, returning its former index.
    pub fn remove_interval(&mut self, id: IntervalId) -> Result<usize, ModelError> {
        let parent = self
            .node(id)?
            .parent
            .ok_or(ModelError::DetachedInterval { interval: id })?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|child| *child == id)
            .ok_or(ModelError::ParentMismatch {
                interval: id,
                expected: Some(parent),
                actual: None,
            })?;
        self.node_mut(parent)?.children.remove(index);
        self.node_mut(id)?.parent = None;
        self.record(Change::IntervalRemoved { id, parent, index });
        Ok(index)
    }

    /// Detach the child at `index`, returning it.
    pub fn remove_interval_at(
        &mut self,
        parent: IntervalId,
        index: usize,
    ) -> Result<IntervalId, ModelError> {
        let children = &self.node(parent)?.children;
        let id = *children.get(index).ok_or(ModelError::InvalidIndex {
            parent,
            index,
            len: children.len(),
        })?;
        self.remove_interval(id)?;
        Ok(id)
    }

    /// Replace the size triple; returns whether it changed.
    pub fn set_interval_sizes(
        &mut self,
        id: IntervalId,
        sizes: IntervalSizes,
    ) -> Result<bool, ModelError> {
        let node = self.node_mut(id)?;
        if node.sizes == sizes {
            return Ok(false);
        }
        let old = node.sizes;
        node.sizes = sizes;
        self.record(Change::SizesChanged { id, old });
        Ok(true)
    }

    pub fn set_interval_size(
        &mut self,
        id: IntervalId,
        min: i32,
        pref: i32,
        max: i32,
    ) -> Result<bool, ModelError> {
        self.set_interval_sizes(id, IntervalSizes::new(min, pref, max))
    }

    pub fn set_interval_alignment(
        &mut self,
        id: IntervalId,
        alignment: Alignment,
    ) -> Result<bool, ModelError> {
        let node = self.node_mut(id)?;
        if node.alignment == alignment {
            return Ok(false);
        }
        let old = node.alignment;
        node.alignment = alignment;
        self.record(Change::AlignmentChanged { id, old });
        Ok(true)
    }

    pub fn set_group_alignment(
        &mut self,
        id: IntervalId,
        alignment: Alignment,
    ) -> Result<bool, ModelError> {
        let node = self.node_mut(id)?;
        let actual = node.kind.tag();
        let IntervalKind::Parallel { group_alignment } = &mut node.kind else {
            return Err(ModelError::KindMismatch {
                interval: id,
                expected: "parallel",
                actual,
            });
        };
        if *group_alignment == alignment {
            return Ok(false);
        }
        let old = *group_alignment;
        *group_alignment = alignment;
        self.record(Change::GroupAlignmentChanged { id, old });
        Ok(true)
    }

    pub fn set_padding_type(
        &mut self,
        id: IntervalId,
        padding: Option<PaddingType>,
    ) -> Result<bool, ModelError> {
        let node = self.node_mut(id)?;
        let actual = node.kind.tag();
        let IntervalKind::Gap { padding: current } = &mut node.kind else {
            return Err(ModelError::KindMismatch {
                interval: id,
                expected: "gap",
                actual,
            });
        };
        if *current == padding {
            return Ok(false);
        }
        let old = *current;
        *current = padding;
        self.record(Change::PaddingChanged { id, old });
        Ok(true)
    }

    pub fn set_attributes(
        &mut self,
        id: IntervalId,
        attributes: IntervalAttributes,
    ) -> Result<bool, ModelError> {
        let node = self.node_mut(id)?;
        if node.attributes == attributes {
            return Ok(false);
        }
        let old = node.attributes;
        node.attributes = attributes;
        self.record(Change::AttributesChanged { id, old });
        Ok(true)
    }

    /// Set or clear one attribute flag.
    pub fn set_attribute(
        &mut self,
        id: IntervalId,
        flag: IntervalAttributes,
        on: bool,
    ) -> Result<bool, ModelError> {
        let mut attributes = self.node(id)?.attributes;
        attributes.set(flag, on);
        self.set_attributes(id, attributes)
    }

    /// Update the cached current space (not journaled).
    pub fn set_current_space(&mut self, id: IntervalId, region: LayoutRegion) {
        if let Some(node) = self.intervals.get_mut(&id) {
            node.current = region;
        }
    }

    /// Update one axis of the cached current space (not journaled).
    pub fn set_current_span(&mut self, id: IntervalId, dim: Dimension, leading: i32, trailing: i32) {
        if let Some(node) = self.intervals.get_mut(&id) {
            node.current.set(dim, leading, trailing);
        }
    }

    // -------------------------------------------------------------------
    // Components and layers
    // -------------------------------------------------------------------

    #[must_use]
    pub fn component(&self, id: &ComponentId) -> Option<&LayoutComponent> {
        self.components.get(id)
    }

    pub(crate) fn component_ref(&self, id: &ComponentId) -> Result<&LayoutComponent, ModelError> {
        self.components
            .get(id)
            .ok_or_else(|| ModelError::UnknownComponent {
                component: id.clone(),
            })
    }

    fn component_mut(&mut self, id: &ComponentId) -> Result<&mut LayoutComponent, ModelError> {
        self.components
            .get_mut(id)
            .ok_or_else(|| ModelError::UnknownComponent {
                component: id.clone(),
            })
    }

    pub fn components(&self) -> impl Iterator<Item = &LayoutComponent> {
        self.components.values()
    }

    /// Containers without a parent.
    pub fn top_containers(&self) -> impl Iterator<Item = &LayoutComponent> {
        self.components
            .values()
            .filter(|component| component.container && component.parent.is_none())
    }

    /// Create an unplaced leaf component with one interval per axis.
    pub fn create_component(&mut self, id: ComponentId) -> Result<[IntervalId; 2], ModelError> {
        self.create_component_inner(id, false)
    }

    /// Create a container whose default layer holds one filling gap per axis
    /// sized to `interior`.
    pub fn create_container(
        &mut self,
        id: ComponentId,
        interior: Size,
    ) -> Result<[IntervalId; 2], ModelError> {
        self.create_component_inner(id.clone(), true)?;
        let roots = self.create_layer(&id)?;
        for dim in Dimension::ALL {
            let extent = interior.along(dim).max(0);
            let gap = self.create_gap(dim, IntervalSizes::new(0, extent, MAX_SIZE))?;
            self.add_interval(gap, roots[dim.index()], None)?;
        }
        Ok(roots)
    }

    fn create_component_inner(
        &mut self,
        id: ComponentId,
        container: bool,
    ) -> Result<[IntervalId; 2], ModelError> {
        if self.components.contains_key(&id) {
            return Err(ModelError::DuplicateComponent { component: id });
        }
        let kind = IntervalKind::Component {
            component: id.clone(),
        };
        let horizontal =
            self.create_interval(Dimension::Horizontal, kind.clone(), IntervalSizes::DEFAULT)?;
        let vertical = self.create_interval(Dimension::Vertical, kind, IntervalSizes::DEFAULT)?;
        let intervals = [horizontal, vertical];
        self.components.insert(
            id.clone(),
            LayoutComponent {
                id: id.clone(),
                parent: None,
                intervals,
                container,
                sub_components: Vec::new(),
                layers: Vec::new(),
            },
        );
        self.record(Change::ComponentCreated { id });
        Ok(intervals)
    }

    /// Register `id` as a sub-component of `parent`.
    pub fn attach_component(
        &mut self,
        id: &ComponentId,
        parent: &ComponentId,
    ) -> Result<(), ModelError> {
        let component = self.component_ref(id)?;
        if let Some(current) = &component.parent {
            return Err(ModelError::AlreadyPlaced {
                component: id.clone(),
                parent: current.clone(),
            });
        }
        if !self.component_ref(parent)?.container {
            return Err(ModelError::NotAContainer {
                component: parent.clone(),
            });
        }
        let container = self.component_mut(parent)?;
        let index = container.sub_components.len();
        container.sub_components.push(id.clone());
        self.component_mut(id)?.parent = Some(parent.clone());
        self.record(Change::ComponentAttached {
            id: id.clone(),
            parent: parent.clone(),
            index,
        });
        Ok(())
    }

    /// Unregister `id` from its parent container, returning the parent.
    pub fn detach_component(&mut self, id: &ComponentId) -> Result<ComponentId, ModelError> {
        let parent = self
            .component_ref(id)?
            .parent
            .clone()
            .ok_or_else(|| ModelError::NotPlaced {
                component: id.clone(),
            })?;
        let container = self.component_mut(&parent)?;
        let index = container
            .sub_components
            .iter()
            .position(|sub| sub == id)
            .unwrap_or(container.sub_components.len());
        if index < container.sub_components.len() {
            container.sub_components.remove(index);
        }
        self.component_mut(id)?.parent = None;
        self.record(Change::ComponentDetached {
            id: id.clone(),
            parent: parent.clone(),
            index,
        });
        Ok(parent)
    }

    /// Forget a detached component entirely.
    pub fn discard_component(&mut self, id: &ComponentId) -> Result<(), ModelError> {
        let component = self.component_ref(id)?;
        if let Some(parent) = &component.parent {
            return Err(ModelError::AlreadyPlaced {
                component: id.clone(),
                parent: parent.clone(),
            });
        }
        if !component.sub_components.is_empty() {
            return Err(ModelError::ContainerNotEmpty {
                component: id.clone(),
            });
        }
        let Some(component) = self.components.remove(id) else {
            return Err(ModelError::UnknownComponent {
                component: id.clone(),
            });
        };
        self.record(Change::ComponentDiscarded { component });
        Ok(())
    }

    /// Append a fresh pair of empty parallel roots to a container.
    pub fn create_layer(&mut self, container: &ComponentId) -> Result<[IntervalId; 2], ModelError> {
        if !self.component_ref(container)?.container {
            return Err(ModelError::NotAContainer {
                component: container.clone(),
            });
        }
        let horizontal = self.create_group(Dimension::Horizontal, GroupKind::Parallel)?;
        let vertical = self.create_group(Dimension::Vertical, GroupKind::Parallel)?;
        let roots = [horizontal, vertical];
        let component = self.component_mut(container)?;
        let index = component.layers.len();
        component.layers.push(roots);
        self.record(Change::LayerAdded {
            container: container.clone(),
            index,
        });
        Ok(roots)
    }

    /// Remove the layer containing `root`, returning its root pair.
    pub fn remove_layer(
        &mut self,
        container: &ComponentId,
        root: IntervalId,
    ) -> Result<[IntervalId; 2], ModelError> {
        let component = self.component_mut(container)?;
        let Some(index) = component.layers.iter().position(|pair| pair.contains(&root)) else {
            return Err(ModelError::UnknownLayer {
                container: container.clone(),
                root,
            });
        };
        let roots = component.layers.remove(index);
        self.record(Change::LayerRemoved {
            container: container.clone(),
            index,
            roots,
        });
        Ok(roots)
    }

    /// Root pair of a container's default layer.
    #[must_use]
    pub fn default_roots(&self, container: &ComponentId) -> Option<[IntervalId; 2]> {
        self.components
            .get(container)
            .and_then(LayoutComponent::default_roots)
    }

    /// Container owning a layer root, with the layer index.
    #[must_use]
    pub fn layer_of_root(&self, root: IntervalId) -> Option<(&ComponentId, usize)> {
        self.components.values().find_map(|component| {
            component
                .layers
                .iter()
                .position(|pair| pair.contains(&root))
                .map(|index| (&component.id, index))
        })
    }

    #[must_use]
    pub fn is_root(&self, id: IntervalId) -> bool {
        self.parent(id).is_none() && self.layer_of_root(id).is_some()
    }

    /// Container whose layout tree holds `id`.
    #[must_use]
    pub fn container_of(&self, id: IntervalId) -> Option<&ComponentId> {
        self.layer_of_root(self.root_of(id)).map(|(container, _)| container)
    }

    /// Component interval of a component on one axis.
    #[must_use]
    pub fn component_interval(&self, id: &ComponentId, dim: Dimension) -> Option<IntervalId> {
        self.components.get(id).map(|component| component.interval(dim))
    }
}

#[cfg(feature = "tracing")]
fn log_change(change: &Change, sequence: u64) {
    tracing::trace!(message = "model.change", kind = change.kind(), sequence);
}
