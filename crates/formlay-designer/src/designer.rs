//! Gesture-level editing of a layout model.
//!
//! [`LayoutDesigner`] is what a host talks to. It owns the model for one
//! editing session, resolves drags through [`LayoutFeeder`] and runs the
//! structural commands (aligning, enclosing, duplicating, resizing
//! switches) directly on the interval trees.
//!
//! # Commit pipeline
//!
//! 1. Capture where the affected components sit.
//! 2. Per axis, take them out, resolve their new place and splice them in.
//! 3. Optimize the touched roots. An axis whose structure came out
//!    identical is reverted, so its change mark does not move.
//! 4. Ask the host to re-lay out, refresh current spaces and repaint.
//!
//! Misuse is rejected with a [`DesignerError`] before anything changes.

use rustc_hash::FxHashMap;

use formlay_core::{
    Alignment, ChangeMark, ComponentId, Dimension, Edge, GroupKind, IntervalId, IntervalSizes,
    LayoutComponent, LayoutModel, LayoutRegion, MAX_SIZE, ModelError, NOT_EXPLICITLY_DEFINED,
    PaddingType, Point, Rect, USE_PREFERRED_SIZE,
};

use crate::aligner::LayoutAligner;
use crate::config::DesignerConfig;
use crate::copier::{IntervalMap, LayoutCopier};
use crate::dragger::{DragKind, DragState, NoSnap, PositionDef, SnapProvider};
use crate::error::DesignerError;
use crate::feeder::{LayoutFeeder, PlacementRequest};
use crate::mapper::{PaintHints, VisualMapper};
use crate::operations::{LayoutOperations, effective_alignment};
use crate::position::OriginalPosition;
use crate::visual;

/// Change-mark range of one axis of an edit.
type AxisEdit = Option<(ChangeMark, ChangeMark)>;

/// The last committed gesture, kept for [`LayoutDesigner::restore_dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LastEdit {
    end: ChangeMark,
    axes: [AxisEdit; 2],
}

/// A gap offered to the host for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableGap {
    pub gap: IntervalId,
    pub dim: Dimension,
    /// Preferred size, `NOT_EXPLICITLY_DEFINED` for a default padding.
    pub defined_size: i32,
    /// Padding of a default-sized gap.
    pub padding: Option<PaddingType>,
    pub resizing: bool,
    /// Size as currently laid out.
    pub actual_size: i32,
    /// Whether a default size makes sense here.
    pub can_default: bool,
    /// Paddings to choose from for a default size between two components.
    pub paddings: Vec<PaddingType>,
}

/// Editing session over one layout model.
pub struct LayoutDesigner<M: VisualMapper> {
    model: LayoutModel,
    mapper: M,
    config: DesignerConfig,
    active: bool,
    snap: Box<dyn SnapProvider>,
    drag: Option<DragState>,
    last_edit: Option<LastEdit>,
}

impl<M: VisualMapper> LayoutDesigner<M> {
    #[must_use]
    pub fn new(model: LayoutModel, mapper: M) -> Self {
        Self {
            model,
            mapper,
            config: DesignerConfig::default(),
            active: true,
            snap: Box::new(NoSnap),
            drag: None,
            last_edit: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DesignerConfig) -> Self {
        self.config = config.validated();
        self
    }

    #[must_use]
    pub fn with_snap_provider(mut self, snap: impl SnapProvider + 'static) -> Self {
        self.snap = Box::new(snap);
        self
    }

    pub fn set_snap_provider(&mut self, snap: impl SnapProvider + 'static) {
        self.snap = Box::new(snap);
    }

    #[must_use]
    pub const fn model(&self) -> &LayoutModel {
        &self.model
    }

    /// Direct model access for host bookkeeping (creating components,
    /// reading dumps). Structural edits should go through the designer.
    pub fn model_mut(&mut self) -> &mut LayoutModel {
        &mut self.model
    }

    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut M {
        &mut self.mapper
    }

    #[must_use]
    pub const fn config(&self) -> &DesignerConfig {
        &self.config
    }

    #[must_use]
    pub fn into_parts(self) -> (LayoutModel, M) {
        (self.model, self.mapper)
    }

    #[must_use]
    pub const fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    #[must_use]
    pub fn drag_target_container(&self) -> Option<&ComponentId> {
        self.drag.as_ref().and_then(DragState::target_container)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Switch the session on or off. Turning it off drops a running drag.
    pub fn set_active(&mut self, active: bool) {
        if !active && let Some(drag) = self.drag.take() {
            for id in drag.components() {
                self.mapper.set_component_visibility(id, true);
            }
        }
        self.active = active;
    }

    // -------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------

    fn ensure_active(&self) -> Result<(), DesignerError> {
        if self.active {
            Ok(())
        } else {
            Err(DesignerError::Inactive)
        }
    }

    fn ensure_idle(&self) -> Result<(), DesignerError> {
        self.ensure_active()?;
        if self.drag.is_some() {
            return Err(DesignerError::DragInProgress);
        }
        Ok(())
    }

    fn ops(&mut self) -> LayoutOperations<'_> {
        LayoutOperations::new(&mut self.model, &self.mapper)
    }

    fn copier(&mut self) -> LayoutCopier<'_> {
        LayoutCopier::new(LayoutOperations::new(&mut self.model, &self.mapper))
    }

    fn feeder(&mut self) -> LayoutFeeder<'_> {
        let config = self.config;
        LayoutFeeder::new(LayoutOperations::new(&mut self.model, &self.mapper), config)
    }

    fn paint_hints(&self) -> PaintHints {
        PaintHints {
            alignment: self.config.paint_alignment,
            gaps: self.config.paint_gaps,
        }
    }

    fn component_ref(&self, id: &ComponentId) -> Result<&LayoutComponent, DesignerError> {
        self.model
            .component(id)
            .ok_or_else(|| DesignerError::UnknownComponent {
                component: id.clone(),
            })
    }

    fn interval_of(&self, id: &ComponentId, dim: Dimension) -> Result<IntervalId, DesignerError> {
        Ok(self.component_ref(id)?.interval(dim))
    }

    /// Container whose layout trees hold the component.
    fn placed_container(&self, id: &ComponentId) -> Result<ComponentId, DesignerError> {
        let interval = self.interval_of(id, Dimension::Horizontal)?;
        self.model
            .container_of(interval)
            .cloned()
            .ok_or_else(|| DesignerError::NotPlaced {
                component: id.clone(),
            })
    }

    fn common_container(&self, ids: &[ComponentId]) -> Result<ComponentId, DesignerError> {
        let (first, rest) = ids.split_first().ok_or(DesignerError::EmptySelection)?;
        let container = self.placed_container(first)?;
        for id in rest {
            if self.placed_container(id)? != container {
                return Err(DesignerError::MixedContainers {
                    first: first.clone(),
                    other: id.clone(),
                });
            }
        }
        Ok(container)
    }

    /// Component intervals on `dim`, all required to live under one root.
    fn intervals_under_one_root(
        &self,
        ids: &[ComponentId],
        dim: Dimension,
    ) -> Result<Vec<IntervalId>, DesignerError> {
        let (first, _) = ids.split_first().ok_or(DesignerError::EmptySelection)?;
        let mut intervals = Vec::with_capacity(ids.len());
        let mut root = None;
        for id in ids {
            let interval = self.interval_of(id, dim)?;
            if self.model.parent(interval).is_none() {
                return Err(DesignerError::NotPlaced {
                    component: id.clone(),
                });
            }
            let this_root = self.model.root_of(interval);
            if root.is_some_and(|root| root != this_root) {
                return Err(DesignerError::MixedContainers {
                    first: first.clone(),
                    other: id.clone(),
                });
            }
            root = Some(this_root);
            intervals.push(interval);
        }
        Ok(intervals)
    }

    fn region_for(&self, id: &ComponentId, rect: Rect) -> LayoutRegion {
        let baseline = self
            .mapper
            .baseline_position(id, rect.size())
            .map(|offset| rect.y + offset);
        LayoutRegion::from_rect(rect, baseline)
    }

    fn bounds_of(&self, id: &ComponentId) -> Option<Rect> {
        self.mapper.component_bounds(id).or_else(|| {
            self.model
                .component_interval(id, Dimension::Horizontal)
                .and_then(|interval| self.model.current_space(interval).to_rect())
        })
    }

    /// Take a placed interval out of its tree and repair what is left.
    fn take_out(&mut self, interval: IntervalId, dim: Dimension) -> Result<(), DesignerError> {
        let Some(parent) = self.model.parent(interval) else {
            return Ok(());
        };
        let root = self.model.root_of(interval);
        let was_resizing = self.model.want_resize(interval);
        {
            let mut ops = self.ops();
            let index = ops.remove(interval);
            ops.interval_removed(parent, index, was_resizing, dim);
        }
        self.settle_root(root, dim)
    }

    /// A default-layer root left without components gets its filling gap
    /// back. Any other layer goes away once both of its roots are empty.
    fn settle_root(&mut self, root: IntervalId, dim: Dimension) -> Result<(), DesignerError> {
        let holds_content = |model: &LayoutModel, root: IntervalId| {
            model.children(root).iter().any(|child| !model.is_gap(*child))
        };
        if holds_content(&self.model, root) {
            return Ok(());
        }
        let Some((container, layer)) = self
            .model
            .layer_of_root(root)
            .map(|(container, layer)| (container.clone(), layer))
        else {
            return Ok(());
        };
        if layer == 0 {
            let children = self.model.children(root);
            let settled = children.len() == 1
                && children
                    .first()
                    .is_some_and(|gap| self.model.max_size(*gap) == MAX_SIZE);
            if !settled {
                self.ops().prop_empty_container(root, dim);
            }
            return Ok(());
        }
        let pair = self
            .model
            .component(&container)
            .and_then(|component| component.layers().get(layer).copied());
        if let Some(pair) = pair
            && pair.iter().all(|root| !holds_content(&self.model, *root))
        {
            self.model.remove_layer(&container, root)?;
        }
        Ok(())
    }

    /// Roots of every layer of `container`, optionally on one axis only.
    fn container_roots(&self, container: &ComponentId, dim: Option<Dimension>) -> Vec<IntervalId> {
        self.model
            .component(container)
            .map(|component| {
                component
                    .layers()
                    .iter()
                    .flat_map(|pair| pair.iter().copied())
                    .filter(|root| dim.is_none_or(|dim| self.model.dimension(*root) == Some(dim)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn optimize_containers(&mut self, containers: &[ComponentId], dim: Option<Dimension>) {
        for container in containers {
            for root in self.container_roots(container, dim) {
                if self.model.interval(root).is_some() {
                    self.optimize_structure(root);
                }
            }
        }
    }

    /// Revert an axis whose structure came out unchanged; otherwise report
    /// the mark range the axis took.
    fn close_axis(
        &mut self,
        root: IntervalId,
        start: ChangeMark,
        before: &str,
        allow_revert: bool,
    ) -> Result<AxisEdit, DesignerError> {
        let end = self.model.change_mark();
        if end == start {
            return Ok(None);
        }
        if allow_revert && self.model.dump_structure(root) == before {
            self.model.revert(start, end)?;
            return Ok(None);
        }
        Ok(Some((start, end)))
    }

    /// Common tail of every edit: optimize, rebuild, refresh and repaint.
    fn finish(&mut self, mut containers: Vec<ComponentId>, start: ChangeMark, optimize: bool) -> bool {
        containers.sort();
        containers.dedup();
        containers.retain(|id| {
            self.model
                .component(id)
                .is_some_and(LayoutComponent::is_container)
        });
        if optimize && self.model.changed_since(start) {
            self.optimize_containers(&containers, None);
        }
        for container in &containers {
            self.mapper.rebuild_layout(container);
            visual::refresh_container(&mut self.model, &self.mapper, container);
        }
        let hints = self.paint_hints();
        self.mapper.repaint_designer(hints);
        self.model.changed_since(start)
    }

    // -------------------------------------------------------------------
    // Drag gestures
    // -------------------------------------------------------------------

    /// Begin adding new components with the given bounds.
    ///
    /// Components the model does not know yet are registered as plain
    /// components. None of them may be placed in a container already.
    pub fn start_adding(
        &mut self,
        components: Vec<ComponentId>,
        bounds: Vec<Rect>,
        hotspot: Point,
        target: Option<ComponentId>,
    ) -> Result<(), DesignerError> {
        self.ensure_idle()?;
        if components.is_empty() {
            return Err(DesignerError::EmptySelection);
        }
        if components.len() != bounds.len() {
            return Err(DesignerError::LengthMismatch {
                sources: components.len(),
                targets: bounds.len(),
            });
        }
        for id in &components {
            if let Some(component) = self.model.component(id)
                && let Some(parent) = component.parent()
            {
                return Err(DesignerError::AlreadyPlaced {
                    component: id.clone(),
                    parent: parent.clone(),
                });
            }
        }
        if let Some(target) = &target {
            self.ensure_container(target)?;
        }
        let start_mark = self.model.change_mark();
        for id in &components {
            if self.model.component(id).is_none() {
                self.model.create_component(id.clone())?;
            }
        }
        #[cfg(feature = "tracing")]
        log_drag_started(DragKind::Adding, components.len());
        self.drag = Some(DragState::new(
            DragKind::Adding,
            components,
            bounds,
            hotspot,
            [None, None],
            target,
            start_mark,
        ));
        Ok(())
    }

    /// Begin moving placed components of one container.
    pub fn start_moving(&mut self, components: &[ComponentId], hotspot: Point) -> Result<(), DesignerError> {
        self.ensure_idle()?;
        let container = self.common_container(components)?;
        let bounds = components
            .iter()
            .map(|id| {
                self.bounds_of(id).ok_or_else(|| DesignerError::NotPlaced {
                    component: id.clone(),
                })
            })
            .collect::<Result<Vec<Rect>, DesignerError>>()?;
        for id in components {
            self.mapper.set_component_visibility(id, false);
        }
        #[cfg(feature = "tracing")]
        log_drag_started(DragKind::Moving, components.len());
        self.drag = Some(DragState::new(
            DragKind::Moving,
            components.to_vec(),
            bounds,
            hotspot,
            [None, None],
            Some(container),
            self.model.change_mark(),
        ));
        Ok(())
    }

    /// Begin resizing one placed component by the given edges.
    pub fn start_resizing(
        &mut self,
        component: &ComponentId,
        edges: [Option<Edge>; 2],
        hotspot: Point,
    ) -> Result<(), DesignerError> {
        self.ensure_idle()?;
        let container = self.placed_container(component)?;
        if self.is_unplaced_component(component) {
            return Err(DesignerError::UnplacedComponent {
                component: component.clone(),
            });
        }
        let bounds = self
            .bounds_of(component)
            .ok_or_else(|| DesignerError::NotPlaced {
                component: component.clone(),
            })?;
        #[cfg(feature = "tracing")]
        log_drag_started(DragKind::Resizing, 1);
        self.drag = Some(DragState::new(
            DragKind::Resizing,
            vec![component.clone()],
            vec![bounds],
            hotspot,
            edges,
            Some(container),
            self.model.change_mark(),
        ));
        Ok(())
    }

    /// Track the pointer. `target` switches the container under the
    /// pointer (ignored while resizing); `None` keeps the current one.
    /// Returns the bounds the formation would get.
    pub fn move_to(
        &mut self,
        point: Point,
        target: Option<&ComponentId>,
        auto_positioning: bool,
        lock_dimension: Option<Dimension>,
    ) -> Result<Vec<Rect>, DesignerError> {
        self.ensure_active()?;
        let resizing = match &self.drag {
            Some(drag) => drag.kind() == DragKind::Resizing,
            None => return Err(DesignerError::NoDragInProgress),
        };
        if !resizing && let Some(target) = target {
            self.ensure_container(target)?;
        }
        let Some(mut drag) = self.drag.take() else {
            return Err(DesignerError::NoDragInProgress);
        };
        if !resizing && let Some(target) = target {
            drag.set_target(Some(target.clone()));
        }
        drag.move_to(point, lock_dimension);
        if auto_positioning
            && let Some(roots) = drag
                .target_container()
                .and_then(|container| self.model.default_roots(container))
        {
            let positions = self.snap.positions(
                &self.model,
                &self.mapper,
                roots,
                &drag.moving_region(),
                drag.kind(),
            );
            drag.apply_snap(positions);
        }
        if let Some(interior) = drag
            .target_container()
            .and_then(|container| self.mapper.container_interior(container))
        {
            drag.keep_within(interior);
        }
        let bounds = drag.moving_bounds().to_vec();
        self.drag = Some(drag);
        Ok(bounds)
    }

    /// Finish the running drag. Returns whether the model changed.
    ///
    /// A cancelled (or target-less) add forgets the components it
    /// registered. A committed move or resize that produces the same
    /// structure leaves the change mark untouched.
    pub fn end_moving(&mut self, commit: bool) -> Result<bool, DesignerError> {
        self.ensure_active()?;
        let drag = self.drag.take().ok_or(DesignerError::NoDragInProgress)?;
        for id in drag.components() {
            self.mapper.set_component_visibility(id, true);
        }
        let start = drag.start_mark();
        if !commit || drag.target_container().is_none() {
            if drag.kind() == DragKind::Adding {
                self.discard_unattached(drag.components())?;
            }
            #[cfg(feature = "tracing")]
            log_edit("designer.drag_cancelled", drag.components().len(), false);
            return Ok(false);
        }
        let (containers, axes) = match drag.kind() {
            DragKind::Adding | DragKind::Moving => self.commit_move(&drag)?,
            DragKind::Resizing => self.commit_resize(&drag)?,
        };
        let changed = self.finish(containers, start, false);
        self.last_edit = changed.then(|| LastEdit {
            end: self.model.change_mark(),
            axes,
        });
        #[cfg(feature = "tracing")]
        log_edit("designer.drag_committed", drag.components().len(), changed);
        Ok(changed)
    }

    /// Drop the components of the running drag instead of placing them.
    pub fn remove_dragged_components(&mut self) -> Result<bool, DesignerError> {
        self.ensure_active()?;
        let drag = self.drag.take().ok_or(DesignerError::NoDragInProgress)?;
        for id in drag.components() {
            self.mapper.set_component_visibility(id, true);
        }
        if drag.kind() == DragKind::Adding {
            self.discard_unattached(drag.components())?;
            return Ok(false);
        }
        self.remove_components(drag.components())
    }

    fn ensure_container(&self, id: &ComponentId) -> Result<(), DesignerError> {
        if self.component_ref(id)?.is_container() {
            Ok(())
        } else {
            Err(DesignerError::NotAContainer { component: id.clone() })
        }
    }

    fn discard_unattached(&mut self, components: &[ComponentId]) -> Result<(), DesignerError> {
        for id in components {
            if self
                .model
                .component(id)
                .is_some_and(|component| component.parent().is_none() && component.sub_components().is_empty())
            {
                self.model.discard_component(id)?;
            }
        }
        Ok(())
    }

    fn commit_move(&mut self, drag: &DragState) -> Result<(Vec<ComponentId>, [AxisEdit; 2]), DesignerError> {
        let Some(target) = drag.target_container().cloned() else {
            return Err(DesignerError::NoDragInProgress);
        };
        let roots = self
            .model
            .default_roots(&target)
            .ok_or_else(|| DesignerError::NotAContainer {
                component: target.clone(),
            })?;
        let components = drag.components().to_vec();
        let mut containers = vec![target.clone()];

        // Originals count only when the component already sits in the
        // target's default layer.
        let mut same_place = drag.kind() == DragKind::Moving;
        let mut originals: Vec<[Option<OriginalPosition>; 2]> = Vec::with_capacity(components.len());
        for id in &components {
            let parent = self.component_ref(id)?.parent().cloned();
            if parent.as_ref() != Some(&target) || self.is_unplaced_component(id) {
                same_place = false;
            }
            let mut captured = [None, None];
            for dim in Dimension::ALL {
                let interval = self.interval_of(id, dim)?;
                if self.model.parent(interval).is_some()
                    && self.model.root_of(interval) == roots[dim.index()]
                {
                    captured[dim.index()] = Some(OriginalPosition::capture(&self.model, interval));
                }
            }
            originals.push(captured);
            if let Some(parent) = parent {
                containers.push(parent);
            }
        }

        for id in &components {
            let parent = self.component_ref(id)?.parent().cloned();
            if parent.as_ref() == Some(&target) {
                continue;
            }
            if parent.is_some() {
                for dim in Dimension::ALL {
                    let interval = self.interval_of(id, dim)?;
                    self.take_out(interval, dim)?;
                }
                self.model.detach_component(id)?;
            }
            self.model.attach_component(id, &target)?;
        }

        let mut axes = [None, None];
        for dim in Dimension::ALL {
            if same_place && drag.lock_dimension() == Some(dim) {
                continue;
            }
            let root = roots[dim.index()];
            let before = self.model.dump_structure(root);
            let start = self.model.change_mark();
            for id in &components {
                let interval = self.interval_of(id, dim)?;
                self.take_out(interval, dim)?;
            }
            for (index, id) in components.iter().enumerate() {
                let interval = self.interval_of(id, dim)?;
                let Some(rect) = drag.moving_bounds().get(index).copied() else {
                    continue;
                };
                let space = self.region_for(id, rect);
                self.model.set_current_space(interval, space);
                let position = if index == 0 {
                    drag.positions()[dim.index()]
                } else {
                    None
                };
                let request = PlacementRequest::new(interval, dim, root, space)
                    .with_position(position)
                    .with_original(originals[index][dim.index()]);
                self.feeder().add_interval(&request);
            }
            self.optimize_containers(&containers, Some(dim));
            axes[dim.index()] = self.close_axis(root, start, &before, same_place)?;
        }
        Ok((containers, axes))
    }

    fn commit_resize(&mut self, drag: &DragState) -> Result<(Vec<ComponentId>, [AxisEdit; 2]), DesignerError> {
        let (Some(id), Some(original), Some(resized)) = (
            drag.components().first().cloned(),
            drag.original_bounds().first().copied(),
            drag.moving_bounds().first().copied(),
        ) else {
            return Err(DesignerError::EmptySelection);
        };
        let container = self.placed_container(&id)?;
        let containers = vec![container];
        let mut axes = [None, None];
        for dim in Dimension::ALL {
            let Some(edge) = drag.resize_edges()[dim.index()] else {
                continue;
            };
            let old_span = (original.start(dim), original.end(dim));
            let new_span = (resized.start(dim), resized.end(dim));
            if old_span == new_span {
                continue;
            }
            let interval = self.interval_of(&id, dim)?;
            let root = self.model.root_of(interval);
            let before = self.model.dump_structure(root);
            let start = self.model.change_mark();
            let mut space = self.region_for(&id, original);
            space.set(dim, new_span.0, new_span.1);
            self.resize_component(interval, dim, edge, old_span, space, drag.positions()[dim.index()])?;
            self.optimize_containers(&containers, Some(dim));
            axes[dim.index()] = self.close_axis(root, start, &before, true)?;
        }
        Ok((containers, axes))
    }

    /// Parallel group whose edge the resized interval now reaches, either
    /// by a snap onto that edge or by landing within the center tolerance.
    fn filling_group(
        &self,
        interval: IntervalId,
        dim: Dimension,
        edge: Edge,
        old_edge: i32,
        new_edge: i32,
        position: Option<PositionDef>,
    ) -> Option<IntervalId> {
        let model = &self.model;
        let group = model
            .parent(interval)
            .filter(|parent| model.is_parallel(*parent))?;
        let group_space = model.current_space(group);
        if !group_space.is_set(dim) {
            return None;
        }
        let group_edge = group_space.edge(dim, edge);
        let tolerance = self.config.center_tolerance;
        if (old_edge - group_edge).abs() <= tolerance {
            return None;
        }
        let snapped = position.is_some_and(|position| {
            position.snapped
                && !position.next_to
                && position.alignment.edge() == Some(edge)
                && position.interval.is_some_and(|target| {
                    (target == group || model.is_parent_of(group, target))
                        && model.current_space(target).edge(dim, edge) == group_edge
                })
        });
        (snapped || (new_edge - group_edge).abs() <= tolerance).then_some(group)
    }

    fn resize_component(
        &mut self,
        interval: IntervalId,
        dim: Dimension,
        edge: Edge,
        old_span: (i32, i32),
        space: LayoutRegion,
        position: Option<PositionDef>,
    ) -> Result<(), DesignerError> {
        let old_edge = match edge {
            Edge::Leading => old_span.0,
            Edge::Trailing => old_span.1,
        };
        let new_size = space.size(dim);

        if let Some(group) = self.filling_group(interval, dim, edge, old_edge, space.edge(dim, edge), position) {
            self.model.set_current_space(interval, space);
            let mut ops = self.ops();
            ops.set_parallel_same_size(group, interval, dim);
            let mut current = Some(group);
            while let Some(id) = current {
                if ops.model().is_group(id) && ops.model().parent(id).is_some() && !ops.model().can_resize(id) {
                    ops.enable_group_resizing(id);
                }
                current = ops.model().parent(id);
            }
            ops.complete_group_resizing(group, dim);
            return Ok(());
        }

        let Some(position) = position.filter(|position| position.snapped) else {
            // Plain resize: the gap on the dragged side absorbs the change.
            let delta = new_size - (old_span.1 - old_span.0);
            let mut ops = self.ops();
            ops.resize_interval(interval, new_size);
            if let Some(gap) = ops
                .model()
                .neighbor(interval, edge, false)
                .filter(|gap| ops.model().is_gap(*gap))
            {
                let pref = ops.model().preferred_size(gap);
                if pref >= 0 {
                    ops.resize_interval(gap, (pref - delta).max(0));
                }
            }
            ops.model_mut().set_current_space(interval, space);
            return Ok(());
        };

        let root = self.model.root_of(interval);
        let original = OriginalPosition::capture(&self.model, interval);
        self.ops().resize_interval(interval, new_size);
        self.take_out(interval, dim)?;
        self.model.set_current_space(interval, space);
        let request = PlacementRequest::new(interval, dim, root, space)
            .with_position(Some(position))
            .keeping_original(original);
        let mut feeder = self.feeder();
        let lead = feeder.find_edge_inclusion(root, dim, Edge::Leading, space.leading(dim), interval);
        let trail = feeder.find_edge_inclusion(root, dim, Edge::Trailing, space.trailing(dim), interval);
        let fill = match (lead, trail) {
            (Some(lead), Some(trail)) => Some(feeder.merge_sequential_inclusions(&lead, &trail)),
            _ => None,
        }
        .filter(|desc| desc.fill);
        match fill {
            Some(desc) => {
                feeder.operations().set_interval_resizing(interval, true);
                feeder.add_to_group(&request, &desc);
                feeder.operations().check_root(interval, root);
            }
            None => {
                feeder.add_interval(&request);
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Direct placement
    // -------------------------------------------------------------------

    /// Place a component at `bounds` in `container`, as a committed add.
    pub fn add_component(
        &mut self,
        component: ComponentId,
        container: &ComponentId,
        bounds: Rect,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        self.start_adding(
            vec![component],
            vec![bounds],
            bounds.origin(),
            Some(container.clone()),
        )?;
        self.end_moving(true)
    }

    /// Register a component in its own extra layer of `container`, laid
    /// out between two zero gaps, without choosing a real position.
    pub fn add_unspecified_component(
        &mut self,
        component: &ComponentId,
        container: &ComponentId,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        self.ensure_container(container)?;
        if let Some(parent) = self.component_ref(component)?.parent() {
            return Err(DesignerError::AlreadyPlaced {
                component: component.clone(),
                parent: parent.clone(),
            });
        }
        let start = self.model.change_mark();
        self.model.attach_component(component, container)?;
        let roots = self.model.create_layer(container)?;
        for dim in Dimension::ALL {
            let interval = self.interval_of(component, dim)?;
            let mut ops = self.ops();
            let seq = ops.new_group(dim, GroupKind::Sequential);
            let lead = ops.new_gap(dim, IntervalSizes::new(0, 0, MAX_SIZE));
            let trail = ops.new_gap(dim, IntervalSizes::new(0, 0, MAX_SIZE));
            for child in [lead, interval, trail] {
                ops.add(child, seq, None);
            }
            ops.add(seq, roots[dim.index()], None);
        }
        self.last_edit = None;
        let changed = self.finish(vec![container.clone()], start, false);
        #[cfg(feature = "tracing")]
        log_edit("designer.add_unspecified", 1, changed);
        Ok(changed)
    }

    /// True if the component sits in an extra layer, not yet positioned.
    #[must_use]
    pub fn is_unplaced_component(&self, id: &ComponentId) -> bool {
        self.model
            .component_interval(id, Dimension::Horizontal)
            .and_then(|interval| self.model.layer_of_root(self.model.root_of(interval)))
            .is_some_and(|(_, layer)| layer > 0)
    }

    /// Remove components (and everything inside removed containers).
    pub fn remove_components(&mut self, ids: &[ComponentId]) -> Result<bool, DesignerError> {
        self.ensure_active()?;
        if ids.is_empty() {
            return Err(DesignerError::EmptySelection);
        }
        for id in ids {
            self.component_ref(id)?;
        }
        let start = self.model.change_mark();
        let mut containers = Vec::new();
        for id in ids {
            if self.model.component(id).is_some() {
                self.remove_component_tree(id, &mut containers)?;
            }
        }
        self.last_edit = None;
        let changed = self.finish(containers, start, true);
        #[cfg(feature = "tracing")]
        log_edit("designer.remove", ids.len(), changed);
        Ok(changed)
    }

    fn remove_component_tree(
        &mut self,
        id: &ComponentId,
        containers: &mut Vec<ComponentId>,
    ) -> Result<(), DesignerError> {
        let subs = self.component_ref(id)?.sub_components().to_vec();
        for sub in &subs {
            self.remove_component_tree(sub, containers)?;
        }
        if self.component_ref(id)?.parent().is_some() {
            for dim in Dimension::ALL {
                let interval = self.interval_of(id, dim)?;
                self.take_out(interval, dim)?;
            }
            containers.push(self.model.detach_component(id)?);
        }
        self.model.discard_component(id)?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Structure commands
    // -------------------------------------------------------------------

    /// Duplicate the layout of `sources` for `targets` along `dim`.
    ///
    /// Sources sharing a sequence are copied as one section, from the first
    /// to the last of them with the gaps in between, and the copy goes in
    /// once right after the section (or before it, for `Leading`). The gap
    /// between section and copy repeats the section's outer gap on the
    /// other side. On the other axis each copy is aligned with its source.
    pub fn duplicate_layout(
        &mut self,
        sources: &[ComponentId],
        targets: &[ComponentId],
        dim: Dimension,
        direction: Edge,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        if sources.len() != targets.len() {
            return Err(DesignerError::LengthMismatch {
                sources: sources.len(),
                targets: targets.len(),
            });
        }
        let container = self.common_container(sources)?;
        for target in targets {
            if let Some(parent) = self.component_ref(target)?.parent() {
                return Err(DesignerError::AlreadyPlaced {
                    component: target.clone(),
                    parent: parent.clone(),
                });
            }
        }
        let start = self.model.change_mark();
        let ort = dim.other();
        let mut pairs = Vec::with_capacity(sources.len());
        for (source, target) in sources.iter().zip(targets) {
            self.model.attach_component(target, &container)?;
            let src = [
                self.interval_of(source, Dimension::Horizontal)?,
                self.interval_of(source, Dimension::Vertical)?,
            ];
            let dst = [
                self.interval_of(target, Dimension::Horizontal)?,
                self.interval_of(target, Dimension::Vertical)?,
            ];
            let sizes = self.model.sizes(src[ort.index()]);
            self.ops().set_sizes(dst[ort.index()], sizes);
            pairs.push((src, dst));
        }

        let map: IntervalMap = pairs
            .iter()
            .map(|(src, dst)| (src[dim.index()], dst[dim.index()]))
            .collect();
        let duplicated: Vec<IntervalId> = pairs.iter().map(|(src, _)| src[dim.index()]).collect();
        self.copier()
            .duplicate_sequentially(&duplicated, &map, dim, direction);

        for (src, dst) in pairs {
            let target_space = self.model.current_space(dst[dim.index()]);
            self.model.set_current_space(dst[ort.index()], target_space);
            let ort_source = src[ort.index()];
            let ort_root = self.model.root_of(ort_source);
            self.feeder().align_in_parallel(
                dst[ort.index()],
                ort_source,
                Alignment::Leading,
                &target_space,
                ort,
                ort_root,
            );
        }
        self.last_edit = None;
        let changed = self.finish(vec![container], start, true);
        #[cfg(feature = "tracing")]
        log_edit("designer.duplicate", sources.len(), changed);
        Ok(changed)
    }

    /// Copy components with their layout into `target`.
    ///
    /// `pairs` maps placed source components, all from one container, to
    /// the ids of their copies; unknown copy ids are registered as plain
    /// components. Copying every component of another container into an
    /// empty `target` reproduces that layout one to one. Anything else is
    /// copied as one piece into a new layer of `target`, between zero gaps,
    /// where a later move positions it.
    pub fn copy_layout(
        &mut self,
        pairs: &[(ComponentId, ComponentId)],
        target: &ComponentId,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        self.ensure_container(target)?;
        let sources: Vec<ComponentId> = pairs.iter().map(|(source, _)| source.clone()).collect();
        let source_container = self.common_container(&sources)?;
        let mut copies: Vec<&ComponentId> = pairs.iter().map(|(_, copy)| copy).collect();
        copies.sort();
        if let Some(pair) = copies.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ModelError::DuplicateComponent {
                component: pair[0].clone(),
            }
            .into());
        }
        for copy in copies {
            if let Some(component) = self.model.component(copy)
                && let Some(parent) = component.parent()
            {
                return Err(DesignerError::AlreadyPlaced {
                    component: copy.clone(),
                    parent: parent.clone(),
                });
            }
        }
        let whole = source_container != *target
            && self.component_ref(&source_container)?.sub_components().len() == pairs.len()
            && self.component_ref(target)?.sub_components().is_empty();

        let start = self.model.change_mark();
        let mut overall = LayoutRegion::new();
        for (source, copy) in pairs {
            if self.model.component(copy).is_none() {
                self.model.create_component(copy.clone())?;
            }
            self.model.attach_component(copy, target)?;
            let interval = self.interval_of(source, Dimension::Horizontal)?;
            overall.expand(&self.model.current_space(interval), None);
        }
        let layer = if whole {
            None
        } else {
            Some(self.model.create_layer(target)?)
        };
        for dim in Dimension::ALL {
            let mut map = IntervalMap::default();
            let mut common: Option<IntervalId> = None;
            for (source, copy) in pairs {
                let interval = self.interval_of(source, dim)?;
                map.insert(interval, self.interval_of(copy, dim)?);
                common = match common {
                    None => Some(interval),
                    Some(common) => self.model.common_parent(common, interval),
                };
            }
            match layer {
                None => self.copy_container_layout(&source_container, target, &map, dim)?,
                Some(roots) => {
                    if let Some(common) = common {
                        self.copy_into_layer(common, roots[dim.index()], &map, &overall, dim);
                    }
                }
            }
        }
        self.last_edit = None;
        let changed = self.finish(vec![target.clone()], start, false);
        #[cfg(feature = "tracing")]
        log_edit("designer.copy", pairs.len(), changed);
        Ok(changed)
    }

    /// Replace the content of `target`'s root on `dim` by a copy of
    /// `source`'s.
    fn copy_container_layout(
        &mut self,
        source: &ComponentId,
        target: &ComponentId,
        map: &IntervalMap,
        dim: Dimension,
    ) -> Result<(), DesignerError> {
        let roots_of = |id: &ComponentId| {
            self.model
                .default_roots(id)
                .ok_or_else(|| DesignerError::NotAContainer { component: id.clone() })
        };
        let source_root = roots_of(source)?[dim.index()];
        let target_root = roots_of(target)?[dim.index()];
        let alignment = self.model.group_alignment(source_root);
        let mut copier = self.copier();
        let Some(copy) = copier.restricted_copy(source_root, map, &LayoutRegion::new(), dim) else {
            return Ok(());
        };
        let ops = copier.operations();
        while let Some(child) = ops.model().children(target_root).first().copied() {
            ops.remove(child);
        }
        ops.set_group_alignment(target_root, alignment);
        if ops.model().is_parallel(copy) {
            ops.add_content(copy, target_root, None);
        } else {
            ops.add(copy, target_root, None);
        }
        Ok(())
    }

    /// Put a copy of `common` into an extra layer root, between two zero
    /// gaps.
    fn copy_into_layer(
        &mut self,
        common: IntervalId,
        layer_root: IntervalId,
        map: &IntervalMap,
        space: &LayoutRegion,
        dim: Dimension,
    ) {
        let mut copier = self.copier();
        let Some(copy) = copier.restricted_copy(common, map, space, dim) else {
            return;
        };
        let ops = copier.operations();
        let seq = ops.new_group(dim, GroupKind::Sequential);
        let lead = ops.new_gap(dim, IntervalSizes::new(0, 0, MAX_SIZE));
        let trail = ops.new_gap(dim, IntervalSizes::new(0, 0, MAX_SIZE));
        ops.add(lead, seq, None);
        ops.add(trail, seq, None);
        ops.set_alignment(copy, Alignment::Default);
        ops.add_content(copy, seq, Some(1));
        ops.add(seq, layer_root, None);
    }

    /// Place components known only by their bounds into `target`, laid
    /// out as if they were dropped there together.
    ///
    /// With `relative`, or when `target` already has content, the
    /// formation is first moved so its top-left corner sits at the origin
    /// of the container's interior.
    pub fn copy_layout_from_outside(
        &mut self,
        bounds: &[(ComponentId, Rect)],
        target: &ComponentId,
        relative: bool,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        self.ensure_container(target)?;
        let Some(first) = bounds.first() else {
            return Err(DesignerError::EmptySelection);
        };
        let relative = relative || !self.component_ref(target)?.sub_components().is_empty();
        let mut rects: Vec<Rect> = bounds.iter().map(|(_, rect)| *rect).collect();
        if relative {
            let origin = self
                .mapper
                .container_interior(target)
                .map_or(Point::new(0, 0), |interior| interior.origin());
            let left = rects.iter().map(|rect| rect.x).min().unwrap_or(origin.x);
            let top = rects.iter().map(|rect| rect.y).min().unwrap_or(origin.y);
            for rect in &mut rects {
                rect.x += origin.x - left;
                rect.y += origin.y - top;
            }
        }
        let hotspot = rects.first().map_or(first.1.origin(), Rect::origin);
        let ids = bounds.iter().map(|(id, _)| id.clone()).collect();
        self.start_adding(ids, rects, hotspot, Some(target.clone()))?;
        let changed = self.end_moving(true)?;
        #[cfg(feature = "tracing")]
        log_edit("designer.copy_from_outside", bounds.len(), changed);
        Ok(changed)
    }

    // -------------------------------------------------------------------
    // Gap editing
    // -------------------------------------------------------------------

    /// Editing data for one gap.
    pub fn editable_gap(&self, gap: IntervalId) -> Result<EditableGap, DesignerError> {
        let kind = self
            .model
            .kind(gap)
            .ok_or(ModelError::UnknownInterval { interval: gap })?;
        let dim = self
            .model
            .dimension(gap)
            .ok_or(ModelError::UnknownInterval { interval: gap })?;
        if !self.model.is_gap(gap) {
            return Err(ModelError::KindMismatch {
                interval: gap,
                expected: "gap",
                actual: kind.tag(),
            }
            .into());
        }
        let sizes = self.model.sizes(gap);
        let space = self.model.current_space(gap);
        let actual_size = if space.is_set(dim) {
            space.size(dim)
        } else {
            sizes.pref.max(0)
        };
        let beside = [Edge::Leading, Edge::Trailing].map(|edge| self.model.neighbor(gap, edge, true).is_some());
        let (can_default, paddings) = match beside {
            [true, true] => (
                true,
                vec![PaddingType::Related, PaddingType::Unrelated, PaddingType::Separate],
            ),
            [false, false] => (false, Vec::new()),
            _ => (true, Vec::new()),
        };
        let padding = if sizes.pref == NOT_EXPLICITLY_DEFINED {
            self.model.padding(gap)
        } else {
            None
        };
        Ok(EditableGap {
            gap,
            dim,
            defined_size: sizes.pref,
            padding,
            resizing: self.model.can_resize(gap),
            actual_size,
            can_default,
            paddings,
        })
    }

    /// Gaps around a placed component: horizontal leading, horizontal
    /// trailing, vertical leading, vertical trailing. A gap of an enclosing
    /// sequence counts when the component sits at that end of its group.
    /// `None` when no side has a gap.
    pub fn editable_gaps(&self, id: &ComponentId) -> Result<Option<[Option<EditableGap>; 4]>, DesignerError> {
        self.placed_container(id)?;
        let mut gaps: [Option<EditableGap>; 4] = Default::default();
        for dim in Dimension::ALL {
            let interval = self.interval_of(id, dim)?;
            for (side, edge) in [Edge::Leading, Edge::Trailing].into_iter().enumerate() {
                if let Some(gap) = adjacent_gap(&self.model, interval, edge) {
                    gaps[dim.index() * 2 + side] = Some(self.editable_gap(gap)?);
                }
            }
        }
        Ok(gaps.iter().any(Option::is_some).then_some(gaps))
    }

    /// Write back gaps edited by the host: the defined size, resizing and,
    /// for a default size, the padding.
    pub fn apply_edited_gaps(&mut self, gaps: &[EditableGap]) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        if gaps.is_empty() {
            return Err(DesignerError::EmptySelection);
        }
        let mut containers = Vec::with_capacity(gaps.len());
        for edited in gaps {
            self.editable_gap(edited.gap)?;
            if let Some(container) = self.model.container_of(edited.gap) {
                containers.push(container.clone());
            }
        }
        let start = self.model.change_mark();
        {
            let mut ops = self.ops();
            for edited in gaps {
                ops.resize_interval(edited.gap, edited.defined_size);
                ops.set_interval_resizing(edited.gap, edited.resizing);
                let padding = if edited.defined_size == NOT_EXPLICITLY_DEFINED {
                    edited.padding
                } else {
                    None
                };
                ops.set_padding(edited.gap, padding);
            }
        }
        self.last_edit = None;
        let changed = self.finish(containers, start, false);
        #[cfg(feature = "tracing")]
        log_edit("designer.apply_gaps", gaps.len(), changed);
        Ok(changed)
    }

    /// True if the components can go together into a new container.
    #[must_use]
    pub fn can_enclose_in_container(&self, ids: &[ComponentId]) -> bool {
        self.common_container(ids).is_ok() && !ids.iter().any(|id| self.is_unplaced_component(id))
    }

    /// Move placed components into `container`, an empty container not
    /// placed anywhere yet, which takes their place in the layout.
    pub fn enclose_in_container(
        &mut self,
        ids: &[ComponentId],
        container: &ComponentId,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        let parent = self.common_container(ids)?;
        if let Some(id) = ids.iter().find(|id| self.is_unplaced_component(id)) {
            return Err(DesignerError::UnplacedComponent { component: id.clone() });
        }
        let enclosing = self.component_ref(container)?;
        if !enclosing.is_container() {
            return Err(DesignerError::NotAContainer {
                component: container.clone(),
            });
        }
        if let Some(current) = enclosing.parent() {
            return Err(DesignerError::AlreadyPlaced {
                component: container.clone(),
                parent: current.clone(),
            });
        }
        if !enclosing.sub_components().is_empty() {
            return Err(DesignerError::ContainerNotEmpty {
                component: container.clone(),
            });
        }

        let old_roots = self
            .model
            .default_roots(&parent)
            .ok_or_else(|| DesignerError::NotAContainer { component: parent.clone() })?;
        let start = self.model.change_mark();
        let mut intervals = [Vec::new(), Vec::new()];
        let mut region = LayoutRegion::new();
        for id in ids {
            for dim in Dimension::ALL {
                intervals[dim.index()].push(self.interval_of(id, dim)?);
            }
            let space = self.model.current_space(self.interval_of(id, Dimension::Horizontal)?);
            region.expand(&space, None);
        }

        self.model.attach_component(container, &parent)?;
        let new_roots = match self.model.default_roots(container) {
            Some(roots) => roots,
            None => self.model.create_layer(container)?,
        };
        let container_ivs = [
            self.interval_of(container, Dimension::Horizontal)?,
            self.interval_of(container, Dimension::Vertical)?,
        ];
        for dim in Dimension::ALL {
            self.model.set_current_space(container_ivs[dim.index()], region);
            if region.is_set(dim) {
                self.model
                    .set_current_span(new_roots[dim.index()], dim, region.leading(dim), region.trailing(dim));
            }
        }
        for id in ids {
            self.model.detach_component(id)?;
            self.model.attach_component(id, container)?;
        }

        for dim in Dimension::ALL {
            let ivs = &intervals[dim.index()];
            let container_iv = container_ivs[dim.index()];
            let new_root = new_roots[dim.index()];
            if self.move_contiguous_run(ivs, dim, container_iv, new_root) {
                continue;
            }
            for interval in ivs {
                self.take_out(*interval, dim)?;
            }
            let old_root = old_roots[dim.index()];
            let request = PlacementRequest::new(container_iv, dim, old_root, region);
            self.feeder().add_interval(&request);
            for interval in ivs {
                let space = self.model.current_space(*interval);
                let request = PlacementRequest::new(*interval, dim, new_root, space);
                self.feeder().add_interval(&request);
            }
        }
        self.last_edit = None;
        let changed = self.finish(vec![parent, container.clone()], start, true);
        #[cfg(feature = "tracing")]
        log_edit("designer.enclose", ids.len(), changed);
        Ok(changed)
    }

    /// Move the intervals into `new_root` when they form one run of a
    /// single sequence (gaps in between allowed); `container` takes the
    /// run's place. Returns false when they do not.
    fn move_contiguous_run(
        &mut self,
        intervals: &[IntervalId],
        dim: Dimension,
        container: IntervalId,
        new_root: IntervalId,
    ) -> bool {
        let model = &self.model;
        let Some(seq) = intervals
            .first()
            .and_then(|first| model.parent(*first))
            .filter(|parent| model.is_sequential(*parent))
        else {
            return false;
        };
        if intervals.iter().any(|interval| model.parent(*interval) != Some(seq)) {
            return false;
        }
        let indexes: Vec<usize> = intervals
            .iter()
            .filter_map(|interval| model.index_in_parent(*interval))
            .collect();
        let (Some(first), Some(last)) = (indexes.iter().min().copied(), indexes.iter().max().copied()) else {
            return false;
        };
        let foreign = model.children(seq)[first..=last]
            .iter()
            .any(|child| !model.is_gap(*child) && !intervals.contains(child));
        if foreign {
            return false;
        }

        let mut ops = self.ops();
        let leftovers: Vec<IntervalId> = ops.model().children(new_root).to_vec();
        for child in leftovers {
            ops.remove(child);
        }
        let inner = ops.new_group(dim, GroupKind::Sequential);
        for _ in first..=last {
            let Some(child) = ops.model().child(seq, first) else {
                break;
            };
            ops.remove(child);
            ops.add(child, inner, None);
        }
        ops.add(container, seq, Some(first));
        ops.add(inner, new_root, None);
        ops.update_group_space(inner);
        true
    }

    /// True if the components share one root on both axes.
    #[must_use]
    pub fn can_align(&self, ids: &[ComponentId]) -> bool {
        ids.len() > 1
            && Dimension::ALL
                .iter()
                .all(|dim| self.intervals_under_one_root(ids, *dim).is_ok())
    }

    /// Align components on `dim` at `alignment`. With `closed` the
    /// aligned group does not grow with the container.
    pub fn align(
        &mut self,
        ids: &[ComponentId],
        closed: bool,
        dim: Dimension,
        alignment: Alignment,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        let container = self.common_container(ids)?;
        let intervals = self.intervals_under_one_root(ids, dim)?;
        let start = self.model.change_mark();
        {
            let mut feeder = self.feeder();
            LayoutAligner::new(&mut feeder).align(&intervals, closed, dim, alignment);
        }
        self.last_edit = None;
        let changed = self.finish(vec![container], start, true);
        #[cfg(feature = "tracing")]
        log_edit("designer.align", ids.len(), changed);
        Ok(changed)
    }

    /// Anchor a component at one side of its place on `dim`.
    ///
    /// In a parallel group this sets the component's own alignment. In a
    /// sequence the gap on the anchored side is fixed and the one on the
    /// other side made resizing, added if missing.
    pub fn adjust_component_alignment(
        &mut self,
        id: &ComponentId,
        dim: Dimension,
        alignment: Alignment,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        let container = self.placed_container(id)?;
        let interval = self.interval_of(id, dim)?;
        let Some(parent) = self.model.parent(interval) else {
            return Err(DesignerError::NotPlaced { component: id.clone() });
        };
        let start = self.model.change_mark();
        {
            let mut ops = self.ops();
            if ops.model().is_parallel(parent) {
                let raw = if ops.model().group_alignment(parent) == alignment {
                    Alignment::Default
                } else {
                    alignment
                };
                ops.set_alignment(interval, raw);
            } else if let Some(anchor) = alignment.edge() {
                for (edge, resizing) in [(anchor, false), (anchor.opposite(), true)] {
                    let gap = ops
                        .model()
                        .neighbor(interval, edge, false)
                        .filter(|gap| ops.model().is_gap(*gap));
                    match gap {
                        Some(gap) => {
                            ops.set_interval_resizing(gap, resizing);
                        }
                        None if resizing => {
                            let gap = ops.new_gap(dim, IntervalSizes::resizing(0));
                            ops.insert_gap(gap, interval, dim, edge);
                        }
                        None => {}
                    }
                }
            }
        }
        self.last_edit = None;
        let changed = self.finish(vec![container], start, true);
        #[cfg(feature = "tracing")]
        log_edit("designer.adjust_alignment", 1, changed);
        Ok(changed)
    }

    /// Which anchors `[leading, trailing]` would change something.
    #[must_use]
    pub fn adjustable_component_alignment(&self, id: &ComponentId, dim: Dimension) -> [bool; 2] {
        let Some(interval) = self
            .model
            .component_interval(id, dim)
            .filter(|interval| self.model.parent(*interval).is_some())
        else {
            return [false, false];
        };
        if self.model.want_resize(interval) {
            return [false, false];
        }
        let current = effective_alignment(&self.model, interval);
        [current != Alignment::Leading, current != Alignment::Trailing]
    }

    /// Make a component grow with its container on `dim`, or stop it.
    pub fn set_component_resizing(
        &mut self,
        id: &ComponentId,
        dim: Dimension,
        resizing: bool,
    ) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        let container = self.placed_container(id)?;
        let interval = self.interval_of(id, dim)?;
        if self.model.parent(interval).is_none() {
            return Err(DesignerError::NotPlaced { component: id.clone() });
        }
        let start = self.model.change_mark();
        {
            let mut ops = self.ops();
            ops.set_interval_resizing(interval, resizing);
            if resizing {
                ops.suppress_resizing_of_surrounding_gaps(interval);
                let mut current = ops.model().parent(interval);
                while let Some(group) = current {
                    if ops.model().parent(group).is_none() {
                        break;
                    }
                    if !ops.model().can_resize(group) {
                        ops.enable_group_resizing(group);
                    }
                    ops.complete_group_resizing(group, dim);
                    current = ops.model().parent(group);
                }
            } else {
                // The top-level row must still fill the container.
                let mut current = interval;
                while let Some(parent) = ops.model().parent(current) {
                    if ops.model().parent(parent).is_none() {
                        if ops.model().is_sequential(current) && !ops.model().content_want_resize(current) {
                            let gap = ops.new_gap(dim, IntervalSizes::resizing(0));
                            ops.insert_gap_into_sequence(gap, current, None, dim);
                        }
                        break;
                    }
                    current = parent;
                }
            }
        }
        self.last_edit = None;
        let changed = self.finish(vec![container], start, true);
        #[cfg(feature = "tracing")]
        log_edit("designer.set_resizing", 1, changed);
        Ok(changed)
    }

    #[must_use]
    pub fn is_component_resizing(&self, id: &ComponentId, dim: Dimension) -> bool {
        self.model
            .component_interval(id, dim)
            .is_some_and(|interval| self.model.want_resize(interval))
    }

    /// Drop explicit sizes so the component takes its natural size.
    pub fn set_default_size(&mut self, id: &ComponentId) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        let container = self.placed_container(id)?;
        let start = self.model.change_mark();
        for dim in Dimension::ALL {
            let interval = self.interval_of(id, dim)?;
            let sizes = self.model.sizes(interval);
            let min = if sizes.min >= 0 {
                NOT_EXPLICITLY_DEFINED
            } else {
                sizes.min
            };
            let max = if sizes.max >= 0 && sizes.max != MAX_SIZE {
                USE_PREFERRED_SIZE
            } else {
                sizes.max
            };
            self.ops()
                .set_sizes(interval, IntervalSizes::new(min, NOT_EXPLICITLY_DEFINED, max));
        }
        self.last_edit = None;
        Ok(self.finish(vec![container], start, true))
    }

    /// Tidy one root: merge nested parallel groups, drop superfluous gaps
    /// and dissolve groups left with a single child.
    pub fn optimize_structure(&mut self, root: IntervalId) {
        let Some(dim) = self.model.dimension(root) else {
            return;
        };
        let mut ops = self.ops();
        ops.merge_parallel_groups(root);
        for group in groups_bottom_up(ops.model(), root) {
            let alive = ops.model().interval(group).is_some() && ops.model().root_of(group) == root;
            if alive && ops.model().is_parallel(group) {
                ops.optimize_gaps(group, dim);
            }
        }
        ops.destroy_redundant_groups(root);
    }

    // -------------------------------------------------------------------
    // Visual state
    // -------------------------------------------------------------------

    /// Refresh every current space from the mapper. Returns whether any
    /// space moved.
    pub fn update_current_state(&mut self) -> bool {
        let before: FxHashMap<IntervalId, LayoutRegion> = self
            .model
            .intervals()
            .map(|node| (node.id(), *node.current_space()))
            .collect();
        visual::refresh_all(&mut self.model, &self.mapper);
        self.model
            .intervals()
            .any(|node| before.get(&node.id()) != Some(node.current_space()))
    }

    /// The host resized a container; pick up its new geometry.
    pub fn designer_resized(&mut self, container: &ComponentId) -> Result<(), DesignerError> {
        self.ensure_active()?;
        self.ensure_container(container)?;
        visual::refresh_container(&mut self.model, &self.mapper, container);
        let hints = self.paint_hints();
        self.mapper.repaint_designer(hints);
        Ok(())
    }

    /// Undo what the last committed drag did on one axis, keeping the
    /// other. Only possible while nothing changed since that drag.
    pub fn restore_dimension(&mut self, dim: Dimension) -> Result<bool, DesignerError> {
        self.ensure_idle()?;
        let Some(mut edit) = self.last_edit else {
            return Ok(false);
        };
        if edit.end != self.model.change_mark() {
            self.last_edit = None;
            return Ok(false);
        }
        let Some((start, end)) = edit.axes[dim.index()].take() else {
            return Ok(false);
        };
        let reverted = self.model.revert(start, end)?;
        edit.end = self.model.change_mark();
        self.last_edit = edit.axes.iter().any(Option::is_some).then_some(edit);
        visual::refresh_all(&mut self.model, &self.mapper);
        let hints = self.paint_hints();
        self.mapper.repaint_designer(hints);
        #[cfg(feature = "tracing")]
        log_restore(dim, reverted);
        Ok(reverted)
    }
}

/// Groups under `root` (root included), children before parents.
fn groups_bottom_up(model: &LayoutModel, root: IntervalId) -> Vec<IntervalId> {
    let mut out = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if !model.is_group(id) {
            continue;
        }
        if expanded {
            out.push(id);
            continue;
        }
        stack.push((id, true));
        for child in model.children(id) {
            stack.push((*child, false));
        }
    }
    out
}

#[cfg(feature = "tracing")]
fn log_drag_started(kind: DragKind, components: usize) {
    tracing::debug!(message = "designer.drag_started", kind = ?kind, components);
}

/// Gap right next to `interval` on `edge`, looking out through enclosing
/// groups while the interval sits at their end.
fn adjacent_gap(model: &LayoutModel, interval: IntervalId, edge: Edge) -> Option<IntervalId> {
    let mut current = interval;
    while let Some(parent) = model.parent(current) {
        if model.is_sequential(parent)
            && let Some(next) = model.neighbor(current, edge, false)
        {
            return model.is_gap(next).then_some(next);
        }
        current = parent;
    }
    None
}

#[cfg(feature = "tracing")]
fn log_edit(event: &'static str, components: usize, changed: bool) {
    tracing::debug!(message = event, components, changed);
}

#[cfg(feature = "tracing")]
fn log_restore(dim: Dimension, reverted: bool) {
    tracing::debug!(message = "designer.restore_dimension", dim = dim.as_str(), reverted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::StaticMapper;
    use formlay_core::Size;

    const H: Dimension = Dimension::Horizontal;
    const V: Dimension = Dimension::Vertical;

    fn designer() -> LayoutDesigner<StaticMapper> {
        let mut model = LayoutModel::new();
        model
            .create_container(ComponentId::from("form"), Size::new(400, 300))
            .expect("form");
        let mut mapper = StaticMapper::new();
        mapper.set_interior("form", Rect::from_size(400, 300));
        let mut designer = LayoutDesigner::new(model, mapper);
        designer.update_current_state();
        designer
    }

    fn form() -> ComponentId {
        ComponentId::from("form")
    }

    #[test]
    fn inactive_session_rejects_edits() {
        let mut designer = designer();
        designer.set_active(false);
        let err = designer
            .add_component(ComponentId::from("a"), &form(), Rect::new(10, 10, 80, 20))
            .expect_err("inactive");
        assert_eq!(err, DesignerError::Inactive);
        assert!(designer.model().component(&ComponentId::from("a")).is_none());
    }

    #[test]
    fn second_drag_is_rejected() {
        let mut designer = designer();
        designer
            .start_adding(
                vec![ComponentId::from("a")],
                vec![Rect::new(10, 10, 80, 20)],
                Point::new(10, 10),
                Some(form()),
            )
            .expect("start");
        let err = designer
            .start_adding(
                vec![ComponentId::from("b")],
                vec![Rect::new(10, 40, 80, 20)],
                Point::new(10, 40),
                Some(form()),
            )
            .expect_err("busy");
        assert_eq!(err, DesignerError::DragInProgress);
    }

    #[test]
    fn cancelled_add_forgets_the_component() {
        let mut designer = designer();
        let mark = designer.model().change_mark();
        designer
            .start_adding(
                vec![ComponentId::from("a")],
                vec![Rect::new(10, 10, 80, 20)],
                Point::new(10, 10),
                Some(form()),
            )
            .expect("start");
        designer.move_to(Point::new(30, 30), None, true, None).expect("move");
        assert!(!designer.end_moving(false).expect("cancel"));
        assert!(designer.model().component(&ComponentId::from("a")).is_none());
        assert!(designer.drag().is_none());
        // Registering and discarding both count as changes.
        assert!(designer.model().changed_since(mark));
    }

    #[test]
    fn mismatched_bounds_are_rejected() {
        let mut designer = designer();
        let err = designer
            .start_adding(vec![ComponentId::from("a")], Vec::new(), Point::new(0, 0), Some(form()))
            .expect_err("mismatch");
        assert_eq!(err, DesignerError::LengthMismatch { sources: 1, targets: 0 });
    }

    #[test]
    fn unspecified_component_lives_in_its_own_layer() {
        let mut designer = designer();
        let a = ComponentId::from("a");
        designer.model_mut().create_component(a.clone()).expect("a");
        assert!(designer.add_unspecified_component(&a, &form()).expect("add"));
        assert!(designer.is_unplaced_component(&a));
        let layers = designer.model().component(&form()).expect("form").layers().len();
        assert_eq!(layers, 2);
        assert!(!designer.model().invariant_report().has_errors());

        designer.remove_components(std::slice::from_ref(&a)).expect("remove");
        let layers = designer.model().component(&form()).expect("form").layers().len();
        assert_eq!(layers, 1);
    }

    #[test]
    fn resizing_switch_round_trips() {
        let mut designer = designer();
        let a = ComponentId::from("a");
        designer
            .add_component(a.clone(), &form(), Rect::new(10, 10, 80, 20))
            .expect("add");
        assert!(!designer.is_component_resizing(&a, H));
        assert_eq!(designer.adjustable_component_alignment(&a, H), [false, true]);

        assert!(designer.set_component_resizing(&a, H, true).expect("on"));
        assert!(designer.is_component_resizing(&a, H));
        assert_eq!(designer.adjustable_component_alignment(&a, H), [false, false]);

        assert!(designer.set_component_resizing(&a, H, false).expect("off"));
        assert!(!designer.is_component_resizing(&a, H));
        assert!(!designer.model().invariant_report().has_errors());
    }

    #[test]
    fn default_size_clears_explicit_sizes() {
        let mut designer = designer();
        let a = ComponentId::from("a");
        designer
            .add_component(a.clone(), &form(), Rect::new(10, 10, 80, 20))
            .expect("add");
        let interval = designer.model().component_interval(&a, V).expect("v");
        designer
            .model_mut()
            .set_interval_sizes(interval, IntervalSizes::new(20, 20, 20))
            .expect("sizes");
        assert!(designer.set_default_size(&a).expect("default"));
        assert_eq!(
            designer.model().sizes(interval),
            IntervalSizes::new(NOT_EXPLICITLY_DEFINED, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE)
        );
    }

    #[test]
    fn groups_come_children_first() {
        let mut designer = designer();
        designer
            .add_component(ComponentId::from("a"), &form(), Rect::new(10, 10, 80, 20))
            .expect("add");
        let root = designer.model().default_roots(&form()).expect("roots")[0];
        let groups = groups_bottom_up(designer.model(), root);
        assert_eq!(groups.last().copied(), Some(root));
        assert!(groups.len() >= 2);
    }
}
