//! Drag bookkeeping and snap hints.
//!
//! Pointer tracking and snap geometry belong to the host. The host answers
//! [`SnapProvider::positions`] with what the moving formation is currently
//! snapped to; [`DragState`] keeps the bounds of the formation while the
//! pointer moves. Nothing here touches the layout model.

use formlay_core::{
    Alignment, ChangeMark, ComponentId, Dimension, Edge, IntervalId, LayoutModel, LayoutRegion,
    PaddingType, Point, Rect,
};

use crate::mapper::VisualMapper;

/// What the moving formation is snapped to on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionDef {
    /// Snap target; `None` means the container border.
    pub interval: Option<IntervalId>,
    /// Edge or alignment point of the moving formation that snapped.
    pub alignment: Alignment,
    /// Adjacent to the target (sequential) rather than aligned with it.
    pub next_to: bool,
    pub snapped: bool,
    pub padding: Option<PaddingType>,
    /// Offset still to apply to the formation so it lands on the snap.
    pub distance: i32,
}

impl PositionDef {
    /// Aligned in parallel with `interval` at `alignment`.
    #[must_use]
    pub const fn aligned(interval: IntervalId, alignment: Alignment) -> Self {
        Self {
            interval: Some(interval),
            alignment,
            next_to: false,
            snapped: true,
            padding: None,
            distance: 0,
        }
    }

    /// Next to `interval` on its `edge` side, separated by `padding`.
    #[must_use]
    pub const fn next_to(interval: IntervalId, edge: Edge, padding: Option<PaddingType>) -> Self {
        Self {
            interval: Some(interval),
            alignment: edge.opposite().alignment(),
            next_to: true,
            snapped: true,
            padding,
            distance: 0,
        }
    }

    #[must_use]
    pub const fn with_distance(mut self, distance: i32) -> Self {
        self.distance = distance;
        self
    }
}

/// Host-side snap geometry.
pub trait SnapProvider {
    /// Per-axis snap for the formation at `moving`.
    fn positions(
        &self,
        model: &LayoutModel,
        mapper: &dyn VisualMapper,
        roots: [IntervalId; 2],
        moving: &LayoutRegion,
        kind: DragKind,
    ) -> [Option<PositionDef>; 2];
}

/// Provider that never snaps; placement follows plain geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSnap;

impl SnapProvider for NoSnap {
    fn positions(
        &self,
        _model: &LayoutModel,
        _mapper: &dyn VisualMapper,
        _roots: [IntervalId; 2],
        _moving: &LayoutRegion,
        _kind: DragKind,
    ) -> [Option<PositionDef>; 2] {
        [None, None]
    }
}

/// Fixed answer, handy for scripted edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedSnap(pub [Option<PositionDef>; 2]);

impl SnapProvider for FixedSnap {
    fn positions(
        &self,
        _model: &LayoutModel,
        _mapper: &dyn VisualMapper,
        _roots: [IntervalId; 2],
        _moving: &LayoutRegion,
        _kind: DragKind,
    ) -> [Option<PositionDef>; 2] {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Adding,
    Moving,
    Resizing,
}

/// State of one drag gesture, from start to commit or cancel.
#[derive(Debug, Clone)]
pub struct DragState {
    kind: DragKind,
    components: Vec<ComponentId>,
    original: Vec<Rect>,
    moving: Vec<Rect>,
    hotspot: Point,
    resize_edges: [Option<Edge>; 2],
    target: Option<ComponentId>,
    lock_dimension: Option<Dimension>,
    positions: [Option<PositionDef>; 2],
    start_mark: ChangeMark,
}

impl DragState {
    pub(crate) fn new(
        kind: DragKind,
        components: Vec<ComponentId>,
        bounds: Vec<Rect>,
        hotspot: Point,
        resize_edges: [Option<Edge>; 2],
        target: Option<ComponentId>,
        start_mark: ChangeMark,
    ) -> Self {
        Self {
            kind,
            components,
            moving: bounds.clone(),
            original: bounds,
            hotspot,
            resize_edges,
            target,
            lock_dimension: None,
            positions: [None, None],
            start_mark,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DragKind {
        self.kind
    }

    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    #[must_use]
    pub fn original_bounds(&self) -> &[Rect] {
        &self.original
    }

    #[must_use]
    pub fn moving_bounds(&self) -> &[Rect] {
        &self.moving
    }

    /// Edge being dragged on each axis while resizing.
    #[must_use]
    pub const fn resize_edges(&self) -> [Option<Edge>; 2] {
        self.resize_edges
    }

    #[must_use]
    pub fn is_resizing(&self, dim: Dimension) -> bool {
        self.resize_edges[dim.index()].is_some()
    }

    #[must_use]
    pub const fn target_container(&self) -> Option<&ComponentId> {
        self.target.as_ref()
    }

    #[must_use]
    pub const fn lock_dimension(&self) -> Option<Dimension> {
        self.lock_dimension
    }

    #[must_use]
    pub const fn positions(&self) -> [Option<PositionDef>; 2] {
        self.positions
    }

    pub(crate) const fn start_mark(&self) -> ChangeMark {
        self.start_mark
    }

    pub(crate) fn set_target(&mut self, target: Option<ComponentId>) {
        self.target = target;
    }

    /// Union of the moving bounds.
    #[must_use]
    pub fn moving_region(&self) -> LayoutRegion {
        region_of(&self.moving)
    }

    /// Recompute the moving bounds for a pointer at `point`.
    pub(crate) fn move_to(&mut self, point: Point, lock_dimension: Option<Dimension>) {
        self.lock_dimension = lock_dimension;
        self.positions = [None, None];
        let mut delta = [point.x - self.hotspot.x, point.y - self.hotspot.y];
        if let Some(dim) = lock_dimension {
            delta[dim.index()] = 0;
        }
        for (moving, original) in self.moving.iter_mut().zip(&self.original) {
            *moving = match self.kind {
                DragKind::Adding | DragKind::Moving => original.translate(delta[0], delta[1]),
                DragKind::Resizing => resized(*original, self.resize_edges, delta),
            };
        }
    }

    /// Keep the formation inside `interior`. A moved formation is shifted
    /// back in as a whole; a dragged edge stops at the border.
    pub(crate) fn keep_within(&mut self, interior: Rect) {
        for dim in Dimension::ALL {
            let (lo, hi) = (interior.start(dim), interior.end(dim));
            match self.kind {
                DragKind::Resizing => {
                    let Some(edge) = self.resize_edges[dim.index()] else {
                        continue;
                    };
                    for moving in &mut self.moving {
                        let (start, end) = (moving.start(dim), moving.end(dim));
                        *moving = match edge {
                            Edge::Leading => moving.with_span(dim, start.max(lo).min(end), end),
                            Edge::Trailing => moving.with_span(dim, start, end.min(hi).max(start)),
                        };
                    }
                }
                DragKind::Adding | DragKind::Moving => {
                    let region = self.moving_region();
                    if !region.is_set(dim) {
                        continue;
                    }
                    let (start, end) = (region.leading(dim), region.trailing(dim));
                    let shift = if start < lo {
                        lo - start
                    } else if end > hi {
                        (hi - end).max(lo - start)
                    } else {
                        0
                    };
                    if shift == 0 {
                        continue;
                    }
                    for moving in &mut self.moving {
                        *moving = match dim {
                            Dimension::Horizontal => moving.translate(shift, 0),
                            Dimension::Vertical => moving.translate(0, shift),
                        };
                    }
                }
            }
        }
    }

    /// Shift or stretch the formation onto the snapped positions.
    pub(crate) fn apply_snap(&mut self, positions: [Option<PositionDef>; 2]) {
        for dim in Dimension::ALL {
            if self.lock_dimension == Some(dim) {
                continue;
            }
            let Some(position) = positions[dim.index()] else {
                continue;
            };
            self.positions[dim.index()] = Some(position);
            if !position.snapped || position.distance == 0 {
                continue;
            }
            let offset = position.distance;
            for moving in &mut self.moving {
                *moving = match self.resize_edges[dim.index()] {
                    Some(edge) if self.kind == DragKind::Resizing => {
                        stretch(*moving, dim, edge, offset)
                    }
                    _ => match dim {
                        Dimension::Horizontal => moving.translate(offset, 0),
                        Dimension::Vertical => moving.translate(0, offset),
                    },
                };
            }
        }
    }
}

fn resized(original: Rect, edges: [Option<Edge>; 2], delta: [i32; 2]) -> Rect {
    let mut rect = original;
    for dim in Dimension::ALL {
        if let Some(edge) = edges[dim.index()] {
            rect = stretch(rect, dim, edge, delta[dim.index()]);
        }
    }
    rect
}

fn stretch(rect: Rect, dim: Dimension, edge: Edge, offset: i32) -> Rect {
    let (mut start, mut end) = (rect.start(dim), rect.end(dim));
    match edge {
        Edge::Leading => start = (start + offset).min(end),
        Edge::Trailing => end = (end + offset).max(start),
    }
    rect.with_span(dim, start, end)
}

pub(crate) fn region_of(bounds: &[Rect]) -> LayoutRegion {
    let mut region = LayoutRegion::new();
    for rect in bounds {
        region.expand(&LayoutRegion::from_rect(*rect, None), None);
    }
    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use formlay_core::Size;

    fn drag(kind: DragKind, edges: [Option<Edge>; 2]) -> DragState {
        DragState::new(
            kind,
            vec![ComponentId::from("a")],
            vec![Rect::new(10, 10, 90, 20)],
            Point::new(50, 20),
            edges,
            None,
            LayoutModel::new().change_mark(),
        )
    }

    #[test]
    fn moving_translates_bounds() {
        let mut state = drag(DragKind::Moving, [None, None]);
        state.move_to(Point::new(60, 25), None);
        assert_eq!(state.moving_bounds()[0], Rect::new(20, 15, 90, 20));
        assert_eq!(state.original_bounds()[0], Rect::new(10, 10, 90, 20));
    }

    #[test]
    fn locked_axis_stays_put() {
        let mut state = drag(DragKind::Moving, [None, None]);
        state.move_to(Point::new(60, 25), Some(Dimension::Vertical));
        assert_eq!(state.moving_bounds()[0], Rect::new(20, 10, 90, 20));
    }

    #[test]
    fn resizing_moves_only_the_dragged_edge() {
        let mut state = drag(DragKind::Resizing, [Some(Edge::Trailing), None]);
        state.move_to(Point::new(100, 40), None);
        assert_eq!(state.moving_bounds()[0], Rect::new(10, 10, 140, 20));
        state.move_to(Point::new(-200, 20), None);
        assert_eq!(state.moving_bounds()[0].width, 0);
    }

    #[test]
    fn snap_distance_is_applied() {
        let mut state = drag(DragKind::Moving, [None, None]);
        state.move_to(Point::new(50, 20), None);
        let target = IntervalId::MIN;
        state.apply_snap([
            Some(PositionDef::aligned(target, Alignment::Leading).with_distance(-3)),
            None,
        ]);
        assert_eq!(state.moving_bounds()[0].x, 7);
        assert_eq!(state.positions()[0].map(|p| p.interval), Some(Some(target)));
    }

    #[test]
    fn moved_formation_is_shifted_back_into_the_container() {
        let mut state = drag(DragKind::Moving, [None, None]);
        state.move_to(Point::new(8, 320), None);
        state.keep_within(Rect::from_size(400, 300));
        let moved = state.moving_bounds()[0];
        assert_eq!((moved.x, moved.y), (0, 280));
        assert_eq!(moved.size(), Size::new(90, 20));
    }

    #[test]
    fn resized_edge_stops_at_the_container_border() {
        let mut state = drag(DragKind::Resizing, [Some(Edge::Leading), Some(Edge::Trailing)]);
        state.move_to(Point::new(20, 400), None);
        state.keep_within(Rect::from_size(400, 300));
        assert_eq!(state.moving_bounds()[0], Rect::from_edges(0, 10, 100, 300));
    }

    #[test]
    fn moving_region_covers_all_bounds() {
        let region = region_of(&[Rect::new(0, 0, 10, 10), Rect::new(20, 5, 10, 10)]);
        assert_eq!(region.leading(Dimension::Horizontal), 0);
        assert_eq!(region.trailing(Dimension::Horizontal), 30);
        assert_eq!(region.trailing(Dimension::Vertical), 15);
    }
}
