//! Visual queries answered by the host renderer.
//!
//! The designer never measures widgets itself. Everything it needs to know
//! about actual pixels goes through [`VisualMapper`]. [`StaticMapper`] is a
//! headless implementation backed by explicit tables, used for batch edits,
//! tests and benches.

use rustc_hash::FxHashMap;

use formlay_core::{ComponentId, Dimension, Edge, PaddingType, Rect, Size};

/// Paint switches forwarded with every repaint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintHints {
    pub alignment: bool,
    pub gaps: bool,
}

/// Pixel geometry provider.
///
/// All methods except the three commands at the bottom are pure queries.
pub trait VisualMapper {
    /// Current bounds of a component in designer coordinates.
    fn component_bounds(&self, id: &ComponentId) -> Option<Rect>;

    /// Interior area of a container (bounds minus insets).
    fn container_interior(&self, id: &ComponentId) -> Option<Rect>;

    fn component_minimum_size(&self, id: &ComponentId) -> Option<Size>;

    fn component_preferred_size(&self, id: &ComponentId) -> Option<Size>;

    /// Baseline offset from the top for the given size, if the component has one.
    fn baseline_position(&self, id: &ComponentId, size: Size) -> Option<i32>;

    /// Whether the component is naturally resizable along each axis.
    fn component_resizability(&self, _id: &ComponentId) -> [bool; 2] {
        [true, true]
    }

    /// Preferred padding between two components placed next to each other.
    fn preferred_padding(
        &self,
        leading: &ComponentId,
        trailing: &ComponentId,
        dim: Dimension,
        padding: PaddingType,
    ) -> i32;

    /// Preferred padding between a component and its container border.
    fn preferred_border_padding(&self, component: &ComponentId, dim: Dimension, edge: Edge)
    -> i32;

    /// Re-run the host layout of a container after the model changed.
    fn rebuild_layout(&mut self, container: &ComponentId);

    /// Hide or show a component (components being dragged are hidden).
    fn set_component_visibility(&mut self, id: &ComponentId, visible: bool);

    fn repaint_designer(&mut self, hints: PaintHints);
}

/// Headless mapper backed by explicit bounds and fixed paddings.
#[derive(Debug, Clone, Default)]
pub struct StaticMapper {
    bounds: FxHashMap<ComponentId, Rect>,
    interiors: FxHashMap<ComponentId, Rect>,
    preferred: FxHashMap<ComponentId, Size>,
    minimum: FxHashMap<ComponentId, Size>,
    baselines: FxHashMap<ComponentId, i32>,
    hidden: FxHashMap<ComponentId, bool>,
    rebuilds: usize,
    repaints: usize,
    last_hints: PaintHints,
}

/// Padding values used by [`StaticMapper`].
pub const STATIC_RELATED_PADDING: i32 = 6;
pub const STATIC_UNRELATED_PADDING: i32 = 12;
pub const STATIC_SEPARATE_PADDING: i32 = 18;
pub const STATIC_INDENT_PADDING: i32 = 12;
pub const STATIC_BORDER_PADDING: i32 = 10;

impl StaticMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bounds(&mut self, id: impl Into<ComponentId>, bounds: Rect) {
        self.bounds.insert(id.into(), bounds);
    }

    pub fn set_interior(&mut self, id: impl Into<ComponentId>, interior: Rect) {
        self.interiors.insert(id.into(), interior);
    }

    pub fn set_preferred_size(&mut self, id: impl Into<ComponentId>, size: Size) {
        self.preferred.insert(id.into(), size);
    }

    pub fn set_minimum_size(&mut self, id: impl Into<ComponentId>, size: Size) {
        self.minimum.insert(id.into(), size);
    }

    pub fn set_baseline(&mut self, id: impl Into<ComponentId>, baseline: i32) {
        self.baselines.insert(id.into(), baseline);
    }

    #[must_use]
    pub fn is_hidden(&self, id: &ComponentId) -> bool {
        self.hidden.get(id).copied().unwrap_or(false)
    }

    #[must_use]
    pub const fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    #[must_use]
    pub const fn repaint_count(&self) -> usize {
        self.repaints
    }

    #[must_use]
    pub const fn last_paint_hints(&self) -> PaintHints {
        self.last_hints
    }
}

impl VisualMapper for StaticMapper {
    fn component_bounds(&self, id: &ComponentId) -> Option<Rect> {
        self.bounds.get(id).copied()
    }

    fn container_interior(&self, id: &ComponentId) -> Option<Rect> {
        self.interiors.get(id).copied()
    }

    fn component_minimum_size(&self, id: &ComponentId) -> Option<Size> {
        self.minimum.get(id).copied()
    }

    fn component_preferred_size(&self, id: &ComponentId) -> Option<Size> {
        self.preferred.get(id).copied()
    }

    fn baseline_position(&self, id: &ComponentId, size: Size) -> Option<i32> {
        self.baselines
            .get(id)
            .copied()
            .filter(|baseline| *baseline >= 0 && *baseline <= size.height)
    }

    fn preferred_padding(
        &self,
        _leading: &ComponentId,
        _trailing: &ComponentId,
        _dim: Dimension,
        padding: PaddingType,
    ) -> i32 {
        match padding {
            PaddingType::Related => STATIC_RELATED_PADDING,
            PaddingType::Unrelated => STATIC_UNRELATED_PADDING,
            PaddingType::Separate => STATIC_SEPARATE_PADDING,
            PaddingType::Indent => STATIC_INDENT_PADDING,
        }
    }

    fn preferred_border_padding(
        &self,
        _component: &ComponentId,
        _dim: Dimension,
        _edge: Edge,
    ) -> i32 {
        STATIC_BORDER_PADDING
    }

    fn rebuild_layout(&mut self, _container: &ComponentId) {
        self.rebuilds += 1;
    }

    fn set_component_visibility(&mut self, id: &ComponentId, visible: bool) {
        self.hidden.insert(id.clone(), !visible);
    }

    fn repaint_designer(&mut self, hints: PaintHints) {
        self.repaints += 1;
        self.last_hints = hints;
    }
}
