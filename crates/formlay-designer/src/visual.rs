//! Current-space refresh.
//!
//! After the host re-lays out a container, the cached regions of every
//! interval under it are recomputed from component bounds:
//!
//! 1. Component leaves take the mapper's bounds (and baseline).
//! 2. Groups take the union of their content, bottom-up, on both axes.
//! 3. Along each tree's own axis, spans are pushed down from the root:
//!    gaps fill the space between their neighbors, and a sequence inside a
//!    parallel group reaches the group's edge wherever it ends with a gap.

use formlay_core::{ComponentId, Dimension, IntervalId, LayoutModel, LayoutRegion};

use crate::mapper::VisualMapper;

/// Region of a component as currently painted, baseline included.
#[must_use]
pub fn component_region(mapper: &dyn VisualMapper, id: &ComponentId) -> Option<LayoutRegion> {
    let bounds = mapper.component_bounds(id)?;
    let baseline = mapper
        .baseline_position(id, bounds.size())
        .map(|offset| bounds.y + offset);
    Some(LayoutRegion::from_rect(bounds, baseline))
}

/// Refresh every top-level container and everything nested in it.
pub fn refresh_all(model: &mut LayoutModel, mapper: &dyn VisualMapper) {
    let tops: Vec<ComponentId> = model.top_containers().map(|c| c.id().clone()).collect();
    for container in tops {
        refresh_container(model, mapper, &container);
    }
}

/// Refresh one container's layers and its nested containers.
pub fn refresh_container(model: &mut LayoutModel, mapper: &dyn VisualMapper, container: &ComponentId) {
    let Some(component) = model.component(container) else {
        return;
    };
    let subs = component.sub_components().to_vec();
    let layers = component.layers().to_vec();
    let interior = mapper
        .container_interior(container)
        .or_else(|| mapper.component_bounds(container))
        .map(|rect| LayoutRegion::from_rect(rect, None));

    for sub in &subs {
        let Some(region) = component_region(mapper, sub) else {
            continue;
        };
        for dim in Dimension::ALL {
            if let Some(interval) = model.component_interval(sub, dim) {
                model.set_current_space(interval, region);
            }
        }
    }

    for roots in &layers {
        for dim in Dimension::ALL {
            let root = roots[dim.index()];
            let content = union_pass(model, root);
            let region = match interior {
                Some(interior) => interior,
                None => content,
            };
            model.set_current_space(root, region);
            if region.is_set(dim) {
                spread(model, root, dim, region.leading(dim), region.trailing(dim));
            }
        }
    }

    #[cfg(feature = "tracing")]
    log_refresh(container, subs.len(), layers.len());

    for sub in &subs {
        if model.component(sub).is_some_and(|c| c.is_container()) {
            refresh_container(model, mapper, sub);
        }
    }
}

fn union_pass(model: &mut LayoutModel, id: IntervalId) -> LayoutRegion {
    if model.is_component(id) {
        return model.current_space(id);
    }
    if !model.is_group(id) {
        return LayoutRegion::new();
    }
    let mut region = LayoutRegion::new();
    let children = model.children(id).to_vec();
    for child in children {
        let child_region = union_pass(model, child);
        region.expand(&child_region, None);
    }
    model.set_current_space(id, region);
    region
}

fn content_span(model: &LayoutModel, id: IntervalId, dim: Dimension) -> Option<(i32, i32)> {
    if model.is_gap(id) {
        return None;
    }
    let space = model.current_space(id);
    space
        .is_set(dim)
        .then(|| (space.leading(dim), space.trailing(dim)))
}

fn spread(model: &mut LayoutModel, id: IntervalId, dim: Dimension, leading: i32, trailing: i32) {
    model.set_current_span(id, dim, leading, trailing);
    let children = model.children(id).to_vec();
    if children.is_empty() {
        return;
    }
    if model.is_sequential(id) {
        let spans: Vec<Option<(i32, i32)>> = children
            .iter()
            .map(|child| content_span(model, *child, dim))
            .collect();
        let mut cursor = leading;
        for (index, child) in children.iter().enumerate() {
            let (start, end) = match spans[index] {
                Some(span) => span,
                None => {
                    let next = spans[index + 1..]
                        .iter()
                        .flatten()
                        .next()
                        .map_or(trailing, |span| span.0);
                    (cursor, next.max(cursor))
                }
            };
            cursor = end;
            spread(model, *child, dim, start, end);
        }
        return;
    }
    for child in children {
        let (start, end) = match content_span(model, child, dim) {
            None => (leading, trailing),
            Some((start, end)) if model.is_sequential(child) => {
                let kids = model.children(child);
                let opens_leading = kids.first().is_some_and(|k| model.is_gap(*k));
                let opens_trailing = kids.last().is_some_and(|k| model.is_gap(*k));
                (
                    if opens_leading { leading } else { start },
                    if opens_trailing { trailing } else { end },
                )
            }
            Some(span) => span,
        };
        spread(model, child, dim, start, end);
    }
}

#[cfg(feature = "tracing")]
fn log_refresh(container: &ComponentId, components: usize, layers: usize) {
    tracing::trace!(
        message = "visual.refresh",
        container = %container,
        components,
        layers
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::StaticMapper;
    use formlay_core::{GroupKind, IntervalSizes, Rect, Size};

    const H: Dimension = Dimension::Horizontal;
    const V: Dimension = Dimension::Vertical;

    #[test]
    fn gaps_fill_between_components() {
        let mut model = LayoutModel::new();
        let form = ComponentId::from("form");
        let roots = model.create_container(form.clone(), Size::new(400, 300)).expect("form");
        let root = roots[0];
        let filler = model.children(root)[0];
        model.remove_interval(filler).expect("filler");
        let a = ComponentId::from("a");
        let a_iv = model.create_component(a.clone()).expect("a")[0];
        model.attach_component(&a, &form).expect("attach");
        let lead = model.create_gap(H, IntervalSizes::fixed(10)).expect("lead");
        let trail = model.create_gap(H, IntervalSizes::resizing(300)).expect("trail");
        let seq = model.create_group(H, GroupKind::Sequential).expect("seq");
        model.add_interval(seq, root, None).expect("seq");
        for child in [lead, a_iv, trail] {
            model.add_interval(child, seq, None).expect("child");
        }

        let mut mapper = StaticMapper::new();
        mapper.set_interior("form", Rect::from_size(400, 300));
        mapper.set_bounds("a", Rect::new(10, 10, 90, 20));
        mapper.set_baseline("a", 14);
        refresh_all(&mut model, &mapper);

        let space = |id| model.current_space(id);
        assert_eq!((space(seq).leading(H), space(seq).trailing(H)), (0, 400));
        assert_eq!((space(lead).leading(H), space(lead).trailing(H)), (0, 10));
        assert_eq!((space(trail).leading(H), space(trail).trailing(H)), (100, 400));
        assert_eq!(space(a_iv).baseline(), Some(24));
        assert_eq!(space(seq).leading(V), 10);
        assert_eq!(space(root).trailing(V), 300);
    }

    #[test]
    fn missing_bounds_leave_spaces_unset() {
        let mut model = LayoutModel::new();
        let form = ComponentId::from("form");
        let roots = model.create_container(form, Size::new(100, 100)).expect("form");
        let mapper = StaticMapper::new();
        refresh_all(&mut model, &mapper);
        assert!(!model.current_space(roots[0]).is_set(H));
    }
}
