//! Aligning several components along one edge.
//!
//! The component reaching furthest toward the requested edge stays where
//! it is. Every other component is taken out of the tree and put in
//! parallel with it, moved so the edges coincide.

use formlay_core::{Alignment, Dimension, IntervalId, LayoutModel, LayoutRegion};

use crate::feeder::LayoutFeeder;

/// Anchor for an alignment: the interval whose edge the others take.
///
/// For `Leading` this is the one starting first, for `Trailing` the one
/// ending last. Other alignments keep the first interval.
#[must_use]
pub fn alignment_anchor(
    model: &LayoutModel,
    intervals: &[IntervalId],
    dim: Dimension,
    alignment: Alignment,
) -> Option<IntervalId> {
    let key = |id: IntervalId| model.current_space(id).position(dim, alignment);
    match alignment {
        Alignment::Leading => intervals.iter().min_by_key(|id| key(**id)).copied(),
        Alignment::Trailing => intervals.iter().max_by_key(|id| key(**id)).copied(),
        _ => intervals.first().copied(),
    }
}

pub struct LayoutAligner<'f, 'a> {
    feeder: &'f mut LayoutFeeder<'a>,
}

impl<'f, 'a> LayoutAligner<'f, 'a> {
    pub fn new(feeder: &'f mut LayoutFeeder<'a>) -> Self {
        Self { feeder }
    }

    /// Align `intervals` (all under one root on `dim`) at `alignment`.
    ///
    /// With `closed`, the resulting group stops resizing so the aligned
    /// edges keep together when the container grows. Returns the parallel
    /// group holding the aligned intervals.
    pub fn align(
        &mut self,
        intervals: &[IntervalId],
        closed: bool,
        dim: Dimension,
        alignment: Alignment,
    ) -> Option<IntervalId> {
        let (anchor, root, anchor_position) = {
            let model = self.feeder.operations().model();
            let anchor = alignment_anchor(model, intervals, dim, alignment)?;
            let position = model.current_space(anchor).position(dim, alignment);
            (anchor, model.root_of(anchor), position)
        };

        for &interval in intervals {
            if interval == anchor {
                continue;
            }
            let ops = self.feeder.operations();
            let Some(parent) = ops.model().parent(interval) else {
                continue;
            };
            let was_resizing = ops.model().want_resize(interval);
            let mut space = ops.space(interval);
            let index = ops.remove(interval);
            ops.interval_removed(parent, index, was_resizing, dim);
            if space.is_set(dim) && anchor_position != LayoutRegion::UNKNOWN {
                let offset = anchor_position - space.position(dim, alignment);
                space.translate(dim, offset);
            }
            ops.model_mut().set_current_space(interval, space);
            self.feeder
                .align_in_parallel(interval, anchor, alignment, &space, dim, root);
            #[cfg(feature = "tracing")]
            log_aligned(interval, anchor, alignment);
        }

        let ops = self.feeder.operations();
        let group = ops
            .model()
            .parent(anchor)
            .filter(|parent| ops.model().is_parallel(*parent))?;
        if closed && ops.model().parent(group).is_some() {
            ops.suppress_group_resizing(group);
        }
        Some(group)
    }
}

#[cfg(feature = "tracing")]
fn log_aligned(interval: IntervalId, anchor: IntervalId, alignment: Alignment) {
    tracing::debug!(
        message = "aligner.align",
        interval = interval.get(),
        anchor = anchor.get(),
        alignment = alignment.as_str()
    );
}
