//! Change journal backing change marks and point-in-time revert.

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, LayoutComponent};
use crate::interval::{IntervalAttributes, IntervalId, IntervalSizes};
use crate::types::{Alignment, PaddingType};

/// Monotonic stamp of the model's change journal.
///
/// Two equal marks taken at different times mean nothing changed in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeMark(pub(crate) u64);

impl ChangeMark {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// One primitive mutation with the data needed to undo it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Change {
    IntervalCreated {
        id: IntervalId,
    },
    IntervalAdded {
        id: IntervalId,
        parent: IntervalId,
        index: usize,
    },
    IntervalRemoved {
        id: IntervalId,
        parent: IntervalId,
        index: usize,
    },
    SizesChanged {
        id: IntervalId,
        old: IntervalSizes,
    },
    AlignmentChanged {
        id: IntervalId,
        old: Alignment,
    },
    GroupAlignmentChanged {
        id: IntervalId,
        old: Alignment,
    },
    PaddingChanged {
        id: IntervalId,
        old: Option<PaddingType>,
    },
    AttributesChanged {
        id: IntervalId,
        old: IntervalAttributes,
    },
    ComponentCreated {
        id: ComponentId,
    },
    ComponentAttached {
        id: ComponentId,
        parent: ComponentId,
        index: usize,
    },
    ComponentDetached {
        id: ComponentId,
        parent: ComponentId,
        index: usize,
    },
    ComponentDiscarded {
        component: LayoutComponent,
    },
    LayerAdded {
        container: ComponentId,
        index: usize,
    },
    LayerRemoved {
        container: ComponentId,
        index: usize,
        roots: [IntervalId; 2],
    },
}

impl Change {
    #[cfg(feature = "tracing")]
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::IntervalCreated { .. } => "interval_created",
            Self::IntervalAdded { .. } => "interval_added",
            Self::IntervalRemoved { .. } => "interval_removed",
            Self::SizesChanged { .. } => "sizes_changed",
            Self::AlignmentChanged { .. } => "alignment_changed",
            Self::GroupAlignmentChanged { .. } => "group_alignment_changed",
            Self::PaddingChanged { .. } => "padding_changed",
            Self::AttributesChanged { .. } => "attributes_changed",
            Self::ComponentCreated { .. } => "component_created",
            Self::ComponentAttached { .. } => "component_attached",
            Self::ComponentDetached { .. } => "component_detached",
            Self::ComponentDiscarded { .. } => "component_discarded",
            Self::LayerAdded { .. } => "layer_added",
            Self::LayerRemoved { .. } => "layer_removed",
        }
    }
}

/// Journal entry stamped with the sequence number it produced.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChangeRecord {
    pub(crate) sequence: u64,
    pub(crate) change: Change,
}
