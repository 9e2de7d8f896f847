//! Components and containers known to the layout model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interval::IntervalId;
use crate::types::Dimension;

/// Host-assigned identifier of a visual component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One widget in the design.
///
/// A component owns exactly one interval per axis. A container additionally
/// owns sub-components and one or more root pairs ("layers"); the first pair
/// is the default layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutComponent {
    pub(crate) id: ComponentId,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) intervals: [IntervalId; 2],
    pub(crate) container: bool,
    pub(crate) sub_components: Vec<ComponentId>,
    pub(crate) layers: Vec<[IntervalId; 2]>,
}

impl LayoutComponent {
    #[must_use]
    pub const fn id(&self) -> &ComponentId {
        &self.id
    }

    #[must_use]
    pub const fn parent(&self) -> Option<&ComponentId> {
        self.parent.as_ref()
    }

    /// The component's own interval on an axis.
    #[must_use]
    pub const fn interval(&self, dim: Dimension) -> IntervalId {
        self.intervals[dim.index()]
    }

    #[must_use]
    pub const fn intervals(&self) -> [IntervalId; 2] {
        self.intervals
    }

    #[must_use]
    pub const fn is_container(&self) -> bool {
        self.container
    }

    #[must_use]
    pub fn sub_components(&self) -> &[ComponentId] {
        &self.sub_components
    }

    #[must_use]
    pub fn layers(&self) -> &[[IntervalId; 2]] {
        &self.layers
    }

    /// Root pair of the default layer.
    #[must_use]
    pub fn default_roots(&self) -> Option<[IntervalId; 2]> {
        self.layers.first().copied()
    }
}
