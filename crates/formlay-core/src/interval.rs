//! Interval tree nodes.
//!
//! Every node belongs to one axis of one container and is addressed by a
//! stable [`IntervalId`]. Leaves are components or gaps; inner nodes are
//! sequential or parallel groups.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::component::ComponentId;
use crate::error::ModelError;
use crate::region::LayoutRegion;
use crate::types::{
    Alignment, Dimension, MAX_SIZE, NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
};

/// Stable identifier for interval nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalId(u64);

impl IntervalId {
    /// Lowest valid interval ID.
    pub const MIN: Self = Self(1);

    /// Create a new interval ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, ModelError> {
        if raw == 0 {
            return Err(ModelError::ZeroIntervalId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, ModelError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(ModelError::IntervalIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for IntervalId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Engine bookkeeping flags carried by every interval.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IntervalAttributes: u8 {
        /// Structure already optimized in the current edit pass.
        const OPTIMIZED    = 0b0001;
        /// Size synthesized by the engine rather than set by the user.
        const SIZE_DIFF    = 0b0010;
        /// Size definition may be freely adjusted by the engine.
        const FLEX_SIZEDEF = 0b0100;
    }
}

/// The two group flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Sequential,
    Parallel,
}

/// What an interval node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntervalKind {
    /// Leaf wrapping one placed component.
    Component { component: ComponentId },
    /// Leaf of empty space. Without an explicit size the padding kind picks
    /// the preferred gap; `None` means the default related padding.
    Gap { padding: Option<PaddingType> },
    /// Children laid end to end.
    Sequential,
    /// Overlapping children aligned against `group_alignment`.
    Parallel { group_alignment: Alignment },
}

impl IntervalKind {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Component { .. } => "component",
            Self::Gap { .. } => "gap",
            Self::Sequential => "sequential",
            Self::Parallel { .. } => "parallel",
        }
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Sequential | Self::Parallel { .. })
    }

    #[must_use]
    pub const fn group_kind(&self) -> Option<GroupKind> {
        match self {
            Self::Sequential => Some(GroupKind::Sequential),
            Self::Parallel { .. } => Some(GroupKind::Parallel),
            Self::Component { .. } | Self::Gap { .. } => None,
        }
    }
}

/// Minimum/preferred/maximum size triple with sentinel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalSizes {
    pub min: i32,
    pub pref: i32,
    pub max: i32,
}

impl Default for IntervalSizes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl IntervalSizes {
    /// Everything derived from content.
    pub const DEFAULT: Self = Self::new(
        NOT_EXPLICITLY_DEFINED,
        NOT_EXPLICITLY_DEFINED,
        NOT_EXPLICITLY_DEFINED,
    );

    #[must_use]
    pub const fn new(min: i32, pref: i32, max: i32) -> Self {
        Self { min, pref, max }
    }

    /// Rigid size: min and max mirror `pref`.
    #[must_use]
    pub const fn fixed(pref: i32) -> Self {
        Self::new(USE_PREFERRED_SIZE, pref, USE_PREFERRED_SIZE)
    }

    /// Size that starts at `pref` and grows without limit.
    #[must_use]
    pub const fn resizing(pref: i32) -> Self {
        Self::new(NOT_EXPLICITLY_DEFINED, pref, MAX_SIZE)
    }

    /// True when the triple lets the interval grow beyond its preferred size.
    #[must_use]
    pub const fn allows_growth(&self) -> bool {
        self.max >= MAX_SIZE || (self.max >= 0 && self.pref >= 0 && self.max > self.pref)
    }
}

/// One node of an interval tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalNode {
    pub(crate) id: IntervalId,
    pub(crate) dimension: Dimension,
    pub(crate) kind: IntervalKind,
    pub(crate) parent: Option<IntervalId>,
    pub(crate) children: Vec<IntervalId>,
    pub(crate) alignment: Alignment,
    pub(crate) sizes: IntervalSizes,
    #[serde(with = "attribute_bits")]
    pub(crate) attributes: IntervalAttributes,
    #[serde(skip)]
    pub(crate) current: LayoutRegion,
}

impl IntervalNode {
    pub(crate) fn new(id: IntervalId, dimension: Dimension, kind: IntervalKind) -> Self {
        Self {
            id,
            dimension,
            kind,
            parent: None,
            children: Vec::new(),
            alignment: Alignment::Default,
            sizes: IntervalSizes::DEFAULT,
            attributes: IntervalAttributes::empty(),
            current: LayoutRegion::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> IntervalId {
        self.id
    }

    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        self.dimension
    }

    #[must_use]
    pub const fn kind(&self) -> &IntervalKind {
        &self.kind
    }

    #[must_use]
    pub const fn parent(&self) -> Option<IntervalId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[IntervalId] {
        &self.children
    }

    /// Alignment relative to the parent as stored (may be `Default`).
    #[must_use]
    pub const fn raw_alignment(&self) -> Alignment {
        self.alignment
    }

    #[must_use]
    pub const fn sizes(&self) -> IntervalSizes {
        self.sizes
    }

    #[must_use]
    pub const fn attributes(&self) -> IntervalAttributes {
        self.attributes
    }

    #[must_use]
    pub const fn current_space(&self) -> &LayoutRegion {
        &self.current
    }

    #[must_use]
    pub const fn is_gap(&self) -> bool {
        matches!(self.kind, IntervalKind::Gap { .. })
    }

    #[must_use]
    pub const fn is_component(&self) -> bool {
        matches!(self.kind, IntervalKind::Component { .. })
    }

    #[must_use]
    pub const fn is_sequential(&self) -> bool {
        matches!(self.kind, IntervalKind::Sequential)
    }

    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        matches!(self.kind, IntervalKind::Parallel { .. })
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        self.kind.is_group()
    }
}

mod attribute_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::IntervalAttributes;

    pub(super) fn serialize<S: Serializer>(
        attributes: &IntervalAttributes,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(attributes.bits())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IntervalAttributes, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        Ok(IntervalAttributes::from_bits_truncate(bits))
    }
}
