//! Axis, edge and alignment vocabulary shared by the model and the designer.

use serde::{Deserialize, Serialize};

/// Size value meaning "derive from content".
pub const NOT_EXPLICITLY_DEFINED: i32 = -1;

/// Size value meaning "mirror the preferred size".
///
/// On a group's maximum size this suppresses resizing of the whole group.
pub const USE_PREFERRED_SIZE: i32 = -2;

/// Maximum size meaning "grows without limit".
pub const MAX_SIZE: i32 = 32767;

/// One layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Horizontal,
    Vertical,
}

impl Dimension {
    /// Both axes in canonical order.
    pub const ALL: [Self; 2] = [Self::Horizontal, Self::Vertical];

    /// Stable array index (horizontal = 0).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Horizontal => 0,
            Self::Vertical => 1,
        }
    }

    /// The orthogonal axis.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

/// One side of an interval along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Leading,
    Trailing,
}

impl Edge {
    pub const ALL: [Self; 2] = [Self::Leading, Self::Trailing];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Leading => 0,
            Self::Trailing => 1,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Leading => Self::Trailing,
            Self::Trailing => Self::Leading,
        }
    }

    #[must_use]
    pub const fn alignment(self) -> Alignment {
        match self {
            Self::Leading => Alignment::Leading,
            Self::Trailing => Alignment::Trailing,
        }
    }
}

/// Alignment of an interval within a parallel group.
///
/// `Default` means "follow the group alignment".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Default,
    Leading,
    Trailing,
    Center,
    Baseline,
}

impl Alignment {
    /// The edge this alignment anchors to, if it is an edge alignment.
    #[must_use]
    pub const fn edge(self) -> Option<Edge> {
        match self {
            Self::Leading => Some(Edge::Leading),
            Self::Trailing => Some(Edge::Trailing),
            Self::Default | Self::Center | Self::Baseline => None,
        }
    }

    /// Swap leading and trailing; other alignments map to themselves.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Leading => Self::Trailing,
            Self::Trailing => Self::Leading,
            other => other,
        }
    }

    /// Slot of this alignment inside a [`crate::LayoutRegion`] axis.
    #[must_use]
    pub const fn region_slot(self) -> usize {
        match self {
            Self::Default | Self::Leading => 0,
            Self::Trailing => 1,
            Self::Center => 2,
            Self::Baseline => 3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Leading => "leading",
            Self::Trailing => "trailing",
            Self::Center => "center",
            Self::Baseline => "baseline",
        }
    }
}

impl From<Edge> for Alignment {
    fn from(edge: Edge) -> Self {
        edge.alignment()
    }
}

/// Preferred-gap flavor of a gap leaf without an explicit size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingType {
    Related,
    Unrelated,
    Separate,
    Indent,
}

impl PaddingType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Unrelated => "unrelated",
            Self::Separate => "separate",
            Self::Indent => "indent",
        }
    }
}
