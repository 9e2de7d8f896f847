#![forbid(unsafe_code)]

//! Core: interval trees, layout regions and the change journal.
//!
//! # Role in formlay
//! `formlay-core` is the data layer of the designer engine. It owns the
//! layout model that the designer (`formlay-designer`) edits while the user
//! drags, resizes and aligns components.
//!
//! # Primary responsibilities
//! - **LayoutModel**: arena of interval nodes plus the component registry.
//! - **Intervals**: components, gaps, sequential and parallel groups with
//!   min/pref/max sizes and alignment.
//! - **LayoutRegion**: per-axis leading/trailing/center/baseline positions.
//! - **Change journal**: change marks and exact revert of mark ranges.
//! - **Diagnostics**: dumps, structural hash, invariant report, snapshots.

pub mod component;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod interval;
pub mod journal;
pub mod logging;
pub mod model;
pub mod region;
pub mod types;

pub use component::{ComponentId, LayoutComponent};
pub use diagnostics::{
    LayoutInvariantCode, LayoutInvariantIssue, LayoutInvariantReport, LayoutInvariantSeverity,
    ModelSnapshot,
};
pub use error::ModelError;
pub use geometry::{Point, Rect, Size};
pub use interval::{
    GroupKind, IntervalAttributes, IntervalId, IntervalKind, IntervalNode, IntervalSizes,
};
pub use journal::ChangeMark;
pub use model::LayoutModel;
pub use region::LayoutRegion;
pub use types::{
    Alignment, Dimension, Edge, MAX_SIZE, NOT_EXPLICITLY_DEFINED, PaddingType,
    USE_PREFERRED_SIZE,
};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
