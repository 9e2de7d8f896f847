#![forbid(unsafe_code)]

//! Designer: turns drag gestures into interval-tree edits.
//!
//! # Role in formlay
//! `formlay-designer` sits between a visual form editor and the layout
//! model of `formlay-core`. The host reports pointer gestures and answers
//! pixel queries; the designer decides where components go in the
//! sequential/parallel group trees and keeps those trees tidy.
//!
//! # Primary responsibilities
//! - **LayoutDesigner**: drag lifecycle (add, move, resize) and structure
//!   commands (align, enclose, duplicate, copy, gap editing, resizing and
//!   anchoring switches).
//! - **LayoutFeeder**: candidate insertion points, ranking and splicing.
//! - **LayoutOperations**: gap merging, resizing bookkeeping, group
//!   dissolution and the repair after a removal.
//! - **LayoutAligner**: aligning several components along one edge.
//! - **LayoutCopier**: restricted copies of interval subtrees for
//!   duplicating and copying layouts.
//! - **VisualMapper**: the host-side geometry seam, with a headless
//!   [`StaticMapper`].

pub mod aligner;
pub mod config;
pub mod copier;
pub mod designer;
pub mod dragger;
pub mod error;
pub mod feeder;
pub mod mapper;
pub mod operations;
pub mod position;
pub mod visual;

pub use aligner::{LayoutAligner, alignment_anchor};
pub use config::DesignerConfig;
pub use copier::{IntervalMap, LayoutCopier};
pub use designer::{EditableGap, LayoutDesigner};
pub use dragger::{DragKind, DragState, FixedSnap, NoSnap, PositionDef, SnapProvider};
pub use error::{ConsistencyViolation, DesignerError};
pub use feeder::{LayoutFeeder, PlacementRequest};
pub use mapper::{PaintHints, StaticMapper, VisualMapper};
pub use operations::{LayoutOperations, effective_alignment};
pub use position::{IncludeDesc, OriginalPosition};
