//! Model-level error type.

use std::fmt;

use crate::component::ComponentId;
use crate::interval::IntervalId;

/// Rejected model mutation or malformed snapshot.
///
/// Every variant is returned before the model is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    ZeroIntervalId,
    IntervalIdOverflow {
        current: IntervalId,
    },
    UnknownInterval {
        interval: IntervalId,
    },
    DuplicateInterval {
        interval: IntervalId,
    },
    UnknownComponent {
        component: ComponentId,
    },
    DuplicateComponent {
        component: ComponentId,
    },
    NotAContainer {
        component: ComponentId,
    },
    ContainerNotEmpty {
        component: ComponentId,
    },
    AlreadyPlaced {
        component: ComponentId,
        parent: ComponentId,
    },
    NotPlaced {
        component: ComponentId,
    },
    AlreadyAttached {
        interval: IntervalId,
        parent: IntervalId,
    },
    DetachedInterval {
        interval: IntervalId,
    },
    NotAGroup {
        interval: IntervalId,
    },
    KindMismatch {
        interval: IntervalId,
        expected: &'static str,
        actual: &'static str,
    },
    DimensionMismatch {
        interval: IntervalId,
        parent: IntervalId,
    },
    InvalidIndex {
        parent: IntervalId,
        index: usize,
        len: usize,
    },
    ParentMismatch {
        interval: IntervalId,
        expected: Option<IntervalId>,
        actual: Option<IntervalId>,
    },
    CycleDetected {
        interval: IntervalId,
        parent: IntervalId,
    },
    UnknownLayer {
        container: ComponentId,
        root: IntervalId,
    },
    StaleMark {
        start: u64,
        end: u64,
        floor: u64,
        head: u64,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroIntervalId => write!(f, "interval id 0 is invalid"),
            Self::IntervalIdOverflow { current } => {
                write!(f, "interval id overflow after {current}")
            }
            Self::UnknownInterval { interval } => write!(f, "interval {interval} not found"),
            Self::DuplicateInterval { interval } => write!(f, "duplicate interval {interval}"),
            Self::UnknownComponent { component } => write!(f, "component '{component}' not found"),
            Self::DuplicateComponent { component } => {
                write!(f, "component '{component}' already exists")
            }
            Self::NotAContainer { component } => {
                write!(f, "component '{component}' is not a container")
            }
            Self::ContainerNotEmpty { component } => {
                write!(f, "container '{component}' still has sub-components")
            }
            Self::AlreadyPlaced { component, parent } => write!(
                f,
                "component '{component}' is already placed in '{parent}'"
            ),
            Self::NotPlaced { component } => {
                write!(f, "component '{component}' has no parent container")
            }
            Self::AlreadyAttached { interval, parent } => {
                write!(f, "interval {interval} is already attached to {parent}")
            }
            Self::DetachedInterval { interval } => {
                write!(f, "interval {interval} has no parent")
            }
            Self::NotAGroup { interval } => write!(f, "interval {interval} is not a group"),
            Self::KindMismatch {
                interval,
                expected,
                actual,
            } => write!(f, "interval {interval} is a {actual}, expected a {expected}"),
            Self::DimensionMismatch { interval, parent } => write!(
                f,
                "interval {interval} and parent {parent} belong to different axes"
            ),
            Self::InvalidIndex { parent, index, len } => write!(
                f,
                "index {index} out of range for group {parent} with {len} children"
            ),
            Self::ParentMismatch {
                interval,
                expected,
                actual,
            } => write!(
                f,
                "interval {interval} parent mismatch: expected {:?}, got {:?}",
                expected.map(IntervalId::get),
                actual.map(IntervalId::get)
            ),
            Self::CycleDetected { interval, parent } => write!(
                f,
                "adding interval {interval} under {parent} would create a cycle"
            ),
            Self::UnknownLayer { container, root } => {
                write!(f, "root {root} is not a layer of '{container}'")
            }
            Self::StaleMark {
                start,
                end,
                floor,
                head,
            } => write!(
                f,
                "change range {start}..{end} is not revertible (journal holds {floor}..{head})"
            ),
        }
    }
}

impl std::error::Error for ModelError {}
