//! Designer error types.
//!
//! Caller misuse is reported through [`DesignerError`] before anything is
//! mutated. A broken tree detected mid-edit is a [`ConsistencyViolation`]:
//! it is logged with a dump of the subtree and raised as a panic.

use std::fmt;

use formlay_core::{ComponentId, ModelError};

/// Rejected gesture or designer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignerError {
    Model(ModelError),
    Inactive,
    UnknownComponent {
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
    EmptySelection,
    MixedContainers {
        first: ComponentId,
        other: ComponentId,
    },
    LengthMismatch {
        sources: usize,
        targets: usize,
    },
    NoDragInProgress,
    DragInProgress,
    UnplacedComponent {
        component: ComponentId,
    },
}

impl fmt::Display for DesignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(err) => write!(f, "model error: {err}"),
            Self::Inactive => write!(f, "designer session is not active"),
            Self::UnknownComponent { component } => {
                write!(f, "component '{component}' is not in the layout model")
            }
            Self::NotAContainer { component } => {
                write!(f, "component '{component}' is not a container")
            }
            Self::ContainerNotEmpty { component } => {
                write!(f, "container '{component}' must be empty")
            }
            Self::AlreadyPlaced { component, parent } => write!(
                f,
                "component '{component}' is already placed in '{parent}'"
            ),
            Self::NotPlaced { component } => {
                write!(f, "component '{component}' is not placed in a container")
            }
            Self::EmptySelection => write!(f, "no components given"),
            Self::MixedContainers { first, other } => write!(
                f,
                "components '{first}' and '{other}' live in different containers or layers"
            ),
            Self::LengthMismatch { sources, targets } => write!(
                f,
                "{sources} source component(s) but {targets} target component(s)"
            ),
            Self::NoDragInProgress => write!(f, "no drag gesture in progress"),
            Self::DragInProgress => write!(f, "a drag gesture is already in progress"),
            Self::UnplacedComponent { component } => write!(
                f,
                "component '{component}' has not been positioned in the layout yet"
            ),
        }
    }
}

impl std::error::Error for DesignerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for DesignerError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

/// Fatal defect in the editing algorithms: the tree is no longer trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyViolation {
    pub message: String,
    pub dump: String,
}

impl ConsistencyViolation {
    pub fn new(message: impl Into<String>, dump: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            dump: dump.into(),
        }
    }

    /// Log the violation and abort the gesture.
    pub fn raise(self) -> ! {
        #[cfg(feature = "tracing")]
        tracing::error!(
            message = "designer.consistency_violation",
            reason = %self.message,
            dump = %self.dump
        );
        panic!("{self}");
    }
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layout consistency violation: {}", self.message)?;
        if !self.dump.is_empty() {
            write!(f, "\n{}", self.dump)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConsistencyViolation {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn model_errors_are_wrapped_with_source() {
        let err = DesignerError::from(ModelError::ZeroIntervalId);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("model error"));
        assert!(DesignerError::Inactive.source().is_none());
    }

    #[test]
    #[should_panic(expected = "wrong root")]
    fn violation_panics_with_message() {
        ConsistencyViolation::new("wrong root", "parallel #1\n").raise();
    }
}
