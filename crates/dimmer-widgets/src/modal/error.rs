#![forbid(unsafe_code)]

//! Modal errors.

use std::fmt;

use dimmer_core::{DomError, NodeId};

use super::stack::ModalId;

/// Errors returned by [`ModalManager`](super::ModalManager) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalError {
    /// The element was never issued by the document.
    UnknownElement(NodeId),
    /// The element is already the content of an open modal.
    AlreadyOpen { element: NodeId, id: ModalId },
    /// An option value the manager cannot run with.
    InvalidOption {
        /// Option key, as spelled in script (`fadeDelay`).
        key: &'static str,
        reason: String,
    },
    /// The host document rejected an operation.
    Dom(DomError),
}

impl fmt::Display for ModalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownElement(node) => write!(f, "element {node} is not in the document"),
            Self::AlreadyOpen { element, id } => {
                write!(f, "element {element} is already open as modal {}", id.id())
            }
            Self::InvalidOption { key, reason } => write!(f, "invalid option `{key}`: {reason}"),
            Self::Dom(err) => write!(f, "document error: {err}"),
        }
    }
}

impl std::error::Error for ModalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DomError> for ModalError {
    fn from(err: DomError) -> Self {
        Self::Dom(err)
    }
}
