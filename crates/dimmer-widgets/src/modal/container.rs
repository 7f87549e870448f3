#![forbid(unsafe_code)]

//! Backdrop container assembly.
//!
//! Opening a modal wraps the content element in a fresh container attached
//! to the body, optionally with a close affordance appended to the content.
//! Closing reverses it: the content goes back to the body and the
//! synthesized nodes are released, so their ids stop resolving.

use dimmer_core::{Document, DomError, NodeId, Point};

use super::options::ModalOptions;
use super::stack::ModalId;

/// Why a modal closed from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// Escape pressed while the modal held the Escape binding.
    Escape,
    /// Click on the close affordance.
    CloseButton,
    /// Click directly on the backdrop container.
    Backdrop,
}

/// Outcome of [`ModalManager::handle_event`](super::ModalManager::handle_event).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    /// The modal started closing.
    Closed { id: ModalId, reason: CloseReason },
    /// A drag began on the modal's content.
    DragStarted { id: ModalId },
    /// The content moved to a new clamped position.
    Dragged { id: ModalId, position: Point },
    /// The drag ended.
    DragEnded { id: ModalId },
}

/// Elements making up one open modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalNodes {
    /// Backdrop wrapper attached to the body.
    pub container: NodeId,
    /// The caller's element.
    pub content: NodeId,
    /// Synthesized close affordance inside the content.
    pub close_button: Option<NodeId>,
}

fn add_classes<'a>(
    doc: &mut dyn Document,
    node: NodeId,
    classes: impl IntoIterator<Item = &'a String>,
) -> Result<(), DomError> {
    for class in classes {
        if !class.is_empty() {
            doc.add_class(node, class)?;
        }
    }
    Ok(())
}

/// Wrap `content` in a new container under the body.
pub(crate) fn assemble(
    doc: &mut dyn Document,
    content: NodeId,
    options: &ModalOptions,
) -> Result<ModalNodes, DomError> {
    add_classes(doc, content, [&options.modal_class])?;

    let close_button = if options.show_close {
        let button = doc.create_element("a")?;
        add_classes(doc, button, [&options.close_class])?;
        doc.append_child(content, button)?;
        Some(button)
    } else {
        None
    };

    let container = doc.create_element("div")?;
    add_classes(doc, container, &options.container_classes)?;
    let body = doc.body();
    doc.append_child(body, container)?;
    doc.append_child(container, content)?;

    Ok(ModalNodes {
        container,
        content,
        close_button,
    })
}

/// Return the content to the body and release the synthesized nodes.
pub(crate) fn disassemble(doc: &mut dyn Document, nodes: &ModalNodes) -> Result<(), DomError> {
    let body = doc.body();
    doc.append_child(body, nodes.content)?;
    if let Some(button) = nodes.close_button {
        doc.release(button)?;
    }
    doc.release(nodes.container)
}
