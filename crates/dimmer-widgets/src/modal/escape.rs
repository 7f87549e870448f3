#![forbid(unsafe_code)]

//! The document-level Escape binding.
//!
//! Exactly one modal answers Escape: the top of the stack, and only when it
//! opened with `escape_close`. The manager rebinds after every push and pop
//! instead of adding and removing listeners per modal, so closing one modal
//! never unbinds another.

use super::stack::ModalId;

/// Which modal, if any, Escape closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscapeBinding {
    owner: Option<ModalId>,
}

impl EscapeBinding {
    pub const fn new() -> Self {
        Self { owner: None }
    }

    /// The bound modal.
    #[inline]
    pub const fn owner(&self) -> Option<ModalId> {
        self.owner
    }

    #[inline]
    pub const fn is_bound(&self) -> bool {
        self.owner.is_some()
    }

    /// Bind to `top` when it accepts Escape, otherwise unbind. Returns
    /// whether the owner changed.
    pub(crate) fn rebind(&mut self, top: Option<(ModalId, bool)>) -> bool {
        let owner = top.and_then(|(id, escape_close)| escape_close.then_some(id));
        if owner == self.owner {
            return false;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(from = ?self.owner, to = ?owner, "escape binding moved");
        self.owner = owner;
        true
    }
}
