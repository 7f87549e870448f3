#![forbid(unsafe_code)]

//! Overlay widgets for Dimmer.
//!
//! The [`modal`] module lifts an existing element into a centered, dimmed
//! layer with fade animations, nested stacking, scroll locking, and optional
//! constrained dragging.

pub mod modal;

pub use modal::{ModalError, ModalManager, ModalOptions, ModalOptionsPatch};
