#![forbid(unsafe_code)]

//! Modal overlay: stack lifecycle, fade animations, scroll locking, and
//! constrained dragging.
//!
//! # Lifecycle
//!
//! [`ModalManager::open`] wraps an element in a backdrop container, pins the
//! page for the first modal, and fades the container in. The content fades
//! in after `fade_delay × fade_duration`. [`ModalManager::close`] pops the
//! newest modal, fades both nodes out, and detaches them once the fade has
//! run, dispatching [`AFTER_CLOSE_EVENT`] on the content.
//!
//! # Input
//!
//! Hosts forward [`dimmer_core::Event`]s to [`ModalManager::handle_event`].
//! Escape, close-button clicks, and backdrop clicks close the top modal;
//! pointer gestures drag it when `allow_drag` is set.
//!
//! # Time
//!
//! Nothing runs on its own. Fades and deferred detaches sit in a timer
//! queue that the host drains with [`ModalManager::advance`] or
//! [`ModalManager::tick`], usually once per animation frame.

mod animation;
mod container;
mod drag;
mod error;
mod escape;
mod options;
mod scroll_lock;
mod stack;

pub use animation::{Animator, FadeCallback, FadeDirection, FadeFrame, FadeStart, FrameKind};
pub use container::{CloseReason, ModalAction, ModalNodes};
pub use drag::{DRAG_EDGE_MARGIN, DragController, DragState, clamp_axis, drag_limit};
pub use error::ModalError;
pub use escape::EscapeBinding;
pub use options::{DEFAULT_FADE_DELAY, DEFAULT_FADE_DURATION_MS, ModalOptions, ModalOptionsPatch};
pub use scroll_lock::ScrollLock;
pub use stack::{AFTER_CLOSE_EVENT, ModalId, ModalManager, ModalPhase, ModalTask};
