#![forbid(unsafe_code)]

//! Core types for Dimmer: the host document seam, input events, geometry,
//! and the deterministic timer queue that drives animations.
//!
//! Dimmer never talks to a browser directly. Everything it needs from the
//! host page goes through [`dom::Document`], and every deferred action runs
//! from a [`timer::Scheduler`] that the host advances once per frame.

pub mod dom;
pub mod event;
pub mod geometry;
pub mod headless;
pub mod timer;

pub use dom::{Display, Document, DomError, NodeId, Overflow, Property, Visibility};
pub use event::{ClickEvent, Event, KeyCode, KeyEvent, KeyEventKind, PointerEvent, PointerEventKind};
pub use geometry::{Point, Size};
pub use headless::HeadlessDocument;
pub use timer::{FRAME_INTERVAL, HostClock, Scheduler, TimerHandle};
