#![forbid(unsafe_code)]

//! Host input events.
//!
//! The host translates its native listeners (`keydown`, `click`,
//! `mousedown`, `mousemove`, `mouseup`) into these values and hands them to
//! the modal manager. Targets are [`NodeId`]s resolved by the host document.

use crate::dom::NodeId;
use crate::geometry::Point;

/// Key identity, as far as the overlay cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Enter,
    Tab,
    Backspace,
    Char(char),
    /// Any key the overlay does not distinguish.
    Unidentified,
}

impl KeyCode {
    /// Map a DOM `KeyboardEvent.key` value.
    ///
    /// Both the standard `"Escape"` and the legacy `"Esc"` map to
    /// [`KeyCode::Escape`].
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Self::Escape,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Backspace" => Self::Backspace,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Unidentified,
                }
            }
        }
    }
}

/// Key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Release,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A key press.
    #[must_use]
    pub const fn press(code: KeyCode) -> Self {
        Self {
            code,
            kind: KeyEventKind::Press,
        }
    }
}

/// A click, delivered with the innermost element under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClickEvent {
    pub target: NodeId,
}

/// Phase of a single-pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
}

/// A pointer event in viewport (client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point,
    /// Innermost element under the pointer, when the host could resolve it.
    pub target: Option<NodeId>,
}

impl PointerEvent {
    /// Create a pointer event without a target.
    #[must_use]
    pub const fn new(kind: PointerEventKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            position: Point::new(x, y),
            target: None,
        }
    }

    /// Set the event target.
    #[must_use]
    pub const fn target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Input delivered to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Key(KeyEvent),
    Click(ClickEvent),
    Pointer(PointerEvent),
}

impl Event {
    /// Escape key press.
    #[must_use]
    pub const fn escape() -> Self {
        Self::Key(KeyEvent::press(KeyCode::Escape))
    }

    /// Click on `target`.
    #[must_use]
    pub const fn click(target: NodeId) -> Self {
        Self::Click(ClickEvent { target })
    }

    /// Pointer down at `(x, y)` on `target`.
    #[must_use]
    pub const fn pointer_down(target: NodeId, x: i32, y: i32) -> Self {
        Self::Pointer(PointerEvent::new(PointerEventKind::Down, x, y).target(target))
    }

    /// Pointer move to `(x, y)`.
    #[must_use]
    pub const fn pointer_move(x: i32, y: i32) -> Self {
        Self::Pointer(PointerEvent::new(PointerEventKind::Move, x, y))
    }

    /// Pointer release at `(x, y)`.
    #[must_use]
    pub const fn pointer_up(x: i32, y: i32) -> Self {
        Self::Pointer(PointerEvent::new(PointerEventKind::Up, x, y))
    }
}
