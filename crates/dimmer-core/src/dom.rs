#![forbid(unsafe_code)]

//! The host document seam.
//!
//! [`Document`] is the only way Dimmer touches the page. It covers the
//! handful of operations an overlay needs: building and re-parenting
//! elements, toggling classes, writing inline style, reading layout sizes,
//! and pinning page scroll.
//!
//! # Invariants
//!
//! - `append_child` moves: a node has at most one parent at a time.
//! - `release` detaches a node and retires its id. Hosts drop whatever
//!   they held for it, so synthesized nodes do not accumulate.
//! - `contains(a, b)` is inclusive: every node contains itself.
//!
//! # Failure Modes
//!
//! - Operations on an id the document never issued, or already released,
//!   return [`DomError::UnknownNode`].
//! - Attaching a node under itself or one of its descendants returns
//!   [`DomError::HierarchyRequest`].
//! - Browser-side failures surface as [`DomError::Host`].

use std::fmt;

use crate::geometry::{Point, Size};

/// Tags treated as text-input-like controls.
pub const TEXT_INPUT_TAGS: [&str; 3] = ["input", "textarea", "select"];

/// Whether `tag` names a text-input-like control (case-insensitive).
#[must_use]
pub fn is_text_input(tag: &str) -> bool {
    TEXT_INPUT_TAGS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(tag))
}

/// Opaque reference to an element owned by the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id issued by a document implementation.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// CSS `display` values the overlay writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Display {
    None,
    Block,
    InlineBlock,
}

impl Display {
    /// CSS keyword.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Block => "block",
            Self::InlineBlock => "inline-block",
        }
    }
}

/// CSS `visibility` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    /// CSS keyword.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// CSS `overflow` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overflow {
    Visible,
    Hidden,
    Scroll,
    Unset,
}

impl Overflow {
    /// CSS keyword.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Scroll => "scroll",
            Self::Unset => "unset",
        }
    }
}

/// A single inline-style write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Property {
    /// Opacity in `[0.0, 1.0]`.
    Opacity(f32),
    Display(Display),
    Visibility(Visibility),
    /// `left`, in pixels.
    Left(i32),
    /// `top`, in pixels.
    Top(i32),
    Overflow(Overflow),
}

impl Property {
    /// CSS property name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Opacity(_) => "opacity",
            Self::Display(_) => "display",
            Self::Visibility(_) => "visibility",
            Self::Left(_) => "left",
            Self::Top(_) => "top",
            Self::Overflow(_) => "overflow",
        }
    }

    /// CSS value text.
    #[must_use]
    pub fn css_value(&self) -> String {
        match self {
            Self::Opacity(v) => v.clamp(0.0, 1.0).to_string(),
            Self::Display(d) => d.as_css().to_owned(),
            Self::Visibility(v) => v.as_css().to_owned(),
            Self::Left(px) | Self::Top(px) => format!("{px}px"),
            Self::Overflow(o) => o.as_css().to_owned(),
        }
    }
}

/// Errors raised by a [`Document`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The id was never issued by this document.
    UnknownNode(NodeId),
    /// The requested insertion would create a cycle or move the body.
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// The host rejected the operation.
    Host(String),
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(node) => write!(f, "unknown node {node}"),
            Self::HierarchyRequest { parent, child } => {
                write!(f, "cannot insert {child} under {parent}")
            }
            Self::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for DomError {}

/// The subset of a page document the overlay drives.
///
/// Implementations: [`crate::headless::HeadlessDocument`] for tests and
/// non-browser hosts; `dimmer-web`'s `BrowserDocument` on wasm.
pub trait Document {
    /// The document body.
    fn body(&self) -> NodeId;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError>;

    /// Whether `node` was issued by this document.
    fn exists(&self, node: NodeId) -> bool;

    /// Lowercase tag name, or `None` for unknown nodes.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Parent element, if attached to one.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Move `child` to the end of `parent`'s children.
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError>;

    /// Detach `node` and forget it: afterwards `exists(node)` is false and
    /// every method treats the id as unknown. Children still under `node`
    /// are detached but stay addressable. Releasing the body fails with
    /// [`DomError::HierarchyRequest`].
    fn release(&mut self, node: NodeId) -> Result<(), DomError>;

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError>;

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Write one inline-style property.
    fn set_property(&mut self, node: NodeId, property: Property) -> Result<(), DomError>;

    /// Inline opacity, if one has been written.
    fn opacity(&self, node: NodeId) -> Option<f32>;

    /// Inline `left`/`top`, treating unset values as zero.
    fn offset(&self, node: NodeId) -> Point;

    /// Rendered client size of `node`.
    fn client_size(&self, node: NodeId) -> Size;

    /// Viewport size.
    fn viewport(&self) -> Size;

    /// Current vertical page scroll.
    fn scroll_y(&self) -> i32;

    /// Scroll the page to vertical offset `y`.
    fn scroll_to(&mut self, y: i32);

    /// Pin the page with fixed positioning so it stops scrolling, keeping
    /// content at `scroll_y` visually in place.
    fn pin_page(&mut self, scroll_y: i32);

    /// Undo [`Document::pin_page`], returning the page to normal flow.
    fn unpin_page(&mut self);

    /// Dispatch a named notification on `node`.
    fn dispatch_event(&mut self, node: NodeId, name: &str) -> Result<(), DomError>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether `node` is connected to the body.
    fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.body(), node)
    }
}
