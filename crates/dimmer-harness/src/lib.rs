#![forbid(unsafe_code)]

//! Test harness for Dimmer modals.
//!
//! [`Page`] wraps a [`ModalManager`] over a [`HeadlessDocument`] and keeps
//! enough bookkeeping (which elements it created, which modals it believes
//! are open) to check the stack invariants after every step.
//!
//! [`dump_tree`] renders an element subtree as indented text, and
//! [`assert_tree!`] compares that rendering against an expected string,
//! printing both on mismatch.
//!
//! [`Op`] and [`ops`] drive random operation sequences for property tests.

use std::fmt::Write as _;
use std::time::Duration;

use dimmer_core::{Document, Event, HeadlessDocument, NodeId, Point, Size};
use dimmer_widgets::modal::{
    ModalAction, ModalError, ModalId, ModalManager, ModalOptions, ModalOptionsPatch,
};
use proptest::prelude::*;

/// Viewport used by [`Page::new`].
pub const DEFAULT_VIEWPORT: Size = Size::new(800, 600);

/// Upper bound on timer firings in [`Page::settle`].
const SETTLE_LIMIT: usize = 100_000;

/// A headless page with a modal manager and invariant bookkeeping.
#[derive(Debug)]
pub struct Page {
    modals: ModalManager<HeadlessDocument>,
    elements: Vec<NodeId>,
    open: Vec<ModalId>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self::with_viewport(DEFAULT_VIEWPORT)
    }

    pub fn with_viewport(viewport: Size) -> Self {
        Self {
            modals: ModalManager::new(HeadlessDocument::new(viewport)),
            elements: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Page whose manager starts from `defaults`.
    pub fn with_defaults(viewport: Size, defaults: ModalOptions) -> Result<Self, ModalError> {
        Ok(Self {
            modals: ModalManager::with_defaults(HeadlessDocument::new(viewport), defaults)?,
            elements: Vec::new(),
            open: Vec::new(),
        })
    }

    /// Attach a new `div` of the given client size to the body.
    pub fn element(&mut self, size: Size) -> NodeId {
        let node = self.modals.document_mut().create_attached("div", size);
        self.elements.push(node);
        node
    }

    /// Append a child element with `tag` under `parent`.
    pub fn child(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, ModalError> {
        Ok(self.modals.document_mut().create_child(parent, tag)?)
    }

    /// Elements created with [`Page::element`], oldest first.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    pub fn modals(&self) -> &ModalManager<HeadlessDocument> {
        &self.modals
    }

    pub fn modals_mut(&mut self) -> &mut ModalManager<HeadlessDocument> {
        &mut self.modals
    }

    pub fn doc(&self) -> &HeadlessDocument {
        self.modals.document()
    }

    pub fn doc_mut(&mut self) -> &mut HeadlessDocument {
        self.modals.document_mut()
    }

    /// Modals the page believes are open, oldest first.
    pub fn open_ids(&self) -> &[ModalId] {
        &self.open
    }

    pub fn open(&mut self, element: NodeId, patch: &ModalOptionsPatch) -> Result<ModalId, ModalError> {
        let id = self.modals.open(element, patch)?;
        self.open.push(id);
        Ok(id)
    }

    pub fn close(&mut self) -> Result<Option<ModalId>, ModalError> {
        let closed = self.modals.close();
        if self.modals.depth() < self.open.len() {
            self.open.pop();
        }
        closed
    }

    /// Forward `event` to the manager.
    pub fn send(&mut self, event: &Event) -> Result<Option<ModalAction>, ModalError> {
        let action = self.modals.handle_event(event)?;
        if let Some(ModalAction::Closed { .. }) = action {
            self.open.pop();
        }
        Ok(action)
    }

    /// Advance the timer queue by `ms` milliseconds.
    pub fn run_for(&mut self, ms: u64) -> Result<(), ModalError> {
        self.modals.advance(Duration::from_millis(ms))
    }

    /// Fire timers until none are armed.
    pub fn settle(&mut self) -> Result<(), ModalError> {
        for _ in 0..SETTLE_LIMIT {
            let Some(wait) = self.modals.next_deadline() else {
                return Ok(());
            };
            self.modals.advance(wait)?;
        }
        tracing::warn!(
            pending = self.modals.pending_timers(),
            "timers still armed after settle limit"
        );
        Ok(())
    }

    /// Body children that are not elements created by the page.
    pub fn attached_containers(&self) -> Vec<NodeId> {
        let doc = self.doc();
        doc.children(doc.body())
            .iter()
            .copied()
            .filter(|node| !self.elements.contains(node))
            .collect()
    }

    /// Check the stack invariants against the document.
    pub fn check_invariants(&self) -> Result<(), String> {
        let modals = &self.modals;
        let doc = self.doc();
        let body = doc.body();

        if modals.depth() != self.open.len() {
            return Err(format!(
                "depth {} but {} modals tracked as open",
                modals.depth(),
                self.open.len()
            ));
        }
        if modals.top_id() != self.open.last().copied() {
            return Err(format!(
                "top {:?}, expected {:?}",
                modals.top_id(),
                self.open.last()
            ));
        }

        for &id in &self.open {
            let (Some(container), Some(content)) = (modals.container(id), modals.content(id)) else {
                return Err(format!("modal {} has no nodes", id.id()));
            };
            if doc.parent(container) != Some(body) {
                return Err(format!("container of modal {} is not under the body", id.id()));
            }
            if doc.parent(content) != Some(container) {
                return Err(format!("content of modal {} is not in its container", id.id()));
            }
            if let Some(button) = modals.close_button(id)
                && doc.parent(button) != Some(content)
            {
                return Err(format!("close button of modal {} is misplaced", id.id()));
            }
        }

        let lock = modals.scroll_lock();
        if lock.is_locked() == modals.is_empty() {
            return Err(format!(
                "scroll lock {} with depth {}",
                if lock.is_locked() { "held" } else { "free" },
                modals.depth()
            ));
        }
        if lock.acquisitions().checked_sub(lock.releases()) != Some(u32::from(lock.is_locked())) {
            return Err(format!(
                "{} acquisitions against {} releases",
                lock.acquisitions(),
                lock.releases()
            ));
        }
        if doc.pinned_at().is_some() != lock.is_locked() {
            return Err("page pin disagrees with scroll lock".into());
        }

        let expected_owner = modals
            .top_id()
            .filter(|&id| modals.options(id).is_some_and(|o| o.escape_close));
        if modals.escape_owner() != expected_owner {
            return Err(format!(
                "escape bound to {:?}, expected {:?}",
                modals.escape_owner(),
                expected_owner
            ));
        }

        if modals.closing_count() == 0 {
            let attached = self.attached_containers().len();
            if attached != modals.depth() {
                return Err(format!(
                    "{attached} containers attached with depth {}",
                    modals.depth()
                ));
            }
        }
        Ok(())
    }
}

/// Render the subtree under `root` as indented text, one element per line.
///
/// Each line reads `tag.class1.class2 [style]`, listing only the inline
/// properties that have been written.
pub fn dump_tree(doc: &HeadlessDocument, root: NodeId) -> String {
    let mut out = String::new();
    dump_node(doc, root, 0, &mut out);
    out
}

fn dump_node(doc: &HeadlessDocument, node: NodeId, depth: usize, out: &mut String) {
    let tag = doc.tag_name(node).unwrap_or_else(|| "?".into());
    let _ = write!(out, "{:indent$}{tag}", "", indent = depth * 2);
    for class in doc.classes(node) {
        let _ = write!(out, ".{class}");
    }
    if let Some(style) = doc.style(node) {
        let mut props = Vec::new();
        if let Some(display) = style.display {
            props.push(format!("display={}", display.as_css()));
        }
        if let Some(visibility) = style.visibility {
            props.push(format!("visibility={}", visibility.as_css()));
        }
        if let Some(opacity) = style.opacity {
            props.push(format!("opacity={opacity}"));
        }
        if let Some(left) = style.left {
            props.push(format!("left={left}"));
        }
        if let Some(top) = style.top {
            props.push(format!("top={top}"));
        }
        if let Some(overflow) = style.overflow {
            props.push(format!("overflow={}", overflow.as_css()));
        }
        if !props.is_empty() {
            let _ = write!(out, " [{}]", props.join(" "));
        }
    }
    out.push('\n');
    for &child in doc.children(node) {
        dump_node(doc, child, depth + 1, out);
    }
}

/// Assert that the subtree under a node renders as `expected`.
///
/// Leading and trailing blank lines of `expected` are ignored.
#[macro_export]
macro_rules! assert_tree {
    ($doc:expr, $root:expr, $expected:expr $(,)?) => {{
        let actual = $crate::dump_tree($doc, $root);
        let expected = $expected.trim_matches('\n');
        if actual.trim_end_matches('\n') != expected {
            panic!(
                "tree mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
                expected, actual
            );
        }
    }};
}

/// One step of a random modal session.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Open the `element`-th page element (modulo the element count).
    Open {
        element: usize,
        fade_ms: u64,
        fade_delay: f32,
        escape_close: bool,
        allow_drag: bool,
    },
    Close,
    Escape,
    ClickBackdrop,
    ClickClose,
    Drag { dx: i32, dy: i32 },
    Advance(u64),
}

impl Op {
    /// Apply the step. Opening an element that is already open is skipped.
    pub fn apply(&self, page: &mut Page) -> Result<(), ModalError> {
        match *self {
            Self::Open {
                element,
                fade_ms,
                fade_delay,
                escape_close,
                allow_drag,
            } => {
                if page.elements.is_empty() {
                    return Ok(());
                }
                let node = page.elements[element % page.elements.len()];
                let patch = ModalOptionsPatch::new()
                    .fade_duration_ms(fade_ms)
                    .fade_delay(fade_delay)
                    .escape_close(escape_close)
                    .allow_drag(allow_drag);
                match page.open(node, &patch) {
                    Ok(_) | Err(ModalError::AlreadyOpen { .. }) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            Self::Close => page.close().map(drop),
            Self::Escape => page.send(&Event::escape()).map(drop),
            Self::ClickBackdrop => {
                let container = page.modals.top_id().and_then(|id| page.modals.container(id));
                match container {
                    Some(container) => page.send(&Event::click(container)).map(drop),
                    None => Ok(()),
                }
            }
            Self::ClickClose => {
                let button = page.modals.top_id().and_then(|id| page.modals.close_button(id));
                match button {
                    Some(button) => page.send(&Event::click(button)).map(drop),
                    None => Ok(()),
                }
            }
            Self::Drag { dx, dy } => {
                let Some(content) = page.modals.top_id().and_then(|id| page.modals.content(id)) else {
                    return Ok(());
                };
                let start = Point::new(100, 100);
                page.send(&Event::pointer_down(content, start.x, start.y))?;
                page.send(&Event::pointer_move(start.x + dx, start.y + dy))?;
                page.send(&Event::pointer_up(start.x + dx, start.y + dy)).map(drop)
            }
            Self::Advance(ms) => page.run_for(ms),
        }
    }
}

/// Strategy over single [`Op`]s.
pub fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (
            0usize..4,
            prop_oneof![Just(0u64), Just(40), Just(260)],
            prop_oneof![Just(0.0f32), Just(0.6)],
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(element, fade_ms, fade_delay, escape_close, allow_drag)| Op::Open {
                element,
                fade_ms,
                fade_delay,
                escape_close,
                allow_drag,
            }),
        2 => Just(Op::Close),
        1 => Just(Op::Escape),
        1 => Just(Op::ClickBackdrop),
        1 => Just(Op::ClickClose),
        1 => (-400i32..400, -400i32..400).prop_map(|(dx, dy)| Op::Drag { dx, dy }),
        2 => (0u64..300).prop_map(Op::Advance),
    ]
}

/// Strategy over operation sequences of up to `max_len` steps.
pub fn ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(), 0..=max_len)
}
