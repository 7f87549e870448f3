#![forbid(unsafe_code)]

//! In-memory [`Document`] for tests and non-browser hosts.
//!
//! The headless document keeps a plain element tree with inline style, class
//! lists, and fixed client sizes. Layout is not computed: sizes are whatever
//! the caller sets with [`HeadlessDocument::set_client_size`].
//!
//! Page pinning follows the browser technique it stands in for: pinning
//! resets the live scroll offset to zero, and [`Document::scroll_to`] after
//! unpinning restores it. User scroll while pinned is ignored.

use ahash::AHashMap;

use crate::dom::{Display, Document, DomError, NodeId, Overflow, Property, Visibility};
use crate::geometry::{Point, Size};

/// Inline style recorded for one element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InlineStyle {
    pub opacity: Option<f32>,
    pub display: Option<Display>,
    pub visibility: Option<Visibility>,
    pub left: Option<i32>,
    pub top: Option<i32>,
    pub overflow: Option<Overflow>,
}

impl InlineStyle {
    /// Whether the element would be painted: not `display: none`, not
    /// hidden, and not fully transparent.
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.display != Some(Display::None)
            && self.visibility != Some(Visibility::Hidden)
            && self.opacity.is_none_or(|o| o > 0.0)
    }
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    style: InlineStyle,
    size: Size,
    dispatched: Vec<String>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            style: InlineStyle::default(),
            size: Size::ZERO,
            dispatched: Vec::new(),
        }
    }
}

/// A self-contained element tree implementing [`Document`].
#[derive(Debug, Clone)]
pub struct HeadlessDocument {
    elements: AHashMap<NodeId, Element>,
    body: NodeId,
    next_id: u64,
    viewport: Size,
    scroll_y: i32,
    pinned_at: Option<i32>,
    pin_count: u32,
    unpin_count: u32,
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new(Size::new(1280, 800))
    }
}

impl HeadlessDocument {
    /// Create an empty document with the given viewport.
    pub fn new(viewport: Size) -> Self {
        let body = NodeId::new(1);
        let mut elements = AHashMap::new();
        elements.insert(body, Element::new("body"));
        Self {
            elements,
            body,
            next_id: 2,
            viewport,
            scroll_y: 0,
            pinned_at: None,
            pin_count: 0,
            unpin_count: 0,
        }
    }

    /// Create an element with a client size and attach it to the body.
    pub fn create_attached(&mut self, tag: &str, size: Size) -> NodeId {
        let node = self.alloc(tag);
        self.set_client_size(node, size);
        let body = self.body;
        self.link(body, node);
        node
    }

    /// Create an element as the last child of `parent`.
    pub fn create_child(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        if !self.exists(parent) {
            return Err(DomError::UnknownNode(parent));
        }
        let node = self.alloc(tag);
        self.link(parent, node);
        Ok(node)
    }

    /// Set the client size reported for `node`.
    pub fn set_client_size(&mut self, node: NodeId, size: Size) {
        if let Some(el) = self.elements.get_mut(&node) {
            el.size = size;
        }
    }

    /// Change the viewport size.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Simulate a user scroll. Ignored while the page is pinned.
    pub fn user_scroll(&mut self, y: i32) {
        if self.pinned_at.is_none() {
            self.scroll_y = y.max(0);
        }
    }

    /// Inline style of `node`.
    pub fn style(&self, node: NodeId) -> Option<InlineStyle> {
        self.elements.get(&node).map(|el| el.style)
    }

    /// Children of `node`, in order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.elements
            .get(&node)
            .map(|el| el.children.as_slice())
            .unwrap_or(&[])
    }

    /// Class list of `node`, in insertion order.
    pub fn classes(&self, node: NodeId) -> &[String] {
        self.elements
            .get(&node)
            .map(|el| el.classes.as_slice())
            .unwrap_or(&[])
    }

    /// Events dispatched on `node`, oldest first.
    pub fn dispatched(&self, node: NodeId) -> &[String] {
        self.elements
            .get(&node)
            .map(|el| el.dispatched.as_slice())
            .unwrap_or(&[])
    }

    /// Number of live elements, the body included.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Offset the page is pinned at, if pinned.
    pub fn pinned_at(&self) -> Option<i32> {
        self.pinned_at
    }

    /// Number of `pin_page` calls.
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// Number of `unpin_page` calls.
    pub fn unpin_count(&self) -> u32 {
        self.unpin_count
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        let node = NodeId::new(self.next_id);
        self.next_id += 1;
        self.elements.insert(node, Element::new(tag));
        node
    }

    fn unlink(&mut self, node: NodeId) {
        let Some(parent) = self.elements.get_mut(&node).and_then(|el| el.parent.take()) else {
            return;
        };
        if let Some(p) = self.elements.get_mut(&parent) {
            p.children.retain(|&c| c != node);
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        if let Some(el) = self.elements.get_mut(&child) {
            el.parent = Some(parent);
        }
        if let Some(p) = self.elements.get_mut(&parent) {
            p.children.push(child);
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element, DomError> {
        self.elements
            .get_mut(&node)
            .ok_or(DomError::UnknownNode(node))
    }
}

impl Document for HeadlessDocument {
    fn body(&self) -> NodeId {
        self.body
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        Ok(self.alloc(tag))
    }

    fn exists(&self, node: NodeId) -> bool {
        self.elements.contains_key(&node)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.elements.get(&node).map(|el| el.tag.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.elements.get(&node).and_then(|el| el.parent)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.exists(parent) {
            return Err(DomError::UnknownNode(parent));
        }
        if !self.exists(child) {
            return Err(DomError::UnknownNode(child));
        }
        if child == self.body || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        self.link(parent, child);
        Ok(())
    }

    fn release(&mut self, node: NodeId) -> Result<(), DomError> {
        if node == self.body {
            return Err(DomError::HierarchyRequest {
                parent: node,
                child: node,
            });
        }
        if !self.exists(node) {
            return Err(DomError::UnknownNode(node));
        }
        self.unlink(node);
        if let Some(el) = self.elements.remove(&node) {
            for child in el.children {
                if let Some(c) = self.elements.get_mut(&child) {
                    c.parent = None;
                }
            }
        }
        Ok(())
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        let el = self.element_mut(node)?;
        if !el.classes.iter().any(|c| c == class) {
            el.classes.push(class.to_owned());
        }
        Ok(())
    }

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        self.element_mut(node)?.classes.retain(|c| c != class);
        Ok(())
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.elements
            .get(&node)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }

    fn set_property(&mut self, node: NodeId, property: Property) -> Result<(), DomError> {
        let style = &mut self.element_mut(node)?.style;
        match property {
            Property::Opacity(v) => style.opacity = Some(v.clamp(0.0, 1.0)),
            Property::Display(d) => style.display = Some(d),
            Property::Visibility(v) => style.visibility = Some(v),
            Property::Left(px) => style.left = Some(px),
            Property::Top(px) => style.top = Some(px),
            Property::Overflow(o) => style.overflow = Some(o),
        }
        Ok(())
    }

    fn opacity(&self, node: NodeId) -> Option<f32> {
        self.elements.get(&node).and_then(|el| el.style.opacity)
    }

    fn offset(&self, node: NodeId) -> Point {
        self.elements.get(&node).map_or(Point::ORIGIN, |el| {
            Point::new(el.style.left.unwrap_or(0), el.style.top.unwrap_or(0))
        })
    }

    fn client_size(&self, node: NodeId) -> Size {
        self.elements.get(&node).map_or(Size::ZERO, |el| el.size)
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn scroll_y(&self) -> i32 {
        self.scroll_y
    }

    fn scroll_to(&mut self, y: i32) {
        if self.pinned_at.is_none() {
            self.scroll_y = y.max(0);
        }
    }

    fn pin_page(&mut self, scroll_y: i32) {
        self.pinned_at = Some(scroll_y);
        self.scroll_y = 0;
        self.pin_count += 1;
    }

    fn unpin_page(&mut self) {
        self.pinned_at = None;
        self.unpin_count += 1;
    }

    fn dispatch_event(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(node)?.dispatched.push(name.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_moves_between_parents() {
        let mut doc = HeadlessDocument::default();
        let a = doc.create_attached("div", Size::ZERO);
        let b = doc.create_attached("div", Size::ZERO);
        let child = doc.create_child(a, "span").unwrap();

        doc.append_child(b, child).unwrap();
        assert_eq!(doc.parent(child), Some(b));
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[child]);
    }

    #[test]
    fn append_rejects_cycles() {
        let mut doc = HeadlessDocument::default();
        let outer = doc.create_attached("div", Size::ZERO);
        let inner = doc.create_child(outer, "div").unwrap();

        let err = doc.append_child(inner, outer).unwrap_err();
        assert_eq!(
            err,
            DomError::HierarchyRequest {
                parent: inner,
                child: outer
            }
        );
        let body = doc.body();
        assert!(doc.append_child(outer, body).is_err());
    }

    #[test]
    fn release_forgets_the_node() {
        let mut doc = HeadlessDocument::default();
        let node = doc.create_attached("div", Size::ZERO);
        let before = doc.element_count();
        doc.release(node).unwrap();
        assert!(!doc.exists(node));
        assert!(doc.children(doc.body()).is_empty());
        assert_eq!(doc.element_count(), before - 1);
        assert_eq!(doc.add_class(node, "x"), Err(DomError::UnknownNode(node)));
        assert_eq!(doc.release(node), Err(DomError::UnknownNode(node)));
    }

    #[test]
    fn release_detaches_remaining_children() {
        let mut doc = HeadlessDocument::default();
        let outer = doc.create_attached("div", Size::ZERO);
        let inner = doc.create_child(outer, "span").unwrap();
        doc.release(outer).unwrap();
        assert!(doc.exists(inner));
        assert_eq!(doc.parent(inner), None);
        let body = doc.body();
        doc.append_child(body, inner).unwrap();
        assert!(doc.is_attached(inner));
    }

    #[test]
    fn body_cannot_be_released() {
        let mut doc = HeadlessDocument::default();
        let body = doc.body();
        assert!(doc.release(body).is_err());
        assert!(doc.exists(body));
    }

    #[test]
    fn unknown_nodes_error() {
        let mut doc = HeadlessDocument::default();
        let ghost = NodeId::new(999);
        assert_eq!(doc.add_class(ghost, "x"), Err(DomError::UnknownNode(ghost)));
        assert_eq!(doc.release(ghost), Err(DomError::UnknownNode(ghost)));
        assert!(doc.tag_name(ghost).is_none());
    }

    #[test]
    fn contains_is_inclusive() {
        let mut doc = HeadlessDocument::default();
        let outer = doc.create_attached("div", Size::ZERO);
        let inner = doc.create_child(outer, "input").unwrap();
        assert!(doc.contains(outer, outer));
        assert!(doc.contains(outer, inner));
        assert!(!doc.contains(inner, outer));
        assert_eq!(doc.tag_name(inner).as_deref(), Some("input"));
    }

    #[test]
    fn classes_are_a_set() {
        let mut doc = HeadlessDocument::default();
        let node = doc.create_attached("div", Size::ZERO);
        doc.add_class(node, "modal").unwrap();
        doc.add_class(node, "modal").unwrap();
        assert_eq!(doc.classes(node), &["modal".to_owned()]);
        doc.remove_class(node, "modal").unwrap();
        assert!(!doc.has_class(node, "modal"));
    }

    #[test]
    fn pinning_freezes_scroll() {
        let mut doc = HeadlessDocument::default();
        doc.user_scroll(420);
        doc.pin_page(420);
        assert_eq!(doc.scroll_y(), 0);
        doc.user_scroll(10);
        assert_eq!(doc.scroll_y(), 0);
        doc.unpin_page();
        doc.scroll_to(420);
        assert_eq!(doc.scroll_y(), 420);
        assert_eq!((doc.pin_count(), doc.unpin_count()), (1, 1));
    }

    #[test]
    fn inline_style_visibility() {
        let mut doc = HeadlessDocument::default();
        let node = doc.create_attached("div", Size::ZERO);
        assert!(doc.style(node).unwrap().is_shown());
        doc.set_property(node, Property::Opacity(0.0)).unwrap();
        assert!(!doc.style(node).unwrap().is_shown());
        doc.set_property(node, Property::Opacity(0.4)).unwrap();
        doc.set_property(node, Property::Display(Display::None)).unwrap();
        assert!(!doc.style(node).unwrap().is_shown());
    }
}
