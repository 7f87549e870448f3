#![forbid(unsafe_code)]

//! `web-sys` document and the wasm-bindgen `ModalHost`.
//!
//! # Invariants
//!
//! - Every element the manager sees carries a `data-dimmer-node` attribute
//!   holding its [`NodeId`]. Registration is lazy; page elements outside
//!   modals are only registered when the manager walks through them.
//!   Released nodes lose both the attribute and their registry entry.
//! - Notifications are queued while the manager is borrowed and dispatched
//!   after the borrow ends, so script listeners may call back into the host.
//! - The animation-frame loop runs only while timers are pending. Resuming
//!   it resets the tick clock so idle time never counts as animation time.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use dimmer_core::{
    Document, DomError, Event, NodeId, Overflow, Point, PointerEvent, PointerEventKind, Property,
    Size,
};
use dimmer_widgets::modal::{ModalAction, ModalError, ModalManager};
use gloo::events::{EventListener, EventListenerOptions};
use gloo::render::{AnimationFrame, request_animation_frame};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, Element, HtmlElement, KeyboardEvent, MouseEvent, Window};
use web_time::Instant;

use crate::{WebError, key_event, parse_options};

const NODE_ATTR: &str = "data-dimmer-node";

fn host_err(err: JsValue) -> DomError {
    DomError::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn to_js(err: WebError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn parse_px(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").trim().parse().ok()
}

#[derive(Debug)]
struct Registry {
    elements: AHashMap<NodeId, Element>,
    next_id: u64,
}

/// [`Document`] over the live page.
#[derive(Debug)]
pub struct BrowserDocument {
    window: Window,
    document: web_sys::Document,
    body: NodeId,
    registry: RefCell<Registry>,
    outbox: Vec<(Element, String)>,
}

impl BrowserDocument {
    /// Bind to the current window's document.
    pub fn new() -> Result<Self, WebError> {
        let window = web_sys::window().ok_or_else(|| WebError::Host("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| WebError::Host("no document".into()))?;
        let body = document
            .body()
            .ok_or_else(|| WebError::Host("document has no body".into()))?;
        let mut doc = Self {
            window,
            document,
            body: NodeId::new(0),
            registry: RefCell::new(Registry {
                elements: AHashMap::new(),
                next_id: 1,
            }),
            outbox: Vec::new(),
        };
        doc.body = doc.node_for(&body);
        Ok(doc)
    }

    /// The id of `element`, registering it on first sight.
    pub fn node_for(&self, element: &Element) -> NodeId {
        if let Some(node) = self.lookup(element) {
            return node;
        }
        let mut registry = self.registry.borrow_mut();
        let node = NodeId::new(registry.next_id);
        registry.next_id += 1;
        if let Err(err) = element.set_attribute(NODE_ATTR, &node.get().to_string()) {
            tracing::warn!(%node, error = ?err, "could not tag element");
        }
        registry.elements.insert(node, element.clone());
        node
    }

    /// The id of an event target, if it sits inside a registered element
    /// other than the body.
    pub fn resolve_target(&self, element: &Element) -> Option<NodeId> {
        let mut current = Some(element.clone());
        while let Some(el) = current {
            if let Some(node) = self.lookup(&el) {
                if node == self.body {
                    return None;
                }
                return Some(self.node_for(element));
            }
            current = el.parent_element();
        }
        None
    }

    /// The element behind `node`.
    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.registry.borrow().elements.get(&node).cloned()
    }

    fn lookup(&self, element: &Element) -> Option<NodeId> {
        let raw = element.get_attribute(NODE_ATTR)?;
        let node = NodeId::new(raw.parse().ok()?);
        let registry = self.registry.borrow();
        (registry.elements.get(&node) == Some(element)).then_some(node)
    }

    fn get(&self, node: NodeId) -> Result<Element, DomError> {
        self.element(node).ok_or(DomError::UnknownNode(node))
    }

    fn html(&self, node: NodeId) -> Result<HtmlElement, DomError> {
        self.get(node)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| DomError::Host(format!("{node} has no inline style")))
    }

    fn style_value(&self, node: NodeId, name: &str) -> Option<String> {
        let value = self.html(node).ok()?.style().get_property_value(name).ok()?;
        (!value.is_empty()).then_some(value)
    }

    fn body_style(&self, props: &[(&str, &str)]) {
        let Ok(body) = self.html(self.body) else {
            return;
        };
        let style = body.style();
        for (name, value) in props {
            if let Err(err) = style.set_property(name, value) {
                tracing::warn!(property = name, error = ?err, "body style write failed");
            }
        }
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<(Element, String)> {
        std::mem::take(&mut self.outbox)
    }
}

impl Document for BrowserDocument {
    fn body(&self) -> NodeId {
        self.body
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        let element = self.document.create_element(tag).map_err(host_err)?;
        Ok(self.node_for(&element))
    }

    fn exists(&self, node: NodeId) -> bool {
        self.registry.borrow().elements.contains_key(&node)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(|el| el.tag_name().to_ascii_lowercase())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.element(node)?.parent_element()?;
        Some(self.node_for(&parent))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_el = self.get(parent)?;
        let child_el = self.get(child)?;
        if child == self.body || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        parent_el.append_child(&child_el).map_err(host_err)?;
        Ok(())
    }

    fn release(&mut self, node: NodeId) -> Result<(), DomError> {
        if node == self.body {
            return Err(DomError::HierarchyRequest {
                parent: node,
                child: node,
            });
        }
        let element = self
            .registry
            .borrow_mut()
            .elements
            .remove(&node)
            .ok_or(DomError::UnknownNode(node))?;
        element.remove();
        if let Err(err) = element.remove_attribute(NODE_ATTR) {
            tracing::warn!(%node, error = ?err, "could not untag element");
        }
        Ok(())
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        self.get(node)?.class_list().add_1(class).map_err(host_err)
    }

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        self.get(node)?.class_list().remove_1(class).map_err(host_err)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|el| el.class_list().contains(class))
    }

    fn set_property(&mut self, node: NodeId, property: Property) -> Result<(), DomError> {
        self.html(node)?
            .style()
            .set_property(property.name(), &property.css_value())
            .map_err(host_err)
    }

    fn opacity(&self, node: NodeId) -> Option<f32> {
        self.style_value(node, "opacity")?.trim().parse().ok()
    }

    fn offset(&self, node: NodeId) -> Point {
        let axis = |name| {
            self.style_value(node, name)
                .and_then(|v| parse_px(&v))
                .map_or(0, |px| px as i32)
        };
        Point::new(axis("left"), axis("top"))
    }

    fn client_size(&self, node: NodeId) -> Size {
        self.element(node).map_or(Size::ZERO, |el| {
            Size::new(
                el.client_width().max(0) as u32,
                el.client_height().max(0) as u32,
            )
        })
    }

    fn viewport(&self) -> Size {
        let dim = |value: Result<JsValue, JsValue>| {
            value
                .ok()
                .and_then(|v| v.as_f64())
                .map_or(0, |px| px.max(0.0) as u32)
        };
        Size::new(dim(self.window.inner_width()), dim(self.window.inner_height()))
    }

    fn scroll_y(&self) -> i32 {
        self.window.scroll_y().map_or(0, |y| y as i32)
    }

    fn scroll_to(&mut self, y: i32) {
        self.window.scroll_to_with_x_and_y(0.0, f64::from(y));
    }

    fn pin_page(&mut self, scroll_y: i32) {
        let top = format!("{}px", -scroll_y);
        self.body_style(&[
            ("top", top.as_str()),
            ("width", "100%"),
            ("overflow-x", Overflow::Hidden.as_css()),
            ("overflow-y", Overflow::Scroll.as_css()),
            ("position", "fixed"),
        ]);
    }

    fn unpin_page(&mut self) {
        self.body_style(&[
            ("overflow-x", Overflow::Unset.as_css()),
            ("overflow-y", Overflow::Unset.as_css()),
            ("position", "static"),
            ("width", "auto"),
        ]);
        if let Ok(body) = self.html(self.body)
            && let Err(err) = body.style().remove_property("top")
        {
            tracing::warn!(property = "top", error = ?err, "body style write failed");
        }
    }

    fn dispatch_event(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let element = self.get(node)?;
        self.outbox.push((element, name.to_owned()));
        Ok(())
    }
}

struct HostState {
    manager: RefCell<ModalManager<BrowserDocument>>,
    frame: RefCell<Option<AnimationFrame>>,
    listeners: RefCell<Vec<EventListener>>,
}

impl HostState {
    /// Run `op` on the manager, then deliver queued notifications.
    fn run<R>(
        &self,
        op: impl FnOnce(&mut ModalManager<BrowserDocument>) -> Result<R, ModalError>,
    ) -> Result<R, WebError> {
        let (result, outbox) = {
            let mut manager = self.manager.borrow_mut();
            let result = op(&mut manager);
            (result, manager.document_mut().take_outbox())
        };
        for (element, name) in outbox {
            let dispatched = CustomEvent::new(&name).and_then(|event| element.dispatch_event(&event));
            if let Err(err) = dispatched {
                tracing::warn!(event = %name, error = ?err, "notification dispatch failed");
            }
        }
        Ok(result?)
    }

    fn ensure_frame(self: &Rc<Self>, resume: bool) {
        if self.frame.borrow().is_some() {
            return;
        }
        {
            let mut manager = self.manager.borrow_mut();
            if manager.pending_timers() == 0 {
                return;
            }
            if resume {
                manager.resume_clock(Instant::now());
            }
        }
        let state = Rc::clone(self);
        let handle = request_animation_frame(move |_| {
            state.frame.borrow_mut().take();
            if let Err(err) = state.run(|m| m.tick(Instant::now())) {
                tracing::warn!(%err, "modal frame failed");
            }
            state.ensure_frame(false);
        });
        *self.frame.borrow_mut() = Some(handle);
    }

    fn input(self: &Rc<Self>, event: Event) -> Option<ModalAction> {
        match self.run(|m| m.handle_event(&event)) {
            Ok(action) => {
                if action.is_some() {
                    self.ensure_frame(true);
                }
                action
            }
            Err(err) => {
                tracing::warn!(%err, "modal input failed");
                None
            }
        }
    }

    fn target(&self, event: &web_sys::Event) -> Option<NodeId> {
        let element = event.target()?.dyn_into::<Element>().ok()?;
        self.manager.borrow().document().resolve_target(&element)
    }

    fn install_listeners(self: &Rc<Self>, target: &web_sys::Document) {
        let mut listeners = Vec::new();

        let weak: Weak<Self> = Rc::downgrade(self);
        listeners.push(EventListener::new(target, "keydown", move |event| {
            let Some(state) = weak.upgrade() else { return };
            if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                state.input(key_event(&key.key()));
            }
        }));

        let weak = Rc::downgrade(self);
        listeners.push(EventListener::new(target, "click", move |event| {
            let Some(state) = weak.upgrade() else { return };
            if let Some(node) = state.target(event) {
                state.input(Event::click(node));
            }
        }));

        let weak = Rc::downgrade(self);
        listeners.push(EventListener::new(target, "mousedown", move |event| {
            let Some(state) = weak.upgrade() else { return };
            let (Some(mouse), Some(node)) = (event.dyn_ref::<MouseEvent>(), state.target(event))
            else {
                return;
            };
            let pointer = PointerEvent::new(PointerEventKind::Down, mouse.client_x(), mouse.client_y())
                .target(node);
            state.input(Event::Pointer(pointer));
        }));

        let weak = Rc::downgrade(self);
        listeners.push(EventListener::new_with_options(
            target,
            "mousemove",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(state) = weak.upgrade() else { return };
                let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                let action = state.input(Event::pointer_move(mouse.client_x(), mouse.client_y()));
                if matches!(action, Some(ModalAction::Dragged { .. })) {
                    event.prevent_default();
                }
            },
        ));

        let weak = Rc::downgrade(self);
        listeners.push(EventListener::new(target, "mouseup", move |event| {
            let Some(state) = weak.upgrade() else { return };
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                state.input(Event::pointer_up(mouse.client_x(), mouse.client_y()));
            }
        }));

        *self.listeners.borrow_mut() = listeners;
    }
}

fn patch_from_js(options: &JsValue) -> Result<dimmer_widgets::ModalOptionsPatch, WebError> {
    if options.is_undefined() || options.is_null() {
        return Ok(dimmer_widgets::ModalOptionsPatch::new());
    }
    let json = js_sys::JSON::stringify(options)
        .map_err(|err| WebError::Host(format!("{err:?}")))?;
    parse_options(&String::from(json))
}

/// Script-facing modal manager for the current page.
#[wasm_bindgen]
pub struct ModalHost {
    state: Rc<HostState>,
}

#[wasm_bindgen]
impl ModalHost {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<ModalHost, JsValue> {
        let doc = BrowserDocument::new().map_err(to_js)?;
        let target = doc.document.clone();
        let state = Rc::new(HostState {
            manager: RefCell::new(ModalManager::new(doc)),
            frame: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        });
        state.install_listeners(&target);
        Ok(Self { state })
    }

    /// Open `element` as a modal. Returns the modal id.
    pub fn open(&self, element: &Element, options: JsValue) -> Result<f64, JsValue> {
        let patch = patch_from_js(&options).map_err(to_js)?;
        let id = self
            .state
            .run(|m| {
                let node = m.document().node_for(element);
                m.open(node, &patch)
            })
            .map_err(to_js)?;
        self.state.ensure_frame(true);
        Ok(id.id() as f64)
    }

    /// Close the top modal. Returns its id, or `undefined` when none is open.
    pub fn close(&self) -> Result<Option<f64>, JsValue> {
        let id = self.state.run(|m| m.close()).map_err(to_js)?;
        self.state.ensure_frame(true);
        Ok(id.map(|id| id.id() as f64))
    }

    /// Change the defaults for later opens.
    #[wasm_bindgen(js_name = setOptions)]
    pub fn set_options(&self, options: JsValue) -> Result<(), JsValue> {
        let patch = patch_from_js(&options).map_err(to_js)?;
        self.state.run(|m| m.set_options(&patch)).map_err(to_js)
    }

    /// Number of open modals.
    #[wasm_bindgen(getter)]
    pub fn depth(&self) -> u32 {
        self.state.manager.borrow().depth() as u32
    }
}
