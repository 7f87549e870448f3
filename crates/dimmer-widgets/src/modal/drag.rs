#![forbid(unsafe_code)]

//! Constrained dragging of a modal's content element.
//!
//! A [`DragController`] tracks one element. Pointer-down inside the element
//! captures the grab offset; pointer-move then writes a clamped `left`/`top`
//! until pointer-up.
//!
//! # Invariants
//!
//! - Each axis is clamped against
//!   `limit = floor((viewport - size) / 2) + size - margin`. Whenever the
//!   limit is non-negative, `|position| <= limit` after every move.
//! - Pointer-down on `input`, `textarea` or `select` never starts a drag.
//! - Moves outside a drag do nothing.

use dimmer_core::dom::is_text_input;
use dimmer_core::{Document, DomError, NodeId, Overflow, Point, Property, Size};

/// Pixels of the element kept on screen along each axis.
pub const DRAG_EDGE_MARGIN: i32 = 30;

/// Largest offset from the resting position allowed along one axis.
pub fn drag_limit(viewport: u32, size: u32, margin: i32) -> i32 {
    let viewport = i64::from(viewport);
    let size = i64::from(size);
    let limit = (viewport - size).div_euclid(2) + size - i64::from(margin);
    limit.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Clamp one axis of a drag candidate.
///
/// A negative candidate whose magnitude exceeds `limit` snaps to `-limit`; a
/// non-negative candidate above `limit` snaps to `limit`.
pub fn clamp_axis(candidate: i32, limit: i32) -> i32 {
    let (c, l) = (i64::from(candidate), i64::from(limit));
    let clamped = if c < 0 {
        if c.abs() > l { -l } else { c }
    } else if c > l {
        l
    } else {
        c
    };
    clamped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Transient state of one drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragState {
    /// Pointer position minus element offset, captured at pointer-down.
    pub grab: Point,
    /// Last written position.
    pub position: Point,
}

/// Pointer tracking for one content element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragController {
    element: NodeId,
    margin: Point,
    state: Option<DragState>,
}

impl DragController {
    /// Prepare `element` for dragging: reset its offset to the origin and
    /// clip overflow on its parent.
    pub fn attach(doc: &mut dyn Document, element: NodeId) -> Result<Self, DomError> {
        doc.set_property(element, Property::Left(0))?;
        doc.set_property(element, Property::Top(0))?;
        if let Some(parent) = doc.parent(element) {
            doc.set_property(parent, Property::Overflow(Overflow::Hidden))?;
        }
        Ok(Self {
            element,
            margin: Point::new(DRAG_EDGE_MARGIN, DRAG_EDGE_MARGIN),
            state: None,
        })
    }

    /// Override the edge margin per axis.
    #[must_use]
    pub fn margin(mut self, horizontal: i32, vertical: i32) -> Self {
        self.margin = Point::new(horizontal, vertical);
        self
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.state.is_some()
    }

    /// State of the gesture in progress.
    #[inline]
    pub fn state(&self) -> Option<DragState> {
        self.state
    }

    /// Per-axis limits for the current viewport and element size.
    pub fn limits(&self, doc: &dyn Document) -> Point {
        let viewport = doc.viewport();
        let size: Size = doc.client_size(self.element);
        Point::new(
            drag_limit(viewport.width, size.width, self.margin.x),
            drag_limit(viewport.height, size.height, self.margin.y),
        )
    }

    /// Start a drag if `target` is inside the element and is not a text
    /// control. Returns whether a drag started.
    pub fn pointer_down(&mut self, doc: &dyn Document, target: NodeId, pointer: Point) -> bool {
        if !doc.contains(self.element, target) {
            return false;
        }
        if doc.tag_name(target).is_some_and(|tag| is_text_input(&tag)) {
            #[cfg(feature = "tracing")]
            tracing::trace!(%target, "drag skipped on text control");
            return false;
        }
        let offset = doc.offset(self.element);
        self.state = Some(DragState {
            grab: pointer - offset,
            position: offset,
        });
        #[cfg(feature = "tracing")]
        tracing::trace!(element = %self.element, x = pointer.x, y = pointer.y, "drag started");
        true
    }

    /// Move the element under the pointer, clamped to the viewport. Returns
    /// the written position, or `None` outside a drag.
    pub fn pointer_move(
        &mut self,
        doc: &mut dyn Document,
        pointer: Point,
    ) -> Result<Option<Point>, DomError> {
        let Some(mut state) = self.state else {
            return Ok(None);
        };
        let candidate = pointer - state.grab;
        let limits = self.limits(doc);
        let position = Point::new(
            clamp_axis(candidate.x, limits.x),
            clamp_axis(candidate.y, limits.y),
        );
        doc.set_property(self.element, Property::Left(position.x))?;
        doc.set_property(self.element, Property::Top(position.y))?;
        state.position = position;
        self.state = Some(state);
        Ok(Some(position))
    }

    /// End the gesture. Returns whether a drag was in progress.
    pub fn pointer_up(&mut self) -> bool {
        self.state.take().is_some()
    }
}
