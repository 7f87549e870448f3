#![forbid(unsafe_code)]

//! The modal stack.
//!
//! [`ModalManager`] owns the document, the ordered collection of open
//! modals, and every shared resource they coordinate through: the fade
//! [`Animator`], the timer queue, the [`ScrollLock`], and the
//! [`EscapeBinding`]. Hosts forward input with
//! [`ModalManager::handle_event`] and drive time with
//! [`ModalManager::advance`] or [`ModalManager::tick`].
//!
//! # Invariants
//!
//! - Close ordering is LIFO. `close()` always pops the newest modal.
//! - Once pending closes finish, `depth()` equals the number of modal
//!   containers attached to the body.
//! - The scroll lock is acquired on the 0 → 1 transition and released on
//!   the 1 → 0 transition, never in between.
//! - Escape closes the top modal only, and only when it opened with
//!   `escape_close`.
//! - `AFTER_CLOSE_EVENT` fires exactly once per close, after the content is
//!   back under the body.
//!
//! # Failure Modes
//!
//! - `open` with an element the document never issued returns
//!   [`ModalError::UnknownElement`] before touching anything.
//! - `close()` on an empty stack returns `Ok(None)`.
//! - Document failures surface as [`ModalError::Dom`]. A failed `open`
//!   rolls back everything it did; a failed `close` detaches the popped
//!   modal before returning the error.
//! - Containers and close affordances are released once detached, so their
//!   ids stop resolving.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use dimmer_core::{Event, HeadlessDocument, Size};
//! use dimmer_widgets::modal::{ModalManager, ModalOptionsPatch, ModalPhase};
//!
//! let mut doc = HeadlessDocument::default();
//! let dialog = doc.create_attached("div", Size::new(400, 300));
//! let mut modals = ModalManager::new(doc);
//!
//! let id = modals.open(dialog, &ModalOptionsPatch::new()).unwrap();
//! assert_eq!(modals.phase(id), Some(ModalPhase::Opening));
//!
//! modals.advance(Duration::from_millis(500)).unwrap();
//! assert_eq!(modals.phase(id), Some(ModalPhase::Open));
//!
//! modals.handle_event(&Event::escape()).unwrap();
//! modals.advance(Duration::from_millis(500)).unwrap();
//! assert_eq!(modals.drain_closed(), vec![id]);
//! assert!(modals.is_empty());
//! ```

use std::time::Duration;

use dimmer_core::{
    ClickEvent, Display, Document, DomError, Event, HostClock, KeyCode, KeyEvent, KeyEventKind,
    NodeId, Point, PointerEvent, PointerEventKind, Property, Scheduler, TimerHandle,
};
use web_time::Instant;

use super::animation::{Animator, FadeDirection, FadeFrame, FadeStart};
use super::container::{self, CloseReason, ModalAction, ModalNodes};
use super::drag::DragController;
use super::error::ModalError;
use super::escape::EscapeBinding;
use super::options::{ModalOptions, ModalOptionsPatch};
use super::scroll_lock::ScrollLock;

/// Event dispatched on the content element once a close has finished.
pub const AFTER_CLOSE_EVENT: &str = "modal:after-close";

/// Identifier of a modal, unique within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModalId(u64);

impl ModalId {
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Lifecycle of one modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalPhase {
    /// Fading in.
    Opening,
    /// Content fully shown.
    Open,
    /// Popped and fading out; nodes still attached.
    Closing,
    /// Nodes detached and the after-close event dispatched.
    Closed,
}

/// Deferred work carried by the manager's timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalTask {
    Fade(FadeFrame),
    /// Start the delayed content fade-in.
    RevealContent(ModalId),
    /// Detach a closed modal after its fade-out.
    FinishClose(ModalId),
}

impl From<FadeFrame> for ModalTask {
    fn from(frame: FadeFrame) -> Self {
        Self::Fade(frame)
    }
}

#[derive(Debug)]
struct ActiveModalEntry {
    id: ModalId,
    nodes: ModalNodes,
    options: ModalOptions,
    phase: ModalPhase,
    reveal_timer: Option<TimerHandle>,
    drag: Option<DragController>,
}

#[derive(Debug)]
struct ClosingModal {
    id: ModalId,
    nodes: ModalNodes,
    timer: Option<TimerHandle>,
}

/// Owner of the open modals and the resources they share.
#[derive(Debug)]
pub struct ModalManager<D: Document> {
    doc: D,
    defaults: ModalOptions,
    entries: Vec<ActiveModalEntry>,
    closing: Vec<ClosingModal>,
    animator: Animator,
    timers: Scheduler<ModalTask>,
    scroll_lock: ScrollLock,
    escape: EscapeBinding,
    clock: HostClock,
    closed: Vec<ModalId>,
    next_id: u64,
}

impl<D: Document> ModalManager<D> {
    /// Create a manager with the stock defaults.
    pub fn new(doc: D) -> Self {
        Self {
            doc,
            defaults: ModalOptions::default(),
            entries: Vec::new(),
            closing: Vec::new(),
            animator: Animator::new(),
            timers: Scheduler::new(),
            scroll_lock: ScrollLock::new(),
            escape: EscapeBinding::new(),
            clock: HostClock::new(),
            closed: Vec::new(),
            next_id: 1,
        }
    }

    /// Create a manager with injected defaults.
    pub fn with_defaults(doc: D, defaults: ModalOptions) -> Result<Self, ModalError> {
        defaults.validate()?;
        let mut manager = Self::new(doc);
        manager.defaults = defaults;
        Ok(manager)
    }

    /// Step fades every `frame_interval` instead of at 60 Hz.
    #[must_use]
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.animator = Animator::with_frame_interval(frame_interval);
        self
    }

    /// Change the defaults used by later opens. Open modals keep their own
    /// snapshot.
    pub fn set_options(&mut self, patch: &ModalOptionsPatch) -> Result<(), ModalError> {
        let updated = self.defaults.merged(patch);
        updated.validate()?;
        self.defaults = updated;
        #[cfg(feature = "tracing")]
        tracing::debug!(?patch, "modal defaults updated");
        Ok(())
    }

    /// Lift `element` into a new modal on top of the stack.
    pub fn open(
        &mut self,
        element: NodeId,
        patch: &ModalOptionsPatch,
    ) -> Result<ModalId, ModalError> {
        if !self.doc.exists(element) {
            return Err(ModalError::UnknownElement(element));
        }
        if let Some(entry) = self.entries.iter().find(|e| e.nodes.content == element) {
            return Err(ModalError::AlreadyOpen {
                element,
                id: entry.id,
            });
        }
        let body = self.doc.body();
        if self.doc.contains(element, body) {
            return Err(DomError::HierarchyRequest {
                parent: body,
                child: element,
            }
            .into());
        }
        let options = self.defaults.merged(patch);
        options.validate()?;

        if let Some(pos) = self.closing.iter().position(|c| c.nodes.content == element) {
            let pending = self.closing.remove(pos);
            #[cfg(feature = "tracing")]
            tracing::debug!(id = pending.id.0, %element, "finishing pending close before reopen");
            self.finish_close(pending)?;
        }

        let id = ModalId(self.next_id);
        self.next_id += 1;

        let had_modal_class = self.doc.has_class(element, &options.modal_class);
        let nodes = container::assemble(&mut self.doc, element, &options)?;
        let locked_here = self.entries.is_empty();
        if locked_here {
            self.scroll_lock.acquire(&mut self.doc);
        }

        let (phase, reveal_timer, drag) = match self.start_open(id, &nodes, &options) {
            Ok(started) => started,
            Err(err) => {
                self.abort_open(&nodes, &options, had_modal_class, locked_here);
                return Err(err);
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            id = id.0,
            %element,
            container = %nodes.container,
            depth = self.entries.len() + 1,
            duration = ?options.fade_duration(),
            delay = ?options.content_delay(),
            "modal opened"
        );
        self.entries.push(ActiveModalEntry {
            id,
            nodes,
            options,
            phase,
            reveal_timer,
            drag,
        });
        self.sync_escape();
        Ok(id)
    }

    /// Start the fades and drag wiring of a freshly assembled modal. The
    /// reveal timer is armed last so a failure never leaves one behind.
    fn start_open(
        &mut self,
        id: ModalId,
        nodes: &ModalNodes,
        options: &ModalOptions,
    ) -> Result<(ModalPhase, Option<TimerHandle>, Option<DragController>), ModalError> {
        let duration = options.fade_duration();
        self.animator.fade_in(
            &mut self.doc,
            &mut self.timers,
            nodes.container,
            Display::Block,
            duration,
            None,
        )?;

        let mut phase = ModalPhase::Opening;
        let delay = options.content_delay();
        if delay.is_zero() {
            let start = self.animator.fade_in(
                &mut self.doc,
                &mut self.timers,
                nodes.content,
                Display::InlineBlock,
                duration,
                None,
            )?;
            if start == FadeStart::Completed {
                phase = ModalPhase::Open;
            }
        } else {
            self.doc.set_property(nodes.content, Property::Opacity(0.0))?;
        }

        let drag = if options.allow_drag {
            Some(DragController::attach(&mut self.doc, nodes.content)?)
        } else {
            None
        };

        let reveal_timer =
            (!delay.is_zero()).then(|| self.timers.set_timeout(delay, ModalTask::RevealContent(id)));
        Ok((phase, reveal_timer, drag))
    }

    /// Undo an `open` that failed after assembly: stop its fades, hand the
    /// content back to the body, and drop the scroll lock if this open took
    /// it. Cleanup failures are logged; the original error wins.
    fn abort_open(
        &mut self,
        nodes: &ModalNodes,
        options: &ModalOptions,
        had_modal_class: bool,
        locked_here: bool,
    ) {
        self.animator.cancel(&mut self.timers, nodes.content);
        self.animator.cancel(&mut self.timers, nodes.container);
        if let Err(_err) = container::disassemble(&mut self.doc, nodes) {
            #[cfg(feature = "tracing")]
            tracing::warn!(container = %nodes.container, error = %_err, "rollback could not detach container");
        }
        if !had_modal_class
            && !options.modal_class.is_empty()
            && let Err(_err) = self.doc.remove_class(nodes.content, &options.modal_class)
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(content = %nodes.content, error = %_err, "rollback could not restore classes");
        }
        if locked_here {
            self.scroll_lock.release(&mut self.doc);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(content = %nodes.content, "open rolled back");
    }

    /// Close the top modal. Returns its id, or `None` if nothing was open.
    ///
    /// If a fade-out cannot start, the modal is detached on the spot and the
    /// error is returned; the stack is already consistent at that point.
    pub fn close(&mut self) -> Result<Option<ModalId>, ModalError> {
        let Some(entry) = self.entries.pop() else {
            #[cfg(feature = "tracing")]
            tracing::trace!("close on empty stack ignored");
            return Ok(None);
        };
        self.sync_escape();
        if let Some(timer) = entry.reveal_timer {
            self.timers.cancel(timer);
        }
        if self.entries.is_empty() {
            self.scroll_lock.release(&mut self.doc);
        }

        let duration = entry.options.fade_duration();
        let mut pending = ClosingModal {
            id: entry.id,
            nodes: entry.nodes,
            timer: None,
        };
        if let Err(err) = self.start_close(&entry.nodes, duration) {
            #[cfg(feature = "tracing")]
            tracing::debug!(id = entry.id.0, error = %err, "close fade failed, detaching now");
            self.finish_close(pending)?;
            return Err(err);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(id = entry.id.0, depth = self.entries.len(), ?duration, "modal closing");

        if duration.is_zero() {
            self.finish_close(pending)?;
        } else {
            pending.timer = Some(self.timers.set_timeout(duration, ModalTask::FinishClose(entry.id)));
            self.closing.push(pending);
        }
        Ok(Some(entry.id))
    }

    fn start_close(&mut self, nodes: &ModalNodes, duration: Duration) -> Result<(), ModalError> {
        self.animator
            .fade_out(&mut self.doc, &mut self.timers, nodes.content, duration, None)?;
        self.animator
            .fade_out(&mut self.doc, &mut self.timers, nodes.container, duration, None)?;
        Ok(())
    }

    /// Route host input to the top modal.
    pub fn handle_event(&mut self, event: &Event) -> Result<Option<ModalAction>, ModalError> {
        match *event {
            Event::Key(KeyEvent {
                code: KeyCode::Escape,
                kind: KeyEventKind::Press,
            }) => {
                if self.escape.owner().is_none() {
                    return Ok(None);
                }
                self.close_for(CloseReason::Escape)
            }
            Event::Key(_) => Ok(None),
            Event::Click(ClickEvent { target }) => {
                let Some(top) = self.entries.last() else {
                    return Ok(None);
                };
                if top
                    .nodes
                    .close_button
                    .is_some_and(|button| self.doc.contains(button, target))
                {
                    self.close_for(CloseReason::CloseButton)
                } else if top.options.click_close && target == top.nodes.container {
                    self.close_for(CloseReason::Backdrop)
                } else {
                    Ok(None)
                }
            }
            Event::Pointer(pointer) => self.handle_pointer(pointer),
        }
    }

    fn close_for(&mut self, reason: CloseReason) -> Result<Option<ModalAction>, ModalError> {
        Ok(self
            .close()?
            .map(|id| ModalAction::Closed { id, reason }))
    }

    fn handle_pointer(&mut self, pointer: PointerEvent) -> Result<Option<ModalAction>, ModalError> {
        let Some(entry) = self.entries.last_mut() else {
            return Ok(None);
        };
        let id = entry.id;
        let Some(drag) = entry.drag.as_mut() else {
            return Ok(None);
        };
        match pointer.kind {
            PointerEventKind::Down => {
                let started = pointer
                    .target
                    .is_some_and(|target| drag.pointer_down(&self.doc, target, pointer.position));
                Ok(started.then_some(ModalAction::DragStarted { id }))
            }
            PointerEventKind::Move => Ok(drag
                .pointer_move(&mut self.doc, pointer.position)?
                .map(|position| ModalAction::Dragged { id, position })),
            PointerEventKind::Up => Ok(drag.pointer_up().then_some(ModalAction::DragEnded { id })),
        }
    }

    /// Run every task due within `dt`.
    pub fn advance(&mut self, dt: Duration) -> Result<(), ModalError> {
        let horizon = self.timers.now().saturating_add(dt);
        while let Some((_, task)) = self.timers.poll(horizon) {
            self.run_task(task)?;
        }
        Ok(())
    }

    /// Advance by the time elapsed since the previous tick.
    pub fn tick(&mut self, now: Instant) -> Result<(), ModalError> {
        let dt = self.clock.delta(now);
        self.advance(dt)
    }

    /// Restart the tick clock at `now`, discarding time spent idle.
    pub fn resume_clock(&mut self, now: Instant) {
        self.clock.reset(now);
    }

    fn run_task(&mut self, task: ModalTask) -> Result<(), ModalError> {
        match task {
            ModalTask::Fade(frame) => {
                let done = self.animator.on_frame(&mut self.doc, &mut self.timers, frame)?;
                if done == Some(FadeDirection::In)
                    && let Some(entry) = self
                        .entries
                        .iter_mut()
                        .find(|e| e.nodes.content == frame.node && e.phase == ModalPhase::Opening)
                {
                    entry.phase = ModalPhase::Open;
                    #[cfg(feature = "tracing")]
                    tracing::debug!(id = entry.id.0, "modal open");
                }
            }
            ModalTask::RevealContent(id) => {
                let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
                    return Ok(());
                };
                entry.reveal_timer = None;
                let start = self.animator.fade_in(
                    &mut self.doc,
                    &mut self.timers,
                    entry.nodes.content,
                    Display::InlineBlock,
                    entry.options.fade_duration(),
                    None,
                )?;
                if start == FadeStart::Completed {
                    entry.phase = ModalPhase::Open;
                }
            }
            ModalTask::FinishClose(id) => {
                if let Some(pos) = self.closing.iter().position(|c| c.id == id) {
                    let pending = self.closing.remove(pos);
                    self.finish_close(pending)?;
                }
            }
        }
        Ok(())
    }

    fn finish_close(&mut self, mut pending: ClosingModal) -> Result<(), ModalError> {
        if let Some(timer) = pending.timer.take() {
            self.timers.cancel(timer);
        }
        self.animator.cancel(&mut self.timers, pending.nodes.content);
        self.animator.cancel(&mut self.timers, pending.nodes.container);
        container::disassemble(&mut self.doc, &pending.nodes)?;
        self.doc.dispatch_event(pending.nodes.content, AFTER_CLOSE_EVENT)?;
        self.closed.push(pending.id);
        #[cfg(feature = "tracing")]
        tracing::debug!(id = pending.id.0, content = %pending.nodes.content, "modal closed");
        Ok(())
    }

    fn sync_escape(&mut self) {
        let top = self
            .entries
            .last()
            .map(|entry| (entry.id, entry.options.escape_close));
        self.escape.rebind(top);
    }

    fn entry(&self, id: ModalId) -> Option<&ActiveModalEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Ids of modals whose close finished since the previous drain.
    pub fn drain_closed(&mut self) -> Vec<ModalId> {
        std::mem::take(&mut self.closed)
    }

    /// Number of open modals.
    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The modal `close()` would pop.
    pub fn top_id(&self) -> Option<ModalId> {
        self.entries.last().map(|e| e.id)
    }

    /// Whether `id` is open (not closing).
    pub fn contains(&self, id: ModalId) -> bool {
        self.entry(id).is_some()
    }

    /// Lifecycle phase of `id`, or `None` for ids this manager never issued.
    pub fn phase(&self, id: ModalId) -> Option<ModalPhase> {
        if let Some(entry) = self.entry(id) {
            return Some(entry.phase);
        }
        if self.closing.iter().any(|c| c.id == id) {
            return Some(ModalPhase::Closing);
        }
        (id.0 > 0 && id.0 < self.next_id).then_some(ModalPhase::Closed)
    }

    /// Effective options of an open modal.
    pub fn options(&self, id: ModalId) -> Option<&ModalOptions> {
        self.entry(id).map(|e| &e.options)
    }

    /// Backdrop container of an open modal.
    pub fn container(&self, id: ModalId) -> Option<NodeId> {
        self.entry(id).map(|e| e.nodes.container)
    }

    /// Content element of an open modal.
    pub fn content(&self, id: ModalId) -> Option<NodeId> {
        self.entry(id).map(|e| e.nodes.content)
    }

    /// Close affordance of an open modal, when it has one.
    pub fn close_button(&self, id: ModalId) -> Option<NodeId> {
        self.entry(id).and_then(|e| e.nodes.close_button)
    }

    /// Current offset of a draggable modal's content.
    pub fn drag_position(&self, id: ModalId) -> Option<Point> {
        let entry = self.entry(id)?;
        entry.drag.as_ref().map(|_| self.doc.offset(entry.nodes.content))
    }

    /// Whether a drag gesture is in progress on `id`.
    pub fn is_dragging(&self, id: ModalId) -> bool {
        self.entry(id)
            .and_then(|e| e.drag.as_ref())
            .is_some_and(DragController::is_dragging)
    }

    /// The modal Escape currently closes.
    #[inline]
    pub fn escape_owner(&self) -> Option<ModalId> {
        self.escape.owner()
    }

    #[inline]
    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll_lock
    }

    #[inline]
    pub fn defaults(&self) -> &ModalOptions {
        &self.defaults
    }

    /// Number of modals popped but still fading out.
    #[inline]
    pub fn closing_count(&self) -> usize {
        self.closing.len()
    }

    /// Number of armed timers.
    #[inline]
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Time until the next armed timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers
            .next_deadline()
            .map(|due| due.saturating_sub(self.timers.now()))
    }

    #[inline]
    pub fn document(&self) -> &D {
        &self.doc
    }

    #[inline]
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }
}
