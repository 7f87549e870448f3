#![forbid(unsafe_code)]

//! Opacity fades driven by the host timer queue.
//!
//! The [`Animator`] steps inline opacity on one interval timer per element
//! and backs it with a one-shot deadline timer at the full duration, so a
//! fade always lands on its bound within one duration even if the host
//! delivers frames late.
//!
//! # Invariants
//!
//! - An element has at most one active fade.
//! - A fade in the same direction as the active one is ignored.
//! - A fade in the opposite direction cancels the active one first; the
//!   cancelled fade's callback never runs.
//! - A completed fade cancels both of its timers and runs its callback
//!   exactly once.
//! - Fade-in ends at opacity 1. Fade-out ends at opacity 0 with
//!   `display: none` and `visibility: hidden`.
//!
//! # Failure Modes
//!
//! - Frames for an element with no active fade are ignored. This only
//!   happens if a caller delivers a frame it polled before cancelling.
//! - Document write failures propagate. A step that fails to write leaves
//!   the fade registered, so the deadline frame can still finish it.

use std::time::Duration;

use ahash::AHashMap;
use dimmer_core::{
    Display, Document, DomError, FRAME_INTERVAL, NodeId, Property, Scheduler, TimerHandle,
    Visibility,
};

/// Completion hook for a fade. Runs once, after the bound is written.
pub type FadeCallback = Box<dyn FnOnce(&mut dyn Document)>;

/// Fade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FadeDirection {
    In,
    Out,
}

/// Outcome of a fade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStart {
    /// Timers are armed; the fade finishes in a later frame.
    Started,
    /// Zero duration: the bound was written synchronously.
    Completed,
    /// A fade in the same direction is already running.
    Ignored,
}

/// Which timer produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Periodic opacity step.
    Step,
    /// The duration elapsed.
    Deadline,
}

/// Timer payload for one fade frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FadeFrame {
    pub node: NodeId,
    pub kind: FrameKind,
}

struct ActiveFade {
    direction: FadeDirection,
    level: f32,
    step: f32,
    interval: TimerHandle,
    deadline: TimerHandle,
    on_complete: Option<FadeCallback>,
}

impl std::fmt::Debug for ActiveFade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveFade")
            .field("direction", &self.direction)
            .field("level", &self.level)
            .field("step", &self.step)
            .field("interval", &self.interval)
            .field("deadline", &self.deadline)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

/// Per-element opacity fades.
#[derive(Debug)]
pub struct Animator {
    frame_interval: Duration,
    active: AHashMap<NodeId, ActiveFade>,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    /// Create an animator stepping at [`FRAME_INTERVAL`].
    pub fn new() -> Self {
        Self::with_frame_interval(FRAME_INTERVAL)
    }

    /// Create an animator stepping every `frame_interval`.
    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            frame_interval: frame_interval.max(Duration::from_micros(1)),
            active: AHashMap::new(),
        }
    }

    #[inline]
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Direction of the active fade on `node`, if any.
    pub fn fading(&self, node: NodeId) -> Option<FadeDirection> {
        self.active.get(&node).map(|fade| fade.direction)
    }

    /// Opacity increment per frame for a fade of `duration`.
    pub fn step_for(&self, duration: Duration) -> f32 {
        if duration.is_zero() {
            return 1.0;
        }
        (self.frame_interval.as_secs_f64() / duration.as_secs_f64()) as f32
    }

    /// Show `node` with `display` and ramp its opacity up to 1.
    pub fn fade_in<T: From<FadeFrame>>(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut Scheduler<T>,
        node: NodeId,
        display: Display,
        duration: Duration,
        on_complete: Option<FadeCallback>,
    ) -> Result<FadeStart, DomError> {
        let Some(level) = self.begin(timers, node, FadeDirection::In) else {
            return Ok(FadeStart::Ignored);
        };
        let level = level.or_else(|| doc.opacity(node)).unwrap_or(0.0);
        doc.set_property(node, Property::Display(display))?;
        doc.set_property(node, Property::Visibility(Visibility::Visible))?;
        doc.set_property(node, Property::Opacity(level))?;
        self.arm(doc, timers, node, FadeDirection::In, level, duration, on_complete)
    }

    /// Ramp the opacity of `node` down to 0, then hide it.
    pub fn fade_out<T: From<FadeFrame>>(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut Scheduler<T>,
        node: NodeId,
        duration: Duration,
        on_complete: Option<FadeCallback>,
    ) -> Result<FadeStart, DomError> {
        let Some(level) = self.begin(timers, node, FadeDirection::Out) else {
            return Ok(FadeStart::Ignored);
        };
        let level = level.or_else(|| doc.opacity(node)).unwrap_or(1.0);
        self.arm(doc, timers, node, FadeDirection::Out, level, duration, on_complete)
    }

    /// Stop the active fade on `node` without reaching its bound. The
    /// callback is dropped. Returns `false` if nothing was fading.
    pub fn cancel<T>(&mut self, timers: &mut Scheduler<T>, node: NodeId) -> bool {
        match self.active.remove(&node) {
            Some(fade) => {
                timers.cancel(fade.interval);
                timers.cancel(fade.deadline);
                #[cfg(feature = "tracing")]
                tracing::trace!(%node, direction = ?fade.direction, "fade cancelled");
                true
            }
            None => false,
        }
    }

    /// Apply one timer frame. Returns the direction of a fade that finished
    /// on this frame.
    pub fn on_frame<T>(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut Scheduler<T>,
        frame: FadeFrame,
    ) -> Result<Option<FadeDirection>, DomError> {
        let Some(fade) = self.active.get_mut(&frame.node) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(node = %frame.node, "frame for idle element ignored");
            return Ok(None);
        };
        if frame.kind == FrameKind::Step {
            let next = match fade.direction {
                FadeDirection::In => fade.level + fade.step,
                FadeDirection::Out => fade.level - fade.step,
            };
            let reached = match fade.direction {
                FadeDirection::In => next >= 1.0,
                FadeDirection::Out => next <= 0.0,
            };
            if !reached {
                fade.level = next;
                doc.set_property(frame.node, Property::Opacity(next))?;
                return Ok(None);
            }
        }
        self.finish(doc, timers, frame.node).map(Some)
    }

    /// Remove the active fade on `node` if it runs the other way. Returns
    /// `None` when the request should be ignored, otherwise the level the
    /// cancelled fade had reached.
    fn begin<T>(
        &mut self,
        timers: &mut Scheduler<T>,
        node: NodeId,
        direction: FadeDirection,
    ) -> Option<Option<f32>> {
        match self.active.get(&node) {
            Some(fade) if fade.direction == direction => {
                #[cfg(feature = "tracing")]
                tracing::trace!(%node, ?direction, "fade already running");
                None
            }
            Some(fade) => {
                let level = fade.level;
                self.cancel(timers, node);
                Some(Some(level))
            }
            None => Some(None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn arm<T: From<FadeFrame>>(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut Scheduler<T>,
        node: NodeId,
        direction: FadeDirection,
        level: f32,
        duration: Duration,
        on_complete: Option<FadeCallback>,
    ) -> Result<FadeStart, DomError> {
        let step = self.step_for(duration);
        let fade = ActiveFade {
            direction,
            level,
            step,
            interval: timers.set_interval(
                self.frame_interval,
                FadeFrame {
                    node,
                    kind: FrameKind::Step,
                }
                .into(),
            ),
            deadline: timers.set_timeout(
                duration,
                FadeFrame {
                    node,
                    kind: FrameKind::Deadline,
                }
                .into(),
            ),
            on_complete,
        };
        self.active.insert(node, fade);

        if duration.is_zero() {
            self.finish(doc, timers, node)?;
            return Ok(FadeStart::Completed);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(%node, ?direction, from = level, step, ?duration, "fade started");
        Ok(FadeStart::Started)
    }

    fn finish<T>(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut Scheduler<T>,
        node: NodeId,
    ) -> Result<FadeDirection, DomError> {
        let Some(mut fade) = self.active.remove(&node) else {
            return Err(DomError::UnknownNode(node));
        };
        timers.cancel(fade.interval);
        timers.cancel(fade.deadline);
        match fade.direction {
            FadeDirection::In => {
                doc.set_property(node, Property::Opacity(1.0))?;
            }
            FadeDirection::Out => {
                doc.set_property(node, Property::Opacity(0.0))?;
                doc.set_property(node, Property::Display(Display::None))?;
                doc.set_property(node, Property::Visibility(Visibility::Hidden))?;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(%node, direction = ?fade.direction, "fade finished");
        if let Some(callback) = fade.on_complete.take() {
            callback(doc);
        }
        Ok(fade.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimmer_core::{HeadlessDocument, Size};
    use std::cell::Cell;
    use std::rc::Rc;

    const MS: Duration = Duration::from_millis(1);

    struct Rig {
        doc: HeadlessDocument,
        timers: Scheduler<FadeFrame>,
        animator: Animator,
        node: NodeId,
    }

    impl Rig {
        fn new() -> Self {
            let mut doc = HeadlessDocument::default();
            let node = doc.create_attached("div", Size::new(100, 100));
            Self {
                doc,
                timers: Scheduler::new(),
                animator: Animator::new(),
                node,
            }
        }

        fn fade_in(&mut self, duration: Duration, cb: Option<FadeCallback>) -> FadeStart {
            self.animator
                .fade_in(&mut self.doc, &mut self.timers, self.node, Display::Block, duration, cb)
                .unwrap()
        }

        fn fade_out(&mut self, duration: Duration, cb: Option<FadeCallback>) -> FadeStart {
            self.animator
                .fade_out(&mut self.doc, &mut self.timers, self.node, duration, cb)
                .unwrap()
        }

        fn run(&mut self, dt: Duration) -> Vec<FadeDirection> {
            let horizon = self.timers.now() + dt;
            let mut done = Vec::new();
            while let Some((_, frame)) = self.timers.poll(horizon) {
                if let Some(dir) = self.animator.on_frame(&mut self.doc, &mut self.timers, frame).unwrap() {
                    done.push(dir);
                }
            }
            done
        }

        fn opacity(&self) -> f32 {
            self.doc.opacity(self.node).unwrap_or(1.0)
        }
    }

    fn counter() -> (Rc<Cell<u32>>, FadeCallback) {
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        (hits, Box::new(move |_: &mut dyn Document| seen.set(seen.get() + 1)))
    }

    #[test]
    fn fade_in_ramps_to_one() {
        let mut rig = Rig::new();
        assert_eq!(rig.fade_in(MS * 260, None), FadeStart::Started);
        assert_eq!(rig.opacity(), 0.0);
        assert_eq!(rig.doc.style(rig.node).unwrap().display, Some(Display::Block));

        rig.run(MS * 100);
        let mid = rig.opacity();
        assert!(mid > 0.0 && mid < 1.0, "mid-fade opacity {mid}");

        assert_eq!(rig.run(MS * 160), vec![FadeDirection::In]);
        assert_eq!(rig.opacity(), 1.0);
        assert!(rig.timers.is_empty());
        assert!(rig.animator.fading(rig.node).is_none());
    }

    #[test]
    fn zero_duration_is_synchronous() {
        let mut rig = Rig::new();
        let (hits, cb) = counter();
        assert_eq!(rig.fade_in(Duration::ZERO, Some(cb)), FadeStart::Completed);
        assert_eq!(rig.opacity(), 1.0);
        assert_eq!(hits.get(), 1);
        assert!(rig.timers.is_empty());

        assert_eq!(rig.fade_out(Duration::ZERO, None), FadeStart::Completed);
        let style = rig.doc.style(rig.node).unwrap();
        assert_eq!(style.display, Some(Display::None));
        assert_eq!(style.visibility, Some(Visibility::Hidden));
        assert!(rig.timers.is_empty());
    }

    #[test]
    fn repeat_in_same_direction_is_ignored() {
        let mut rig = Rig::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        rig.fade_in(MS * 100, Some(cb1));
        let pending = rig.timers.pending();
        assert_eq!(rig.fade_in(MS * 100, Some(cb2)), FadeStart::Ignored);
        assert_eq!(rig.timers.pending(), pending);

        rig.run(MS * 200);
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 0);
    }

    #[test]
    fn fade_out_supersedes_fade_in() {
        let mut rig = Rig::new();
        let (fade_in_done, cb_in) = counter();
        let (fade_out_done, cb_out) = counter();
        rig.fade_in(MS * 260, Some(cb_in));
        rig.run(MS * 50);
        let reached = rig.opacity();

        assert_eq!(rig.fade_out(MS * 260, Some(cb_out)), FadeStart::Started);
        assert_eq!(rig.animator.fading(rig.node), Some(FadeDirection::Out));
        assert_eq!(rig.timers.pending(), 2);
        assert!(rig.opacity() <= reached);

        let mut peak = rig.opacity();
        for _ in 0..20 {
            rig.run(MS * 16);
            assert!(rig.opacity() <= peak, "opacity rose during fade-out");
            peak = rig.opacity();
        }
        assert_eq!(fade_in_done.get(), 0);
        assert_eq!(fade_out_done.get(), 1);
        assert!(!rig.doc.style(rig.node).unwrap().is_shown());
        assert!(rig.timers.is_empty());
    }

    #[test]
    fn deadline_finishes_when_steps_lag() {
        let mut rig = Rig::new();
        rig.animator = Animator::with_frame_interval(MS * 1000);
        rig.fade_in(MS * 100, None);
        assert_eq!(rig.run(MS * 100), vec![FadeDirection::In]);
        assert_eq!(rig.opacity(), 1.0);
        assert!(rig.timers.is_empty());
    }

    #[test]
    fn step_matches_frame_ratio() {
        let animator = Animator::with_frame_interval(MS * 10);
        assert!((animator.step_for(MS * 100) - 0.1).abs() < 1e-6);
        assert_eq!(animator.step_for(Duration::ZERO), 1.0);
    }

    #[test]
    fn cancel_drops_callback() {
        let mut rig = Rig::new();
        let (hits, cb) = counter();
        rig.fade_out(MS * 100, Some(cb));
        assert!(rig.animator.cancel(&mut rig.timers, rig.node));
        assert!(!rig.animator.cancel(&mut rig.timers, rig.node));
        rig.run(MS * 200);
        assert_eq!(hits.get(), 0);
        assert!(rig.timers.is_empty());
    }
}
