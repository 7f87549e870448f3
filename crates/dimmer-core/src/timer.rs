#![forbid(unsafe_code)]

//! Deterministic, host-driven timers.
//!
//! A [`Scheduler`] is a cooperative timer queue with no thread and no clock
//! of its own. The host advances it, usually once per animation frame, and
//! pulls due tasks one at a time with [`Scheduler::poll`]. Because tasks are
//! popped individually, a task may cancel timers that were due in the same
//! advance and they will not run.
//!
//! # Invariants
//!
//! 1. Tasks fire in deadline order; ties fire in scheduling order.
//! 2. `now()` never decreases.
//! 3. A cancelled handle never fires again, including interval timers.
//! 4. An interval re-arms before its task is returned, so cancelling from
//!    inside the task removes the re-armed entry.
//! 5. Deadlines saturate at [`Duration::MAX`]; an oversized delay means
//!    "never", not an overflow.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use dimmer_core::timer::Scheduler;
//!
//! let mut timers = Scheduler::new();
//! let tick = timers.set_interval(Duration::from_millis(10), "tick");
//! timers.set_timeout(Duration::from_millis(25), "done");
//!
//! let horizon = timers.now() + Duration::from_millis(30);
//! let mut fired = Vec::new();
//! while let Some((handle, task)) = timers.poll(horizon) {
//!     fired.push(task);
//!     if task == "done" {
//!         timers.cancel(tick);
//!     }
//!     assert!(handle == tick || task == "done");
//! }
//! assert_eq!(fired, ["tick", "tick", "done"]);
//! assert!(timers.is_empty());
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use ahash::AHashMap;
use web_time::Instant;

/// Nominal display frame interval (60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Handle returned when a timer is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Get the raw handle value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

type Slot = (Duration, u64);

#[derive(Debug, Clone)]
struct Entry<T> {
    handle: TimerHandle,
    period: Option<Duration>,
    task: T,
}

/// Cooperative timer queue carrying task payloads of type `T`.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<Slot, Entry<T>>,
    slots: AHashMap<TimerHandle, Slot>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 1,
            queue: BTreeMap::new(),
            slots: AHashMap::new(),
        }
    }

    /// Scheduler time, measured from creation.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of armed timers.
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether no timers are armed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether `handle` is still armed.
    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.slots.contains_key(&handle)
    }

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|&(due, _)| due)
    }

    /// Run `task` once, `delay` from now.
    pub fn set_timeout(&mut self, delay: Duration, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_seq);
        self.arm(handle, self.now.saturating_add(delay), None, task);
        handle
    }

    /// Run `task` every `period`, first at `now + period`.
    ///
    /// A zero period is treated as one nanosecond so the queue always makes
    /// progress.
    pub fn set_interval(&mut self, period: Duration, task: T) -> TimerHandle {
        let period = period.max(Duration::from_nanos(1));
        let handle = TimerHandle(self.next_seq);
        self.arm(handle, self.now.saturating_add(period), Some(period), task);
        handle
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.slots.remove(&handle) {
            Some(slot) => {
                self.queue.remove(&slot);
                true
            }
            None => false,
        }
    }

    /// Drop every armed timer.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.slots.clear();
    }

    fn arm(&mut self, handle: TimerHandle, due: Duration, period: Option<Duration>, task: T) {
        let slot = (due, self.next_seq);
        self.next_seq += 1;
        self.queue.insert(
            slot,
            Entry {
                handle,
                period,
                task,
            },
        );
        self.slots.insert(handle, slot);
    }
}

impl<T: Clone> Scheduler<T> {
    /// Pop the next task due at or before `horizon`.
    ///
    /// Moves `now` to the task's deadline. When nothing is due, moves `now`
    /// to `horizon` and returns `None`.
    pub fn poll(&mut self, horizon: Duration) -> Option<(TimerHandle, T)> {
        let due = match self.queue.first_key_value() {
            Some((&(due, _), _)) if due <= horizon => due,
            _ => {
                self.now = self.now.max(horizon);
                return None;
            }
        };
        let (_, entry) = self.queue.pop_first()?;
        self.slots.remove(&entry.handle);
        self.now = self.now.max(due);

        if let Some(period) = entry.period {
            self.arm(entry.handle, due.saturating_add(period), Some(period), entry.task.clone());
        }
        Some((entry.handle, entry.task))
    }

    /// Fire everything due within `dt` from now, in order.
    ///
    /// Use [`Scheduler::poll`] instead when tasks may cancel each other.
    pub fn advance(&mut self, dt: Duration) -> Vec<(TimerHandle, T)> {
        let horizon = self.now.saturating_add(dt);
        let mut fired = Vec::new();
        while let Some(item) = self.poll(horizon) {
            fired.push(item);
        }
        fired
    }
}

/// Converts host timestamps into scheduler deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostClock {
    last: Option<Instant>,
}

impl HostClock {
    /// Create a clock with no reference point yet.
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Time elapsed since the previous call. The first call returns zero.
    pub fn delta(&mut self, now: Instant) -> Duration {
        let dt = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last = Some(now);
        dt
    }

    /// Take `now` as the reference point without reporting elapsed time.
    /// Hosts call this when a paused frame loop resumes.
    pub fn reset(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn timeout_fires_once() {
        let mut timers = Scheduler::new();
        let h = timers.set_timeout(MS * 10, 'a');
        assert!(timers.advance(MS * 9).is_empty());
        assert_eq!(timers.advance(MS), vec![(h, 'a')]);
        assert!(timers.advance(MS * 100).is_empty());
        assert_eq!(timers.now(), MS * 110);
    }

    #[test]
    fn interval_rearms_until_cancelled() {
        let mut timers = Scheduler::new();
        let h = timers.set_interval(MS * 10, ());
        assert_eq!(timers.advance(MS * 35).len(), 3);
        assert!(timers.is_scheduled(h));
        assert_eq!(timers.next_deadline(), Some(MS * 40));
        assert!(timers.cancel(h));
        assert!(!timers.cancel(h));
        assert!(timers.advance(MS * 100).is_empty());
    }

    #[test]
    fn deadline_order_with_ties_in_schedule_order() {
        let mut timers = Scheduler::new();
        timers.set_timeout(MS * 20, "late");
        timers.set_timeout(MS * 10, "first");
        timers.set_timeout(MS * 10, "second");
        let order: Vec<_> = timers
            .advance(MS * 20)
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert_eq!(order, ["first", "second", "late"]);
    }

    #[test]
    fn cancel_inside_poll_loop_suppresses_later_task() {
        let mut timers = Scheduler::new();
        timers.set_timeout(MS * 5, 1);
        let victim = timers.set_timeout(MS * 6, 2);
        let horizon = timers.now() + MS * 10;
        let mut seen = Vec::new();
        while let Some((_, task)) = timers.poll(horizon) {
            seen.push(task);
            if task == 1 {
                timers.cancel(victim);
            }
        }
        assert_eq!(seen, [1]);
        assert_eq!(timers.now(), MS * 10);
    }

    #[test]
    fn poll_tracks_deadline_time() {
        let mut timers = Scheduler::new();
        timers.set_timeout(MS * 4, ());
        let horizon = MS * 10;
        assert!(timers.poll(horizon).is_some());
        assert_eq!(timers.now(), MS * 4);
        assert!(timers.poll(horizon).is_none());
        assert_eq!(timers.now(), horizon);
    }

    #[test]
    fn zero_period_interval_makes_progress() {
        let mut timers = Scheduler::new();
        let h = timers.set_interval(Duration::ZERO, ());
        let fired = timers.advance(Duration::from_nanos(3));
        assert_eq!(fired.len(), 3);
        timers.cancel(h);
    }

    #[test]
    fn host_clock_deltas() {
        let mut clock = HostClock::new();
        let start = Instant::now();
        assert_eq!(clock.delta(start), Duration::ZERO);
        assert_eq!(clock.delta(start + MS * 16), MS * 16);
        assert_eq!(clock.delta(start + MS * 10), Duration::ZERO);
    }

    #[test]
    fn host_clock_reset_skips_idle_time() {
        let mut clock = HostClock::new();
        let start = Instant::now();
        clock.delta(start);
        clock.reset(start + MS * 5000);
        assert_eq!(clock.delta(start + MS * 5016), MS * 16);
    }

    #[test]
    fn oversized_delay_never_fires() {
        let mut timers = Scheduler::new();
        timers.advance(MS * 5);
        let h = timers.set_timeout(Duration::MAX, ());
        assert_eq!(timers.next_deadline(), Some(Duration::MAX));
        assert!(timers.advance(MS * 1000).is_empty());
        assert!(timers.is_scheduled(h));
    }

    #[test]
    fn clear_drops_everything() {
        let mut timers = Scheduler::new();
        let a = timers.set_timeout(MS, ());
        timers.set_interval(MS, ());
        timers.clear();
        assert!(timers.is_empty());
        assert!(!timers.is_scheduled(a));
    }
}
