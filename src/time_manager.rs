//! Time Manager
//!
//! Deterministic implementation of [`Timers`]. Owns the deadline queue for
//! one-shot timeouts plus the set of registered animators, and processes
//! them when the host advances the clock.
//!
//! No internal borrow is held while a callback runs, so callbacks may
//! schedule, clear, and resolve actions freely. Work scheduled while
//! draining runs later in the same update if it is already due, never
//! recursively inside the callback that scheduled it.

use crate::error::TimerError;
use crate::pq::DeadlineQueue;
use crate::timers::{Animator, DurationMs, Runnable, TimeMs, TimeoutId, Timers};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Upper bound on callbacks run by a single `update_time`.
pub const DEFAULT_MAX_CALLBACKS: usize = 200_000;

struct AnimatorEntry {
    start: TimeMs,
    duration: DurationMs,
    /// Taken out while the animator is running.
    func: Option<Animator>,
}

struct TimeManagerInner {
    now: TimeMs,
    next_id: u64,
    timeouts: DeadlineQueue<Runnable>,
    /// Keyed by id, so iteration follows registration order.
    animators: BTreeMap<TimeoutId, AnimatorEntry>,
}

impl TimeManagerInner {
    fn alloc_id(&mut self) -> TimeoutId {
        self.next_id += 1;
        TimeoutId(self.next_id)
    }
}

/// A deterministic, manually advanced timer loop.
pub struct TimeManager {
    inner: RefCell<TimeManagerInner>,
    max_callbacks: usize,
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeManager {
    /// Create a timer loop starting at time 0.
    pub fn new() -> Self {
        Self::with_start_time(0.0)
    }

    /// Create a timer loop starting at `start`.
    pub fn with_start_time(start: TimeMs) -> Self {
        let start = if start.is_finite() { start } else { 0.0 };
        Self {
            inner: RefCell::new(TimeManagerInner {
                now: start,
                next_id: 0,
                timeouts: DeadlineQueue::new(),
                animators: BTreeMap::new(),
            }),
            max_callbacks: DEFAULT_MAX_CALLBACKS,
        }
    }

    /// Override the runaway guard.
    pub fn with_max_callbacks(mut self, limit: usize) -> Self {
        self.max_callbacks = limit.max(1);
        self
    }

    /// Convenience constructor for the common `Rc` handle.
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Drain zero-delay work without moving the clock.
    pub fn run_pending(&self) -> Result<usize, TimerError> {
        let now = self.current_time();
        self.update_time(now)
    }

    /// Number of queued one-shot timeouts.
    pub fn pending_timeouts(&self) -> usize {
        self.inner.borrow().timeouts.len()
    }

    /// Number of registered animators.
    pub fn pending_animators(&self) -> usize {
        self.inner.borrow().animators.len()
    }

    pub fn len(&self) -> usize {
        self.pending_timeouts() + self.pending_animators()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deadline of the earliest queued timeout.
    pub fn next_deadline(&self) -> Option<TimeMs> {
        self.inner.borrow_mut().timeouts.peek_deadline()
    }

    /// Discard every timeout and animator without running them.
    pub fn clear(&self) {
        let (timeouts, animators) = {
            let mut inner = self.inner.borrow_mut();
            let timeouts = inner.timeouts.drain();
            let animators = std::mem::take(&mut inner.animators);
            (timeouts, animators)
        };
        debug!(
            timeouts = timeouts.len(),
            animators = animators.len(),
            "cleared timer loop"
        );
        // Dropped here, outside the borrow: closures may own actions.
        drop(timeouts);
        drop(animators);
    }

    fn runaway(&self, time: TimeMs) -> TimerError {
        debug!(time, limit = self.max_callbacks, "runaway timer loop");
        TimerError::Runaway {
            time,
            limit: self.max_callbacks,
        }
    }

    /// Run every timeout due at or before `target`, in deadline order.
    fn drain_due(&self, target: TimeMs, ran: &mut usize) -> Result<(), TimerError> {
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                match inner.timeouts.peek_deadline() {
                    Some(dl) if dl <= target => {
                        if *ran >= self.max_callbacks {
                            return Err(self.runaway(target));
                        }
                        let popped = inner.timeouts.pop();
                        if let Some((_, dl, _)) = &popped {
                            inner.now = inner.now.max(*dl);
                        }
                        popped
                    }
                    _ => None,
                }
            };

            let Some((id, deadline, callback)) = next else {
                return Ok(());
            };

            *ran += 1;
            trace!(timeout = %id, deadline, "firing timeout");
            callback();
        }
    }

    /// Call each animator once with its elapsed time at the current clock.
    fn run_animators(&self, ran: &mut usize) -> Result<(), TimerError> {
        let ids: Vec<TimeoutId> = self.inner.borrow().animators.keys().copied().collect();

        for id in ids {
            let call = {
                let mut inner = self.inner.borrow_mut();
                let now = inner.now;
                inner.animators.get_mut(&id).and_then(|entry| {
                    let elapsed = (now - entry.start).min(entry.duration);
                    if elapsed <= 0.0 {
                        return None;
                    }
                    let finished = elapsed >= entry.duration;
                    entry.func.take().map(|f| (f, elapsed, finished))
                })
            };

            let Some((mut animator, elapsed, finished)) = call else {
                continue;
            };

            if *ran >= self.max_callbacks {
                let now = self.current_time();
                // Put it back so the loop stays intact.
                if let Some(entry) = self.inner.borrow_mut().animators.get_mut(&id) {
                    entry.func = Some(animator);
                }
                return Err(self.runaway(now));
            }

            *ran += 1;
            trace!(timeout = %id, elapsed, finished, "animator tick");
            animator(elapsed);

            let leftover = {
                let mut inner = self.inner.borrow_mut();
                if finished {
                    inner.animators.remove(&id);
                    Some(animator)
                } else if let Some(entry) = inner.animators.get_mut(&id) {
                    entry.func = Some(animator);
                    None
                } else {
                    // Cleared from inside its own callback.
                    Some(animator)
                }
            };
            drop(leftover);
        }

        Ok(())
    }
}

impl Timers for TimeManager {
    fn set_timeout(&self, delay: DurationMs, callback: Runnable) -> TimeoutId {
        let delay = if delay.is_nan() || delay <= 0.0 { 0.0 } else { delay };
        let mut inner = self.inner.borrow_mut();
        let id = inner.alloc_id();
        let deadline = inner.now + delay;
        inner.timeouts.add(id, deadline, callback);
        trace!(timeout = %id, deadline, "scheduled timeout");
        id
    }

    fn clear_timeout(&self, id: TimeoutId) -> bool {
        let (timeout, animator) = {
            let mut inner = self.inner.borrow_mut();
            let timeout = inner.timeouts.remove(id);
            let animator = if timeout.is_none() {
                inner.animators.remove(&id)
            } else {
                None
            };
            (timeout, animator)
        };
        let removed = timeout.is_some() || animator.is_some();
        if removed {
            debug!(timeout = %id, "cleared timeout");
        }
        drop(timeout);
        drop(animator);
        removed
    }

    fn set_animator(&self, duration: DurationMs, animator: Animator) -> TimeoutId {
        let duration = if duration.is_nan() { 0.0 } else { duration.max(0.0) };
        let mut inner = self.inner.borrow_mut();
        let id = inner.alloc_id();
        let start = inner.now;
        inner.animators.insert(
            id,
            AnimatorEntry {
                start,
                duration,
                func: Some(animator),
            },
        );
        trace!(timeout = %id, start, duration, "registered animator");
        id
    }

    fn current_time(&self) -> TimeMs {
        self.inner.borrow().now
    }

    fn update_time(&self, time: TimeMs) -> Result<usize, TimerError> {
        let now = self.current_time();
        // The clock never runs backwards.
        let target = if time.is_finite() { time.max(now) } else { now };

        let mut ran = 0;
        self.drain_due(target, &mut ran)?;
        self.inner.borrow_mut().now = target;
        self.run_animators(&mut ran)?;
        self.drain_due(target, &mut ran)?;
        Ok(ran)
    }
}
