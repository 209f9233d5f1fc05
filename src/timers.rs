//! Timers
//!
//! The delay queue every action schedules against. Actions only ever see the
//! `Timers` trait; the host decides how logical time advances (see
//! `TimeManager` for the deterministic implementation and `Engine` for the
//! driver loops).

use crate::error::TimerError;
use std::fmt;
use std::rc::Rc;

/// Absolute logical time in milliseconds.
pub type TimeMs = f64;

/// A span of logical time in milliseconds.
pub type DurationMs = f64;

/// A one-shot callback placed on the timer loop.
pub type Runnable = Box<dyn FnOnce()>;

/// A per-frame callback receiving the elapsed time since registration.
pub type Animator = Box<dyn FnMut(DurationMs)>;

/// Shared handle to the timer loop.
pub type TimersPtr = Rc<dyn Timers>;

/// Opaque handle for a scheduled timeout or animator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeoutId(pub(crate) u64);

impl fmt::Display for TimeoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timeout#{}", self.0)
    }
}

/// The timer loop consumed by actions.
///
/// Every method takes `&self`: callbacks run from inside `update_time` are
/// free to schedule and clear other timeouts.
pub trait Timers {
    /// Run `callback` once, `delay` ms from now. Negative delays count as zero.
    fn set_timeout(&self, delay: DurationMs, callback: Runnable) -> TimeoutId;

    /// Remove a pending timeout or animator. Returns true if one was removed.
    fn clear_timeout(&self, id: TimeoutId) -> bool;

    /// Call `animator` every time the clock advances, with the elapsed time
    /// capped at `duration`. The animator is removed after its call with
    /// `elapsed == duration`. It is never called with an elapsed time of zero.
    fn set_animator(&self, duration: DurationMs, animator: Animator) -> TimeoutId;

    /// The current logical time.
    fn current_time(&self) -> TimeMs;

    /// Advance the clock to `time`, running every callback that falls due.
    /// Returns the number of callbacks invoked.
    fn update_time(&self, time: TimeMs) -> Result<usize, TimerError>;
}
