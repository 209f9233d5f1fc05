//! APL Actions
//!
//! A cooperative, single-threaded action/continuation engine:
//! - Single-resolution actions (pending, then resolved or terminated)
//! - Producer capabilities (`ActionRef`) for host round-trips
//! - Combinators: all / any / delayed / animation, with termination cascades
//! - A deterministic timer loop, driven offline or in realtime (spin_sleep)

pub mod rect;
pub mod timers;
pub mod error;
pub mod pq;
pub mod time_manager;
pub mod action;
pub mod action_ref;
pub mod combinators;
pub mod easing;
pub mod animate;
pub mod event;
pub mod engine;


pub use action::{Action, ActionId, ActionList, ActionPtr, ActionState};
pub use action_ref::ActionRef;
pub use animate::{make_animate, AnimateSpec, RepeatMode};
pub use easing::{Easing, StepPosition};
pub use engine::{Engine, EngineConfig, EngineMode};
pub use error::{EasingError, EngineError, TimerError};
pub use event::{Event, EventProperty, EventQueue, EventType};
pub use rect::{Rect, ResolveArg};
pub use time_manager::TimeManager;
pub use timers::{DurationMs, TimeMs, TimeoutId, Timers, TimersPtr};
