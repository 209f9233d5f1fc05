//! Combinators
//!
//! Factories that derive one action from child actions or from the timer
//! loop: conjunction (`make_all`), disjunction (`make_any`), delay
//! (`make_delayed`, `make_wait`) and time-stepped animation
//! (`make_animation`). All of them return a plain [`Action`]; the behavior
//! lives entirely in the closures wired up here.
//!
//! Termination cascades downward: terminating a combinator terminates every
//! child that is still pending and releases any timer registration.

use crate::action::{Action, ActionList, ActionPtr, StartFunc};
use crate::action_ref::ActionRef;
use crate::timers::{DurationMs, TimersPtr};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::trace;

impl Action {
    /// Make an action that resolves after every child resolves. An empty list
    /// resolves immediately.
    pub fn make_all(timers: &TimersPtr, actions: &[ActionPtr]) -> ActionPtr {
        let parent = Action::new_pending(timers);
        if actions.is_empty() {
            parent.resolve();
            return parent;
        }

        let remaining = Rc::new(Cell::new(actions.len()));
        for child in actions {
            let parent = parent.clone();
            let remaining = remaining.clone();
            child.then(move |child| {
                if !child.is_resolved() || !parent.is_pending() {
                    return;
                }
                let left = remaining.get().saturating_sub(1);
                remaining.set(left);
                trace!(action = %parent.id(), child = %child.id(), left, "all: child resolved");
                if left == 0 {
                    parent.resolve();
                }
            });
        }

        let children: ActionList = actions.to_vec();
        parent.add_terminate_callback(move |_| {
            for child in &children {
                child.terminate();
            }
        });

        parent
    }

    /// Make an action that resolves as soon as one child resolves, carrying
    /// that child's argument. Every other child is terminated. An empty list
    /// resolves immediately.
    pub fn make_any(timers: &TimersPtr, actions: &[ActionPtr]) -> ActionPtr {
        let parent = Action::new_pending(timers);
        if actions.is_empty() {
            parent.resolve();
            return parent;
        }

        let racers: Rc<RefCell<ActionList>> = Rc::new(RefCell::new(actions.to_vec()));
        for child in actions {
            let parent = parent.clone();
            let racers = racers.clone();
            child.then(move |winner| {
                if !winner.is_resolved() || !parent.is_pending() {
                    return;
                }
                trace!(action = %parent.id(), winner = %winner.id(), "any: first child resolved");
                parent.resolve_with(winner.argument());

                let losers = std::mem::take(&mut *racers.borrow_mut());
                for loser in losers {
                    if !Rc::ptr_eq(&loser, winner) {
                        loser.terminate();
                    }
                }
            });
        }

        parent.add_terminate_callback(move |_| {
            let children = std::mem::take(&mut *racers.borrow_mut());
            for child in children {
                child.terminate();
            }
        });

        parent
    }

    /// Make an action whose start function runs after `delay` ms. With no
    /// positive delay this is exactly [`Action::make`].
    pub fn make_delayed<F>(timers: &TimersPtr, delay: DurationMs, start: F) -> ActionPtr
    where
        F: FnOnce(ActionRef) + 'static,
    {
        if delay.is_nan() || delay <= 0.0 {
            return Action::make(timers, start);
        }
        Self::schedule_start(timers, delay, Some(Box::new(start)))
    }

    /// Make an action that resolves after `delay` ms.
    pub fn make_wait(timers: &TimersPtr, delay: DurationMs) -> ActionPtr {
        if delay.is_nan() || delay <= 0.0 {
            return Action::make_resolved(timers);
        }
        Self::schedule_start(timers, delay, None)
    }

    fn schedule_start(
        timers: &TimersPtr,
        delay: DurationMs,
        start: Option<StartFunc>,
    ) -> ActionPtr {
        let ptr = Action::new_pending(timers);
        let action = ptr.clone();
        let id = timers.set_timeout(
            delay,
            Box::new(move || {
                action.forget_timeout();
                if !action.is_pending() {
                    return;
                }
                match start {
                    Some(start) => start(ActionRef::new(&action)),
                    None => action.resolve(),
                }
            }),
        );
        trace!(action = %ptr.id(), timeout = %id, delay, "delayed start");
        ptr.set_timeout_id(id);
        ptr
    }

    /// Make an action that runs an animation. `animator` is called as time
    /// advances, up to and including when `duration` is reached, and never
    /// for an elapsed time of zero. The action resolves right after the final
    /// call. A zero duration resolves immediately without calling `animator`.
    pub fn make_animation<F>(timers: &TimersPtr, duration: DurationMs, mut animator: F) -> ActionPtr
    where
        F: FnMut(DurationMs) + 'static,
    {
        if duration.is_nan() || duration <= 0.0 {
            return Action::make_resolved(timers);
        }

        let ptr = Action::new_pending(timers);
        let action = ptr.clone();
        let id = timers.set_animator(
            duration,
            Box::new(move |elapsed| {
                if !action.is_pending() {
                    return;
                }
                animator(elapsed);
                if elapsed >= duration {
                    action.resolve();
                }
            }),
        );
        trace!(action = %ptr.id(), timeout = %id, duration, "animation registered");
        ptr.set_timeout_id(id);
        ptr
    }
}
