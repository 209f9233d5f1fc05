//! Item animation
//!
//! Repeats an eased animation a number of times, optionally alternating
//! direction, on top of [`Action::make_animation`]. Each iteration is its own
//! child action; terminating the returned action terminates the running
//! iteration.

use crate::action::{Action, ActionPtr};
use crate::action_ref::ActionRef;
use crate::easing::Easing;
use crate::timers::{DurationMs, TimersPtr};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::trace;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepeatMode {
    /// Every iteration runs from start to end.
    #[default]
    Restart,
    /// Odd iterations run from end to start.
    Reverse,
}

/// How an item animation runs.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimateSpec {
    pub duration: DurationMs,
    /// Extra iterations after the first.
    pub repeat_count: u32,
    pub repeat_mode: RepeatMode,
    pub easing: Easing,
    /// Jump straight to the final value instead of animating.
    pub fast_mode: bool,
}

impl Default for AnimateSpec {
    fn default() -> Self {
        Self {
            duration: 1000.0,
            repeat_count: 0,
            repeat_mode: RepeatMode::Restart,
            easing: Easing::Linear,
            fast_mode: false,
        }
    }
}

impl AnimateSpec {
    pub fn new(duration: DurationMs) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    fn is_reversed(&self, iteration: u32) -> bool {
        self.repeat_mode == RepeatMode::Reverse && iteration % 2 == 1
    }

    /// Linear progress at the end of the last iteration.
    pub fn final_progress(&self) -> f32 {
        if self.is_reversed(self.repeat_count) {
            0.0
        } else {
            1.0
        }
    }
}

struct AnimateRun<F> {
    timers: TimersPtr,
    spec: AnimateSpec,
    apply: RefCell<F>,
    iteration: Cell<u32>,
    current: RefCell<Option<ActionPtr>>,
    outer: ActionRef,
}

impl<F> AnimateRun<F>
where
    F: FnMut(f32) + 'static,
{
    fn apply(&self, progress: f32) {
        let eased = self.spec.easing.calc(progress);
        let mut apply = self.apply.borrow_mut();
        (*apply)(eased);
    }

    /// Start the next iteration.
    fn advance(self: &Rc<Self>) {
        if !self.outer.is_pending() {
            return;
        }

        let iteration = self.iteration.get();
        let reversed = self.spec.is_reversed(iteration);
        let duration = self.spec.duration;
        trace!(iteration, reversed, "animate: starting iteration");

        let run = Rc::clone(self);
        let step = Action::make_animation(&self.timers, duration, move |elapsed| {
            let t = (elapsed / duration) as f32;
            run.apply(if reversed { 1.0 - t } else { t });
        });

        let run = Rc::clone(self);
        step.then(move |step| {
            if !step.is_resolved() {
                return;
            }
            let iteration = run.iteration.get();
            if iteration < run.spec.repeat_count {
                run.iteration.set(iteration + 1);
                run.advance();
            } else {
                run.current.borrow_mut().take();
                run.outer.resolve();
            }
        });

        *self.current.borrow_mut() = Some(step);
    }
}

/// Make an action that animates through `apply`, which receives eased
/// progress in `[0, 1]` (values outside that range are possible with
/// overshooting bezier curves).
pub fn make_animate<F>(timers: &TimersPtr, spec: AnimateSpec, mut apply: F) -> ActionPtr
where
    F: FnMut(f32) + 'static,
{
    if spec.fast_mode || spec.duration.is_nan() || spec.duration <= 0.0 {
        apply(spec.easing.calc(spec.final_progress()));
        return Action::make_resolved(timers);
    }

    let timers_for_run = timers.clone();
    Action::make(timers, move |outer| {
        let run = Rc::new(AnimateRun {
            timers: timers_for_run,
            spec,
            apply: RefCell::new(apply),
            iteration: Cell::new(0),
            current: RefCell::new(None),
            outer: outer.clone(),
        });

        let on_terminate = Rc::clone(&run);
        outer.add_terminate_callback(move |_| {
            let current = on_terminate.current.borrow_mut().take();
            if let Some(step) = current {
                step.terminate();
            }
        });

        run.advance();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_manager::TimeManager;
    use crate::timers::Timers;

    fn setup() -> (Rc<TimeManager>, TimersPtr) {
        let tm = TimeManager::shared();
        let timers: TimersPtr = tm.clone();
        (tm, timers)
    }

    fn collector() -> (Rc<RefCell<Vec<f32>>>, impl FnMut(f32) + 'static) {
        let values = Rc::new(RefCell::new(Vec::new()));
        let v = values.clone();
        (values, move |p| v.borrow_mut().push(p))
    }

    #[test]
    fn test_single_iteration_linear() {
        let (tm, timers) = setup();
        let (values, apply) = collector();

        let action = make_animate(&timers, AnimateSpec::new(100.0), apply);
        tm.update_time(50.0).unwrap();
        tm.update_time(100.0).unwrap();

        assert!(action.is_resolved());
        assert_eq!(*values.borrow(), vec![0.5, 1.0]);
    }

    #[test]
    fn test_reverse_repeat_runs_backwards() {
        let (tm, timers) = setup();
        let (values, apply) = collector();

        let spec = AnimateSpec {
            duration: 100.0,
            repeat_count: 1,
            repeat_mode: RepeatMode::Reverse,
            ..Default::default()
        };
        let action = make_animate(&timers, spec, apply);

        tm.update_time(100.0).unwrap();
        assert!(action.is_pending());
        tm.update_time(125.0).unwrap();
        tm.update_time(200.0).unwrap();

        assert!(action.is_resolved());
        assert_eq!(*values.borrow(), vec![1.0, 0.75, 0.0]);
    }

    #[test]
    fn test_restart_repeat() {
        let (tm, timers) = setup();
        let (values, apply) = collector();

        let spec = AnimateSpec {
            duration: 100.0,
            repeat_count: 2,
            ..Default::default()
        };
        let action = make_animate(&timers, spec, apply);
        for t in [100.0, 200.0, 300.0] {
            tm.update_time(t).unwrap();
        }

        assert!(action.is_resolved());
        assert_eq!(*values.borrow(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_fast_mode_jumps_to_end() {
        let (tm, timers) = setup();
        let (values, apply) = collector();

        let spec = AnimateSpec {
            duration: 100.0,
            repeat_count: 3,
            repeat_mode: RepeatMode::Reverse,
            fast_mode: true,
            ..Default::default()
        };
        let action = make_animate(&timers, spec, apply);

        assert!(action.is_resolved());
        assert_eq!(*values.borrow(), vec![0.0]);
        assert!(tm.is_empty());
    }

    #[test]
    fn test_terminate_stops_current_iteration() {
        let (tm, timers) = setup();
        let (values, apply) = collector();

        let spec = AnimateSpec {
            duration: 100.0,
            repeat_count: 5,
            easing: Easing::EaseIn,
            ..Default::default()
        };
        let action = make_animate(&timers, spec, apply);
        tm.update_time(40.0).unwrap();
        action.terminate();
        tm.update_time(1000.0).unwrap();

        assert_eq!(values.borrow().len(), 1);
        assert!(values.borrow()[0] < 0.4);
        assert_eq!(tm.pending_animators(), 0);
    }
}
