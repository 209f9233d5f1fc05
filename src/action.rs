//! Action
//!
//! The single-resolution async handle behind every command, scroll,
//! animation and host round-trip. An action starts `Pending` and moves at
//! most once to either `Resolved` or `Terminated`.
//!
//! - Continuations (`then`) always run from the timer loop, never inline.
//! - Termination observers run synchronously, in registration order, and
//!   only if the action is terminated.
//! - While an action waits on the timer loop, the registered callback owns
//!   it, so callers may drop their handle. Everything an action owns is
//!   released when it reaches a terminal state.

use crate::action_ref::ActionRef;
use crate::rect::{Rect, ResolveArg};
use crate::timers::{TimeoutId, TimersPtr};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static ACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_action_id() -> ActionId {
    ActionId(ACTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Shared handle to an action.
pub type ActionPtr = Rc<Action>;

pub type ActionList = Vec<ActionPtr>;

/// Runs when an action starts; receives the producer's capability.
pub type StartFunc = Box<dyn FnOnce(ActionRef)>;

/// Continuation run from the timer loop once the action finishes.
pub type ThenFunc = Box<dyn FnOnce(&ActionPtr)>;

/// Termination observer.
pub type TerminateFunc = Box<dyn FnOnce(&TimersPtr)>;

/// Process-unique action identifier, used in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Resolved,
    Terminated,
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionState::Pending => "pending",
            ActionState::Resolved => "resolved",
            ActionState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

pub struct Action {
    id: ActionId,
    this: Weak<Action>,
    state: Cell<ActionState>,
    then: RefCell<Option<ThenFunc>>,
    terminate: RefCell<Vec<TerminateFunc>>,
    /// The one timer registration this action owns, if any.
    timeout: Cell<Option<TimeoutId>>,
    timers: TimersPtr,
    argument: Cell<ResolveArg>,
    user_data: RefCell<Option<Box<dyn Any>>>,
}

impl Action {
    /// A pending action with nothing attached.
    pub(crate) fn new_pending(timers: &TimersPtr) -> ActionPtr {
        let timers = timers.clone();
        Rc::new_cyclic(|this| Action {
            id: next_action_id(),
            this: this.clone(),
            state: Cell::new(ActionState::Pending),
            then: RefCell::new(None),
            terminate: RefCell::new(Vec::new()),
            timeout: Cell::new(None),
            timers,
            argument: Cell::new(ResolveArg::default()),
            user_data: RefCell::new(None),
        })
    }

    /// Make a generic action. `start` runs immediately, before this returns,
    /// and is expected to resolve the ref eventually.
    pub fn make<F>(timers: &TimersPtr, start: F) -> ActionPtr
    where
        F: FnOnce(ActionRef),
    {
        let ptr = Self::new_pending(timers);
        trace!(action = %ptr.id, "starting action");
        start(ActionRef::new(&ptr));
        ptr
    }

    /// Make an action with no work to do. It is resolved on return.
    pub fn make_resolved(timers: &TimersPtr) -> ActionPtr {
        let ptr = Self::new_pending(timers);
        ptr.resolve();
        ptr
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn state(&self) -> ActionState {
        self.state.get()
    }

    /// True if this action has neither resolved nor terminated.
    pub fn is_pending(&self) -> bool {
        self.state.get() == ActionState::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.state.get() == ActionState::Resolved
    }

    pub fn is_terminated(&self) -> bool {
        self.state.get() == ActionState::Terminated
    }

    /// The timer loop this action schedules against.
    pub fn timers(&self) -> &TimersPtr {
        &self.timers
    }

    /// The resolve argument. Integer 0 unless resolved with something else.
    pub fn argument(&self) -> ResolveArg {
        self.argument.get()
    }

    pub fn integer_argument(&self) -> i32 {
        self.argument.get().integer()
    }

    pub fn rect_argument(&self) -> Rect {
        self.argument.get().rect()
    }

    /// Set a continuation to run when this action finishes. Replaces any
    /// earlier continuation. If the action is already finished the
    /// continuation is still run, on the timer loop with zero delay.
    pub fn then<F>(&self, func: F)
    where
        F: FnOnce(&ActionPtr) + 'static,
    {
        let func: ThenFunc = Box::new(func);
        if self.is_pending() {
            let previous = self.then.borrow_mut().replace(func);
            drop(previous);
        } else {
            self.schedule_then(func);
        }
    }

    /// Resolve with the default argument.
    pub fn resolve(&self) {
        self.resolve_with(ResolveArg::default());
    }

    pub fn resolve_with_int(&self, argument: i32) {
        self.resolve_with(ResolveArg::Integer(argument));
    }

    /// Resolve with a rect, e.g. the bounds of the first line during line
    /// karaoke.
    pub fn resolve_with_rect(&self, argument: Rect) {
        self.resolve_with(ResolveArg::Rect(argument));
    }

    /// Resolve the action. No-op unless pending.
    pub fn resolve_with(&self, argument: ResolveArg) {
        if !self.is_pending() {
            return;
        }
        self.state.set(ActionState::Resolved);
        self.argument.set(argument);
        trace!(action = %self.id, %argument, "resolved");

        self.release_timeout();
        let observers = std::mem::take(&mut *self.terminate.borrow_mut());
        drop(observers);

        let then = self.then.borrow_mut().take();
        if let Some(func) = then {
            self.schedule_then(func);
        }
    }

    /// Terminate the action prematurely, calling every termination observer
    /// in registration order. No-op unless pending.
    pub fn terminate(&self) {
        if !self.is_pending() {
            return;
        }
        self.state.set(ActionState::Terminated);
        trace!(action = %self.id, "terminated");

        self.release_timeout();
        let then = self.then.borrow_mut().take();
        drop(then);

        let observers = std::mem::take(&mut *self.terminate.borrow_mut());
        for observer in observers {
            observer(&self.timers);
        }
    }

    /// Add a termination observer. If the action has already finished the
    /// observer is dropped without being called.
    pub fn add_terminate_callback<F>(&self, func: F)
    where
        F: FnOnce(&TimersPtr) + 'static,
    {
        if self.is_pending() {
            self.terminate.borrow_mut().push(Box::new(func));
        } else {
            trace!(action = %self.id, state = %self.state.get(), "ignoring late terminate callback");
        }
    }

    /// Attach arbitrary data, replacing anything attached before.
    pub fn set_user_data<T: Any>(&self, data: T) {
        *self.user_data.borrow_mut() = Some(Box::new(data));
    }

    /// A copy of the attached data, if it has type `T`.
    pub fn user_data<T: Any + Clone>(&self) -> Option<T> {
        self.user_data
            .borrow()
            .as_ref()
            .and_then(|data| data.downcast_ref::<T>())
            .cloned()
    }

    /// Remove and return the attached data if it has type `T`.
    pub fn take_user_data<T: Any>(&self) -> Option<T> {
        let data = self.user_data.borrow_mut().take()?;
        match data.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                *self.user_data.borrow_mut() = Some(other);
                None
            }
        }
    }

    pub fn has_user_data(&self) -> bool {
        self.user_data.borrow().is_some()
    }

    /// Record the timer registration this action owns.
    pub(crate) fn set_timeout_id(&self, id: TimeoutId) {
        if let Some(previous) = self.timeout.replace(Some(id)) {
            self.timers.clear_timeout(previous);
        }
    }

    /// Forget the owned registration without clearing it (it already fired).
    pub(crate) fn forget_timeout(&self) {
        self.timeout.set(None);
    }

    fn release_timeout(&self) {
        if let Some(id) = self.timeout.take() {
            self.timers.clear_timeout(id);
        }
    }

    fn schedule_then(&self, func: ThenFunc) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        trace!(action = %self.id, "scheduling continuation");
        self.timers.set_timeout(0.0, Box::new(move || func(&this)));
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action<{} {}", self.id, self.state.get())?;
        if self.is_resolved() {
            write!(f, " arg={}", self.argument.get())?;
        }
        f.write_str(">")
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .field("argument", &self.argument.get())
            .field("timeout", &self.timeout.get())
            .finish()
    }
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

    #[test]
    fn test_make_without_work_is_resolved() {
        let (_, timers) = setup();
        let action = Action::make_resolved(&timers);

        assert!(action.is_resolved());
        assert_eq!(action.integer_argument(), 0);
        assert_eq!(action.rect_argument(), Rect::default());
    }

    #[test]
    fn test_start_runs_during_construction() {
        let (_, timers) = setup();
        let ran = Rc::new(Cell::new(false));

        let r = ran.clone();
        let action = Action::make(&timers, move |action_ref| {
            r.set(true);
            assert!(action_ref.is_pending());
        });

        assert!(ran.get());
        assert!(action.is_pending());
    }

    #[test]
    fn test_resolve_stores_argument() {
        let (_, timers) = setup();
        let action = Action::make(&timers, |r| r.resolve_with_int(42));
        assert!(action.is_resolved());
        assert_eq!(action.integer_argument(), 42);

        let bounds = Rect::new(0.0, 10.0, 200.0, 24.0);
        let action = Action::make(&timers, move |r| r.resolve_with_rect(bounds));
        assert_eq!(action.rect_argument(), bounds);
        assert_eq!(action.integer_argument(), 0);
    }

    #[test]
    fn test_then_never_runs_inline() {
        let (tm, timers) = setup();
        let fired = Rc::new(Cell::new(0));

        let action = Action::make(&timers, |_| {});
        let f = fired.clone();
        action.then(move |a| {
            assert!(a.is_resolved());
            f.set(f.get() + 1);
        });

        action.resolve();
        assert_eq!(fired.get(), 0);

        tm.run_pending().unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_then_replaces_previous_continuation() {
        let (tm, timers) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        let action = Action::make(&timers, |_| {});
        let l = log.clone();
        action.then(move |_| l.borrow_mut().push("first"));
        let l = log.clone();
        action.then(move |_| l.borrow_mut().push("second"));

        action.resolve();
        action.resolve();
        tm.run_pending().unwrap();

        assert_eq!(*log.borrow(), vec!["second"]);
    }

    #[test]
    fn test_terminate_calls_observers_in_order() {
        let (tm, timers) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let then_fired = Rc::new(Cell::new(false));

        let action = Action::make(&timers, |_| {});
        for i in 0..3 {
            let l = log.clone();
            action.add_terminate_callback(move |_| l.borrow_mut().push(i));
        }
        let t = then_fired.clone();
        action.then(move |_| t.set(true));

        action.terminate();
        action.terminate();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);

        tm.run_pending().unwrap();
        assert!(!then_fired.get());
    }

    #[test]
    fn test_first_terminal_transition_wins() {
        let (_, timers) = setup();
        let terminated = Rc::new(Cell::new(false));

        let action = Action::make(&timers, |_| {});
        let t = terminated.clone();
        action.add_terminate_callback(move |_| t.set(true));

        action.resolve_with_int(3);
        action.terminate();
        assert!(action.is_resolved());
        assert!(!terminated.get());

        let action = Action::make(&timers, |_| {});
        action.terminate();
        action.resolve_with_int(9);
        assert!(action.is_terminated());
        assert_eq!(action.integer_argument(), 0);
    }

    #[test]
    fn test_observer_receives_timers() {
        let (tm, timers) = setup();
        let action = Action::make(&timers, |_| {});

        let seen = Rc::new(Cell::new(-1.0));
        let s = seen.clone();
        action.add_terminate_callback(move |timers| s.set(timers.current_time()));

        tm.update_time(75.0).unwrap();
        action.terminate();
        assert_eq!(seen.get(), 75.0);
    }

    #[test]
    fn test_user_data() {
        let (_, timers) = setup();
        let action = Action::make(&timers, |_| {});
        assert!(!action.has_user_data());

        action.set_user_data(String::from("speak:intro"));
        assert_eq!(action.user_data::<String>().as_deref(), Some("speak:intro"));
        assert_eq!(action.user_data::<u32>(), None);
        assert_eq!(action.take_user_data::<u32>(), None);
        assert!(action.has_user_data());
        assert_eq!(action.take_user_data::<String>().as_deref(), Some("speak:intro"));
        assert!(!action.has_user_data());
    }

    #[test]
    fn test_display() {
        let (_, timers) = setup();
        let action = Action::make(&timers, |r| r.resolve_with_int(5));
        let text = action.to_string();
        assert!(text.starts_with("Action<action#"));
        assert!(text.ends_with("resolved arg=5>"));
    }
}
