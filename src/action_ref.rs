//! ActionRef
//!
//! The capability handed to the code that starts an action. It can resolve
//! the action and watch for termination, but cannot terminate it or attach
//! continuations. An empty ref stands for "no action exists" and turns
//! every operation into a no-op.

use crate::action::ActionPtr;
use crate::rect::{Rect, ResolveArg};
use crate::timers::TimersPtr;
use std::any::Any;
use tracing::warn;

#[derive(Clone, Debug, Default)]
pub struct ActionRef {
    ptr: Option<ActionPtr>,
}

impl ActionRef {
    pub fn new(ptr: &ActionPtr) -> Self {
        Self {
            ptr: Some(ptr.clone()),
        }
    }

    /// A ref with no action behind it.
    pub fn empty() -> Self {
        Self { ptr: None }
    }

    /// True if there is no action associated with this ref.
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// The underlying action, for code that needs the full handle.
    pub fn action(&self) -> Option<&ActionPtr> {
        self.ptr.as_ref()
    }

    pub fn resolve(&self) {
        self.resolve_with(ResolveArg::default());
    }

    pub fn resolve_with_int(&self, argument: i32) {
        self.resolve_with(ResolveArg::Integer(argument));
    }

    pub fn resolve_with_rect(&self, argument: Rect) {
        self.resolve_with(ResolveArg::Rect(argument));
    }

    pub fn resolve_with(&self, argument: ResolveArg) {
        match &self.ptr {
            Some(action) => action.resolve_with(argument),
            None => warn!(%argument, "resolve on empty action ref"),
        }
    }

    /// Attach a termination observer to the action.
    pub fn add_terminate_callback<F>(&self, func: F)
    where
        F: FnOnce(&TimersPtr) + 'static,
    {
        match &self.ptr {
            Some(action) => action.add_terminate_callback(func),
            None => warn!("terminate callback on empty action ref"),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.ptr.as_ref().is_some_and(|a| a.is_pending())
    }

    pub fn is_terminated(&self) -> bool {
        self.ptr.as_ref().is_some_and(|a| a.is_terminated())
    }

    pub fn is_resolved(&self) -> bool {
        self.ptr.as_ref().is_some_and(|a| a.is_resolved())
    }

    /// The timer loop, for producers that need to wait.
    pub fn timers(&self) -> Option<&TimersPtr> {
        self.ptr.as_ref().map(|a| a.timers())
    }

    pub fn set_user_data<T: Any>(&self, data: T) {
        if let Some(action) = &self.ptr {
            action.set_user_data(data);
        }
    }

    pub fn user_data<T: Any + Clone>(&self) -> Option<T> {
        self.ptr.as_ref().and_then(|a| a.user_data())
    }
}

impl From<&ActionPtr> for ActionRef {
    fn from(ptr: &ActionPtr) -> Self {
        Self::new(ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::time_manager::TimeManager;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_empty_ref_is_inert() {
        let empty = ActionRef::empty();
        assert!(empty.is_empty());
        assert!(!empty.is_pending());
        assert!(!empty.is_resolved());
        assert!(!empty.is_terminated());
        assert!(empty.timers().is_none());
        assert!(empty.action().is_none());

        empty.resolve();
        empty.add_terminate_callback(|_| {});
        empty.set_user_data(3_u8);
        assert_eq!(empty.user_data::<u8>(), None);
    }

    #[test]
    fn test_ref_forwards_to_action() {
        let timers: TimersPtr = TimeManager::shared();
        let held: Rc<Cell<Option<ActionRef>>> = Rc::new(Cell::new(None));

        let h = held.clone();
        let action = Action::make(&timers, move |r| h.set(Some(r)));
        let action_ref = held.take().unwrap();

        assert!(!action_ref.is_empty());
        assert!(action_ref.is_pending());
        assert!(action_ref.timers().is_some());

        action_ref.set_user_data(7_i64);
        assert_eq!(action.user_data::<i64>(), Some(7));

        let copy = action_ref.clone();
        copy.resolve_with_int(12);
        assert!(action_ref.is_resolved());
        assert_eq!(action.integer_argument(), 12);
    }

    #[test]
    fn test_ref_observes_termination() {
        let timers: TimersPtr = TimeManager::shared();
        let fired = Rc::new(Cell::new(false));

        let f = fired.clone();
        let action = Action::make(&timers, move |r| {
            r.add_terminate_callback(move |_| f.set(true));
        });

        action.terminate();
        assert!(fired.get());
    }
}
