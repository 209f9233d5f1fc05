//! Host events
//!
//! Requests the runtime makes of the host (open a URL, speak, scroll, ...).
//! Events that need an answer carry the [`ActionRef`] of the action waiting
//! on them; the host pops the event, does the work, and resolves the ref.

use crate::action::{Action, ActionPtr};
use crate::action_ref::ActionRef;
use crate::timers::TimersPtr;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    ControlMedia,
    Focus,
    OpenUrl,
    PlayMedia,
    Preroll,
    RequestFirstLineBounds,
    ScrollTo,
    SendEvent,
    SetPage,
    Speak,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ControlMedia => "ControlMedia",
            EventType::Focus => "Focus",
            EventType::OpenUrl => "OpenURL",
            EventType::PlayMedia => "PlayMedia",
            EventType::Preroll => "Preroll",
            EventType::RequestFirstLineBounds => "RequestFirstLineBounds",
            EventType::ScrollTo => "ScrollTo",
            EventType::SendEvent => "SendEvent",
            EventType::SetPage => "SetPage",
            EventType::Speak => "Speak",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventProperty {
    Align,
    Arguments,
    AudioTrack,
    Command,
    Component,
    Direction,
    HighlightMode,
    Position,
    Source,
    Value,
}

/// A request for the host.
#[derive(Clone, Debug)]
pub struct Event {
    event_type: EventType,
    properties: BTreeMap<EventProperty, String>,
    action_ref: ActionRef,
}

impl Event {
    /// A fire-and-forget event.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            properties: BTreeMap::new(),
            action_ref: ActionRef::empty(),
        }
    }

    pub fn with_property(mut self, key: EventProperty, value: impl Into<String>) -> Self {
        self.properties.insert(key, value.into());
        self
    }

    pub fn with_action_ref(mut self, action_ref: ActionRef) -> Self {
        self.action_ref = action_ref;
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn value(&self, key: EventProperty) -> Option<&str> {
        self.properties.get(&key).map(String::as_str)
    }

    /// The ref to resolve when the host is done. Empty for fire-and-forget
    /// events.
    pub fn action_ref(&self) -> &ActionRef {
        &self.action_ref
    }

    /// Same type and properties, ignoring the action ref.
    pub fn matches(&self, other: &Event) -> bool {
        self.event_type == other.event_type && self.properties == other.properties
    }
}

/// FIFO of events waiting for the host. Clones share the same queue.
#[derive(Clone, Default)]
pub struct EventQueue {
    events: Rc<RefCell<VecDeque<Event>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        debug!(event = %event.event_type, awaited = !event.action_ref.is_empty(), "queued event");
        self.events.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<Event> {
        self.events.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Queue a fire-and-forget event.
    pub fn send(&self, event: Event) {
        self.push(event.with_action_ref(ActionRef::empty()));
    }

    /// Queue an event and return the action that resolves when the host
    /// resolves the event's ref.
    pub fn request(&self, timers: &TimersPtr, event: Event) -> ActionPtr {
        let queue = self.clone();
        Action::make(timers, move |action_ref| {
            queue.push(event.with_action_ref(action_ref));
        })
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Rect;
    use crate::time_manager::TimeManager;
    use std::cell::Cell;

    #[test]
    fn test_open_url_round_trip() {
        let tm = TimeManager::shared();
        let timers: TimersPtr = tm.clone();
        let queue = EventQueue::new();

        let open = Event::new(EventType::OpenUrl).with_property(EventProperty::Source, "https://example.com");
        let action = queue.request(&timers, open);
        let result = Rc::new(Cell::new(None));
        let r = result.clone();
        action.then(move |a| r.set(Some(a.integer_argument())));

        let event = queue.pop().unwrap();
        assert_eq!(event.event_type(), EventType::OpenUrl);
        assert_eq!(event.value(EventProperty::Source), Some("https://example.com"));
        assert!(event.action_ref().is_pending());

        // Host reports failure code 1.
        event.action_ref().resolve_with_int(1);
        tm.run_pending().unwrap();
        assert_eq!(result.get(), Some(1));
    }

    #[test]
    fn test_first_line_bounds_round_trip() {
        let timers: TimersPtr = TimeManager::shared();
        let queue = EventQueue::new();

        let action = queue.request(&timers, Event::new(EventType::RequestFirstLineBounds));
        let bounds = Rect::new(0.0, 0.0, 320.0, 18.0);
        queue.pop().unwrap().action_ref().resolve_with_rect(bounds);

        assert_eq!(action.rect_argument(), bounds);
    }

    #[test]
    fn test_host_sees_abandoned_request() {
        let timers: TimersPtr = TimeManager::shared();
        let queue = EventQueue::new();

        let action = queue.request(&timers, Event::new(EventType::Speak));
        let event = queue.pop().unwrap();
        action.terminate();

        assert!(event.action_ref().is_terminated());
        event.action_ref().resolve();
        assert!(action.is_terminated());
    }

    #[test]
    fn test_send_is_fire_and_forget() {
        let queue = EventQueue::new();
        queue.send(Event::new(EventType::SendEvent).with_property(EventProperty::Arguments, "[1,2]"));

        assert_eq!(queue.len(), 1);
        let event = queue.pop().unwrap();
        assert!(event.action_ref().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_matches_ignores_action_ref() {
        let timers: TimersPtr = TimeManager::shared();
        let a = Event::new(EventType::ScrollTo).with_property(EventProperty::Align, "center");
        let b = a.clone().with_action_ref(ActionRef::new(&Action::make_resolved(&timers)));
        let c = Event::new(EventType::ScrollTo).with_property(EventProperty::Align, "first");

        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert_eq!(EventType::OpenUrl.to_string(), "OpenURL");
    }
}
