//! Test utilities for dlux_core
//!
//! Mock listener targets, emitters and hosts shared across test modules.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::event_manager::{
    CustomEmitter, EventTarget, Handler, ListenerEvent, ListenerOptions, OnOffEmitter,
    TeardownHost,
};

type Listeners = Mutex<HashMap<String, Vec<Handler>>>;

fn add(listeners: &Listeners, event: &str, handler: Handler) {
    listeners
        .lock()
        .unwrap()
        .entry(event.to_string())
        .or_default()
        .push(handler);
}

fn remove(listeners: &Listeners, event: &str, handler: &Handler) {
    if let Some(list) = listeners.lock().unwrap().get_mut(event) {
        list.retain(|h| !Arc::ptr_eq(h, handler));
    }
}

fn count(listeners: &Listeners, event: &str) -> usize {
    listeners
        .lock()
        .unwrap()
        .get(event)
        .map(|l| l.len())
        .unwrap_or(0)
}

/// A DOM-like target that records attached handlers. Handlers added with
/// `once` are dropped after their first dispatch.
pub struct MockTarget {
    key: String,
    listeners: Listeners,
    once: Mutex<Vec<Handler>>,
    panic_on_add: bool,
    panic_on_remove: bool,
}

impl MockTarget {
    /// Create a target identified by `key`.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            listeners: Mutex::new(HashMap::new()),
            once: Mutex::new(Vec::new()),
            panic_on_add: false,
            panic_on_remove: false,
        }
    }

    /// Make `add_event_listener` panic.
    pub fn panicking_on_add(mut self) -> Self {
        self.panic_on_add = true;
        self
    }

    /// Make `remove_event_listener` panic.
    pub fn panicking_on_remove(mut self) -> Self {
        self.panic_on_remove = true;
        self
    }

    /// Handlers attached for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        count(&self.listeners, event)
    }

    /// Handlers attached across all events.
    pub fn total_listeners(&self) -> usize {
        self.listeners.lock().unwrap().values().map(|l| l.len()).sum()
    }

    /// Invoke every handler attached for `event.name`.
    pub fn dispatch(&self, event: &ListenerEvent) {
        let handlers: Vec<Handler> = self
            .listeners
            .lock()
            .unwrap()
            .get(&event.name)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(event);
            let mut once = self.once.lock().unwrap();
            if let Some(pos) = once.iter().position(|h| Arc::ptr_eq(h, &handler)) {
                once.remove(pos);
                remove(&self.listeners, &event.name, &handler);
            }
        }
    }
}

impl EventTarget for MockTarget {
    fn target_key(&self) -> String {
        self.key.clone()
    }

    fn add_event_listener(&self, event: &str, handler: Handler, options: ListenerOptions) {
        if self.panic_on_add {
            panic!("add_event_listener failed for {}", self.key);
        }
        if options.once {
            self.once.lock().unwrap().push(Arc::clone(&handler));
        }
        add(&self.listeners, event, handler);
    }

    fn remove_event_listener(&self, event: &str, handler: &Handler, _options: ListenerOptions) {
        if self.panic_on_remove {
            panic!("remove_event_listener failed for {}", self.key);
        }
        remove(&self.listeners, event, handler);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    OnOff,
    EventTarget,
    Neither,
}

/// A custom emitter exposing one of the two listener APIs, or neither.
pub struct MockEmitter {
    shape: Shape,
    listeners: Listeners,
}

impl MockEmitter {
    fn with_shape(shape: Shape) -> Self {
        Self {
            shape,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Emitter with `on/off`.
    pub fn on_off() -> Self {
        Self::with_shape(Shape::OnOff)
    }

    /// Emitter with `addEventListener`.
    pub fn event_target() -> Self {
        Self::with_shape(Shape::EventTarget)
    }

    /// Emitter with no listener API.
    pub fn unsupported() -> Self {
        Self::with_shape(Shape::Neither)
    }

    /// Handlers attached for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        count(&self.listeners, event)
    }
}

impl OnOffEmitter for MockEmitter {
    fn on(&self, event: &str, handler: Handler) {
        add(&self.listeners, event, handler);
    }

    fn off(&self, event: &str, handler: &Handler) {
        remove(&self.listeners, event, handler);
    }
}

impl EventTarget for MockEmitter {
    fn target_key(&self) -> String {
        "mock-emitter".to_string()
    }

    fn add_event_listener(&self, event: &str, handler: Handler, _options: ListenerOptions) {
        add(&self.listeners, event, handler);
    }

    fn remove_event_listener(&self, event: &str, handler: &Handler, _options: ListenerOptions) {
        remove(&self.listeners, event, handler);
    }
}

impl CustomEmitter for MockEmitter {
    fn as_on_off(self: Arc<Self>) -> Option<Arc<dyn OnOffEmitter>> {
        (self.shape == Shape::OnOff).then(|| self as Arc<dyn OnOffEmitter>)
    }

    fn as_event_target(self: Arc<Self>) -> Option<Arc<dyn EventTarget>> {
        (self.shape == Shape::EventTarget).then(|| self as Arc<dyn EventTarget>)
    }
}

/// A host component with a teardown hook list.
#[derive(Default)]
pub struct MockHost {
    hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl MockHost {
    /// Run every registered teardown hook.
    pub fn teardown(&self) {
        let hooks: Vec<_> = self.hooks.lock().unwrap().drain(..).collect();
        for hook in hooks {
            hook();
        }
    }
}

impl TeardownHost for MockHost {
    fn on_teardown(&self, hook: Box<dyn FnOnce() + Send>) {
        self.hooks.lock().unwrap().push(hook);
    }
}
