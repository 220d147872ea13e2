//! Listener targets the [`EventManager`](super::EventManager) can attach to.
//!
//! DOM-style targets implement [`EventTarget`]. Custom emitters come in two
//! shapes, `on/off` ([`OnOffEmitter`]) and
//! `addEventListener/removeEventListener` ([`EventTarget`]); a
//! [`CustomEmitter`] advertises which ones it supports and
//! [`EventEmitterAdapter::select`] picks one at registration time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Payload delivered to listener handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerEvent {
    /// Event name, e.g. "resize".
    pub name: String,
    /// Event-specific data.
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ListenerEvent {
    /// Create an event without detail.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: serde_json::Value::Null,
        }
    }

    /// Create an event with detail.
    pub fn with_detail(name: impl Into<String>, detail: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            detail,
        }
    }
}

/// Listener callback. Targets identify handlers by pointer for removal.
pub type Handler = Arc<dyn Fn(&ListenerEvent) + Send + Sync>;

/// Options forwarded to `add_event_listener`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Capture phase.
    pub capture: bool,
    /// Listener will not cancel the default action.
    pub passive: bool,
    /// Remove after the first call.
    pub once: bool,
}

/// An `addEventListener/removeEventListener` style target.
pub trait EventTarget: Send + Sync {
    /// Stable identity of the target, e.g. "window" or an element id.
    fn target_key(&self) -> String;

    /// Attach `handler` for `event`.
    fn add_event_listener(&self, event: &str, handler: Handler, options: ListenerOptions);

    /// Detach the handler previously attached for `event`.
    fn remove_event_listener(&self, event: &str, handler: &Handler, options: ListenerOptions);
}

/// An `on/off` style emitter.
pub trait OnOffEmitter: Send + Sync {
    /// Attach `handler` for `event`.
    fn on(&self, event: &str, handler: Handler);

    /// Detach the handler previously attached for `event`.
    fn off(&self, event: &str, handler: &Handler);
}

/// An emitter of unknown shape. Implementors override the accessor for each
/// listener API they support.
pub trait CustomEmitter: Send + Sync {
    /// This emitter as an `on/off` emitter.
    fn as_on_off(self: Arc<Self>) -> Option<Arc<dyn OnOffEmitter>> {
        None
    }

    /// This emitter as an `addEventListener` target.
    fn as_event_target(self: Arc<Self>) -> Option<Arc<dyn EventTarget>> {
        None
    }
}

/// A custom emitter bound to one listener API.
#[derive(Clone)]
pub enum EventEmitterAdapter {
    /// Uses `on/off`.
    OnOff(Arc<dyn OnOffEmitter>),
    /// Uses `addEventListener/removeEventListener`.
    EventTarget(Arc<dyn EventTarget>),
}

impl EventEmitterAdapter {
    /// Adapter over an `on/off` emitter.
    pub fn on_off(emitter: Arc<dyn OnOffEmitter>) -> Self {
        Self::OnOff(emitter)
    }

    /// Adapter over an `addEventListener` target.
    pub fn event_target(target: Arc<dyn EventTarget>) -> Self {
        Self::EventTarget(target)
    }

    /// Pick the API to use, preferring `on/off`. `None` when the emitter
    /// supports neither.
    pub fn select(emitter: Arc<dyn CustomEmitter>) -> Option<Self> {
        if let Some(on_off) = Arc::clone(&emitter).as_on_off() {
            return Some(Self::OnOff(on_off));
        }
        emitter.as_event_target().map(Self::EventTarget)
    }

    /// Short name of the API in use.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OnOff(_) => "on/off",
            Self::EventTarget(_) => "addEventListener",
        }
    }

    pub(crate) fn attach(&self, event: &str, handler: Handler) {
        match self {
            Self::OnOff(emitter) => emitter.on(event, handler),
            Self::EventTarget(target) => {
                target.add_event_listener(event, handler, ListenerOptions::default())
            }
        }
    }

    pub(crate) fn detach(&self, event: &str, handler: &Handler) {
        match self {
            Self::OnOff(emitter) => emitter.off(event, handler),
            Self::EventTarget(target) => {
                target.remove_event_listener(event, handler, ListenerOptions::default())
            }
        }
    }
}

impl std::fmt::Debug for EventEmitterAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EventEmitterAdapter").field(&self.kind()).finish()
    }
}

/// Host component whose teardown should destroy an
/// [`EventManager`](super::EventManager).
pub trait TeardownHost {
    /// Run `hook` when the host is torn down.
    fn on_teardown(&self, hook: Box<dyn FnOnce() + Send>);
}
