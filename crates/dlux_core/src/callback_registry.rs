//! Callback registry for service notifications.
//!
//! This module provides a thread-safe registry for managing event callbacks.
//! Every service in this crate fans its notifications out through one of
//! these: the shared [`EventBus`](crate::events::EventBus) carries
//! [`AppEvent`](crate::events::AppEvent)s, the metadata service carries
//! [`MetadataChange`](crate::metadata::MetadataChange)s and the error handler
//! carries [`ErrorRecord`](crate::error_handler::ErrorRecord)s.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use indexmap::IndexMap;

/// A unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback function type.
///
/// Callbacks receive a reference to the event and should not block for extended periods.
pub type EventCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Thread-safe registry for managing event subscriptions.
///
/// The registry supports:
/// - Subscribing to events with unique IDs
/// - Unsubscribing by ID
/// - Emitting events to all active subscribers, in subscription order
///
/// # Example
///
/// ```ignore
/// use dlux_core::callback_registry::CallbackRegistry;
/// use std::sync::Arc;
///
/// let registry: CallbackRegistry<String> = CallbackRegistry::new("example");
///
/// let id = registry.subscribe(Arc::new(|event| {
///     println!("Event: {}", event);
/// }));
///
/// registry.emit(&"saved".to_string());
///
/// registry.unsubscribe(id);
/// ```
pub struct CallbackRegistry<E> {
    /// Label used in log lines.
    name: &'static str,
    /// Map of subscription IDs to callbacks.
    callbacks: RwLock<IndexMap<SubscriptionId, EventCallback<E>>>,
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
}

impl<E> CallbackRegistry<E> {
    /// Create a new empty callback registry.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            callbacks: RwLock::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to events.
    ///
    /// Returns a subscription ID that can be used to unsubscribe later.
    pub fn subscribe(&self, callback: EventCallback<E>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.insert(id, callback);
        id
    }

    /// Unsubscribe from events.
    ///
    /// Returns `true` if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.shift_remove(&id).is_some()
    }

    /// Emit an event to all registered callbacks.
    ///
    /// The subscriber list is snapshotted first, so callbacks may subscribe or
    /// unsubscribe while being notified. A panicking callback is logged and
    /// does not affect the others. Returns the number of callbacks that panicked.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<(SubscriptionId, EventCallback<E>)> = {
            let callbacks = self.callbacks.read().unwrap();
            callbacks
                .iter()
                .map(|(id, cb)| (*id, Arc::clone(cb)))
                .collect()
        };

        let mut failures = 0;
        for (id, callback) in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(event);
            }));
            if let Err(payload) = result {
                failures += 1;
                log::error!(
                    "[{}] listener {} panicked: {}",
                    self.name,
                    id,
                    panic_message(payload.as_ref())
                );
            }
        }
        failures
    }

    /// Get the number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let callbacks = self.callbacks.read().unwrap();
        callbacks.len()
    }

    /// Check if there are any active subscriptions.
    pub fn has_subscribers(&self) -> bool {
        let callbacks = self.callbacks.read().unwrap();
        !callbacks.is_empty()
    }

    /// Clear all subscriptions.
    pub fn clear(&self) {
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.clear();
    }
}

/// Handle returned by services that hand out listener registrations.
///
/// Calling [`Subscription::unsubscribe`] removes the callback. Dropping the
/// handle without calling it leaves the callback registered.
pub struct Subscription<E> {
    registry: Weak<CallbackRegistry<E>>,
    id: SubscriptionId,
}

impl<E> Subscription<E> {
    /// Register `callback` on `registry` and return a handle for it.
    pub fn register(registry: &Arc<CallbackRegistry<E>>, callback: EventCallback<E>) -> Self {
        let id = registry.subscribe(callback);
        Self {
            registry: Arc::downgrade(registry),
            id,
        }
    }

    /// The underlying subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the callback. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.unsubscribe(self.id),
            None => false,
        }
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<E> std::fmt::Debug for CallbackRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let callbacks = self.callbacks.read().unwrap();
        f.debug_struct("CallbackRegistry")
            .field("name", &self.name)
            .field("subscriber_count", &callbacks.len())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish()
    }
}
