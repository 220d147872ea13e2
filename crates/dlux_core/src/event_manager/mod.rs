//! Leak-proof registry of listeners, timeouts and intervals.
//!
//! Every registration made through an [`EventManager`] can be removed
//! individually through the returned [`Unsubscribe`], and all of them are
//! removed together by [`EventManager::destroy`]. After `destroy` the manager
//! is inert: further registrations log a warning and return a no-op handle.
//!
//! # Architecture
//!
//! ```text
//! add_dom_listener / add_custom_listener / add_timeout / add_interval
//!                          ↓
//!            registrations: id → (kind, event, Unsubscribe)
//!                          ↓
//!     Unsubscribe::call()  or  destroy() → every Unsubscribe::call()
//! ```
//!
//! Timeouts and intervals run as tokio tasks and are aborted on removal, so
//! they must be registered from inside a tokio runtime.
//!
//! # Example
//!
//! ```ignore
//! let events = EventManager::new("TipTapEditor");
//!
//! let off = events.add_dom_listener(window.clone(), "resize", handler, ListenerOptions::default());
//! events.add_interval(|| check_auto_save(), Duration::from_secs(5));
//!
//! off.call();          // remove one
//! events.destroy();    // remove the rest
//! ```

mod emitter;
mod unsubscribe;

pub use emitter::{
    CustomEmitter, EventEmitterAdapter, EventTarget, Handler, ListenerEvent, ListenerOptions,
    OnOffEmitter, TeardownHost,
};
pub use unsubscribe::Unsubscribe;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::callback_registry::panic_message;

/// What a registration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerKind {
    /// DOM-style target listener.
    Dom,
    /// Custom emitter listener.
    Custom,
    /// One-shot timer.
    Timeout,
    /// Repeating timer.
    Interval,
}

impl ListenerKind {
    fn as_str(&self) -> &'static str {
        match self {
            ListenerKind::Dom => "dom",
            ListenerKind::Custom => "custom",
            ListenerKind::Timeout => "timeout",
            ListenerKind::Interval => "interval",
        }
    }
}

/// Longest timer delay or interval period. Longer requests are clamped so
/// deadlines stay representable.
const MAX_TIMER_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn interval_period(period: Duration) -> Duration {
    period.clamp(Duration::from_millis(1), MAX_TIMER_DELAY)
}

struct Registration {
    kind: ListenerKind,
    event: String,
    unsubscribe: Unsubscribe,
}

/// Counts of live registrations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventManagerStats {
    /// DOM listeners.
    pub dom: usize,
    /// Custom emitter listeners.
    pub custom: usize,
    /// Pending timeouts.
    pub timeouts: usize,
    /// Running intervals.
    pub intervals: usize,
    /// Whether `destroy` has run.
    pub destroyed: bool,
}

struct Inner {
    name: String,
    registrations: Mutex<IndexMap<String, Registration>>,
    destroyed: AtomicBool,
    next_id: AtomicU64,
}

impl Inner {
    /// The registration table. A panic elsewhere must not make teardown
    /// impossible, so a poisoned lock is recovered.
    fn registrations(&self) -> MutexGuard<'_, IndexMap<String, Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: &str) -> Option<Registration> {
        self.registrations().shift_remove(id)
    }

    /// Drop a registration that ended on its own and mark its handle done.
    fn retire(&self, id: &str) {
        if let Some(registration) = self.remove(id) {
            registration.unsubscribe.retire();
        }
    }

    fn next_id(&self, kind: ListenerKind) -> String {
        format!(
            "{}:{}",
            kind.as_str(),
            self.next_id.fetch_add(1, Ordering::SeqCst)
        )
    }

    /// Drain and run every unsubscribe. Returns how many ran.
    fn teardown(&self) -> usize {
        let drained: Vec<(String, Registration)> =
            self.registrations().drain(..).collect();

        let count = drained.len();
        for (id, registration) in drained {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                registration.unsubscribe.call();
            }));
            if let Err(payload) = result {
                log::error!(
                    "[EventManager:{}] failed to remove {} ({}): {}",
                    self.name,
                    id,
                    registration.event,
                    panic_message(payload.as_ref())
                );
            }
        }
        count
    }
}

fn removal(
    inner: Weak<Inner>,
    id: String,
    detach: impl FnOnce() + Send + 'static,
) -> impl FnOnce() + Send + 'static {
    move || {
        detach();
        if let Some(inner) = inner.upgrade() {
            inner.remove(&id);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            self.teardown();
        }
    }
}

/// Owns listener and timer registrations for one consumer.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct EventManager {
    inner: Arc<Inner>,
}

impl EventManager {
    /// Create a manager. `name` appears in log lines.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                registrations: Mutex::new(IndexMap::new()),
                destroyed: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether `destroy` has run.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.inner.registrations().len()
    }

    /// Whether a registration with this id is live.
    pub fn has_registration(&self, id: &str) -> bool {
        self.inner.registrations().contains_key(id)
    }

    /// Live registration counts by kind.
    pub fn stats(&self) -> EventManagerStats {
        let registrations = self.inner.registrations();
        let mut stats = EventManagerStats {
            destroyed: self.is_destroyed(),
            ..EventManagerStats::default()
        };
        for registration in registrations.values() {
            match registration.kind {
                ListenerKind::Dom => stats.dom += 1,
                ListenerKind::Custom => stats.custom += 1,
                ListenerKind::Timeout => stats.timeouts += 1,
                ListenerKind::Interval => stats.intervals += 1,
            }
        }
        stats
    }

    /// Deterministic id of a DOM registration.
    pub fn dom_listener_id(target: &dyn EventTarget, event: &str) -> String {
        format!("{}:{}:{}", ListenerKind::Dom.as_str(), target.target_key(), event)
    }

    fn refuse_if_destroyed(&self, what: &str) -> bool {
        if self.is_destroyed() {
            log::warn!(
                "[EventManager:{}] {} after destroy() ignored",
                self.inner.name,
                what
            );
            return true;
        }
        false
    }

    fn insert(&self, id: String, kind: ListenerKind, event: &str, unsubscribe: Unsubscribe) {
        self.inner.registrations().insert(
            id,
            Registration {
                kind,
                event: event.to_string(),
                unsubscribe,
            },
        );
    }

    /// Build the removal closure shared by every registration kind.
    fn removal(&self, id: &str, detach: impl FnOnce() + Send + 'static) -> Unsubscribe {
        Unsubscribe::new(id, removal(Arc::downgrade(&self.inner), id.to_string(), detach))
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Attach `handler` to `target` for `event`.
    ///
    /// A second registration for the same target and event is refused and
    /// the first registration's handle is returned.
    pub fn add_dom_listener(
        &self,
        target: Arc<dyn EventTarget>,
        event: &str,
        handler: Handler,
        options: ListenerOptions,
    ) -> Unsubscribe {
        if self.refuse_if_destroyed("add_dom_listener") {
            return Unsubscribe::noop();
        }

        let id = Self::dom_listener_id(target.as_ref(), event);
        if let Some(existing) = self.duplicate_of(&id) {
            return existing;
        }

        let handler = if options.once {
            self.once_handler(&id, handler)
        } else {
            handler
        };

        // Host code runs with the table unlocked
        target.add_event_listener(event, Arc::clone(&handler), options);

        let event_name = event.to_string();
        let detach_target = Arc::clone(&target);
        let detach_handler = Arc::clone(&handler);
        let unsubscribe = self.removal(&id, move || {
            detach_target.remove_event_listener(&event_name, &detach_handler, options);
        });

        let mut registrations = self.inner.registrations();
        let winner = if self.is_destroyed() {
            Some(Unsubscribe::noop())
        } else {
            registrations.get(&id).map(|r| r.unsubscribe.clone())
        };
        if let Some(winner) = winner {
            // Destroyed or registered by another caller while attaching
            drop(registrations);
            target.remove_event_listener(event, &handler, options);
            return winner;
        }
        registrations.insert(
            id,
            Registration {
                kind: ListenerKind::Dom,
                event: event.to_string(),
                unsubscribe: unsubscribe.clone(),
            },
        );
        unsubscribe
    }

    fn duplicate_of(&self, id: &str) -> Option<Unsubscribe> {
        let existing = self.inner.registrations().get(id)?.unsubscribe.clone();
        log::warn!(
            "[EventManager:{}] duplicate listener {} ignored",
            self.inner.name,
            id
        );
        Some(existing)
    }

    /// Wrap a `once` handler so the registration ends when it fires. The
    /// target is expected to drop the listener itself.
    fn once_handler(&self, id: &str, handler: Handler) -> Handler {
        let inner = Arc::downgrade(&self.inner);
        let id = id.to_string();
        let fired = AtomicBool::new(false);
        Arc::new(move |event: &ListenerEvent| {
            if fired.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(inner) = inner.upgrade() {
                inner.retire(&id);
            }
            handler(event);
        })
    }

    /// Attach `handler` to an emitter of unknown shape.
    ///
    /// Emitters supporting neither `on/off` nor `addEventListener` are
    /// refused with a warning.
    pub fn add_custom_listener(
        &self,
        emitter: Arc<dyn CustomEmitter>,
        event: &str,
        handler: Handler,
    ) -> Unsubscribe {
        match EventEmitterAdapter::select(emitter) {
            Some(adapter) => self.add_adapted_listener(adapter, event, handler),
            None => {
                log::warn!(
                    "[EventManager:{}] emitter for '{}' supports neither on/off nor addEventListener",
                    self.inner.name,
                    event
                );
                Unsubscribe::noop()
            }
        }
    }

    /// Attach `handler` through an explicit adapter.
    pub fn add_adapted_listener(
        &self,
        adapter: EventEmitterAdapter,
        event: &str,
        handler: Handler,
    ) -> Unsubscribe {
        if self.refuse_if_destroyed("add_custom_listener") {
            return Unsubscribe::noop();
        }

        adapter.attach(event, Arc::clone(&handler));

        let id = self.inner.next_id(ListenerKind::Custom);
        let event_name = event.to_string();
        let unsubscribe = self.removal(&id, move || adapter.detach(&event_name, &handler));
        self.insert(id, ListenerKind::Custom, event, unsubscribe.clone());
        unsubscribe
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Run `callback` once after `delay`.
    ///
    /// The registration is dropped when the timeout fires. Outside a tokio
    /// runtime the call is refused.
    pub fn add_timeout(
        &self,
        callback: impl FnOnce() + Send + 'static,
        delay: Duration,
    ) -> Unsubscribe {
        if self.refuse_if_destroyed("add_timeout") {
            return Unsubscribe::noop();
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!(
                "[EventManager:{}] add_timeout needs a tokio runtime",
                self.inner.name
            );
            return Unsubscribe::noop();
        };

        let id = self.inner.next_id(ListenerKind::Timeout);
        let weak = Arc::downgrade(&self.inner);
        let task_id = id.clone();
        let name = self.inner.name.clone();

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay.min(MAX_TIMER_DELAY)).await;
            match weak.upgrade() {
                Some(inner) => inner.retire(&task_id),
                // Manager already gone
                None => return,
            }
            if let Err(payload) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback))
            {
                log::error!(
                    "[EventManager:{}] timeout {} panicked: {}",
                    name,
                    task_id,
                    panic_message(payload.as_ref())
                );
            }
        });

        let abort = task.abort_handle();
        let unsubscribe = self.removal(&id, move || abort.abort());
        self.insert(id, ListenerKind::Timeout, "timeout", unsubscribe.clone());
        unsubscribe
    }

    /// Run `callback` every `period`, first after one full period.
    ///
    /// Outside a tokio runtime the call is refused.
    pub fn add_interval(
        &self,
        mut callback: impl FnMut() + Send + 'static,
        period: Duration,
    ) -> Unsubscribe {
        if self.refuse_if_destroyed("add_interval") {
            return Unsubscribe::noop();
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!(
                "[EventManager:{}] add_interval needs a tokio runtime",
                self.inner.name
            );
            return Unsubscribe::noop();
        };

        let id = self.inner.next_id(ListenerKind::Interval);
        let period = interval_period(period);
        let task_id = id.clone();
        let name = self.inner.name.clone();

        let task = runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(payload) =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut callback))
                {
                    log::error!(
                        "[EventManager:{}] interval {} panicked: {}",
                        name,
                        task_id,
                        panic_message(payload.as_ref())
                    );
                }
            }
        });

        let abort = task.abort_handle();
        let unsubscribe = self.removal(&id, move || abort.abort());
        self.insert(id, ListenerKind::Interval, "interval", unsubscribe.clone());
        unsubscribe
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Remove every registration and make the manager inert.
    ///
    /// Safe to call repeatedly; only the first call does anything.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let removed = self.inner.teardown();
        log::debug!(
            "[EventManager:{}] destroyed, removed {} registrations",
            self.inner.name,
            removed
        );
    }

    /// Destroy this manager when `host` is torn down.
    pub fn bind_to_host(&self, host: &dyn TeardownHost) {
        let weak = Arc::downgrade(&self.inner);
        host.on_teardown(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                EventManager { inner }.destroy();
            }
        }));
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("name", &self.inner.name)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockEmitter, MockHost, MockTarget};
    use std::sync::atomic::AtomicUsize;

    fn counting_handler() -> (Handler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let handler: Handler = Arc::new(move |_event: &ListenerEvent| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (handler, count)
    }

    #[test]
    fn test_dom_listener_add_and_remove() {
        let manager = EventManager::new("test");
        let window = Arc::new(MockTarget::new("window"));
        let (handler, count) = counting_handler();

        let off = manager.add_dom_listener(
            window.clone(),
            "resize",
            handler,
            ListenerOptions::default(),
        );
        assert_eq!(off.id(), Some("dom:window:resize"));
        assert_eq!(window.listener_count("resize"), 1);

        window.dispatch(&ListenerEvent::new("resize"));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(off.call());
        assert_eq!(window.listener_count("resize"), 0);
        assert_eq!(manager.listener_count(), 0);

        window.dispatch(&ListenerEvent::new("resize"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_dom_listener_returns_first_handle() {
        let manager = EventManager::new("test");
        let window = Arc::new(MockTarget::new("window"));
        let (handler_a, _) = counting_handler();

        let first = manager.add_dom_listener(
            window.clone(),
            "resize",
            handler_a.clone(),
            ListenerOptions::default(),
        );
        let second = manager.add_dom_listener(
            window.clone(),
            "resize",
            handler_a,
            ListenerOptions::default(),
        );

        assert!(second.same_as(&first));
        assert_eq!(window.listener_count("resize"), 1);
        assert_eq!(manager.listener_count(), 1);

        // After removal the same target/event may be registered again
        second.call();
        let third = manager.add_dom_listener(
            window.clone(),
            "resize",
            counting_handler().0,
            ListenerOptions::default(),
        );
        assert!(!third.same_as(&first));
        assert_eq!(window.listener_count("resize"), 1);
    }

    #[test]
    fn test_custom_listener_on_off_and_event_target() {
        let manager = EventManager::new("test");
        let provider = Arc::new(MockEmitter::on_off());
        let doc = Arc::new(MockEmitter::event_target());

        let off_a = manager.add_custom_listener(provider.clone(), "status", counting_handler().0);
        let off_b = manager.add_custom_listener(doc.clone(), "update", counting_handler().0);

        assert_eq!(provider.listener_count("status"), 1);
        assert_eq!(doc.listener_count("update"), 1);
        assert_eq!(manager.stats().custom, 2);

        off_a.call();
        off_b.call();
        assert_eq!(provider.listener_count("status"), 0);
        assert_eq!(doc.listener_count("update"), 0);
        assert_eq!(manager.listener_count(), 0);
    }

    #[test]
    fn test_custom_listener_unsupported_emitter() {
        let manager = EventManager::new("test");
        let emitter = Arc::new(MockEmitter::unsupported());

        let off = manager.add_custom_listener(emitter, "status", counting_handler().0);
        assert!(off.is_noop());
        assert_eq!(manager.listener_count(), 0);
    }

    #[test]
    fn test_destroy_removes_everything_and_is_idempotent() {
        let manager = EventManager::new("test");
        let window = Arc::new(MockTarget::new("window"));
        let provider = Arc::new(MockEmitter::on_off());

        manager.add_dom_listener(
            window.clone(),
            "resize",
            counting_handler().0,
            ListenerOptions::default(),
        );
        manager.add_dom_listener(
            window.clone(),
            "beforeunload",
            counting_handler().0,
            ListenerOptions::default(),
        );
        manager.add_custom_listener(provider.clone(), "synced", counting_handler().0);
        assert_eq!(manager.listener_count(), 3);

        manager.destroy();
        assert!(manager.is_destroyed());
        assert_eq!(manager.listener_count(), 0);
        assert_eq!(window.total_listeners(), 0);
        assert_eq!(provider.listener_count("synced"), 0);

        // Second destroy is a no-op
        manager.destroy();
        assert!(manager.is_destroyed());
    }

    #[test]
    fn test_registrations_after_destroy_are_noops() {
        let manager = EventManager::new("test");
        let window = Arc::new(MockTarget::new("window"));
        manager.destroy();

        let off = manager.add_dom_listener(
            window.clone(),
            "resize",
            counting_handler().0,
            ListenerOptions::default(),
        );
        assert!(off.is_noop());
        assert_eq!(window.total_listeners(), 0);
        assert!(manager.add_timeout(|| {}, Duration::from_millis(1)).is_noop());
    }

    #[test]
    fn test_destroy_survives_panicking_removal() {
        let manager = EventManager::new("test");
        let bad = Arc::new(MockTarget::new("bad").panicking_on_remove());
        let good = Arc::new(MockTarget::new("good"));

        manager.add_dom_listener(bad, "click", counting_handler().0, ListenerOptions::default());
        manager.add_dom_listener(
            good.clone(),
            "click",
            counting_handler().0,
            ListenerOptions::default(),
        );

        manager.destroy();
        assert_eq!(good.total_listeners(), 0);
        assert_eq!(manager.listener_count(), 0);
    }

    #[test]
    fn test_bind_to_host() {
        let manager = EventManager::new("test");
        let host = MockHost::default();
        let window = Arc::new(MockTarget::new("window"));

        manager.bind_to_host(&host);
        manager.add_dom_listener(
            window.clone(),
            "resize",
            counting_handler().0,
            ListenerOptions::default(),
        );

        host.teardown();
        assert!(manager.is_destroyed());
        assert_eq!(window.total_listeners(), 0);
    }

    #[test]
    fn test_drop_tears_down() {
        let window = Arc::new(MockTarget::new("window"));
        {
            let manager = EventManager::new("test");
            manager.add_dom_listener(
                window.clone(),
                "resize",
                counting_handler().0,
                ListenerOptions::default(),
            );
            assert_eq!(window.total_listeners(), 1);
        }
        assert_eq!(window.total_listeners(), 0);
    }

    #[test]
    fn test_timeout_without_runtime_is_refused() {
        let manager = EventManager::new("test");
        assert!(manager.add_timeout(|| {}, Duration::from_millis(1)).is_noop());
        assert!(manager.add_interval(|| {}, Duration::from_millis(1)).is_noop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_once_and_unregisters() {
        let manager = EventManager::new("test");
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);

        manager.add_timeout(
            move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(100),
        );
        assert_eq!(manager.stats().timeouts, 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(manager.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timeout_never_fires() {
        let manager = EventManager::new("test");
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);

        let off = manager.add_timeout(
            move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(100),
        );
        off.call();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_until_destroy() {
        let manager = EventManager::new("test");
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticks_clone = Arc::clone(&ticks);

        manager.add_interval(
            move || {
                ticks_clone.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(100),
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        manager.destroy();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_panicking_attach_leaves_manager_usable() {
        let manager = EventManager::new("test");
        let broken = Arc::new(MockTarget::new("broken").panicking_on_add());
        let (handler, _count) = counting_handler();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            manager.add_dom_listener(
                broken.clone(),
                "resize",
                Arc::clone(&handler),
                ListenerOptions::default(),
            )
        }));
        assert!(result.is_err());
        assert_eq!(manager.listener_count(), 0);

        let window = Arc::new(MockTarget::new("window"));
        let off = manager.add_dom_listener(
            window.clone(),
            "resize",
            handler,
            ListenerOptions::default(),
        );
        assert!(off.is_active());
        assert_eq!(manager.listener_count(), 1);

        manager.destroy();
        assert_eq!(window.listener_count("resize"), 0);
        assert_eq!(manager.listener_count(), 0);
    }

    #[test]
    fn test_once_listener_can_be_added_again_after_firing() {
        let manager = EventManager::new("test");
        let window = Arc::new(MockTarget::new("window"));
        let (handler, count) = counting_handler();
        let once = ListenerOptions {
            once: true,
            ..ListenerOptions::default()
        };

        let first = manager.add_dom_listener(window.clone(), "load", Arc::clone(&handler), once);
        window.dispatch(&ListenerEvent::new("load"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(window.listener_count("load"), 0);
        assert_eq!(manager.listener_count(), 0);
        assert!(!first.is_active());
        assert!(!first.call());

        let second = manager.add_dom_listener(window.clone(), "load", handler, once);
        assert!(!second.same_as(&first));
        assert!(second.is_active());
        assert_eq!(window.listener_count("load"), 1);
        assert_eq!(manager.listener_count(), 1);

        window.dispatch(&ListenerEvent::new("load"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(manager.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_timeout_handle_is_inactive() {
        let manager = EventManager::new("test");
        let off = manager.add_timeout(|| {}, Duration::from_millis(100));
        assert!(off.is_active());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!off.is_active());
        assert!(!off.call());
        assert!(!manager.has_registration(off.id().unwrap()));
    }

    #[test]
    fn test_interval_period_is_clamped() {
        assert_eq!(interval_period(Duration::MAX), MAX_TIMER_DELAY);
        assert_eq!(interval_period(Duration::ZERO), Duration::from_millis(1));
        assert_eq!(
            interval_period(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timer_durations_are_accepted() {
        let manager = EventManager::new("test");
        let interval = manager.add_interval(|| {}, Duration::MAX);
        let timeout = manager.add_timeout(|| {}, Duration::MAX);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(interval.is_active());
        assert!(timeout.is_active());
        assert_eq!(manager.listener_count(), 2);

        assert!(interval.call());
        assert!(timeout.call());
        assert_eq!(manager.listener_count(), 0);
    }
}
