//! One bus, one clock, one config and the services built on them.

use std::path::Path;
use std::sync::Arc;

use crate::autosave::{AutoSaveScheduler, SaveBackend};
use crate::callback_registry::{EventCallback, SubscriptionId};
use crate::clock::{Clock, SystemClock};
use crate::config::CollabConfig;
use crate::document::DocumentDataService;
use crate::error_handler::ErrorHandlerService;
use crate::event_manager::EventManager;
use crate::events::{AppEvent, EventBus, new_event_bus};
use crate::metadata::{AutoSavePolicy, EditorMetadataService};

/// The coordination services of one editor session.
pub struct CollabServices {
    /// Settings the services were built from.
    pub config: CollabConfig,
    /// Shared time source.
    pub clock: Arc<dyn Clock>,
    /// Bus every service publishes on.
    pub bus: Arc<EventBus>,
    /// Document-level flags.
    pub document: Arc<DocumentDataService>,
    /// Editor lifecycle and versions.
    pub metadata: Arc<EditorMetadataService>,
    /// Error history and retries.
    pub errors: Arc<ErrorHandlerService>,
    /// Session-wide listeners and timers.
    pub events: EventManager,
}

impl CollabServices {
    /// Build the services on the system clock.
    pub fn new(config: CollabConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the services with a custom time source.
    pub fn with_clock(config: CollabConfig, clock: Arc<dyn Clock>) -> Self {
        let bus = new_event_bus();
        Self {
            document: Arc::new(DocumentDataService::new(Arc::clone(&bus))),
            metadata: Arc::new(EditorMetadataService::new(
                Arc::clone(&clock),
                AutoSavePolicy::from(&config),
            )),
            errors: Arc::new(ErrorHandlerService::new(
                Arc::clone(&bus),
                Arc::clone(&clock),
                config.clone(),
            )),
            events: EventManager::new("CollabServices"),
            config,
            clock,
            bus,
        }
    }

    /// Build the services from a TOML config file, falling back to defaults.
    pub fn from_config_file(path: &Path) -> Self {
        Self::new(CollabConfig::load_from_or_default(path))
    }

    /// Listen to every notification.
    pub fn subscribe(&self, callback: EventCallback<AppEvent>) -> SubscriptionId {
        self.bus.subscribe(callback)
    }

    /// Stop listening.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// An auto-save scheduler bound to these services. Call
    /// [`AutoSaveScheduler::start`] to begin polling.
    pub fn auto_save(&self, backend: Arc<dyn SaveBackend>) -> AutoSaveScheduler {
        AutoSaveScheduler::new(
            Arc::clone(&self.document),
            Arc::clone(&self.metadata),
            Arc::clone(&self.errors),
            backend,
            &self.config,
        )
    }

    /// Return document state, metadata and error history to their defaults,
    /// e.g. when switching documents. Listeners stay registered.
    pub fn reset_all(&self, source: &str) {
        log::debug!("[CollabServices] reset by {}", source);
        self.document.reset(source);
        self.metadata.reset(source);
        self.errors.clear();
    }

    /// Tear down session listeners and timers.
    pub fn shutdown(&self) {
        self.events.destroy();
    }
}

impl Drop for CollabServices {
    fn drop(&mut self) {
        self.shutdown();
    }
}
