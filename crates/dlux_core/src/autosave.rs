//! Periodic auto-save driven by [`EditorMetadataService::needs_auto_save`].
//!
//! The scheduler owns an [`EventManager`] interval that polls the metadata
//! service. When a save is due it runs the host-provided [`SaveBackend`]
//! through [`ErrorHandlerService::handle_async`], records the start and the
//! result in the metadata service and clears the document's unsaved flag on
//! success.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::BoxFuture;
use crate::config::CollabConfig;
use crate::document::DocumentDataService;
use crate::error::{CollabError, Result};
use crate::error_handler::{AsyncOutcome, ErrorHandlerService, HandleAsyncOptions};
use crate::event_manager::{EventManager, Unsubscribe};
use crate::metadata::{EditorMetadataService, SaveDetails};

/// Persists the current document. Implemented by the host application.
pub trait SaveBackend: Send + Sync {
    /// Save the document, returning the stored size in bytes if known.
    fn save(&self) -> BoxFuture<'_, Result<Option<u64>>>;
}

/// Outcome of one save run.
pub type SaveOutcome = AsyncOutcome<Option<u64>, CollabError>;

struct SaveContext {
    document: Arc<DocumentDataService>,
    metadata: Arc<EditorMetadataService>,
    errors: Arc<ErrorHandlerService>,
    backend: Arc<dyn SaveBackend>,
    retries: u32,
    retry_delay: Duration,
    running: AtomicBool,
}

impl SaveContext {
    async fn run(&self, source: &str) -> Option<SaveOutcome> {
        if self.running.swap(true, Ordering::SeqCst) {
            log::debug!("[AutoSave] save already running, skipping {}", source);
            return None;
        }
        if self.metadata.is_save_in_progress() {
            log::debug!("[AutoSave] external save in progress, skipping {}", source);
            self.running.store(false, Ordering::SeqCst);
            return None;
        }

        self.metadata.update_save_state(true, SaveDetails::started());
        let guard = RunGuard { ctx: self };

        let backend: &dyn SaveBackend = self.backend.as_ref();
        let outcome = self
            .errors
            .handle_async(
                move || backend.save(),
                source,
                HandleAsyncOptions::default()
                    .retries(self.retries)
                    .retry_delay(self.retry_delay),
            )
            .await;

        match (&outcome.data, &outcome.error) {
            (Some(size), None) => {
                self.metadata
                    .update_save_state(false, SaveDetails::succeeded(*size));
                self.document.mark_as_saved(source);
            }
            (_, Some(error)) => {
                self.metadata
                    .update_save_state(false, SaveDetails::failed(error));
            }
            (None, None) => {
                self.metadata
                    .update_save_state(false, SaveDetails::failed("save returned nothing"));
            }
        }

        std::mem::forget(guard);
        self.running.store(false, Ordering::SeqCst);
        Some(outcome)
    }
}

/// Ends a save run that unwound or was cancelled before it could record a
/// result, so later runs are not locked out.
struct RunGuard<'a> {
    ctx: &'a SaveContext,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        log::error!("[AutoSave] save interrupted before completing");
        self.ctx
            .metadata
            .update_save_state(false, SaveDetails::failed("save interrupted"));
        self.ctx.running.store(false, Ordering::SeqCst);
    }
}

/// Polls for due auto-saves and runs them.
pub struct AutoSaveScheduler {
    ctx: Arc<SaveContext>,
    events: EventManager,
    poll_interval: Duration,
    poll: Mutex<Option<Unsubscribe>>,
}

impl AutoSaveScheduler {
    /// Create a stopped scheduler.
    pub fn new(
        document: Arc<DocumentDataService>,
        metadata: Arc<EditorMetadataService>,
        errors: Arc<ErrorHandlerService>,
        backend: Arc<dyn SaveBackend>,
        config: &CollabConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(SaveContext {
                document,
                metadata,
                errors,
                backend,
                retries: config.default_retries,
                retry_delay: config.default_retry_delay(),
                running: AtomicBool::new(false),
            }),
            events: EventManager::new("AutoSave"),
            poll_interval: config.auto_save_poll_interval(),
            poll: Mutex::new(None),
        }
    }

    /// Start polling. Returns false when already running, stopped, or
    /// called outside a tokio runtime.
    pub fn start(&self) -> bool {
        let mut poll = self.poll.lock().unwrap();
        if poll.as_ref().is_some_and(Unsubscribe::is_active) {
            return false;
        }

        let ctx = Arc::clone(&self.ctx);
        let handle = self.events.add_interval(
            move || {
                if !ctx.metadata.needs_auto_save_default() {
                    return;
                }
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    ctx.run("auto-save").await;
                });
            },
            self.poll_interval,
        );

        if handle.is_noop() {
            return false;
        }
        log::debug!("[AutoSave] polling every {:?}", self.poll_interval);
        *poll = Some(handle);
        true
    }

    /// Whether the poll is registered.
    pub fn is_running(&self) -> bool {
        self.poll
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(Unsubscribe::is_active)
    }

    /// Save immediately, bypassing the auto-save predicate. `None` when a
    /// save is already running.
    pub async fn save_now(&self, source: &str) -> Option<SaveOutcome> {
        self.ctx.run(source).await
    }

    /// Stop polling for good.
    pub fn stop(&self) {
        self.poll.lock().unwrap().take();
        self.events.destroy();
    }
}
