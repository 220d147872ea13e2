//! Editor lifecycle metadata and auto-save policy.
//!
//! [`EditorMetadataService`] records when the editor was created, last
//! modified and last saved, and keeps two counters:
//!
//! - `document_version` is bumped on every modification
//! - `sync_version` catches up to `document_version` when a save succeeds
//!
//! The editor has unsynced changes whenever `sync_version < document_version`.
//!
//! # Auto-save policy
//!
//! [`EditorMetadataService::needs_auto_save`] is true only when all of these hold:
//!
//! 1. there are unsynced changes
//! 2. no save is in progress
//! 3. the editor is older than the initialization grace period (3 s)
//! 4. the last save finished at least 5 s ago
//! 5. the last modification is at least `threshold` old (30 s by default)
//!
//! The timings come from [`CollabConfig`](crate::config::CollabConfig).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use ts_rs::TS;

use crate::callback_registry::{CallbackRegistry, EventCallback, Subscription};
use crate::clock::{Clock, elapsed};
use crate::config::CollabConfig;
use crate::error_handler::ErrorInfo;

/// Editor metadata. One instance per editor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct EditorMetadata {
    /// Document the editor was initialized for.
    pub current_document_id: Option<String>,
    /// When `initialize_for_document` ran.
    pub created_at: Option<DateTime<Utc>>,
    /// Last successful save.
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Last content modification.
    pub last_modified_at: Option<DateTime<Utc>>,
    /// Last user interaction of any kind.
    pub last_user_activity: Option<DateTime<Utc>>,

    /// Bumped on every modification.
    pub document_version: u64,
    /// Equal to `document_version` right after a successful save.
    pub sync_version: u64,
    /// `sync_version < document_version`.
    pub has_unsynced_changes: bool,
    /// Number of modifications since initialization.
    pub update_count: u64,
    /// Number of successful saves since initialization.
    pub save_count: u64,

    /// Editor finished initializing.
    pub is_ready: bool,
    /// Milliseconds from creation to ready.
    pub init_duration_ms: Option<u64>,
    /// A save is running.
    pub save_in_progress: bool,
    /// A queued operation batch is being processed.
    pub is_processing_queue: bool,
    /// Size reported by the last successful save.
    pub last_save_size: Option<u64>,
    /// Error from the last failed save.
    pub save_error: Option<ErrorInfo>,
}

/// Outcome passed to [`EditorMetadataService::update_save_state`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveDetails {
    /// The save went through.
    pub success: bool,
    /// Size of the saved payload.
    pub size: Option<u64>,
    /// Why the save failed.
    pub error: Option<ErrorInfo>,
}

impl SaveDetails {
    /// Details for a save that is starting.
    pub fn started() -> Self {
        Self::default()
    }

    /// Details for a successful save.
    pub fn succeeded(size: Option<u64>) -> Self {
        Self {
            success: true,
            size,
            error: None,
        }
    }

    /// Details for a failed save.
    pub fn failed(error: impl Into<ErrorInfo>) -> Self {
        Self {
            success: false,
            size: None,
            error: Some(error.into()),
        }
    }
}

/// What kind of mutation produced a [`MetadataChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "kebab-case")]
pub enum MetadataChangeType {
    /// `initialize_for_document`
    Initialized,
    /// `set_editor_ready`
    Ready,
    /// `update_save_state(true, ..)`
    SaveStarted,
    /// `update_save_state(false, ..)` with success
    SaveCompleted,
    /// `update_save_state(false, ..)` with an error
    SaveFailed,
    /// `update_save_state(false, ..)` with neither success nor an error
    SaveEnded,
    /// `mark_modified`
    Modified,
    /// `record_user_activity`
    UserActivity,
    /// `set_processing_queue`
    QueueProcessing,
    /// `reset`
    Reset,
}

/// Notification passed to metadata listeners.
///
/// `snapshot` is a copy taken right after the mutation; later listeners do
/// not see changes made by earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct MetadataChange {
    /// Kind of mutation.
    pub change_type: MetadataChangeType,
    /// Mutation-specific details.
    pub detail: serde_json::Value,
    /// State after the mutation.
    pub snapshot: EditorMetadata,
}

/// Timings used by the auto-save predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSavePolicy {
    /// Suppress auto-save while the editor is younger than this.
    pub init_grace_period: Duration,
    /// Minimum spacing between saves.
    pub min_save_interval: Duration,
    /// Default idle threshold since the last modification.
    pub threshold: Duration,
}

impl From<&CollabConfig> for AutoSavePolicy {
    fn from(config: &CollabConfig) -> Self {
        Self {
            init_grace_period: config.init_grace_period(),
            min_save_interval: config.min_save_interval(),
            threshold: config.auto_save_threshold(),
        }
    }
}

impl Default for AutoSavePolicy {
    fn default() -> Self {
        Self::from(&CollabConfig::default())
    }
}

/// Tracks editor lifecycle, versions and save state.
pub struct EditorMetadataService {
    state: Mutex<EditorMetadata>,
    listeners: Arc<CallbackRegistry<MetadataChange>>,
    clock: Arc<dyn Clock>,
    policy: AutoSavePolicy,
}

impl EditorMetadataService {
    /// Create a service reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>, policy: AutoSavePolicy) -> Self {
        Self {
            state: Mutex::new(EditorMetadata::default()),
            listeners: Arc::new(CallbackRegistry::new("EditorMetadata")),
            clock,
            policy,
        }
    }

    /// Copy of the current metadata.
    pub fn snapshot(&self) -> EditorMetadata {
        self.state.lock().unwrap().clone()
    }

    /// The auto-save timings in effect.
    pub fn policy(&self) -> AutoSavePolicy {
        self.policy
    }

    /// Register a listener for every metadata mutation.
    pub fn on_metadata_change(
        &self,
        callback: EventCallback<MetadataChange>,
    ) -> Subscription<MetadataChange> {
        Subscription::register(&self.listeners, callback)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start tracking a freshly opened document. Clears all previous metadata.
    pub fn initialize_for_document(&self, document_id: &str, source: &str) {
        let now = self.clock.now();
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            *state = EditorMetadata {
                current_document_id: Some(document_id.to_string()),
                created_at: Some(now),
                ..EditorMetadata::default()
            };
            state.clone()
        };

        log::debug!(
            "[EditorMetadata] initialized for {} (source: {})",
            document_id,
            source
        );
        self.notify(
            MetadataChangeType::Initialized,
            json!({ "documentId": document_id, "source": source }),
            snapshot,
        );
    }

    /// Mark the editor ready. A second call only logs a warning.
    pub fn set_editor_ready(&self, source: &str) {
        let now = self.clock.now();
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            if state.is_ready {
                drop(state);
                log::warn!(
                    "[EditorMetadata] editor already ready, ignoring (source: {})",
                    source
                );
                return;
            }
            state.is_ready = true;
            state.init_duration_ms = state
                .created_at
                .map(|created| elapsed(now, created).as_millis() as u64);
            state.clone()
        };

        log::debug!(
            "[EditorMetadata] ready after {:?}ms (source: {})",
            snapshot.init_duration_ms,
            source
        );
        self.notify(
            MetadataChangeType::Ready,
            json!({ "initDurationMs": snapshot.init_duration_ms, "source": source }),
            snapshot,
        );
    }

    /// Restore defaults.
    pub fn reset(&self, source: &str) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            *state = EditorMetadata::default();
            state.clone()
        };
        log::debug!("[EditorMetadata] reset (source: {})", source);
        self.notify(
            MetadataChangeType::Reset,
            json!({ "source": source }),
            snapshot,
        );
    }

    // =========================================================================
    // Save state
    // =========================================================================

    /// Record a save starting (`in_progress = true`) or finishing.
    ///
    /// Starting clears any previous `save_error`. A successful finish stamps
    /// `last_saved_at`, records the size and brings `sync_version` up to
    /// `document_version`. A failed finish stores the error; retrying is left
    /// to the caller. A finish with neither success nor an error only clears
    /// the in-progress flag.
    pub fn update_save_state(&self, in_progress: bool, details: SaveDetails) {
        let now = self.clock.now();
        let (change_type, snapshot) = {
            let mut state = self.state.lock().unwrap();
            state.save_in_progress = in_progress;

            let change_type = if in_progress {
                state.save_error = None;
                MetadataChangeType::SaveStarted
            } else if details.success {
                state.last_saved_at = Some(now);
                state.last_save_size = details.size;
                state.sync_version = state.document_version;
                state.has_unsynced_changes = false;
                state.save_count += 1;
                MetadataChangeType::SaveCompleted
            } else if let Some(error) = details.error.clone() {
                state.save_error = Some(error);
                MetadataChangeType::SaveFailed
            } else {
                MetadataChangeType::SaveEnded
            };
            (change_type, state.clone())
        };

        match &details.error {
            Some(error) if change_type == MetadataChangeType::SaveFailed => {
                log::warn!("[EditorMetadata] save failed: {}", error)
            }
            _ => log::debug!("[EditorMetadata] {:?}", change_type),
        }

        self.notify(
            change_type,
            json!({
                "inProgress": in_progress,
                "success": details.success,
                "size": details.size,
                "error": details.error,
            }),
            snapshot,
        );
    }

    /// Whether a save is running.
    pub fn is_save_in_progress(&self) -> bool {
        self.state.lock().unwrap().save_in_progress
    }

    /// Set the queue-processing flag.
    pub fn set_processing_queue(&self, processing: bool, source: &str) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.is_processing_queue = processing;
            state.clone()
        };
        self.notify(
            MetadataChangeType::QueueProcessing,
            json!({ "processing": processing, "source": source }),
            snapshot,
        );
    }

    // =========================================================================
    // Modification tracking
    // =========================================================================

    /// Record a content change: bumps `document_version` and `update_count`.
    pub fn mark_modified(&self, source: &str) {
        let now = self.clock.now();
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.last_modified_at = Some(now);
            state.last_user_activity = Some(now);
            state.document_version += 1;
            state.update_count += 1;
            state.has_unsynced_changes = state.sync_version < state.document_version;
            state.clone()
        };

        log::trace!(
            "[EditorMetadata] modified v{} (source: {})",
            snapshot.document_version,
            source
        );
        self.notify(
            MetadataChangeType::Modified,
            json!({ "documentVersion": snapshot.document_version, "source": source }),
            snapshot,
        );
    }

    /// Record user activity that does not change content.
    pub fn record_user_activity(&self, source: &str) {
        let now = self.clock.now();
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.last_user_activity = Some(now);
            state.clone()
        };
        self.notify(
            MetadataChangeType::UserActivity,
            json!({ "source": source }),
            snapshot,
        );
    }

    /// Whether local changes are not yet saved.
    pub fn has_unsynced_changes(&self) -> bool {
        self.state.lock().unwrap().has_unsynced_changes
    }

    /// Current document version.
    pub fn document_version(&self) -> u64 {
        self.state.lock().unwrap().document_version
    }

    /// Version confirmed by the last successful save.
    pub fn sync_version(&self) -> u64 {
        self.state.lock().unwrap().sync_version
    }

    // =========================================================================
    // Timing
    // =========================================================================

    /// Time since `initialize_for_document`. `None` means never initialized.
    pub fn editor_age(&self) -> Option<Duration> {
        let created = self.state.lock().unwrap().created_at;
        created.map(|t| elapsed(self.clock.now(), t))
    }

    /// Time since the last successful save. `None` means never saved.
    pub fn time_since_last_save(&self) -> Option<Duration> {
        let saved = self.state.lock().unwrap().last_saved_at;
        saved.map(|t| elapsed(self.clock.now(), t))
    }

    /// Time since the last modification. `None` means never modified.
    pub fn time_since_last_modification(&self) -> Option<Duration> {
        let modified = self.state.lock().unwrap().last_modified_at;
        modified.map(|t| elapsed(self.clock.now(), t))
    }

    /// Auto-save predicate with an explicit idle threshold.
    pub fn needs_auto_save(&self, threshold: Duration) -> bool {
        let (unsynced, saving) = {
            let state = self.state.lock().unwrap();
            (state.has_unsynced_changes, state.save_in_progress)
        };
        if !unsynced || saving {
            return false;
        }

        // Unset timestamps count as infinitely long ago
        let past = |since: Option<Duration>, min: Duration| since.is_none_or(|d| d >= min);

        past(self.editor_age(), self.policy.init_grace_period)
            && past(self.time_since_last_save(), self.policy.min_save_interval)
            && past(self.time_since_last_modification(), threshold)
    }

    /// Auto-save predicate with the configured threshold.
    pub fn needs_auto_save_default(&self) -> bool {
        self.needs_auto_save(self.policy.threshold)
    }

    fn notify(&self, change_type: MetadataChangeType, detail: serde_json::Value, snapshot: EditorMetadata) {
        let change = MetadataChange {
            change_type,
            detail,
            snapshot,
        };
        self.listeners.emit(&change);
    }
}

impl std::fmt::Debug for EditorMetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorMetadataService")
            .field("state", &*self.state.lock().unwrap())
            .field("policy", &self.policy)
            .field("listeners", &self.listeners)
            .finish()
    }
}
