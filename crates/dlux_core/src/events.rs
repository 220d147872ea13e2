//! Notifications broadcast by the coordination services.
//!
//! These events replace the `window`-level custom events the UI used to
//! listen for. Every event carries an opaque `source` string naming the caller
//! that caused the change, for diagnostics. Serialized events are tagged with
//! their kebab-case event name so a JS bridge can re-dispatch them unchanged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::callback_registry::CallbackRegistry;
use crate::document::{ConnectionStatus, FileType};
use crate::error_handler::ErrorRecord;

/// Events emitted by the coordination services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AppEvent {
    /// Dirty flags changed.
    #[serde(rename_all = "camelCase")]
    DocumentSaveStateChanged {
        /// Local edits not yet persisted.
        has_unsaved_changes: bool,
        /// The edits were user-driven.
        has_user_intent: bool,
        /// Caller that made the change.
        source: String,
    },

    /// File type changed.
    #[serde(rename_all = "camelCase")]
    DocumentTypeChanged {
        /// New file type.
        file_type: FileType,
        /// Derived temporary flag.
        is_temporary_document: bool,
        /// Caller that made the change.
        source: String,
    },

    /// Local durable store attached or detached.
    #[serde(rename_all = "camelCase")]
    DocumentPersistenceChanged {
        /// Whether a local store is attached.
        #[serde(rename = "hasIndexedDBPersistence")]
        has_indexeddb_persistence: bool,
        /// Caller that made the change.
        source: String,
    },

    /// Transport reported a new connection status.
    #[serde(rename_all = "camelCase")]
    ConnectionStatusChanged {
        /// New status.
        status: ConnectionStatus,
        /// Status before this report.
        previous: ConnectionStatus,
        /// Caller that made the change.
        source: String,
    },

    /// A document load started or finished.
    #[serde(rename_all = "camelCase")]
    LoadingStateChanged {
        /// Whether a load is in progress.
        is_loading: bool,
        /// Caller that made the change.
        source: String,
    },

    /// All document flags were restored to their defaults.
    #[serde(rename_all = "camelCase")]
    DocumentDataReset {
        /// Caller that made the change.
        source: String,
    },

    /// An error was logged.
    #[serde(rename_all = "camelCase")]
    AppError {
        /// The logged record.
        record: ErrorRecord,
        /// Same as `record.context`.
        source: String,
    },

    /// A warning was logged.
    #[serde(rename_all = "camelCase")]
    AppWarning {
        /// Warning text.
        message: String,
        /// Caller-supplied details.
        metadata: serde_json::Value,
        /// Context the warning was raised in.
        source: String,
    },
}

impl AppEvent {
    /// Event name as dispatched to the UI.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::DocumentSaveStateChanged { .. } => "document-save-state-changed",
            Self::DocumentTypeChanged { .. } => "document-type-changed",
            Self::DocumentPersistenceChanged { .. } => "document-persistence-changed",
            Self::ConnectionStatusChanged { .. } => "connection-status-changed",
            Self::LoadingStateChanged { .. } => "loading-state-changed",
            Self::DocumentDataReset { .. } => "document-data-reset",
            Self::AppError { .. } => "app-error",
            Self::AppWarning { .. } => "app-warning",
        }
    }

    /// The caller that caused this event.
    pub fn source(&self) -> &str {
        match self {
            Self::DocumentSaveStateChanged { source, .. }
            | Self::DocumentTypeChanged { source, .. }
            | Self::DocumentPersistenceChanged { source, .. }
            | Self::ConnectionStatusChanged { source, .. }
            | Self::LoadingStateChanged { source, .. }
            | Self::DocumentDataReset { source }
            | Self::AppError { source, .. }
            | Self::AppWarning { source, .. } => source,
        }
    }
}

/// Process-wide notification channel shared by all services.
pub type EventBus = CallbackRegistry<AppEvent>;

/// Create a bus to hand to the services.
pub fn new_event_bus() -> Arc<EventBus> {
    Arc::new(CallbackRegistry::new("EventBus"))
}
