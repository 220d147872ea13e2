//! Single source of truth for document-level flags.
//!
//! Every setter validates, updates, then broadcasts a typed [`AppEvent`] on
//! the shared bus. Setters never fail: invalid enumerated values are logged
//! and the update is refused.

use std::sync::{Arc, Mutex};

use crate::events::{AppEvent, EventBus};

use super::types::{ConnectionStatus, DocumentState, FileType};

/// Owns the [`DocumentState`] of the open document.
pub struct DocumentDataService {
    state: Mutex<DocumentState>,
    bus: Arc<EventBus>,
}

impl DocumentDataService {
    /// Create a service with default state, publishing on `bus`.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            state: Mutex::new(DocumentState::default()),
            bus,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DocumentState {
        self.state.lock().unwrap().clone()
    }

    /// Local edits not yet persisted.
    pub fn has_unsaved_changes(&self) -> bool {
        self.state.lock().unwrap().has_unsaved_changes
    }

    /// The pending edits were user-driven.
    pub fn has_user_intent(&self) -> bool {
        self.state.lock().unwrap().has_user_intent
    }

    /// Current file type.
    pub fn file_type(&self) -> FileType {
        self.state.lock().unwrap().file_type
    }

    /// Whether the document has never been saved.
    pub fn is_temporary_document(&self) -> bool {
        self.state.lock().unwrap().is_temporary_document
    }

    /// Whether a local durable store is attached.
    pub fn has_indexeddb_persistence(&self) -> bool {
        self.state.lock().unwrap().has_indexeddb_persistence
    }

    /// Last status reported by the transport.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.state.lock().unwrap().connection_status
    }

    /// Whether a document load is in progress.
    pub fn is_loading_document(&self) -> bool {
        self.state.lock().unwrap().is_loading_document
    }

    // =========================================================================
    // Save state
    // =========================================================================

    /// Set the dirty flags. `has_intent = None` keeps the previous intent.
    pub fn update_save_state(&self, has_changes: bool, has_intent: Option<bool>, source: &str) {
        let (changes, intent) = {
            let mut state = self.state.lock().unwrap();
            state.has_unsaved_changes = has_changes;
            if let Some(intent) = has_intent {
                state.has_user_intent = intent;
            }
            (state.has_unsaved_changes, state.has_user_intent)
        };

        log::debug!(
            "[DocumentData] save state: unsaved={} intent={} (source: {})",
            changes,
            intent,
            source
        );
        self.emit(AppEvent::DocumentSaveStateChanged {
            has_unsaved_changes: changes,
            has_user_intent: intent,
            source: source.to_string(),
        });
    }

    /// User-driven edit pending.
    pub fn mark_as_unsaved(&self, source: &str) {
        self.update_save_state(true, Some(true), source);
    }

    /// Everything persisted.
    pub fn mark_as_saved(&self, source: &str) {
        self.update_save_state(false, Some(false), source);
    }

    // =========================================================================
    // File type
    // =========================================================================

    /// Set the file type from its wire name. Unknown names are logged and ignored.
    pub fn update_file_type(&self, file_type: &str, source: &str) {
        match file_type.parse::<FileType>() {
            Ok(parsed) => self.set_file_type(parsed, source),
            Err(e) => log::warn!("[DocumentData] {} (source: {})", e, source),
        }
    }

    /// Set the file type. [`FileType::Temp`] marks the document temporary.
    pub fn set_file_type(&self, file_type: FileType, source: &str) {
        let is_temporary = file_type == FileType::Temp;
        {
            let mut state = self.state.lock().unwrap();
            state.file_type = file_type;
            state.is_temporary_document = is_temporary;
        }

        log::debug!(
            "[DocumentData] file type: {} (source: {})",
            file_type,
            source
        );
        self.emit(AppEvent::DocumentTypeChanged {
            file_type,
            is_temporary_document: is_temporary,
            source: source.to_string(),
        });
    }

    // =========================================================================
    // Persistence, connection, loading
    // =========================================================================

    /// Record whether a local durable store is attached.
    pub fn update_persistence_status(&self, has_indexeddb: bool, source: &str) {
        self.state.lock().unwrap().has_indexeddb_persistence = has_indexeddb;

        log::debug!(
            "[DocumentData] persistence: {} (source: {})",
            has_indexeddb,
            source
        );
        self.emit(AppEvent::DocumentPersistenceChanged {
            has_indexeddb_persistence: has_indexeddb,
            source: source.to_string(),
        });
    }

    /// Record a status string reported by the transport. Unknown strings are
    /// logged and ignored; transition legality is not checked.
    pub fn update_connection_status(&self, status: &str, source: &str) {
        match status.parse::<ConnectionStatus>() {
            Ok(parsed) => self.set_connection_status(parsed, source),
            Err(e) => log::warn!("[DocumentData] {} (source: {})", e, source),
        }
    }

    /// Record a connection status reported by the transport.
    pub fn set_connection_status(&self, status: ConnectionStatus, source: &str) {
        let previous = {
            let mut state = self.state.lock().unwrap();
            std::mem::replace(&mut state.connection_status, status)
        };

        log::debug!(
            "[DocumentData] connection: {} -> {} (source: {})",
            previous,
            status,
            source
        );
        self.emit(AppEvent::ConnectionStatusChanged {
            status,
            previous,
            source: source.to_string(),
        });
    }

    /// Record whether a document load is in progress.
    pub fn update_loading_state(&self, is_loading: bool, source: &str) {
        self.state.lock().unwrap().is_loading_document = is_loading;

        self.emit(AppEvent::LoadingStateChanged {
            is_loading,
            source: source.to_string(),
        });
    }

    /// Restore every flag to its default.
    pub fn reset(&self, source: &str) {
        *self.state.lock().unwrap() = DocumentState::default();

        log::debug!("[DocumentData] reset (source: {})", source);
        self.emit(AppEvent::DocumentDataReset {
            source: source.to_string(),
        });
    }

    fn emit(&self, event: AppEvent) {
        self.bus.emit(&event);
    }
}

impl std::fmt::Debug for DocumentDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentDataService")
            .field("state", &*self.state.lock().unwrap())
            .finish()
    }
}
