//! Enumerations and the state snapshot owned by
//! [`DocumentDataService`](super::DocumentDataService).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CollabError;

/// Which persistence/sync path applies to the open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    /// Stored only in the local durable store.
    #[default]
    Local,
    /// Backed by the collaboration server.
    Collaborative,
    /// Not yet saved anywhere.
    Temp,
}

impl FileType {
    /// All variants, in declaration order.
    pub const ALL: [FileType; 3] = [FileType::Local, FileType::Collaborative, FileType::Temp];

    /// Wire name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Local => "local",
            FileType::Collaborative => "collaborative",
            FileType::Temp => "temp",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = CollabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CollabError::InvalidFileType(s.to_string()))
    }
}

/// Connection state as reported by the collaboration transport.
///
/// Transitions are driven externally; only membership in this set is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    /// No connection attempted yet.
    #[default]
    Idle,
    /// Transport dropped.
    Disconnected,
    /// Connection attempt in flight.
    Connecting,
    /// Connected and syncing.
    Connected,
    /// Server wants credentials.
    AuthRequired,
    /// Credentials lack access to this document.
    PermissionDenied,
    /// Credentials rejected.
    AuthInvalid,
    /// Unrecoverable transport fault.
    Error,
    /// Network layer reports no connectivity.
    Offline,
}

impl ConnectionStatus {
    /// All variants, in declaration order.
    pub const ALL: [ConnectionStatus; 9] = [
        ConnectionStatus::Idle,
        ConnectionStatus::Disconnected,
        ConnectionStatus::Connecting,
        ConnectionStatus::Connected,
        ConnectionStatus::AuthRequired,
        ConnectionStatus::PermissionDenied,
        ConnectionStatus::AuthInvalid,
        ConnectionStatus::Error,
        ConnectionStatus::Offline,
    ];

    /// Wire name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::AuthRequired => "auth-required",
            ConnectionStatus::PermissionDenied => "permission-denied",
            ConnectionStatus::AuthInvalid => "auth-invalid",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Offline => "offline",
        }
    }

    /// Whether the transport is live.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Whether a connection attempt is underway.
    pub fn is_syncing(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting)
    }

    /// Authorization failures stay put until the user re-authenticates.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::AuthRequired
                | ConnectionStatus::PermissionDenied
                | ConnectionStatus::AuthInvalid
        )
    }

    /// States the transport will not leave on its own.
    pub fn is_terminal(&self) -> bool {
        self.is_auth_failure() || matches!(self, ConnectionStatus::Error)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = CollabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionStatus::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CollabError::InvalidConnectionStatus(s.to_string()))
    }
}

/// Document-level flags. One instance per open document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    /// Local edits not yet persisted.
    pub has_unsaved_changes: bool,
    /// The pending edits came from the user rather than a programmatic update.
    pub has_user_intent: bool,
    /// Persistence/sync path.
    pub file_type: FileType,
    /// Always true when `file_type` is [`FileType::Temp`].
    pub is_temporary_document: bool,
    /// A local durable store is attached.
    #[serde(rename = "hasIndexedDBPersistence")]
    pub has_indexeddb_persistence: bool,
    /// Last status reported by the transport.
    pub connection_status: ConnectionStatus,
    /// A document load is in progress.
    pub is_loading_document: bool,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            has_unsaved_changes: false,
            has_user_intent: false,
            file_type: FileType::Local,
            is_temporary_document: false,
            has_indexeddb_persistence: false,
            connection_status: ConnectionStatus::Idle,
            is_loading_document: false,
        }
    }
}
