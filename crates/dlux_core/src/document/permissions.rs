//! Permission levels and the document actions they allow.
//!
//! The permission level for a collaborative document comes from the
//! collaboration server; this module only interprets it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::types::FileType;
use crate::error::CollabError;

/// Capability tier for a document, ordered
/// `Owner > Postable > Editable > Readonly > NoAccess`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "kebab-case")]
pub enum PermissionLevel {
    /// No access at all.
    #[default]
    NoAccess,
    /// May view.
    Readonly,
    /// May view and edit.
    Editable,
    /// May edit and publish to the chain.
    Postable,
    /// Full control, including sharing and deletion.
    Owner,
}

impl PermissionLevel {
    /// All levels, lowest first.
    pub const ALL: [PermissionLevel; 5] = [
        PermissionLevel::NoAccess,
        PermissionLevel::Readonly,
        PermissionLevel::Editable,
        PermissionLevel::Postable,
        PermissionLevel::Owner,
    ];

    /// Wire name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::NoAccess => "no-access",
            PermissionLevel::Readonly => "readonly",
            PermissionLevel::Editable => "editable",
            PermissionLevel::Postable => "postable",
            PermissionLevel::Owner => "owner",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = CollabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionLevel::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CollabError::InvalidPermissionLevel(s.to_string()))
    }
}

/// Whether the document can be opened at all.
pub fn has_access(level: PermissionLevel) -> bool {
    level >= PermissionLevel::Readonly
}

/// Whether the document content may be changed.
pub fn can_edit_with_permission(level: PermissionLevel) -> bool {
    level >= PermissionLevel::Editable
}

/// Whether the document may be published.
pub fn can_post(level: PermissionLevel) -> bool {
    level >= PermissionLevel::Postable
}

/// Whether sharing and deletion are allowed.
pub fn can_manage(level: PermissionLevel) -> bool {
    level == PermissionLevel::Owner
}

/// Whether the document is visible but locked.
pub fn is_read_only(level: PermissionLevel) -> bool {
    level == PermissionLevel::Readonly
}

/// Actions available on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct DocumentAccess {
    /// Open and read.
    pub can_view: bool,
    /// Change content.
    pub can_edit: bool,
    /// Publish.
    pub can_post: bool,
    /// Change collaborators.
    pub can_share: bool,
    /// Delete the document.
    pub can_delete: bool,
}

impl DocumentAccess {
    /// Every action allowed.
    pub fn full() -> Self {
        Self {
            can_view: true,
            can_edit: true,
            can_post: true,
            can_share: true,
            can_delete: true,
        }
    }

    /// Derive allowed actions. Local and temporary documents belong to the
    /// local user; collaborative documents follow the server permission.
    pub fn derive(level: PermissionLevel, file_type: FileType) -> Self {
        match file_type {
            FileType::Local | FileType::Temp => Self::full(),
            FileType::Collaborative => Self {
                can_view: has_access(level),
                can_edit: can_edit_with_permission(level),
                can_post: can_post(level),
                can_share: can_manage(level),
                can_delete: can_manage(level),
            },
        }
    }
}
