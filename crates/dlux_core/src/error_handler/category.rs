//! Keyword heuristics for classifying errors.
//!
//! Classification scans the lowercased error name and message for fixed
//! substrings. Categories are checked in a fixed order and the first hit wins,
//! so a message mentioning both "network" and "invalid" is a network error.
//! The category only feeds logging and statistics.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::record::ErrorInfo;

/// Broad failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Fetch/HTTP/connectivity failures.
    Network,
    /// Authentication and authorization failures.
    Auth,
    /// Collaboration document (CRDT) failures.
    Yjs,
    /// WebSocket transport failures.
    Websocket,
    /// Application state inconsistencies.
    State,
    /// Rejected input.
    Validation,
    /// Anything else.
    General,
}

impl ErrorCategory {
    /// Lowercase name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Yjs => "yjs",
            ErrorCategory::Websocket => "websocket",
            ErrorCategory::State => "state",
            ErrorCategory::Validation => "validation",
            ErrorCategory::General => "general",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const NETWORK_KEYWORDS: &[&str] = &[
    "network",
    "fetch",
    "timeout",
    "timed out",
    "econnrefused",
    "econnreset",
    "cors",
    "dns",
];

const AUTH_KEYWORDS: &[&str] = &[
    "auth",
    "unauthorized",
    "401",
    "403",
    "forbidden",
    "permission",
    "token",
    "signature",
];

const YJS_KEYWORDS: &[&str] = &["yjs", "y.doc", "ydoc", "crdt", "tiptap", "collaboration"];

const WEBSOCKET_KEYWORDS: &[&str] = &["websocket", "socket", "hocuspocus", "ws connection"];

const STATE_KEYWORDS: &[&str] = &["state", "store", "reactive", "not initialized"];

const VALIDATION_KEYWORDS: &[&str] = &["validation", "invalid", "required", "schema", "malformed"];

const RECOVERABLE_KEYWORDS: &[&str] = &["timeout", "temporary", "retry", "disconnected", "offline"];

/// Ordered category table. Order is significant.
const CATEGORY_TABLE: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::Network, NETWORK_KEYWORDS),
    (ErrorCategory::Auth, AUTH_KEYWORDS),
    (ErrorCategory::Yjs, YJS_KEYWORDS),
    (ErrorCategory::Websocket, WEBSOCKET_KEYWORDS),
    (ErrorCategory::State, STATE_KEYWORDS),
    (ErrorCategory::Validation, VALIDATION_KEYWORDS),
];

fn haystack(error: &ErrorInfo) -> String {
    format!("{} {}", error.name, error.message).to_lowercase()
}

/// Classify an error by keyword.
pub fn categorize_error(error: &ErrorInfo) -> ErrorCategory {
    let text = haystack(error);
    CATEGORY_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::General)
}

/// Whether retrying the failed operation might succeed.
pub fn is_recoverable(error: &ErrorInfo) -> bool {
    if matches!(
        categorize_error(error),
        ErrorCategory::Network | ErrorCategory::Auth
    ) {
        return true;
    }
    let message = error.message.to_lowercase();
    RECOVERABLE_KEYWORDS.iter().any(|k| message.contains(k))
}
