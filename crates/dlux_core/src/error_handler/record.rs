//! Portable error values and the entries kept in the error history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::category::ErrorCategory;
use crate::error::CollabError;

/// A captured error: name, message and the chain of causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorInfo {
    /// Error kind, e.g. the variant or type name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Source chain, one cause per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorInfo {
    /// Create an error with an explicit name.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Capture any [`std::error::Error`], walking its `source()` chain.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            name: short_type_name::<E>().to_string(),
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    /// Capture anything printable.
    pub fn from_display<D: fmt::Display + ?Sized>(value: &D) -> Self {
        Self::new("Error", value.to_string())
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Strip generics first so `a::B<c::D>` yields `B`
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for ErrorInfo {}

impl From<&str> for ErrorInfo {
    fn from(message: &str) -> Self {
        Self::new("Error", message)
    }
}

impl From<String> for ErrorInfo {
    fn from(message: String) -> Self {
        Self::new("Error", message)
    }
}

impl From<&CollabError> for ErrorInfo {
    fn from(err: &CollabError) -> Self {
        let mut info = ErrorInfo::from_error(err);
        info.name = err.to_serializable().kind;
        info
    }
}

impl From<CollabError> for ErrorInfo {
    fn from(err: CollabError) -> Self {
        ErrorInfo::from(&err)
    }
}

/// One entry in the error history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Unique id of this record.
    pub id: String,
    /// When the error was logged.
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied location, e.g. "TipTapEditor.save".
    pub context: String,
    /// Error name.
    pub name: String,
    /// Error message.
    pub message: String,
    /// Cause chain, if any.
    pub stack: Option<String>,
    /// Caller-supplied structured details.
    pub metadata: serde_json::Value,
    /// Heuristic category.
    pub category: ErrorCategory,
}

impl ErrorRecord {
    /// The error this record was built from.
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            name: self.name.clone(),
            message: self.message.clone(),
            stack: self.stack.clone(),
        }
    }
}
