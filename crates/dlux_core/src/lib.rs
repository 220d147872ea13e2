#![doc = include_str!(concat!(env!("OUT_DIR"), "/README.md"))]
#![warn(missing_docs)]

use std::future::Future;
use std::pin::Pin;

/// Configuration options
pub mod config;

/// Time source (system or manual)
pub mod clock;

/// Error (common error types)
pub mod error;

/// Typed notifications and the shared event bus
pub mod events;

/// Subscriber registry with panic isolation
pub mod callback_registry;

/// Document state and permissions
pub mod document;

/// Editor metadata and the auto-save predicate
pub mod metadata;

/// Listener and timer lifecycle
pub mod event_manager;

/// Error categorization, history and retries
pub mod error_handler;

pub mod autosave;

/// Composition root wiring the services together
pub mod services;

#[cfg(test)]
pub mod test_utils;

/// A boxed future returned by async collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
