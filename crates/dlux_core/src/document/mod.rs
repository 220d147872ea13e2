//! Document-level state and access rules.

mod data_service;
pub mod permissions;
mod types;

pub use data_service::DocumentDataService;
pub use permissions::{DocumentAccess, PermissionLevel};
pub use types::{ConnectionStatus, DocumentState, FileType};
