//! Hoprun Storage - Application database
//!
//! Users, projects and target-database connections live in a local SQLite
//! file. Connection passwords are encrypted at rest with
//! [`CredentialCipher`] before they reach this crate.

mod credentials;
mod error;
mod local;
mod models;

pub use credentials::CredentialCipher;
pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;
pub use models::{ConnectionRecord, NewConnection, Project, User};
