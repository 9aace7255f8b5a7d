//! Hoprun Services - Business logic between the HTTP surface and storage
//!
//! - [`AccountService`] - registration, login and bearer tokens
//! - [`ProjectService`] - project creation and listing
//! - [`ConnectionService`] - per-project target databases, one per project
//! - [`QueryService`] - the natural-language query pipeline

mod account_service;
mod auth;
mod connection_service;
mod error;
mod project_service;
mod query_service;
mod view_models;

pub use account_service::AccountService;
pub use auth::{Claims, PasswordHasher, TokenSigner};
pub use connection_service::ConnectionService;
pub use error::{ServiceError, ServiceResult};
pub use project_service::{PROJECT_PAGE_SIZE, ProjectService};
pub use query_service::{ConnectionResolver, QueryOutcome, QueryRequest, QueryService};
pub use view_models::{AddConnection, ConnectionSummary};
