//! Hoprun HTTP server
//!
//! Routes JSON requests to the account, project, connection and query
//! services. Everything except `/register`, `/login` and `/health` requires a
//! bearer token.

pub mod config;
mod error;
mod extract;
pub mod logging;
mod routes;
mod state;

pub use config::{Cli, ServerConfig};
pub use error::AppError;
pub use extract::{AuthUser, JsonBody};
pub use routes::build_router;
pub use state::AppState;
