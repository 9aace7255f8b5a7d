//! Hoprun Core - Core abstractions shared by the query pipeline
//!
//! This crate provides the fundamental traits and types that the other
//! Hoprun crates depend on:
//!
//! - `DatabaseDriver` - Opens handles to target databases
//! - `Connection` - A live handle that runs raw SQL
//! - `SchemaIntrospection` - Catalog inspection for a handle
//! - `Value`, `Row`, `QueryResult` - Typed result sets

mod connection;
mod driver;
mod error;
mod schema;
pub mod security;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use schema::*;
pub use security::TlsMode;
pub use types::*;
