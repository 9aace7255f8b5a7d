//! PostgreSQL driver implementation

mod connection;
mod driver;
mod schema;
mod tls;

pub use connection::PostgresConnection;
pub use driver::PostgresDriver;
pub use tls::{PostgresTlsConnector, TlsError};
