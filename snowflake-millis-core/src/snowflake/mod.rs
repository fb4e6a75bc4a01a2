//! **Snowflake** connections with per-statement timing.
//!
//! [`MillisLoggingConnection`] wraps a connection of a [`SnowflakeDriver`] (by default the
//! bundled [`SqlApiDriver`], which talks to the SQL API over HTTPS) and hands out
//! [`MillisLoggingCursor`]s that log how long every statement took.

mod arguments;
mod column;
mod connection;
mod cursor;
mod driver;
mod error;
pub mod key;
mod options;
mod row;
mod sql_api;
mod type_info;

pub use arguments::SnowflakeArguments;
pub use column::SnowflakeColumn;
pub use connection::MillisLoggingConnection;
pub use cursor::MillisLoggingCursor;
pub use driver::SnowflakeDriver;
pub use error::SnowflakeDatabaseError;
pub use key::{Pkcs8Der, PrivateKey};
pub use options::SnowflakeConnectOptions;
pub use row::SnowflakeRow;
pub use sql_api::{SqlApiConnection, SqlApiCursor, SqlApiDriver};
pub use type_info::{SnowflakeType, SnowflakeTypeInfo};

/// Establish a connection through the SQL API.
pub async fn connect(options: &SnowflakeConnectOptions) -> crate::error::Result<MillisLoggingConnection> {
    MillisLoggingConnection::connect_with(options).await
}
