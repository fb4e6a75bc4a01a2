//! Snowflake connections whose cursors log how long every statement took.
//!
//! ```rust,no_run
//! use snowflake_millis::prelude::*;
//! use snowflake_millis::SnowflakeConnectOptions;
//!
//! # async fn run() -> snowflake_millis::Result<()> {
//! let options = SnowflakeConnectOptions::new()
//!     .account("xy12345.us-east-1")
//!     .username("loader")
//!     .password("correct-horse")
//!     .private_key(std::env::var("SNOWFLAKE_PRIVATE_KEY").unwrap_or_default())
//!     .warehouse("LOADING");
//!
//! let connection = snowflake_millis::connect(&options).await?;
//! let mut cursor = connection.cursor(true);
//!
//! // logs `MillisLoggingCursor: <N> millis spent executing: SELECT CURRENT_VERSION()`
//! cursor.execute("SELECT CURRENT_VERSION()").await?;
//! let rows = cursor.fetch_all().await?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use snowflake_millis_core::connection::{ConnectOptions, Connection, LogSettings};
pub use snowflake_millis_core::cursor::{Cursor, RowFormat};
pub use snowflake_millis_core::error::{self, Error, Result};
pub use snowflake_millis_core::logger;

pub mod snowflake {
    pub use snowflake_millis_core::snowflake::*;
}

pub use snowflake_millis_core::snowflake::{
    connect, MillisLoggingConnection, MillisLoggingCursor, SnowflakeConnectOptions,
    SnowflakeDriver, SnowflakeRow,
};

/// Convenience re-export of common traits.
pub mod prelude {
    pub use super::ConnectOptions;
    pub use super::Connection;
    pub use super::Cursor;
}
