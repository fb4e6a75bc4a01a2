use crate::connection::Connection;
use crate::error::Error;
use crate::snowflake::SnowflakeConnectOptions;
use futures_core::future::BoxFuture;

/// The underlying client that actually talks to Snowflake.
///
/// [`MillisLoggingConnection`](crate::snowflake::MillisLoggingConnection) delegates connection
/// establishment, authentication and statement execution to a driver. The crate ships
/// [`SqlApiDriver`](crate::snowflake::SqlApiDriver); tests and alternative transports
/// provide their own.
pub trait SnowflakeDriver: Send + Sync {
    type Connection: Connection;

    /// Establishes a connection.
    ///
    /// By the time a driver sees the options, a configured PEM private key has been replaced
    /// by unencrypted PKCS#8 DER and its password removed. Validating the remaining fields
    /// (account, user, ...) is up to the driver.
    fn connect<'a>(
        &'a self,
        options: &'a SnowflakeConnectOptions,
    ) -> BoxFuture<'a, Result<Self::Connection, Error>>;
}
