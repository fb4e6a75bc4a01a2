use crate::connection::{Connection, LogSettings};
use crate::cursor::RowFormat;
use crate::error::Error;
use crate::logger::SharedLogSettings;
use crate::snowflake::{MillisLoggingCursor, SnowflakeConnectOptions, SnowflakeDriver, SqlApiDriver};
use futures_core::future::BoxFuture;
use std::fmt::{self, Debug, Formatter};

/// A connection to Snowflake whose cursors log per-statement timings.
///
/// Wraps a connection of the underlying [`SnowflakeDriver`] and exposes the same
/// [`Connection`] interface. On construction a configured PEM private key is normalized
/// (escaped newlines restored, decrypted with the password, re-encoded as unencrypted
/// PKCS#8 DER) before the driver is called.
pub struct MillisLoggingConnection<D: SnowflakeDriver = SqlApiDriver> {
    inner: D::Connection,
    configured_warehouse: Option<String>,
    configured_database: Option<String>,
    configured_schema: Option<String>,
    log_settings: SharedLogSettings,
}

impl MillisLoggingConnection<SqlApiDriver> {
    /// Establish a new connection through the SQL API from a connection string.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options: SnowflakeConnectOptions = url.parse()?;
        Self::connect_with(&options).await
    }

    /// Establish a new connection through the SQL API.
    pub async fn connect_with(options: &SnowflakeConnectOptions) -> Result<Self, Error> {
        Self::connect_with_driver(&SqlApiDriver, options).await
    }
}

impl<D: SnowflakeDriver> MillisLoggingConnection<D> {
    /// Normalizes the private key, if any, then establishes a connection through `driver`.
    ///
    /// Key errors (malformed PEM, wrong password) are returned before the driver is
    /// contacted. Driver errors are returned as is.
    pub async fn connect_with_driver(
        driver: &D,
        options: &SnowflakeConnectOptions,
    ) -> Result<Self, Error> {
        let options = options.normalize_private_key()?;
        let inner = driver.connect(&options).await?;

        Ok(Self::new(inner, &options))
    }

    /// Wraps an already established driver connection.
    pub fn new(inner: D::Connection, options: &SnowflakeConnectOptions) -> Self {
        Self {
            inner,
            configured_warehouse: options.warehouse.clone(),
            configured_database: options.database.clone(),
            configured_schema: options.schema.clone(),
            log_settings: SharedLogSettings::new(options.log_settings.clone()),
        }
    }

    /// The warehouse named in the options this connection was made with.
    pub fn configured_warehouse(&self) -> Option<&str> {
        self.configured_warehouse.as_deref()
    }

    /// The database named in the options this connection was made with.
    pub fn configured_database(&self) -> Option<&str> {
        self.configured_database.as_deref()
    }

    /// The schema named in the options this connection was made with.
    pub fn configured_schema(&self) -> Option<&str> {
        self.configured_schema.as_deref()
    }

    /// Replaces the settings timing lines are logged with.
    ///
    /// Applies to every cursor of this connection, including those created before the call.
    /// A statement already executing logs with the settings in effect when it finishes.
    pub fn set_logger(&mut self, log_settings: LogSettings) {
        self.log_settings.replace(log_settings);
    }

    pub fn log_settings(&self) -> LogSettings {
        self.log_settings.get()
    }

    pub fn inner(&self) -> &D::Connection {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut D::Connection {
        &mut self.inner
    }

    pub fn into_inner(self) -> D::Connection {
        self.inner
    }
}

impl<D: SnowflakeDriver> Connection for MillisLoggingConnection<D> {
    type Cursor = MillisLoggingCursor<<D::Connection as Connection>::Cursor>;

    fn cursor_with(&self, format: RowFormat) -> Self::Cursor {
        MillisLoggingCursor::with_shared(self.inner.cursor_with(format), self.log_settings.clone())
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        self.inner.ping()
    }

    fn close(self) -> BoxFuture<'static, Result<(), Error>> {
        self.inner.close()
    }
}

impl<D: SnowflakeDriver> Debug for MillisLoggingConnection<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MillisLoggingConnection")
            .field("configured_warehouse", &self.configured_warehouse)
            .field("configured_database", &self.configured_database)
            .field("configured_schema", &self.configured_schema)
            .field("log_settings", &self.log_settings.get())
            .finish()
    }
}
