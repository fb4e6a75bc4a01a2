use crate::connection::LogSettings;
use crate::cursor::{Cursor, RowFormat};
use crate::error::Error;
use crate::logger::{QueryLogger, SharedLogSettings};
use crate::snowflake::{SnowflakeArguments, SnowflakeColumn, SnowflakeRow};
use futures_core::future::BoxFuture;

/// A cursor that logs how long every statement took to execute.
///
/// Execution is delegated unchanged to the wrapped driver cursor. After each
/// [`execute_with`](Cursor::execute_with), whether it succeeded, failed or was cancelled, one
/// line is logged:
///
/// ```text
/// MillisLoggingCursor: 42 millis spent executing: SELECT *  \n  FROM t
/// ```
///
/// Newlines in the statement are rendered as `  \n  ` to keep it on one line. Errors are
/// returned exactly as the driver produced them.
///
/// Cursors created by [`MillisLoggingConnection`](crate::snowflake::MillisLoggingConnection)
/// share its log settings, so a later
/// [`set_logger`](crate::snowflake::MillisLoggingConnection::set_logger) reaches them too.
///
/// A dict cursor is the same type created with [`RowFormat::Dict`]; the driver decodes the
/// rows, this wrapper only times them.
#[derive(Debug)]
pub struct MillisLoggingCursor<C> {
    inner: C,
    log_settings: SharedLogSettings,
}

impl<C: Cursor> MillisLoggingCursor<C> {
    /// Wraps `inner` with settings of its own, not tied to any connection.
    pub fn new(inner: C, log_settings: LogSettings) -> Self {
        Self::with_shared(inner, SharedLogSettings::new(log_settings))
    }

    pub(crate) fn with_shared(inner: C, log_settings: SharedLogSettings) -> Self {
        Self {
            inner,
            log_settings,
        }
    }

    /// The settings the next timing line will be logged with.
    pub fn log_settings(&self) -> LogSettings {
        self.log_settings.get()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Cursor> Cursor for MillisLoggingCursor<C> {
    fn format(&self) -> RowFormat {
        self.inner.format()
    }

    fn execute_with<'e>(
        &'e mut self,
        command: &'e str,
        arguments: &'e SnowflakeArguments,
    ) -> BoxFuture<'e, Result<&'e mut Self, Error>> {
        Box::pin(async move {
            let _logger = QueryLogger::new(command, self.log_settings.clone());

            self.inner.execute_with(command, arguments).await?;

            Ok(self)
        })
    }

    fn columns(&self) -> &[SnowflakeColumn] {
        self.inner.columns()
    }

    fn rowcount(&self) -> Option<u64> {
        self.inner.rowcount()
    }

    fn query_id(&self) -> Option<&str> {
        self.inner.query_id()
    }

    fn fetch_one(&mut self) -> BoxFuture<'_, Result<Option<SnowflakeRow>, Error>> {
        self.inner.fetch_one()
    }

    fn fetch_many(&mut self, size: usize) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>> {
        self.inner.fetch_many(size)
    }

    fn fetch_all(&mut self) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>> {
        self.inner.fetch_all()
    }
}
