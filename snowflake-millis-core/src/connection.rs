use crate::cursor::{Cursor, RowFormat};
use crate::error::Error;
use futures_core::future::BoxFuture;
use log::LevelFilter;
use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

/// The log target statement timings are written to unless overridden with
/// [`LogSettings::target`].
pub const DEFAULT_STATEMENT_LOG_TARGET: &str = "snowflake_millis::query";

/// Represents a single database connection.
///
/// Both the driver connections and the instrumented wrapper implement this trait, so code
/// written against a driver connection keeps working when handed a wrapped one.
pub trait Connection: Send {
    type Cursor: Cursor;

    /// Creates a cursor bound to this connection that decodes rows with the given strategy.
    fn cursor_with(&self, format: RowFormat) -> Self::Cursor;

    /// Creates a cursor bound to this connection.
    ///
    /// Rows are returned as column-name keyed maps when `as_dict` is set, as positional
    /// tuples otherwise.
    #[inline]
    fn cursor(&self, as_dict: bool) -> Self::Cursor {
        self.cursor_with(RowFormat::from_as_dict(as_dict))
    }

    /// Checks if a connection to the database is still valid.
    fn ping(&mut self) -> BoxFuture<'_, Result<(), Error>>;

    /// Explicitly close this database connection.
    ///
    /// This method is **not required** for safe and consistent operation.
    fn close(self) -> BoxFuture<'static, Result<(), Error>>;
}

/// Where and how loudly statement timings are logged.
///
/// This is the "logger handle" of an instrumented connection: it names the `log` target
/// the timing lines are written to and the level they are written at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub(crate) target: Cow<'static, str>,
    pub(crate) statements_level: LevelFilter,
    pub(crate) slow_statements_level: LevelFilter,
    pub(crate) slow_statements_duration: Duration,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            target: Cow::Borrowed(DEFAULT_STATEMENT_LOG_TARGET),
            statements_level: LevelFilter::Info,
            slow_statements_level: LevelFilter::Info,
            slow_statements_duration: Duration::from_secs(1),
        }
    }
}

impl LogSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `log` target timing lines are written to.
    pub fn target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.target = target.into();
        self
    }

    pub fn get_target(&self) -> &str {
        &self.target
    }

    pub fn get_statements_level(&self) -> LevelFilter {
        self.statements_level
    }

    pub fn get_slow_statements_level(&self) -> LevelFilter {
        self.slow_statements_level
    }

    pub fn get_slow_statements_duration(&self) -> Duration {
        self.slow_statements_duration
    }

    pub fn log_statements(&mut self, level: LevelFilter) {
        self.statements_level = level;
    }

    pub fn log_slow_statements(&mut self, level: LevelFilter, duration: Duration) {
        self.slow_statements_level = level;
        self.slow_statements_duration = duration;
    }
}

pub trait ConnectOptions: Sized + Send + Sync + 'static {
    type Connection: Connection;

    fn from_url(url: &str) -> Result<Self, Error>
    where
        Self: std::str::FromStr<Err = Error>,
    {
        Self::from_str(url)
    }

    fn connect(&self) -> BoxFuture<'_, Result<Self::Connection, Error>>;

    fn from_env() -> Result<Self, Error>
    where
        Self: std::str::FromStr<Err = Error>,
    {
        let url = std::env::var("DATABASE_URL").map_err(Error::config)?;
        Self::from_str(&url)
    }

    /// Log executed statements with the specified `level`
    fn log_statements(&mut self, level: LevelFilter) -> &mut Self;

    /// Log executed statements with a duration above the specified `duration`
    /// at the specified `level`.
    fn log_slow_statements(&mut self, level: LevelFilter, duration: Duration) -> &mut Self;
}

/// Establish a new connection from a connection string.
pub async fn connect<O>(url: &str) -> Result<O::Connection, Error>
where
    O: ConnectOptions + FromStr<Err = Error>,
{
    let options = O::from_url(url)?;
    options.connect().await
}
