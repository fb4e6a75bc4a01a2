//! Types for working with errors produced by snowflake-millis.

use std::error::Error as StdError;
use std::fmt::Display;
use std::io;

use crate::snowflake::SnowflakeDatabaseError;

/// A specialized `Result` type for snowflake-millis.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

// Convenience type alias for usage within the crate.
// Do not make this type public.
pub type BoxDynError = Box<dyn StdError + 'static + Send + Sync>;

/// Represents all the ways a method can fail within snowflake-millis.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error occurred while parsing connection options or building a client.
    #[error("error with configuration: {0}")]
    Configuration(#[source] BoxDynError),

    /// The private key could not be loaded or re-encoded.
    ///
    /// The source is the error reported by the key decoder (malformed PEM, wrong password,
    /// unsupported encryption scheme) and is passed through untouched.
    #[error("error loading private key: {0}")]
    PrivateKey(#[source] BoxDynError),

    /// Error returned from the database.
    #[error("error returned from database: {0}")]
    Database(#[source] Box<SnowflakeDatabaseError>),

    /// Error communicating with the database backend.
    #[error("error communicating with database: {0}")]
    Io(#[from] io::Error),

    /// Unexpected or invalid data encountered while communicating with the database.
    ///
    /// This should indicate there is a programming error in the driver or there
    /// is something corrupted with the connection to the database itself.
    #[error("encountered unexpected or invalid data: {0}")]
    Protocol(String),

    /// No rows returned by a query that expected to return at least one row.
    #[error("no rows returned by a query that expected to return at least one row")]
    RowNotFound,

    /// Column name was not found in the row.
    #[error("no column found for name: {0}")]
    ColumnNotFound(String),

    /// Column index was out of bounds.
    #[error("column index out of bounds: the len is {len}, but the index is {index}")]
    ColumnIndexOutOfBounds { index: usize, len: usize },
}

impl Error {
    /// Returns the database error, if this is one.
    pub fn as_database_error(&self) -> Option<&SnowflakeDatabaseError> {
        match self {
            Error::Database(e) => Some(&**e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn protocol(err: impl Display) -> Self {
        Error::Protocol(err.to_string())
    }

    #[inline]
    pub(crate) fn config(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::Configuration(err.into())
    }

    #[inline]
    pub(crate) fn private_key(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::PrivateKey(err.into())
    }
}

impl From<SnowflakeDatabaseError> for Error {
    #[inline]
    fn from(error: SnowflakeDatabaseError) -> Self {
        Error::Database(Box::new(error))
    }
}

/// Format an error message as a `Protocol` error
#[macro_export]
macro_rules! err_protocol {
    ($expr:expr) => {
        $crate::error::Error::Protocol($expr.into())
    };

    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Protocol(format!($fmt, $($arg)*))
    };
}
