use crate::error::Error;
use crate::snowflake::{SnowflakeArguments, SnowflakeColumn, SnowflakeRow};
use futures_core::future::BoxFuture;

static NO_ARGUMENTS: SnowflakeArguments = SnowflakeArguments::new();

/// How a cursor decodes the rows of a result set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowFormat {
    /// Each row is a positional sequence of values.
    #[default]
    Tuple,

    /// Each row maps column names to values, in column order.
    Dict,
}

impl RowFormat {
    #[inline]
    pub fn from_as_dict(as_dict: bool) -> Self {
        if as_dict {
            RowFormat::Dict
        } else {
            RowFormat::Tuple
        }
    }

    #[inline]
    pub fn is_dict(self) -> bool {
        matches!(self, RowFormat::Dict)
    }
}

/// A query handle bound to one connection.
///
/// A cursor runs one statement at a time: [`execute_with`](Cursor::execute_with) replaces
/// whatever result set the previous statement left behind.
pub trait Cursor: Send {
    /// The strategy this cursor decodes rows with.
    fn format(&self) -> RowFormat;

    /// Executes `command` with positional bind `arguments`.
    ///
    /// Returns the cursor itself so a fetch can be chained onto the call.
    fn execute_with<'e>(
        &'e mut self,
        command: &'e str,
        arguments: &'e SnowflakeArguments,
    ) -> BoxFuture<'e, Result<&'e mut Self, Error>>;

    /// Executes `command` without bind arguments.
    #[inline]
    fn execute<'e>(&'e mut self, command: &'e str) -> BoxFuture<'e, Result<&'e mut Self, Error>> {
        self.execute_with(command, &NO_ARGUMENTS)
    }

    /// Columns of the current result set; empty before the first execute.
    fn columns(&self) -> &[SnowflakeColumn];

    /// Rows produced or affected by the last statement, if known.
    fn rowcount(&self) -> Option<u64>;

    /// Server-side identifier of the last statement, if known.
    fn query_id(&self) -> Option<&str>;

    /// Fetches the next row of the current result set.
    fn fetch_one(&mut self) -> BoxFuture<'_, Result<Option<SnowflakeRow>, Error>>;

    /// Fetches up to `size` rows of the current result set.
    fn fetch_many(&mut self, size: usize) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>>;

    /// Fetches every remaining row of the current result set.
    fn fetch_all(&mut self) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>>;
}
