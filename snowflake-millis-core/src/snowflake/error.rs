use std::fmt::{self, Display};

/// An error returned by the Snowflake database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnowflakeDatabaseError {
    pub(crate) code: String,
    pub(crate) message: String,
    pub(crate) sql_state: Option<String>,
    pub(crate) query_id: Option<String>,
}

impl SnowflakeDatabaseError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            sql_state,
            query_id: None,
        }
    }

    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    /// Whether the server rejected the credentials (error codes 390100 through 390199).
    pub fn is_authentication_error(&self) -> bool {
        matches!(self.code.parse::<u32>(), Ok(390100..=390199))
    }
}

impl Display for SnowflakeDatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;

        if let Some(sql_state) = &self.sql_state {
            write!(f, " (SQLSTATE {sql_state})")?;
        }

        Ok(())
    }
}

impl std::error::Error for SnowflakeDatabaseError {}
