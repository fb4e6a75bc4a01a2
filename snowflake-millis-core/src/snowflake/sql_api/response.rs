//! Bodies returned by the `/api/v2/statements` endpoints.

use crate::error::Error;
use crate::snowflake::{SnowflakeColumn, SnowflakeDatabaseError, SnowflakeType, SnowflakeTypeInfo};
use reqwest::StatusCode;
use serde::de::IgnoredAny;
use serde::Deserialize;

/// A finished statement, or the first partition of its result set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultSet {
    pub(crate) statement_handle: Option<String>,
    pub(crate) result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    pub(crate) data: Vec<Vec<Option<String>>>,
    pub(crate) stats: Option<Stats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultSetMetaData {
    pub(crate) num_rows: Option<u64>,
    #[serde(default)]
    pub(crate) partition_info: Vec<IgnoredAny>,
    #[serde(default)]
    pub(crate) row_type: Vec<RowType>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RowType {
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) ty: String,
    #[serde(default = "default_nullable")]
    pub(crate) nullable: bool,
    pub(crate) scale: Option<i64>,
}

fn default_nullable() -> bool {
    true
}

/// Counts reported for DML statements.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Stats {
    pub(crate) num_rows_inserted: u64,
    pub(crate) num_rows_updated: u64,
    pub(crate) num_rows_deleted: u64,
    pub(crate) num_dml_duplicates: u64,
}

/// A further partition of a result set.
#[derive(Debug, Deserialize)]
pub(crate) struct Partition {
    #[serde(default)]
    pub(crate) data: Vec<Vec<Option<String>>>,
}

/// Returned with `202 Accepted` while a statement is still running.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryStatus {
    pub(crate) statement_handle: Option<String>,
    pub(crate) statement_status_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryFailure {
    code: Option<String>,
    message: Option<String>,
    sql_state: Option<String>,
    statement_handle: Option<String>,
}

impl ResultSet {
    pub(crate) fn columns(&self) -> Vec<SnowflakeColumn> {
        let Some(meta) = &self.result_set_meta_data else {
            return Vec::new();
        };

        meta.row_type
            .iter()
            .enumerate()
            .map(|(ordinal, row_type)| {
                // unknown types are decoded as text
                let ty = SnowflakeType::from_name(&row_type.ty).unwrap_or(SnowflakeType::Text);
                let column = SnowflakeColumn::new(&row_type.name, SnowflakeTypeInfo::new(ty), ordinal)
                    .nullable(row_type.nullable);

                match row_type.scale {
                    Some(scale) => column.scale(scale),
                    None => column,
                }
            })
            .collect()
    }

    pub(crate) fn partitions(&self) -> usize {
        self.result_set_meta_data
            .as_ref()
            .map_or(0, |meta| meta.partition_info.len())
    }

    /// Rows changed by a DML statement, or rows returned by a query.
    pub(crate) fn rowcount(&self) -> Option<u64> {
        match &self.stats {
            Some(stats) => Some(
                stats.num_rows_inserted
                    + stats.num_rows_updated
                    + stats.num_rows_deleted
                    + stats.num_dml_duplicates,
            ),
            None => self
                .result_set_meta_data
                .as_ref()
                .and_then(|meta| meta.num_rows),
        }
    }
}

/// Builds the error for a non-success response.
///
/// Snowflake answers failed statements with a JSON body carrying its own error code; any
/// other body is kept verbatim with the HTTP status as the code.
pub(crate) fn database_error(status: StatusCode, body: &str) -> Error {
    let error = match serde_json::from_str::<QueryFailure>(body) {
        Ok(QueryFailure {
            code: Some(code),
            message,
            sql_state,
            statement_handle,
        }) => {
            let error = SnowflakeDatabaseError::new(
                code,
                message.unwrap_or_else(|| status.to_string()),
                sql_state,
            );

            match statement_handle {
                Some(handle) => error.with_query_id(handle),
                None => error,
            }
        }
        _ => SnowflakeDatabaseError::new(
            status.as_u16().to_string(),
            format!("HTTP {status}: {}", body.trim()),
            None,
        ),
    };

    error.into()
}
