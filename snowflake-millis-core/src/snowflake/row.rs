use crate::cursor::RowFormat;
use crate::error::Error;
use crate::snowflake::SnowflakeColumn;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A row of a Snowflake result set, decoded as the cursor's [`RowFormat`] asks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnowflakeRow {
    /// Values in column order.
    Tuple(Vec<Value>),

    /// Values keyed by column name, in column order. When two columns share a name the
    /// later value wins.
    Dict(IndexMap<String, Value>),
}

impl SnowflakeRow {
    /// Builds a row from already decoded values.
    pub fn from_values(format: RowFormat, columns: &[SnowflakeColumn], values: Vec<Value>) -> Self {
        match format {
            RowFormat::Tuple => SnowflakeRow::Tuple(values),
            RowFormat::Dict => SnowflakeRow::Dict(
                columns
                    .iter()
                    .map(|column| column.name().to_owned())
                    .zip(values)
                    .collect(),
            ),
        }
    }

    /// Decodes a row of the text protocol, one optional string per column.
    pub(crate) fn decode(
        format: RowFormat,
        columns: &[SnowflakeColumn],
        raw: Vec<Option<String>>,
    ) -> Result<Self, Error> {
        if raw.len() != columns.len() {
            return Err(err_protocol!(
                "row has {} values but the result set has {} columns",
                raw.len(),
                columns.len()
            ));
        }

        let values = columns
            .iter()
            .zip(raw)
            .map(|(column, raw)| column.decode(raw))
            .collect();

        Ok(Self::from_values(format, columns, values))
    }

    pub fn format(&self) -> RowFormat {
        match self {
            SnowflakeRow::Tuple(_) => RowFormat::Tuple,
            SnowflakeRow::Dict(_) => RowFormat::Dict,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SnowflakeRow::Tuple(values) => values.len(),
            SnowflakeRow::Dict(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value at a column position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            SnowflakeRow::Tuple(values) => values.get(index),
            SnowflakeRow::Dict(values) => values.get_index(index).map(|(_, value)| value),
        }
    }

    /// Returns the value of a named column. Only dict rows carry names.
    pub fn try_get(&self, name: &str) -> Result<&Value, Error> {
        match self {
            SnowflakeRow::Dict(values) => values
                .get(name)
                .ok_or_else(|| Error::ColumnNotFound(name.to_owned())),
            SnowflakeRow::Tuple(_) => Err(Error::ColumnNotFound(name.to_owned())),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            SnowflakeRow::Tuple(values) => values,
            SnowflakeRow::Dict(values) => values.into_values().collect(),
        }
    }
}
