use crate::snowflake::{SnowflakeType, SnowflakeTypeInfo};
use serde_json::{Number, Value};

/// A column of a Snowflake result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnowflakeColumn {
    pub(crate) name: String,
    pub(crate) type_info: SnowflakeTypeInfo,
    pub(crate) ordinal: usize,
    pub(crate) nullable: bool,
    pub(crate) scale: Option<i64>,
}

impl SnowflakeColumn {
    pub fn new(name: impl Into<String>, type_info: SnowflakeTypeInfo, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            type_info,
            ordinal,
            nullable: true,
            scale: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn scale(mut self, scale: i64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_info(&self) -> &SnowflakeTypeInfo {
        &self.type_info
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Converts a value from the text protocol into JSON according to this column's type.
    ///
    /// Integers and floats become numbers, booleans become booleans and semi-structured
    /// values are parsed. Fixed-point numbers with a scale are kept as strings so no
    /// precision is lost. Anything that fails to parse is passed through as a string.
    pub fn decode(&self, raw: Option<String>) -> Value {
        let Some(raw) = raw else {
            return Value::Null;
        };

        let decoded = match self.type_info.r#type() {
            SnowflakeType::Fixed if self.scale.unwrap_or(0) == 0 => {
                raw.parse::<i64>().ok().map(Value::from)
            }
            SnowflakeType::Real => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            SnowflakeType::Boolean => match raw.as_str() {
                "true" | "TRUE" | "1" => Some(Value::Bool(true)),
                "false" | "FALSE" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            ty if ty.is_semi_structured() => serde_json::from_str(&raw).ok(),
            _ => None,
        };

        decoded.unwrap_or(Value::String(raw))
    }
}
