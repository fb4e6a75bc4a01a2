use std::fmt::{self, Display};

/// Type information for a Snowflake column.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SnowflakeTypeInfo(pub(crate) SnowflakeType);

/// The Snowflake data types, as reported in result set metadata.
///
/// SQL-level aliases collapse onto the logical type they are stored as, e.g. `INTEGER`
/// and `DECIMAL(10, 2)` are both [`Fixed`](SnowflakeType::Fixed).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SnowflakeType {
    // Numeric types
    Fixed,
    Real,

    // String and binary types
    Text,
    Binary,

    Boolean,

    // Date/Time types
    Date,
    Time,
    TimestampLtz,
    TimestampNtz,
    TimestampTz,

    // Semi-structured types
    Variant,
    Object,
    Array,

    // Geospatial types
    Geography,
    Geometry,

    Vector,
}

impl SnowflakeTypeInfo {
    pub fn new(ty: SnowflakeType) -> Self {
        Self(ty)
    }

    pub fn r#type(&self) -> SnowflakeType {
        self.0
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl Display for SnowflakeTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SnowflakeType {
    pub fn name(&self) -> &'static str {
        match self {
            SnowflakeType::Fixed => "FIXED",
            SnowflakeType::Real => "REAL",
            SnowflakeType::Text => "TEXT",
            SnowflakeType::Binary => "BINARY",
            SnowflakeType::Boolean => "BOOLEAN",
            SnowflakeType::Date => "DATE",
            SnowflakeType::Time => "TIME",
            SnowflakeType::TimestampLtz => "TIMESTAMP_LTZ",
            SnowflakeType::TimestampNtz => "TIMESTAMP_NTZ",
            SnowflakeType::TimestampTz => "TIMESTAMP_TZ",
            SnowflakeType::Variant => "VARIANT",
            SnowflakeType::Object => "OBJECT",
            SnowflakeType::Array => "ARRAY",
            SnowflakeType::Geography => "GEOGRAPHY",
            SnowflakeType::Geometry => "GEOMETRY",
            SnowflakeType::Vector => "VECTOR",
        }
    }

    /// Parses a type name from result set metadata or a SQL type alias, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "FIXED" | "NUMBER" | "DECIMAL" | "NUMERIC" | "INT" | "INTEGER" | "BIGINT"
            | "SMALLINT" | "TINYINT" | "BYTEINT" => Some(SnowflakeType::Fixed),
            "REAL" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" => {
                Some(SnowflakeType::Real)
            }
            "TEXT" | "VARCHAR" | "CHAR" | "CHARACTER" | "STRING" => Some(SnowflakeType::Text),
            "BINARY" | "VARBINARY" => Some(SnowflakeType::Binary),
            "BOOLEAN" => Some(SnowflakeType::Boolean),
            "DATE" => Some(SnowflakeType::Date),
            "TIME" => Some(SnowflakeType::Time),
            "TIMESTAMP_LTZ" => Some(SnowflakeType::TimestampLtz),
            "TIMESTAMP_NTZ" | "TIMESTAMP" | "DATETIME" => Some(SnowflakeType::TimestampNtz),
            "TIMESTAMP_TZ" => Some(SnowflakeType::TimestampTz),
            "VARIANT" => Some(SnowflakeType::Variant),
            "OBJECT" => Some(SnowflakeType::Object),
            "ARRAY" => Some(SnowflakeType::Array),
            "GEOGRAPHY" => Some(SnowflakeType::Geography),
            "GEOMETRY" => Some(SnowflakeType::Geometry),
            "VECTOR" => Some(SnowflakeType::Vector),
            _ => None,
        }
    }

    /// Whether values of this type arrive as JSON documents.
    pub fn is_semi_structured(&self) -> bool {
        matches!(
            self,
            SnowflakeType::Variant | SnowflakeType::Object | SnowflakeType::Array
        )
    }
}
