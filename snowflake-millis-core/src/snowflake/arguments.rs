use serde_json::{json, Map, Value};

/// Positional bind arguments for a Snowflake statement (`?` or `:1` placeholders).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SnowflakeArguments {
    pub(crate) values: Vec<Value>,
}

impl SnowflakeArguments {
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn add(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Renders the arguments as the `bindings` object of a SQL API request.
    ///
    /// The SQL API uses a text protocol: every value is sent as a string tagged with the
    /// Snowflake type it should be bound as.
    pub(crate) fn to_bindings(&self) -> Map<String, Value> {
        self.values
            .iter()
            .enumerate()
            .map(|(index, value)| ((index + 1).to_string(), binding(value)))
            .collect()
    }
}

fn binding(value: &Value) -> Value {
    let (ty, text) = match value {
        Value::Null => ("TEXT", None),
        Value::Bool(b) => ("BOOLEAN", Some(b.to_string())),
        Value::Number(n) if n.is_i64() || n.is_u64() => ("FIXED", Some(n.to_string())),
        Value::Number(n) => ("REAL", Some(n.to_string())),
        Value::String(s) => ("TEXT", Some(s.clone())),
        Value::Array(_) | Value::Object(_) => ("TEXT", Some(value.to_string())),
    };

    json!({ "type": ty, "value": text })
}

impl From<Vec<Value>> for SnowflakeArguments {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl<T: Into<Value>> FromIterator<T> for SnowflakeArguments {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(Into::into).collect(),
        }
    }
}
