//! Alert records handed to forwarding tools.
//!
//! Tools only ever read alerts through [`AlertFields`], so the upstream
//! pipeline can plug in its own representation. [`Alert`] is the concrete
//! ordered record used by the CLI driver, parsed from one JSON object per
//! input line.

use serde_json::{Map, Value};

/// Field-extraction capability exposed by an alert.
pub trait AlertFields: Send + Sync {
    /// Values for the requested field names, in request order.
    ///
    /// Missing fields yield an empty string so the result always has the
    /// same length as `names`.
    fn fields(&self, names: &[String]) -> Vec<String>;

    /// Every `(name, value)` pair in the alert's own order.
    ///
    /// When `include_empty` is false, pairs with an empty value are skipped.
    fn all_fields(&self, include_empty: bool) -> Vec<(String, String)>;
}

/// An alert as an ordered list of named string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alert {
    fields: Vec<(String, String)>,
}

impl Alert {
    /// Build an alert from ordered `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a single JSON object line into an alert, keeping key order.
    ///
    /// # Errors
    ///
    /// Returns an error when the line is not valid JSON or is not an object.
    pub fn from_json_line(line: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        match value {
            Value::Object(map) => Ok(Self::from_json_map(map)),
            other => anyhow::bail!("expected a JSON object, got {}", json_kind(&other)),
        }
    }

    fn from_json_map(map: Map<String, Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, render_value(v)))
                .collect(),
        }
    }

    /// Look up one field by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of fields carried by the alert.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the alert carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl AlertFields for Alert {
    fn fields(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .map(|name| self.get(name).unwrap_or_default().to_owned())
            .collect()
    }

    fn all_fields(&self, include_empty: bool) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|(_, v)| include_empty || !v.is_empty())
            .cloned()
            .collect()
    }
}

fn render_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
