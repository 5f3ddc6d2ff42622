//! Query result and report types

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{InsightsError, Result};

/// One positional slot of a result table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
}

impl Column {
    pub fn new(name: &str, column_type: &str) -> Self {
        Self {
            name: name.to_string(),
            column_type: column_type.to_string(),
        }
    }
}

/// Result table: ordered columns and positional rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

/// Response body of the query endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl QueryResult {
    /// Parse a raw response body. Envelope, table and column field names
    /// match case-insensitively; row cells are left untouched.
    pub fn from_json(body: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(body)
            .map_err(|e| InsightsError::Decode(format!("Unexpected response shape: {}", e)))?;

        lowercase_keys(&mut value);
        if let Some(tables) = value.get_mut("tables").and_then(Value::as_array_mut) {
            for table in tables {
                lowercase_keys(table);
                if let Some(columns) = table.get_mut("columns").and_then(Value::as_array_mut) {
                    columns.iter_mut().for_each(lowercase_keys);
                }
            }
        }

        serde_json::from_value(value)
            .map_err(|e| InsightsError::Decode(format!("Unexpected response shape: {}", e)))
    }

    /// The table reports are built from. Any further tables are ignored.
    pub fn primary_table(&self) -> Result<&Table> {
        self.tables
            .first()
            .ok_or_else(|| InsightsError::Decode("Response contained no tables".to_string()))
    }
}

fn lowercase_keys(value: &mut Value) {
    if let Value::Object(map) = value {
        *map = std::mem::take(map)
            .into_iter()
            .map(|(key, v)| (key.to_ascii_lowercase(), v))
            .collect();
    }
}

/// A single untyped cell, classified at the decode boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Nested(Value),
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => Cell::Number(n.clone()),
            Value::String(s) => Cell::String(s.clone()),
            nested => Cell::Nested(nested.clone()),
        }
    }
}

impl Cell {
    /// String form carried in a decoded row; `None` for null
    pub fn into_text(self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::String(s) => Some(s),
            Cell::Nested(v) => Some(v.to_string()),
        }
    }
}

/// Timeline event category, one per source query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    PageView,
    CustomEvent,
    Error,
    Crash,
}

impl EventType {
    /// Emission order of the timeline fan-out
    pub const ALL: [EventType; 4] = [
        EventType::PageView,
        EventType::CustomEvent,
        EventType::Error,
        EventType::Crash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "PageView",
            EventType::CustomEvent => "CustomEvent",
            EventType::Error => "Error",
            EventType::Crash => "Crash",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count bucket per calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPerDay {
    pub date: NaiveDate,
    pub count: i64,
}

/// Count bucket per group key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPerKey {
    pub key: String,
    pub count: i64,
}

/// One raw exception occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorItem {
    pub timestamp: DateTime<Utc>,
    pub item_id: Option<String>,
    pub problem_id: Option<String>,
    pub exception_type: Option<String>,
    pub outer_type: Option<String>,
    pub outer_message: Option<String>,
    pub outer_method: Option<String>,
    pub innermost_message: Option<String>,
    pub severity_level: Option<i32>,
    pub operation_name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub client_type: Option<String>,
    pub client_os: Option<String>,
    pub client_model: Option<String>,
    pub client_country: Option<String>,
    pub app_version: Option<String>,
    pub app_build_number: Option<String>,
    pub language: Option<String>,
    pub manufacturer: Option<String>,
    pub stack_trace: Option<String>,
}

/// Aggregate over every occurrence of one error or crash signature
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub items: Vec<ErrorItem>,
    pub affected_users_count: usize,
    pub affected_app_versions: Vec<String>,
    pub affected_operating_systems: Vec<String>,
}

/// One entry of a user's activity timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub item_id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub operation_name: Option<String>,
    pub problem_id: Option<String>,
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub client_os: Option<String>,
    pub app_version: Option<String>,
}
