//! Row decoder
//!
//! Turns positional, untyped rows into name -> string mappings. Typed
//! interpretation of the values happens later, in [`crate::projection`].

use serde_json::{Map, Value};

use crate::types::{Cell, QueryResult, Table};
use crate::{InsightsError, Result};

/// Column whose value is a nested JSON object flattened into the row
pub const CUSTOM_DIMENSIONS_COLUMN: &str = "customDimensions";

/// App/device metadata carried in the `customDimensions` column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomDimensions {
    pub app_build_number: Option<String>,
    pub app_version: Option<String>,
    pub language: Option<String>,
    pub stack_trace: Option<String>,
    pub manufacturer: Option<String>,
}

impl CustomDimensions {
    /// Keys emitted into a decoded row, in emission order
    pub const FIELDS: [&'static str; 5] = [
        "AppBuildNumber",
        "AppVersion",
        "Language",
        "StackTrace",
        "Manufacturer",
    ];

    /// Read the payload from a cell holding either JSON text or an inline object.
    /// Null and blank payloads carry no dimensions.
    pub fn from_cell(cell: Cell) -> Result<Self> {
        let payload = match cell {
            Cell::Null => return Ok(Self::default()),
            Cell::String(text) if text.trim().is_empty() => return Ok(Self::default()),
            Cell::String(text) => serde_json::from_str::<Value>(&text).map_err(|e| {
                InsightsError::Decode(format!("Malformed customDimensions payload: {}", e))
            })?,
            Cell::Nested(value) => value,
            other => {
                return Err(InsightsError::Decode(format!(
                    "customDimensions must be a JSON object, got {:?}",
                    other
                )))
            }
        };

        match payload {
            Value::Object(map) => Ok(Self::from_map(&map)),
            Value::Null => Ok(Self::default()),
            other => Err(InsightsError::Decode(format!(
                "customDimensions must be a JSON object, got {}",
                other
            ))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            app_build_number: lookup(map, "AppBuildNumber"),
            app_version: lookup(map, "AppVersion"),
            language: lookup(map, "Language"),
            stack_trace: lookup(map, "StackTrace"),
            manufacturer: lookup(map, "Manufacturer"),
        }
    }

    fn into_entries(self) -> [(&'static str, Option<String>); 5] {
        [
            ("AppBuildNumber", self.app_build_number),
            ("AppVersion", self.app_version),
            ("Language", self.language),
            ("StackTrace", self.stack_trace),
            ("Manufacturer", self.manufacturer),
        ]
    }
}

fn lookup(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .and_then(|(_, value)| Cell::from(value).into_text())
}

/// One decoded row. Keys are unique, compared case-insensitively, and keep
/// column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedRow {
    fields: Vec<(String, Option<String>)>,
}

impl DecodedRow {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Add a field, failing if the key is already present
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(InsightsError::Decode(format!("Duplicate field '{}' in row", name)));
        }
        self.fields.push((name, value));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Value of a field; `None` when absent or null
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn first(&self) -> Option<(&str, Option<&str>)> {
        self.fields
            .first()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn last(&self) -> Option<(&str, Option<&str>)> {
        self.fields
            .last()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decode one row against its table's column schema
pub fn decode_row(table: &Table, row: &[Value]) -> Result<DecodedRow> {
    if row.len() != table.columns.len() {
        return Err(InsightsError::Decode(format!(
            "Row has {} values but table has {} columns",
            row.len(),
            table.columns.len()
        )));
    }

    let mut decoded = DecodedRow::with_capacity(row.len() + CustomDimensions::FIELDS.len());

    for (column, value) in table.columns.iter().zip(row) {
        let cell = Cell::from(value);

        if column.name.eq_ignore_ascii_case(CUSTOM_DIMENSIONS_COLUMN) {
            for (name, value) in CustomDimensions::from_cell(cell)?.into_entries() {
                decoded.insert(name, value)?;
            }
        } else {
            decoded.insert(column.name.clone(), cell.into_text())?;
        }
    }

    Ok(decoded)
}

/// Decode every row of a table
pub fn decode_table(table: &Table) -> Result<Vec<DecodedRow>> {
    table.rows.iter().map(|row| decode_row(table, row)).collect()
}

/// Decode the primary table of a query result
pub fn decode_result(result: &QueryResult) -> Result<Vec<DecodedRow>> {
    decode_table(result.primary_table()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use serde_json::json;

    fn exceptions_table(dimensions: Value) -> Table {
        Table {
            name: Some("PrimaryResult".to_string()),
            columns: vec![
                Column::new("timestamp", "datetime"),
                Column::new("user_Id", "string"),
                Column::new("customDimensions", "dynamic"),
                Column::new("itemCount", "int"),
            ],
            rows: vec![vec![json!("2024-01-01T10:00:00Z"), json!("u1"), dimensions, json!(1)]],
        }
    }

    #[test]
    fn test_custom_dimensions_flattened() {
        let payload = json!({
            "AppBuildNumber": "42",
            "AppVersion": "1.2.0",
            "Language": "en-US",
            "StackTrace": "at Main()",
            "Manufacturer": "Google",
            "IsCrash": "true"
        })
        .to_string();
        let table = exceptions_table(json!(payload));

        let row = decode_row(&table, &table.rows[0]).unwrap();

        assert!(!row.contains("customDimensions"));
        assert!(!row.contains("IsCrash"));
        assert_eq!(row.len(), 3 + CustomDimensions::FIELDS.len());
        assert_eq!(row.get("AppBuildNumber"), Some("42"));
        assert_eq!(row.get("AppVersion"), Some("1.2.0"));
        assert_eq!(row.get("Language"), Some("en-US"));
        assert_eq!(row.get("StackTrace"), Some("at Main()"));
        assert_eq!(row.get("Manufacturer"), Some("Google"));
    }

    #[test]
    fn test_custom_dimensions_case_insensitive() {
        let mut table = exceptions_table(json!(r#"{"appversion":"2.0","MANUFACTURER":"Apple"}"#));
        table.columns[2] = Column::new("CustomDimensions", "dynamic");

        let row = decode_row(&table, &table.rows[0]).unwrap();

        assert_eq!(row.get("AppVersion"), Some("2.0"));
        assert_eq!(row.get("Manufacturer"), Some("Apple"));
        assert_eq!(row.get("Language"), None);
        assert!(row.contains("Language"));
    }

    #[test]
    fn test_inline_object_and_null_dimensions() {
        let inline = exceptions_table(json!({"AppVersion": "3.1", "AppBuildNumber": 7}));
        let row = decode_row(&inline, &inline.rows[0]).unwrap();
        assert_eq!(row.get("AppVersion"), Some("3.1"));
        assert_eq!(row.get("AppBuildNumber"), Some("7"));

        let null = exceptions_table(Value::Null);
        let row = decode_row(&null, &null.rows[0]).unwrap();
        for field in CustomDimensions::FIELDS {
            assert!(row.contains(field));
            assert_eq!(row.get(field), None);
        }
    }

    #[test]
    fn test_malformed_dimensions_is_decode_error() {
        let table = exceptions_table(json!("{\"AppVersion\": "));
        let err = decode_row(&table, &table.rows[0]).unwrap_err();
        assert!(matches!(err, InsightsError::Decode(_)));

        let table = exceptions_table(json!("[1, 2]"));
        assert!(matches!(
            decode_row(&table, &table.rows[0]),
            Err(InsightsError::Decode(_))
        ));
    }

    #[test]
    fn test_flattened_key_collision_rejected() {
        let table = Table {
            name: None,
            columns: vec![
                Column::new("AppVersion", "string"),
                Column::new("customDimensions", "dynamic"),
            ],
            rows: vec![vec![json!("1.0"), json!(r#"{"AppVersion":"2.0"}"#)]],
        };

        let err = decode_row(&table, &table.rows[0]).unwrap_err();
        assert!(err.to_string().contains("AppVersion"));
    }

    #[test]
    fn test_row_length_mismatch_rejected() {
        let table = exceptions_table(Value::Null);
        let short = vec![json!("2024-01-01T10:00:00Z")];
        assert!(matches!(
            decode_row(&table, &short),
            Err(InsightsError::Decode(_))
        ));
    }

    #[test]
    fn test_values_are_strings_or_null() {
        let table = Table {
            name: None,
            columns: vec![
                Column::new("count_sum", "long"),
                Column::new("ratio", "real"),
                Column::new("flag", "bool"),
                Column::new("missing", "string"),
                Column::new("details", "dynamic"),
            ],
            rows: vec![vec![
                json!(12),
                json!(0.5),
                json!(true),
                Value::Null,
                json!([{"line": 3}]),
            ]],
        };

        let row = decode_row(&table, &table.rows[0]).unwrap();

        assert_eq!(row.get("count_sum"), Some("12"));
        assert_eq!(row.get("ratio"), Some("0.5"));
        assert_eq!(row.get("flag"), Some("true"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get("details"), Some(r#"[{"line":3}]"#));
        assert_eq!(row.first(), Some(("count_sum", Some("12"))));
        assert_eq!(row.last().map(|(k, _)| k), Some("details"));
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let table = exceptions_table(json!(r#"{"AppVersion":"1.0"}"#));
        let result = QueryResult {
            tables: vec![table],
        };

        let first = decode_result(&result).unwrap();
        let second = decode_result(&result).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_result_has_no_primary_table() {
        let result = QueryResult::default();
        assert!(matches!(
            decode_result(&result),
            Err(InsightsError::Decode(_))
        ));
    }

    #[test]
    fn test_only_first_table_is_decoded() {
        let body = json!({
            "tables": [
                {
                    "name": "PrimaryResult",
                    "columns": [{"name": "problemId", "type": "string"}],
                    "rows": [["A"], ["B"]]
                },
                {
                    "name": "ExtendedProperties",
                    "columns": [{"name": "Value", "type": "string"}],
                    "rows": [["ignored"]]
                }
            ]
        })
        .to_string();

        let result = QueryResult::from_json(&body).unwrap();
        let rows = decode_result(&result).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("problemid"), Some("B"));
    }

    #[test]
    fn test_pascal_case_wire_shape_accepted() {
        let body = r#"{"Tables":[{"Columns":[{"Name":"key","Type":"string"}],"Rows":[["x"]]}]}"#;
        let result = QueryResult::from_json(body).unwrap();
        assert_eq!(result.tables[0].columns[0].column_type, "string");

        assert!(matches!(
            QueryResult::from_json("not json"),
            Err(InsightsError::Decode(_))
        ));
    }

    #[test]
    fn test_wire_names_match_in_any_case() {
        let body = r#"{"TABLES":[{"NAME":"PrimaryResult","COLUMNS":[{"NAME":"customDimensions","TYPE":"dynamic"}],"ROWS":[[{"AppVersion":"2.0"}]]}]}"#;
        let result = QueryResult::from_json(body).unwrap();

        let table = result.primary_table().unwrap();
        assert_eq!(table.name.as_deref(), Some("PrimaryResult"));
        assert_eq!(table.columns[0].name, "customDimensions");
        assert_eq!(table.columns[0].column_type, "dynamic");
        // Cell contents keep their own casing
        assert_eq!(table.rows[0][0]["AppVersion"], "2.0");

        let rows = decode_result(&result).unwrap();
        assert_eq!(rows[0].get("AppVersion"), Some("2.0"));
    }
}
