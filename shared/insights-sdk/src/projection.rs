//! Typed projection of decoded rows into report records

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::decode::DecodedRow;
use crate::types::{CountPerDay, CountPerKey, ErrorDetails, ErrorItem, EventItem, EventType};
use crate::{InsightsError, Result};

/// Which decoded field a count projection reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    First,
    Last,
    Named(String),
}

impl ColumnRef {
    fn resolve<'a>(&'a self, row: &'a DecodedRow) -> Result<(&'a str, Option<&'a str>)> {
        match self {
            ColumnRef::First => row
                .first()
                .ok_or_else(|| InsightsError::MissingField("first column".to_string())),
            ColumnRef::Last => row
                .last()
                .ok_or_else(|| InsightsError::MissingField("last column".to_string())),
            ColumnRef::Named(name) if row.contains(name) => Ok((name.as_str(), row.get(name))),
            ColumnRef::Named(name) => Err(InsightsError::MissingField(name.clone())),
        }
    }
}

/// Bucket key and count bindings for count reports.
/// Defaults to the first column as key and the last as count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountColumns {
    pub key: ColumnRef,
    pub count: ColumnRef,
}

impl Default for CountColumns {
    fn default() -> Self {
        Self {
            key: ColumnRef::First,
            count: ColumnRef::Last,
        }
    }
}

impl CountColumns {
    pub fn named(key: &str, count: &str) -> Self {
        Self {
            key: ColumnRef::Named(key.to_string()),
            count: ColumnRef::Named(count.to_string()),
        }
    }
}

/// Parse a timestamp as returned by the store. Values without an offset
/// are taken as UTC.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| InsightsError::parse(field, value, "invalid date")),
        Err(e) => Err(InsightsError::parse(field, value, e)),
    }
}

fn parse_count(field: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| InsightsError::parse(field, value, e))
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| InsightsError::MissingField(field.to_string()))
}

fn text(row: &DecodedRow, field: &str) -> Option<String> {
    row.get(field).map(str::to_string)
}

fn timestamp(row: &DecodedRow) -> Result<DateTime<Utc>> {
    let value = required("timestamp", row.get("timestamp"))?;
    parse_timestamp("timestamp", value)
}

/// Count per calendar day. The key is read as a timestamp and its time of
/// day discarded.
pub fn project_count_per_day(rows: &[DecodedRow], columns: &CountColumns) -> Result<Vec<CountPerDay>> {
    rows.iter()
        .map(|row| {
            let (key_field, key) = columns.key.resolve(row)?;
            let (count_field, count) = columns.count.resolve(row)?;

            let date = parse_timestamp(key_field, required(key_field, key)?)?.date_naive();
            let count = parse_count(count_field, required(count_field, count)?)?;

            Ok(CountPerDay { date, count })
        })
        .collect()
}

/// Count per free-text group key. A null key becomes the empty string.
pub fn project_count_per_key(rows: &[DecodedRow], columns: &CountColumns) -> Result<Vec<CountPerKey>> {
    rows.iter()
        .map(|row| {
            let (_, key) = columns.key.resolve(row)?;
            let (count_field, count) = columns.count.resolve(row)?;

            Ok(CountPerKey {
                key: key.unwrap_or_default().to_string(),
                count: parse_count(count_field, required(count_field, count)?)?,
            })
        })
        .collect()
}

impl ErrorItem {
    pub fn from_row(row: &DecodedRow) -> Result<Self> {
        let severity_level = row
            .get("severityLevel")
            .map(|value| {
                value
                    .trim()
                    .parse::<i32>()
                    .map_err(|e| InsightsError::parse("severityLevel", value, e))
            })
            .transpose()?;

        Ok(Self {
            timestamp: timestamp(row)?,
            item_id: text(row, "itemId"),
            problem_id: text(row, "problemId"),
            exception_type: text(row, "type"),
            outer_type: text(row, "outerType"),
            outer_message: text(row, "outerMessage"),
            outer_method: text(row, "outerMethod"),
            innermost_message: text(row, "innermostMessage"),
            severity_level,
            operation_name: text(row, "operation_Name"),
            user_id: text(row, "user_Id"),
            session_id: text(row, "session_Id"),
            client_type: text(row, "client_Type"),
            client_os: text(row, "client_OS"),
            client_model: text(row, "client_Model"),
            client_country: text(row, "client_CountryOrRegion"),
            app_version: text(row, "AppVersion").or_else(|| text(row, "application_Version")),
            app_build_number: text(row, "AppBuildNumber"),
            language: text(row, "Language"),
            manufacturer: text(row, "Manufacturer"),
            stack_trace: text(row, "StackTrace"),
        })
    }
}

/// Distinct non-null values in first-seen order
fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .flatten()
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}

impl ErrorDetails {
    /// Build the aggregate from the complete item list
    pub fn from_items(items: Vec<ErrorItem>) -> Self {
        let affected_users_count = distinct(items.iter().map(|i| i.user_id.as_deref())).len();
        let affected_app_versions = distinct(items.iter().map(|i| i.app_version.as_deref()));
        let affected_operating_systems = distinct(items.iter().map(|i| i.client_os.as_deref()));

        Self {
            items,
            affected_users_count,
            affected_app_versions,
            affected_operating_systems,
        }
    }
}

/// One `ErrorItem` per row, then the aggregate fields
pub fn project_error_details(rows: &[DecodedRow]) -> Result<ErrorDetails> {
    let items = rows
        .iter()
        .map(ErrorItem::from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(ErrorDetails::from_items(items))
}

impl EventItem {
    pub fn from_row(row: &DecodedRow, event_type: EventType) -> Result<Self> {
        Ok(Self {
            event_type,
            timestamp: timestamp(row)?,
            item_id: text(row, "itemId"),
            name: text(row, "name"),
            url: text(row, "url"),
            operation_name: text(row, "operation_Name"),
            problem_id: text(row, "problemId"),
            message: text(row, "outerMessage"),
            session_id: text(row, "session_Id"),
            client_os: text(row, "client_OS"),
            app_version: text(row, "AppVersion").or_else(|| text(row, "application_Version")),
        })
    }
}

/// Timeline events, all tagged with the category of the source query
pub fn project_events(rows: &[DecodedRow], event_type: EventType) -> Result<Vec<EventItem>> {
    rows.iter()
        .map(|row| EventItem::from_row(row, event_type))
        .collect()
}
