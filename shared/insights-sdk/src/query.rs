//! Query construction
//!
//! Every report issues one query string. Caller-supplied values are only
//! ever interpolated as quoted string literals or validated integers.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::types::EventType;
use crate::{InsightsError, Result};

const IS_CRASH: &str = "customDimensions.IsCrash == 'true'";
const IS_NOT_CRASH: &str = "customDimensions.IsCrash != 'true'";
const COUNT_PER_DAY: &str = "summarize count_sum = sum(itemCount) by bin(timestamp,1d)";
const CRASH_SIGNATURE: &str = "strcat(problemId, \" - \", outerMessage)";

/// Query text sent to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    query: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { query: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

/// Exception category, split on the `IsCrash` custom dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Error,
    Crash,
}

impl ExceptionKind {
    fn predicate(&self) -> &'static str {
        match self {
            ExceptionKind::Error => IS_NOT_CRASH,
            ExceptionKind::Crash => IS_CRASH,
        }
    }

    /// Grouping key expression for this category
    fn signature(&self) -> &'static str {
        match self {
            ExceptionKind::Error => "problemId",
            ExceptionKind::Crash => CRASH_SIGNATURE,
        }
    }
}

/// Closed time range `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// The hour leading up to `reference`
    pub fn hour_before(reference: DateTime<Utc>) -> Self {
        Self {
            from: reference - Duration::hours(1),
            to: reference,
        }
    }
}

/// Canonical UTC timestamp text
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Quote a value as a single-quoted string literal. Control characters are
/// rejected; backslashes and quotes are escaped.
pub fn quote(field: &str, value: &str) -> Result<String> {
    if value.chars().any(char::is_control) {
        return Err(InsightsError::InvalidParameter(format!(
            "{} contains control characters",
            field
        )));
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    Ok(quoted)
}

fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(InsightsError::InvalidParameter(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn lookback(days: u32) -> Result<String> {
    if days == 0 {
        return Err(InsightsError::InvalidParameter(
            "days must be at least 1".to_string(),
        ));
    }
    Ok(format!("timestamp > ago({}d)", days))
}

/// Daily exception counts over the lookback window
pub fn count_per_day(kind: ExceptionKind, days: u32) -> Result<Query> {
    Ok(Query::new(format!(
        "exceptions | where {} and {} | {}",
        kind.predicate(),
        lookback(days)?,
        COUNT_PER_DAY
    )))
}

/// Exception counts per signature over the lookback window
pub fn count_grouped(kind: ExceptionKind, days: u32) -> Result<Query> {
    Ok(Query::new(format!(
        "exceptions | where {} and {} | summarize count_sum = sum(itemCount) by {}",
        kind.predicate(),
        lookback(days)?,
        kind.signature()
    )))
}

/// Every occurrence of one signature over the lookback window
pub fn details(kind: ExceptionKind, id: &str, days: u32) -> Result<Query> {
    require_id("id", id)?;
    Ok(Query::new(format!(
        "exceptions | where {} and {} and {} == {}",
        kind.predicate(),
        lookback(days)?,
        kind.signature(),
        quote("id", id)?
    )))
}

/// One timeline category for a user inside a window
pub fn timeline(category: EventType, user_id: &str, window: &TimeWindow) -> Result<Query> {
    require_id("user_id", user_id)?;

    let (table, predicate) = match category {
        EventType::PageView => ("pageViews", None),
        EventType::CustomEvent => ("customEvents", None),
        EventType::Error => ("exceptions", Some(IS_NOT_CRASH)),
        EventType::Crash => ("exceptions", Some(IS_CRASH)),
    };

    let mut text = format!("{} | where user_Id == {}", table, quote("user_id", user_id)?);
    if let Some(predicate) = predicate {
        text.push_str(" and ");
        text.push_str(predicate);
    }
    text.push_str(&format!(
        " and timestamp between (todatetime('{}') .. todatetime('{}'))",
        format_timestamp(window.from),
        format_timestamp(window.to)
    ));

    Ok(Query::new(text))
}
