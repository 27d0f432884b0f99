use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::schema::{ColumnDescriptor, SqlType};

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const BIND_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-call coercion configuration. Threaded through every call; there is no
/// process-wide formatting state.
#[derive(Debug, Clone, Default)]
pub struct CoerceOptions {
    /// When set, a cell textually equal to this marker coerces to an empty
    /// string instead of NULL. Only meaningful for character columns.
    pub empty_string_sentinel: Option<String>,
    /// Overrides the default timestamp parsers when set.
    pub timestamp_format: Option<String>,
}

#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("cannot read {raw:?} as an integer: {reason}")]
    Integer { raw: String, reason: String },
    #[error("cannot read {raw:?} as a decimal: {reason}")]
    Decimal { raw: String, reason: String },
    #[error("cannot read {raw:?} as a boolean; expected one of true, y, 1, false, n, 0")]
    Boolean { raw: String },
    #[error("cannot read {raw:?} as a date or timestamp")]
    Timestamp { raw: String },
    #[error("cannot read {raw:?} with timestamp format {format:?}")]
    TimestampFormat { raw: String, format: String },
}

/// A coerced cell, ready to bind as an insert parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlValue::Null => Ok(ToSqlOutput::Owned(Value::Null)),
            SqlValue::Text(text) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes()))),
            SqlValue::Integer(value) => Ok(ToSqlOutput::Owned(Value::Integer(*value))),
            SqlValue::Decimal(value) => Ok(ToSqlOutput::Owned(Value::Text(value.to_string()))),
            SqlValue::Boolean(value) => Ok(ToSqlOutput::Owned(Value::Integer(i64::from(*value)))),
            SqlValue::Date(value) => Ok(ToSqlOutput::Owned(Value::Text(
                value.format(DATE_FORMAT).to_string(),
            ))),
            SqlValue::Timestamp(value) => Ok(ToSqlOutput::Owned(Value::Text(
                value.format(BIND_TIMESTAMP_FORMAT).to_string(),
            ))),
        }
    }
}

/// Convert one raw text cell into a typed value for `column`.
///
/// Empty or whitespace-only text becomes NULL unless the configured
/// empty-string sentinel matches the cell exactly, in which case character
/// columns receive an empty string.
pub fn coerce(
    column: &ColumnDescriptor,
    raw: &str,
    options: &CoerceOptions,
) -> Result<SqlValue, CoerceError> {
    if let Some(sentinel) = &options.empty_string_sentinel {
        if raw == sentinel && column.sql_type.is_character() {
            return Ok(SqlValue::Text(String::new()));
        }
    }
    if raw.trim().is_empty() {
        return Ok(SqlValue::Null);
    }

    match column.sql_type {
        SqlType::Char | SqlType::Varchar => Ok(SqlValue::Text(raw.to_string())),
        SqlType::Integer | SqlType::SmallInt | SqlType::BigInt => coerce_integer(raw),
        SqlType::Decimal => coerce_decimal(raw),
        SqlType::Boolean => coerce_boolean(raw),
        SqlType::Date => Ok(SqlValue::Date(parse_timestamp(raw, options)?.date())),
        SqlType::Timestamp => Ok(SqlValue::Timestamp(parse_timestamp(raw, options)?)),
    }
}

/// Strip thousands separators and a leading currency `$`; a value wrapped in
/// parentheses is negative, e.g. `(123)` reads as `-123`.
fn normalize_numeric(raw: &str) -> (String, bool) {
    let mut text = raw.trim().replace(',', "");
    if let Some(rest) = text.strip_prefix('$') {
        text = rest.trim_start().to_string();
    }
    let mut negative = false;
    if text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = text[1..text.len() - 1].trim().to_string();
        if let Some(rest) = text.strip_prefix('$') {
            text = rest.trim_start().to_string();
        }
    }
    (text, negative)
}

fn coerce_integer(raw: &str) -> Result<SqlValue, CoerceError> {
    let (text, negative) = normalize_numeric(raw);
    let parsed: i64 = text.parse().map_err(|err: std::num::ParseIntError| {
        CoerceError::Integer {
            raw: raw.to_string(),
            reason: err.to_string(),
        }
    })?;
    Ok(SqlValue::Integer(if negative { -parsed } else { parsed }))
}

fn coerce_decimal(raw: &str) -> Result<SqlValue, CoerceError> {
    let (text, negative) = normalize_numeric(raw);
    let parsed = Decimal::from_str(&text).map_err(|err| CoerceError::Decimal {
        raw: raw.to_string(),
        reason: err.to_string(),
    })?;
    let signed = if negative { -parsed } else { parsed };
    Ok(SqlValue::Decimal(signed.normalize()))
}

fn coerce_boolean(raw: &str) -> Result<SqlValue, CoerceError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "y" | "1" => Ok(SqlValue::Boolean(true)),
        "false" | "n" | "0" => Ok(SqlValue::Boolean(false)),
        _ => Err(CoerceError::Boolean {
            raw: raw.to_string(),
        }),
    }
}

/// `YYYY.MM.DD` is accepted alongside `YYYY-MM-DD`; the dotted form is
/// normalized before parsing. A bare date gets a midnight time component.
fn parse_timestamp(raw: &str, options: &CoerceOptions) -> Result<NaiveDateTime, CoerceError> {
    let trimmed = raw.trim();

    if let Some(format) = &options.timestamp_format {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
        return Err(CoerceError::TimestampFormat {
            raw: raw.to_string(),
            format: format.clone(),
        });
    }

    let normalized = normalize_date_separators(trimmed);
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(CoerceError::Timestamp {
        raw: raw.to_string(),
    })
}

/// Rewrite dots to dashes in the date part only, leaving any time part (and
/// its fractional seconds) untouched.
fn normalize_date_separators(text: &str) -> String {
    let split = text.find(|ch: char| ch == ' ' || ch == 'T');
    let (date_part, time_part) = match split {
        Some(idx) => text.split_at(idx),
        None => (text, ""),
    };
    if date_part.contains('.') && !date_part.contains('-') {
        format!("{}{}", date_part.replace('.', "-"), time_part)
    } else {
        text.to_string()
    }
}
