//! Table access helpers.
//!
//! A table is a polars [`DataFrame`]. The helpers here give the pipeline and the
//! exporters a uniform way to look up columns and to read cell values as
//! floats, text or epoch milliseconds without caring about the physical dtype.

pub mod summary;
pub mod types;

pub use summary::{CorrelationMatrix, NumericDescription, TableSummary, summarize};
pub use types::{ColumnKind, TargetType, category_dtype, dtype_label};

use crate::error::{Result, TableTalkError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Look up a column, reporting a precondition failure if it does not exist.
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_err| TableTalkError::OperationPrecondition(format!("column '{name}' does not exist")))
}

pub fn column_kind(series: &Series) -> ColumnKind {
    ColumnKind::from_dtype(series.dtype())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Cell values cast to `f64`; nulls (and values that do not cast) are `None`.
pub fn float_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Cell values rendered as text; nulls stay `None`.
pub fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    if ColumnKind::from_dtype(series.dtype()) == ColumnKind::Datetime {
        return Ok(datetime_millis(series)?
            .into_iter()
            .map(|v| v.and_then(format_millis))
            .collect());
    }
    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

/// Temporal cell values as milliseconds since the Unix epoch.
pub fn datetime_millis(series: &Series) -> Result<Vec<Option<i64>>> {
    let millis = series
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(millis.i64()?.into_iter().collect())
}

pub fn format_millis(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|dt| {
        let naive = dt.naive_utc();
        if naive.time() == chrono::NaiveTime::MIN {
            naive.format("%Y-%m-%d").to_string()
        } else {
            naive.format("%Y-%m-%d %H:%M:%S").to_string()
        }
    })
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"];

/// Parse a date or date-time string into epoch milliseconds.
///
/// Day-first is tried before month-first for slash-separated dates.
pub fn parse_datetime_millis(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

/// Build a millisecond datetime series from epoch values.
pub fn datetime_series(name: &str, millis: Vec<Option<i64>>) -> Result<Series> {
    Ok(Series::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

/// Render an `f64` the way descriptions show user-supplied numbers (`4`, `2.5`).
pub fn format_number(value: f64) -> String {
    format!("{value}")
}
