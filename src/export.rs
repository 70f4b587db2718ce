//! Serialization of the current table (and its history) for download.

use crate::error::{Result, TableTalkError};
use crate::pipeline::OperationLog;
use crate::table::{ColumnKind, column_kind, float_values, text_values};
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};

pub const DATA_SHEET: &str = "Data";
pub const HISTORY_SHEET: &str = "Transformation History";
pub const HISTORY_HEADER: &str = "Transformation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Download file name: the caller's stem plus the format extension.
pub fn file_name(stem: &str, format: ExportFormat) -> String {
    format!("{stem}.{}", format.extension())
}

/// Serialize in the requested format.
///
/// # Errors
///
/// See [`to_csv`] and [`to_spreadsheet`].
pub fn export(table: &DataFrame, log: &OperationLog, format: ExportFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(table)?,
        ExportFormat::Xlsx => to_spreadsheet(table, log)?,
    };
    tracing::info!(
        format = format.extension(),
        bytes = bytes.len(),
        rows = table.height(),
        "Exported table"
    );
    Ok(bytes)
}

/// Header row plus data rows, no index column.
///
/// # Errors
///
/// Fails if polars cannot serialize one of the columns.
pub fn to_csv(table: &DataFrame) -> Result<Vec<u8>> {
    let mut df = table.clone();
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)
        .map_err(|e| TableTalkError::Export(format!("Failed to write CSV: {e}")))?;
    Ok(buf)
}

/// Workbook with a `Data` sheet and, when `log` is non-empty, a
/// `Transformation History` sheet listing each description in order.
///
/// # Errors
///
/// Fails when the table exceeds the worksheet limits.
pub fn to_spreadsheet(table: &DataFrame, log: &OperationLog) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let data = workbook.add_worksheet();
    data.set_name(DATA_SHEET)?;
    for (index, column) in table.get_columns().iter().enumerate() {
        let col = sheet_col(index)?;
        data.write_string(0, col, column.name().as_str())?;
        write_column(data, col, column.as_materialized_series())?;
    }

    if !log.is_empty() {
        let history = workbook.add_worksheet();
        history.set_name(HISTORY_SHEET)?;
        history.write_string(0, 0, HISTORY_HEADER)?;
        for (index, description) in log.descriptions().enumerate() {
            history.write_string(sheet_row(index)?, 0, description)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Worksheet row for the `index`-th data value (row 0 is the header).
fn sheet_row(index: usize) -> Result<u32> {
    u32::try_from(index + 1)
        .map_err(|_err| TableTalkError::Export("too many rows for a worksheet".to_owned()))
}

fn sheet_col(index: usize) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_err| TableTalkError::Export("too many columns for a worksheet".to_owned()))
}

fn write_column(sheet: &mut Worksheet, col: u16, series: &Series) -> Result<()> {
    match column_kind(series) {
        ColumnKind::Integer | ColumnKind::Float => {
            for (index, value) in float_values(series)?.into_iter().enumerate() {
                if let Some(v) = value.filter(|v| v.is_finite()) {
                    sheet.write_number(sheet_row(index)?, col, v)?;
                }
            }
        }
        ColumnKind::Boolean => {
            for (index, value) in series.bool()?.into_iter().enumerate() {
                if let Some(v) = value {
                    sheet.write_boolean(sheet_row(index)?, col, v)?;
                }
            }
        }
        ColumnKind::Text | ColumnKind::Categorical | ColumnKind::Datetime | ColumnKind::Other => {
            for (index, value) in text_values(series)?.into_iter().enumerate() {
                if let Some(v) = value {
                    sheet.write_string(sheet_row(index)?, col, v)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_has_header_and_no_index() -> anyhow::Result<()> {
        let df = df!("a" => &[1, 2], "b" => &[Some("x"), None])?;
        let text = String::from_utf8(to_csv(&df)?)?;
        assert_eq!(text, "a,b\n1,x\n2,\n");
        Ok(())
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("report", ExportFormat::Csv), "report.csv");
        assert_eq!(file_name("report", ExportFormat::Xlsx), "report.xlsx");
    }

    #[test]
    fn test_spreadsheet_is_zip() -> anyhow::Result<()> {
        let df = df!("a" => &[1.5, 2.0], "flag" => &[true, false])?;
        let mut log = OperationLog::new();
        log.push("Sorted data by a in ascending order");

        let bytes = to_spreadsheet(&df, &log)?;
        assert!(bytes.starts_with(b"PK"), "xlsx files are zip archives");
        Ok(())
    }
}
