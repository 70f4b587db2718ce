//! Upload ingestion: CSV and XLSX bytes into a table.

use crate::error::{Result, TableTalkError};
use crate::table::{datetime_series, parse_datetime_millis};
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use polars::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

/// File formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Detect the format from the file name's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Anything other than `.csv` or `.xlsx` is rejected before parsing.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(TableTalkError::Ingest(format!(
                "Unsupported file format for '{filename}': upload a .csv or .xlsx file"
            ))),
        }
    }
}

/// Parse uploaded bytes into a table.
///
/// # Errors
///
/// Returns [`TableTalkError::Ingest`] for unsupported extensions, unparseable
/// content and files without any data rows.
pub fn load(bytes: &[u8], filename: &str) -> Result<DataFrame> {
    let format = SourceFormat::from_filename(filename)?;

    let df = match format {
        SourceFormat::Csv => read_csv(bytes)?,
        SourceFormat::Xlsx => read_xlsx(bytes)?,
    };
    let df = normalize_temporal_columns(df)?;

    if df.width() == 0 || df.height() == 0 {
        return Err(TableTalkError::Ingest(format!(
            "'{filename}' does not contain any data rows"
        )));
    }

    tracing::info!(
        file = filename,
        rows = df.height(),
        columns = df.width(),
        "Loaded dataset"
    );
    Ok(df)
}

fn read_csv(bytes: &[u8]) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .map_parse_options(|opts| opts.with_try_parse_dates(true))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| TableTalkError::Ingest(format!("Could not parse CSV: {e}")))
}

/// Store every date or datetime column at millisecond precision.
fn normalize_temporal_columns(mut df: DataFrame) -> Result<DataFrame> {
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);
    let temporal: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| {
            matches!(c.dtype(), DataType::Date | DataType::Datetime(_, _)) && c.dtype() != &target
        })
        .map(|c| c.name().clone())
        .collect();

    for name in temporal {
        let cast = df
            .column(name.as_str())?
            .as_materialized_series()
            .cast(&target)?;
        df.with_column(cast)?;
    }
    Ok(df)
}

fn read_xlsx(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| TableTalkError::Ingest(format!("Could not open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableTalkError::Ingest("Workbook has no worksheets".to_owned()))?
        .map_err(|e| TableTalkError::Ingest(format!("Could not read first worksheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(TableTalkError::Ingest("Worksheet is empty".to_owned()));
    };
    let headers = read_headers(header_row)?;

    let mut cells: Vec<Vec<Data>> = vec![Vec::with_capacity(range.height()); headers.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).cloned().unwrap_or(Data::Empty));
        }
    }

    let columns = headers
        .iter()
        .zip(&cells)
        .map(|(name, column)| column_from_cells(name, column).map(Column::from))
        .collect::<Result<Vec<_>>>()?;

    Ok(DataFrame::new(columns)?)
}

fn read_headers(row: &[Data]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut headers = Vec::with_capacity(row.len());
    for (i, cell) in row.iter().enumerate() {
        let name = cell_text(cell).unwrap_or_default().trim().to_owned();
        if name.is_empty() {
            return Err(TableTalkError::Ingest(format!(
                "Header cell {} is blank",
                i + 1
            )));
        }
        if !seen.insert(name.clone()) {
            return Err(TableTalkError::Ingest(format!(
                "Duplicate column name '{name}'"
            )));
        }
        headers.push(name);
    }
    Ok(headers)
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    if is_blank(cell) {
        return None;
    }
    match cell {
        Data::String(s) => Some(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .or_else(|| Some(dt.as_f64().to_string())),
        other => Some(other.to_string()),
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) => Some(*v),
        _ => None,
    }
}

fn cell_millis(cell: &Data) -> Option<i64> {
    match cell {
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.and_utc().timestamp_millis()),
        Data::DateTimeIso(s) => parse_datetime_millis(s),
        _ => None,
    }
}

/// Build a typed column from raw cells.
///
/// All numbers become `int64` when every value is integral, else `float64`;
/// all booleans become `bool`; all dates become `datetime`; anything mixed is
/// read as text. Blank and error cells are missing values.
fn column_from_cells(name: &str, cells: &[Data]) -> Result<Series> {
    let present: Vec<&Data> = cells.iter().filter(|c| !is_blank(c)).collect();

    if !present.is_empty() {
        if present
            .iter()
            .all(|c| matches!(c, Data::Int(_) | Data::Float(_)))
        {
            let values: Vec<Option<f64>> = cells.iter().map(cell_number).collect();
            let integral = values
                .iter()
                .flatten()
                .all(|v| v.fract() == 0.0 && v.abs() < 9.0e15);
            if integral {
                let ints: Vec<Option<i64>> =
                    values.iter().map(|v| v.map(|x| x as i64)).collect();
                return Ok(Series::new(name.into(), ints));
            }
            return Ok(Series::new(name.into(), values));
        }

        if present.iter().all(|c| matches!(c, Data::Bool(_))) {
            let flags: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            return Ok(Series::new(name.into(), flags));
        }

        if present
            .iter()
            .all(|c| matches!(c, Data::DateTime(_) | Data::DateTimeIso(_)))
        {
            let millis: Vec<Option<i64>> = cells.iter().map(cell_millis).collect();
            let parsed = millis.iter().filter(|m| m.is_some()).count();
            if parsed == present.len() {
                return datetime_series(name, millis);
            }
        }
    }

    let text: Vec<Option<String>> = cells.iter().map(cell_text).collect();
    Ok(Series::new(name.into(), text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;

    #[test]
    fn test_extension_detection() {
        assert_eq!(
            SourceFormat::from_filename("sales.CSV").expect("csv"),
            SourceFormat::Csv
        );
        assert_eq!(
            SourceFormat::from_filename("book.xlsx").expect("xlsx"),
            SourceFormat::Xlsx
        );
        for bad in ["data.json", "archive.xls", "noextension"] {
            assert!(matches!(
                SourceFormat::from_filename(bad),
                Err(TableTalkError::Ingest(_))
            ));
        }
    }

    #[test]
    fn test_load_csv_infers_types() {
        let csv = b"name,age,score,joined\nAda,36,1.5,2024-01-02\nBob,,2.0,2024-02-03\n";
        let df = load(csv, "people.csv").expect("load");

        assert_eq!(df.shape(), (2, 4));
        let kind = |c: &str| {
            ColumnKind::from_dtype(df.column(c).expect("column").dtype())
        };
        assert_eq!(kind("name"), ColumnKind::Text);
        assert_eq!(kind("age"), ColumnKind::Integer);
        assert_eq!(kind("score"), ColumnKind::Float);
        assert_eq!(kind("joined"), ColumnKind::Datetime);
        assert_eq!(df.column("age").expect("age").null_count(), 1);
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let err = load(b"a,b\n", "empty.csv").unwrap_err();
        assert!(matches!(err, TableTalkError::Ingest(_)));
    }

    #[test]
    fn test_cells_to_columns() {
        let ints = column_from_cells("n", &[Data::Float(1.0), Data::Empty, Data::Int(3)])
            .expect("ints");
        assert_eq!(ints.dtype(), &DataType::Int64);
        assert_eq!(ints.null_count(), 1);

        let floats = column_from_cells("f", &[Data::Float(1.5), Data::Int(2)]).expect("floats");
        assert_eq!(floats.dtype(), &DataType::Float64);

        let flags = column_from_cells("b", &[Data::Bool(true), Data::Bool(false)]).expect("bool");
        assert_eq!(flags.dtype(), &DataType::Boolean);

        let mixed = column_from_cells("m", &[Data::Int(1), Data::String("x".to_owned())])
            .expect("text");
        assert_eq!(mixed.dtype(), &DataType::String);
    }

    #[test]
    fn test_headers_must_be_unique_and_named() {
        let dup = [Data::String("a".to_owned()), Data::String("a".to_owned())];
        assert!(read_headers(&dup).is_err());

        let blank = [Data::String("a".to_owned()), Data::Empty];
        assert!(read_headers(&blank).is_err());

        let ok = [Data::String(" a ".to_owned()), Data::Int(2)];
        assert_eq!(read_headers(&ok).expect("headers"), vec!["a", "2"]);
    }
}
