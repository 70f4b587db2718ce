//! Table summary handed to the question-answering service.
//!
//! The summary is the only view of the data the language model ever sees:
//! shape, dtypes, `describe`-style statistics, a preview of the first rows,
//! missing-value counts, cardinality of text columns and a rounded
//! correlation matrix.

use super::types::{ColumnKind, dtype_label};
use super::{float_values, text_values};
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

/// Five-number-style statistics for one numeric column.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct NumericDescription {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Pearson coefficients rounded to 2 decimals; `None` where undefined.
    pub data: Vec<Vec<Option<f64>>>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TableSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnInfo>,
    pub numeric: Vec<NumericDescription>,
    pub preview: Vec<Vec<String>>,
    pub missing: Vec<(String, usize)>,
    pub unique_counts: Vec<(String, usize)>,
    pub correlation: Option<CorrelationMatrix>,
}

pub fn summarize(df: &DataFrame, preview_rows: usize) -> Result<TableSummary> {
    let mut columns = Vec::with_capacity(df.width());
    let mut numeric = Vec::new();
    let mut missing = Vec::with_capacity(df.width());
    let mut unique_counts = Vec::new();

    for col in df.get_columns() {
        let name = col.name().to_string();
        let series = col.as_materialized_series();
        let kind = ColumnKind::from_dtype(series.dtype());

        columns.push(ColumnInfo {
            name: name.clone(),
            dtype: dtype_label(series.dtype()),
        });
        missing.push((name.clone(), series.null_count()));

        if kind.is_numeric() {
            numeric.push(describe_numeric(&name, series)?);
        } else if kind.is_text_like() {
            let distinct: HashSet<String> = text_values(series)?.into_iter().flatten().collect();
            unique_counts.push((name, distinct.len()));
        }
    }

    let preview = preview_rows_of(df, preview_rows)?;
    let correlation = calculate_correlation_matrix(df)?;

    tracing::debug!(
        rows = df.height(),
        columns = df.width(),
        numeric = numeric.len(),
        "Built table summary"
    );

    Ok(TableSummary {
        row_count: df.height(),
        column_count: df.width(),
        columns,
        numeric,
        preview,
        missing,
        unique_counts,
        correlation,
    })
}

fn describe_numeric(name: &str, series: &Series) -> Result<NumericDescription> {
    let floats = series.cast(&DataType::Float64)?;
    let ca = floats.f64()?;

    Ok(NumericDescription {
        column: name.to_owned(),
        count: ca.len() - ca.null_count(),
        mean: ca.mean(),
        std: ca.std(1),
        min: ca.min(),
        q25: ca.quantile(0.25, QuantileMethod::Linear)?,
        median: ca.median(),
        q75: ca.quantile(0.75, QuantileMethod::Linear)?,
        max: ca.max(),
    })
}

fn preview_rows_of(df: &DataFrame, n: usize) -> Result<Vec<Vec<String>>> {
    let head = df.head(Some(n));
    let mut rendered_columns = Vec::with_capacity(head.width());
    for col in head.get_columns() {
        let cells: Vec<String> = text_values(col.as_materialized_series())?
            .into_iter()
            .map(|v| v.unwrap_or_else(|| "null".to_owned()))
            .collect();
        rendered_columns.push(cells);
    }

    Ok((0..head.height())
        .map(|row| {
            rendered_columns
                .iter()
                .map(|cells| cells.get(row).cloned().unwrap_or_default())
                .collect()
        })
        .collect())
}

/// Pairwise-complete Pearson correlation over every numeric column.
///
/// Returns `None` when the table has no numeric column.
pub fn calculate_correlation_matrix(df: &DataFrame) -> Result<Option<CorrelationMatrix>> {
    let mut names = Vec::new();
    let mut values = Vec::new();
    for col in df.get_columns() {
        let series = col.as_materialized_series();
        if ColumnKind::from_dtype(series.dtype()).is_numeric() {
            names.push(col.name().to_string());
            values.push(float_values(series)?);
        }
    }

    if names.is_empty() {
        return Ok(None);
    }

    let data = values
        .iter()
        .map(|a| {
            values
                .iter()
                .map(|b| pairwise_pearson(a, b).map(round2))
                .collect()
        })
        .collect();

    Ok(Some(CorrelationMatrix {
        columns: names,
        data,
    }))
}

fn pairwise_pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();

    if xs.len() < 2 {
        return None;
    }

    let xs = Float64Chunked::from_vec("x".into(), xs);
    let ys = Float64Chunked::from_vec("y".into(), ys);
    polars::prelude::cov::pearson_corr(&xs, &ys).filter(|r| r.is_finite())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn fmt_stat(value: Option<f64>) -> String {
    match value {
        Some(x) if x.is_finite() => format!("{x:.6}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned(),
        _ => "NaN".to_owned(),
    }
}

/// Left-aligned text grid with a header row.
fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }

    let render_row = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    let mut out = render_row(headers);
    for row in rows {
        out.push('\n');
        out.push_str(&render_row(row));
    }
    out
}

impl TableSummary {
    fn render_describe(&self) -> String {
        if self.numeric.is_empty() {
            return "No numeric columns to describe".to_owned();
        }
        let mut headers = vec![String::new()];
        headers.extend(self.numeric.iter().map(|d| d.column.clone()));

        let stat_rows: [(&str, fn(&NumericDescription) -> String); 8] = [
            ("count", |d| d.count.to_string()),
            ("mean", |d| fmt_stat(d.mean)),
            ("std", |d| fmt_stat(d.std)),
            ("min", |d| fmt_stat(d.min)),
            ("25%", |d| fmt_stat(d.q25)),
            ("50%", |d| fmt_stat(d.median)),
            ("75%", |d| fmt_stat(d.q75)),
            ("max", |d| fmt_stat(d.max)),
        ];

        let rows: Vec<Vec<String>> = stat_rows
            .iter()
            .map(|(label, stat)| {
                let mut row = vec![(*label).to_owned()];
                row.extend(self.numeric.iter().map(stat));
                row
            })
            .collect();

        render_grid(&headers, &rows)
    }

    fn render_correlation(&self, matrix: &CorrelationMatrix) -> String {
        let mut headers = vec![String::new()];
        headers.extend(matrix.columns.iter().cloned());
        let rows: Vec<Vec<String>> = matrix
            .columns
            .iter()
            .zip(&matrix.data)
            .map(|(name, values)| {
                let mut row = vec![name.clone()];
                row.extend(values.iter().map(|v| match v {
                    Some(r) => format!("{r:.2}"),
                    None => "NaN".to_owned(),
                }));
                row
            })
            .collect();
        render_grid(&headers, &rows)
    }

    /// Text block embedded in the question prompt.
    pub fn render(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let dtypes: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{}: {}", c.name, c.dtype))
            .collect();
        let missing: Vec<String> = self
            .missing
            .iter()
            .map(|(name, n)| format!("{name}: {n}"))
            .collect();

        let mut out = String::from("DataFrame Information:\n");
        let _ = writeln!(out, "- Shape: ({}, {})", self.row_count, self.column_count);
        let _ = writeln!(out, "- Columns: [{}]", names.join(", "));
        let _ = writeln!(out, "- Data types: {{{}}}", dtypes.join(", "));

        let _ = writeln!(out, "\nStatistical Summary:\n{}", self.render_describe());

        let headers: Vec<String> = names.iter().map(|s| (*s).to_owned()).collect();
        let _ = writeln!(
            out,
            "\nFirst {} rows:\n{}",
            self.preview.len(),
            render_grid(&headers, &self.preview)
        );

        let _ = writeln!(out, "\nMissing Values:\n{{{}}}", missing.join(", "));

        if !self.unique_counts.is_empty() {
            let uniques: Vec<String> = self
                .unique_counts
                .iter()
                .map(|(name, n)| format!("{name}: {n} unique values"))
                .collect();
            let _ = writeln!(
                out,
                "\nUnique Values (for categorical columns):\n{}",
                uniques.join(", ")
            );
        }

        match &self.correlation {
            Some(matrix) => {
                let _ = write!(
                    out,
                    "\nCorrelations (for numeric columns):\n{}",
                    self.render_correlation(matrix)
                );
            }
            None => out.push_str("\nCorrelations: No numeric columns for correlation"),
        }

        out
    }
}

impl std::fmt::Display for TableSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, clippy::indexing_slicing)]
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "age" => &[Some(10), Some(20), Some(30), None],
            "score" => &[1.0, 2.0, 3.0, 5.0],
            "city" => &["Oslo", "Rome", "Oslo", "Lima"]
        )
        .unwrap()
    }

    #[test]
    fn test_summary_counts() -> anyhow::Result<()> {
        let summary = summarize(&sample(), 5)?;
        assert_eq!(summary.row_count, 4);
        assert_eq!(summary.column_count, 3);
        assert_eq!(summary.columns[2].dtype, "text");
        assert_eq!(summary.missing[0], ("age".to_owned(), 1));
        assert_eq!(summary.unique_counts, vec![("city".to_owned(), 3)]);
        assert_eq!(summary.preview.len(), 4);
        Ok(())
    }

    #[test]
    fn test_numeric_description() -> anyhow::Result<()> {
        let summary = summarize(&sample(), 2)?;
        let age = &summary.numeric[0];
        assert_eq!(age.count, 3);
        assert_eq!(age.mean, Some(20.0));
        assert_eq!(age.min, Some(10.0));
        assert_eq!(age.median, Some(20.0));
        assert_eq!(age.max, Some(30.0));
        assert_eq!(age.std, Some(10.0));
        assert_eq!(summary.preview.len(), 2);
        Ok(())
    }

    #[test]
    fn test_correlation_rounded() -> anyhow::Result<()> {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0, 4.0],
            "y" => &[2.0, 4.0, 6.0, 8.5],
            "flat" => &[1.0, 1.0, 1.0, 1.0]
        )?;
        let matrix = calculate_correlation_matrix(&df)?.unwrap();
        assert_eq!(matrix.columns, vec!["x", "y", "flat"]);
        assert_eq!(matrix.data[0][0], Some(1.0));
        assert_eq!(matrix.data[0][1], Some(1.0));
        assert_eq!(matrix.data[2][0], None, "constant column has no correlation");
        Ok(())
    }

    #[test]
    fn test_no_numeric_marker() -> anyhow::Result<()> {
        let df = df!("name" => &["a", "b"])?;
        let summary = summarize(&df, 5)?;
        assert!(summary.correlation.is_none());
        assert!(
            summary
                .render()
                .contains("Correlations: No numeric columns for correlation")
        );
        Ok(())
    }

    #[test]
    fn test_render_sections() -> anyhow::Result<()> {
        let text = summarize(&sample(), 5)?.render();
        assert!(text.contains("- Shape: (4, 3)"));
        assert!(text.contains("- Columns: [age, score, city]"));
        assert!(text.contains("Statistical Summary:"));
        assert!(text.contains("Missing Values:\n{age: 1, score: 0, city: 0}"));
        assert!(text.contains("city: 3 unique values"));
        assert!(text.contains("Correlations (for numeric columns):"));
        Ok(())
    }
}
