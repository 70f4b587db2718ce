//! Operation execution.
//!
//! [`execute`] never mutates its input: it validates the operation against the
//! table, builds a transformed copy and hands it back together with the audit
//! description. The pipeline swaps the copy in only on success, which is what
//! makes `apply` all-or-nothing.

use super::spec::{ArithmeticOp, CaseMode, FillStrategy, FillValue, FilterPredicate, Operation};
use super::validation::check_operation;
use crate::error::{Result, TableTalkError};
use crate::table::{
    ColumnKind, TargetType, category_dtype, column_kind, datetime_millis, datetime_series, dtype_label,
    float_values, format_number, has_column, parse_datetime_millis, require_column, text_values,
};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Result of running one operation against a table.
#[derive(Debug, Clone)]
pub enum Execution {
    /// The operation produced a new table
    Changed {
        table: DataFrame,
        description: String,
    },

    /// Nothing useful to do (degenerate range or variance); the table is unchanged
    Skipped { reason: String },
}

fn changed(table: DataFrame, description: String) -> Result<Execution> {
    Ok(Execution::Changed { table, description })
}

fn skipped(reason: String) -> Result<Execution> {
    Ok(Execution::Skipped { reason })
}

fn precondition(message: String) -> TableTalkError {
    TableTalkError::OperationPrecondition(message)
}

/// Copy `df` and add (or replace in place) `series`.
fn with_series(df: &DataFrame, series: Series) -> Result<DataFrame> {
    let mut table = df.clone();
    table.with_column(series)?;
    Ok(table)
}

/// Run `op` against `df`, returning the transformed copy.
pub fn execute(op: &Operation, df: &DataFrame) -> Result<Execution> {
    check_operation(op, df)?;

    match op {
        Operation::Filter { column, predicate } => filter(df, column, predicate),
        Operation::DropColumns { columns } => drop_columns(df, columns),
        Operation::CreateColumnArithmetic {
            name,
            source,
            op,
            operand,
        } => create_arithmetic(df, name, source, *op, *operand),
        Operation::CreateColumnCombine {
            name,
            sources,
            separator,
        } => create_combined(df, name, sources, separator.as_deref().unwrap_or(" ")),
        Operation::DropNARows { columns } => drop_na_rows(df, columns.as_deref()),
        Operation::FillNA {
            column,
            strategy,
            value,
        } => fill_na(df, column, *strategy, value.as_ref()),
        Operation::Normalize { column } => normalize(df, column),
        Operation::Standardize { column } => standardize(df, column),
        Operation::LogTransform { column } => log_transform(df, column),
        Operation::SqrtTransform { column } => sqrt_transform(df, column),
        Operation::CaseTransform { column, mode } => case_transform(df, column, *mode),
        Operation::OneHotEncode { column } => one_hot_encode(df, column),
        Operation::CastType { column, target } => cast_type(df, column, *target),
        Operation::Sort { column, ascending } => sort(df, column, *ascending),
    }
}

fn filter(df: &DataFrame, column: &str, predicate: &FilterPredicate) -> Result<Execution> {
    match predicate {
        FilterPredicate::OneOf { values } => {
            let keep: HashSet<&str> = values.iter().map(String::as_str).collect();
            let mask: BooleanChunked = text_values(require_column(df, column)?)?
                .iter()
                .map(|v| v.as_deref().is_some_and(|s| keep.contains(s)))
                .collect();
            changed(
                df.filter(&mask)?,
                format!("Filtered {column} to keep only {}", values.join(", ")),
            )
        }
        FilterPredicate::Range { min, max } => {
            let table = df
                .clone()
                .lazy()
                .filter(
                    col(column)
                        .gt_eq(lit(*min))
                        .and(col(column).lt_eq(lit(*max))),
                )
                .collect()?;
            changed(
                table,
                format!(
                    "Filtered {column} to range {} - {}",
                    format_number(*min),
                    format_number(*max)
                ),
            )
        }
    }
}

fn drop_columns(df: &DataFrame, columns: &[String]) -> Result<Execution> {
    let mut table = df.clone();
    for column in columns {
        if has_column(&table, column) {
            table = table.drop(column)?;
        }
    }
    changed(table, format!("Removed columns: {}", columns.join(", ")))
}

fn create_arithmetic(
    df: &DataFrame,
    name: &str,
    source: &str,
    op: ArithmeticOp,
    operand: f64,
) -> Result<Execution> {
    if op == ArithmeticOp::Divide && operand == 0.0 {
        return Err(TableTalkError::InvalidOperation(format!(
            "cannot divide '{source}' by zero"
        )));
    }

    let values: Vec<Option<f64>> = float_values(require_column(df, source)?)?
        .into_iter()
        .map(|v| v.map(|x| op.apply(x, operand)))
        .collect();

    changed(
        with_series(df, Series::new(name.into(), values))?,
        format!(
            "Created new column '{name}' = {source} {op} {}",
            format_number(operand)
        ),
    )
}

fn create_combined(
    df: &DataFrame,
    name: &str,
    sources: &[String],
    separator: &str,
) -> Result<Execution> {
    let inputs = sources
        .iter()
        .map(|c| require_column(df, c))
        .collect::<Result<Vec<_>>>()?;

    let (series, mode) = if inputs.iter().all(|s| column_kind(s).is_numeric()) {
        let mut sums = vec![0.0_f64; df.height()];
        for input in &inputs {
            for (acc, v) in sums.iter_mut().zip(float_values(input)?) {
                *acc += v.unwrap_or(0.0);
            }
        }
        (Series::new(name.into(), sums), "sum")
    } else {
        let mut parts: Vec<Vec<String>> = vec![Vec::with_capacity(inputs.len()); df.height()];
        for input in &inputs {
            for (row, v) in parts.iter_mut().zip(text_values(input)?) {
                row.push(v.unwrap_or_default());
            }
        }
        let joined: Vec<String> = parts.into_iter().map(|row| row.join(separator)).collect();
        (
            Series::new(name.into(), joined),
            "concatenation with separator",
        )
    };

    changed(
        with_series(df, series)?,
        format!(
            "Created new column '{name}' from {mode} of {}",
            sources.join(", ")
        ),
    )
}

fn drop_na_rows(df: &DataFrame, columns: Option<&[String]>) -> Result<Execution> {
    let subset = columns.unwrap_or_default();
    let lf = df.clone().lazy();

    let predicate = subset
        .iter()
        .map(|c| col(c.as_str()).is_not_null())
        .reduce(|acc, e| acc.and(e));

    let (lf, description) = match predicate {
        Some(predicate) => (
            lf.filter(predicate),
            format!(
                "Dropped rows with missing values in columns: {}",
                subset.join(", ")
            ),
        ),
        None => (
            lf.drop_nulls(None),
            "Dropped all rows with any missing values".to_owned(),
        ),
    };

    changed(lf.collect()?, description)
}

fn fill_na(
    df: &DataFrame,
    column: &str,
    strategy: FillStrategy,
    value: Option<&FillValue>,
) -> Result<Execution> {
    let series = require_column(df, column)?;
    if series.null_count() == 0 {
        return Err(precondition(format!(
            "column '{column}' has no missing values"
        )));
    }

    let (fill, label) = match (strategy, value) {
        (FillStrategy::Mean, _) => {
            let mean = numeric_stat(series, column, |ca| ca.mean())?;
            (FillValue::Number(mean), format!("mean ({mean:.2})"))
        }
        (FillStrategy::Median, _) => {
            let median = numeric_stat(series, column, |ca| ca.median())?;
            (FillValue::Number(median), format!("median ({median:.2})"))
        }
        (FillStrategy::MostFrequent, _) => {
            let mode = most_frequent(series, column)?;
            let label = format!("most frequent value ({mode})");
            (FillValue::Text(mode), label)
        }
        (FillStrategy::Value, Some(v)) => (v.clone(), format!("custom value ({v})")),
        (FillStrategy::Value, None) => {
            return Err(TableTalkError::InvalidOperation(
                "a fill value is required for the 'value' strategy".to_owned(),
            ));
        }
    };

    let filled = match &fill {
        FillValue::Number(n) => fill_numeric(series, *n)?,
        FillValue::Text(text) => fill_text(series, text)?,
    };

    changed(
        with_series(df, filled)?,
        format!("Filled missing values in {column} with {label}"),
    )
}

fn numeric_stat(
    series: &Series,
    column: &str,
    stat: impl FnOnce(&Float64Chunked) -> Option<f64>,
) -> Result<f64> {
    let floats = series.cast(&DataType::Float64)?;
    stat(floats.f64()?).ok_or_else(|| {
        precondition(format!(
            "column '{column}' has no values to compute a fill value from"
        ))
    })
}

/// Most common non-missing value; ties go to the smallest value.
fn most_frequent(series: &Series, column: &str) -> Result<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for v in text_values(series)?.into_iter().flatten() {
        *counts.entry(v).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .fold(None::<(String, usize)>, |best, (value, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((value, n)),
        })
        .map(|(value, _)| value)
        .ok_or_else(|| {
            precondition(format!(
                "column '{column}' has no values to compute a fill value from"
            ))
        })
}

fn fill_numeric(series: &Series, fill: f64) -> Result<Series> {
    let values: Vec<f64> = float_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill))
        .collect();
    let filled = Series::new(series.name().clone(), values);

    // An integral fill that overflows the integer dtype stays float64
    if column_kind(series) == ColumnKind::Integer
        && fill.fract() == 0.0
        && let Ok(cast) = filled.strict_cast(series.dtype())
    {
        return Ok(cast);
    }
    Ok(filled)
}

fn fill_text(series: &Series, fill: &str) -> Result<Series> {
    let values: Vec<Option<String>> = text_values(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or_else(|| fill.to_owned())))
        .collect();
    restore_from_text(series.name().as_str(), values, series.dtype())
}

/// Rebuild a column of `dtype` from text, falling back to a text column when
/// some value does not parse back.
fn restore_from_text(name: &str, values: Vec<Option<String>>, dtype: &DataType) -> Result<Series> {
    match ColumnKind::from_dtype(dtype) {
        ColumnKind::Categorical => Ok(Series::new(name.into(), values).cast(&category_dtype())?),
        ColumnKind::Boolean => match parse_all(&values, parse_bool) {
            Ok(parsed) => Ok(Series::new(name.into(), parsed)),
            Err(_) => Ok(Series::new(name.into(), values)),
        },
        ColumnKind::Datetime => match parse_all(&values, parse_datetime_millis) {
            Ok(parsed) => datetime_series(name, parsed),
            Err(_) => Ok(Series::new(name.into(), values)),
        },
        _ => Ok(Series::new(name.into(), values)),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse every non-missing value, or return the first one that fails.
fn parse_all<T>(
    values: &[Option<String>],
    parse: impl Fn(&str) -> Option<T>,
) -> std::result::Result<Vec<Option<T>>, String> {
    values
        .iter()
        .map(|v| match v {
            Some(raw) => parse(raw).map(Some).ok_or_else(|| raw.clone()),
            None => Ok(None),
        })
        .collect()
}

fn min_max(values: &[Option<f64>]) -> Option<(f64, f64)> {
    values
        .iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn normalize(df: &DataFrame, column: &str) -> Result<Execution> {
    let values = float_values(require_column(df, column)?)?;
    let Some((min, max)) = min_max(&values) else {
        return skipped(format!("column '{column}' has no values to normalize"));
    };
    let range = max - min;
    if range == 0.0 {
        return skipped(format!(
            "column '{column}' has a single distinct value, nothing to normalize"
        ));
    }

    let table = df
        .clone()
        .lazy()
        .with_column(((col(column).cast(DataType::Float64) - lit(min)) / lit(range)).alias(column))
        .collect()?;
    changed(table, format!("Normalized {column} to range 0-1"))
}

fn standardize(df: &DataFrame, column: &str) -> Result<Execution> {
    let floats = require_column(df, column)?.cast(&DataType::Float64)?;
    let ca = floats.f64()?;
    let (Some(mean), Some(std)) = (ca.mean(), ca.std(1)) else {
        return skipped(format!(
            "column '{column}' has too few values to standardize"
        ));
    };
    if std == 0.0 || !std.is_finite() {
        return skipped(format!(
            "column '{column}' has zero variance, nothing to standardize"
        ));
    }

    let table = df
        .clone()
        .lazy()
        .with_column(((col(column).cast(DataType::Float64) - lit(mean)) / lit(std)).alias(column))
        .collect()?;
    changed(table, format!("Standardized {column} (z-score)"))
}

/// Apply `f(x + offset)` to every value, keeping nulls.
fn shifted_map(df: &DataFrame, column: &str, offset: f64, f: fn(f64) -> f64) -> Result<DataFrame> {
    let values: Vec<Option<f64>> = float_values(require_column(df, column)?)?
        .into_iter()
        .map(|v| v.map(|x| f(x + offset)))
        .collect();
    with_series(df, Series::new(column.into(), values))
}

fn log_transform(df: &DataFrame, column: &str) -> Result<Execution> {
    let values = float_values(require_column(df, column)?)?;
    let offset = match min_max(&values) {
        Some((min, _)) if min <= 0.0 => min.abs() + 1.0,
        _ => 0.0,
    };

    let table = shifted_map(df, column, offset, f64::ln)?;
    let description = if offset > 0.0 {
        format!(
            "Applied log transform to {column} with offset {}",
            format_number(offset)
        )
    } else {
        format!("Applied log transform to {column}")
    };
    changed(table, description)
}

fn sqrt_transform(df: &DataFrame, column: &str) -> Result<Execution> {
    let values = float_values(require_column(df, column)?)?;
    let offset = match min_max(&values) {
        Some((min, _)) if min < 0.0 => min.abs(),
        _ => 0.0,
    };

    let table = shifted_map(df, column, offset, f64::sqrt)?;
    let description = if offset > 0.0 {
        format!(
            "Applied square root transform to {column} with offset {}",
            format_number(offset)
        )
    } else {
        format!("Applied square root transform to {column}")
    };
    changed(table, description)
}

fn case_transform(df: &DataFrame, column: &str, mode: CaseMode) -> Result<Execution> {
    let values: Vec<Option<String>> = text_values(require_column(df, column)?)?
        .into_iter()
        .map(|v| {
            v.map(|s| match mode {
                CaseMode::Upper => s.to_uppercase(),
                CaseMode::Lower => s.to_lowercase(),
            })
        })
        .collect();

    changed(
        with_series(df, Series::new(column.into(), values))?,
        format!("Converted {column} to {}", mode.label()),
    )
}

fn one_hot_encode(df: &DataFrame, column: &str) -> Result<Execution> {
    let values = text_values(require_column(df, column)?)?;
    let distinct: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();

    let mut table = df.drop(column)?;
    for value in distinct {
        let indicator_name = format!("{column}_{value}");
        if has_column(&table, &indicator_name) {
            return Err(precondition(format!(
                "one-hot column '{indicator_name}' already exists"
            )));
        }
        let indicator: Vec<bool> = values.iter().map(|v| v.as_deref() == Some(value)).collect();
        table.with_column(Series::new(indicator_name.as_str().into(), indicator))?;
    }

    changed(table, format!("One-hot encoded {column}"))
}

fn cast_type(df: &DataFrame, column: &str, target: TargetType) -> Result<Execution> {
    let series = require_column(df, column)?;
    let old = dtype_label(series.dtype());
    let cast = cast_column(series, column, target)?;

    changed(
        with_series(df, cast)?,
        format!("Changed data type of {column} from {old} to {target}"),
    )
}

fn cast_error(column: &str, value: &str, target: TargetType) -> TableTalkError {
    TableTalkError::TypeCast(format!(
        "value '{value}' in column '{column}' cannot be converted to {target}"
    ))
}

fn cast_column(series: &Series, column: &str, target: TargetType) -> Result<Series> {
    let name = series.name().clone();
    let kind = column_kind(series);

    match target {
        TargetType::Text => Ok(Series::new(name, text_values(series)?)),

        TargetType::Category => Ok(Series::new(name, text_values(series)?).cast(&target.dtype())?),

        TargetType::Int64 | TargetType::Float64 => {
            let source = match kind {
                ColumnKind::Datetime => Series::new(name, datetime_millis(series)?),
                ColumnKind::Categorical => series.cast(&DataType::String)?,
                ColumnKind::Other => {
                    return Err(TableTalkError::TypeCast(format!(
                        "column '{column}' of type {} cannot be converted to {target}",
                        dtype_label(series.dtype())
                    )));
                }
                _ => series.clone(),
            };
            let cast = source
                .cast(&target.dtype())
                .map_err(|e| TableTalkError::TypeCast(e.to_string()))?;

            // Non-strict casts turn unconvertible values into nulls
            let originals = text_values(&source)?;
            for (original, is_null) in originals.iter().zip(cast.is_null().into_iter()) {
                if let (Some(value), Some(true)) = (original, is_null) {
                    return Err(cast_error(column, value, target));
                }
            }
            Ok(cast)
        }

        TargetType::Bool => match kind {
            ColumnKind::Boolean => Ok(series.clone()),
            ColumnKind::Integer | ColumnKind::Float => {
                let flags: Vec<Option<bool>> = float_values(series)?
                    .into_iter()
                    .map(|v| v.map(|x| x != 0.0))
                    .collect();
                Ok(Series::new(name, flags))
            }
            ColumnKind::Text | ColumnKind::Categorical => {
                parse_all(&text_values(series)?, parse_bool)
                    .map(|flags| Series::new(name, flags))
                    .map_err(|value| cast_error(column, &value, target))
            }
            ColumnKind::Datetime | ColumnKind::Other => Err(TableTalkError::TypeCast(format!(
                "column '{column}' of type {} cannot be converted to bool",
                dtype_label(series.dtype())
            ))),
        },

        TargetType::Datetime => match kind {
            ColumnKind::Datetime => datetime_series(name.as_str(), datetime_millis(series)?),
            ColumnKind::Integer => {
                let millis = series.cast(&DataType::Int64)?;
                datetime_series(name.as_str(), millis.i64()?.into_iter().collect())
            }
            ColumnKind::Text | ColumnKind::Categorical => {
                let millis = parse_all(&text_values(series)?, parse_datetime_millis)
                    .map_err(|value| cast_error(column, &value, target))?;
                datetime_series(name.as_str(), millis)
            }
            ColumnKind::Float | ColumnKind::Boolean | ColumnKind::Other => {
                Err(TableTalkError::TypeCast(format!(
                    "column '{column}' of type {} cannot be converted to datetime",
                    dtype_label(series.dtype())
                )))
            }
        },
    }
}

fn sort(df: &DataFrame, column: &str, ascending: bool) -> Result<Execution> {
    // Categories compare by their text, whatever ordering the dtype carries
    let key = if column_kind(require_column(df, column)?) == ColumnKind::Categorical {
        col(column).cast(DataType::String)
    } else {
        col(column)
    };

    let table = df
        .clone()
        .lazy()
        .sort_by_exprs(
            [key],
            SortMultipleOptions::default()
                .with_order_descending(!ascending)
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let order = if ascending { "ascending" } else { "descending" };
    changed(table, format!("Sorted data by {column} in {order} order"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: &Operation, df: &DataFrame) -> (DataFrame, String) {
        match execute(op, df).expect("operation should succeed") {
            Execution::Changed { table, description } => (table, description),
            Execution::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
    }

    fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        float_values(require_column(df, column).expect("column exists")).expect("floats")
    }

    fn texts(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        text_values(require_column(df, column).expect("column exists")).expect("texts")
    }

    #[test]
    fn test_filter_by_values() {
        let df = df!("city" => &["Oslo", "Rome", "Lima", "Oslo"], "n" => &[1, 2, 3, 4])
            .expect("frame");
        let (table, description) = run(
            &Operation::Filter {
                column: "city".to_owned(),
                predicate: FilterPredicate::OneOf {
                    values: vec!["Oslo".to_owned(), "Lima".to_owned()],
                },
            },
            &df,
        );
        assert_eq!(table.height(), 3);
        assert_eq!(description, "Filtered city to keep only Oslo, Lima");
    }

    #[test]
    fn test_filter_by_range_is_inclusive() {
        let df = df!("n" => &[Some(1), Some(2), None, Some(3), Some(4)]).expect("frame");
        let (table, description) = run(
            &Operation::Filter {
                column: "n".to_owned(),
                predicate: FilterPredicate::Range { min: 2.0, max: 3.0 },
            },
            &df,
        );
        assert_eq!(floats(&table, "n"), vec![Some(2.0), Some(3.0)]);
        assert_eq!(description, "Filtered n to range 2 - 3");
    }

    #[test]
    fn test_arithmetic_column() {
        let df = df!("x" => &[Some(2), None, Some(6)]).expect("frame");
        let (table, description) = run(
            &Operation::CreateColumnArithmetic {
                name: "half".to_owned(),
                source: "x".to_owned(),
                op: ArithmeticOp::Divide,
                operand: 2.0,
            },
            &df,
        );
        assert_eq!(floats(&table, "half"), vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(description, "Created new column 'half' = x Divide 2");
    }

    #[test]
    fn test_division_by_zero_is_invalid() {
        let df = df!("x" => &[1, 2]).expect("frame");
        let err = execute(
            &Operation::CreateColumnArithmetic {
                name: "half".to_owned(),
                source: "x".to_owned(),
                op: ArithmeticOp::Divide,
                operand: 0.0,
            },
            &df,
        )
        .unwrap_err();
        assert!(matches!(err, TableTalkError::InvalidOperation(_)));
    }

    #[test]
    fn test_combine_sum_and_concatenation() {
        let df = df!(
            "a" => &[Some(1), None],
            "b" => &[Some(2.5), Some(4.0)],
            "name" => &[Some("x"), None]
        )
        .expect("frame");

        let (table, description) = run(
            &Operation::CreateColumnCombine {
                name: "total".to_owned(),
                sources: vec!["a".to_owned(), "b".to_owned()],
                separator: None,
            },
            &df,
        );
        assert_eq!(floats(&table, "total"), vec![Some(3.5), Some(4.0)]);
        assert_eq!(description, "Created new column 'total' from sum of a, b");

        let (table, description) = run(
            &Operation::CreateColumnCombine {
                name: "label".to_owned(),
                sources: vec!["name".to_owned(), "a".to_owned()],
                separator: Some("-".to_owned()),
            },
            &df,
        );
        assert_eq!(
            texts(&table, "label"),
            vec![Some("x-1".to_owned()), Some("-".to_owned())]
        );
        assert_eq!(
            description,
            "Created new column 'label' from concatenation with separator of name, a"
        );
    }

    #[test]
    fn test_drop_na_rows() {
        let df = df!(
            "a" => &[Some(1), None, Some(3)],
            "b" => &[Some("x"), Some("y"), None]
        )
        .expect("frame");

        let (table, description) = run(
            &Operation::DropNARows {
                columns: Some(vec!["a".to_owned()]),
            },
            &df,
        );
        assert_eq!(table.height(), 2);
        assert_eq!(description, "Dropped rows with missing values in columns: a");

        let (table, description) = run(&Operation::DropNARows { columns: None }, &df);
        assert_eq!(table.height(), 1);
        assert_eq!(description, "Dropped all rows with any missing values");
    }

    #[test]
    fn test_fill_mean_keeps_integer_dtype() {
        let df = df!("age" => &[Some(10), Some(20), Some(30), None]).expect("frame");
        let (table, description) = run(
            &Operation::FillNA {
                column: "age".to_owned(),
                strategy: FillStrategy::Mean,
                value: None,
            },
            &df,
        );
        let age = require_column(&table, "age").expect("age");
        assert_eq!(age.dtype(), &DataType::Int32);
        assert_eq!(floats(&table, "age"), vec![Some(10.0), Some(20.0), Some(30.0), Some(20.0)]);
        assert_eq!(description, "Filled missing values in age with mean (20.00)");
    }

    #[test]
    fn test_fill_most_frequent_tie_breaks_low() {
        let df = df!("c" => &[Some("b"), Some("a"), Some("b"), Some("a"), None]).expect("frame");
        let (table, description) = run(
            &Operation::FillNA {
                column: "c".to_owned(),
                strategy: FillStrategy::MostFrequent,
                value: None,
            },
            &df,
        );
        assert_eq!(texts(&table, "c").last(), Some(&Some("a".to_owned())));
        assert_eq!(
            description,
            "Filled missing values in c with most frequent value (a)"
        );
    }

    #[test]
    fn test_fill_without_missing_is_rejected() {
        let df = df!("c" => &[1.0, 2.0]).expect("frame");
        let err = execute(
            &Operation::FillNA {
                column: "c".to_owned(),
                strategy: FillStrategy::Median,
                value: None,
            },
            &df,
        )
        .unwrap_err();
        assert!(matches!(err, TableTalkError::OperationPrecondition(_)));
    }

    #[test]
    fn test_degenerate_scaling_is_skipped() {
        let df = df!("k" => &[3, 3, 3]).expect("frame");
        for op in [
            Operation::Normalize {
                column: "k".to_owned(),
            },
            Operation::Standardize {
                column: "k".to_owned(),
            },
        ] {
            assert!(matches!(
                execute(&op, &df).expect("no error"),
                Execution::Skipped { .. }
            ));
        }
    }

    #[test]
    fn test_standardize() {
        let df = df!("v" => &[1.0, 2.0, 3.0]).expect("frame");
        let (table, description) = run(
            &Operation::Standardize {
                column: "v".to_owned(),
            },
            &df,
        );
        assert_eq!(floats(&table, "v"), vec![Some(-1.0), Some(0.0), Some(1.0)]);
        assert_eq!(description, "Standardized v (z-score)");
    }

    #[test]
    fn test_sqrt_offset() {
        let df = df!("v" => &[-4.0, 0.0, 5.0]).expect("frame");
        let (table, description) = run(
            &Operation::SqrtTransform {
                column: "v".to_owned(),
            },
            &df,
        );
        assert_eq!(floats(&table, "v"), vec![Some(0.0), Some(2.0), Some(3.0)]);
        assert_eq!(
            description,
            "Applied square root transform to v with offset 4"
        );
    }

    #[test]
    fn test_log_without_offset() {
        let df = df!("v" => &[1.0, 1.0]).expect("frame");
        let (table, description) = run(
            &Operation::LogTransform {
                column: "v".to_owned(),
            },
            &df,
        );
        assert_eq!(floats(&table, "v"), vec![Some(0.0), Some(0.0)]);
        assert_eq!(description, "Applied log transform to v");
    }

    #[test]
    fn test_case_transform_keeps_nulls() {
        let df = df!("s" => &[Some("MiXed"), None]).expect("frame");
        let (table, description) = run(
            &Operation::CaseTransform {
                column: "s".to_owned(),
                mode: CaseMode::Lower,
            },
            &df,
        );
        assert_eq!(texts(&table, "s"), vec![Some("mixed".to_owned()), None]);
        assert_eq!(description, "Converted s to lowercase");
    }

    #[test]
    fn test_cast_text_to_int_names_bad_value() {
        let df = df!("n" => &["1", "2", "three"]).expect("frame");
        let err = execute(
            &Operation::CastType {
                column: "n".to_owned(),
                target: TargetType::Int64,
            },
            &df,
        )
        .unwrap_err();
        assert!(matches!(err, TableTalkError::TypeCast(_)));
        assert!(err.to_string().contains("'three'"));
    }

    #[test]
    fn test_cast_to_bool_and_datetime() {
        let df = df!(
            "flag" => &["yes", "No", "1"],
            "when" => &["2024-01-02", "2024-01-03 10:30:00", "03/01/2024"]
        )
        .expect("frame");

        let (table, description) = run(
            &Operation::CastType {
                column: "flag".to_owned(),
                target: TargetType::Bool,
            },
            &df,
        );
        assert_eq!(description, "Changed data type of flag from text to bool");
        assert_eq!(
            require_column(&table, "flag").expect("flag").dtype(),
            &DataType::Boolean
        );

        let (table, description) = run(
            &Operation::CastType {
                column: "when".to_owned(),
                target: TargetType::Datetime,
            },
            &df,
        );
        assert_eq!(description, "Changed data type of when from text to datetime");
        assert_eq!(
            texts(&table, "when"),
            vec![
                Some("2024-01-02".to_owned()),
                Some("2024-01-03 10:30:00".to_owned()),
                Some("2024-01-03".to_owned()),
            ]
        );
    }

    #[test]
    fn test_one_hot_collision() {
        let df = df!("c" => &["a", "b"], "c_a" => &[1, 2]).expect("frame");
        let err = execute(
            &Operation::OneHotEncode {
                column: "c".to_owned(),
            },
            &df,
        )
        .unwrap_err();
        assert!(matches!(err, TableTalkError::OperationPrecondition(_)));
    }

    #[test]
    fn test_sort_descending_nulls_last() {
        let df = df!("n" => &[Some(2), None, Some(5), Some(1)]).expect("frame");
        let (table, description) = run(
            &Operation::Sort {
                column: "n".to_owned(),
                ascending: false,
            },
            &df,
        );
        assert_eq!(
            floats(&table, "n"),
            vec![Some(5.0), Some(2.0), Some(1.0), None]
        );
        assert_eq!(description, "Sorted data by n in descending order");
    }
}
