//! Operation validation.
//!
//! [`check_operation`] is the precondition gate run before every `apply`: it
//! inspects the current table's schema and rejects operations that target a
//! missing column, a column of the wrong kind, or carry invalid parameters.
//! [`validate_script`] performs a dry run of a whole operation script against
//! an input schema so the CLI can report every problem up front.

use super::spec::{FillStrategy, FillValue, FilterPredicate, Operation};
use crate::error::{Result, TableTalkError};
use crate::table::ColumnKind;
use polars::prelude::*;

fn precondition(message: impl Into<String>) -> TableTalkError {
    TableTalkError::OperationPrecondition(message.into())
}

fn kind_of(schema: &Schema, column: &str) -> Result<ColumnKind> {
    schema
        .get(column)
        .map(ColumnKind::from_dtype)
        .ok_or_else(|| precondition(format!("column '{column}' does not exist")))
}

fn require_numeric(schema: &Schema, column: &str) -> Result<()> {
    let kind = kind_of(schema, column)?;
    if kind.is_numeric() {
        Ok(())
    } else {
        Err(precondition(format!(
            "column '{column}' must be numeric, found {kind}"
        )))
    }
}

fn require_non_numeric(schema: &Schema, column: &str) -> Result<()> {
    let kind = kind_of(schema, column)?;
    if kind.is_numeric() {
        Err(precondition(format!(
            "column '{column}' must be non-numeric, found {kind}"
        )))
    } else {
        Ok(())
    }
}

fn require_new_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(precondition("new column name must not be empty"));
    }
    Ok(())
}

/// Check an operation's schema preconditions against `df`.
///
/// Checks that depend on cell values (missing-value presence, division by
/// zero, cast compatibility) are left to the executor.
pub fn check_operation(op: &Operation, df: &DataFrame) -> Result<()> {
    let schema = df.schema();
    check_against_schema(op, &schema)
}

fn check_against_schema(op: &Operation, schema: &Schema) -> Result<()> {
    match op {
        Operation::Filter { column, predicate } => match predicate {
            FilterPredicate::OneOf { values } => {
                let kind = kind_of(schema, column)?;
                if !kind.is_text_like() {
                    return Err(precondition(format!(
                        "value filter needs a text or categorical column, '{column}' is {kind}"
                    )));
                }
                if values.is_empty() {
                    return Err(precondition("value filter needs at least one value"));
                }
                Ok(())
            }
            FilterPredicate::Range { min, max } => {
                require_numeric(schema, column)?;
                if min > max {
                    return Err(precondition(format!(
                        "range filter lower bound {min} exceeds upper bound {max}"
                    )));
                }
                Ok(())
            }
        },

        Operation::DropColumns { columns } => {
            if columns.is_empty() {
                return Err(precondition("no columns selected to drop"));
            }
            for column in columns {
                kind_of(schema, column)?;
            }
            Ok(())
        }

        Operation::CreateColumnArithmetic { name, source, .. } => {
            require_new_name(name)?;
            require_numeric(schema, source)
        }

        Operation::CreateColumnCombine { name, sources, .. } => {
            require_new_name(name)?;
            if sources.is_empty() {
                return Err(precondition("select at least one column to combine"));
            }
            for column in sources {
                kind_of(schema, column)?;
            }
            Ok(())
        }

        Operation::DropNARows { columns } => {
            for column in columns.iter().flatten() {
                kind_of(schema, column)?;
            }
            Ok(())
        }

        Operation::FillNA {
            column,
            strategy,
            value,
        } => match strategy {
            FillStrategy::Mean | FillStrategy::Median => require_numeric(schema, column),
            FillStrategy::MostFrequent => require_non_numeric(schema, column),
            FillStrategy::Value => match value {
                None => Err(TableTalkError::InvalidOperation(
                    "a fill value is required for the 'value' strategy".to_owned(),
                )),
                Some(FillValue::Number(_)) => require_numeric(schema, column),
                Some(FillValue::Text(_)) => require_non_numeric(schema, column),
            },
        },

        Operation::Normalize { column }
        | Operation::Standardize { column }
        | Operation::LogTransform { column }
        | Operation::SqrtTransform { column } => require_numeric(schema, column),

        Operation::CaseTransform { column, .. } => require_non_numeric(schema, column),

        Operation::OneHotEncode { column }
        | Operation::CastType { column, .. }
        | Operation::Sort { column, .. } => kind_of(schema, column).map(|_| ()),
    }
}

/// Validation error with the index of the offending operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub index: usize,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation {}: {}", self.index + 1, self.message)
    }
}

/// Dry-run a script against the schema of `input`.
///
/// The schema is updated as operations add and remove columns. Columns whose
/// names or dtypes depend on data values (one-hot indicators) are not known
/// statically, so operations that reference them may produce false positives
/// and the executor stays the final authority.
pub fn validate_script(ops: &[Operation], input: &DataFrame) -> Vec<ValidationError> {
    let mut schema = Schema::from_iter(input.schema().iter_fields());
    let mut errors = Vec::new();

    for (index, op) in ops.iter().enumerate() {
        if let Err(err) = check_against_schema(op, &schema) {
            errors.push(ValidationError {
                index,
                message: err.to_string(),
            });
            continue;
        }
        evolve_schema(op, &mut schema);
    }

    errors
}

fn evolve_schema(op: &Operation, schema: &mut Schema) {
    match op {
        Operation::DropColumns { columns } => {
            for column in columns {
                schema.shift_remove(column.as_str());
            }
        }
        Operation::CreateColumnArithmetic { name, .. } => {
            schema.with_column(name.as_str().into(), DataType::Float64);
        }
        Operation::CreateColumnCombine { name, sources, .. } => {
            let all_numeric = sources.iter().all(|c| {
                schema
                    .get(c)
                    .is_some_and(|dt| ColumnKind::from_dtype(dt).is_numeric())
            });
            let dtype = if all_numeric {
                DataType::Float64
            } else {
                DataType::String
            };
            schema.with_column(name.as_str().into(), dtype);
        }
        Operation::Normalize { column }
        | Operation::Standardize { column }
        | Operation::LogTransform { column }
        | Operation::SqrtTransform { column } => {
            schema.with_column(column.as_str().into(), DataType::Float64);
        }
        Operation::CaseTransform { column, .. } => {
            schema.with_column(column.as_str().into(), DataType::String);
        }
        Operation::OneHotEncode { column } => {
            schema.shift_remove(column.as_str());
        }
        Operation::CastType { column, target } => {
            schema.with_column(column.as_str().into(), target.dtype());
        }
        Operation::Filter { .. }
        | Operation::DropNARows { .. }
        | Operation::FillNA { .. }
        | Operation::Sort { .. } => {}
    }
}
