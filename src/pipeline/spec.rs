//! Operation definitions.
//!
//! Operations are plain data: a closed, serde-tagged enum with one variant per
//! transformation kind. A sequence of them serializes to the JSON "operation
//! script" format consumed by `tabletalk transform --ops`.

use crate::table::TargetType;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current operation script version
pub const SCRIPT_VERSION: &str = "0.1";

/// A single transformation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Keep rows whose value in `column` satisfies `predicate`
    Filter {
        column: String,
        predicate: FilterPredicate,
    },

    /// Remove the listed columns
    DropColumns { columns: Vec<String> },

    /// New column = `source` `op` `operand`
    CreateColumnArithmetic {
        name: String,
        source: String,
        #[serde(rename = "operator")]
        op: ArithmeticOp,
        operand: f64,
    },

    /// New column from the row-wise sum (all numeric) or text join of `sources`
    CreateColumnCombine {
        name: String,
        sources: Vec<String>,
        #[serde(default)]
        separator: Option<String>,
    },

    /// Drop rows with a missing value in `columns`, or in any column when `None`
    #[serde(rename = "drop_na_rows")]
    DropNARows {
        #[serde(default)]
        columns: Option<Vec<String>>,
    },

    /// Fill missing values in `column`
    #[serde(rename = "fill_na")]
    FillNA {
        column: String,
        strategy: FillStrategy,
        #[serde(default)]
        value: Option<FillValue>,
    },

    /// Min-max scale to 0..1
    Normalize { column: String },

    /// Z-score
    Standardize { column: String },

    LogTransform { column: String },

    SqrtTransform { column: String },

    CaseTransform { column: String, mode: CaseMode },

    /// Replace `column` with one boolean indicator column per distinct value
    OneHotEncode { column: String },

    CastType { column: String, target: TargetType },

    Sort {
        column: String,
        #[serde(default = "default_true")]
        ascending: bool,
    },
}

impl Operation {
    /// Short kind name used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filter { .. } => "filter",
            Self::DropColumns { .. } => "drop_columns",
            Self::CreateColumnArithmetic { .. } => "create_column_arithmetic",
            Self::CreateColumnCombine { .. } => "create_column_combine",
            Self::DropNARows { .. } => "drop_na_rows",
            Self::FillNA { .. } => "fill_na",
            Self::Normalize { .. } => "normalize",
            Self::Standardize { .. } => "standardize",
            Self::LogTransform { .. } => "log_transform",
            Self::SqrtTransform { .. } => "sqrt_transform",
            Self::CaseTransform { .. } => "case_transform",
            Self::OneHotEncode { .. } => "one_hot_encode",
            Self::CastType { .. } => "cast_type",
            Self::Sort { .. } => "sort",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterPredicate {
    /// Keep rows whose stringified value is one of `values`
    OneOf { values: Vec<String> },

    /// Keep rows with `min <= value <= max`
    Range { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithmeticOp {
    #[serde(alias = "add")]
    Add,
    #[serde(alias = "sub")]
    Subtract,
    #[serde(alias = "mul")]
    Multiply,
    #[serde(alias = "div")]
    Divide,
}

impl std::fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
        };
        f.write_str(label)
    }
}

impl ArithmeticOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => lhs / rhs,
        }
    }
}

/// Strategy for filling missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    Mean,
    Median,
    #[serde(alias = "mode")]
    MostFrequent,
    /// Use the caller-supplied `value`
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for FillValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", crate::table::format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    Upper,
    Lower,
}

impl CaseMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Upper => "uppercase",
            Self::Lower => "lowercase",
        }
    }
}

/// A versioned, named sequence of operations stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationScript {
    /// Script version for future migrations
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: String,

    pub operations: Vec<Operation>,
}

impl OperationScript {
    pub fn new(name: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            version: SCRIPT_VERSION.to_owned(),
            name: name.into(),
            operations,
        }
    }

    /// Load a script from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read operation script file")?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse operation script JSON")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize operation script")
    }

    /// Example script printed by `tabletalk ops-template`.
    pub fn template() -> Self {
        Self::new(
            "example",
            vec![
                Operation::DropNARows {
                    columns: Some(vec!["price".to_owned()]),
                },
                Operation::FillNA {
                    column: "age".to_owned(),
                    strategy: FillStrategy::Mean,
                    value: None,
                },
                Operation::CreateColumnArithmetic {
                    name: "price_with_tax".to_owned(),
                    source: "price".to_owned(),
                    op: ArithmeticOp::Multiply,
                    operand: 1.2,
                },
                Operation::CaseTransform {
                    column: "city".to_owned(),
                    mode: CaseMode::Upper,
                },
                Operation::Sort {
                    column: "price".to_owned(),
                    ascending: false,
                },
            ],
        )
    }
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    SCRIPT_VERSION.to_owned()
}
