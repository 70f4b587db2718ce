use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Coarse classification of a column's dtype.
///
/// Every operation precondition is phrased in terms of these kinds rather than
/// raw polars dtypes, so `Int32` and `UInt8` columns behave the same way as
/// `Int64` ones.
#[derive(Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Debug)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Categorical,
    Boolean,
    Datetime,
    Other,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ColumnKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean => Self::Boolean,
            DataType::String => Self::Text,
            DataType::Categorical(_, _) | DataType::Enum(_, _) => Self::Categorical,
            DataType::Date | DataType::Datetime(_, _) => Self::Datetime,
            dt if dt.is_integer() => Self::Integer,
            dt if dt.is_float() => Self::Float,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Text => "Text",
            Self::Categorical => "Categorical",
            Self::Boolean => "Boolean",
            Self::Datetime => "Datetime",
            Self::Other => "Other",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    pub fn is_text_like(&self) -> bool {
        matches!(self, Self::Text | Self::Categorical)
    }
}

/// Human-readable dtype label used in operation descriptions and summaries.
pub fn dtype_label(dtype: &DataType) -> String {
    let label = match dtype {
        DataType::Int8 => "int8",
        DataType::Int16 => "int16",
        DataType::Int32 => "int32",
        DataType::Int64 => "int64",
        DataType::UInt8 => "uint8",
        DataType::UInt16 => "uint16",
        DataType::UInt32 => "uint32",
        DataType::UInt64 => "uint64",
        DataType::Float32 => "float32",
        DataType::Float64 => "float64",
        DataType::String => "text",
        DataType::Categorical(_, _) | DataType::Enum(_, _) => "category",
        DataType::Boolean => "bool",
        DataType::Date => "date",
        DataType::Datetime(_, _) => "datetime",
        other => return other.to_string().to_lowercase(),
    };
    label.to_owned()
}

/// Target of a `CastType` operation.
#[derive(Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Int64,
    Float64,
    Text,
    Category,
    Bool,
    Datetime,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Text => "text",
            Self::Category => "category",
            Self::Bool => "bool",
            Self::Datetime => "datetime",
        }
    }

    /// The polars dtype a successful cast produces.
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Text => DataType::String,
            Self::Category => category_dtype(),
            Self::Bool => DataType::Boolean,
            Self::Datetime => DataType::Datetime(TimeUnit::Milliseconds, None),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Int64 => ColumnKind::Integer,
            Self::Float64 => ColumnKind::Float,
            Self::Text => ColumnKind::Text,
            Self::Category => ColumnKind::Categorical,
            Self::Bool => ColumnKind::Boolean,
            Self::Datetime => ColumnKind::Datetime,
        }
    }
}

/// Categorical dtype whose sort order follows the values, not first appearance.
pub fn category_dtype() -> DataType {
    DataType::Categorical(None, CategoricalOrdering::Lexical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(ColumnKind::from_dtype(&DataType::Int32), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_dtype(&DataType::UInt8), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_dtype(&DataType::Float32), ColumnKind::Float);
        assert_eq!(ColumnKind::from_dtype(&DataType::String), ColumnKind::Text);
        assert_eq!(ColumnKind::from_dtype(&DataType::Boolean), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_dtype(&DataType::Date), ColumnKind::Datetime);
        assert_eq!(
            ColumnKind::from_dtype(&TargetType::Category.dtype()),
            ColumnKind::Categorical
        );
    }

    #[test]
    fn test_numeric_and_text_like() {
        assert!(ColumnKind::Integer.is_numeric());
        assert!(ColumnKind::Float.is_numeric());
        assert!(!ColumnKind::Boolean.is_numeric());
        assert!(ColumnKind::Categorical.is_text_like());
        assert!(!ColumnKind::Datetime.is_text_like());
    }

    #[test]
    fn test_dtype_labels() {
        assert_eq!(dtype_label(&DataType::Int64), "int64");
        assert_eq!(dtype_label(&DataType::String), "text");
        assert_eq!(dtype_label(&TargetType::Datetime.dtype()), "datetime");
    }

    #[test]
    fn test_target_type_kinds_round_trip() {
        for target in [
            TargetType::Int64,
            TargetType::Float64,
            TargetType::Text,
            TargetType::Category,
            TargetType::Bool,
            TargetType::Datetime,
        ] {
            assert_eq!(ColumnKind::from_dtype(&target.dtype()), target.kind());
        }
    }
}
