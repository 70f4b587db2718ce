//! Transformation pipeline over an in-memory table.
//!
//! A [`Pipeline`] owns the table as it was ingested, the current table, and the
//! audit trail of everything applied to it. Operations come from a closed set
//! ([`Operation`]) and are applied one at a time, copy-then-swap, so a failed
//! operation never leaves a half-transformed table behind.
//!
//! # Example
//!
//! ```no_run
//! use polars::prelude::*;
//! use tabletalk::pipeline::{ApplyOutcome, FillStrategy, Operation, Pipeline};
//!
//! let table = df!("age" => &[Some(10), Some(20), Some(30), None])?;
//! let mut pipeline = Pipeline::new(table);
//!
//! let outcome = pipeline.apply(&Operation::FillNA {
//!     column: "age".to_owned(),
//!     strategy: FillStrategy::Mean,
//!     value: None,
//! })?;
//! assert_eq!(
//!     outcome,
//!     ApplyOutcome::Applied("Filled missing values in age with mean (20.00)".to_owned())
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Operation scripts
//!
//! Sequences of operations serialize to JSON ([`OperationScript`]) and can be
//! run headlessly with `tabletalk transform --ops script.json`.

pub mod engine;
pub mod executor;
pub mod log;
pub mod spec;
pub mod validation;

pub use engine::{ApplyOutcome, Pipeline};
pub use executor::{Execution, execute};
pub use log::{LogEntry, OperationLog};
pub use spec::{
    ArithmeticOp, CaseMode, FillStrategy, FillValue, FilterPredicate, Operation, OperationScript,
    SCRIPT_VERSION,
};
pub use validation::{ValidationError, check_operation, validate_script};
