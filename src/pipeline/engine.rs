//! The stateful pipeline: original table, current table and audit trail.

use super::executor::{Execution, execute};
use super::log::OperationLog;
use super::spec::Operation;
use crate::error::Result;
use polars::prelude::*;

/// What a successful `apply` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The table changed and `description` was appended to the log
    Applied(String),

    /// Defined no-op; table and log are untouched
    Skipped(String),
}

/// Ordered, replayable sequence of operations over an in-memory table.
///
/// Invariant: replaying [`Pipeline::applied`] against [`Pipeline::original`]
/// reproduces [`Pipeline::current`], and `log().len() == applied().len()`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    original: DataFrame,
    current: DataFrame,
    log: OperationLog,
    applied: Vec<Operation>,
}

impl Pipeline {
    pub fn new(table: DataFrame) -> Self {
        Self {
            current: table.clone(),
            original: table,
            log: OperationLog::new(),
            applied: Vec::new(),
        }
    }

    /// Replace all state with a freshly ingested table.
    pub fn initialize(&mut self, table: DataFrame) {
        *self = Self::new(table);
    }

    /// Back to the original table with an empty log.
    pub fn reset(&mut self) {
        self.current = self.original.clone();
        self.log.clear();
        self.applied.clear();
        tracing::info!("Pipeline reset to original table");
    }

    /// Validate and run `op` against the current table.
    ///
    /// # Errors
    ///
    /// Precondition, invalid-parameter and type-cast failures are returned
    /// without touching the current table or the log.
    pub fn apply(&mut self, op: &Operation) -> Result<ApplyOutcome> {
        match execute(op, &self.current) {
            Ok(Execution::Changed { table, description }) => {
                tracing::info!(
                    op = op.kind(),
                    rows = table.height(),
                    columns = table.width(),
                    "{description}"
                );
                self.current = table;
                self.log.push(description.clone());
                self.applied.push(op.clone());
                Ok(ApplyOutcome::Applied(description))
            }
            Ok(Execution::Skipped { reason }) => {
                tracing::debug!(op = op.kind(), "Skipped: {reason}");
                Ok(ApplyOutcome::Skipped(reason))
            }
            Err(e) => {
                tracing::warn!(op = op.kind(), "Operation rejected: {e}");
                Err(e)
            }
        }
    }

    /// Re-run every applied operation against a copy of the original table.
    ///
    /// # Errors
    ///
    /// Fails if any operation no longer applies, which would mean the replay
    /// invariant has been broken.
    pub fn replay(&self) -> Result<DataFrame> {
        let mut table = self.original.clone();
        for op in &self.applied {
            if let Execution::Changed { table: next, .. } = execute(op, &table)? {
                table = next;
            }
        }
        Ok(table)
    }

    pub fn original(&self) -> &DataFrame {
        &self.original
    }

    pub fn current(&self) -> &DataFrame {
        &self.current
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn applied(&self) -> &[Operation] {
        &self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableTalkError;
    use crate::pipeline::spec::ArithmeticOp;

    fn prices() -> DataFrame {
        df!("price" => &[5, 10], "qty" => &[Some(1), None]).expect("frame")
    }

    #[test]
    fn test_apply_records_log() -> anyhow::Result<()> {
        let mut pipeline = Pipeline::new(prices());
        let outcome = pipeline.apply(&Operation::Normalize {
            column: "price".to_owned(),
        })?;

        assert_eq!(
            outcome,
            ApplyOutcome::Applied("Normalized price to range 0-1".to_owned())
        );
        assert_eq!(pipeline.log().len(), 1);
        assert_eq!(pipeline.applied().len(), 1);
        assert!(pipeline.replay()?.equals_missing(pipeline.current()));
        Ok(())
    }

    #[test]
    fn test_failed_apply_is_atomic() {
        let mut pipeline = Pipeline::new(prices());
        let before = pipeline.current().clone();

        let err = pipeline
            .apply(&Operation::CreateColumnArithmetic {
                name: "half".to_owned(),
                source: "price".to_owned(),
                op: ArithmeticOp::Divide,
                operand: 0.0,
            })
            .unwrap_err();

        assert!(matches!(err, TableTalkError::InvalidOperation(_)));
        assert!(pipeline.current().equals_missing(&before));
        assert!(pipeline.log().is_empty());
    }

    #[test]
    fn test_skip_is_not_logged() -> anyhow::Result<()> {
        let mut pipeline = Pipeline::new(df!("k" => &[1.0, 1.0])?);
        let outcome = pipeline.apply(&Operation::Normalize {
            column: "k".to_owned(),
        })?;
        assert!(matches!(outcome, ApplyOutcome::Skipped(_)));
        assert!(pipeline.log().is_empty());
        assert!(pipeline.applied().is_empty());
        Ok(())
    }

    #[test]
    fn test_reset_and_initialize() -> anyhow::Result<()> {
        let mut pipeline = Pipeline::new(prices());
        pipeline.apply(&Operation::DropColumns {
            columns: vec!["qty".to_owned()],
        })?;
        pipeline.reset();
        assert!(pipeline.current().equals_missing(pipeline.original()));
        assert!(pipeline.log().is_empty());

        pipeline.apply(&Operation::DropNARows { columns: None })?;
        pipeline.initialize(df!("other" => &["x"])?);
        assert_eq!(pipeline.current().width(), 1);
        assert!(pipeline.log().is_empty());
        Ok(())
    }
}
