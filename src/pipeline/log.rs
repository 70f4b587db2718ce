use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// Ordered audit trail of applied operations.
///
/// Append-only; the only way to shrink it is [`OperationLog::clear`], which the
/// pipeline calls on reset and re-initialization.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, description: impl Into<String>) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            description: description.into(),
        });
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Descriptions in application order.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.description.as_str())
    }

    /// `"1. Removed columns: a"`-style lines for display.
    pub fn numbered(&self) -> Vec<String> {
        self.descriptions()
            .enumerate()
            .map(|(i, d)| format!("{}. {d}", i + 1))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_number() {
        let mut log = OperationLog::new();
        assert!(log.is_empty());

        log.push("Removed columns: a");
        log.push("Sorted data by b in ascending order");

        assert_eq!(log.len(), 2);
        assert_eq!(
            log.numbered(),
            vec![
                "1. Removed columns: a".to_owned(),
                "2. Sorted data by b in ascending order".to_owned()
            ]
        );

        log.clear();
        assert!(log.is_empty());
    }
}
