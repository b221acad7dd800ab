//! Terminal states of a single query run.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SplinkError;
use crate::types::QueryShape;

/// Rows consumed by a result processor.
///
/// `Canceled` sorts below every real count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RowCount {
    Canceled,
    Rows(usize),
}

impl RowCount {
    pub fn is_canceled(&self) -> bool {
        matches!(self, RowCount::Canceled)
    }

    pub fn rows(&self) -> Option<usize> {
        match self {
            RowCount::Rows(n) => Some(*n),
            RowCount::Canceled => None,
        }
    }
}

impl Display for RowCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RowCount::Canceled => f.write_str("[canceled]"),
            RowCount::Rows(n) => write!(f, "{n}"),
        }
    }
}

/// Phase durations of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Time spent in the connection's evaluate call.
    pub evaluate: Duration,
    /// Time spent by the result processor draining the result.
    pub consume: Duration,
}

impl ExecutionStats {
    pub fn total(&self) -> Duration {
        self.evaluate + self.consume
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed {
        shape: QueryShape,
        stats: ExecutionStats,
        columns: usize,
        rows: usize,
        /// The row count reached the effective limit.
        limited: bool,
        /// Set for boolean queries only.
        answer: Option<bool>,
    },
    TimedOut {
        elapsed: Duration,
        timeout_seconds: Option<u32>,
    },
    Canceled {
        shape: QueryShape,
        stats: ExecutionStats,
        columns: usize,
    },
    Failed {
        error: SplinkError,
        query: String,
    },
}

impl ExecutionOutcome {
    /// `None` for boolean answers, timeouts and failures.
    pub fn row_count(&self) -> Option<RowCount> {
        match self {
            ExecutionOutcome::Completed {
                rows, answer: None, ..
            } => Some(RowCount::Rows(*rows)),
            ExecutionOutcome::Canceled { .. } => Some(RowCount::Canceled),
            _ => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            ExecutionOutcome::Completed { stats, .. }
            | ExecutionOutcome::Canceled { stats, .. } => Some(stats.total()),
            ExecutionOutcome::TimedOut { elapsed, .. } => Some(*elapsed),
            ExecutionOutcome::Failed { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, ExecutionOutcome::Canceled { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, ExecutionOutcome::TimedOut { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_sorts_below_any_count() {
        assert!(RowCount::Canceled < RowCount::Rows(0));
        assert!(RowCount::Rows(0) < RowCount::Rows(1));
        assert_eq!(RowCount::Canceled.to_string(), "[canceled]");
        assert_eq!(RowCount::Rows(42).to_string(), "42");
    }

    #[test]
    fn test_row_count_by_outcome() {
        let stats = ExecutionStats::default();
        let completed = ExecutionOutcome::Completed {
            shape: QueryShape::Tuple,
            stats,
            columns: 2,
            rows: 7,
            limited: false,
            answer: None,
        };
        assert_eq!(completed.row_count(), Some(RowCount::Rows(7)));

        let answered = ExecutionOutcome::Completed {
            shape: QueryShape::Boolean,
            stats,
            columns: 0,
            rows: 0,
            limited: false,
            answer: Some(true),
        };
        assert_eq!(answered.row_count(), None);

        let canceled = ExecutionOutcome::Canceled {
            shape: QueryShape::Graph,
            stats,
            columns: 3,
        };
        assert_eq!(canceled.row_count(), Some(RowCount::Canceled));
        assert!(canceled.is_canceled());
    }
}
