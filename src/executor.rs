//! Runs planned queries against a repository connection.
//!
//! One call to [`QueryExecutor::execute`] moves through
//! `Planned -> Running -> {Completed | TimedOut | Canceled | Failed}` and
//! reports exactly one terminal message. Nothing is propagated to the caller
//! as an error; failures come back as [`ExecutionOutcome::Failed`].

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::ClientConfig;
use crate::connection::{EvaluationRequest, RepositoryConnection};
use crate::error::SplinkError;
use crate::messages::MessageHandler;
use crate::planner;
use crate::processor::ResultProcessor;
use crate::timers::{seconds, timed};
use crate::types::{
    ExecutionOptions, ExecutionOutcome, ExecutionStats, PlannedQuery, QueryResult, QueryShape,
    RowCount,
};

/// Columns reported for graph results: subject, predicate, object.
const GRAPH_COLUMNS: usize = 3;

/// The collaborators of one query run.
#[derive(Clone, Copy)]
pub struct QueryExecutor<'a> {
    pub connection: &'a dyn RepositoryConnection,
    pub processor: &'a dyn ResultProcessor,
    pub messages: &'a dyn MessageHandler,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(
        connection: &'a dyn RepositoryConnection,
        processor: &'a dyn ResultProcessor,
        messages: &'a dyn MessageHandler,
    ) -> Self {
        Self {
            connection,
            processor,
            messages,
        }
    }

    /// Plan `text` under `config` and run it. A planning failure is reported
    /// like any other failure.
    pub fn perform(
        &self,
        text: &str,
        config: &ClientConfig,
        cancel: &CancelToken,
    ) -> ExecutionOutcome {
        match planner::plan(text, config.result_limit, config.limit_results) {
            Ok(planned) => {
                if limit_skipped(&planned, config) {
                    self.messages.handle_warning(
                        "query does not accept an appended LIMIT, running unlimited",
                    );
                }
                self.execute(&planned, config.execution_options(), cancel)
            }
            Err(error) => {
                let outcome = ExecutionOutcome::Failed {
                    error,
                    query: text.to_string(),
                };
                self.report(&outcome);
                outcome
            }
        }
    }

    pub fn execute(
        &self,
        planned: &PlannedQuery,
        options: ExecutionOptions,
        cancel: &CancelToken,
    ) -> ExecutionOutcome {
        let outcome = self.run(planned, options, cancel);
        self.report(&outcome);
        outcome
    }

    fn run(
        &self,
        planned: &PlannedQuery,
        options: ExecutionOptions,
        cancel: &CancelToken,
    ) -> ExecutionOutcome {
        let shape = planned.shape();
        let mut stats = ExecutionStats::default();

        self.messages.handle_message(&progress(planned, options));
        if cancel.is_canceled() {
            return ExecutionOutcome::Canceled {
                shape,
                stats,
                columns: 0,
            };
        }

        let request = EvaluationRequest {
            dialect: planned.dialect(),
            shape,
            text: &planned.text,
            include_inferred: options.include_inferred,
            timeout_seconds: options.timeout_seconds,
        };
        let result = match timed(&mut stats.evaluate, || self.connection.evaluate(&request)) {
            Ok(result) => result,
            Err(error) => return failure(error, stats, planned, options),
        };

        if result.shape() != shape {
            warn!(
                event = "Query",
                phase = "Running",
                expected = %shape,
                actual = %result.shape(),
                "Repository returned a different result shape"
            );
        }

        let (shape, columns, counted) = match result {
            QueryResult::Boolean(value) => {
                let answer = timed(&mut stats.consume, || self.processor.on_boolean(value));
                return ExecutionOutcome::Completed {
                    shape: QueryShape::Boolean,
                    stats,
                    columns: 0,
                    rows: 0,
                    limited: false,
                    answer: Some(answer),
                };
            }
            QueryResult::Tuple(rows) => {
                let mut rows = rows.with_cancel(cancel.clone());
                let columns = rows.columns();
                let counted = timed(&mut stats.consume, || self.processor.on_tuple(&mut rows));
                let counted = if rows.was_canceled() {
                    counted.map(|_| RowCount::Canceled)
                } else {
                    counted
                };
                (QueryShape::Tuple, columns, counted)
            }
            QueryResult::Graph(statements) => {
                let mut statements = statements.with_cancel(cancel.clone());
                let counted = timed(&mut stats.consume, || {
                    self.processor.on_graph(&mut statements)
                });
                let counted = if statements.was_canceled() {
                    counted.map(|_| RowCount::Canceled)
                } else {
                    counted
                };
                (QueryShape::Graph, GRAPH_COLUMNS, counted)
            }
        };

        match counted {
            Ok(RowCount::Canceled) => ExecutionOutcome::Canceled {
                shape,
                stats,
                columns,
            },
            Ok(RowCount::Rows(rows)) => ExecutionOutcome::Completed {
                shape,
                stats,
                columns,
                rows,
                limited: planned.effective_limit() == Some(rows as u64),
                answer: None,
            },
            Err(error) => failure(error, stats, planned, options),
        }
    }

    /// Report a terminal outcome through the message handler.
    pub(crate) fn report(&self, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Completed {
                stats,
                answer: Some(answer),
                ..
            } => {
                info!(
                    event = "Query",
                    phase = "Completed",
                    seconds = stats.total().as_secs_f64(),
                    answer
                );
                self.messages.handle_message(&format!(
                    "seconds: {}, result: {answer}",
                    seconds(stats.total())
                ));
            }
            ExecutionOutcome::Completed {
                shape,
                stats,
                columns,
                rows,
                limited,
                answer: None,
            } => {
                info!(
                    event = "Query",
                    phase = "Completed",
                    shape = %shape,
                    seconds = stats.total().as_secs_f64(),
                    rows,
                    limited
                );
                self.messages.handle_message(&format!(
                    "seconds: {}, cols: {columns}, rows: {rows}{}",
                    seconds(stats.total()),
                    if *limited { " (limited)" } else { "" }
                ));
            }
            ExecutionOutcome::Canceled {
                shape,
                stats,
                columns,
            } => {
                info!(
                    event = "Query",
                    phase = "Canceled",
                    shape = %shape,
                    seconds = stats.total().as_secs_f64()
                );
                self.messages.handle_message(&format!(
                    "seconds: {}, cols: {columns}, rows: {}",
                    seconds(stats.total()),
                    RowCount::Canceled
                ));
            }
            ExecutionOutcome::TimedOut {
                elapsed,
                timeout_seconds,
            } => {
                info!(event = "Query", phase = "TimedOut", seconds = elapsed.as_secs_f64());
                let text = match timeout_seconds {
                    Some(limit) => format!(
                        "seconds: {}, query reached timeout limit of {limit} seconds",
                        seconds(*elapsed)
                    ),
                    None => format!("seconds: {}, query was interrupted", seconds(*elapsed)),
                };
                self.messages.handle_message(&text);
            }
            ExecutionOutcome::Failed { error, query } => {
                warn!(event = "Query", phase = "Failed", error = %error);
                self.messages.handle_error_with(
                    error,
                    &format!("------ query ------\n\n{query}\n\n-------------------\n"),
                );
            }
        }
    }
}

// The planner only leaves a limitable query without a limit when the
// appended LIMIT did not survive a reparse.
fn limit_skipped(planned: &PlannedQuery, config: &ClientConfig) -> bool {
    config.limit_results
        && config.result_limit.is_some()
        && planned.shape() != QueryShape::Graph
        && planned.query.explicit_limit.is_none()
}

fn progress(planned: &PlannedQuery, options: ExecutionOptions) -> String {
    let timeout = match options.timeout_seconds {
        Some(t) => format!(" timeout {t} seconds"),
        None => " (no timeout)".to_string(),
    };
    match planned.shape() {
        QueryShape::Boolean => format!("asking{timeout}..."),
        shape => {
            let limit = match planned.effective_limit() {
                Some(n) => format!(" with limit {n}"),
                None => " (no limit)".to_string(),
            };
            format!("{}{limit}{timeout}...", shape.verb())
        }
    }
}

fn failure(
    error: SplinkError,
    stats: ExecutionStats,
    planned: &PlannedQuery,
    options: ExecutionOptions,
) -> ExecutionOutcome {
    if error.is_timeout() {
        ExecutionOutcome::TimedOut {
            elapsed: stats.total(),
            timeout_seconds: options.timeout_seconds,
        }
    } else {
        ExecutionOutcome::Failed {
            error,
            query: planned.text.clone(),
        }
    }
}
