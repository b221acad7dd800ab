//! Query planning: dialect detection, result shape and row limiting.
//!
//! SPARQL is tried first and SeRQL only when SPARQL rejects the text. Tuple
//! and boolean queries without a top-level limit get one appended to the
//! source text; graph queries are never limited.

use spargebra::Query;
use spargebra::algebra::GraphPattern;
use tracing::{debug, warn};

use crate::error::SplinkError;
use crate::serql;
use crate::types::{Dialect, ParsedQuery, PlannedQuery, QueryShape};

struct Form {
    dialect: Dialect,
    shape: QueryShape,
    limit: Option<u64>,
    limit_position: usize,
}

fn sparql_form(text: &str) -> Result<Form, spargebra::SparqlSyntaxError> {
    let query = Query::parse(text, None)?;
    let (shape, limit) = match &query {
        Query::Select { pattern, .. } => (QueryShape::Tuple, top_level_limit(pattern)),
        Query::Ask { pattern, .. } => (QueryShape::Boolean, top_level_limit(pattern)),
        Query::Construct { .. } | Query::Describe { .. } => (QueryShape::Graph, None),
    };
    Ok(Form {
        dialect: Dialect::Sparql,
        shape,
        limit,
        limit_position: text.len(),
    })
}

fn serql_form(text: &str) -> Result<Form, serql::SerqlSyntaxError> {
    let query = serql::parse(text)?;
    Ok(Form {
        dialect: Dialect::Serql,
        shape: query.shape,
        limit: query.limit,
        limit_position: query.limit_position,
    })
}

// Limits inside subqueries do not bound the outer result.
fn top_level_limit(pattern: &GraphPattern) -> Option<u64> {
    match pattern {
        GraphPattern::Slice {
            length: Some(length),
            ..
        } => Some(*length as u64),
        _ => None,
    }
}

fn detect(text: &str) -> Result<Form, SplinkError> {
    match sparql_form(text) {
        Ok(form) => Ok(form),
        Err(primary) => serql_form(text).map_err(|secondary| SplinkError::MalformedQuery {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        }),
    }
}

fn reparse(text: &str, dialect: Dialect) -> Option<Form> {
    match dialect {
        Dialect::Sparql => sparql_form(text).ok(),
        Dialect::Serql => serql_form(text).ok(),
    }
}

fn with_limit(text: &str, position: usize, limit: u32) -> String {
    if position >= text.len() {
        format!("{text}\nLIMIT {limit}")
    } else {
        let (head, tail) = text.split_at(position);
        format!("{head}LIMIT {limit} {tail}")
    }
}

/// Parse `text` and decide the row limit it runs with.
///
/// `result_limit` is appended when `limiting_enabled` is set, the query is not
/// graph shaped and it carries no limit of its own.
pub fn plan(
    text: &str,
    result_limit: Option<u32>,
    limiting_enabled: bool,
) -> Result<PlannedQuery, SplinkError> {
    let form = detect(text)?;

    let mut planned = PlannedQuery {
        query: ParsedQuery {
            dialect: form.dialect,
            shape: form.shape,
            explicit_limit: form.limit,
        },
        text: text.to_string(),
        limit_injected: false,
    };

    if form.shape != QueryShape::Graph && form.limit.is_none() && limiting_enabled {
        if let Some(limit) = result_limit {
            let limited = with_limit(text, form.limit_position, limit);
            match reparse(&limited, form.dialect) {
                Some(check) if check.limit == Some(u64::from(limit)) => {
                    planned.text = limited;
                    planned.query.explicit_limit = check.limit;
                    planned.limit_injected = true;
                }
                _ => warn!(
                    event = "Query",
                    phase = "Planned",
                    dialect = %form.dialect,
                    limit,
                    "Query does not accept an appended LIMIT, running unlimited"
                ),
            }
        }
    }

    debug!(
        event = "Query",
        phase = "Planned",
        dialect = %planned.query.dialect,
        shape = %planned.query.shape,
        limit = ?planned.query.explicit_limit,
        injected = planned.limit_injected
    );

    Ok(planned)
}
