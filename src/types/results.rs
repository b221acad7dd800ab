//! Typed query results as handed over by a repository connection.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use oxrdf::{Triple, Variable};
use sparesults::QuerySolution;

use crate::cancel::CancelToken;
use crate::error::SplinkError;
use crate::types::{Namespace, QueryShape};

pub type SolutionIter = Box<dyn Iterator<Item = Result<QuerySolution, SplinkError>> + Send>;
pub type TripleIter = Box<dyn Iterator<Item = Result<Triple, SplinkError>> + Send>;

/// One evaluated query, tagged by shape.
pub enum QueryResult {
    Boolean(bool),
    Tuple(TupleStream),
    Graph(GraphStream),
}

impl QueryResult {
    pub fn shape(&self) -> QueryShape {
        match self {
            QueryResult::Boolean(_) => QueryShape::Boolean,
            QueryResult::Tuple(_) => QueryShape::Tuple,
            QueryResult::Graph(_) => QueryShape::Graph,
        }
    }
}

impl Debug for QueryResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            QueryResult::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
            QueryResult::Tuple(stream) => f.debug_tuple("Tuple").field(stream).finish(),
            QueryResult::Graph(stream) => f.debug_tuple("Graph").field(stream).finish(),
        }
    }
}

/// Rows of a SELECT result.
///
/// Iteration stops as soon as the attached [`CancelToken`] is set;
/// [`TupleStream::was_canceled`] then reports it.
pub struct TupleStream {
    variables: Arc<[Variable]>,
    rows: SolutionIter,
    cancel: Option<CancelToken>,
    canceled: bool,
}

impl TupleStream {
    pub fn new<I>(variables: impl Into<Arc<[Variable]>>, rows: I) -> Self
    where
        I: IntoIterator<Item = Result<QuerySolution, SplinkError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            variables: variables.into(),
            rows: Box::new(rows.into_iter()),
            cancel: None,
            canceled: false,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn columns(&self) -> usize {
        self.variables.len()
    }

    pub fn was_canceled(&self) -> bool {
        self.canceled
    }
}

impl Iterator for TupleStream {
    type Item = Result<QuerySolution, SplinkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.canceled || check(&self.cancel) {
            self.canceled = true;
            return None;
        }
        self.rows.next()
    }
}

impl Debug for TupleStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TupleStream")
            .field("variables", &self.variables)
            .field("canceled", &self.canceled)
            .finish_non_exhaustive()
    }
}

/// Statements of a CONSTRUCT or DESCRIBE result, with the namespaces the
/// repository declared for them.
pub struct GraphStream {
    namespaces: Vec<Namespace>,
    triples: TripleIter,
    cancel: Option<CancelToken>,
    canceled: bool,
}

impl GraphStream {
    pub fn new<I>(namespaces: Vec<Namespace>, triples: I) -> Self
    where
        I: IntoIterator<Item = Result<Triple, SplinkError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            namespaces,
            triples: Box::new(triples.into_iter()),
            cancel: None,
            canceled: false,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Checks the token and latches the canceled state; used between namespaces.
    pub fn check_canceled(&mut self) -> bool {
        if !self.canceled && check(&self.cancel) {
            self.canceled = true;
        }
        self.canceled
    }

    pub fn was_canceled(&self) -> bool {
        self.canceled
    }
}

impl Iterator for GraphStream {
    type Item = Result<Triple, SplinkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.check_canceled() {
            return None;
        }
        self.triples.next()
    }
}

impl Debug for GraphStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GraphStream")
            .field("namespaces", &self.namespaces)
            .field("canceled", &self.canceled)
            .finish_non_exhaustive()
    }
}

fn check(token: &Option<CancelToken>) -> bool {
    token.as_ref().is_some_and(CancelToken::is_canceled)
}
