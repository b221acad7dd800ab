use crate::error::SplinkError;
use crate::types::{Dialect, Namespace, QueryResult, QueryShape};

/// One query as handed to a repository connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest<'a> {
    pub dialect: Dialect,
    pub shape: QueryShape,
    pub text: &'a str,
    pub include_inferred: bool,
    /// Enforced by the connection; expiry surfaces as [`SplinkError::QueryInterrupted`].
    pub timeout_seconds: Option<u32>,
}

/// A session with a SPARQL/SeRQL repository.
///
/// Implementations own transport and timeout enforcement. A result's shape
/// should match `request.shape`.
pub trait RepositoryConnection: Send + Sync {
    fn is_open(&self) -> bool;

    /// Prefix bindings known to the repository.
    fn namespaces(&self) -> Result<Vec<Namespace>, SplinkError>;

    fn evaluate(&self, request: &EvaluationRequest<'_>) -> Result<QueryResult, SplinkError>;
}
