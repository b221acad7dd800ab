//! Query metadata produced by the planner.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Query language a text was accepted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Dialect {
    #[strum(serialize = "SPARQL", ascii_case_insensitive)]
    Sparql,
    #[strum(serialize = "SeRQL", ascii_case_insensitive)]
    Serql,
}

/// Result shape of a query, from its top-level form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum QueryShape {
    /// ASK
    Boolean,
    /// SELECT
    Tuple,
    /// CONSTRUCT or DESCRIBE
    Graph,
}

impl QueryShape {
    /// The verb used in progress messages.
    pub fn verb(&self) -> &'static str {
        match self {
            QueryShape::Boolean => "asking",
            QueryShape::Tuple => "querying",
            QueryShape::Graph => "describing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub dialect: Dialect,
    pub shape: QueryShape,
    /// Row limit in effect, whether written by the user or injected.
    pub explicit_limit: Option<u64>,
}

/// A parsed query plus the text to send to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedQuery {
    pub query: ParsedQuery,
    pub text: String,
    pub limit_injected: bool,
}

impl PlannedQuery {
    pub fn dialect(&self) -> Dialect {
        self.query.dialect
    }

    pub fn shape(&self) -> QueryShape {
        self.query.shape
    }

    pub fn effective_limit(&self) -> Option<u64> {
        self.query.explicit_limit
    }
}

/// Per-run settings handed to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    pub include_inferred: bool,
    pub timeout_seconds: Option<u32>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            include_inferred: true,
            timeout_seconds: Some(10),
        }
    }
}
