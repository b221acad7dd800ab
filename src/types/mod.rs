//! Data model shared by the canonicalization and query subsystems.
//!
//! Resource string forms:
//! - Short URI: `prefix:local`, e.g. `too:foo`
//! - Long URI: `scheme://path`, optionally bracketed as `<http://trebor.org/ns#foo>`
//! - Blank node: `_:id`
//! - Literal: `"body"`, `"body"@lang` or `"body"^^type`
//!
//! Literal bodies may contain quotes; a body with a line break is written
//! between triple quotes in canonical form.

mod namespace;
mod outcome;
mod query;
mod resource;
mod results;

pub use namespace::Namespace;
pub use outcome::{ExecutionOutcome, ExecutionStats, RowCount};
pub use query::{Dialect, ExecutionOptions, ParsedQuery, PlannedQuery, QueryShape};
pub use resource::{LiteralParts, LiteralSeparator, Resource, ResourceType};
pub use results::{GraphStream, QueryResult, SolutionIter, TripleIter, TupleStream};
