// src/lib.rs
pub use cancel::CancelToken;
pub use classifier::{canonicalize, classify, literal_parts};
pub use config::ClientConfig;
pub use connection::{EvaluationRequest, RepositoryConnection};
pub use dispatcher::{QueryDispatcher, Submission};
pub use error::SplinkError;
pub use executor::QueryExecutor;
pub use export::{EXPORT_QUERY, ExportProcessor};
pub use inspect::{Inspection, inspect_context, inspect_prefix, inspect_resource};
pub use messages::{MessageAdapter, MessageHandler};
pub use namespaces::{NamespaceRegistry, NamespaceStore};
pub use oxrdfio::RdfFormat;
pub use planner::plan;
pub use processor::{CountingProcessor, ResultProcessor, Table, TabularProcessor};
pub use types::*;

mod cancel;
mod classifier;
mod config;
mod connection;
mod dispatcher;
mod error;
mod executor;
mod export;
mod inspect;
mod messages;
mod namespaces;
mod planner;
mod processor;
mod serql;
mod timers;
mod types;
