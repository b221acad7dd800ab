use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use oxrdfio::RdfFormat;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::ClientConfig;
use crate::connection::RepositoryConnection;
use crate::error::SplinkError;
use crate::executor::QueryExecutor;
use crate::export::{EXPORT_QUERY, ExportProcessor};
use crate::inspect::{self, Inspection};
use crate::messages::{MessageAdapter, MessageHandler};
use crate::namespaces::{NamespaceRegistry, NamespaceStore};
use crate::processor::{ResultProcessor, Table, TabularProcessor};
use crate::types::ExecutionOutcome;

/// Submitted query texts, most recent last.
///
/// `last` is the query currently shown; `stack` holds the ones before it.
#[derive(Debug, Default)]
struct History {
    last: Option<String>,
    stack: Vec<String>,
}

impl History {
    fn remember(&mut self, query: &str) {
        if let Some(previous) = self.last.replace(query.to_string()) {
            self.stack.push(previous);
        }
    }

    fn back(&mut self) -> Option<String> {
        let query = self.stack.pop()?;
        self.last = Some(query.clone());
        Some(query)
    }
}

/// In-flight bookkeeping shared with the worker threads.
#[derive(Debug, Default)]
struct Controls {
    running: AtomicUsize,
    current: Mutex<Option<CancelToken>>,
    spawned: AtomicU64,
}

/// Marks one run in flight; dropping it re-enables the controls, also when
/// the worker unwinds.
struct RunGuard {
    controls: Arc<Controls>,
}

impl RunGuard {
    fn start(controls: &Arc<Controls>) -> Self {
        controls.running.fetch_add(1, Ordering::SeqCst);
        Self {
            controls: Arc::clone(controls),
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.controls.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a query running on a worker thread.
#[derive(Debug)]
pub struct Submission<T = ExecutionOutcome> {
    handle: JoinHandle<T>,
    cancel: CancelToken,
}

impl<T> Submission<T> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end.
    pub fn join(self) -> Result<T, SplinkError> {
        self.handle
            .join()
            .map_err(|_| SplinkError::Evaluation("query worker panicked".to_string()))
    }
}

/// Front door of the client: plans and runs queries off the calling thread,
/// keeps the back history and tracks whether new submissions are allowed.
pub struct QueryDispatcher {
    connection: Arc<dyn RepositoryConnection>,
    namespaces: NamespaceStore,
    namespaces_loaded: AtomicBool,
    config: RwLock<ClientConfig>,
    messages: Arc<dyn MessageHandler>,
    processor: Arc<dyn ResultProcessor>,
    table: Arc<TabularProcessor>,
    history: Mutex<History>,
    controls: Arc<Controls>,
}

impl QueryDispatcher {
    /// Results go to a [`TabularProcessor`] and reports to a [`MessageAdapter`]
    /// until replaced. The namespace registry is loaded from the connection
    /// before the first submission.
    pub fn new(
        connection: Arc<dyn RepositoryConnection>,
        config: ClientConfig,
    ) -> Result<Self, SplinkError> {
        config.validate()?;
        let namespaces = NamespaceStore::new(NamespaceRegistry::new());
        let table = Arc::new(TabularProcessor::new(namespaces.clone(), config.short_uris));
        Ok(Self {
            connection,
            namespaces,
            namespaces_loaded: AtomicBool::new(false),
            config: RwLock::new(config),
            messages: Arc::new(MessageAdapter),
            processor: table.clone(),
            table,
            history: Mutex::new(History::default()),
            controls: Arc::new(Controls::default()),
        })
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageHandler>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn ResultProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn namespaces(&self) -> &NamespaceStore {
        &self.namespaces
    }

    pub fn config(&self) -> Result<ClientConfig, SplinkError> {
        Ok(self.config.read()?.clone())
    }

    /// Rows collected by the built-in table processor.
    pub fn table(&self) -> Result<Table, SplinkError> {
        self.table.table()
    }

    /// Reload the namespace registry from the connection.
    ///
    /// A failure is reported and leaves the current registry in place.
    pub fn refresh_namespaces(&self) -> Result<Arc<NamespaceRegistry>, SplinkError> {
        self.namespaces_loaded.store(true, Ordering::SeqCst);
        self.namespaces
            .refresh(self.connection.as_ref())
            .inspect_err(|error| {
                self.messages
                    .handle_error_with(error, "could not load namespaces");
            })
    }

    /// Plan and run `text` on a worker thread.
    ///
    /// With `append_prefixes` the registry's `PREFIX` declarations are put in
    /// front of the text. With `remember` the previously submitted query is
    /// pushed onto the back history. Returns `None` when nothing was started.
    pub fn submit(&self, text: &str, append_prefixes: bool, remember: bool) -> Option<Submission> {
        if !self.connection.is_open() {
            self.messages.handle_error("not connected");
            return None;
        }
        self.ensure_namespaces();

        let query = if append_prefixes {
            let registry = self.report(self.namespaces.snapshot())?;
            format!("{}{text}", registry.prefix_declarations())
        } else {
            text.to_string()
        };

        if remember {
            self.report(self.history.lock().map_err(SplinkError::from))?
                .remember(&query);
        }

        self.spawn(query, Arc::clone(&self.processor))
    }

    /// Resubmit the query before the current one. A no-op on an empty history.
    pub fn back(&self) -> Option<Submission> {
        let previous = self
            .report(self.history.lock().map_err(SplinkError::from))?
            .back()?;
        debug!(event = "History", phase = "Back");
        self.submit(&previous, false, false)
    }

    /// Run the current query again without touching the history.
    pub fn resubmit(&self) -> Option<Submission> {
        let last = self
            .report(self.history.lock().map_err(SplinkError::from))?
            .last
            .clone()?;
        self.submit(&last, false, false)
    }

    pub fn last_query(&self) -> Option<String> {
        self.history.lock().ok()?.last.clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().map_or(0, |history| history.stack.len())
    }

    /// Ask the most recent run to stop at its next check.
    pub fn cancel_current(&self) {
        if let Ok(current) = self.controls.current.lock() {
            if let Some(token) = current.as_ref() {
                info!(event = "Query", phase = "CancelRequested");
                token.cancel();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.controls.running.load(Ordering::SeqCst) > 0
    }

    pub fn is_submit_enabled(&self) -> bool {
        !self.is_running()
    }

    pub fn is_back_enabled(&self) -> bool {
        self.is_submit_enabled() && self.history_len() > 0
    }

    pub fn inspect_resource(&self, text: &str) -> Option<Submission> {
        let Some(inspection) = inspect::inspect_resource(text) else {
            self.messages.handle_warning(&format!("not a resource: {text}"));
            return None;
        };
        self.submit_inspection(inspection)
    }

    pub fn inspect_prefix(&self, prefix: &str) -> Option<Submission> {
        self.submit_inspection(inspect::inspect_prefix(prefix))
    }

    pub fn inspect_context(&self, context: &str) -> Option<Submission> {
        let Some(inspection) = inspect::inspect_context(context) else {
            self.messages.handle_warning(&format!("not a context: {context}"));
            return None;
        };
        self.submit_inspection(inspection)
    }

    /// Write every statement of the repository to `writer` in `format`.
    pub fn export<W>(&self, writer: W, format: RdfFormat) -> Option<Submission>
    where
        W: Write + Send + 'static,
    {
        if !self.connection.is_open() {
            self.messages.handle_error("not connected");
            return None;
        }
        self.ensure_namespaces();
        let registry = self.report(self.namespaces.snapshot())?;
        let query = format!("{}{EXPORT_QUERY}", registry.prefix_declarations());
        let processor = Arc::new(ExportProcessor::new(writer, format, Arc::clone(&self.messages)));
        self.spawn(query, processor)
    }

    /// Applies to later submissions; `None` disables the limit.
    pub fn set_result_limit(&self, limit: Option<u32>) -> Result<(), SplinkError> {
        self.update(|config| config.result_limit = limit)
    }

    pub fn set_limit_results(&self, enabled: bool) -> Result<(), SplinkError> {
        self.update(|config| config.limit_results = enabled)
    }

    pub fn set_timeout_seconds(&self, timeout: Option<u32>) -> Result<(), SplinkError> {
        self.update(|config| config.timeout_seconds = timeout)
    }

    pub fn set_include_inferred(&self, include: bool) -> Result<(), SplinkError> {
        self.update(|config| config.include_inferred = include)
    }

    pub fn set_short_uris(&self, short_uris: bool) -> Result<(), SplinkError> {
        self.update(|config| config.short_uris = short_uris)?;
        self.table.set_short_uris(short_uris);
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut ClientConfig)) -> Result<(), SplinkError> {
        let mut config = self.config.write()?;
        let mut next = config.clone();
        change(&mut next);
        next.validate()?;
        *config = next;
        Ok(())
    }

    // A failed first load is reported once; the empty registry stays until an
    // explicit refresh.
    fn ensure_namespaces(&self) {
        if !self.namespaces_loaded.load(Ordering::SeqCst) && self.refresh_namespaces().is_err() {
            debug!(event = "Namespaces", phase = "Load", "Continuing with an empty registry");
        }
    }

    fn submit_inspection(&self, inspection: Inspection) -> Option<Submission> {
        self.submit(&inspection.text, inspection.append_prefixes, true)
    }

    fn report<T>(&self, result: Result<T, SplinkError>) -> Option<T> {
        result
            .inspect_err(|error| {
                self.messages.handle_error_with(error, "query not submitted");
            })
            .ok()
    }

    fn spawn(&self, query: String, processor: Arc<dyn ResultProcessor>) -> Option<Submission> {
        let config = self.report(self.config())?;
        let cancel = CancelToken::new();
        if let Ok(mut current) = self.controls.current.lock() {
            *current = Some(cancel.clone());
        }

        let guard = RunGuard::start(&self.controls);
        let id = self.controls.spawned.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::clone(&self.connection);
        let messages = Arc::clone(&self.messages);
        let token = cancel.clone();

        let spawned = thread::Builder::new()
            .name(format!("splink-query-{id}"))
            .spawn(move || {
                let _guard = guard;
                let executor =
                    QueryExecutor::new(connection.as_ref(), processor.as_ref(), messages.as_ref());
                panic::catch_unwind(AssertUnwindSafe(|| {
                    executor.perform(&query, &config, &token)
                }))
                .unwrap_or_else(|_| {
                    warn!(event = "Query", phase = "Panicked");
                    let outcome = ExecutionOutcome::Failed {
                        error: SplinkError::Evaluation("query worker panicked".to_string()),
                        query,
                    };
                    executor.report(&outcome);
                    outcome
                })
            });

        match spawned {
            Ok(handle) => Some(Submission { handle, cancel }),
            Err(error) => {
                warn!(event = "Query", phase = "Spawn", error = %error);
                self.messages
                    .handle_error_with(&SplinkError::from(error), "could not start query worker");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
