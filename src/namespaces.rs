//! Namespace prefix registry and its refreshable store.
//!
//! A [`NamespaceRegistry`] is an immutable snapshot of the repository's prefix
//! bindings. [`NamespaceStore`] publishes snapshots: a refresh builds a new
//! registry and swaps it in, so a query holding the previous `Arc` finishes on
//! the bindings it started with.

use std::sync::{Arc, Mutex, RwLock};

use bimap::BiMap;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::classifier;
use crate::connection::RepositoryConnection;
use crate::error::SplinkError;
use crate::types::{LiteralSeparator, Namespace};

static LOCAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]*$").expect("valid local name pattern"));

/// Bidirectional namespace URI <-> prefix mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceRegistry {
    // left: namespace URI, right: prefix
    bindings: BiMap<String, String>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry; on a duplicate namespace or prefix the first binding wins.
    pub fn from_namespaces<I>(namespaces: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Namespace>,
    {
        let mut bindings = BiMap::new();
        for ns in namespaces.into_iter().map(Into::into) {
            if let Err((name, prefix)) = bindings.insert_no_overwrite(ns.name, ns.prefix) {
                warn!(
                    event = "Namespaces",
                    phase = "Load",
                    prefix = %prefix,
                    namespace = %name,
                    "Ignoring duplicate namespace binding"
                );
            }
        }
        Self { bindings }
    }

    /// Fetch the bindings of an open connection.
    pub fn load(connection: &dyn RepositoryConnection) -> Result<Self, SplinkError> {
        if !connection.is_open() {
            return Err(SplinkError::Connectivity("connection is closed".to_string()));
        }
        let namespaces = connection.namespaces().map_err(|err| match err {
            SplinkError::Connectivity(_) => err,
            other => SplinkError::Connectivity(other.to_string()),
        })?;
        let registry = Self::from_namespaces(namespaces);
        debug!(
            event = "Namespaces",
            phase = "Loaded",
            count = registry.len()
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.bindings.get_by_left(namespace).map(String::as_str)
    }

    pub fn namespace_for(&self, prefix: &str) -> Option<&str> {
        self.bindings.get_by_right(prefix).map(String::as_str)
    }

    /// All bindings, ordered by prefix.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.bindings
            .iter()
            .sorted_by(|a, b| a.1.cmp(b.1))
            .map(|(name, prefix)| Namespace::new(prefix, name))
            .collect()
    }

    /// One `PREFIX p:<ns>` line per binding, ordered by prefix.
    pub fn prefix_declarations(&self) -> String {
        self.namespaces()
            .iter()
            .map(|ns| format!("{}\n", ns.declaration()))
            .collect()
    }

    /// Abbreviate a long URI, or the datatype of a literal.
    ///
    /// Anything that cannot be abbreviated is returned unchanged.
    pub fn shrink(&self, text: &str) -> String {
        let value = classifier::normalize(text);
        if classifier::is_long_uri(value) {
            return self
                .shrink_uri(value)
                .unwrap_or_else(|| text.to_string());
        }
        self.rewrite_datatype(value, |tag| {
            let inner = classifier::normalize(tag);
            if classifier::is_long_uri(inner) {
                self.shrink_uri(inner)
            } else {
                None
            }
        })
        .unwrap_or_else(|| text.to_string())
    }

    /// Expand a short URI, or the datatype of a literal into `<…>` form.
    ///
    /// Unknown prefixes are returned unchanged.
    pub fn grow(&self, text: &str) -> String {
        let value = classifier::normalize(text);
        if classifier::is_short_uri(value) {
            return self.grow_uri(value).unwrap_or_else(|| text.to_string());
        }
        self.rewrite_datatype(value, |tag| {
            if classifier::is_short_uri(tag) {
                self.grow_uri(tag).map(|long| format!("<{long}>"))
            } else {
                None
            }
        })
        .unwrap_or_else(|| text.to_string())
    }

    fn shrink_uri(&self, uri: &str) -> Option<String> {
        let split = uri
            .rfind('#')
            .or_else(|| uri.rfind('/'))
            .or_else(|| uri.rfind(':'))?;
        let (name, local) = uri.split_at(split + 1);
        if !LOCAL_NAME.is_match(local) {
            return None;
        }
        let short = format!("{}:{local}", self.prefix_for(name)?);
        classifier::is_short_uri(&short).then_some(short)
    }

    fn grow_uri(&self, short: &str) -> Option<String> {
        let (prefix, local) = short.split_once(':')?;
        Some(format!("{}{local}", self.namespace_for(prefix)?))
    }

    // Replaces the `^^` tag of a literal, keeping the body exactly as written.
    fn rewrite_datatype<F>(&self, value: &str, rewrite: F) -> Option<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let parts = classifier::literal_parts(value)?;
        let tag = match (parts.separator, parts.tag) {
            (Some(LiteralSeparator::Datatype), Some(tag)) => tag,
            _ => return None,
        };
        let replacement = rewrite(tag)?;
        let head = value.strip_suffix(tag)?;
        Some(format!("{head}{replacement}"))
    }
}

/// The published registry snapshot, refreshed one reload at a time.
#[derive(Debug, Clone, Default)]
pub struct NamespaceStore {
    current: Arc<RwLock<Arc<NamespaceRegistry>>>,
    reload: Arc<Mutex<()>>,
}

impl NamespaceStore {
    pub fn new(registry: NamespaceRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
            reload: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> Result<Arc<NamespaceRegistry>, SplinkError> {
        Ok(Arc::clone(&*self.current.read()?))
    }

    /// Load a fresh registry from `connection` and publish it.
    ///
    /// Concurrent refreshes are serialized; on failure the current snapshot stays.
    pub fn refresh(
        &self,
        connection: &dyn RepositoryConnection,
    ) -> Result<Arc<NamespaceRegistry>, SplinkError> {
        let _reload = self.reload.lock()?;
        let fresh = Arc::new(NamespaceRegistry::load(connection)?);
        *self.current.write()? = Arc::clone(&fresh);
        info!(
            event = "Namespaces",
            phase = "Refreshed",
            count = fresh.len()
        );
        Ok(fresh)
    }
}
