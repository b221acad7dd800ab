use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use super::*;
use crate::tests::memory::{MemoryConnection, RecordingMessages, TOO, trebor_namespaces};
use crate::types::{Dialect, Namespace, RowCount};


const TUPLE_QUERY: &str = "SELECT * WHERE {?s too:p ?o}";

fn connection() -> Arc<MemoryConnection> {
    Arc::new(MemoryConnection::new().with_namespaces(trebor_namespaces()))
}

fn dispatcher_for(conn: &Arc<MemoryConnection>) -> (QueryDispatcher, RecordingMessages) {
    let messages = RecordingMessages::new();
    let dispatcher = QueryDispatcher::new(conn.clone(), ClientConfig::default())
        .unwrap()
        .with_messages(Arc::new(messages.clone()));
    dispatcher.refresh_namespaces().unwrap();
    (dispatcher, messages)
}

/// Writer whose bytes stay readable after the export worker drops it.
#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_not_connected() {
    let conn = connection();
    let (dispatcher, messages) = dispatcher_for(&conn);
    conn.close();

    assert!(dispatcher.submit(TUPLE_QUERY, true, true).is_none());
    assert_eq!(messages.errors(), vec!["not connected"]);
    assert!(conn.requests().is_empty());
    assert_eq!(dispatcher.last_query(), None);
    assert!(dispatcher.is_submit_enabled());
}

#[test]
fn test_first_submit_loads_namespaces() {
    let conn = connection();
    let messages = RecordingMessages::new();
    let dispatcher = QueryDispatcher::new(conn.clone(), ClientConfig::default())
        .unwrap()
        .with_messages(Arc::new(messages.clone()));
    assert!(dispatcher.namespaces().snapshot().unwrap().is_empty());

    dispatcher
        .submit(TUPLE_QUERY, true, false)
        .unwrap()
        .join()
        .unwrap();

    assert!(conn.texts()[0].starts_with("PREFIX too:<http://trebor.org/ns#>\n"));
    assert_eq!(dispatcher.namespaces().snapshot().unwrap().len(), 2);
    assert!(messages.errors().is_empty());
}

#[test]
fn test_refresh_replaces_loaded_namespaces() {
    let conn = connection();
    let (dispatcher, _) = dispatcher_for(&conn);
    conn.set_namespaces(vec![Namespace::new("ex", "http://example.org/")]);

    dispatcher.submit(TUPLE_QUERY, true, false).unwrap().join().unwrap();
    assert!(conn.texts()[0].starts_with("PREFIX too:"));

    dispatcher.refresh_namespaces().unwrap();
    dispatcher.submit(TUPLE_QUERY, true, false).unwrap().join().unwrap();
    assert!(conn.texts()[1].starts_with("PREFIX ex:<http://example.org/>\n"));
}

#[test]
fn test_submit_appends_prefixes() {
    let conn = connection();
    let (dispatcher, _) = dispatcher_for(&conn);

    let outcome = dispatcher
        .submit(TUPLE_QUERY, true, false)
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(outcome.row_count(), Some(RowCount::Rows(3)));
    insta::assert_snapshot!(conn.texts()[0], @r"
    PREFIX too:<http://trebor.org/ns#>
    PREFIX xsd:<http://www.w3.org/2001/XMLSchema#>
    SELECT * WHERE {?s too:p ?o}
    LIMIT 100
    ");
}

#[test]
fn test_table_collects_short_uris() {
    let conn = connection();
    let (dispatcher, _) = dispatcher_for(&conn);

    dispatcher
        .submit(TUPLE_QUERY, true, false)
        .unwrap()
        .join()
        .unwrap();
    let table = dispatcher.table().unwrap();
    assert_eq!(table.headers, vec!["subject", "object"]);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[0][0], "too:s0");

    dispatcher.set_short_uris(false).unwrap();
    dispatcher
        .submit(TUPLE_QUERY, true, false)
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(dispatcher.table().unwrap().rows[0][0], format!("{TOO}s0"));
}

#[test]
fn test_setters_apply_to_later_submissions() {
    let conn = connection();
    let (dispatcher, _) = dispatcher_for(&conn);

    dispatcher.set_result_limit(Some(5)).unwrap();
    dispatcher.set_timeout_seconds(None).unwrap();
    dispatcher.set_include_inferred(false).unwrap();
    dispatcher
        .submit("SELECT * WHERE {?s ?p ?o}", false, false)
        .unwrap()
        .join()
        .unwrap();

    let request = &conn.requests()[0];
    assert_eq!(request.text, "SELECT * WHERE {?s ?p ?o}\nLIMIT 5");
    assert_eq!(request.timeout_seconds, None);
    assert!(!request.include_inferred);

    dispatcher.set_limit_results(false).unwrap();
    dispatcher
        .submit("SELECT * WHERE {?s ?p ?o}", false, false)
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(conn.texts()[1], "SELECT * WHERE {?s ?p ?o}");
}

#[test]
fn test_invalid_setting_rejected() {
    let conn = connection();
    let (dispatcher, _) = dispatcher_for(&conn);

    let err = dispatcher.set_result_limit(Some(0)).unwrap_err();
    assert!(matches!(err, SplinkError::InvalidConfig(_)));
    assert_eq!(dispatcher.config().unwrap(), ClientConfig::default());
}

#[test]
fn test_malformed_query_reported() {
    let conn = connection();
    let (dispatcher, messages) = dispatcher_for(&conn);

    let outcome = dispatcher
        .submit("SELEKT nonsense", false, true)
        .unwrap()
        .join()
        .unwrap();

    assert!(outcome.is_failed());
    assert_eq!(messages.errors().len(), 1);
    assert!(messages.errors()[0].contains("SELEKT nonsense"));
    assert!(conn.requests().is_empty());
    assert!(dispatcher.is_submit_enabled());
}

#[test]
fn test_refresh_failure_keeps_registry() {
    let conn = connection();
    let (dispatcher, messages) = dispatcher_for(&conn);
    conn.close();

    assert!(dispatcher.refresh_namespaces().is_err());
    assert_eq!(messages.errors().len(), 1);
    assert_eq!(dispatcher.namespaces().snapshot().unwrap().len(), 2);
}

#[test]
fn test_export_writes_turtle() {
    let conn = connection();
    let (dispatcher, messages) = dispatcher_for(&conn);
    let buffer = SharedBuffer::default();

    let outcome = dispatcher
        .export(buffer.clone(), RdfFormat::Turtle)
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(outcome.row_count(), Some(RowCount::Rows(3)));
    assert!(buffer.text().starts_with(&format!("@prefix too: <{TOO}> .")));
    assert!(messages.messages().contains(&"exported 3 triples".to_string()));
    assert!(conn.texts()[0].ends_with(crate::export::EXPORT_QUERY));
    assert_eq!(dispatcher.last_query(), None);
}

#[test]
fn test_export_ntriples() {
    let conn = connection();
    let (dispatcher, _) = dispatcher_for(&conn);
    let buffer = SharedBuffer::default();

    dispatcher
        .export(buffer.clone(), RdfFormat::NTriples)
        .unwrap()
        .join()
        .unwrap();

    let text = buffer.text();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|line| line.starts_with(&format!("<{TOO}s"))));
}

#[test]
fn test_inspect_blank_node_uses_serql() {
    let conn = connection();
    let (dispatcher, _) = dispatcher_for(&conn);

    dispatcher
        .inspect_resource("_:b1")
        .unwrap()
        .join()
        .unwrap();

    let request = &conn.requests()[0];
    assert_eq!(request.dialect, Dialect::Serql);
    assert_eq!(request.text, "CONSTRUCT * FROM {_:b1} x {y}");
    assert_eq!(dispatcher.last_query().as_deref(), Some("CONSTRUCT * FROM {_:b1} x {y}"));
}

#[test]
fn test_inspect_context_and_prefix() {
    let conn = connection();
    let (dispatcher, messages) = dispatcher_for(&conn);

    let context = dispatcher.inspect_context("too:graph").unwrap().join().unwrap();
    assert!(context.is_completed());
    let prefix = dispatcher.inspect_prefix("too").unwrap().join().unwrap();
    assert!(prefix.is_completed());

    assert_eq!(dispatcher.history_len(), 1);
    assert!(dispatcher.inspect_context("\"not a graph\"").is_none());
    assert_eq!(messages.warnings(), vec!["not a context: \"not a graph\""]);
}

#[test]
fn test_inspect_unclassified_submits_nothing() {
    let conn = connection();
    let (dispatcher, messages) = dispatcher_for(&conn);

    assert!(dispatcher.inspect_resource("two words").is_none());
    assert!(conn.requests().is_empty());
    assert_eq!(messages.warnings(), vec!["not a resource: two words"]);
    assert!(messages.errors().is_empty());
}
