//! Consumers of typed query results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use oxrdf::Term;
use serde::Serialize;

use crate::error::SplinkError;
use crate::namespaces::{NamespaceRegistry, NamespaceStore};
use crate::types::{GraphStream, RowCount, TupleStream};

/// Receives the result of one query run.
///
/// The defaults drain and count, so an implementation only overrides the
/// shapes it renders. Streams stop early once canceled; report that as
/// [`RowCount::Canceled`].
pub trait ResultProcessor: Send + Sync {
    fn on_tuple(&self, rows: &mut TupleStream) -> Result<RowCount, SplinkError> {
        let mut count = 0;
        for row in rows.by_ref() {
            row?;
            count += 1;
        }
        Ok(finished(rows.was_canceled(), count))
    }

    fn on_graph(&self, statements: &mut GraphStream) -> Result<RowCount, SplinkError> {
        let mut count = 0;
        for statement in statements.by_ref() {
            statement?;
            count += 1;
        }
        Ok(finished(statements.was_canceled(), count))
    }

    fn on_boolean(&self, value: bool) -> bool {
        value
    }
}

pub(crate) fn finished(canceled: bool, count: usize) -> RowCount {
    if canceled {
        RowCount::Canceled
    } else {
        RowCount::Rows(count)
    }
}

/// Drains every result and keeps only the count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountingProcessor;

impl ResultProcessor for CountingProcessor {}

/// Header and cells of the last result, ready for a table widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub answer: Option<bool>,
}

const GRAPH_HEADERS: [&str; 3] = ["subject", "predicate", "object"];

/// Collects results as strings, abbreviating URIs through the namespace registry.
#[derive(Debug)]
pub struct TabularProcessor {
    namespaces: NamespaceStore,
    short_uris: AtomicBool,
    table: Mutex<Table>,
}

impl TabularProcessor {
    pub fn new(namespaces: NamespaceStore, short_uris: bool) -> Self {
        Self {
            namespaces,
            short_uris: AtomicBool::new(short_uris),
            table: Mutex::new(Table::default()),
        }
    }

    pub fn set_short_uris(&self, short_uris: bool) {
        self.short_uris.store(short_uris, Ordering::Relaxed);
    }

    pub fn table(&self) -> Result<Table, SplinkError> {
        Ok(self.table.lock()?.clone())
    }

    fn renderer(&self) -> Result<Renderer, SplinkError> {
        let registry = if self.short_uris.load(Ordering::Relaxed) {
            Some(self.namespaces.snapshot()?)
        } else {
            None
        };
        Ok(Renderer { registry })
    }

    fn publish(&self, table: Table) -> Result<(), SplinkError> {
        *self.table.lock()? = table;
        Ok(())
    }
}

struct Renderer {
    registry: Option<Arc<NamespaceRegistry>>,
}

impl Renderer {
    fn cell(&self, term: Option<&Term>) -> String {
        let Some(term) = term else {
            return String::new();
        };
        let text = match term {
            Term::NamedNode(node) => node.as_str().to_string(),
            other => other.to_string(),
        };
        match &self.registry {
            Some(registry) => registry.shrink(&text),
            None => text,
        }
    }
}

impl ResultProcessor for TabularProcessor {
    fn on_tuple(&self, rows: &mut TupleStream) -> Result<RowCount, SplinkError> {
        let renderer = self.renderer()?;
        let variables = rows.variables().to_vec();
        let mut table = Table {
            headers: variables.iter().map(|v| v.as_str().to_string()).collect(),
            ..Table::default()
        };
        for row in rows.by_ref() {
            let solution = row?;
            table.rows.push(
                variables
                    .iter()
                    .map(|v| renderer.cell(solution.get(v)))
                    .collect(),
            );
        }
        let count = finished(rows.was_canceled(), table.rows.len());
        self.publish(table)?;
        Ok(count)
    }

    fn on_graph(&self, statements: &mut GraphStream) -> Result<RowCount, SplinkError> {
        let renderer = self.renderer()?;
        let mut table = Table {
            headers: GRAPH_HEADERS.iter().map(|h| h.to_string()).collect(),
            ..Table::default()
        };
        for statement in statements.by_ref() {
            let triple = statement?;
            let subject = Term::from(triple.subject);
            let predicate = Term::from(triple.predicate);
            table.rows.push(vec![
                renderer.cell(Some(&subject)),
                renderer.cell(Some(&predicate)),
                renderer.cell(Some(&triple.object)),
            ]);
        }
        let count = finished(statements.was_canceled(), table.rows.len());
        self.publish(table)?;
        Ok(count)
    }

    fn on_boolean(&self, value: bool) -> bool {
        let table = Table {
            answer: Some(value),
            ..Table::default()
        };
        if let Ok(mut current) = self.table.lock() {
            *current = table;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::tests::memory::{graph_result, trebor_namespaces, tuple_result};
    use crate::types::QueryResult;
    use insta::assert_json_snapshot;

    fn store() -> NamespaceStore {
        NamespaceStore::new(NamespaceRegistry::from_namespaces(trebor_namespaces()))
    }

    fn tuple(count: usize) -> TupleStream {
        match tuple_result(count) {
            QueryResult::Tuple(stream) => stream,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn graph(count: usize) -> GraphStream {
        match graph_result(count) {
            QueryResult::Graph(stream) => stream,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_counting_processor() {
        assert_eq!(
            CountingProcessor.on_tuple(&mut tuple(4)).unwrap(),
            RowCount::Rows(4)
        );
        assert_eq!(
            CountingProcessor.on_graph(&mut graph(2)).unwrap(),
            RowCount::Rows(2)
        );
        assert!(!CountingProcessor.on_boolean(false));
    }

    #[test]
    fn test_counting_processor_canceled() {
        let token = CancelToken::new();
        token.cancel();
        let mut stream = graph(5).with_cancel(token);
        assert_eq!(
            CountingProcessor.on_graph(&mut stream).unwrap(),
            RowCount::Canceled
        );
    }

    #[test]
    fn test_tabular_tuple_shrinks_uris() {
        let processor = TabularProcessor::new(store(), true);
        assert_eq!(processor.on_tuple(&mut tuple(2)).unwrap(), RowCount::Rows(2));
        assert_json_snapshot!(processor.table().unwrap(), @r#"
        {
          "headers": [
            "subject",
            "object"
          ],
          "rows": [
            [
              "too:s0",
              "\"value 0\""
            ],
            [
              "too:s1",
              "\"value 1\""
            ]
          ],
          "answer": null
        }
        "#);
    }

    #[test]
    fn test_tabular_graph_long_uris() {
        let processor = TabularProcessor::new(store(), false);
        assert_eq!(processor.on_graph(&mut graph(1)).unwrap(), RowCount::Rows(1));
        let table = processor.table().unwrap();
        assert_eq!(table.headers, vec!["subject", "predicate", "object"]);
        assert_eq!(
            table.rows,
            vec![vec![
                "http://trebor.org/ns#s0".to_string(),
                "http://trebor.org/ns#p".to_string(),
                "\"0\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_string(),
            ]]
        );
    }

    #[test]
    fn test_tabular_graph_shrinks_datatypes() {
        let processor = TabularProcessor::new(store(), true);
        processor.on_graph(&mut graph(1)).unwrap();
        assert_eq!(
            processor.table().unwrap().rows[0],
            vec!["too:s0", "too:p", "\"0\"^^xsd:integer"]
        );
    }

    #[test]
    fn test_tabular_boolean() {
        let processor = TabularProcessor::new(store(), true);
        assert!(processor.on_boolean(true));
        assert_eq!(processor.table().unwrap().answer, Some(true));
    }
}
