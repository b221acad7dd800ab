//! Repository export through an `oxrdfio` serializer.

use std::io::Write;
use std::sync::{Arc, Mutex};

use oxrdfio::{RdfFormat, RdfSerializer};
use tracing::info;

use crate::error::SplinkError;
use crate::messages::MessageHandler;
use crate::processor::{ResultProcessor, finished};
use crate::types::{GraphStream, RowCount};

/// Every statement in the repository.
pub const EXPORT_QUERY: &str = "CONSTRUCT {?s ?p ?o} WHERE {?s ?p ?o}";

/// Serializes a graph result in the chosen RDF format, declaring the result's
/// namespaces as prefixes where the format has them. Cancellation is checked
/// before each namespace and statement.
pub struct ExportProcessor<W> {
    writer: Mutex<W>,
    format: RdfFormat,
    messages: Arc<dyn MessageHandler>,
}

impl<W: Write + Send> ExportProcessor<W> {
    pub fn new(writer: W, format: RdfFormat, messages: Arc<dyn MessageHandler>) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
            messages,
        }
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    pub fn into_inner(self) -> Result<W, SplinkError> {
        Ok(self.writer.into_inner()?)
    }

    fn write_graph(&self, statements: &mut GraphStream) -> Result<RowCount, SplinkError> {
        let mut serializer = RdfSerializer::from_format(self.format);
        for namespace in statements.namespaces().to_vec() {
            if statements.check_canceled() {
                return Ok(RowCount::Canceled);
            }
            serializer = serializer
                .with_prefix(namespace.prefix.as_str(), namespace.name.as_str())
                .map_err(|error| {
                    SplinkError::Export(format!(
                        "invalid namespace {} for prefix {}: {error}",
                        namespace.name, namespace.prefix
                    ))
                })?;
        }

        let mut out = self.writer.lock()?;
        let mut serializer = serializer.for_writer(&mut *out);
        let mut count = 0;
        for statement in statements.by_ref() {
            serializer.serialize_triple(&statement?)?;
            count += 1;
        }
        serializer.finish()?.flush()?;
        Ok(finished(statements.was_canceled(), count))
    }
}

impl<W: Write + Send> ResultProcessor for ExportProcessor<W> {
    fn on_graph(&self, statements: &mut GraphStream) -> Result<RowCount, SplinkError> {
        let count = self.write_graph(statements)?;
        match count {
            RowCount::Canceled => {
                self.messages.handle_message("export canceled");
            }
            RowCount::Rows(n) => {
                info!(event = "Export", phase = "Written", format = ?self.format, triples = n);
                self.messages.handle_message(&format!("exported {n} triples"));
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::tests::memory::{RecordingMessages, TOO, graph_result, statements};
    use crate::types::{Namespace, QueryResult};

    fn graph(count: usize) -> GraphStream {
        match graph_result(count) {
            QueryResult::Graph(stream) => stream,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn export_to(format: RdfFormat, messages: &RecordingMessages) -> ExportProcessor<Vec<u8>> {
        ExportProcessor::new(Vec::new(), format, Arc::new(messages.clone()))
    }

    #[test]
    fn test_export_ntriples() {
        let messages = RecordingMessages::new();
        let export = export_to(RdfFormat::NTriples, &messages);

        assert_eq!(export.on_graph(&mut graph(2)).unwrap(), RowCount::Rows(2));

        let text = String::from_utf8(export.into_inner().unwrap()).unwrap();
        insta::assert_snapshot!(text.trim_end(), @r#"
        <http://trebor.org/ns#s0> <http://trebor.org/ns#p> "0"^^<http://www.w3.org/2001/XMLSchema#integer> .
        <http://trebor.org/ns#s1> <http://trebor.org/ns#p> "1"^^<http://www.w3.org/2001/XMLSchema#integer> .
        "#);
        assert_eq!(messages.messages(), vec!["exported 2 triples".to_string()]);
    }

    #[test]
    fn test_export_turtle_declares_prefixes() {
        let messages = RecordingMessages::new();
        let export = export_to(RdfFormat::Turtle, &messages);

        assert_eq!(export.on_graph(&mut graph(2)).unwrap(), RowCount::Rows(2));

        let text = String::from_utf8(export.into_inner().unwrap()).unwrap();
        assert!(text.starts_with(&format!("@prefix too: <{TOO}> .")), "{text}");
    }

    #[test]
    fn test_export_rejects_invalid_namespace() {
        let messages = RecordingMessages::new();
        let export = export_to(RdfFormat::Turtle, &messages);
        let mut stream = GraphStream::new(
            vec![Namespace::new("bad", "not an iri")],
            statements(1).into_iter().map(Ok),
        );

        let err = export.on_graph(&mut stream).unwrap_err();
        assert!(matches!(err, SplinkError::Export(_)), "{err}");
        assert!(messages.messages().is_empty());
        assert!(export.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_export_canceled_before_namespaces() {
        let messages = RecordingMessages::new();
        let export = export_to(RdfFormat::Turtle, &messages);
        let token = CancelToken::new();
        token.cancel();

        let mut stream = graph(10).with_cancel(token);
        assert_eq!(export.on_graph(&mut stream).unwrap(), RowCount::Canceled);
        assert!(export.into_inner().unwrap().is_empty());
        assert_eq!(messages.messages(), vec!["export canceled".to_string()]);
    }
}
