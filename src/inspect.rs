//! Exploration queries built from a clicked resource, prefix or context.

use tracing::warn;

use crate::types::{Resource, ResourceType};

/// A generated query and whether the registry's prefix declarations should be
/// prepended before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub text: String,
    pub append_prefixes: bool,
}

impl Inspection {
    fn new(text: String, append_prefixes: bool) -> Self {
        Self {
            text,
            append_prefixes,
        }
    }
}

/// Statements around a resource. `None` when the text is not a resource.
pub fn inspect_resource(text: &str) -> Option<Inspection> {
    let Some(resource) = Resource::parse(text) else {
        warn!(event = "Inspect", text, "Not a resource");
        return None;
    };
    let canonical = resource.canonical();
    let inspection = match resource.resource_type() {
        // SeRQL accepts blank node ids in path expressions; SPARQL does not.
        ResourceType::BlankNode => {
            Inspection::new(format!("CONSTRUCT * FROM {{{canonical}}} x {{y}}"), false)
        }
        ResourceType::Literal => Inspection::new(
            format!(
                "SELECT * WHERE {{ ?subject ?predicate ?object FILTER ( ?subject = {canonical} || ?object = {canonical})}}"
            ),
            true,
        ),
        ResourceType::ShortUri | ResourceType::LongUri => {
            Inspection::new(format!("DESCRIBE {canonical}"), true)
        }
    };
    Some(inspection)
}

/// Every statement whose subject or object lies under `prefix`.
///
/// The trailing `:` is optional.
pub fn inspect_prefix(prefix: &str) -> Inspection {
    let prefix = prefix.trim();
    let prefix = prefix.strip_suffix(':').unwrap_or(prefix);
    Inspection::new(
        format!(
            "CONSTRUCT {{?s ?p ?o}} WHERE {{ ?s ?p ?o. FILTER(regex(str(?s), str({prefix}:)) || regex(str(?o), str({prefix}:)))}}"
        ),
        true,
    )
}

/// Every statement of a named graph. Only URIs name contexts.
pub fn inspect_context(context: &str) -> Option<Inspection> {
    match Resource::parse(context) {
        Some(resource)
            if matches!(
                resource.resource_type(),
                ResourceType::ShortUri | ResourceType::LongUri
            ) =>
        {
            Some(Inspection::new(
                format!(
                    "SELECT * FROM {} WHERE {{ ?subject ?predicate ?object }}",
                    resource.canonical()
                ),
                true,
            ))
        }
        _ => {
            warn!(event = "Inspect", context, "Context is not a URI");
            None
        }
    }
}
