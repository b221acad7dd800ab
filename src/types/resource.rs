//! RDF resource values as they appear in editor text and result cells.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};

use crate::classifier;

/// The four shapes a resource string can take.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceType {
    /// `prefix:local`
    ShortUri,
    /// `scheme://path`
    LongUri,
    /// `_:id`
    BlankNode,
    /// `"body"`, `"body"@lang` or `"body"^^type`
    Literal,
}

/// Separator between a literal body and its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString)]
pub enum LiteralSeparator {
    #[strum(serialize = "@")]
    Language,
    #[strum(serialize = "^^")]
    Datatype,
}

/// A literal split into body, separator and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralParts<'a> {
    pub body: &'a str,
    pub separator: Option<LiteralSeparator>,
    pub tag: Option<&'a str>,
}

/// An immutable, classified resource. The canonical form is computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    raw_value: String,
    #[serde(rename = "type")]
    kind: ResourceType,
}

impl Resource {
    pub fn new(raw_value: impl Into<String>, kind: ResourceType) -> Self {
        Self {
            raw_value: raw_value.into(),
            kind,
        }
    }

    /// Classify `text`; `None` when it matches none of the resource shapes.
    pub fn parse(text: &str) -> Option<Self> {
        classifier::parse(text)
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn resource_type(&self) -> ResourceType {
        self.kind
    }

    /// The form of this resource that can be pasted into a query.
    pub fn canonical(&self) -> String {
        match self.kind {
            ResourceType::LongUri => format!("<{}>", self.raw_value),
            ResourceType::Literal => classifier::canonical_literal(&self.raw_value)
                .unwrap_or_else(|| self.raw_value.clone()),
            ResourceType::ShortUri | ResourceType::BlankNode => self.raw_value.clone(),
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.canonical())
    }
}
