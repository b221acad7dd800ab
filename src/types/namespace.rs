use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// A prefix binding as reported by a repository connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub prefix: String,
    /// Long-form namespace URI, including its trailing `#` or `/`.
    pub name: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
        }
    }

    /// The SPARQL declaration for this binding, e.g. `PREFIX too:<http://trebor.org/ns#>`.
    pub fn declaration(&self) -> String {
        format!("PREFIX {}:<{}>", self.prefix, self.name)
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: <{}>", self.prefix, self.name)
    }
}

impl<P: Into<String>, N: Into<String>> From<(P, N)> for Namespace {
    fn from((prefix, name): (P, N)) -> Self {
        Namespace::new(prefix, name)
    }
}
