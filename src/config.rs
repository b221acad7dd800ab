use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SplinkError;
use crate::types::ExecutionOptions;

/// Settings that change how queries are planned and run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Rows appended as `LIMIT` to unbounded tuple and boolean queries.
    pub result_limit: Option<u32>,
    pub limit_results: bool,
    /// Enforced by the repository connection; `None` waits indefinitely.
    pub timeout_seconds: Option<u32>,
    pub include_inferred: bool,
    /// Render result URIs in `prefix:local` form where possible.
    pub short_uris: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            result_limit: Some(100),
            limit_results: true,
            timeout_seconds: Some(10),
            include_inferred: true,
            short_uris: true,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(text: &str) -> Result<Self, SplinkError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SplinkError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), SplinkError> {
        if self.result_limit == Some(0) {
            return Err(SplinkError::InvalidConfig(
                "result_limit must be positive; use null for no limit".to_string(),
            ));
        }
        if self.timeout_seconds == Some(0) {
            return Err(SplinkError::InvalidConfig(
                "timeout_seconds must be positive; use null for no timeout".to_string(),
            ));
        }
        Ok(())
    }

    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            include_inferred: self.include_inferred,
            timeout_seconds: self.timeout_seconds,
        }
    }
}
