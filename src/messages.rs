//! Status, warning and error reporting.
//!
//! The executor and dispatcher report progress through a [`MessageHandler`]
//! rather than writing to a UI directly. Every method returns the text it
//! displayed so hosts and tests can observe exactly what was reported.
//!
//! ```ignore
//! use splink_core::MessageHandler;
//!
//! struct StatusBar;
//!
//! impl MessageHandler for StatusBar {
//!     fn handle_message(&self, text: &str) -> String {
//!         println!("{text}");
//!         text.to_string()
//!     }
//!     fn handle_warning(&self, text: &str) -> String {
//!         self.handle_message(text)
//!     }
//!     fn handle_error(&self, text: &str) -> String {
//!         eprintln!("{text}");
//!         text.to_string()
//!     }
//! }
//! ```

use std::error::Error;

use tracing::{error, info, warn};

pub trait MessageHandler: Send + Sync {
    fn handle_message(&self, text: &str) -> String;

    fn handle_warning(&self, text: &str) -> String;

    fn handle_error(&self, text: &str) -> String;

    /// Report a failure together with the context it happened in.
    fn handle_error_with(&self, error: &dyn Error, text: &str) -> String {
        self.handle_error(&format!("{error}\n{text}"))
    }
}

/// Default handler: forwards every report to `tracing` and returns it unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageAdapter;

impl MessageHandler for MessageAdapter {
    fn handle_message(&self, text: &str) -> String {
        info!(event = "Message", text);
        text.to_string()
    }

    fn handle_warning(&self, text: &str) -> String {
        warn!(event = "Message", text);
        text.to_string()
    }

    fn handle_error(&self, text: &str) -> String {
        error!(event = "Message", text);
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SplinkError;
    use crate::tests::memory::RecordingMessages;

    #[test]
    fn test_adapter_returns_text() {
        let adapter = MessageAdapter;
        assert_eq!(adapter.handle_message("querying..."), "querying...");
        assert_eq!(adapter.handle_warning("careful"), "careful");
        assert_eq!(adapter.handle_error("broken"), "broken");
    }

    #[test]
    fn test_error_with_prepends_error() {
        let adapter = MessageAdapter;
        let err = SplinkError::Evaluation("bad join".to_string());
        assert_eq!(
            adapter.handle_error_with(&err, "SELECT * WHERE {}"),
            "evaluation error: bad join\nSELECT * WHERE {}"
        );
    }

    #[test]
    fn test_error_with_routes_through_handle_error() {
        let recorder = RecordingMessages::new();
        let err = SplinkError::Connectivity("down".to_string());
        recorder.handle_error_with(&err, "ctx");
        assert_eq!(
            recorder.errors(),
            vec!["repository unreachable: down\nctx".to_string()]
        );
    }
}
