//! `[[session]]` configuration.
//!
//! # Example
//!
//! ```toml
//! [[session]]
//! target = "core:exe:app"
//! command = ["stack", "repl", "core:exe:app"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// One interactive session started in watch mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Build target the session evaluates.
    pub target: String,

    /// Program and arguments, run in the project root.
    #[serde(default)]
    pub command: Vec<String>,
}

impl SessionConfig {
    /// `command`, or `stack repl <target>` when none is configured.
    pub fn argv(&self) -> Vec<String> {
        if self.command.is_empty() {
            vec!["stack".into(), "repl".into(), self.target.clone()]
        } else {
            self.command.clone()
        }
    }

    pub fn validate(&self, index: usize, known: bool, diag: &mut ConfigDiagnostics) {
        if !known {
            diag.error_with_hint(
                format!("session[{index}].target"),
                format!("`{}` is not a component target", self.target),
                "run `hswatch components` to list targets",
            );
        }
    }
}
