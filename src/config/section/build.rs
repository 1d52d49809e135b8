//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! command = ["stack", "build", "--fast"]          # build tool invocation
//! args = ["--no-run-tests"]                       # appended before the targets
//! non_fatal_warnings = ["--ghc-options=-Wwarn"]   # appended in coordinated rounds
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Build tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Program followed by its fixed arguments.
    pub command: Vec<String>,

    /// Extra arguments placed between the command and the target list.
    pub args: Vec<String>,

    /// Arguments that relax warnings-as-errors for one invocation.
    pub non_fatal_warnings: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["stack".into(), "build".into(), "--fast".into()],
            args: Vec::new(),
            non_fatal_warnings: vec!["--ghc-options=-Wwarn".into()],
        }
    }
}

impl BuildConfig {
    /// Name of the build tool executable.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.program().is_none_or(str::is_empty) {
            diag.error_with_hint(
                "build.command",
                "build command must not be empty",
                "e.g. command = [\"stack\", \"build\"]",
            );
        }
    }

    /// Check that the build tool can be found on `PATH`.
    pub fn validate_program(&self, diag: &mut ConfigDiagnostics) {
        if let Some(program) = self.program()
            && !program.is_empty()
            && which::which(program).is_err()
        {
            diag.error_with_hint(
                "build.command",
                format!("`{program}` not found"),
                "install it or set [build] command to an absolute path",
            );
        }
    }
}
