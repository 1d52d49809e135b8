//! `[editor]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [editor]
//! open = ["app/Main.hs", "core/src/Core.hs"]  # Files treated as open
//! reanalyze = ["hlint", "{file}"]             # Optional re-analysis hook
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Placeholder replaced by the refreshed file's absolute path.
pub const FILE_PLACEHOLDER: &str = "{file}";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Files considered open, relative to the project root.
    pub open: Vec<PathBuf>,

    /// Command run for every re-analyzed file.
    pub reanalyze: Option<Vec<String>>,
}

impl EditorConfig {
    pub(crate) fn normalize(&mut self, root: &Path) {
        self.open = self
            .open
            .iter()
            .map(|p| crate::utils::path::normalize_path(&root.join(p)))
            .collect();
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(hook) = &self.reanalyze {
            if hook.is_empty() {
                diag.error("editor.reanalyze", "hook command must not be empty");
            } else if !hook.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
                diag.warn(
                    "editor.reanalyze",
                    format!("no `{FILE_PLACEHOLDER}` argument; the hook will not see which file changed"),
                );
            }
        }
    }
}
