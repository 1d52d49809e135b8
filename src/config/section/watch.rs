//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! debounce_ms = 300                  # Raw event debounce window
//! extensions = ["hs", "lhs", "hsc"]  # Production source extensions
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Milliseconds of quiet before a batch of file events is flushed.
    pub debounce_ms: u64,

    /// File extensions (without dot) counted as production sources.
    pub extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            extensions: vec!["hs".into(), "lhs".into(), "hsc".into()],
        }
    }
}

impl WatchConfig {
    #[inline]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.extensions.is_empty() {
            diag.error("watch.extensions", "at least one source extension is required");
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.starts_with('.')) {
            diag.error_with_hint(
                "watch.extensions",
                format!("`{ext}` starts with a dot"),
                format!("use \"{}\"", ext.trim_start_matches('.')),
            );
        }
        if self.debounce_ms == 0 {
            diag.warn("watch.debounce_ms", "0 disables debouncing; every save triggers a build");
        }
    }
}
