//! External command execution utilities.
//!
//! Runs the build tool and editor hooks, and filters their output for logs.
//!
//! ```ignore
//! let output = Cmd::from_slice(&["stack", "build"]).cwd(root).output()?;
//! if !output.status.success() {
//!     log!("build"; "{}", format_error("stack", &output, &BUILD_TOOL_FILTER));
//! }
//! ```

use crate::log;
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Child, Command, Output, Stdio},
    sync::OnceLock,
};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    /// Create from a command array (e.g., `["stack", "build"]`).
    ///
    /// Empty arguments are dropped.
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter().map(|s| s.as_ref());
        let program = iter.next().map(OsStr::to_owned).unwrap_or_default();
        let args = iter.filter(|s| !s.is_empty()).map(OsStr::to_owned).collect();
        Self {
            program,
            args,
            cwd: None,
        }
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Program followed by its arguments, for log lines.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute the command and return its output regardless of exit status.
    ///
    /// Errors only when the process could not be spawned.
    pub fn output(self) -> Result<Output> {
        let name = self.program.to_string_lossy().to_string();
        self.spawn()?
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{name}`"))
    }

    /// Start the command with stdout and stderr piped.
    pub fn spawn(self) -> Result<Child> {
        let name = self.program.to_string_lossy().to_string();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        cmd.spawn()
            .with_context(|| format!("Failed to execute `{name}`"))
    }
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known warnings or irrelevant messages.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if a line should be skipped.
    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Lines of `output` that pass the filter, ANSI codes stripped.
    pub fn retain(&self, output: &str) -> Vec<String> {
        output
            .lines()
            .map(|line| strip_ansi(line).trim().to_owned())
            .filter(|line| !line.is_empty() && !self.should_skip(line))
            .collect()
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines = self.retain(output);
        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Progress noise printed by stack and cabal on every build.
pub const BUILD_TOOL_FILTER: FilterRule = FilterRule::new(&[
    "Building library",
    "Preprocessing library",
    "Configuring",
    "Completed",
    "Resolving dependencies",
    "Up to date",
]);

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("static regex"));
    re.replace_all(s, "")
}

/// Format error message for failed command.
pub fn format_error(name: &str, output: &Output, filter: &FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}", output.status);

    let stderr_lines = filter.retain(&stderr);
    if !stderr_lines.is_empty() {
        msg.push('\n');
        msg.push_str(&stderr_lines.join("\n"));
    }

    let stdout_lines = filter.retain(&stdout);
    if !stdout_lines.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(&stdout_lines.join("\n"));
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================
