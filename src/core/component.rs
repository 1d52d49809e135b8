//! Build target identity.
//!
//! A [`ComponentInfo`] names one stanza of one package together with the
//! target string the build tool understands. Values are immutable and totally
//! ordered so that target sets render into build commands deterministically.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Ordered set of build targets.
pub type TargetSet = BTreeSet<ComponentInfo>;

/// Opaque identity of one open project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(Arc<str>);

impl ProjectId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of build unit within a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StanzaType {
    Library,
    Executable,
    TestSuite,
    Benchmark,
}

impl StanzaType {
    #[inline]
    pub fn is_library(self) -> bool {
        self == Self::Library
    }

    /// Short label used in stack-style target names (`pkg:exe:name`).
    pub fn target_label(self) -> &'static str {
        match self {
            Self::Library => "lib",
            Self::Executable => "exe",
            Self::TestSuite => "test",
            Self::Benchmark => "bench",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Executable => "executable",
            Self::TestSuite => "test-suite",
            Self::Benchmark => "benchmark",
        }
    }
}

/// Identifies a build target: owning package, tool target name and stanza kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentInfo {
    pub package: String,
    pub target: String,
    pub stanza: StanzaType,
}

impl ComponentInfo {
    pub fn new(package: impl Into<String>, target: impl Into<String>, stanza: StanzaType) -> Self {
        Self {
            package: package.into(),
            target: target.into(),
            stanza,
        }
    }

    /// Library component with the stack default target `pkg:lib`.
    #[cfg(test)]
    pub fn library(package: impl Into<String>) -> Self {
        let package = package.into();
        let target = default_target(&package, StanzaType::Library, &package);
        Self::new(package, target, StanzaType::Library)
    }

    #[inline]
    pub fn is_library(&self) -> bool {
        self.stanza.is_library()
    }
}

impl fmt::Display for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

/// Derive the stack target name for a stanza.
///
/// ```text
/// core, library,    core  -> core:lib
/// core, executable, app   -> core:exe:app
/// core, test-suite, spec  -> core:test:spec
/// ```
pub fn default_target(package: &str, stanza: StanzaType, name: &str) -> String {
    match stanza {
        StanzaType::Library => format!("{package}:lib"),
        other => format!("{package}:{}:{name}", other.target_label()),
    }
}

/// Render a target set as a comma-separated list for log lines.
pub fn display_targets(targets: &TargetSet) -> String {
    targets
        .iter()
        .map(|c| c.target.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
