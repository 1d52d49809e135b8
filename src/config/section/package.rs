//! `[[package]]` and `[[package.component]]` configuration.
//!
//! # Example
//!
//! ```toml
//! [[package]]
//! name = "core"
//! path = "core"              # Package directory (defaults to the name)
//! depends = ["utils"]        # Project modules this one depends on
//!
//! [[package.component]]
//! stanza = "library"         # library | executable | test-suite | benchmark
//! source_dirs = ["src"]
//!
//! [[package.component]]
//! stanza = "executable"
//! name = "app"               # Stanza name (defaults to the package name)
//! target = "core:exe:app"    # Defaults to the stack naming scheme
//! source_dirs = ["app"]
//! ```
//!
//! A package without any `[[package.component]]` gets a single library
//! component with `source_dirs = ["src"]`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::core::{ComponentInfo, StanzaType, default_target};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub name: String,

    /// Package directory. Relative to the project root until loaded.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Project modules this package depends on.
    #[serde(default)]
    pub depends: Vec<String>,

    #[serde(default, rename = "component")]
    pub components: Vec<ComponentConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub stanza: StanzaType,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub target: Option<String>,

    /// Source directories relative to the package directory.
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<PathBuf>,
}

fn default_source_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

impl ComponentConfig {
    pub fn library() -> Self {
        Self {
            stanza: StanzaType::Library,
            name: None,
            target: None,
            source_dirs: default_source_dirs(),
        }
    }

    /// The component's identity within `package`.
    pub fn info(&self, package: &str) -> ComponentInfo {
        let target = self.target.clone().unwrap_or_else(|| {
            default_target(package, self.stanza, self.name.as_deref().unwrap_or(package))
        });
        ComponentInfo::new(package, target, self.stanza)
    }
}

impl PackageConfig {
    /// Package directory (absolute once the config is loaded).
    pub fn dir(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(&self.name))
    }

    /// Every component with its absolute source directories.
    pub fn source_roots(&self) -> impl Iterator<Item = (ComponentInfo, Vec<PathBuf>)> + '_ {
        let dir = self.dir();
        self.components.iter().map(move |component| {
            let roots = component.source_dirs.iter().map(|d| dir.join(d)).collect();
            (component.info(&self.name), roots)
        })
    }

    pub(crate) fn normalize(&mut self, root: &Path) {
        if self.components.is_empty() {
            self.components.push(ComponentConfig::library());
        }
        let dir = root.join(self.dir());
        self.path = Some(crate::utils::path::normalize_path(&dir));
    }

    pub fn validate(&self, index: usize, diag: &mut ConfigDiagnostics) {
        let field = format!("package[{index}]");
        if self.name.trim().is_empty() {
            diag.error(format!("{field}.name"), "package name must not be empty");
        }

        let libraries = self
            .components
            .iter()
            .filter(|c| c.stanza.is_library())
            .count();
        if libraries > 1 {
            diag.error(
                format!("{field}.component"),
                format!("package `{}` declares {libraries} library stanzas", self.name),
            );
        }

        for (i, component) in self.components.iter().enumerate() {
            if component.source_dirs.is_empty() {
                diag.error(
                    format!("{field}.component[{i}].source_dirs"),
                    "at least one source directory is required",
                );
            }
            if let Some(dir) = component.source_dirs.iter().find(|d| d.is_absolute()) {
                diag.error_with_hint(
                    format!("{field}.component[{i}].source_dirs"),
                    format!("`{}` is absolute", dir.display()),
                    "source dirs are relative to the package directory",
                );
            }
        }
    }
}
