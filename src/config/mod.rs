//! Project configuration management for `hswatch.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── editor     # [editor]
//! │   ├── package    # [[package]] / [[package.component]]
//! │   ├── session    # [[session]]
//! │   └── watch      # [watch]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # Config file discovery
//! └── mod.rs         # ProjectConfig (this file)
//! ```

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{
    BuildConfig, EditorConfig, FILE_PLACEHOLDER, PackageConfig, SessionConfig, WatchConfig,
};
use util::find_config_file;

use crate::core::ComponentInfo;
use crate::log;
use anyhow::{Result, bail};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hswatch.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default, rename = "package")]
    pub packages: Vec<PackageConfig>,

    #[serde(default, rename = "session")]
    pub sessions: Vec<SessionConfig>,
}

impl ProjectConfig {
    /// Find, parse, normalize and validate the config.
    ///
    /// `config` is searched upward from cwd unless absolute. The project root
    /// is the config file's parent directory.
    pub fn load(config: &Path) -> Result<Self> {
        let Some(config_path) = find_config_file(config) else {
            bail!(ConfigError::Validation(format!(
                "config file '{}' not found",
                config.display()
            )));
        };

        let mut loaded = Self::from_path(&config_path)?;
        loaded.finalize(&config_path);
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Set root from the config path and resolve every relative path.
    fn finalize(&mut self, config_path: &Path) {
        self.config_path = crate::utils::path::normalize_path(config_path);
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.normalize_paths(&root);
    }

    fn normalize_paths(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        for package in &mut self.packages {
            package.normalize(root);
        }
        self.editor.normalize(root);
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Every declared component.
    pub fn components(&self) -> impl Iterator<Item = ComponentInfo> + '_ {
        self.packages
            .iter()
            .flat_map(|p| p.components.iter().map(|c| c.info(&p.name)))
    }

    /// Component whose target string is `target`.
    pub fn component(&self, target: &str) -> Option<ComponentInfo> {
        self.components().find(|c| c.target == target)
    }

    pub fn package(&self, name: &str) -> Option<&PackageConfig> {
        self.packages.iter().find(|p| p.name == name)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the project model. Collects all errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.watch.validate(&mut diag);
        self.editor.validate(&mut diag);

        if self.packages.is_empty() {
            diag.error_with_hint(
                "package",
                "no packages declared",
                "add a [[package]] table for each package of the project",
            );
        }

        let mut names = FxHashSet::default();
        for (i, package) in self.packages.iter().enumerate() {
            package.validate(i, &mut diag);
            if !names.insert(package.name.as_str()) {
                diag.error(format!("package[{i}].name"), format!("duplicate package `{}`", package.name));
            }
        }

        for package in &self.packages {
            for dep in &package.depends {
                if !names.contains(dep.as_str()) {
                    diag.warn(
                        format!("package[{}].depends", package.name),
                        format!("`{dep}` is not a project package and is ignored"),
                    );
                }
            }
        }

        let mut targets = FxHashSet::default();
        for component in self.components() {
            if !targets.insert(component.target.clone()) {
                diag.error("package.component.target", format!("duplicate target `{}`", component.target));
            }
        }

        let mut session_targets = FxHashSet::default();
        for (i, session) in self.sessions.iter().enumerate() {
            session.validate(i, targets.contains(&session.target), &mut diag);
            if !session_targets.insert(session.target.as_str()) {
                diag.error(
                    format!("session[{i}].target"),
                    format!("more than one session for `{}`", session.target),
                );
            }
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Check that the build tool is installed. Only commands that build call this.
    pub fn validate_build_tool(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.build.validate_program(&mut diag);
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Write `content` as `hswatch.toml` in a fresh temp dir and load it.
#[cfg(test)]
pub fn test_load_config(content: &str) -> (tempfile::TempDir, ProjectConfig) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hswatch.toml");
    fs::write(&path, content).unwrap();
    let config = ProjectConfig::load(&path).unwrap();
    (dir, config)
}

// ============================================================================
// tests
// ============================================================================
