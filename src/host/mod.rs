//! Host collaborators consumed by the rebuild coordinator.
//!
//! The coordinator never owns the project model. File ownership, the watch
//! list, running sessions, open files and the module graph all come through
//! the traits below.
//!
//! # Module Structure
//!
//! - `graph` - Module dependency graph (forward/reverse)
//! - `manifest` - `hswatch.toml`-driven project host
//! - `session` - Child-process interactive sessions
//! - `stamp` - Analysis cache for open files

pub mod graph;
pub mod manifest;
pub mod session;
pub mod stamp;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::core::{ComponentInfo, ProjectId};

pub use graph::ModuleGraph;
pub use manifest::ManifestProject;

/// Maps a source file to the build target that owns it.
pub trait ComponentRegistry: Send + Sync {
    /// Owning component of `file`, or `None` if the file is untracked.
    fn resolve_component(&self, file: &Path) -> Option<ComponentInfo>;
}

/// A live interactive evaluation process tied to one build target.
pub trait Session: Send + Sync {
    /// Stable identity used to deduplicate restarts.
    fn id(&self) -> &str;

    /// The target this session was started for.
    fn component(&self) -> &ComponentInfo;

    /// Stop and start the session again.
    fn restart(&self) -> anyhow::Result<()>;
}

/// The project-side services the coordinator consumes.
pub trait ProjectHost: ComponentRegistry {
    fn id(&self) -> ProjectId;

    /// Directory build commands run in.
    fn root(&self) -> &Path;

    /// `true` once the project has been torn down.
    fn is_disposed(&self) -> bool;

    /// Production source files under watch.
    ///
    /// `None` while the file index is not ready.
    fn production_files(&self) -> Option<FxHashSet<PathBuf>>;

    fn running_sessions(&self) -> Vec<Arc<dyn Session>>;

    fn open_files(&self) -> Vec<PathBuf>;

    /// Drop cached location/type information for `file`.
    fn invalidate_file(&self, file: &Path);

    /// Request a fresh analysis of `file`.
    fn reanalyze_file(&self, file: &Path);

    fn module_graph(&self) -> ModuleGraph;
}
