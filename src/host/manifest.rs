//! `hswatch.toml`-driven project host.
//!
//! The project model comes straight from the config: packages declare their
//! components and source dirs, sessions name a target and a command.
//!
//! The production-file index is filled by [`ManifestProject::rescan`], which
//! walks every source dir. Until the first scan completes the index is
//! unavailable and change batches are dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use jwalk::WalkDir;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use super::session::ProcessSession;
use super::stamp::AnalysisCache;
use super::{ComponentRegistry, ModuleGraph, ProjectHost, Session};
use crate::config::ProjectConfig;
use crate::core::{ComponentInfo, ProjectId, TargetSet};
use crate::utils::path::{has_extension, normalize_path};

/// A source directory and the component owning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    pub dir: PathBuf,
    pub component: ComponentInfo,
}

pub struct ManifestProject {
    id: ProjectId,
    root: PathBuf,
    extensions: Vec<String>,
    /// Sorted deepest first, so the first match is the longest prefix.
    roots: Vec<SourceRoot>,
    depends: Vec<(String, Vec<String>)>,
    open: Vec<PathBuf>,
    sessions: Vec<Arc<ProcessSession>>,
    index: RwLock<Option<FxHashSet<PathBuf>>>,
    cache: AnalysisCache,
    disposed: AtomicBool,
}

impl ManifestProject {
    pub fn new(config: &ProjectConfig) -> Self {
        let root = config.get_root().to_path_buf();

        let mut roots: Vec<SourceRoot> = config
            .packages
            .iter()
            .flat_map(|package| package.source_roots())
            .flat_map(|(component, dirs)| {
                dirs.into_iter().map(move |dir| SourceRoot {
                    dir: normalize_path(&dir),
                    component: component.clone(),
                })
            })
            .collect();
        roots.sort_by(|a, b| {
            b.dir
                .components()
                .count()
                .cmp(&a.dir.components().count())
                .then_with(|| a.dir.cmp(&b.dir))
        });

        let sessions = config
            .sessions
            .iter()
            .filter_map(|session| {
                let component = config.component(&session.target)?;
                Some(Arc::new(ProcessSession::from_config(session, component, &root)))
            })
            .collect();

        Self {
            id: ProjectId::new(root.to_string_lossy()),
            extensions: config.watch.extensions.clone(),
            roots,
            depends: config
                .packages
                .iter()
                .map(|p| (p.name.clone(), p.depends.clone()))
                .collect(),
            open: config.editor.open.clone(),
            sessions,
            index: RwLock::new(None),
            cache: AnalysisCache::new(&root, config.editor.reanalyze.clone()),
            disposed: AtomicBool::new(false),
            root,
        }
    }

    pub fn source_roots(&self) -> &[SourceRoot] {
        &self.roots
    }

    /// Distinct source directories, for the watcher.
    pub fn source_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = self.roots.iter().map(|r| r.dir.clone()).collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn sessions(&self) -> &[Arc<ProcessSession>] {
        &self.sessions
    }

    #[cfg(test)]
    pub fn analysis(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Every library component.
    pub fn libraries(&self) -> TargetSet {
        self.roots
            .iter()
            .map(|r| &r.component)
            .filter(|c| c.is_library())
            .cloned()
            .collect()
    }

    /// Rebuild the production-file index. Returns the number of files found.
    ///
    /// Blocking; run off the async workers.
    pub fn rescan(&self) -> usize {
        let files: FxHashSet<PathBuf> = self
            .source_dirs()
            .iter()
            .filter(|dir| dir.is_dir())
            .flat_map(|dir| {
                WalkDir::new(dir)
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.path())
            })
            .filter(|path| has_extension(path, &self.extensions))
            .map(|path| normalize_path(&path))
            .collect();

        let count = files.len();
        *self.index.write() = Some(files);
        crate::debug!("watch"; "indexed {} source file(s)", count);
        count
    }

    /// Start every configured session. Failures are logged and skipped.
    pub fn start_sessions(&self) -> usize {
        let mut started = 0;
        for session in &self.sessions {
            match session.start() {
                Ok(()) => {
                    crate::log!("session"; "started {}", session.component());
                    started += 1;
                }
                Err(e) => crate::log!("error"; "{:#}", e),
            }
        }
        started
    }

    pub fn stop_sessions(&self) {
        for session in &self.sessions {
            session.stop();
        }
    }

    /// Tear the project down. Running build rounds see this before applying results.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.stop_sessions();
        }
    }
}

impl ComponentRegistry for ManifestProject {
    fn resolve_component(&self, file: &Path) -> Option<ComponentInfo> {
        self.roots
            .iter()
            .find(|root| file.starts_with(&root.dir))
            .map(|root| root.component.clone())
    }
}

impl ProjectHost for ManifestProject {
    fn id(&self) -> ProjectId {
        self.id.clone()
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn production_files(&self) -> Option<FxHashSet<PathBuf>> {
        self.index.read().clone()
    }

    fn running_sessions(&self) -> Vec<Arc<dyn Session>> {
        self.sessions
            .iter()
            .filter(|s| s.is_alive())
            .map(|s| Arc::clone(s) as Arc<dyn Session>)
            .collect()
    }

    fn open_files(&self) -> Vec<PathBuf> {
        self.open.clone()
    }

    fn invalidate_file(&self, file: &Path) {
        self.cache.invalidate(file);
    }

    fn reanalyze_file(&self, file: &Path) {
        self.cache.reanalyze(file);
    }

    fn module_graph(&self) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        for (module, depends) in &self.depends {
            graph.record(module, depends.iter().cloned());
        }
        graph
    }
}
