//! Impact resolution after a successful library build.
//!
//! Two consumer groups are refreshed:
//!
//! | Group    | Selected when                                                    |
//! |----------|------------------------------------------------------------------|
//! | sessions | non-library target of a built package                            |
//! |          | library target of a module depending on a built package          |
//! | files    | owned by a non-library target of a built package                 |
//! |          | owned by any target of a module depending on a built package     |
//!
//! Modules are matched to packages by exact name. Projects whose module and
//! package names diverge will see dependents missed.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::core::{ComponentInfo, TargetSet};
use crate::host::{ProjectHost, Session};

/// Consumers that must be refreshed after a build.
#[derive(Default)]
pub struct Impact {
    /// Deduplicated by session id, in discovery order.
    pub sessions: Vec<Arc<dyn Session>>,
    pub files: BTreeSet<PathBuf>,
}

impl Impact {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.files.is_empty()
    }
}

impl std::fmt::Debug for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Impact")
            .field("sessions", &self.sessions.iter().map(|s| s.id()).collect::<Vec<_>>())
            .field("files", &self.files)
            .finish()
    }
}

/// Computes [`Impact`] for one round. Holds nothing across rounds.
pub struct ImpactResolver<'a> {
    built: FxHashSet<&'a str>,
    dependents: FxHashSet<String>,
}

impl<'a> ImpactResolver<'a> {
    /// Prepare resolution for `built` using the project's current module graph.
    pub fn new(project: &dyn ProjectHost, built: &'a TargetSet) -> Self {
        let built: FxHashSet<&str> = built
            .iter()
            .filter(|c| c.is_library())
            .map(|c| c.package.as_str())
            .collect();

        let graph = project.module_graph();
        let dependents = graph.dependents_of(built.iter().copied());

        Self { built, dependents }
    }

    /// Resolve both consumer groups.
    pub fn resolve(&self, project: &dyn ProjectHost) -> Impact {
        if self.built.is_empty() {
            return Impact::default();
        }

        let mut impact = Impact::default();
        let mut seen = FxHashSet::default();
        for session in project.running_sessions() {
            if self.session_affected(session.component()) && seen.insert(session.id().to_owned())
            {
                impact.sessions.push(session);
            }
        }

        impact.files = project
            .open_files()
            .into_iter()
            .filter(|file| {
                project
                    .resolve_component(file)
                    .is_some_and(|c| self.file_affected(&c))
            })
            .collect();

        impact
    }

    fn session_affected(&self, component: &ComponentInfo) -> bool {
        if component.is_library() {
            self.dependents.contains(&component.package)
        } else {
            self.built.contains(component.package.as_str())
        }
    }

    fn file_affected(&self, component: &ComponentInfo) -> bool {
        (!component.is_library() && self.built.contains(component.package.as_str()))
            || self.dependents.contains(&component.package)
    }
}
