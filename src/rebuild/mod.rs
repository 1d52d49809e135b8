//! Library rebuild coordination.
//!
//! ```text
//! changed files ─► resolve libraries ─► BuildStatusTable ─► launch (idle only)
//!                                            ▲                    │
//!                                            │          build ─► impact ─► dispatch
//!                                            └──── advance ◄──────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - `status` - Per-project `Building` / `Queued` state
//! - `executor` - Build invocation contract and the command-based executor
//! - `impact` - Dependent sessions and open files of a finished build
//! - `dispatch` - Session restarts and file refreshes
//!
//! # Guarantees
//!
//! - At most one chain of rounds runs per project. Only a change batch that
//!   finds the project idle launches one.
//! - Changes arriving mid-build are merged into `Queued` and built by the next
//!   round of the same chain.
//! - A failed or unlaunched build suppresses refresh work but still advances
//!   the state, so the next change always gets a build.

pub mod dispatch;
pub mod executor;
pub mod impact;
pub mod status;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};

use crate::core::{ComponentInfo, ProjectId, TargetSet, display_targets};
use crate::host::ProjectHost;
use crate::logger;

use dispatch::{DispatchReport, dispatch};
use executor::{BuildExecutor, BuildOptions, ExitResult};
use impact::ImpactResolver;
use status::{Advance, BuildStatusTable, Recorded};

pub use status::BuildStatus;

// =============================================================================
// Reports
// =============================================================================

/// How a round's build invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    /// Non-zero exit (`None` when killed by a signal).
    Failed(Option<i32>),
    /// The build tool could not be launched.
    NotStarted,
    /// The blocking task running the build panicked.
    Aborted,
}

impl BuildOutcome {
    fn from_result(result: Option<ExitResult>) -> Self {
        match result {
            Some(exit) if exit.is_success() => Self::Succeeded,
            Some(exit) => Self::Failed(exit.code),
            None => Self::NotStarted,
        }
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self == Self::Succeeded
    }
}

/// One build round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// Exactly the set passed to the build invocation.
    pub targets: TargetSet,
    pub outcome: BuildOutcome,
    /// Results were not applied because the project was disposed.
    pub discarded: bool,
    pub dispatch: DispatchReport,
    pub elapsed: Duration,
}

impl RoundReport {
    fn new(targets: TargetSet, outcome: BuildOutcome) -> Self {
        Self {
            targets,
            outcome,
            discarded: false,
            dispatch: DispatchReport::default(),
            elapsed: Duration::ZERO,
        }
    }
}

/// All rounds run by one launched chain.
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub project: ProjectId,
    pub rounds: Vec<RoundReport>,
    /// The chain stopped because the project was torn down.
    pub disposed: bool,
}

/// Handle to a launched chain.
#[derive(Debug)]
pub struct RoundChain {
    handle: JoinHandle<ChainReport>,
}

impl RoundChain {
    /// Wait for the chain to return its project to idle.
    pub async fn wait(self) -> Result<ChainReport, JoinError> {
        self.handle.await
    }
}

/// Result of feeding one change batch to the coordinator.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// No library target affected (or the batch could not be resolved).
    Ignored,
    /// Merged into the next round of the running chain.
    Queued,
    /// The project was idle; a new chain was started.
    Launched(RoundChain),
}

// =============================================================================
// Coordinator
// =============================================================================

/// Owns the build status table and launches build chains.
///
/// Create one per process and share it; every project registers lazily on
/// its first relevant change.
pub struct RebuildCoordinator {
    table: Arc<BuildStatusTable>,
    executor: Arc<dyn BuildExecutor>,
    runtime: Handle,
}

impl RebuildCoordinator {
    pub fn new(executor: Arc<dyn BuildExecutor>, runtime: Handle) -> Self {
        Self {
            table: Arc::new(BuildStatusTable::new()),
            executor,
            runtime,
        }
    }

    #[cfg(test)]
    pub fn table(&self) -> &BuildStatusTable {
        &self.table
    }

    /// Snapshot of a project's coordination state (`None` = idle).
    pub fn status(&self, project: &ProjectId) -> Option<BuildStatus> {
        self.table.get(project)
    }

    /// Feed a batch of changed files.
    ///
    /// Never blocks beyond the table transition; builds run on the runtime.
    pub fn on_files_changed(
        &self,
        project: &Arc<dyn ProjectHost>,
        changed: &[PathBuf],
    ) -> ChangeOutcome {
        if project.is_disposed() {
            return ChangeOutcome::Ignored;
        }

        let targets = changed_libraries(project.as_ref(), changed);
        if targets.is_empty() {
            return ChangeOutcome::Ignored;
        }

        let id = project.id();
        match self.table.record_changes(&id, targets) {
            Recorded::Queued => {
                if let Some(status) = self.status(&id) {
                    crate::debug!("build"; "{}: {} {}", id, status.label(), display_targets(status.targets()));
                }
                ChangeOutcome::Queued
            }
            Recorded::Launch(targets) => ChangeOutcome::Launched(self.launch(project, targets)),
        }
    }

    /// Drop pending work for a project that is being closed.
    ///
    /// A running round keeps its entry until it finishes, so a change that
    /// arrives meanwhile is queued behind it. The chain removes the entry at
    /// its next disposal check or when nothing is left to build.
    pub fn close_project(&self, project: &ProjectId) {
        if self.table.drop_queued(project) {
            crate::debug!("build"; "{}: closed, queued round dropped", project);
        }
    }

    fn launch(&self, project: &Arc<dyn ProjectHost>, targets: TargetSet) -> RoundChain {
        let chain = Chain {
            table: Arc::clone(&self.table),
            executor: Arc::clone(&self.executor),
            project: Arc::clone(project),
        };
        RoundChain {
            handle: self.runtime.spawn(chain.run(targets)),
        }
    }
}

/// Library targets owned by the watched files among `changed`.
///
/// Empty when the watch list is not available yet.
pub fn changed_libraries(project: &dyn ProjectHost, changed: &[PathBuf]) -> TargetSet {
    let Some(watched) = project.production_files() else {
        crate::debug!("watch"; "{}: source index not ready, dropping {} change(s)",
            project.id(), changed.len());
        return TargetSet::new();
    };

    changed
        .iter()
        .filter(|file| watched.contains(*file))
        .filter_map(|file| project.resolve_component(file))
        .filter(ComponentInfo::is_library)
        .collect()
}

// =============================================================================
// Round chain
// =============================================================================

/// State owned by one launched chain.
struct Chain {
    table: Arc<BuildStatusTable>,
    executor: Arc<dyn BuildExecutor>,
    project: Arc<dyn ProjectHost>,
}

impl Chain {
    /// Run rounds until the table has nothing queued for the project.
    async fn run(self, mut targets: TargetSet) -> ChainReport {
        let id = self.project.id();
        let mut report = ChainReport {
            project: id.clone(),
            rounds: Vec::new(),
            disposed: false,
        };

        loop {
            if self.project.is_disposed() {
                report.disposed = true;
                break;
            }

            let round = self.round(targets).await;
            let discarded = round.discarded;
            report.rounds.push(round);
            if discarded {
                report.disposed = true;
                break;
            }

            match self.table.advance(&id) {
                Advance::Next(next) => {
                    crate::debug!("build"; "{}: next round for {}", id, display_targets(&next));
                    targets = next;
                }
                Advance::Idle => break,
            }
        }

        if report.disposed {
            self.table.remove(&id);
        }
        report
    }

    async fn round(&self, targets: TargetSet) -> RoundReport {
        let executor = Arc::clone(&self.executor);
        let project = Arc::clone(&self.project);
        let snapshot = targets.clone();

        let task = tokio::task::spawn_blocking(move || {
            execute_round(executor.as_ref(), project.as_ref(), targets)
        });

        match task.await {
            Ok(round) => round,
            Err(e) => {
                crate::log!("error"; "build task for {} aborted: {}", display_targets(&snapshot), e);
                RoundReport::new(snapshot, BuildOutcome::Aborted)
            }
        }
    }
}

/// Build, then refresh dependents if the build succeeded and the project is
/// still alive. Runs on a blocking thread.
fn execute_round(
    executor: &dyn BuildExecutor,
    project: &dyn ProjectHost,
    targets: TargetSet,
) -> RoundReport {
    let started = Instant::now();
    crate::log!("build"; "building {}", display_targets(&targets));

    let result = executor.run_build(project, &targets, &BuildOptions::coordinated());
    let mut round = RoundReport::new(targets, BuildOutcome::from_result(result));

    if !round.outcome.is_success() {
        round.elapsed = started.elapsed();
        return round;
    }

    if project.is_disposed() {
        crate::debug!("build"; "{}: disposed during build, discarding results", project.id());
        round.discarded = true;
        round.elapsed = started.elapsed();
        return round;
    }

    let impact = ImpactResolver::new(project, &round.targets).resolve(project);
    if impact.is_empty() {
        crate::debug!("build"; "{}: nothing depends on {}", project.id(), display_targets(&round.targets));
    } else {
        round.dispatch = dispatch(project, &impact);
    }
    round.elapsed = started.elapsed();

    let summary = format!(
        "built {} in {:.1}s ({} session{} restarted, {} file{} refreshed)",
        display_targets(&round.targets),
        round.elapsed.as_secs_f64(),
        round.dispatch.restarted.len(),
        plural(round.dispatch.restarted.len()),
        round.dispatch.refreshed.len(),
        plural(round.dispatch.refreshed.len()),
    );
    match round.dispatch.failed.len() {
        0 => logger::status_success(&summary),
        failed => logger::status_warning(&format!(
            "{summary}, {failed} restart{} failed",
            plural(failed)
        )),
    }
    round
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
