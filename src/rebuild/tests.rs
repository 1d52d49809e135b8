use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::runtime::Handle;

use super::executor::{BuildExecutor, BuildOptions, ExitResult};
use super::impact::ImpactResolver;
use super::{BuildOutcome, BuildStatus, ChangeOutcome, RebuildCoordinator, RoundChain};
use crate::core::{ComponentInfo, ProjectId, StanzaType, TargetSet};
use crate::host::{ComponentRegistry, ModuleGraph, ProjectHost, Session};

const TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Fakes
// =============================================================================

fn lib(package: &str) -> ComponentInfo {
    ComponentInfo::library(package)
}

fn exe(package: &str, name: &str) -> ComponentInfo {
    ComponentInfo::new(package, format!("{package}:exe:{name}"), StanzaType::Executable)
}

fn set(components: &[ComponentInfo]) -> TargetSet {
    components.iter().cloned().collect()
}

fn src(package: &str, module: &str) -> PathBuf {
    PathBuf::from(format!("/project/{package}/src/{module}.hs"))
}

struct FakeSession {
    id: String,
    component: ComponentInfo,
    restarts: AtomicUsize,
    fail: bool,
}

impl FakeSession {
    fn new(id: &str, component: ComponentInfo) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            component,
            restarts: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing(id: &str, component: ComponentInfo) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            component,
            restarts: AtomicUsize::new(0),
            fail: true,
        })
    }

    fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

impl Session for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn component(&self) -> &ComponentInfo {
        &self.component
    }

    fn restart(&self) -> anyhow::Result<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("ghci exited during startup");
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeProject {
    id: String,
    components: FxHashMap<PathBuf, ComponentInfo>,
    watched: FxHashSet<PathBuf>,
    index_missing: AtomicBool,
    disposed: AtomicBool,
    sessions: Vec<Arc<FakeSession>>,
    open: Vec<PathBuf>,
    modules: Vec<(String, Vec<String>)>,
    invalidated: Mutex<Vec<PathBuf>>,
    reanalyzed: Mutex<Vec<PathBuf>>,
}

impl FakeProject {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            ..Default::default()
        }
    }

    fn file(mut self, path: PathBuf, component: ComponentInfo) -> Self {
        self.watched.insert(path.clone());
        self.components.insert(path, component);
        self
    }

    fn unwatched_file(mut self, path: PathBuf, component: ComponentInfo) -> Self {
        self.components.insert(path, component);
        self
    }

    fn session(mut self, session: &Arc<FakeSession>) -> Self {
        self.sessions.push(Arc::clone(session));
        self
    }

    fn open(mut self, path: PathBuf) -> Self {
        self.open.push(path);
        self
    }

    fn module(mut self, name: &str, depends: &[&str]) -> Self {
        self.modules.push((
            name.to_owned(),
            depends.iter().map(|d| (*d).to_owned()).collect(),
        ));
        self
    }

    fn index_missing(self) -> Self {
        self.index_missing.store(true, Ordering::SeqCst);
        self
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    fn invalidated(&self) -> Vec<PathBuf> {
        self.invalidated.lock().clone()
    }

    fn reanalyzed(&self) -> Vec<PathBuf> {
        self.reanalyzed.lock().clone()
    }
}

impl ComponentRegistry for FakeProject {
    fn resolve_component(&self, file: &Path) -> Option<ComponentInfo> {
        self.components.get(file).cloned()
    }
}

impl ProjectHost for FakeProject {
    fn id(&self) -> ProjectId {
        ProjectId::new(&self.id)
    }

    fn root(&self) -> &Path {
        Path::new("/project")
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn production_files(&self) -> Option<FxHashSet<PathBuf>> {
        if self.index_missing.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.watched.clone())
    }

    fn running_sessions(&self) -> Vec<Arc<dyn Session>> {
        self.sessions
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn Session>)
            .collect()
    }

    fn open_files(&self) -> Vec<PathBuf> {
        self.open.clone()
    }

    fn invalidate_file(&self, file: &Path) {
        self.invalidated.lock().push(file.to_path_buf());
    }

    fn reanalyze_file(&self, file: &Path) {
        self.reanalyzed.lock().push(file.to_path_buf());
    }

    fn module_graph(&self) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        for (name, depends) in &self.modules {
            graph.record(name, depends.iter().cloned());
        }
        graph
    }
}

/// Executor that reports each build start and, when gated, blocks until
/// the test releases it.
struct FakeExecutor {
    gated: bool,
    results: Mutex<VecDeque<Option<ExitResult>>>,
    calls: Mutex<Vec<TargetSet>>,
    options: Mutex<Vec<BuildOptions>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    started_tx: Sender<TargetSet>,
    release_rx: Receiver<()>,
}

struct Harness {
    executor: Arc<FakeExecutor>,
    coordinator: RebuildCoordinator,
    started: Receiver<TargetSet>,
    release: Sender<()>,
}

impl Harness {
    fn new(gated: bool, results: Vec<Option<ExitResult>>) -> Self {
        let (started_tx, started) = channel::unbounded();
        let (release, release_rx) = channel::unbounded();
        let executor = Arc::new(FakeExecutor {
            gated,
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            started_tx,
            release_rx,
        });
        let coordinator = RebuildCoordinator::new(
            Arc::clone(&executor) as Arc<dyn BuildExecutor>,
            Handle::current(),
        );
        Self {
            executor,
            coordinator,
            started,
            release,
        }
    }

    fn gated() -> Self {
        Self::new(true, Vec::new())
    }

    fn ungated() -> Self {
        Self::new(false, Vec::new())
    }

    fn wait_started(&self) -> TargetSet {
        self.started
            .recv_timeout(TIMEOUT)
            .expect("build did not start")
    }

    fn release(&self) {
        self.release.send(()).unwrap();
    }

    fn calls(&self) -> Vec<TargetSet> {
        self.executor.calls.lock().clone()
    }

    fn max_active(&self) -> usize {
        self.executor.max_active.load(Ordering::SeqCst)
    }
}

impl BuildExecutor for FakeExecutor {
    fn run_build(
        &self,
        _project: &dyn ProjectHost,
        targets: &TargetSet,
        options: &BuildOptions,
    ) -> Option<ExitResult> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        self.calls.lock().push(targets.clone());
        self.options.lock().push(options.clone());
        let _ = self.started_tx.send(targets.clone());

        if self.gated {
            self.release_rx
                .recv_timeout(TIMEOUT)
                .expect("test never released the build");
        }

        let result = self
            .results
            .lock()
            .pop_front()
            .unwrap_or(Some(ExitResult::SUCCESS));
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn launched(outcome: ChangeOutcome) -> RoundChain {
    match outcome {
        ChangeOutcome::Launched(chain) => chain,
        other => panic!("expected a launched chain, got {other:?}"),
    }
}

fn host(project: &Arc<FakeProject>) -> Arc<dyn ProjectHost> {
    Arc::clone(project) as Arc<dyn ProjectHost>
}

fn two_libraries() -> FakeProject {
    FakeProject::new("demo")
        .file(src("P", "P"), lib("P"))
        .file(src("Q", "Q"), lib("Q"))
        .file(src("R", "R"), lib("R"))
        .file(src("S", "S"), lib("S"))
}

// =============================================================================
// Coalescing controller
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_first_change_launches_single_build() {
    let harness = Harness::gated();
    let project = Arc::new(two_libraries());
    let id = project.id();

    let chain = launched(harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]));

    assert_eq!(harness.wait_started(), set(&[lib("P")]));
    assert_eq!(
        harness.coordinator.status(&id),
        Some(BuildStatus::Building(set(&[lib("P")])))
    );

    harness.release();
    let report = chain.wait().await.unwrap();

    assert_eq!(report.rounds.len(), 1);
    assert_eq!(report.rounds[0].outcome, BuildOutcome::Succeeded);
    assert!(harness.coordinator.table().is_idle(&id));
    assert_eq!(harness.calls(), vec![set(&[lib("P")])]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_change_mid_build_is_queued_not_built() {
    let harness = Harness::gated();
    let project = Arc::new(two_libraries());
    let id = project.id();
    let host = host(&project);

    let chain = launched(harness.coordinator.on_files_changed(&host, &[src("P", "P")]));
    harness.wait_started();

    let outcome = harness.coordinator.on_files_changed(&host, &[src("Q", "Q")]);
    assert!(matches!(outcome, ChangeOutcome::Queued));
    assert_eq!(
        harness.coordinator.status(&id),
        Some(BuildStatus::Queued(set(&[lib("P"), lib("Q")])))
    );
    assert!(harness.started.try_recv().is_err());

    harness.release();
    assert_eq!(harness.wait_started(), set(&[lib("P"), lib("Q")]));
    harness.release();

    let report = chain.wait().await.unwrap();
    assert_eq!(report.rounds.len(), 2);
    assert!(harness.coordinator.table().is_idle(&id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_burst_coalesces_into_one_followup_round() {
    let harness = Harness::gated();
    let project = Arc::new(two_libraries());
    let host = host(&project);

    let chain = launched(harness.coordinator.on_files_changed(&host, &[src("P", "P")]));
    harness.wait_started();

    let burst = [
        vec![src("Q", "Q")],
        vec![src("R", "R")],
        vec![src("Q", "Q"), src("S", "S")],
        vec![src("R", "R")],
    ];
    for batch in burst.iter().cycle().take(20) {
        let outcome = harness.coordinator.on_files_changed(&host, batch);
        assert!(matches!(outcome, ChangeOutcome::Queued));
    }

    harness.release();
    assert_eq!(
        harness.wait_started(),
        set(&[lib("P"), lib("Q"), lib("R"), lib("S")])
    );
    harness.release();

    let report = chain.wait().await.unwrap();
    assert_eq!(report.rounds.len(), 2);
    assert_eq!(harness.calls().len(), 2);
    assert_eq!(harness.max_active(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_builds_use_non_fatal_warning_policy() {
    let harness = Harness::ungated();
    let project = Arc::new(two_libraries());

    let chain = launched(harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]));
    chain.wait().await.unwrap();

    let options = harness.executor.options.lock().clone();
    assert_eq!(options, vec![BuildOptions::coordinated()]);
    assert!(options[0].warnings_non_fatal);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_non_library_changes_are_ignored() {
    let harness = Harness::ungated();
    let project = Arc::new(
        FakeProject::new("demo")
            .file(src("P", "Main"), exe("P", "app"))
            .file(src("P", "Spec"), ComponentInfo::new("P", "P:test:spec", StanzaType::TestSuite)),
    );

    let outcome = harness
        .coordinator
        .on_files_changed(&host(&project), &[src("P", "Main"), src("P", "Spec")]);

    assert!(matches!(outcome, ChangeOutcome::Ignored));
    assert!(harness.coordinator.table().is_empty());
    assert!(harness.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unwatched_and_untracked_files_are_ignored() {
    let harness = Harness::ungated();
    let project = Arc::new(
        FakeProject::new("demo").unwatched_file(PathBuf::from("/project/P/Setup.hs"), lib("P")),
    );

    let outcome = harness.coordinator.on_files_changed(
        &host(&project),
        &[PathBuf::from("/project/P/Setup.hs"), PathBuf::from("/tmp/Scratch.hs")],
    );

    assert!(matches!(outcome, ChangeOutcome::Ignored));
    assert!(harness.coordinator.table().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_dropped_while_index_not_ready() {
    let harness = Harness::ungated();
    let project = Arc::new(two_libraries().index_missing());
    let host = host(&project);

    let outcome = harness.coordinator.on_files_changed(&host, &[src("P", "P")]);
    assert!(matches!(outcome, ChangeOutcome::Ignored));
    assert!(harness.coordinator.table().is_empty());

    // The dropped batch is not replayed once the index is ready.
    project.index_missing.store(false, Ordering::SeqCst);
    let chain = launched(harness.coordinator.on_files_changed(&host, &[src("Q", "Q")]));
    chain.wait().await.unwrap();
    assert_eq!(harness.calls(), vec![set(&[lib("Q")])]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_projects_build_independently() {
    let harness = Harness::gated();
    let first = Arc::new(two_libraries());
    let second = Arc::new(FakeProject::new("other").file(src("P", "P"), lib("P")));

    let a = launched(harness.coordinator.on_files_changed(&host(&first), &[src("Q", "Q")]));
    let b = launched(harness.coordinator.on_files_changed(&host(&second), &[src("P", "P")]));

    let mut started = vec![harness.wait_started(), harness.wait_started()];
    started.sort();
    let mut expected = vec![set(&[lib("Q")]), set(&[lib("P")])];
    expected.sort();
    assert_eq!(started, expected);
    assert_eq!(harness.max_active(), 2);
    assert_eq!(harness.coordinator.table().len(), 2);

    harness.release();
    harness.release();
    a.wait().await.unwrap();
    b.wait().await.unwrap();
    assert!(harness.coordinator.table().is_empty());
}

// =============================================================================
// Build results
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_success_restarts_dependent_session_once() {
    let harness = Harness::ungated();
    let app = FakeSession::new("app", exe("P", "app"));
    let own_repl = FakeSession::new("p-repl", lib("P"));
    let unrelated = FakeSession::new("q-repl", lib("Q"));
    let project = Arc::new(
        two_libraries()
            .session(&app)
            .session(&own_repl)
            .session(&unrelated),
    );

    let chain = launched(harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]));
    let report = chain.wait().await.unwrap();

    assert_eq!(app.restarts(), 1);
    assert_eq!(own_repl.restarts(), 0);
    assert_eq!(unrelated.restarts(), 0);
    assert_eq!(report.rounds[0].dispatch.restarted, vec!["app".to_string()]);
    assert!(harness.coordinator.table().is_idle(&project.id()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_build_refreshes_nothing() {
    let harness = Harness::new(false, vec![Some(ExitResult::failed(1))]);
    let app = FakeSession::new("app", exe("P", "app"));
    let project = Arc::new(
        two_libraries()
            .file(src("P", "Main"), exe("P", "app"))
            .session(&app)
            .open(src("P", "Main")),
    );

    let chain = launched(harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]));
    let report = chain.wait().await.unwrap();

    assert_eq!(report.rounds[0].outcome, BuildOutcome::Failed(Some(1)));
    assert_eq!(app.restarts(), 0);
    assert!(project.invalidated().is_empty());
    assert!(project.reanalyzed().is_empty());
    assert!(harness.coordinator.table().is_idle(&project.id()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_build_still_promotes_queued_round() {
    let harness = Harness::new(true, vec![Some(ExitResult::failed(1))]);
    let app = FakeSession::new("app", exe("Q", "app"));
    let project = Arc::new(two_libraries().session(&app));
    let host = host(&project);

    let chain = launched(harness.coordinator.on_files_changed(&host, &[src("P", "P")]));
    harness.wait_started();
    assert!(matches!(
        harness.coordinator.on_files_changed(&host, &[src("Q", "Q")]),
        ChangeOutcome::Queued
    ));
    harness.release();

    assert_eq!(harness.wait_started(), set(&[lib("P"), lib("Q")]));
    harness.release();

    let report = chain.wait().await.unwrap();
    let outcomes: Vec<_> = report.rounds.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, [BuildOutcome::Failed(Some(1)), BuildOutcome::Succeeded]);
    assert_eq!(app.restarts(), 1);
    assert!(harness.coordinator.table().is_idle(&project.id()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unlaunchable_build_returns_to_idle() {
    let harness = Harness::new(false, vec![None]);
    let app = FakeSession::new("app", exe("P", "app"));
    let project = Arc::new(two_libraries().session(&app));

    let chain = launched(harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]));
    let report = chain.wait().await.unwrap();

    assert_eq!(report.rounds[0].outcome, BuildOutcome::NotStarted);
    assert_eq!(app.restarts(), 0);
    assert!(harness.coordinator.table().is_idle(&project.id()));

    // Next change gets a fresh build.
    let chain = launched(harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]));
    chain.wait().await.unwrap();
    assert_eq!(app.restarts(), 1);
}

// =============================================================================
// Disposal
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disposed_project_is_ignored() {
    let harness = Harness::ungated();
    let project = Arc::new(two_libraries());
    project.dispose();

    let outcome = harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]);

    assert!(matches!(outcome, ChangeOutcome::Ignored));
    assert!(harness.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disposal_during_build_discards_results() {
    let harness = Harness::gated();
    let app = FakeSession::new("app", exe("P", "app"));
    let project = Arc::new(two_libraries().session(&app).open(src("P", "P")));
    let host = host(&project);

    let chain = launched(harness.coordinator.on_files_changed(&host, &[src("P", "P")]));
    harness.wait_started();
    harness.coordinator.on_files_changed(&host, &[src("Q", "Q")]);
    project.dispose();
    harness.release();

    let report = chain.wait().await.unwrap();

    assert!(report.disposed);
    assert_eq!(report.rounds.len(), 1);
    assert!(report.rounds[0].discarded);
    assert_eq!(app.restarts(), 0);
    assert!(project.invalidated().is_empty());
    assert!(harness.coordinator.table().is_idle(&project.id()));
    assert_eq!(harness.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_project_drops_queued_round() {
    let harness = Harness::gated();
    let project = Arc::new(two_libraries());
    let host = host(&project);

    let chain = launched(harness.coordinator.on_files_changed(&host, &[src("P", "P")]));
    harness.wait_started();
    harness.coordinator.on_files_changed(&host, &[src("Q", "Q")]);

    harness.coordinator.close_project(&project.id());
    assert_eq!(
        harness.coordinator.status(&project.id()),
        Some(BuildStatus::Building(set(&[lib("P"), lib("Q")])))
    );
    harness.release();

    let report = chain.wait().await.unwrap();
    assert_eq!(report.rounds.len(), 1);
    assert_eq!(harness.calls().len(), 1);
    assert!(harness.coordinator.table().is_idle(&project.id()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_change_after_close_waits_for_running_build() {
    let harness = Harness::gated();
    let project = Arc::new(two_libraries());
    let host = host(&project);

    let chain = launched(harness.coordinator.on_files_changed(&host, &[src("P", "P")]));
    harness.wait_started();
    harness.coordinator.close_project(&project.id());

    let outcome = harness.coordinator.on_files_changed(&host, &[src("Q", "Q")]);
    assert!(matches!(outcome, ChangeOutcome::Queued));
    assert!(harness.started.try_recv().is_err());

    harness.release();
    harness.wait_started();
    harness.release();

    let report = chain.wait().await.unwrap();
    assert_eq!(report.rounds.len(), 2);
    assert_eq!(harness.max_active(), 1);
    assert!(harness.coordinator.table().is_idle(&project.id()));
}

// =============================================================================
// Impact resolution
// =============================================================================

fn layered_project() -> (FakeProject, Vec<Arc<FakeSession>>) {
    // utils <- core <- app ; other is unrelated
    let sessions = vec![
        FakeSession::new("utils-exe", exe("utils", "bench-tool")),
        FakeSession::new("utils-lib", lib("utils")),
        FakeSession::new("core-lib", lib("core")),
        FakeSession::new("core-exe", exe("core", "cli")),
        FakeSession::new("app-lib", lib("app")),
        FakeSession::new("other-lib", lib("other")),
    ];

    let mut project = FakeProject::new("layered")
        .file(src("utils", "Utils"), lib("utils"))
        .file(src("utils", "Tool"), exe("utils", "bench-tool"))
        .file(src("core", "Core"), lib("core"))
        .file(src("core", "Cli"), exe("core", "cli"))
        .file(src("app", "App"), lib("app"))
        .file(src("other", "Other"), lib("other"))
        .module("utils", &[])
        .module("core", &["utils", "base"])
        .module("app", &["core"])
        .module("other", &["base"]);
    for file in [
        src("utils", "Utils"),
        src("utils", "Tool"),
        src("core", "Core"),
        src("core", "Cli"),
        src("app", "App"),
        src("other", "Other"),
        PathBuf::from("/elsewhere/Untracked.hs"),
    ] {
        project = project.open(file);
    }
    for session in &sessions {
        project = project.session(session);
    }
    (project, sessions)
}

fn session_ids(impact: &super::impact::Impact) -> Vec<&str> {
    let mut ids: Vec<_> = impact.sessions.iter().map(|s| s.id()).collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_impact_sessions() {
    let (project, _sessions) = layered_project();
    let built = set(&[lib("utils")]);

    let impact = ImpactResolver::new(&project, &built).resolve(&project);

    assert_eq!(session_ids(&impact), ["app-lib", "core-lib", "utils-exe"]);
}

#[test]
fn test_impact_files() {
    let (project, _sessions) = layered_project();
    let built = set(&[lib("utils")]);

    let impact = ImpactResolver::new(&project, &built).resolve(&project);

    let files: Vec<_> = impact.files.iter().cloned().collect();
    assert_eq!(
        files,
        [
            src("app", "App"),
            src("core", "Cli"),
            src("core", "Core"),
            src("utils", "Tool"),
        ]
    );
}

#[test]
fn test_impact_deduplicates_sessions() {
    let app = FakeSession::new("app", exe("P", "app"));
    let project = two_libraries().session(&app).session(&app);
    let built = set(&[lib("P")]);

    let impact = ImpactResolver::new(&project, &built).resolve(&project);

    assert_eq!(impact.sessions.len(), 1);
}

#[test]
fn test_impact_empty_for_non_library_build_set() {
    let (project, _sessions) = layered_project();
    let built = set(&[exe("utils", "bench-tool")]);

    let impact = ImpactResolver::new(&project, &built).resolve(&project);

    assert!(impact.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispatch_refreshes_each_file_once_and_survives_restart_failure() {
    let harness = Harness::ungated();
    let broken = FakeSession::failing("broken", exe("P", "broken"));
    let app = FakeSession::new("app", exe("P", "app"));
    let project = Arc::new(
        two_libraries()
            .file(src("P", "Main"), exe("P", "app"))
            .session(&broken)
            .session(&app)
            .open(src("P", "Main"))
            .open(src("P", "Main")),
    );

    let chain = launched(harness.coordinator.on_files_changed(&host(&project), &[src("P", "P")]));
    let report = chain.wait().await.unwrap();
    let dispatch = &report.rounds[0].dispatch;

    assert_eq!(broken.restarts(), 1);
    assert_eq!(app.restarts(), 1);
    assert_eq!(dispatch.restarted, vec!["app".to_string()]);
    assert_eq!(dispatch.failed.len(), 1);
    assert_eq!(project.invalidated(), vec![src("P", "Main")]);
    assert_eq!(project.reanalyzed(), vec![src("P", "Main")]);
}
