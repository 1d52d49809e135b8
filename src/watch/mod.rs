//! FileSystem Actor
//!
//! Watches the project's source dirs and feeds debounced change batches to
//! the [`RebuildCoordinator`]. The watcher is attached before the first index
//! scan so nothing saved during startup is lost.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → Classifier (source files) → RebuildCoordinator
//!                                                 │
//!                                  created/removed └→ source index rescan
//! ```

use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;

use crate::core::is_shutdown;
use crate::host::{ManifestProject, ProjectHost};
use crate::rebuild::{ChainReport, ChangeOutcome, RebuildCoordinator, RoundChain};

/// Poll interval while a source dir is missing.
const REATTACH_INTERVAL: Duration = Duration::from_secs(1);

// Source file filtering and kind correction.
mod classifier;
// Pure timing and deduplication.
mod debouncer;
// Shared fs event types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;


use classifier::EventClassifier;
use debouncer::Debouncer;
use types::DebouncedEvents;
use watch_roots::WatchRoots;

/// FileSystem Actor - watches for source changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    debouncer: Debouncer,
    project: Arc<ManifestProject>,
    coordinator: Arc<RebuildCoordinator>,
}

impl FsActor {
    /// Create the actor and start watching immediately.
    ///
    /// Events buffer in the channel until [`FsActor::run`] is polled.
    pub fn new(
        project: Arc<ManifestProject>,
        coordinator: Arc<RebuildCoordinator>,
        debounce: Duration,
    ) -> notify::Result<Self> {
        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        // Missing source dirs are attached once they appear
        let mut watch_roots = WatchRoots::new(project.source_dirs());
        watch_roots.attach_existing(&mut watcher)?;
        crate::debug!("watch"; "watching {} source dir(s)", watch_roots.attached());

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            debouncer: Debouncer::new(debounce),
            project,
            coordinator,
        })
    }

    /// Run the actor event loop until the project is disposed or Ctrl+C.
    pub async fn run(self) {
        let notify_rx = self.notify_rx;
        let project = self.project;
        let coordinator = self.coordinator;
        let mut debouncer = self.debouncer;
        let mut watcher = self.watcher;
        let mut watch_roots = self.watch_roots;

        let (async_tx, mut async_rx) = tokio::sync::mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        while !project.is_disposed() && !is_shutdown() {
            let mut sleep = debouncer.sleep_duration();
            if watch_roots.has_missing() {
                sleep = sleep.min(REATTACH_INTERVAL);
            }

            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(sleep) => {
                    watch_roots.maintain(&mut watcher);
                    if let Some(ChangeOutcome::Launched(chain)) =
                        process_changes(&mut debouncer, &project, &coordinator).await
                    {
                        tokio::spawn(report_chain(chain));
                    }
                }
            }
        }
    }
}

/// Flush a ready batch into the coordinator.
///
/// Returns `None` when nothing was ready or nothing relevant changed.
async fn process_changes(
    debouncer: &mut Debouncer,
    project: &Arc<ManifestProject>,
    coordinator: &RebuildCoordinator,
) -> Option<ChangeOutcome> {
    let raw = debouncer.take_if_ready()?;
    let events = EventClassifier::classify(raw, project.extensions())?;
    log_events(&events);

    if events.changes_layout() {
        let scan = Arc::clone(project);
        if let Err(e) = tokio::task::spawn_blocking(move || scan.rescan()).await {
            crate::log!("error"; "source index rescan failed: {}", e);
        }
    }

    let host = Arc::clone(project) as Arc<dyn ProjectHost>;
    let outcome = coordinator.on_files_changed(&host, &events.paths());
    if matches!(outcome, ChangeOutcome::Ignored) {
        crate::debug!("watch"; "no library affected");
    }
    Some(outcome)
}

/// Log how a launched chain ended once its project is idle again.
async fn report_chain(chain: RoundChain) {
    match chain.wait().await {
        Ok(report) => crate::debug!("build"; "{}", chain_summary(&report)),
        Err(e) => crate::log!("error"; "build chain panicked: {}", e),
    }
}

fn chain_summary(report: &ChainReport) -> String {
    let failed = report
        .rounds
        .iter()
        .filter(|round| !round.outcome.is_success())
        .count();
    format!(
        "{}: idle after {} round(s), {} failed{}",
        report.project,
        report.rounds.len(),
        failed,
        if report.disposed { ", project disposed" } else { "" }
    )
}

fn log_events(events: &DebouncedEvents) {
    for (path, kind) in &events.0 {
        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
    }
}
