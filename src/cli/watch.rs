//! `hswatch watch`: sessions, watcher and coordinator until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;

use crate::config::ProjectConfig;
use crate::core::register_shutdown;
use crate::host::{ManifestProject, ProjectHost};
use crate::log;
use crate::rebuild::RebuildCoordinator;
use crate::rebuild::executor::{BuildExecutor, CommandExecutor};
use crate::watch::FsActor;

/// Grace period for build threads to notice their killed child on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub fn run_watch(config: &ProjectConfig) -> Result<()> {
    config.validate_build_tool()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(watch(config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn watch(config: &ProjectConfig) -> Result<()> {
    let project = Arc::new(ManifestProject::new(config));
    let executor = Arc::new(CommandExecutor::new(&config.build));
    let coordinator = Arc::new(RebuildCoordinator::new(
        Arc::clone(&executor) as Arc<dyn BuildExecutor>,
        Handle::current(),
    ));

    // Watcher first, so saves during the initial scan are queued
    let actor = FsActor::new(
        Arc::clone(&project),
        Arc::clone(&coordinator),
        config.watch.debounce(),
    )
    .context("failed to start file watcher")?;

    let scan = Arc::clone(&project);
    let indexed = tokio::task::spawn_blocking(move || scan.rescan())
        .await
        .context("source index scan panicked")?;
    log!("watch"; "indexed {} source file(s)", indexed);

    let started = project.start_sessions();
    if !project.sessions().is_empty() {
        log!("session"; "{}/{} session(s) running", started, project.sessions().len());
    }

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded::<()>(1);
    register_shutdown(shutdown_tx);
    let shutdown = tokio::task::spawn_blocking(move || shutdown_rx.recv());

    log!("watch"; "watching {} (Ctrl+C to stop)", project.root().display());
    tokio::select! {
        _ = actor.run() => {}
        _ = shutdown => {}
    }

    project.dispose();
    coordinator.close_project(&project.id());

    let killed = executor.kill_running();
    if killed > 0 {
        log!("build"; "stopped {} running build(s)", killed);
    }
    Ok(())
}
