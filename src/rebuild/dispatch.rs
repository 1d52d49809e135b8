//! Refresh dispatch: act on a resolved [`Impact`].

use std::path::PathBuf;

use super::impact::Impact;
use crate::host::ProjectHost;

/// What a dispatch actually did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Ids of sessions restarted successfully.
    pub restarted: Vec<String>,
    /// Sessions whose restart failed, with the error.
    pub failed: Vec<(String, String)>,
    /// Files invalidated and queued for re-analysis.
    pub refreshed: Vec<PathBuf>,
}

/// Restart each session once, then invalidate and re-analyze each file once.
///
/// A failing restart is logged and does not stop the remaining work.
pub fn dispatch(project: &dyn ProjectHost, impact: &Impact) -> DispatchReport {
    let mut report = DispatchReport::default();

    for session in &impact.sessions {
        let id = session.id().to_owned();
        match session.restart() {
            Ok(()) => {
                crate::log!("session"; "restarted {}", session.component());
                report.restarted.push(id);
            }
            Err(e) => {
                crate::log!("error"; "failed to restart {}: {:#}", session.component(), e);
                report.failed.push((id, format!("{e:#}")));
            }
        }
    }

    for file in &impact.files {
        project.invalidate_file(file);
        project.reanalyze_file(file);
        crate::debug!("refresh"; "{}", file.display());
        report.refreshed.push(file.clone());
    }

    report
}
