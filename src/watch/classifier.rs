use std::path::PathBuf;

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, DebouncedEvents};
use crate::utils::path::has_extension;

/// Turns raw debounced events into source file events.
///
/// Pipeline: correct_by_existence → filter_sources
pub(super) struct EventClassifier;

impl EventClassifier {
    pub(super) fn classify(
        raw: FxHashMap<PathBuf, ChangeKind>,
        extensions: &[String],
    ) -> Option<DebouncedEvents> {
        let mut changes = raw;

        Self::correct_by_existence(&mut changes);
        Self::filter_sources(&mut changes, extensions);

        if changes.is_empty() {
            return None;
        }
        Some(DebouncedEvents(changes.into_iter().collect()))
    }

    /// Reconcile event kinds with actual filesystem state.
    ///
    /// The watcher may report stale events (e.g., Created for a file that's already
    /// been deleted, or Removed for a file that still exists after an atomic save).
    fn correct_by_existence(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
        changes.retain(|path, kind| {
            let exists = path.exists();
            match *kind {
                ChangeKind::Created if !exists => {
                    crate::debug!("watch"; "discard created (gone): {}", path.display());
                    return false;
                }
                ChangeKind::Modified if !exists => *kind = ChangeKind::Removed,
                ChangeKind::Removed if exists => *kind = ChangeKind::Modified,
                _ => {}
            }
            true
        });
    }

    /// Keep source files only. Directories and other extensions are dropped.
    fn filter_sources(changes: &mut FxHashMap<PathBuf, ChangeKind>, extensions: &[String]) {
        changes.retain(|path, kind| {
            if !has_extension(path, extensions) {
                return false;
            }
            match kind {
                ChangeKind::Created | ChangeKind::Modified => path.is_file(),
                ChangeKind::Removed => true,
            }
        });
    }
}
