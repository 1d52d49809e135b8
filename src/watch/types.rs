use std::path::PathBuf;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Debounced source file events
#[derive(Debug)]
pub(super) struct DebouncedEvents(pub(super) Vec<(PathBuf, ChangeKind)>);

impl DebouncedEvents {
    /// The set of watched files changed shape; the source index is stale.
    pub(super) fn changes_layout(&self) -> bool {
        self.0
            .iter()
            .any(|(_, kind)| matches!(kind, ChangeKind::Created | ChangeKind::Removed))
    }

    /// Paths in a stable order.
    pub(super) fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.0.iter().map(|(p, _)| p.clone()).collect();
        paths.sort();
        paths
    }
}
