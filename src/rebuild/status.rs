//! Build status table.
//!
//! One entry per project with a pending or running build. Every transition
//! goes through the map's entry API, so the shard lock for a project's key is
//! that project's critical section. Nothing awaits while holding it.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::core::{ProjectId, TargetSet};

/// Coordination state of one project.
///
/// Absence from the table means idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// A build for these targets is running.
    Building(TargetSet),
    /// Changes accumulated during a running build; a follow-up build is due.
    Queued(TargetSet),
}

impl BuildStatus {
    pub fn targets(&self) -> &TargetSet {
        match self {
            Self::Building(targets) | Self::Queued(targets) => targets,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Building(_) => "building",
            Self::Queued(_) => "queued",
        }
    }
}

/// Result of recording a change batch.
#[derive(Debug, PartialEq, Eq)]
pub enum Recorded {
    /// Project was idle; the caller must launch a build for exactly this set.
    Launch(TargetSet),
    /// A build is running; the changes were merged into the queued set.
    Queued,
}

/// Result of finishing a round.
#[derive(Debug, PartialEq, Eq)]
pub enum Advance {
    /// Queued changes were promoted; run another round for this set.
    Next(TargetSet),
    /// Nothing pending; the entry was removed.
    Idle,
}

/// Process-wide map from project to coordination state.
#[derive(Debug, Default)]
pub struct BuildStatusTable {
    entries: DashMap<ProjectId, BuildStatus>,
}

impl BuildStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a non-empty target set into the project's state.
    ///
    /// The vacant case is the only one that yields [`Recorded::Launch`].
    pub fn record_changes(&self, project: &ProjectId, targets: TargetSet) -> Recorded {
        debug_assert!(!targets.is_empty());

        match self.entries.entry(project.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(BuildStatus::Building(targets.clone()));
                Recorded::Launch(targets)
            }
            Entry::Occupied(mut occupied) => {
                let status = occupied.get_mut();
                let mut merged = match status {
                    BuildStatus::Building(existing) | BuildStatus::Queued(existing) => {
                        std::mem::take(existing)
                    }
                };
                merged.extend(targets);
                *status = BuildStatus::Queued(merged);
                Recorded::Queued
            }
        }
    }

    /// Close the current round and decide what happens next.
    ///
    /// `Queued` is promoted to `Building` and returned; anything else leaves
    /// the project idle.
    pub fn advance(&self, project: &ProjectId) -> Advance {
        let Entry::Occupied(mut occupied) = self.entries.entry(project.clone()) else {
            return Advance::Idle;
        };

        if let BuildStatus::Queued(targets) = occupied.get_mut() {
            let targets = std::mem::take(targets);
            occupied.insert(BuildStatus::Building(targets.clone()));
            return Advance::Next(targets);
        }

        occupied.remove();
        Advance::Idle
    }

    /// Discard queued changes, leaving the running round in place.
    ///
    /// The entry stays `Building` so the chain that owns it still removes or
    /// advances it. Returns `true` if a queued round was dropped.
    pub fn drop_queued(&self, project: &ProjectId) -> bool {
        let Some(mut status) = self.entries.get_mut(project) else {
            return false;
        };
        let BuildStatus::Queued(targets) = &mut *status else {
            return false;
        };
        let targets = std::mem::take(targets);
        *status = BuildStatus::Building(targets);
        true
    }

    /// Drop the project's entry (teardown or disposal).
    pub fn remove(&self, project: &ProjectId) -> Option<BuildStatus> {
        self.entries.remove(project).map(|(_, status)| status)
    }

    /// Snapshot of the project's current state.
    pub fn get(&self, project: &ProjectId) -> Option<BuildStatus> {
        self.entries.get(project).map(|entry| entry.value().clone())
    }

    #[cfg(test)]
    pub fn is_idle(&self, project: &ProjectId) -> bool {
        !self.entries.contains_key(project)
    }

    /// Number of projects with a pending or running build.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
