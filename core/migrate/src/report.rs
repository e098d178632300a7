//! Migration outcome.

use std::time::Duration;

/// Counts of everything a migration run did to the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub folders_created: usize,
    /// Source folders matched to an existing target folder.
    pub folders_reused: usize,
    pub entries_created: usize,
    /// Source entries already present in the target.
    pub entries_skipped: usize,
    pub folders_deleted: usize,
    pub entries_deleted: usize,
    pub duration: Duration,
}

impl MigrationReport {
    /// Total create calls issued against the target.
    pub fn creates(&self) -> usize {
        self.folders_created + self.entries_created
    }

    /// Total delete calls issued against the target.
    pub fn deletes(&self) -> usize {
        self.folders_deleted + self.entries_deleted
    }
}
