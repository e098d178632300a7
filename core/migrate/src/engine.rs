//! Migration engine that copies a source vault into a target vault.
//!
//! Folders and entries are matched by name and structural position, never by
//! id, because ids from two stores are unrelated. A folder is reused when the
//! target has a folder of the same name whose parent has the same name as the
//! source parent. An entry is skipped when the target has an entry of the same
//! name inside a folder of the same name. Existing target entries are never
//! overwritten.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

use vaultbridge_common::{FolderId, Result};
use vaultbridge_storage::Store;
use vaultbridge_vault::{FolderDraft, VaultEntry, VaultFolder, VaultIndex};

use crate::load::load_vault;
use crate::report::MigrationReport;

/// Configuration for a migration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Delete every target folder and entry before copying.
    ///
    /// A run with this set is not idempotent.
    pub clear_target: bool,
}

/// A folder resolved on the target side.
#[derive(Debug, Clone)]
struct TargetFolder {
    id: FolderId,
    name: String,
}

/// Copies one store into another.
pub struct MigrationEngine {
    source: Store,
    target: Store,
    config: MigrationConfig,
}

impl MigrationEngine {
    pub fn new(source: Store, target: Store, config: MigrationConfig) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run the migration.
    ///
    /// # Postconditions
    /// - Every source folder has a counterpart at the same position in the
    ///   target, and every source entry a counterpart in that folder
    ///
    /// # Errors
    /// The first store failure aborts the run. Target changes made up to that
    /// point stay in place.
    pub async fn execute(&self) -> Result<MigrationReport> {
        let start = Instant::now();
        let mut report = MigrationReport::default();

        info!(
            "Starting migration{}",
            if self.config.clear_target {
                " (clearing target)"
            } else {
                ""
            }
        );

        let (source, target) =
            tokio::try_join!(load_vault(&self.source), load_vault(&self.target))?;
        info!(
            "Loaded source ({} folders, {} entries) and target ({} folders, {} entries)",
            source.folder_count(),
            source.entry_count(),
            target.folder_count(),
            target.entry_count()
        );

        let target = if self.config.clear_target {
            self.clear_target(&target, &mut report).await?;
            None
        } else {
            Some(target)
        };

        self.migrate_folders(&source, target.as_ref(), &mut report)
            .await?;

        let root_entries = source.root_entries();
        self.migrate_entries(&root_entries, None, target.as_ref(), &mut report)
            .await?;

        report.duration = start.elapsed();
        info!(
            "Migration completed in {:?}: {} folders created, {} reused, {} entries created, {} skipped, {} deleted",
            report.duration,
            report.folders_created,
            report.folders_reused,
            report.entries_created,
            report.entries_skipped,
            report.deletes()
        );

        Ok(report)
    }

    /// Delete everything the target held when it was loaded.
    ///
    /// Folders go deepest first, each after its own entries. Unfiled entries
    /// go last.
    async fn clear_target(&self, target: &VaultIndex, report: &mut MigrationReport) -> Result<()> {
        info!("Clearing target");

        for folder in clear_order(target) {
            for entry in target.folder_entries(&folder.id) {
                self.target.entries.delete(entry.id()).await?;
                report.entries_deleted += 1;
            }
            self.target.folders.delete(&folder.id).await?;
            report.folders_deleted += 1;
            debug!("Deleted target folder '{}'", folder.name);
        }

        for entry in target.root_entries() {
            self.target.entries.delete(entry.id()).await?;
            report.entries_deleted += 1;
        }

        Ok(())
    }

    /// Walk the source tree depth-first, parents before children.
    async fn migrate_folders(
        &self,
        source: &VaultIndex,
        target: Option<&VaultIndex>,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let mut stack: Vec<(&VaultFolder, Option<FolderId>)> = source
            .root_folders()
            .into_iter()
            .rev()
            .map(|folder| (folder, None))
            .collect();

        while let Some((folder, target_parent)) = stack.pop() {
            let parent_name = source.parent_folder(folder).map(|p| p.name.as_str());
            let resolved = self
                .resolve_folder(folder, parent_name, target_parent, target, report)
                .await?;

            let entries = source.folder_entries(&folder.id);
            self.migrate_entries(&entries, Some(&resolved), target, report)
                .await?;

            stack.extend(
                source
                    .child_folders(&folder.id)
                    .into_iter()
                    .rev()
                    .map(|child| (child, Some(resolved.id.clone()))),
            );
        }

        Ok(())
    }

    /// Find the target counterpart of a source folder, creating it if needed.
    async fn resolve_folder(
        &self,
        folder: &VaultFolder,
        parent_name: Option<&str>,
        target_parent: Option<FolderId>,
        target: Option<&VaultIndex>,
        report: &mut MigrationReport,
    ) -> Result<TargetFolder> {
        let existing = target.and_then(|index| {
            index
                .find_folders_by_name(&folder.name)
                .find(|m| m.parent_name == parent_name)
        });

        if let Some(found) = existing {
            debug!("Reusing target folder '{}'", folder.name);
            report.folders_reused += 1;
            return Ok(TargetFolder {
                id: found.folder.id.clone(),
                name: found.folder.name.clone(),
            });
        }

        let created = self
            .target
            .folders
            .create(FolderDraft::new(folder.name.clone(), target_parent))
            .await?;
        info!("Created folder '{}'", folder.name);
        report.folders_created += 1;

        Ok(TargetFolder {
            id: created.id,
            name: created.name,
        })
    }

    /// Copy entries into a resolved target folder, or to the target root.
    async fn migrate_entries(
        &self,
        entries: &[&VaultEntry],
        folder: Option<&TargetFolder>,
        target: Option<&VaultIndex>,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let folder_name = folder.map(|f| f.name.as_str());

        for entry in entries {
            let exists = target.is_some_and(|index| {
                index
                    .find_entries_by_name(entry.name())
                    .any(|m| m.folder_name == folder_name)
            });
            if exists {
                debug!("Skipping existing entry '{}'", entry.name());
                report.entries_skipped += 1;
                continue;
            }

            let draft = entry.to_draft().with_folder(folder.map(|f| f.id.clone()));
            self.target.entries.create(draft).await?;
            info!(
                "Created entry '{}' in {}",
                entry.name(),
                folder_name.unwrap_or("<root>")
            );
            report.entries_created += 1;
        }

        Ok(())
    }
}

/// Folders reachable from the roots, parents before children.
fn pre_order(index: &VaultIndex) -> Vec<&VaultFolder> {
    let mut order = Vec::with_capacity(index.folder_count());
    let mut stack: Vec<&VaultFolder> = index.root_folders().into_iter().rev().collect();
    while let Some(folder) = stack.pop() {
        order.push(folder);
        stack.extend(index.child_folders(&folder.id).into_iter().rev());
    }
    order
}

/// Deletion order: children before parents, then folders no root reaches.
fn clear_order(index: &VaultIndex) -> Vec<&VaultFolder> {
    let mut order = pre_order(index);
    order.reverse();

    let reached: HashSet<&FolderId> = order.iter().map(|f| &f.id).collect();
    let unreached: Vec<&VaultFolder> = index
        .folders()
        .iter()
        .filter(|f| !reached.contains(&f.id))
        .collect();
    order.extend(unreached);
    order
}
