//! In-memory hierarchical store for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use vaultbridge_common::{EntryId, Error, FolderId, Result};
use vaultbridge_vault::{EntryDraft, FolderDraft, VaultEntry, VaultFolder};

use crate::repository::{EntryRepository, FolderRepository};

/// Number of mutating calls a store has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub folders_created: usize,
    pub folders_deleted: usize,
    pub entries_created: usize,
    pub entries_deleted: usize,
}

impl OperationCounts {
    pub fn creates(&self) -> usize {
        self.folders_created + self.entries_created
    }

    pub fn deletes(&self) -> usize {
        self.folders_deleted + self.entries_deleted
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    folders: Vec<VaultFolder>,
    entries: Vec<VaultEntry>,
    counts: OperationCounts,
}

impl MemoryState {
    fn folder(&self, id: &FolderId) -> Option<&VaultFolder> {
        self.folders.iter().find(|f| &f.id == id)
    }

    fn entries_in(&self, folder_id: Option<&FolderId>) -> Vec<VaultEntry> {
        self.entries
            .iter()
            .filter(|e| e.folder_id() == folder_id)
            .cloned()
            .collect()
    }
}

/// In-memory store with native parent links.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. Ids are random UUIDs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutating calls served so far.
    pub async fn counts(&self) -> OperationCounts {
        self.state.read().await.counts
    }

    /// Forget the operation counters, keeping the data.
    pub async fn reset_counts(&self) {
        self.state.write().await.counts = OperationCounts::default();
    }

    pub async fn folder_count(&self) -> usize {
        self.state.read().await.folders.len()
    }

    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

#[async_trait]
impl FolderRepository for MemoryStore {
    async fn find_all(&self) -> Result<Vec<VaultFolder>> {
        let state = self.state.read().await;
        Ok(state
            .folders
            .iter()
            .map(|f| f.clone().with_entries(state.entries_in(Some(&f.id))))
            .collect())
    }

    async fn find_by_id(&self, id: &FolderId) -> Result<Option<VaultFolder>> {
        let state = self.state.read().await;
        Ok(state
            .folder(id)
            .map(|f| f.clone().with_entries(state.entries_in(Some(id)))))
    }

    async fn create(&self, draft: FolderDraft) -> Result<VaultFolder> {
        draft.validated_name()?;
        let mut state = self.state.write().await;

        if let Some(parent) = &draft.parent_id {
            if state.folder(parent).is_none() {
                return Err(Error::NotFound(format!("Parent folder not found: {}", parent)));
            }
        }

        let folder = VaultFolder::new(
            FolderId::new(Uuid::new_v4().to_string())?,
            draft.name,
            draft.parent_id,
        );
        state.folders.push(folder.clone());
        state.counts.folders_created += 1;

        Ok(folder)
    }

    async fn delete(&self, id: &FolderId) -> Result<()> {
        let mut state = self.state.write().await;

        let position = state
            .folders
            .iter()
            .position(|f| &f.id == id)
            .ok_or_else(|| Error::NotFound(format!("Folder not found: {}", id)))?;

        let held = state.entries_in(Some(id)).len();
        if held > 0 {
            return Err(Error::InvalidInput(format!(
                "Folder {} still holds {} entries",
                id, held
            )));
        }

        state.folders.remove(position);
        state.counts.folders_deleted += 1;
        Ok(())
    }
}

#[async_trait]
impl EntryRepository for MemoryStore {
    async fn find_by_folder_id(&self, folder_id: Option<&FolderId>) -> Result<Vec<VaultEntry>> {
        Ok(self.state.read().await.entries_in(folder_id))
    }

    async fn find_by_id(&self, id: &EntryId) -> Result<Option<VaultEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.iter().find(|e| e.id() == id).cloned())
    }

    async fn create(&self, draft: EntryDraft) -> Result<VaultEntry> {
        let mut state = self.state.write().await;

        if let Some(folder) = &draft.folder_id {
            if state.folder(folder).is_none() {
                return Err(Error::NotFound(format!("Folder not found: {}", folder)));
            }
        }

        let entry = VaultEntry::from_draft(EntryId::new(Uuid::new_v4().to_string())?, draft)?;
        state.entries.push(entry.clone());
        state.counts.entries_created += 1;

        Ok(entry)
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        let mut state = self.state.write().await;

        let position = state
            .entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| Error::NotFound(format!("Entry not found: {}", id)))?;

        state.entries.remove(position);
        state.counts.entries_deleted += 1;
        Ok(())
    }
}
