//! In-memory store with a flat folder namespace.
//!
//! Folders are stored only as full delimited paths, the way Bitwarden keeps
//! them. All hierarchy goes through [`FolderPathCodec`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use vaultbridge_common::{EntryId, Error, FolderId, Result};
use vaultbridge_vault::{
    EntryDraft, FlatFolder, FolderDraft, FolderPathCodec, VaultEntry, VaultFolder,
};

use crate::memory::OperationCounts;
use crate::repository::{EntryRepository, FolderRepository};

#[derive(Debug, Default)]
struct FlatState {
    folders: Vec<FlatFolder>,
    entries: Vec<VaultEntry>,
    counts: OperationCounts,
}

impl FlatState {
    fn raw_path(&self, id: &FolderId) -> Option<&str> {
        self.folders
            .iter()
            .find(|f| f.id.as_deref() == Some(id.as_str()))
            .map(|f| f.name.as_str())
    }
}

/// Flat-namespace store for tests and the `memory` CLI target.
#[derive(Debug, Clone, Default)]
pub struct FlatMemoryStore {
    state: Arc<RwLock<FlatState>>,
    codec: FolderPathCodec,
}

impl FlatMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(codec: FolderPathCodec) -> Self {
        Self {
            state: Arc::default(),
            codec,
        }
    }

    /// Insert a raw record as the store would report it.
    ///
    /// Records with a `None` id model the store's "no folder" container and
    /// are skipped when listing.
    pub async fn insert_raw(&self, folder: FlatFolder) {
        self.state.write().await.folders.push(folder);
    }

    /// Full stored folder names in insertion order.
    pub async fn raw_names(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .folders
            .iter()
            .filter(|f| !f.is_reserved())
            .map(|f| f.name.clone())
            .collect()
    }

    pub async fn counts(&self) -> OperationCounts {
        self.state.read().await.counts
    }

    pub async fn reset_counts(&self) {
        self.state.write().await.counts = OperationCounts::default();
    }

    fn decode(&self, state: &FlatState) -> Result<Vec<VaultFolder>> {
        let listed: Vec<FlatFolder> = state
            .folders
            .iter()
            .filter(|f| !f.is_reserved())
            .cloned()
            .collect();
        self.codec.decode(&listed)
    }

    fn entries_in(state: &FlatState, folder_id: Option<&FolderId>) -> Vec<VaultEntry> {
        state
            .entries
            .iter()
            .filter(|e| e.folder_id() == folder_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FolderRepository for FlatMemoryStore {
    async fn find_all(&self) -> Result<Vec<VaultFolder>> {
        let state = self.state.read().await;
        Ok(self
            .decode(&state)?
            .into_iter()
            .map(|f| {
                let entries = Self::entries_in(&state, Some(&f.id));
                f.with_entries(entries)
            })
            .collect())
    }

    async fn find_by_id(&self, id: &FolderId) -> Result<Option<VaultFolder>> {
        let state = self.state.read().await;
        Ok(self
            .decode(&state)?
            .into_iter()
            .find(|f| &f.id == id)
            .map(|f| f.with_entries(Self::entries_in(&state, Some(id)))))
    }

    async fn create(&self, draft: FolderDraft) -> Result<VaultFolder> {
        let name = draft.validated_name()?;
        let mut state = self.state.write().await;

        let parent_path = match &draft.parent_id {
            Some(parent) => Some(
                state
                    .raw_path(parent)
                    .ok_or_else(|| Error::NotFound(format!("Parent folder not found: {}", parent)))?
                    .to_string(),
            ),
            None => None,
        };
        let path = self.codec.qualify(parent_path.as_deref(), name);
        debug!("Creating flat folder '{}'", path);

        let id = Uuid::new_v4().to_string();
        state.folders.push(FlatFolder::new(id.clone(), path));
        state.counts.folders_created += 1;

        Ok(VaultFolder::new(FolderId::new(id)?, name, draft.parent_id.clone()))
    }

    async fn delete(&self, id: &FolderId) -> Result<()> {
        let mut state = self.state.write().await;

        let position = state
            .folders
            .iter()
            .position(|f| f.id.as_deref() == Some(id.as_str()))
            .ok_or_else(|| Error::NotFound(format!("Folder not found: {}", id)))?;

        // A flat store unfiles entries of a deleted folder.
        for entry in state.entries.iter_mut() {
            if entry.folder_id() == Some(id) {
                *entry = entry.with_folder(None);
            }
        }

        state.folders.remove(position);
        state.counts.folders_deleted += 1;
        Ok(())
    }
}

#[async_trait]
impl EntryRepository for FlatMemoryStore {
    async fn find_by_folder_id(&self, folder_id: Option<&FolderId>) -> Result<Vec<VaultEntry>> {
        Ok(Self::entries_in(&*self.state.read().await, folder_id))
    }

    async fn find_by_id(&self, id: &EntryId) -> Result<Option<VaultEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.iter().find(|e| e.id() == id).cloned())
    }

    async fn create(&self, draft: EntryDraft) -> Result<VaultEntry> {
        let mut state = self.state.write().await;

        if let Some(folder) = &draft.folder_id {
            if state.raw_path(folder).is_none() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nested_create_stores_full_path() {
        let store = FlatMemoryStore::new();

        let finance = FolderRepository::create(&store, FolderDraft::new("Finance", None))
            .await
            .unwrap();
        let taxes = FolderRepository::create(
            &store,
            FolderDraft::new("Taxes", Some(finance.id.clone())),
        )
        .await
        .unwrap();
        let year = FolderRepository::create(
            &store,
            FolderDraft::new("2023", Some(taxes.id.clone())),
        )
        .await
        .unwrap();

        assert_eq!(taxes.name, "Taxes");
        assert_eq!(year.parent_id, Some(taxes.id.clone()));
        assert_eq!(
            store.raw_names().await,
            vec!["Finance", "Finance/Taxes", "Finance/Taxes/2023"]
        );

        let listed = store.find_all().await.unwrap();
        assert_eq!(listed[2].name, "2023");
        assert_eq!(listed[2].parent_id, Some(taxes.id));
    }

    #[tokio::test]
    async fn test_reserved_container_not_listed() {
        let store = FlatMemoryStore::new();
        store
            .insert_raw(FlatFolder {
                id: None,
                name: "No Folder".to_string(),
            })
            .await;
        store.insert_raw(FlatFolder::new("7", "Work")).await;

        let listed = store.find_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Work");
    }

    #[tokio::test]
    async fn test_find_by_id_resolves_parent() {
        let store = FlatMemoryStore::new();
        store.insert_raw(FlatFolder::new("2", "Finance/Taxes")).await;
        store.insert_raw(FlatFolder::new("1", "Finance")).await;

        let taxes = FolderRepository::find_by_id(&store, &FolderId::new("2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(taxes.name, "Taxes");
        assert_eq!(taxes.parent_id, Some(FolderId::new("1").unwrap()));

        let missing = FolderRepository::find_by_id(&store, &FolderId::new("3").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_padded_names_stored_as_listed() {
        let store = FlatMemoryStore::new();
        let work = FolderRepository::create(
            &store,
            FolderDraft {
                name: "Work ".to_string(),
                parent_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(work.name, "Work");

        FolderRepository::create(&store, FolderDraft::new(" Sub", Some(work.id.clone())))
            .await
            .unwrap();
        assert_eq!(store.raw_names().await, vec!["Work", "Work/Sub"]);

        let blank = FolderRepository::create(&store, FolderDraft::new("  ", None)).await;
        assert!(matches!(blank, Err(Error::InvalidInput(_))));
        assert_eq!(store.counts().await.folders_created, 2);
    }

    #[tokio::test]
    async fn test_create_under_unknown_parent() {
        let store = FlatMemoryStore::new();
        let result = FolderRepository::create(
            &store,
            FolderDraft::new("Taxes", Some(FolderId::new("x").unwrap())),
        )
        .await;
        assert!(result.unwrap_err().is_not_found());
    }
}
