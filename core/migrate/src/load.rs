//! Loading one store side into an index.

use tracing::debug;

use vaultbridge_common::Result;
use vaultbridge_storage::Store;
use vaultbridge_vault::VaultIndex;

/// Fetch every folder and the unfiled entries of a store.
///
/// Both requests run concurrently; either failure aborts the load.
pub async fn load_vault(store: &Store) -> Result<VaultIndex> {
    let (folders, root_entries) = tokio::try_join!(
        store.folders.find_all(),
        store.entries.find_by_folder_id(None)
    )?;

    let mut index = VaultIndex::new();
    index.add_folders(folders);
    index.add_entries(root_entries);

    debug!(
        "Loaded {} folders and {} entries",
        index.folder_count(),
        index.entry_count()
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vaultbridge_storage::{EntryRepository, FolderRepository, MemoryStore};
    use vaultbridge_vault::{EntryDetails, EntryDraft, ExtraFields, FolderDraft, NoteDetails};

    #[tokio::test]
    async fn test_load_collects_folder_and_root_entries() {
        let memory = Arc::new(MemoryStore::new());
        let folder = FolderRepository::create(&*memory, FolderDraft::new("Work", None))
            .await
            .unwrap();
        for folder_id in [Some(folder.id.clone()), None] {
            EntryRepository::create(
                &*memory,
                EntryDraft {
                    name: "VPN".to_string(),
                    folder_id,
                    extra_fields: ExtraFields::new(),
                    details: EntryDetails::Note(NoteDetails::default()),
                },
            )
            .await
            .unwrap();
        }

        let index = load_vault(&Store::from_shared(memory)).await.unwrap();
        assert_eq!(index.folder_count(), 1);
        assert_eq!(index.entry_count(), 2);
        assert_eq!(index.folder_entries(&folder.id).len(), 1);
        assert_eq!(index.root_entries().len(), 1);
    }
}
