//! Repository contract every store adapter implements.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use vaultbridge_common::{EntryId, FolderId, Result};
use vaultbridge_vault::{EntryDraft, FolderDraft, VaultEntry, VaultFolder};

/// Folder access for one store.
///
/// Implementations must handle their own authentication and rate limiting.
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// List every folder of the store.
    ///
    /// # Postconditions
    /// - Each folder carries its unqualified name and resolved parent id
    /// - Adapters that can do so attach each folder's direct entries
    ///
    /// # Errors
    /// - Network/I/O errors
    /// - Authentication errors
    /// - Schema mismatch
    async fn find_all(&self) -> Result<Vec<VaultFolder>>;

    /// Look up a single folder. A missing folder is `Ok(None)`.
    async fn find_by_id(&self, id: &FolderId) -> Result<Option<VaultFolder>>;

    /// Create a folder.
    ///
    /// # Preconditions
    /// - `draft.parent_id`, when set, names an existing folder
    ///
    /// # Postconditions
    /// - Returns the created folder with its store id, unqualified name and
    ///   the requested parent id
    ///
    /// # Errors
    /// - `Unsupported` for read-only stores
    /// - `NotFound` if the parent does not exist
    async fn create(&self, draft: FolderDraft) -> Result<VaultFolder>;

    /// Delete a folder.
    async fn delete(&self, id: &FolderId) -> Result<()>;
}

/// Entry access for one store.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// List the entries filed directly under `folder_id`, or the unfiled
    /// entries when `folder_id` is `None`.
    async fn find_by_folder_id(&self, folder_id: Option<&FolderId>) -> Result<Vec<VaultEntry>>;

    /// Look up a single entry. A missing entry is `Ok(None)`.
    async fn find_by_id(&self, id: &EntryId) -> Result<Option<VaultEntry>>;

    /// Create an entry from its draft.
    ///
    /// # Errors
    /// - `Unsupported` for read-only stores
    async fn create(&self, draft: EntryDraft) -> Result<VaultEntry>;

    /// Delete an entry.
    async fn delete(&self, id: &EntryId) -> Result<()>;
}

/// One side of a migration: a folder repository and an entry repository
/// backed by the same store.
#[derive(Clone)]
pub struct Store {
    pub folders: Arc<dyn FolderRepository>,
    pub entries: Arc<dyn EntryRepository>,
}

impl Store {
    pub fn new(folders: Arc<dyn FolderRepository>, entries: Arc<dyn EntryRepository>) -> Self {
        Self { folders, entries }
    }

    /// Bundle a single adapter that implements both repositories.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: FolderRepository + EntryRepository + 'static,
    {
        Self {
            folders: store.clone(),
            entries: store,
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
