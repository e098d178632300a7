//! Bitwarden store adapter.
//!
//! Bitwarden folders have no parent links; the hierarchy is encoded in each
//! folder's name with [`FolderPathCodec`]. Items carry a single folder id.

pub mod client;
pub mod config;
pub mod mapping;
pub mod schema;

pub use client::BitwardenClient;
pub use config::BitwardenConfig;

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use vaultbridge_common::{EntryId, Error, FolderId, Result};
use vaultbridge_vault::{
    EntryDraft, FlatFolder, FolderDraft, FolderPathCodec, VaultEntry, VaultFolder,
};

use crate::repository::{EntryRepository, FolderRepository};

/// Folder names Bitwarden uses for discarded items.
const DISCARDED_FOLDER_NAMES: [&str; 2] = ["trash", "deleted"];

/// Turn a not-found failure into `None`.
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Bitwarden vault implementing both repositories.
#[derive(Clone)]
pub struct BitwardenStore {
    client: Arc<BitwardenClient>,
    codec: FolderPathCodec,
}

impl BitwardenStore {
    pub fn new(config: BitwardenConfig) -> Result<Self> {
        Ok(Self::from_client(Arc::new(BitwardenClient::new(config)?)))
    }

    pub fn from_client(client: Arc<BitwardenClient>) -> Self {
        Self {
            client,
            codec: FolderPathCodec::default(),
        }
    }

    pub fn client(&self) -> &BitwardenClient {
        &self.client
    }

    /// Folders that map to vault folders, as flat records.
    async fn listed_folders(&self) -> Result<Vec<FlatFolder>> {
        let folders = self.client.list_folders().await?;
        Ok(folders
            .into_iter()
            .filter(|f| {
                let normalized = f.name.trim().to_lowercase();
                let discarded = DISCARDED_FOLDER_NAMES.contains(&normalized.as_str());
                if discarded {
                    debug!("Skipping discarded folder '{}'", f.name);
                }
                f.id.is_some() && !discarded
            })
            .map(|f| FlatFolder {
                id: f.id,
                name: f.name,
            })
            .collect())
    }

    async fn entries_in(&self, folder_id: Option<&FolderId>) -> Result<Vec<VaultEntry>> {
        let items = self
            .client
            .list_items(folder_id.map(FolderId::as_str))
            .await?;
        items
            .into_iter()
            .filter(|item| item.deleted_date.is_none())
            .map(mapping::item_to_entry)
            .collect()
    }
}

#[async_trait]
impl FolderRepository for BitwardenStore {
    async fn find_all(&self) -> Result<Vec<VaultFolder>> {
        let folders = self.codec.decode(&self.listed_folders().await?)?;

        let entries = try_join_all(folders.iter().map(|f| self.entries_in(Some(&f.id)))).await?;

        Ok(folders
            .into_iter()
            .zip(entries)
            .map(|(folder, entries)| folder.with_entries(entries))
            .collect())
    }

    async fn find_by_id(&self, id: &FolderId) -> Result<Option<VaultFolder>> {
        let Some(raw) = optional(self.client.get_folder(id.as_str()).await)? else {
            return Ok(None);
        };
        let (_, path) = self.codec.decode_one(&FlatFolder {
            id: raw.id,
            name: raw.name,
        })?;

        // The parent link needs every other folder's path.
        let folder = self
            .codec
            .decode(&self.listed_folders().await?)?
            .into_iter()
            .find(|f| &f.id == id)
            .unwrap_or_else(|| {
                let (_, name) = self.codec.split(&path);
                VaultFolder::new(id.clone(), name, None)
            });

        let entries = self.entries_in(Some(id)).await?;
        Ok(Some(folder.with_entries(entries)))
    }

    async fn create(&self, draft: FolderDraft) -> Result<VaultFolder> {
        let name = draft.validated_name()?;
        let parent_path = match &draft.parent_id {
            Some(parent) => {
                let raw = self.client.get_folder(parent.as_str()).await?;
                let (_, path) = self.codec.decode_one(&FlatFolder {
                    id: raw.id,
                    name: raw.name,
                })?;
                Some(path)
            }
            None => None,
        };

        let path = self.codec.qualify(parent_path.as_deref(), name);
        let created = self.client.create_folder(&path).await?;
        let id = created.id.ok_or_else(|| {
            Error::Schema(format!("Created folder '{}' has no id", created.name))
        })?;

        Ok(VaultFolder::new(FolderId::new(id)?, name, draft.parent_id.clone()))
    }

    async fn delete(&self, id: &FolderId) -> Result<()> {
        self.client.delete_folder(id.as_str()).await
    }
}

#[async_trait]
impl EntryRepository for BitwardenStore {
    async fn find_by_folder_id(&self, folder_id: Option<&FolderId>) -> Result<Vec<VaultEntry>> {
        self.entries_in(folder_id).await
    }

    async fn find_by_id(&self, id: &EntryId) -> Result<Option<VaultEntry>> {
        optional(self.client.get_item(id.as_str()).await)?
            .map(mapping::item_to_entry)
            .transpose()
    }

    async fn create(&self, draft: EntryDraft) -> Result<VaultEntry> {
        let request =
            mapping::draft_to_item(&draft, self.client.config().organization_id.as_deref());
        let created = self.client.create_item(&request).await?;
        mapping::item_to_entry(created)
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        self.client.delete_item(id.as_str()).await
    }
}
