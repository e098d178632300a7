//! Folders and folder create projections.

use serde::Serialize;

use vaultbridge_common::{Error, FolderId, Result};

use crate::entry::VaultEntry;

/// A named container of entries and child folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultFolder {
    /// Store-assigned identifier.
    pub id: FolderId,
    /// Unqualified display name.
    pub name: String,
    /// Parent folder, `None` for a root folder.
    pub parent_id: Option<FolderId>,
    /// Entries directly inside this folder, as delivered by a store adapter.
    ///
    /// `VaultIndex` moves these into its entry map on insert.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<VaultEntry>,
}

impl VaultFolder {
    /// Create a folder without entries. Surrounding whitespace is dropped from
    /// the name.
    pub fn new(id: FolderId, name: impl Into<String>, parent_id: Option<FolderId>) -> Self {
        Self {
            id,
            name: trimmed(name.into()),
            parent_id,
            entries: Vec::new(),
        }
    }

    /// Attach the folder's direct entries.
    pub fn with_entries(mut self, entries: Vec<VaultEntry>) -> Self {
        self.entries = entries;
        self
    }

    /// Check if this is a root folder.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Create projection of a folder, handed to `FolderRepository::create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDraft {
    pub name: String,
    pub parent_id: Option<FolderId>,
}

impl FolderDraft {
    pub fn new(name: impl Into<String>, parent_id: Option<FolderId>) -> Self {
        Self {
            name: trimmed(name.into()),
            parent_id,
        }
    }

    /// Name a store should persist, without surrounding whitespace.
    ///
    /// # Errors
    /// - `InvalidInput` if the name is blank
    pub fn validated_name(&self) -> Result<&str> {
        match self.name.trim() {
            "" => Err(Error::InvalidInput("folder must have a non-empty name".to_string())),
            name => Ok(name),
        }
    }
}

fn trimmed(name: String) -> String {
    match name.trim() {
        t if t.len() == name.len() => name,
        t => t.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_trimmed() {
        let id = FolderId::new("f1").unwrap();
        assert_eq!(VaultFolder::new(id, " Work ", None).name, "Work");
        assert_eq!(FolderDraft::new("Work\t", None).name, "Work");
    }

    #[test]
    fn test_blank_draft_name_rejected() {
        let draft = FolderDraft {
            name: "  Taxes ".to_string(),
            parent_id: None,
        };
        assert_eq!(draft.validated_name().unwrap(), "Taxes");

        let blank = FolderDraft::new("   ", None);
        assert!(matches!(blank.validated_name(), Err(Error::InvalidInput(_))));
    }
}
