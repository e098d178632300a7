//! In-memory index of one store side.
//!
//! The index holds every folder and entry loaded from a store and derives the
//! tree (roots, children, folder contents) from the flat parent links. Stores
//! hold hundreds of records, not millions, so derived lookups are linear scans.

use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use vaultbridge_common::{EntryId, Error, FolderId, Result};

use crate::entry::VaultEntry;
use crate::folder::VaultFolder;

/// A folder found by name, with its parent's name as structural context.
#[derive(Debug, Clone, Copy)]
pub struct FolderMatch<'a> {
    pub folder: &'a VaultFolder,
    pub parent_name: Option<&'a str>,
}

/// An entry found by name, with its containing folder's name as structural context.
#[derive(Debug, Clone, Copy)]
pub struct EntryMatch<'a> {
    pub entry: &'a VaultEntry,
    pub folder_name: Option<&'a str>,
}

/// Folders and entries of one vault side.
#[derive(Debug, Clone, Default)]
pub struct VaultIndex {
    folders: Vec<VaultFolder>,
    folder_slots: HashMap<FolderId, usize>,
    entries: Vec<VaultEntry>,
    entry_slots: HashMap<EntryId, usize>,
    /// Derived: positions of folders without a parent.
    root_folders: Vec<usize>,
    /// Derived: positions of entries without a folder.
    root_entries: Vec<usize>,
}

impl VaultIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one folder (and its attached entries).
    pub fn add_folder(&mut self, folder: VaultFolder) {
        self.add_folders(std::iter::once(folder));
    }

    /// Insert one entry.
    pub fn add_entry(&mut self, entry: VaultEntry) {
        self.add_entries(std::iter::once(entry));
    }

    /// Bulk insert folders.
    ///
    /// Entries attached to a folder are moved into the entry map and filed
    /// under that folder. A folder whose id is already known replaces the
    /// previous one. Derived sets are recomputed afterwards.
    pub fn add_folders(&mut self, folders: impl IntoIterator<Item = VaultFolder>) {
        for mut folder in folders {
            let entries = std::mem::take(&mut folder.entries);
            let folder_id = folder.id.clone();
            self.insert_folder(folder);

            for entry in entries {
                let entry = if entry.folder_id() == Some(&folder_id) {
                    entry
                } else {
                    entry.with_folder(Some(folder_id.clone()))
                };
                self.insert_entry(entry);
            }
        }
        self.rebuild();
    }

    /// Bulk insert entries. Derived sets are recomputed afterwards.
    pub fn add_entries(&mut self, entries: impl IntoIterator<Item = VaultEntry>) {
        for entry in entries {
            self.insert_entry(entry);
        }
        self.rebuild();
    }

    fn insert_folder(&mut self, folder: VaultFolder) {
        match self.folder_slots.get(&folder.id) {
            Some(&slot) => self.folders[slot] = folder,
            None => {
                self.folder_slots.insert(folder.id.clone(), self.folders.len());
                self.folders.push(folder);
            }
        }
    }

    fn insert_entry(&mut self, entry: VaultEntry) {
        match self.entry_slots.get(entry.id()) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.entry_slots.insert(entry.id().clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Recompute root sets.
    fn rebuild(&mut self) {
        self.root_folders = self
            .folders
            .iter()
            .enumerate()
            .filter(|(_, f)| f.parent_id.is_none())
            .map(|(i, _)| i)
            .collect();

        self.root_entries = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.folder_id().is_none())
            .map(|(i, _)| i)
            .collect();

        let dangling = self
            .folders
            .iter()
            .filter(|f| {
                f.parent_id
                    .as_ref()
                    .is_some_and(|p| !self.folder_slots.contains_key(p))
            })
            .count();
        if dangling > 0 {
            warn!("{} folder(s) reference a parent that is not loaded", dangling);
        }
    }

    /// Look up a folder by id.
    pub fn find_folder(&self, id: &FolderId) -> Option<&VaultFolder> {
        self.folder_slots.get(id).map(|&slot| &self.folders[slot])
    }

    /// Look up an entry by id.
    pub fn find_entry(&self, id: &EntryId) -> Option<&VaultEntry> {
        self.entry_slots.get(id).map(|&slot| &self.entries[slot])
    }

    /// First folder with the given name, with its parent's name.
    pub fn find_folder_by_name<'a>(&'a self, name: &'a str) -> Option<FolderMatch<'a>> {
        self.find_folders_by_name(name).next()
    }

    /// Every folder with the given name, in insertion order.
    pub fn find_folders_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = FolderMatch<'a>> + 'a {
        self.folders
            .iter()
            .filter(move |f| f.name == name)
            .map(move |folder| FolderMatch {
                folder,
                parent_name: self.parent_folder(folder).map(|p| p.name.as_str()),
            })
    }

    /// First entry with the given name, with its containing folder's name.
    pub fn find_entry_by_name<'a>(&'a self, name: &'a str) -> Option<EntryMatch<'a>> {
        self.find_entries_by_name(name).next()
    }

    /// Every entry with the given name, in insertion order.
    pub fn find_entries_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = EntryMatch<'a>> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.name() == name)
            .map(move |entry| EntryMatch {
                entry,
                folder_name: entry
                    .folder_id()
                    .and_then(|id| self.find_folder(id))
                    .map(|f| f.name.as_str()),
            })
    }

    /// Folders without a parent.
    pub fn root_folders(&self) -> Vec<&VaultFolder> {
        self.root_folders.iter().map(|&i| &self.folders[i]).collect()
    }

    /// Entries without a folder.
    pub fn root_entries(&self) -> Vec<&VaultEntry> {
        self.root_entries.iter().map(|&i| &self.entries[i]).collect()
    }

    /// Direct children of a folder.
    pub fn child_folders(&self, parent_id: &FolderId) -> Vec<&VaultFolder> {
        self.folders
            .iter()
            .filter(|f| f.parent_id.as_ref() == Some(parent_id))
            .collect()
    }

    /// Entries filed directly in a folder.
    pub fn folder_entries(&self, folder_id: &FolderId) -> Vec<&VaultEntry> {
        self.entries
            .iter()
            .filter(|e| e.folder_id() == Some(folder_id))
            .collect()
    }

    /// Parent of a folder, if it has one and it is loaded.
    pub fn parent_folder(&self, folder: &VaultFolder) -> Option<&VaultFolder> {
        folder.parent_id.as_ref().and_then(|id| self.find_folder(id))
    }

    /// All folders in insertion order.
    pub fn folders(&self) -> &[VaultFolder] {
        &self.folders
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[VaultEntry] {
        &self.entries
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.entries.is_empty()
    }

    /// Render the vault as a nested tree.
    pub fn to_json(&self) -> Result<String> {
        let view = VaultView {
            root_folders: self
                .root_folders()
                .into_iter()
                .map(|f| self.folder_view(f, 0))
                .collect(),
            root_entries: self.root_entries(),
        };
        serde_json::to_string_pretty(&view).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn folder_view<'a>(&'a self, folder: &'a VaultFolder, depth: usize) -> FolderView<'a> {
        // A parent cycle would otherwise recurse forever.
        let child_folders = if depth < self.folders.len() {
            self.child_folders(&folder.id)
                .into_iter()
                .map(|c| self.folder_view(c, depth + 1))
                .collect()
        } else {
            Vec::new()
        };

        FolderView {
            id: &folder.id,
            name: &folder.name,
            child_folders,
            entries: self.folder_entries(&folder.id),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VaultView<'a> {
    root_folders: Vec<FolderView<'a>>,
    root_entries: Vec<&'a VaultEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderView<'a> {
    id: &'a FolderId,
    name: &'a str,
    child_folders: Vec<FolderView<'a>>,
    entries: Vec<&'a VaultEntry>,
}
