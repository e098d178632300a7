//! Vault model for vaultbridge.
//!
//! This module provides:
//! - The closed set of entry kinds (login, secure note, payment card)
//! - Folders and the create projections handed to store adapters
//! - `VaultIndex`, the in-memory view of one store side
//! - `FolderPathCodec`, mapping a folder tree onto a flat namespace
//!
//! # Architecture
//! Store adapters build `VaultFolder`/`VaultEntry` values, the index derives
//! the hierarchy, and the migration engine reads both indexes to reconcile.

pub mod card;
pub mod codec;
pub mod entry;
pub mod folder;
pub mod index;

pub use card::CardDate;
pub use codec::{FlatFolder, FolderPathCodec, DEFAULT_DELIMITER};
pub use entry::{
    CardDetails, EntryDetails, EntryDraft, EntryKind, ExtraFields, NoteDetails, PasswordDetails,
    VaultEntry,
};
pub use folder::{FolderDraft, VaultFolder};
pub use index::{EntryMatch, FolderMatch, VaultIndex};
