//! Common utilities and types shared across vaultbridge modules.
//!
//! This module provides the error taxonomy and the identifier types used by
//! every store adapter, the vault model and the migration engine.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{EntryId, FolderId};
