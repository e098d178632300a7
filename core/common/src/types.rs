//! Identifier types used throughout vaultbridge.
//!
//! Folder and entry identifiers are opaque strings assigned by a store. They
//! are separate types so one can never be passed where the other is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            ///
            /// # Errors
            /// - Returns `InvalidIdentifier` if `id` is empty or whitespace-only
            pub fn new(id: impl Into<String>) -> crate::Result<Self> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(crate::Error::InvalidIdentifier(format!(
                        "{} must be a non-empty string",
                        $label
                    )));
                }
                Ok(Self(id))
            }

            /// Get the inner string value.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = crate::Error;

            fn try_from(value: String) -> crate::Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

string_id!(
    /// Store-assigned identifier of a folder.
    FolderId,
    "FolderId"
);

string_id!(
    /// Store-assigned identifier of an entry.
    EntryId,
    "EntryId"
);
