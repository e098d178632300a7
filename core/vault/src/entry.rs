//! Vault entries: the secret records held in folders.
//!
//! Every entry carries the same header (id, name, folder, extra fields) and
//! exactly one kind-specific payload from the closed `EntryDetails` set.

use serde::Serialize;
use std::collections::BTreeMap;

use vaultbridge_common::{EntryId, Error, FolderId, Result};

use crate::card::CardDate;

/// Named string fields not captured by the typed payload. Keys are unique.
pub type ExtraFields = BTreeMap<String, String>;

/// Discriminant of an entry's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Password,
    Note,
    CreditCard,
}

/// Login credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordDetails {
    username: String,
    password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl PasswordDetails {
    /// Create login details.
    ///
    /// A URL without an `http://` or `https://` scheme gets `https://`
    /// prepended. Blank URLs are dropped.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        let url = url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .map(|u| {
                if u.starts_with("http://") || u.starts_with("https://") {
                    u
                } else {
                    format!("https://{}", u)
                }
            });

        Self {
            username: username.into(),
            password: password.into(),
            url,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// Secure note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteDetails {
    pub content: String,
}

/// Payment card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardDetails {
    pub company: String,
    pub number: String,
    pub holder_name: String,
    pub expiration: Option<CardDate>,
    pub valid_from: Option<CardDate>,
    pub security_code: String,
}

/// Kind-specific payload of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDetails {
    Password(PasswordDetails),
    Note(NoteDetails),
    CreditCard(CardDetails),
}

impl EntryDetails {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryDetails::Password(_) => EntryKind::Password,
            EntryDetails::Note(_) => EntryKind::Note,
            EntryDetails::CreditCard(_) => EntryKind::CreditCard,
        }
    }
}

/// A single secret record as read from a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultEntry {
    id: EntryId,
    name: String,
    folder_id: Option<FolderId>,
    extra_fields: ExtraFields,
    #[serde(flatten)]
    details: EntryDetails,
}

impl VaultEntry {
    /// Create an entry.
    ///
    /// # Errors
    /// - `InvalidInput` if `name` is blank; callers substitute
    ///   [`VaultEntry::placeholder_name`] for records without a title
    pub fn new(
        id: EntryId,
        name: impl Into<String>,
        folder_id: Option<FolderId>,
        extra_fields: ExtraFields,
        details: EntryDetails,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "entry {} must have a non-empty name",
                id
            )));
        }

        Ok(Self {
            id,
            name,
            folder_id,
            extra_fields,
            details,
        })
    }

    /// Build the stored entry a store returns for a created draft.
    pub fn from_draft(id: EntryId, draft: EntryDraft) -> Result<Self> {
        Self::new(
            id,
            draft.name,
            draft.folder_id,
            draft.extra_fields,
            draft.details,
        )
    }

    /// Title used when a record has none.
    pub fn placeholder_name(id: &EntryId) -> String {
        format!("Untitled Entry {}", id)
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn folder_id(&self) -> Option<&FolderId> {
        self.folder_id.as_ref()
    }

    pub fn extra_fields(&self) -> &ExtraFields {
        &self.extra_fields
    }

    pub fn details(&self) -> &EntryDetails {
        &self.details
    }

    pub fn kind(&self) -> EntryKind {
        self.details.kind()
    }

    /// Copy of this entry filed under another folder.
    pub fn with_folder(&self, folder_id: Option<FolderId>) -> Self {
        Self {
            folder_id,
            ..self.clone()
        }
    }

    /// Projection carrying everything needed to recreate this entry elsewhere.
    pub fn to_draft(&self) -> EntryDraft {
        EntryDraft {
            name: self.name.clone(),
            folder_id: self.folder_id.clone(),
            extra_fields: self.extra_fields.clone(),
            details: self.details.clone(),
        }
    }
}

/// Create projection of an entry, handed to `EntryRepository::create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDraft {
    pub name: String,
    pub folder_id: Option<FolderId>,
    pub extra_fields: ExtraFields,
    pub details: EntryDetails,
}

impl EntryDraft {
    /// Retarget the draft at another folder (`None` files it at the root).
    pub fn with_folder(mut self, folder_id: Option<FolderId>) -> Self {
        self.folder_id = folder_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(s: &str) -> EntryId {
        EntryId::new(s).unwrap()
    }

    #[test]
    fn test_url_normalization() {
        let bare = PasswordDetails::new("u", "p", Some("example.com".to_string()));
        assert_eq!(bare.url(), Some("https://example.com"));

        let http = PasswordDetails::new("u", "p", Some("http://example.com".to_string()));
        assert_eq!(http.url(), Some("http://example.com"));

        let blank = PasswordDetails::new("u", "p", Some("  ".to_string()));
        assert_eq!(blank.url(), None);

        assert_eq!(PasswordDetails::new("u", "p", None).url(), None);
    }

    #[test]
    fn test_blank_name_rejected() {
        let result = VaultEntry::new(
            eid("e1"),
            "  ",
            None,
            ExtraFields::new(),
            EntryDetails::Note(NoteDetails::default()),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(VaultEntry::placeholder_name(&eid("e1")), "Untitled Entry e1");
    }

    #[test]
    fn test_draft_round_trip_keeps_kind_and_fields() {
        let mut extra = ExtraFields::new();
        extra.insert("pin".to_string(), "1234".to_string());

        let entry = VaultEntry::new(
            eid("e1"),
            "Visa",
            Some(FolderId::new("f1").unwrap()),
            extra,
            EntryDetails::CreditCard(CardDetails {
                company: "Visa".to_string(),
                number: "4111".to_string(),
                holder_name: "A. Holder".to_string(),
                expiration: CardDate::new(3, 2027),
                valid_from: None,
                security_code: "123".to_string(),
            }),
        )
        .unwrap();

        let draft = entry.to_draft().with_folder(None);
        assert_eq!(draft.folder_id, None);

        let copy = VaultEntry::from_draft(eid("e2"), draft).unwrap();
        assert_eq!(copy.kind(), EntryKind::CreditCard);
        assert_eq!(copy.name(), "Visa");
        assert_eq!(copy.extra_fields().get("pin").map(String::as_str), Some("1234"));
        assert_eq!(copy.details(), entry.details());
    }

    #[test]
    fn test_serialization_is_kind_tagged() {
        let entry = VaultEntry::new(
            eid("e1"),
            "Bank",
            None,
            ExtraFields::new(),
            EntryDetails::Password(PasswordDetails::new("me", "pw", Some("bank.com".into()))),
        )
        .unwrap();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "password");
        assert_eq!(json["url"], "https://bank.com");
        assert_eq!(json["name"], "Bank");
    }
}
