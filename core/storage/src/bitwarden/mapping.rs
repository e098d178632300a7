//! Translation between Bitwarden items and vault entries.

use tracing::warn;

use vaultbridge_common::{EntryId, FolderId, Result};
use vaultbridge_vault::{
    CardDate, CardDetails, EntryDetails, EntryDraft, ExtraFields, NoteDetails, PasswordDetails,
    VaultEntry,
};

use super::schema::{
    Card, Field, Identity, Item, ItemRequest, Login, SecureNote, Uri, FIELD_TYPE_TEXT,
    ITEM_TYPE_CARD, ITEM_TYPE_IDENTITY, ITEM_TYPE_LOGIN, ITEM_TYPE_SECURE_NOTE,
};

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Custom fields with both a name and a value.
fn extra_fields(fields: Option<&[Field]>) -> ExtraFields {
    fields
        .unwrap_or_default()
        .iter()
        .filter_map(|field| match (&field.name, &field.value) {
            (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => {
                Some((name.clone(), value.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Identity attributes kept when an identity item is read as a login.
fn identity_fields(identity: &Identity, extra: &mut ExtraFields) {
    let attributes = [
        ("firstName", &identity.first_name),
        ("lastName", &identity.last_name),
        ("email", &identity.email),
        ("phone", &identity.phone),
        ("company", &identity.company),
    ];
    for (key, value) in attributes {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            extra.insert(key.to_string(), value.to_string());
        }
    }
}

/// Convert an API item into an entry.
pub fn item_to_entry(item: Item) -> Result<VaultEntry> {
    let id = EntryId::new(item.id)?;
    let name = match item.name.trim() {
        "" => {
            warn!("Item {} has no name", id);
            VaultEntry::placeholder_name(&id)
        }
        trimmed => trimmed.to_string(),
    };
    let folder_id = item
        .folder_id
        .filter(|f| !f.is_empty())
        .map(FolderId::new)
        .transpose()?;
    let mut extra = extra_fields(item.fields.as_deref());

    let details = match item.item_type {
        ITEM_TYPE_LOGIN => {
            let login = item.login.unwrap_or_default();
            let url = login
                .uris
                .as_deref()
                .and_then(|uris| uris.first())
                .and_then(|u| u.uri.clone());
            EntryDetails::Password(PasswordDetails::new(
                text(&login.username),
                text(&login.password),
                url,
            ))
        }
        ITEM_TYPE_SECURE_NOTE => EntryDetails::Note(NoteDetails {
            content: text(&item.notes),
        }),
        ITEM_TYPE_CARD => {
            let card = item.card.unwrap_or_default();
            EntryDetails::CreditCard(CardDetails {
                company: text(&card.brand),
                number: text(&card.number),
                holder_name: text(&card.cardholder_name),
                expiration: CardDate::from_parts(
                    card.exp_month.as_deref(),
                    card.exp_year.as_deref(),
                ),
                valid_from: None,
                security_code: text(&card.code),
            })
        }
        ITEM_TYPE_IDENTITY => {
            let identity = item.identity.unwrap_or_default();
            identity_fields(&identity, &mut extra);
            EntryDetails::Password(PasswordDetails::new(text(&identity.username), "", None))
        }
        other => {
            warn!("Item {} has unknown type {}, reading it as a login", id, other);
            EntryDetails::Password(PasswordDetails::new("", "", None))
        }
    };

    VaultEntry::new(id, name, folder_id, extra, details)
}

/// Build the create request for a draft.
///
/// Cards lose their valid-from date; Bitwarden has no such field.
pub fn draft_to_item(draft: &EntryDraft, organization_id: Option<&str>) -> ItemRequest {
    let fields = draft
        .extra_fields
        .iter()
        .map(|(name, value)| Field {
            name: Some(name.clone()),
            value: Some(value.clone()),
            field_type: FIELD_TYPE_TEXT,
        })
        .collect();

    let mut request = ItemRequest {
        item_type: ITEM_TYPE_LOGIN,
        name: draft.name.clone(),
        folder_id: draft.folder_id.as_ref().map(|f| f.as_str().to_string()),
        organization_id: organization_id.map(str::to_string),
        notes: None,
        favorite: false,
        fields,
        login: None,
        secure_note: None,
        card: None,
    };

    match &draft.details {
        EntryDetails::Password(password) => {
            request.login = Some(Login {
                username: Some(password.username().to_string()),
                password: Some(password.password().to_string()),
                totp: None,
                uris: password.url().map(|url| {
                    vec![Uri {
                        uri: Some(url.to_string()),
                        match_type: None,
                    }]
                }),
            });
        }
        EntryDetails::Note(note) => {
            request.item_type = ITEM_TYPE_SECURE_NOTE;
            request.notes = Some(note.content.clone());
            request.secure_note = Some(SecureNote { note_type: 0 });
        }
        EntryDetails::CreditCard(card) => {
            request.item_type = ITEM_TYPE_CARD;
            request.card = Some(Card {
                cardholder_name: Some(card.holder_name.clone()),
                brand: Some(card.company.clone()),
                number: Some(card.number.clone()),
                exp_month: card.expiration.map(|d| d.month_str()),
                exp_year: card.expiration.map(|d| d.year_str()),
                code: Some(card.security_code.clone()),
            });
        }
    }

    request
}
