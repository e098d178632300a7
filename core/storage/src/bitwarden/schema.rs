//! Bitwarden API payloads.
//!
//! Responses are validated by deserializing into these types; a body that
//! does not fit is reported as a schema error.

use serde::{Deserialize, Serialize};

pub const ITEM_TYPE_LOGIN: u8 = 1;
pub const ITEM_TYPE_SECURE_NOTE: u8 = 2;
pub const ITEM_TYPE_CARD: u8 = 3;
pub const ITEM_TYPE_IDENTITY: u8 = 4;

/// Custom field type for plain text.
pub const FIELD_TYPE_TEXT: u8 = 0;

/// Response of the client-credentials token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ListObject {
    #[serde(rename = "list")]
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FolderObject {
    #[serde(rename = "folder")]
    Folder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ItemObject {
    #[serde(rename = "item")]
    Item,
}

/// `{"object": "list", "data": [...]}` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub object: ListObject,
    pub data: Vec<T>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// A folder record. The synthetic "No Folder" container has a null id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: Option<String>,
    pub name: String,
    pub object: FolderObject,
    #[serde(default)]
    pub revision_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub field_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uri {
    pub uri: Option<String>,
    #[serde(rename = "match")]
    pub match_type: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub totp: Option<String>,
    #[serde(default)]
    pub uris: Option<Vec<Uri>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureNote {
    #[serde(rename = "type")]
    pub note_type: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub cardholder_name: Option<String>,
    pub brand: Option<String>,
    pub number: Option<String>,
    pub exp_month: Option<String>,
    pub exp_year: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
}

/// A vault item as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(rename = "type")]
    pub item_type: u8,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
    #[serde(default)]
    pub login: Option<Login>,
    #[serde(default)]
    pub secure_note: Option<SecureNote>,
    #[serde(default)]
    pub card: Option<Card>,
    #[serde(default)]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub deleted_date: Option<String>,
    pub object: ItemObject,
}

/// Body of an item create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(rename = "type")]
    pub item_type: u8,
    pub name: String,
    pub folder_id: Option<String>,
    pub organization_id: Option<String>,
    pub notes: Option<String>,
    pub favorite: bool,
    pub fields: Vec<Field>,
    pub login: Option<Login>,
    pub secure_note: Option<SecureNote>,
    pub card: Option<Card>,
}
