//! Read-only source backed by a Buttercup CSV export.
//!
//! The export mixes two kinds of rows, told apart by the `!type` column:
//! `group` rows describe folders and `entry` rows describe entries. All
//! values are kept as strings.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use vaultbridge_common::{EntryId, Error, FolderId, Result};
use vaultbridge_vault::{
    CardDate, CardDetails, EntryDetails, EntryDraft, ExtraFields, FolderDraft, NoteDetails,
    PasswordDetails, VaultEntry, VaultFolder,
};

use crate::repository::{EntryRepository, FolderRepository};

type Row = BTreeMap<String, String>;

const TYPE: &str = "!type";
const GROUP_ID: &str = "!group_id";
const GROUP_NAME: &str = "!group_name";
const GROUP_PARENT: &str = "!group_parent";

/// Group excluded from every listing.
const TRASH_GROUP: &str = "Trash";

/// Columns never carried over as extra fields.
const BOOKKEEPING_COLUMNS: [&str; 6] = [TYPE, GROUP_ID, GROUP_NAME, GROUP_PARENT, "url", "URL"];

/// Buttercup CSV export, parsed once on first access.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    rows: OnceCell<Vec<Row>>,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn rows(&self) -> Result<&[Row]> {
        let rows = self.rows.get_or_try_init(|| self.load()).await?;
        Ok(rows.as_slice())
    }

    async fn load(&self) -> Result<Vec<Row>> {
        let data = tokio::fs::read(&self.path).await?;
        let rows = parse_rows(&data)?;
        debug!("Read {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    fn entries_in(rows: &[Row], folder_id: Option<&FolderId>) -> Result<Vec<VaultEntry>> {
        rows.iter()
            .filter(|row| field(row, TYPE) == Some("entry"))
            .filter(|row| field(row, GROUP_ID) == folder_id.map(FolderId::as_str))
            .map(map_entry)
            .collect()
    }

    fn read_only(operation: &str) -> Error {
        Error::Unsupported(format!("CSV source is read-only, cannot {}", operation))
    }
}

/// Non-empty value of a column.
fn field<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_rows(data: &[u8]) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| Error::Schema(format!("Invalid CSV header: {}", e)))?
        .clone();

    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| Error::Schema(format!("Invalid CSV row: {}", e)))?;
            Ok(headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect())
        })
        .collect()
}

fn map_folder(row: &Row) -> Result<VaultFolder> {
    let id = field(row, GROUP_ID)
        .ok_or_else(|| Error::Schema("Group row does not have a group id".to_string()))?;
    let name = field(row, GROUP_NAME)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::Schema(format!("Group {} does not have a name", id)))?;

    let parent_id = match field(row, GROUP_PARENT) {
        Some(parent) if parent != "0" => Some(FolderId::new(parent)?),
        _ => None,
    };

    Ok(VaultFolder::new(FolderId::new(id)?, name, parent_id))
}

fn map_entry(row: &Row) -> Result<VaultEntry> {
    let id = field(row, "id")
        .ok_or_else(|| Error::Schema("Entry row does not have an id".to_string()))?;
    let id = EntryId::new(id)?;

    let name = match field(row, "title").map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => title.to_string(),
        None => {
            warn!("Entry {} has no title", id);
            VaultEntry::placeholder_name(&id)
        }
    };
    let folder_id = field(row, GROUP_ID).map(FolderId::new).transpose()?;

    let text = |column: &str| field(row, column).unwrap_or_default().to_string();

    let (details, consumed): (EntryDetails, &[&str]) = if let Some(note) = field(row, "note") {
        (
            EntryDetails::Note(NoteDetails {
                content: note.to_string(),
            }),
            &["note"][..],
        )
    } else if let Some(cvv) = field(row, "cvv") {
        (
            EntryDetails::CreditCard(CardDetails {
                company: text("type"),
                number: text("password"),
                holder_name: text("username"),
                expiration: field(row, "expiry").and_then(CardDate::parse_compact),
                valid_from: field(row, "valid_from").and_then(CardDate::parse_compact),
                security_code: cvv.to_string(),
            }),
            &["cvv", "type", "password", "username", "expiry", "valid_from"][..],
        )
    } else {
        let url = field(row, "url").or_else(|| field(row, "URL"));
        (
            EntryDetails::Password(PasswordDetails::new(
                text("username"),
                text("password"),
                url.map(str::to_string),
            )),
            &["username", "password"][..],
        )
    };

    let extra_fields: ExtraFields = row
        .iter()
        .filter(|(k, v)| {
            !v.is_empty()
                && !matches!(k.as_str(), "id" | "title")
                && !BOOKKEEPING_COLUMNS.contains(&k.as_str())
                && !consumed.contains(&k.as_str())
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    VaultEntry::new(id, name, folder_id, extra_fields, details)
}

#[async_trait]
impl FolderRepository for CsvSource {
    async fn find_all(&self) -> Result<Vec<VaultFolder>> {
        let rows = self.rows().await?;

        rows.iter()
            .filter(|row| field(row, TYPE) == Some("group"))
            .filter(|row| row.get(GROUP_NAME).map(String::as_str) != Some(TRASH_GROUP))
            .map(|row| {
                let folder = map_folder(row)?;
                let entries = Self::entries_in(rows, Some(&folder.id))?;
                Ok(folder.with_entries(entries))
            })
            .collect()
    }

    async fn find_by_id(&self, id: &FolderId) -> Result<Option<VaultFolder>> {
        let rows = self.rows().await?;

        let row = rows.iter().find(|row| {
            field(row, TYPE) == Some("group") && field(row, GROUP_ID) == Some(id.as_str())
        });
        match row {
            Some(row) => {
                let folder = map_folder(row)?;
                let entries = Self::entries_in(rows, Some(&folder.id))?;
                Ok(Some(folder.with_entries(entries)))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, _draft: FolderDraft) -> Result<VaultFolder> {
        Err(Self::read_only("create folders"))
    }

    async fn delete(&self, _id: &FolderId) -> Result<()> {
        Err(Self::read_only("delete folders"))
    }
}

#[async_trait]
impl EntryRepository for CsvSource {
    async fn find_by_folder_id(&self, folder_id: Option<&FolderId>) -> Result<Vec<VaultEntry>> {
        Self::entries_in(self.rows().await?, folder_id)
    }

    async fn find_by_id(&self, id: &EntryId) -> Result<Option<VaultEntry>> {
        let rows = self.rows().await?;
        rows.iter()
            .find(|row| field(row, TYPE) == Some("entry") && field(row, "id") == Some(id.as_str()))
            .map(map_entry)
            .transpose()
    }

    async fn create(&self, _draft: EntryDraft) -> Result<VaultEntry> {
        Err(Self::read_only("create entries"))
    }

    async fn delete(&self, _id: &EntryId) -> Result<()> {
        Err(Self::read_only("delete entries"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use vaultbridge_vault::EntryKind;

    const EXPORT: &str = "\
!type,!group_id,!group_name,!group_parent,id,title,username,password,url,URL,note,cvv,type,expiry,valid_from,pin
group,1,Finance ,0,,,,,,,,,,,,
group,2,Taxes,1,,,,,,,,,,,,
group,9,Trash,0,,,,,,,,,,,,
entry,1,,,e1,Bank,me,pw,bank.com,,,,,,,
entry,2,,,e2,Visa,A. Holder,4111,,,,123,Visa,032027,132020,9876
entry,,,,e3,,,,,,remember the milk,,,,,
entry,,,,e4,Legacy,old,pw2,,legacy.example,,,,,,
";

    fn source() -> (NamedTempFile, CsvSource) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EXPORT.as_bytes()).unwrap();
        let source = CsvSource::new(file.path());
        (file, source)
    }

    fn fid(s: &str) -> FolderId {
        FolderId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_groups_become_folders() {
        let (_file, source) = source();
        let folders = source.find_all().await.unwrap();

        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].name, "Finance");
        assert_eq!(folders[0].parent_id, None);
        assert_eq!(folders[0].entries.len(), 1);
        assert_eq!(folders[1].name, "Taxes");
        assert_eq!(folders[1].parent_id, Some(fid("1")));
        assert!(folders.iter().all(|f| f.name != "Trash"));
    }

    #[tokio::test]
    async fn test_kind_detection() {
        let (_file, source) = source();

        let bank = EntryRepository::find_by_id(&source, &EntryId::new("e1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bank.folder_id(), Some(&fid("1")));
        match bank.details() {
            EntryDetails::Password(p) => {
                assert_eq!(p.username(), "me");
                assert_eq!(p.url(), Some("https://bank.com"));
            }
            other => panic!("unexpected details: {:?}", other),
        }
        assert!(bank.extra_fields().is_empty());

        let visa = EntryRepository::find_by_id(&source, &EntryId::new("e2").unwrap())
            .await
            .unwrap()
            .unwrap();
        match visa.details() {
            EntryDetails::CreditCard(card) => {
                assert_eq!(card.company, "Visa");
                assert_eq!(card.number, "4111");
                assert_eq!(card.holder_name, "A. Holder");
                assert_eq!(card.security_code, "123");
                assert_eq!(card.expiration, CardDate::new(3, 2027));
                assert_eq!(card.valid_from, None);
            }
            other => panic!("unexpected details: {:?}", other),
        }
        assert_eq!(
            visa.extra_fields().get("pin").map(String::as_str),
            Some("9876")
        );
    }

    #[tokio::test]
    async fn test_root_entries_and_placeholder() {
        let (_file, source) = source();
        let roots = source.find_by_folder_id(None).await.unwrap();

        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].kind(), EntryKind::Note);
        assert_eq!(roots[0].name(), "Untitled Entry e3");

        match roots[1].details() {
            EntryDetails::Password(p) => assert_eq!(p.url(), Some("https://legacy.example")),
            other => panic!("unexpected details: {:?}", other),
        }
        assert!(!roots[1].extra_fields().contains_key("URL"));
    }

    #[tokio::test]
    async fn test_writes_unsupported() {
        let (_file, source) = source();
        let result = FolderRepository::create(&source, FolderDraft::new("x", None)).await;
        assert!(matches!(result, Err(Error::Unsupported(_))));
        let result = EntryRepository::delete(&source, &EntryId::new("e1").unwrap()).await;
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = CsvSource::new("/nonexistent/export.csv");
        assert!(matches!(source.find_all().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_blank_group_name_is_schema_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"!type,!group_id,!group_name,!group_parent\ngroup,4,   ,0\n")
            .unwrap();
        let source = CsvSource::new(file.path());
        assert!(matches!(source.find_all().await, Err(Error::Schema(_))));
    }

    #[tokio::test]
    async fn test_entry_without_id_is_schema_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"!type,!group_id,id,title\nentry,,,Nameless\n")
            .unwrap();
        let source = CsvSource::new(file.path());
        assert!(matches!(
            source.find_by_folder_id(None).await,
            Err(Error::Schema(_))
        ));
    }
}
