//! Folder-path codec for stores without native folder nesting.
//!
//! A flat store only knows folder names. The hierarchy is kept by naming each
//! folder with its full path, e.g. `Finance/Taxes`. Encoding joins the
//! unqualified names of a folder's ancestors root-to-leaf; decoding splits the
//! flat names back and resolves each parent by exact full-path match.
//!
//! A literal delimiter inside a folder name is not escaped, so `a/b` as a
//! single name decodes as folder `b` under `a`.

use std::collections::HashMap;
use tracing::debug;

use vaultbridge_common::{Error, FolderId, Result};

use crate::folder::VaultFolder;
use crate::index::VaultIndex;

/// Default path delimiter.
pub const DEFAULT_DELIMITER: char = '/';

/// A folder record as a flat store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatFolder {
    /// Store id. `None` marks the store's synthetic "no folder" container.
    pub id: Option<String>,
    /// Full delimited path.
    pub name: String,
}

impl FlatFolder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    /// Whether this record is the store's "no folder" container.
    pub fn is_reserved(&self) -> bool {
        self.id.is_none()
    }
}

/// Bidirectional mapping between a folder tree and delimited flat names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderPathCodec {
    delimiter: char,
}

impl Default for FolderPathCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl FolderPathCodec {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Join unqualified names root-to-leaf.
    ///
    /// Segments are trimmed the same way decode trims them. Every segment
    /// contributes a delimiter, empty ones included.
    pub fn encode<I, S>(&self, segments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = String::new();
        for (i, segment) in segments.into_iter().enumerate() {
            if i > 0 {
                path.push(self.delimiter);
            }
            path.push_str(segment.as_ref().trim());
        }
        path
    }

    /// Full path of a folder under an already encoded parent path.
    pub fn qualify(&self, parent_path: Option<&str>, name: &str) -> String {
        match parent_path {
            Some(parent) if !parent.is_empty() => {
                format!("{}{}{}", self.normalize(parent), self.delimiter, name.trim())
            }
            _ => name.trim().to_string(),
        }
    }

    /// Full path of a folder of `index`, following its ancestor chain.
    pub fn encode_folder(&self, index: &VaultIndex, folder: &VaultFolder) -> String {
        let mut chain = vec![folder.name.as_str()];
        let mut current = folder;
        while let Some(parent) = index.parent_folder(current) {
            if chain.len() > index.folder_count() {
                break;
            }
            chain.push(parent.name.as_str());
            current = parent;
        }
        chain.reverse();
        self.encode(chain)
    }

    /// Split a full path into (parent path, unqualified name).
    pub fn split<'a>(&self, path: &'a str) -> (Option<&'a str>, &'a str) {
        match path.rsplit_once(self.delimiter) {
            Some((parent, name)) => (Some(parent), name),
            None => (None, path),
        }
    }

    /// Trim every segment of a path.
    fn normalize(&self, path: &str) -> String {
        self.encode(path.split(self.delimiter).map(str::trim))
    }

    /// Decode one flat record without resolving its parent.
    ///
    /// # Errors
    /// - `ReservedContainer` for the store's "no folder" container
    /// - `InvalidIdentifier` for a blank id
    pub fn decode_one(&self, flat: &FlatFolder) -> Result<(FolderId, String)> {
        let id = flat.id.as_deref().ok_or_else(|| {
            Error::ReservedContainer(format!(
                "'{}' is the store's unfiled container, not a folder",
                flat.name
            ))
        })?;
        Ok((FolderId::new(id)?, self.normalize(&flat.name)))
    }

    /// Decode a store's complete flat folder list into a tree.
    ///
    /// Pass one maps every full path to its id; pass two resolves each
    /// folder's parent from that map, so input order does not matter. A folder
    /// whose parent path matches nothing becomes a root.
    pub fn decode(&self, flat: &[FlatFolder]) -> Result<Vec<VaultFolder>> {
        let decoded = flat
            .iter()
            .map(|f| self.decode_one(f))
            .collect::<Result<Vec<_>>>()?;

        let mut by_path: HashMap<&str, &FolderId> = HashMap::with_capacity(decoded.len());
        for (id, path) in &decoded {
            if by_path.contains_key(path.as_str()) {
                debug!("Duplicate folder path '{}', keeping first", path);
                continue;
            }
            by_path.insert(path.as_str(), id);
        }

        let folders = decoded
            .iter()
            .map(|(id, path)| {
                let (parent_path, name) = match self.split(path) {
                    (Some(_), "") => (None, path.as_str()),
                    other => other,
                };
                let parent_id = parent_path
                    .and_then(|p| by_path.get(p))
                    .filter(|&&parent| parent != id)
                    .map(|&parent| parent.clone());
                VaultFolder::new(id.clone(), name, parent_id)
            })
            .collect();

        Ok(folders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fid(s: &str) -> FolderId {
        FolderId::new(s).unwrap()
    }

    #[test]
    fn test_encode_and_qualify() {
        let codec = FolderPathCodec::default();
        assert_eq!(codec.encode(["Finance", "Taxes", "2023"]), "Finance/Taxes/2023");
        assert_eq!(codec.encode(Vec::<&str>::new()), "");
        assert_eq!(codec.qualify(Some("Finance"), "Taxes"), "Finance/Taxes");
        assert_eq!(codec.qualify(None, "Finance"), "Finance");
    }

    #[test]
    fn test_encode_matches_decode_normalization() {
        let codec = FolderPathCodec::default();
        assert_eq!(codec.encode(["Work ", " Sub"]), "Work/Sub");
        assert_eq!(codec.encode(["", "x"]), "/x");
        assert_eq!(codec.qualify(Some(" Work "), "Sub "), "Work/Sub");
        assert_eq!(codec.qualify(None, " Work "), "Work");

        let stored = [
            FlatFolder::new("1", codec.qualify(None, "Work ")),
            FlatFolder::new("2", codec.qualify(Some("Work "), "Sub")),
        ];
        let folders = codec.decode(&stored).unwrap();
        assert_eq!(folders[0].name, "Work");
        assert_eq!(folders[1].name, "Sub");
        assert_eq!(folders[1].parent_id, Some(fid("1")));
    }

    #[test]
    fn test_split() {
        let codec = FolderPathCodec::default();
        assert_eq!(codec.split("a/b/c"), (Some("a/b"), "c"));
        assert_eq!(codec.split("a"), (None, "a"));
    }

    #[test]
    fn test_decode_child_before_parent() {
        let codec = FolderPathCodec::default();
        let folders = codec
            .decode(&[
                FlatFolder::new("2", "Finance/Taxes"),
                FlatFolder::new("1", "Finance"),
                FlatFolder::new("3", "Orphan/Child"),
            ])
            .unwrap();

        assert_eq!(folders[0].name, "Taxes");
        assert_eq!(folders[0].parent_id, Some(fid("1")));
        assert_eq!(folders[1].name, "Finance");
        assert_eq!(folders[1].parent_id, None);
        // Parent path matches nothing: treated as a root.
        assert_eq!(folders[2].name, "Child");
        assert_eq!(folders[2].parent_id, None);
    }

    #[test]
    fn test_decode_trims_segments() {
        let codec = FolderPathCodec::default();
        let folders = codec
            .decode(&[
                FlatFolder::new("1", " Finance "),
                FlatFolder::new("2", "Finance / Taxes"),
            ])
            .unwrap();
        assert_eq!(folders[0].name, "Finance");
        assert_eq!(folders[1].name, "Taxes");
        assert_eq!(folders[1].parent_id, Some(fid("1")));
    }

    #[test]
    fn test_reserved_container_rejected() {
        let codec = FolderPathCodec::default();
        let reserved = FlatFolder {
            id: None,
            name: "No Folder".to_string(),
        };
        assert!(reserved.is_reserved());
        assert!(matches!(
            codec.decode(&[reserved]),
            Err(Error::ReservedContainer(_))
        ));
    }

    #[test]
    fn test_encode_folder_from_index() {
        let mut index = VaultIndex::new();
        index.add_folders(vec![
            VaultFolder::new(fid("1"), "Finance", None),
            VaultFolder::new(fid("2"), "Taxes", Some(fid("1"))),
            VaultFolder::new(fid("3"), "2023", Some(fid("2"))),
        ]);
        let codec = FolderPathCodec::default();
        let leaf = index.find_folder(&fid("3")).unwrap();
        assert_eq!(codec.encode_folder(&index, leaf), "Finance/Taxes/2023");
    }

    #[test]
    fn test_custom_delimiter() {
        let codec = FolderPathCodec::new('\\');
        let folders = codec
            .decode(&[FlatFolder::new("1", "a"), FlatFolder::new("2", "a\\b")])
            .unwrap();
        assert_eq!(folders[1].parent_id, Some(fid("1")));
    }

    /// A random tree as (name, parent position) pairs with unique sibling names.
    fn arb_tree() -> impl Strategy<Value = Vec<(String, Option<usize>)>> {
        prop::collection::vec(("[A-Za-z0-9 ]{1,8}", any::<prop::sample::Index>()), 1..24).prop_map(
            |raw| {
                let mut nodes: Vec<(String, Option<usize>)> = Vec::new();
                for (i, (name, pick)) in raw.into_iter().enumerate() {
                    let name = format!("{}-{}", name.trim(), i);
                    // Roughly a third of the nodes are roots.
                    let parent = if i == 0 || pick.index(3) == 0 {
                        None
                    } else {
                        Some(pick.index(i))
                    };
                    nodes.push((name, parent));
                }
                nodes
            },
        )
    }

    proptest! {
        #[test]
        fn prop_encode_decode_preserves_parent_links(tree in arb_tree()) {
            let codec = FolderPathCodec::default();

            let mut index = VaultIndex::new();
            index.add_folders(tree.iter().enumerate().map(|(i, (name, parent))| {
                VaultFolder::new(
                    fid(&format!("src-{}", i)),
                    name.clone(),
                    parent.map(|p| fid(&format!("src-{}", p))),
                )
            }));

            let flat: Vec<FlatFolder> = index
                .folders()
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    FlatFolder::new(format!("flat-{}", i), codec.encode_folder(&index, f))
                })
                .collect();

            let decoded = codec.decode(&flat).unwrap();
            for (i, (name, parent)) in tree.iter().enumerate() {
                prop_assert_eq!(&decoded[i].name, name);
                let expected = parent.map(|p| fid(&format!("flat-{}", p)));
                prop_assert_eq!(&decoded[i].parent_id, &expected);
            }
        }
    }
}
