//! In-memory model of the remote folder tree
//!
//! The listing API returns files and folders in arbitrary page order with
//! only parent-id back-references, so a folder can be referenced as a parent
//! before its own row arrives. [`RemoteTreeIndex`] keeps every folder in one
//! id-keyed store; a folder seen only as a parent is held as a
//! [`FolderName::Placeholder`] record and promoted in place once its row is
//! read. Structural links are ids, so promotion never invalidates them.
//!
//! ```text
//!   add_file(f, parents=[B])        add_folder(B, parents=[A])
//!   ┌──────────────────────┐        ┌──────────────────────┐
//!   │ B: Placeholder       │  ───►  │ B: Resolved("docs")  │
//!   │    files = {f}       │        │    files = {f}       │
//!   └──────────────────────┘        └──────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use super::errors::DomainError;
use super::newtypes::RemoteId;
use super::remote_object::RemoteObject;

// ============================================================================
// FolderRecord
// ============================================================================

/// Name slot of a folder record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderName {
    /// Seen only as a parent reference so far
    Placeholder,
    /// Listing row consumed
    Resolved(String),
}

/// A folder of the remote tree with its direct children
///
/// Children are keyed by remote id in ordered maps so the walk order is
/// stable within a run and across runs over the same listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    name: FolderName,
    files: BTreeMap<RemoteId, RemoteObject>,
    subfolders: BTreeMap<RemoteId, RemoteObject>,
}

impl FolderRecord {
    fn placeholder() -> Self {
        Self {
            name: FolderName::Placeholder,
            files: BTreeMap::new(),
            subfolders: BTreeMap::new(),
        }
    }

    fn resolved(name: impl Into<String>) -> Self {
        Self {
            name: FolderName::Resolved(name.into()),
            files: BTreeMap::new(),
            subfolders: BTreeMap::new(),
        }
    }

    /// Returns the folder name, or `None` for a placeholder
    pub fn name(&self) -> Option<&str> {
        match &self.name {
            FolderName::Resolved(name) => Some(name),
            FolderName::Placeholder => None,
        }
    }

    /// Returns true while the folder's own listing row has not been seen
    pub fn is_placeholder(&self) -> bool {
        matches!(self.name, FolderName::Placeholder)
    }

    /// Direct child files in walk order
    pub fn files(&self) -> impl Iterator<Item = &RemoteObject> {
        self.files.values()
    }

    /// Direct child folders in walk order
    pub fn subfolders(&self) -> impl Iterator<Item = &RemoteObject> {
        self.subfolders.values()
    }

    /// Ids of the direct child folders in walk order
    pub fn subfolder_ids(&self) -> Vec<RemoteId> {
        self.subfolders.keys().cloned().collect()
    }

    /// Number of direct child files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

// ============================================================================
// RemoteTreeIndex
// ============================================================================

/// Folder and file counts reachable from the index root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeTotals {
    /// Folders, including the root
    pub folders: u64,
    /// Files, counted once per containing folder
    pub files: u64,
}

/// Id-keyed arena of folder records rooted at the backup source folder
///
/// Built once per run from the full listing, then read by the tree walk.
/// The only mutation after construction is renaming to resolve sibling
/// name collisions.
#[derive(Debug, Clone)]
pub struct RemoteTreeIndex {
    root_id: RemoteId,
    folders: HashMap<RemoteId, FolderRecord>,
    totals: OnceLock<TreeTotals>,
}

impl PartialEq for RemoteTreeIndex {
    fn eq(&self, other: &Self) -> bool {
        self.root_id == other.root_id && self.folders == other.folders
    }
}

impl Eq for RemoteTreeIndex {}

impl RemoteTreeIndex {
    /// Creates an index holding only the resolved root folder
    pub fn new(root_id: RemoteId, root_name: impl Into<String>) -> Self {
        let mut folders = HashMap::new();
        folders.insert(root_id.clone(), FolderRecord::resolved(root_name));
        Self {
            root_id,
            folders,
            totals: OnceLock::new(),
        }
    }

    /// Id of the root folder
    pub fn root_id(&self) -> &RemoteId {
        &self.root_id
    }

    /// Root folder record
    pub fn get_root(&self) -> Option<&FolderRecord> {
        self.folders.get(&self.root_id)
    }

    /// Folder record by id
    pub fn get_folder(&self, id: &RemoteId) -> Option<&FolderRecord> {
        self.folders.get(id)
    }

    /// Number of folder records, placeholders included
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Returns true if the index holds no records
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Number of records still waiting for their listing row
    ///
    /// After a full listing these are folders outside the source subtree
    /// (the drive root when backing up a subfolder, or parents shared from
    /// other drives).
    pub fn placeholder_count(&self) -> usize {
        self.folders.values().filter(|f| f.is_placeholder()).count()
    }

    /// Adds a file under each of its parents
    ///
    /// Missing parents are created as placeholders. A file already present
    /// under a parent is left as is, so repeated listing pages are harmless.
    pub fn add_file(&mut self, object: RemoteObject) {
        for parent in &object.parents {
            self.folders
                .entry(parent.clone())
                .or_insert_with(FolderRecord::placeholder)
                .files
                .entry(object.id.clone())
                .or_insert_with(|| object.clone());
        }
        self.invalidate_totals();
    }

    /// Adds a folder and links it under each of its parents
    ///
    /// A placeholder record for the same id is promoted in place, keeping
    /// the children already attached to it. A folder that is already
    /// resolved is left untouched.
    pub fn add_folder(&mut self, object: RemoteObject) {
        match self.folders.get_mut(&object.id) {
            Some(record) if !record.is_placeholder() => return,
            Some(record) => record.name = FolderName::Resolved(object.name.clone()),
            None => {
                self.folders
                    .insert(object.id.clone(), FolderRecord::resolved(object.name.clone()));
            }
        }

        for parent in &object.parents {
            self.folders
                .entry(parent.clone())
                .or_insert_with(FolderRecord::placeholder)
                .subfolders
                .entry(object.id.clone())
                .or_insert_with(|| object.clone());
        }
        self.invalidate_totals();
    }

    /// Renames a folder, keeping its children
    ///
    /// The parents' subfolder entries for the same id are renamed too.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownFolder`] if no record exists for `id`.
    pub fn rename_folder(&mut self, id: &RemoteId, new_name: &str) -> Result<(), DomainError> {
        let record = self
            .folders
            .get_mut(id)
            .ok_or_else(|| DomainError::UnknownFolder(id.to_string()))?;
        record.name = FolderName::Resolved(new_name.to_string());

        for folder in self.folders.values_mut() {
            if let Some(entry) = folder.subfolders.get_mut(id) {
                entry.name = new_name.to_string();
            }
        }
        self.invalidate_totals();
        Ok(())
    }

    /// Renames a file inside one folder
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownFolder`] if the folder does not exist
    /// and [`DomainError::ValidationFailed`] if the file is not one of its
    /// children.
    pub fn rename_file(
        &mut self,
        folder_id: &RemoteId,
        file_id: &RemoteId,
        new_name: &str,
    ) -> Result<(), DomainError> {
        let record = self
            .folders
            .get_mut(folder_id)
            .ok_or_else(|| DomainError::UnknownFolder(folder_id.to_string()))?;
        let file = record.files.get_mut(file_id).ok_or_else(|| {
            DomainError::ValidationFailed(format!("File {file_id} is not in folder {folder_id}"))
        })?;
        file.name = new_name.to_string();
        Ok(())
    }

    /// Files reachable from the root
    pub fn total_files(&self) -> u64 {
        self.totals().files
    }

    /// Folders reachable from the root, including the root
    pub fn total_folders(&self) -> u64 {
        self.totals().folders
    }

    /// Both totals, computed on first use after a mutation
    pub fn totals(&self) -> TreeTotals {
        *self.totals.get_or_init(|| self.count_from_root())
    }

    fn invalidate_totals(&mut self) {
        self.totals = OnceLock::new();
    }

    /// Counts along every path from the root, the same way the walk
    /// visits folders. A folder already on the current path is not
    /// entered again.
    fn count_from_root(&self) -> TreeTotals {
        let mut totals = TreeTotals::default();
        let mut path = Vec::new();
        self.count_folder(&self.root_id, &mut path, &mut totals);
        totals
    }

    fn count_folder(&self, id: &RemoteId, path: &mut Vec<RemoteId>, totals: &mut TreeTotals) {
        let Some(record) = self.folders.get(id) else {
            return;
        };
        if path.contains(id) {
            return;
        }

        totals.folders += 1;
        totals.files += record.files.len() as u64;

        path.push(id.clone());
        for child in record.subfolders.keys() {
            self.count_folder(child, path, totals);
        }
        path.pop();
    }
}
