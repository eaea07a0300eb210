//! Recursive walk of the remote tree onto local disk
//!
//! For each folder, starting at the source root:
//!
//! 1. Create the local directory if it is missing.
//! 2. Materialize every direct child file, disambiguating duplicate names.
//! 3. Recurse into every child folder, disambiguating duplicate names.
//!
//! Each file outcome goes through [`RunContext::record_file`], which trips
//! the run after too many consecutive failures. Duplicate-name resolutions
//! are written back into the index so the retention pass sees the same
//! names the walk used.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use drivebackup_core::domain::{RemoteId, RemoteObject, RemoteTreeIndex, SiblingNames};
use drivebackup_core::ports::ILocalFileSystem;
use tracing::{debug, error, info, warn};

use crate::context::RunContext;
use crate::materializer::FileMaterializer;
use crate::BackupError;

/// Walks a [`RemoteTreeIndex`] and materializes it below a backup root
pub struct Reconciler {
    materializer: FileMaterializer,
    filesystem: Arc<dyn ILocalFileSystem>,
}

impl Reconciler {
    /// Creates a reconciler
    pub fn new(materializer: FileMaterializer, filesystem: Arc<dyn ILocalFileSystem>) -> Self {
        Self {
            materializer,
            filesystem,
        }
    }

    /// Materializes the whole index below `new_root`
    ///
    /// The source root folder becomes `new_root/<root name>`; files are
    /// reused from `previous_root/<same relative path>` when possible.
    ///
    /// # Errors
    /// Returns the first fatal [`BackupError`]: a directory that cannot be
    /// created, a vanished destination, or the consecutive-failure breaker.
    pub async fn reconcile(
        &self,
        ctx: &mut RunContext,
        index: &mut RemoteTreeIndex,
        new_root: &Path,
        previous_root: Option<&Path>,
    ) -> Result<(), BackupError> {
        let root_id = index.root_id().clone();
        let mut ancestors = Vec::new();
        self.walk(
            ctx,
            index,
            new_root.to_path_buf(),
            previous_root.map(Path::to_path_buf),
            root_id,
            &mut ancestors,
        )
        .await
    }

    /// Processes one folder and recurses into its children
    ///
    /// `ancestors` holds the folders on the current path; a child that is
    /// already on it is not entered again.
    fn walk<'a>(
        &'a self,
        ctx: &'a mut RunContext,
        index: &'a mut RemoteTreeIndex,
        parent: PathBuf,
        previous_parent: Option<PathBuf>,
        folder_id: RemoteId,
        ancestors: &'a mut Vec<RemoteId>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), BackupError>> + Send + 'a>>
    {
        Box::pin(async move {
            let Some(record) = index.get_folder(&folder_id) else {
                warn!(folder_id = %folder_id, "Folder missing from index, skipping");
                return Ok(());
            };
            let name = record.name().unwrap_or(folder_id.as_str()).to_string();
            let files: Vec<RemoteObject> = record.files().cloned().collect();
            let subfolders: Vec<(RemoteId, String)> = record
                .subfolder_ids()
                .into_iter()
                .filter_map(|id| {
                    let child_name = index.get_folder(&id)?.name()?.to_string();
                    Some((id, child_name))
                })
                .collect();

            let local_dir = parent.join(&name);
            let previous_dir = previous_parent.map(|p| p.join(&name));

            self.ensure_directory(&local_dir).await?;

            let mut file_names = SiblingNames::new();
            for mut file in files {
                let unique = file_names.claim(&file.name);
                if unique != file.name {
                    debug!(
                        folder = %local_dir.display(),
                        from = %file.name,
                        to = %unique,
                        "Renamed duplicate file"
                    );
                    index
                        .rename_file(&folder_id, &file.id, &unique)
                        .map_err(BackupError::Index)?;
                    file.name = unique;
                }

                let outcome = self
                    .materializer
                    .materialize(ctx, &file, &local_dir, previous_dir.as_deref())
                    .await?;
                ctx.record_file(outcome.result())?;
            }
            ctx.record_folder();

            ancestors.push(folder_id.clone());
            let mut folder_names = SiblingNames::new();
            for (child_id, child_name) in subfolders {
                if ancestors.contains(&child_id) {
                    warn!(
                        folder = %local_dir.display(),
                        child = %child_name,
                        "Folder contains one of its ancestors, not descending"
                    );
                    continue;
                }

                let unique = folder_names.claim(&child_name);
                if unique != child_name {
                    debug!(
                        folder = %local_dir.display(),
                        from = %child_name,
                        to = %unique,
                        "Renamed duplicate folder"
                    );
                    index
                        .rename_folder(&child_id, &unique)
                        .map_err(BackupError::Index)?;
                }

                self.walk(
                    ctx,
                    index,
                    local_dir.clone(),
                    previous_dir.clone(),
                    child_id,
                    ancestors,
                )
                .await?;
            }
            ancestors.pop();

            Ok(())
        })
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), BackupError> {
        let state = self
            .filesystem
            .get_state(path)
            .await
            .map_err(|e| BackupError::filesystem(path, e))?;
        if state.is_directory() {
            return Ok(());
        }

        self.filesystem.create_directory(path).await.map_err(|e| {
            error!(path = %path.display(), error = %format!("{e:#}"), "Could not create folder");
            BackupError::CreateDirectory {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            }
        })?;
        info!(path = %path.display(), "Folder created");
        Ok(())
    }
}
