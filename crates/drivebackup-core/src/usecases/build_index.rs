//! Index building use case
//!
//! Pages through the full remote listing once and assembles the
//! [`RemoteTreeIndex`] the backup walk runs on. Listing rows are normalised
//! on the way in: shortcuts are replaced by their targets and names are
//! made safe for the local filesystem.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    domain::{sanitize_name, RemoteId, RemoteObject, RemoteTreeIndex},
    ports::{IRemoteListing, ListFilter, ListedItem},
};

/// Use case for building the remote tree index from the listing
pub struct BuildIndexUseCase {
    listing: Arc<dyn IRemoteListing>,
}

impl BuildIndexUseCase {
    /// Creates a new BuildIndexUseCase
    ///
    /// # Arguments
    ///
    /// * `listing` - Remote listing service
    pub fn new(listing: Arc<dyn IRemoteListing>) -> Self {
        Self { listing }
    }

    /// Lists every non-trashed item and builds the index rooted at `root_id`
    ///
    /// # Errors
    ///
    /// Returns an error if any listing page cannot be fetched. The tree
    /// cannot be completed without it, so callers treat this as fatal.
    pub async fn execute(&self, root_id: RemoteId, root_name: &str) -> Result<RemoteTreeIndex> {
        let mut index = RemoteTreeIndex::new(root_id, root_name);
        let filter = ListFilter::all();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        let mut items = 0usize;

        loop {
            let page = self
                .listing
                .list_page(&filter, page_token.as_deref())
                .await
                .with_context(|| format!("Failed to fetch listing page {}", pages + 1))?;
            pages += 1;
            items += page.items.len();
            debug!(page = pages, items = page.items.len(), "Listing page received");

            for item in page.items {
                let Some(object) = to_remote_object(item) else {
                    continue;
                };
                if object.is_folder() {
                    index.add_folder(object);
                } else {
                    index.add_file(object);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let totals = index.totals();
        info!(
            pages,
            items,
            folders = totals.folders,
            files = totals.files,
            "Remote tree indexed"
        );
        debug!(
            placeholders = index.placeholder_count(),
            "Folders outside the backup source"
        );
        Ok(index)
    }
}

/// Maps a listing row to a domain object
///
/// Shortcuts take their target's id and mimeType. Rows whose id cannot be
/// parsed are dropped with a warning; so are unparseable parent ids.
pub fn to_remote_object(item: ListedItem) -> Option<RemoteObject> {
    let (raw_id, mime_type) = match item.shortcut_target {
        Some(target) => (target.id, target.mime_type),
        None => (item.id, item.mime_type),
    };

    let id = match RemoteId::new(raw_id) {
        Ok(id) => id,
        Err(e) => {
            warn!(name = %item.name, error = %e, "Skipping listing row with invalid id");
            return None;
        }
    };

    let parents = item
        .parents
        .into_iter()
        .filter_map(|p| match RemoteId::new(p) {
            Ok(parent) => Some(parent),
            Err(e) => {
                warn!(id = %id, error = %e, "Ignoring invalid parent id");
                None
            }
        })
        .collect();

    Some(RemoteObject {
        id,
        name: sanitize_name(&item.name),
        mime_type,
        modified_time: item.modified_time,
        parents,
        size: item.size,
    })
}
