//! Source folder resolution use case
//!
//! The backup source is either a folder id (`root` by default) or the name
//! of a folder directly inside the drive root. Anything other than exactly
//! one folder is an error the run cannot recover from.

use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    domain::{sanitize_name, RemoteId, FOLDER_MIME_TYPE},
    ports::{IRemoteListing, ListFilter, ListedItem},
};

/// Name given to the drive root folder in the backup tree
pub const DRIVE_ROOT_NAME: &str = "My Drive";

/// How the backup source folder is selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelector {
    /// Folder by remote id (`root` for the whole drive)
    Id(String),
    /// Folder by name among the drive root's children
    Name(String),
}

/// The resolved source folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Real remote id (never the `root` alias)
    pub id: RemoteId,
    /// Local directory name of the source folder
    pub name: String,
}

/// Errors resolving the source folder
#[derive(Debug, Error)]
pub enum SourceError {
    /// No folder matched
    #[error("Source folder not found: {0}")]
    NotFound(String),

    /// More than one item matched the name
    #[error("Source folder name '{name}' is ambiguous ({count} matches)")]
    Ambiguous {
        /// The requested name
        name: String,
        /// Number of matches
        count: usize,
    },

    /// The match is not a folder
    #[error("Source '{0}' is not a folder")]
    NotFolder(String),

    /// The remote could not be queried
    #[error("Failed to look up source folder: {0:#}")]
    Listing(#[from] anyhow::Error),
}

/// Use case for resolving the backup source folder
pub struct ResolveSourceUseCase {
    listing: Arc<dyn IRemoteListing>,
}

impl ResolveSourceUseCase {
    /// Creates a new ResolveSourceUseCase
    pub fn new(listing: Arc<dyn IRemoteListing>) -> Self {
        Self { listing }
    }

    /// Resolves the selector to exactly one folder
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] for zero matches, several matches, a
    /// non-folder match, or a listing failure.
    pub async fn execute(&self, selector: &SourceSelector) -> Result<ResolvedSource, SourceError> {
        let resolved = match selector {
            SourceSelector::Id(id) => self.by_id(id).await?,
            SourceSelector::Name(name) => self.by_name(name).await?,
        };
        info!(id = %resolved.id, name = %resolved.name, "Source folder resolved");
        Ok(resolved)
    }

    async fn by_id(&self, id: &str) -> Result<ResolvedSource, SourceError> {
        let item = self
            .listing
            .get_item(id)
            .await
            .with_context(|| format!("Failed to fetch source folder {id}"))?;

        if item.mime_type != FOLDER_MIME_TYPE {
            return Err(SourceError::NotFolder(id.to_string()));
        }

        // The root's listed name follows the account locale
        let name = if id == "root" {
            DRIVE_ROOT_NAME.to_string()
        } else {
            sanitize_name(&item.name)
        };

        Ok(ResolvedSource {
            id: parse_id(&item.id)?,
            name,
        })
    }

    async fn by_name(&self, name: &str) -> Result<ResolvedSource, SourceError> {
        let filter = ListFilter::child_named("root", name);
        let mut matches: Vec<ListedItem> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .listing
                .list_page(&filter, page_token.as_deref())
                .await
                .with_context(|| format!("Failed to search the drive root for '{name}'"))?;
            matches.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        debug!(name, matches = matches.len(), "Searched drive root for source");

        let item = match matches.len() {
            0 => return Err(SourceError::NotFound(name.to_string())),
            1 => matches.remove(0),
            count => {
                return Err(SourceError::Ambiguous {
                    name: name.to_string(),
                    count,
                })
            }
        };

        let (id, mime_type) = match &item.shortcut_target {
            Some(target) => (target.id.as_str(), target.mime_type.as_str()),
            None => (item.id.as_str(), item.mime_type.as_str()),
        };
        if mime_type != FOLDER_MIME_TYPE {
            return Err(SourceError::NotFolder(name.to_string()));
        }

        Ok(ResolvedSource {
            id: parse_id(id)?,
            name: sanitize_name(&item.name),
        })
    }
}

fn parse_id(id: &str) -> Result<RemoteId, SourceError> {
    RemoteId::new(id).map_err(|e| SourceError::Listing(anyhow::Error::new(e)))
}
