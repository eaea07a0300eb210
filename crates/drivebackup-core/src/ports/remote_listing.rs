//! Remote listing port (driven/secondary port)
//!
//! This module defines the interface for enumerating the remote drive:
//! paginated listing of non-trashed items, single-item metadata, and the
//! signed-in account.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - `ListedItem` is a port-level DTO with raw ids and names; the
//!   `build_index` use case maps it to a domain `RemoteObject`
//!   (sanitising names and following shortcuts).
//! - Implementations retry transient failures internally; an error returned
//!   here means retries were exhausted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Listing DTOs
// ============================================================================

/// Target of a shortcut item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutTarget {
    /// Id of the item the shortcut points to
    pub id: String,
    /// MimeType of the item the shortcut points to
    pub mime_type: String,
}

/// A single row of the remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedItem {
    /// Provider-specific item identifier
    pub id: String,
    /// Item name as stored remotely
    pub name: String,
    /// Remote mimeType
    pub mime_type: String,
    /// Last modified timestamp
    pub modified_time: Option<DateTime<Utc>>,
    /// Ids of the containing folders
    pub parents: Vec<String>,
    /// Size in bytes (None for folders and native documents)
    pub size: Option<u64>,
    /// Present when the item is a shortcut
    pub shortcut_target: Option<ShortcutTarget>,
}

/// One page of listing results
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Items on this page, in no particular order
    pub items: Vec<ListedItem>,
    /// Token for the next page (None on the last page)
    pub next_page_token: Option<String>,
}

/// Restriction applied to a listing query
///
/// Trashed items are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only items directly inside this folder
    pub parent: Option<String>,
    /// Only items with exactly this name
    pub name: Option<String>,
}

impl ListFilter {
    /// Every non-trashed item in the drive
    pub fn all() -> Self {
        Self::default()
    }

    /// Items named `name` directly inside `parent`
    pub fn child_named(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            name: Some(name.into()),
        }
    }
}

/// Information about the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User's email address
    pub email: String,
    /// User's display name
    pub display_name: String,
}

// ============================================================================
// IRemoteListing trait
// ============================================================================

/// Port trait for enumerating the remote drive
#[async_trait::async_trait]
pub trait IRemoteListing: Send + Sync {
    /// Fetches one page of the listing
    ///
    /// # Arguments
    /// * `filter` - Which items to return
    /// * `page_token` - Token from the previous page (None for the first page)
    async fn list_page(
        &self,
        filter: &ListFilter,
        page_token: Option<&str>,
    ) -> anyhow::Result<ListPage>;

    /// Retrieves metadata for one item
    ///
    /// The alias `root` resolves to the drive root folder.
    async fn get_item(&self, id: &str) -> anyhow::Result<ListedItem>;

    /// Retrieves information about the authenticated user
    async fn get_user_info(&self) -> anyhow::Result<UserInfo>;
}
