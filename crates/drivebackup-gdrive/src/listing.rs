//! Drive file listing
//!
//! Implements `files.list` paging and single-item metadata lookups.
//!
//! ## Listing Flow
//!
//! 1. Build the `q` expression from the [`ListFilter`] (always excluding
//!    trashed items)
//! 2. Request one page with the fields the backup needs
//! 3. Hand the `nextPageToken` back to the caller, who asks for the next page
//!
//! Sizes arrive as decimal strings and are parsed here; shortcuts keep
//! their own id and carry the target in [`ShortcutTarget`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use drivebackup_core::ports::{ListFilter, ListPage, ListedItem, ShortcutTarget};

use crate::client::DriveClient;

/// Path of the files collection relative to the API base URL
const FILES_PATH: &str = "/files";

/// Fields requested for every item
pub const ITEM_FIELDS: &str =
    "id,name,mimeType,modifiedTime,parents,size,shortcutDetails(targetId,targetMimeType)";

// ============================================================================
// Drive API response types (JSON deserialization)
// ============================================================================

/// Raw response from `GET /files`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// A file resource as returned by the Drive API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    parents: Vec<String>,
    /// Decimal string; absent for folders and native documents
    size: Option<String>,
    shortcut_details: Option<ShortcutDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortcutDetails {
    target_id: Option<String>,
    target_mime_type: Option<String>,
}

impl From<DriveFile> for ListedItem {
    fn from(file: DriveFile) -> Self {
        let size = file.size.as_deref().and_then(|s| match s.parse::<u64>() {
            Ok(size) => Some(size),
            Err(_) => {
                warn!(id = %file.id, size = s, "Ignoring unparseable file size");
                None
            }
        });
        let shortcut_target = file.shortcut_details.and_then(|details| {
            Some(ShortcutTarget {
                id: details.target_id?,
                mime_type: details.target_mime_type.unwrap_or_default(),
            })
        });

        ListedItem {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            modified_time: file.modified_time,
            parents: file.parents,
            size,
            shortcut_target,
        }
    }
}

// ============================================================================
// Query construction
// ============================================================================

/// Quotes a value for use inside a `q` expression
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Builds the `q` search expression for a filter
pub fn build_query(filter: &ListFilter) -> String {
    let mut query = String::from("trashed=false");
    if let Some(parent) = &filter.parent {
        query.push_str(&format!(" and {} in parents", quote(parent)));
    }
    if let Some(name) = &filter.name {
        query.push_str(&format!(" and name={}", quote(name)));
    }
    query
}

// ============================================================================
// Public API
// ============================================================================

/// Fetches one page of `files.list`
///
/// # Arguments
/// * `client` - Authenticated Drive client
/// * `filter` - Restriction on the listed items
/// * `page_token` - `nextPageToken` of the previous page
/// * `page_size` - Items per page (the API caps this at 1000)
pub async fn list_page(
    client: &DriveClient,
    filter: &ListFilter,
    page_token: Option<&str>,
    page_size: u32,
) -> Result<ListPage> {
    let q = build_query(filter);
    let page_size = page_size.to_string();
    let fields = format!("nextPageToken,files({ITEM_FIELDS})");

    let mut query: Vec<(&str, &str)> = vec![
        ("q", q.as_str()),
        ("pageSize", page_size.as_str()),
        ("fields", fields.as_str()),
    ];
    if let Some(token) = page_token {
        query.push(("pageToken", token));
    }

    let response: FileListResponse = client
        .get_json(FILES_PATH, &query)
        .await
        .with_context(|| format!("Failed to list files (q: {q})"))?;

    debug!(
        items = response.files.len(),
        has_more = response.next_page_token.is_some(),
        "Fetched listing page"
    );

    Ok(ListPage {
        items: response.files.into_iter().map(ListedItem::from).collect(),
        next_page_token: response.next_page_token,
    })
}

/// Fetches metadata for one item (`root` is accepted as an alias)
pub async fn get_item(client: &DriveClient, id: &str) -> Result<ListedItem> {
    let path = format!("{FILES_PATH}/{id}");
    let file: DriveFile = client
        .get_json(&path, &[("fields", ITEM_FIELDS)])
        .await
        .with_context(|| format!("Failed to fetch item {id}"))?;
    Ok(file.into())
}
