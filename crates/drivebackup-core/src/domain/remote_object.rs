//! Remote objects as returned by the listing API
//!
//! A [`RemoteObject`] is a single row of the remote listing: a folder or a
//! file with its parent back-references. Folders are recognised by a
//! sentinel mimeType; native documents by the `vnd.google-apps.` prefix and
//! exported through [`export_target`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backup::ExportFormat;
use super::newtypes::RemoteId;

/// MimeType the remote uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MimeType the remote uses for shortcuts to other items
pub const SHORTCUT_MIME_TYPE: &str = "application/vnd.google-apps.shortcut";

/// Prefix shared by every native (remote-only) document type
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";

const DOCUMENT: &str = "application/vnd.google-apps.document";
const SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
const PRESENTATION: &str = "application/vnd.google-apps.presentation";
const DRAWING: &str = "application/vnd.google-apps.drawing";
const SCRIPT: &str = "application/vnd.google-apps.script";

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
const PDF: &str = "application/pdf";
const SCRIPT_JSON: &str = "application/vnd.google-apps.script+json";

/// A single folder or file row from the remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Remote identifier
    pub id: RemoteId,
    /// Display name, already sanitised for the local filesystem
    pub name: String,
    /// Remote mimeType
    pub mime_type: String,
    /// Last modification time on the remote
    pub modified_time: Option<DateTime<Utc>>,
    /// Ids of every folder containing this object
    pub parents: Vec<RemoteId>,
    /// Size in bytes (absent for folders and native documents)
    pub size: Option<u64>,
}

impl RemoteObject {
    /// Returns true if this object is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Returns true if this object is a native document that has to be
    /// exported rather than downloaded
    pub fn is_native_document(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with(NATIVE_MIME_PREFIX)
    }

    /// Returns true if the remote reports the file as empty
    pub fn is_empty_file(&self) -> bool {
        self.size == Some(0)
    }
}

/// Export conversion applied to a native document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTarget {
    /// MimeType requested from the export endpoint
    pub mime_type: &'static str,
    /// Extension appended to the local file name (without the dot)
    pub extension: &'static str,
}

/// Looks up the export conversion for a native mimeType
///
/// Returns `None` for native types that cannot be exported (forms, sites,
/// maps, ...). With [`ExportFormat::Pdf`] every exportable type except Apps
/// Script is exported as PDF.
pub fn export_target(native_mime_type: &str, format: ExportFormat) -> Option<ExportTarget> {
    let office = match native_mime_type {
        DOCUMENT => ExportTarget {
            mime_type: DOCX,
            extension: "docx",
        },
        SPREADSHEET => ExportTarget {
            mime_type: XLSX,
            extension: "xlsx",
        },
        PRESENTATION => ExportTarget {
            mime_type: PPTX,
            extension: "pptx",
        },
        DRAWING => ExportTarget {
            mime_type: PDF,
            extension: "pdf",
        },
        SCRIPT => {
            return Some(ExportTarget {
                mime_type: SCRIPT_JSON,
                extension: "json",
            })
        }
        _ => return None,
    };

    match format {
        ExportFormat::MsOffice => Some(office),
        ExportFormat::Pdf => Some(ExportTarget {
            mime_type: PDF,
            extension: "pdf",
        }),
    }
}

/// Local file name a remote file is stored under
///
/// Regular files keep their name; exportable native documents get the
/// export extension appended. Returns `None` for native documents with no
/// export conversion.
pub fn local_file_name(object: &RemoteObject, format: ExportFormat) -> Option<String> {
    if object.is_native_document() {
        export_target(&object.mime_type, format)
            .map(|target| format!("{}.{}", object.name, target.extension))
    } else {
        Some(object.name.clone())
    }
}
