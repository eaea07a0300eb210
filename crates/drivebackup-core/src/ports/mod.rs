//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteListing`] - Paginated enumeration of the remote drive
//! - [`IRemoteTransfer`] - Chunked downloads and document exports
//! - [`ILocalFileSystem`] - The backup tree on local disk
//! - [`IConfirmation`] / [`IProgressSink`] - The user running the backup

pub mod interaction;
pub mod local_filesystem;
pub mod remote_listing;
pub mod remote_transfer;

pub use interaction::{FixedAnswer, IConfirmation, IProgressSink, NoProgress};
pub use local_filesystem::{DirEntry, FileSystemState, IFileSink, ILocalFileSystem};
pub use remote_listing::{IRemoteListing, ListFilter, ListPage, ListedItem, ShortcutTarget, UserInfo};
pub use remote_transfer::{Chunk, IChunkReader, IRemoteTransfer, TransferError};
