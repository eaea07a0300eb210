//! Use cases (interactors) for drive-backup
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`BuildIndexUseCase`] - Full paginated listing into a remote tree index
//! - [`ResolveSourceUseCase`] - Backup source folder by id or by name

pub mod build_index;
pub mod resolve_source;

pub use build_index::BuildIndexUseCase;
pub use resolve_source::{
    ResolveSourceUseCase, ResolvedSource, SourceError, SourceSelector, DRIVE_ROOT_NAME,
};
