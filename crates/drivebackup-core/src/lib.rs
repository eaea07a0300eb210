//! Drive Backup Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `RemoteObject`, `RemoteTreeIndex`, `BackupRun`, `BackupState`
//! - **Use cases** - `BuildIndexUseCase`, `ResolveSourceUseCase`
//! - **Port definitions** - Traits for adapters: `IRemoteListing`, `IRemoteTransfer`, `ILocalFileSystem`
//! - **Configuration** - The typed YAML configuration file
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
