//! Workspace management: tracking files, packages and rebuilds.
//!
//! - [`WorkspaceBuilder`] - applies change batches and drives the rebuild pipeline
//! - [`DocumentStore`] / [`SourceUnit`] - per-file state and its lifecycle
//! - [`SharedWorkspace`] - FIFO-serialized access from many threads
//! - [`FileSystemProvider`] - the file system seam ([`OsFileSystem`], [`MemoryFileSystem`])
//! - [`ParseWorker`] - dedicated parse threads behind a serialized boundary

mod builder;
mod config;
mod document_store;
mod error;
mod file_system;
mod queue;
mod worker;

pub use builder::{BuildReport, CancelRegistry, WorkspaceBuilder};
pub use config::WorkspaceConfig;
pub use document_store::{
    DocumentStore, LifecycleError, LifecycleState, SourceUnit, TextBuffers, UnitKind,
};
pub use error::WorkspaceError;
pub use file_system::{FileSystemProvider, MemoryFileSystem, OsFileSystem};
pub use queue::SharedWorkspace;
pub use worker::ParseWorker;
