//! Workspace errors.
//!
//! Only faults of the engine itself are errors. Problems in user input are
//! diagnostics on the affected unit.

use thiserror::Error;

use super::document_store::LifecycleError;
use crate::base::Location;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to read {location}: {source}")]
    Io {
        location: Location,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {location}: {source}")]
    Manifest {
        location: Location,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid workspace configuration: {0}")]
    Config(#[source] serde_json::Error),

    #[error("failed to transfer parse result for {location}: {source}")]
    Transfer {
        location: Location,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("parse workers have shut down")]
    WorkerShutdown,
}
