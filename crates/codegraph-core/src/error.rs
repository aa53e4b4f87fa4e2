//! Top-level error type for the indexing and search pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::external::ExternalError;

/// Errors surfaced by the core crate.
///
/// Per-file failures during indexing are *not* represented here — they are
/// collected into [`crate::indexer::IndexStats::errors`] instead, since a
/// single file failing must never abort a repository-wide run. This type
/// covers programming errors and operations that have no partial-failure
/// mode to degrade into.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("external collaborator error: {0}")]
    External(#[from] ExternalError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("project root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("index schema version {found} is older than the supported version {supported}; refusing to read")]
    SchemaTooOld { found: i64, supported: i64 },

    #[error("file not indexed: {0}")]
    FileNotIndexed(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}
