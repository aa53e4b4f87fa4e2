//! Resolves storage locations under a project root, creating directories
//! as needed. Pure given its input.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CoreError;

/// Name of the project-local data directory.
const DATA_DIR: &str = ".codegraph";

/// Resolved filesystem locations for a project's index storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory the external `VectorStore` may use for on-disk state.
    pub vector_store_dir: PathBuf,
}

/// Resolves and creates storage locations under a project root.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathResolver;

impl PathResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve storage paths under `project_root`, creating the data
    /// directory and the vector store subdirectory if missing.
    pub fn resolve(&self, project_root: &Path) -> Result<StoragePaths, CoreError> {
        if !project_root.exists() {
            return Err(CoreError::RootNotFound(project_root.to_path_buf()));
        }

        let data_dir = project_root.join(DATA_DIR);
        let vector_store_dir = data_dir.join("vectors");

        std::fs::create_dir_all(&vector_store_dir)?;
        debug!("storage directories ready under {:?}", data_dir);

        Ok(StoragePaths {
            db_path: data_dir.join("index.sqlite3"),
            vector_store_dir,
        })
    }
}
