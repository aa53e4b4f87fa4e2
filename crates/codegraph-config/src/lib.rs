//! CodeGraph Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.codegraph/config.toml`
//! - Local config: `.codegraph/config.toml` (in workspace)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for CodeGraph.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CodegraphConfig {
    /// Where the index database lives
    pub storage: StorageConfig,

    /// File discovery and batching knobs
    pub indexing: IndexingConfig,

    /// Chunking and embedding-batch knobs
    pub embedding: EmbeddingConfig,

    /// Search-time knobs
    pub search: SearchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the index lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory (relative to the workspace root unless absolute) holding
    /// the index database.
    pub data_dir: PathBuf,

    /// File name of the SQLite database within `data_dir`.
    pub db_filename: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".codegraph"),
            db_filename: "index.sqlite3".to_string(),
        }
    }
}

/// File discovery and per-run batching.
///
/// # Example TOML
///
/// ```toml
/// [indexing]
/// file_batch_size = 50
/// min_file_size = 10
/// max_file_size = 1048576
/// ignore_patterns = ["**/*.generated.ts"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexingConfig {
    /// Files are persisted in batches of this size.
    pub file_batch_size: usize,

    /// Files smaller than this (bytes) are skipped.
    pub min_file_size: u64,

    /// Files larger than this (bytes) are skipped.
    pub max_file_size: u64,

    /// Extra glob patterns excluded on top of the built-in defaults.
    pub ignore_patterns: Vec<String>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            file_batch_size: 50,
            min_file_size: 10,
            max_file_size: 1_048_576,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Chunking and embedding-batch knobs, handed to the external chunker and
/// vector store collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Intent-stream chunks are submitted to the vector store in batches of
    /// this many files.
    pub embedding_batch_size: usize,

    /// Target chunk size, in tokens.
    pub chunk_target_tokens: u32,

    /// Fraction of `chunk_target_tokens` reused as overlap between adjacent
    /// chunks.
    pub chunk_overlap_fraction: f32,

    /// Hard ceiling on a single chunk's token count.
    pub chunk_hard_limit: u32,

    /// Skip embedding generation entirely (indexing only).
    pub skip_embeddings: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            embedding_batch_size: 20,
            chunk_target_tokens: 28_800,
            chunk_overlap_fraction: 0.10,
            chunk_hard_limit: 32_000,
            skip_embeddings: false,
        }
    }
}

/// Search-time knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum cosine similarity for a semantic hit to be returned.
    pub similarity_threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.25,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"codegraph_core=debug"`.
    pub level: String,

    /// Output format for log lines.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override workspace root directory
    pub workspace_root: Option<PathBuf>,

    /// Override the index data directory
    pub data_dir: Option<PathBuf>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override the semantic search similarity threshold
    pub similarity_threshold: Option<f32>,

    /// Force-disable embedding generation for this run
    pub skip_embeddings: Option<bool>,
}

impl CodegraphConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.data_dir {
            self.storage.data_dir = dir.clone();
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(threshold) = overrides.similarity_threshold {
            self.search.similarity_threshold = threshold;
        }

        if let Some(skip) = overrides.skip_embeddings {
            self.embedding.skip_embeddings = skip;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.search.similarity_threshold) {
            return Err(ConfigError::invalid_value(
                "search.similarity_threshold",
                "must be between 0.0 and 1.0",
            ));
        }

        if !(0.0..1.0).contains(&self.embedding.chunk_overlap_fraction) {
            return Err(ConfigError::invalid_value(
                "embedding.chunk_overlap_fraction",
                "must be in [0.0, 1.0)",
            ));
        }

        if self.embedding.chunk_target_tokens == 0 {
            return Err(ConfigError::invalid_value(
                "embedding.chunk_target_tokens",
                "must be greater than zero",
            ));
        }

        if self.embedding.chunk_target_tokens > self.embedding.chunk_hard_limit {
            return Err(ConfigError::invalid_value(
                "embedding.chunk_target_tokens",
                "must not exceed embedding.chunk_hard_limit",
            ));
        }

        if self.indexing.file_batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "indexing.file_batch_size",
                "must be greater than zero",
            ));
        }

        if self.indexing.min_file_size > self.indexing.max_file_size {
            return Err(ConfigError::invalid_value(
                "indexing.min_file_size",
                "must not exceed indexing.max_file_size",
            ));
        }

        Ok(())
    }

    /// Get the effective data directory for a workspace.
    pub fn data_dir(&self, workspace_root: &std::path::Path) -> PathBuf {
        if self.storage.data_dir.is_absolute() {
            self.storage.data_dir.clone()
        } else {
            workspace_root.join(&self.storage.data_dir)
        }
    }

    /// Get the index database path for a workspace.
    pub fn db_path(&self, workspace_root: &std::path::Path) -> PathBuf {
        self.data_dir(workspace_root).join(&self.storage.db_filename)
    }
}
