//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.codegraph/config.toml`
//! 2. Local config: `.codegraph/config.toml` (in workspace)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{CodegraphConfig, ConfigOverrides};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".codegraph";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".codegraph";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.codegraph`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<CodegraphConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.codegraph`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a workspace.
    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a workspace with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<CodegraphConfig, ConfigError> {
        let mut config = CodegraphConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(workspace_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;

        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<CodegraphConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a workspace.
    pub fn load_local(&self, workspace_root: &Path) -> Result<Option<CodegraphConfig>, ConfigError> {
        let local_path = self.local_config_path(workspace_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &CodegraphConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        let global_path = global_dir.join(CONFIG_FILE_NAME);
        save_config_file(&global_path, config)
    }

    /// Save configuration to the local config file for a workspace.
    pub fn save_local(
        &self,
        workspace_root: &Path,
        config: &CodegraphConfig,
    ) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(workspace_root);
        save_config_file(&local_path, config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.codegraph/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        if !global_dir.exists() {
            std::fs::create_dir_all(global_dir)
                .map_err(|e| ConfigError::create_dir(global_dir, e))?;
        }

        let config_path = global_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            let default_config = CodegraphConfig::default();
            save_config_file(&config_path, &default_config)?;
        }

        Ok(config_path)
    }

    /// Initialize local configuration for a workspace.
    ///
    /// Creates `.codegraph/config.toml` with default configuration.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        let local_dir = workspace_root.join(LOCAL_CONFIG_DIR);

        if !local_dir.exists() {
            std::fs::create_dir_all(&local_dir)
                .map_err(|e| ConfigError::create_dir(&local_dir, e))?;
        }

        let config_path = local_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            let default_config = CodegraphConfig::default();
            save_config_file(&config_path, &default_config)?;
        }

        Ok(config_path)
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<CodegraphConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &CodegraphConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: CodegraphConfig, overlay: CodegraphConfig) -> CodegraphConfig {
    CodegraphConfig {
        storage: merge_storage(base.storage, overlay.storage),
        indexing: merge_indexing(base.indexing, overlay.indexing),
        embedding: merge_embedding(base.embedding, overlay.embedding),
        search: merge_search(base.search, overlay.search),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

/// Merge storage config, overlay values override base.
fn merge_storage(base: crate::StorageConfig, overlay: crate::StorageConfig) -> crate::StorageConfig {
    let defaults = crate::StorageConfig::default();
    crate::StorageConfig {
        data_dir: if overlay.data_dir != defaults.data_dir {
            overlay.data_dir
        } else {
            base.data_dir
        },
        db_filename: if overlay.db_filename != defaults.db_filename {
            overlay.db_filename
        } else {
            base.db_filename
        },
    }
}

/// Merge indexing config.
fn merge_indexing(base: crate::IndexingConfig, overlay: crate::IndexingConfig) -> crate::IndexingConfig {
    let defaults = crate::IndexingConfig::default();
    crate::IndexingConfig {
        file_batch_size: if overlay.file_batch_size != defaults.file_batch_size {
            overlay.file_batch_size
        } else {
            base.file_batch_size
        },
        min_file_size: if overlay.min_file_size != defaults.min_file_size {
            overlay.min_file_size
        } else {
            base.min_file_size
        },
        max_file_size: if overlay.max_file_size != defaults.max_file_size {
            overlay.max_file_size
        } else {
            base.max_file_size
        },
        // Patterns extend rather than replace: overlay's list is additive.
        ignore_patterns: {
            let mut patterns = base.ignore_patterns;
            for pattern in overlay.ignore_patterns {
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
            patterns
        },
    }
}

/// Merge embedding config.
fn merge_embedding(base: crate::EmbeddingConfig, overlay: crate::EmbeddingConfig) -> crate::EmbeddingConfig {
    let defaults = crate::EmbeddingConfig::default();
    crate::EmbeddingConfig {
        embedding_batch_size: if overlay.embedding_batch_size != defaults.embedding_batch_size {
            overlay.embedding_batch_size
        } else {
            base.embedding_batch_size
        },
        chunk_target_tokens: if overlay.chunk_target_tokens != defaults.chunk_target_tokens {
            overlay.chunk_target_tokens
        } else {
            base.chunk_target_tokens
        },
        chunk_overlap_fraction: if (overlay.chunk_overlap_fraction - defaults.chunk_overlap_fraction).abs()
            > f32::EPSILON
        {
            overlay.chunk_overlap_fraction
        } else {
            base.chunk_overlap_fraction
        },
        chunk_hard_limit: if overlay.chunk_hard_limit != defaults.chunk_hard_limit {
            overlay.chunk_hard_limit
        } else {
            base.chunk_hard_limit
        },
        skip_embeddings: overlay.skip_embeddings || base.skip_embeddings,
    }
}

/// Merge search config.
fn merge_search(base: crate::SearchConfig, overlay: crate::SearchConfig) -> crate::SearchConfig {
    let defaults = crate::SearchConfig::default();
    crate::SearchConfig {
        similarity_threshold: if (overlay.similarity_threshold - defaults.similarity_threshold).abs()
            > f32::EPSILON
        {
            overlay.similarity_threshold
        } else {
            base.similarity_threshold
        },
    }
}

/// Merge logging config.
fn merge_logging(base: crate::LoggingConfig, overlay: crate::LoggingConfig) -> crate::LoggingConfig {
    let defaults = crate::LoggingConfig::default();
    crate::LoggingConfig {
        level: if overlay.level != defaults.level {
            overlay.level
        } else {
            base.level
        },
        format: overlay.format,
    }
}
