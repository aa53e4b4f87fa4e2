//! One module per subcommand. Each module parses its own `clap::Args`,
//! loads the merged configuration, and calls straight into
//! `codegraph-core` — no indexing/search logic lives here.

pub mod graph;
pub mod index;
pub mod search;
pub mod stats;

use std::path::PathBuf;

use anyhow::Result;
use codegraph_config::{CodegraphConfig, ConfigLoader, ConfigOverrides};
use codegraph_core::external::VectorDoc;
use codegraph_core::store::IndexStore;
use codegraph_core::PathResolver;
use serde_json::json;

use crate::adapters::{InMemoryLexicalIndex, InMemoryVectorStore};
use crate::GlobalOptions;

/// Everything a command needs: the merged config, an open store, and
/// lexical/vector backends rehydrated from the store's persisted state.
pub struct CliContext {
    pub workspace_root: PathBuf,
    pub config: CodegraphConfig,
    pub store: IndexStore,
    pub lexical_index: InMemoryLexicalIndex,
    pub vector_store: InMemoryVectorStore,
}

impl CliContext {
    pub fn bootstrap(global: &GlobalOptions) -> Result<Self> {
        let workspace_root = global
            .workspace
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let workspace_root = workspace_root.canonicalize().unwrap_or(workspace_root);

        let mut loader = ConfigLoader::new();
        let overrides = global.to_config_overrides();
        let config = loader.load(&workspace_root, Some(&overrides))?;

        let paths = PathResolver::new().resolve(&workspace_root)?;
        let store = IndexStore::open(&paths.db_path)?;

        let lexical_index = InMemoryLexicalIndex::new();
        lexical_index.seed(store.all_bm25_documents()?);

        let vector_store = InMemoryVectorStore::new();
        vector_store.seed(
            store
                .all_embedded_chunks()?
                .into_iter()
                .map(|chunk| VectorDoc {
                    id: chunk.chunk_id,
                    content: chunk.chunk_text,
                    metadata: json!({
                        "file_path": chunk.file_path,
                        "partition_id": chunk.partition_id,
                        "authority_score": chunk.authority_score,
                    }),
                })
                .collect(),
        );

        Ok(Self {
            workspace_root,
            config,
            store,
            lexical_index,
            vector_store,
        })
    }
}
