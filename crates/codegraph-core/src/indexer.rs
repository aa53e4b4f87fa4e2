//! Orchestrates the per-file pipeline: discovery, change detection,
//! extraction, classification, atomic persistence, and pending-embedding
//! generation.
//!
//! A single driver that walks files, checks each against prior state, and
//! reports aggregate stats; change detection and persistence are relational
//! (a stored hash per file), not a Merkle tree.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, warn};

use crate::change::{ChangeDetector, ChangeStatus};
use crate::config::IndexOptions;
use crate::error::CoreError;
use crate::external::{AstExtractor, LexicalIndex, PartitionClassifier};
use crate::extract::ContentExtractor;
use crate::discovery::FileDiscovery;
use crate::model::{flatten_symbols, ImportRow, Language};
use crate::pipeline::EmbeddingPipeline;
use crate::store::{FileRecord, IndexStore};

/// Aggregate result of one `index_repository` call.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub total: usize,
    pub indexed: usize,
    pub already_indexed: usize,
    pub needs_indexing: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub languages_histogram: HashMap<String, usize>,
    pub total_symbols: usize,
    pub files_with_embeddings: usize,
    pub elapsed_ms: u64,
}

pub struct Indexer {
    store: IndexStore,
    ast_extractor: Arc<dyn AstExtractor>,
    classifier: Arc<dyn PartitionClassifier>,
    lexical_index: Arc<dyn LexicalIndex>,
    embedding_pipeline: EmbeddingPipeline,
    discovery: FileDiscovery,
    change_detector: ChangeDetector,
    extractor: ContentExtractor,
}

impl Indexer {
    pub fn new(
        store: IndexStore,
        ast_extractor: Arc<dyn AstExtractor>,
        classifier: Arc<dyn PartitionClassifier>,
        lexical_index: Arc<dyn LexicalIndex>,
        embedding_pipeline: EmbeddingPipeline,
    ) -> Self {
        Self {
            store,
            ast_extractor,
            classifier,
            lexical_index,
            embedding_pipeline,
            discovery: FileDiscovery::new(),
            change_detector: ChangeDetector::new(),
            extractor: ContentExtractor::new(),
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut IndexStore {
        &mut self.store
    }

    /// Index `root` per `opts`, in batches of `opts.file_batch_size`.
    /// Per-file failures are collected into `errors[]`, never abort the run.
    pub async fn index_repository(&mut self, root: &Path, opts: &IndexOptions) -> Result<IndexStats, CoreError> {
        let start = Instant::now();
        let files = self.discovery.discover(root, opts)?;

        let mut stats = IndexStats {
            total: files.len(),
            ..Default::default()
        };

        for batch in files.chunks(opts.file_batch_size) {
            for file_path in batch {
                match self.index_one_file(root, file_path).await {
                    Ok(FileOutcome::AlreadyIndexed) => stats.already_indexed += 1,
                    Ok(FileOutcome::Indexed { symbol_count, language }) => {
                        stats.indexed += 1;
                        stats.needs_indexing += 1;
                        stats.total_symbols += symbol_count;
                        *stats.languages_histogram.entry(language).or_insert(0) += 1;
                    }
                    Err(message) => {
                        warn!(file_path, error = %message, "indexing failed, skipping file");
                        stats.skipped += 1;
                        stats.errors.push(message);
                    }
                }
            }
        }

        if !opts.skip_embeddings {
            match self.embedding_pipeline.generate_pending(&mut self.store, opts).await {
                Ok(embedding_stats) => stats.files_with_embeddings = embedding_stats.files_embedded,
                Err(e) => {
                    warn!(error = %e, "embedding pipeline run failed");
                    stats.errors.push(format!("embedding pipeline: {e}"));
                }
            }
        }

        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(
            total = stats.total,
            indexed = stats.indexed,
            already_indexed = stats.already_indexed,
            skipped = stats.skipped,
            "index_repository complete"
        );
        Ok(stats)
    }

    async fn index_one_file(&mut self, root: &Path, file_path: &str) -> Result<FileOutcome, String> {
        let abs_path = root.join(file_path);
        let bytes = std::fs::read(&abs_path).map_err(|e| format!("{file_path}: read failed: {e}"))?;

        let change = self
            .change_detector
            .check(&self.store, file_path, &bytes)
            .map_err(|e| format!("{file_path}: change check failed: {e}"))?;

        let ChangeStatus::Changed { new_hash } = change else {
            return Ok(FileOutcome::AlreadyIndexed);
        };

        let language = Language::from_path(Path::new(file_path)).unwrap_or_default();
        let contents = String::from_utf8_lossy(&bytes).into_owned();

        let extracted = self
            .extractor
            .extract(self.ast_extractor.as_ref(), file_path, &contents, language)
            .map_err(|e| format!("{file_path}: extraction failed: {e}"))?;

        let partition = self.classifier.classify(file_path);
        let symbols = flatten_symbols(file_path, &extracted.symbols, &extracted.exports);
        let imports: Vec<ImportRow> = extracted
            .imports
            .iter()
            .map(|i| ImportRow {
                source_file: file_path.to_string(),
                import_path: i.import_path.clone(),
                imported_name: i.imported_name.clone(),
                is_default: i.is_default,
            })
            .collect();

        let mtime_ms = std::fs::metadata(&abs_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let rec = FileRecord {
            file_path: file_path.to_string(),
            mtime_ms,
            file_hash: new_hash,
            language: language.as_str().to_string(),
            size_bytes: bytes.len() as i64,
            symbols: symbols.clone(),
            imports,
            searchable_text: extracted.code_stream.clone(),
            embedding_text: extracted.intent_stream,
            partition_id: partition.partition_id,
            authority_score: partition.authority_score,
            index_fulltext: language.is_documentation(),
        };

        self.store
            .persist_file(&rec)
            .map_err(|e| format!("{file_path}: persist failed: {e}"))?;

        self.lexical_index
            .index_document(file_path, &extracted.code_stream, json!({ "language": language.as_str() }))
            .await
            .map_err(|e| format!("{file_path}: lexical index upsert failed: {e}"))?;

        Ok(FileOutcome::Indexed {
            symbol_count: symbols.len(),
            language: language.as_str().to_string(),
        })
    }
}

enum FileOutcome {
    AlreadyIndexed,
    Indexed { symbol_count: usize, language: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{AstExtraction, Chunk, ChunkConfig, Chunker, ExternalError, LexicalHit, PartitionInfo, VectorDoc, VectorHit, VectorStore};
    use crate::model::{AstSymbol, SymbolKind};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedExtractor;

    impl AstExtractor for FixedExtractor {
        fn extract(&self, _file_path: &str, contents: &str, language_hint: Language) -> Result<AstExtraction, ExternalError> {
            let name = contents.trim().to_string();
            Ok(AstExtraction {
                symbols: vec![AstSymbol {
                    name: name.clone(),
                    kind: SymbolKind::Function,
                    signature: None,
                    span: None,
                    body_text: Some(contents.to_string()),
                    children: vec![],
                }],
                imports: vec![],
                exports: vec![name],
                language: language_hint,
            })
        }
    }

    struct FixedClassifier;

    impl PartitionClassifier for FixedClassifier {
        fn classify(&self, _file_path: &str) -> PartitionInfo {
            PartitionInfo {
                partition_id: "project".to_string(),
                authority_score: 0.7,
            }
        }
    }

    struct NoopLexicalIndex;

    #[async_trait]
    impl LexicalIndex for NoopLexicalIndex {
        async fn index_document(&self, _id: &str, _text: &str, _metadata: serde_json::Value) -> Result<(), ExternalError> {
            Ok(())
        }
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<LexicalHit>, ExternalError> {
            Ok(vec![])
        }
    }

    struct NoopChunker;

    impl Chunker for NoopChunker {
        fn chunk(&self, _text: &str, _file_path: &str, _language: Language, _config: ChunkConfig) -> Vec<Chunk> {
            vec![]
        }
    }

    struct NoopVectorStore;

    #[async_trait]
    impl VectorStore for NoopVectorStore {
        async fn add_documents(&self, _collection: &str, _docs: Vec<VectorDoc>) -> Result<(), ExternalError> {
            Ok(())
        }
        async fn search_similar(&self, _collection: &str, _query: &str, _k: usize, _threshold: f32) -> Result<Vec<VectorHit>, ExternalError> {
            Ok(vec![])
        }
    }

    fn make_indexer() -> Indexer {
        let store = IndexStore::open_in_memory().unwrap();
        let pipeline = EmbeddingPipeline::new(Arc::new(NoopChunker), Arc::new(NoopVectorStore));
        Indexer::new(
            store,
            Arc::new(FixedExtractor),
            Arc::new(FixedClassifier),
            Arc::new(NoopLexicalIndex),
            pipeline,
        )
    }

    #[tokio::test]
    async fn indexes_new_files_and_skips_on_second_pass() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.ts"), "foo").unwrap();

        let mut indexer = make_indexer();
        let opts = IndexOptions {
            skip_embeddings: true,
            ..Default::default()
        };

        let stats = indexer.index_repository(temp.path(), &opts).await.unwrap();
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.total_symbols, 1);

        let stats2 = indexer.index_repository(temp.path(), &opts).await.unwrap();
        assert_eq!(stats2.already_indexed, 1);
        assert_eq!(stats2.indexed, 0);
    }

    #[tokio::test]
    async fn reindexes_on_content_change() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("a.ts");
        std::fs::write(&file_path, "foo").unwrap();

        let mut indexer = make_indexer();
        let opts = IndexOptions {
            skip_embeddings: true,
            ..Default::default()
        };

        indexer.index_repository(temp.path(), &opts).await.unwrap();
        std::fs::write(&file_path, "foo2").unwrap();
        let stats = indexer.index_repository(temp.path(), &opts).await.unwrap();

        assert_eq!(stats.needs_indexing, 1);
        let symbols = indexer.store().symbols_for_file("a.ts").unwrap();
        assert!(!symbols.iter().any(|s| s.name == "foo"));
        assert!(symbols.iter().any(|s| s.name == "foo2"));
    }

    #[tokio::test]
    async fn unreadable_file_is_collected_as_error_not_aborted() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.ts"), "foo").unwrap();

        let mut indexer = make_indexer();
        let opts = IndexOptions {
            skip_embeddings: true,
            files: Some(vec!["a.ts".to_string(), "missing.ts".to_string()]),
            ..Default::default()
        };

        let stats = indexer.index_repository(temp.path(), &opts).await.unwrap();
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errors.len(), 1);
    }
}
