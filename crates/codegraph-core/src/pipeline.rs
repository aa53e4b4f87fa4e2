//! Scans for files whose intent stream hasn't been embedded yet, chunks
//! them, and submits the chunks to the vector store in batches.
//!
//! Runs once per `Indexer.index_repository` call, after the file loop —
//! asynchronous relative to indexing in the sense that a failed embedding
//! batch never unwinds the indexing run, only leaves its rows pending for
//! the next call.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::IndexOptions;
use crate::error::CoreError;
use crate::external::{Chunk, ChunkConfig, Chunker, VectorStore, VectorDoc};
use crate::model::Language;
use crate::store::{IndexStore, PendingEmbeddingRow};

/// Counts accumulated across one `generate_pending` call.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStats {
    pub files_embedded: usize,
    pub files_failed: usize,
    pub chunks_written: usize,
}

pub struct EmbeddingPipeline {
    chunker: Arc<dyn Chunker>,
    vector_store: Arc<dyn VectorStore>,
}

impl EmbeddingPipeline {
    pub fn new(chunker: Arc<dyn Chunker>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            chunker,
            vector_store,
        }
    }

    /// Process every pending `semantic_metadata` row, in batches of
    /// `opts.embedding_batch_size`.
    pub async fn generate_pending(
        &self,
        store: &mut IndexStore,
        opts: &IndexOptions,
    ) -> Result<EmbeddingStats, CoreError> {
        let pending = store.pending_embeddings()?;
        let mut stats = EmbeddingStats::default();

        for batch in pending.chunks(opts.embedding_batch_size) {
            self.process_batch(store, batch, opts, &mut stats).await;
        }

        Ok(stats)
    }

    async fn process_batch(
        &self,
        store: &mut IndexStore,
        batch: &[PendingEmbeddingRow],
        opts: &IndexOptions,
        stats: &mut EmbeddingStats,
    ) {
        let config = ChunkConfig {
            target_tokens: opts.chunk_target_tokens,
            overlap_fraction: opts.chunk_overlap_fraction,
            hard_limit: opts.chunk_hard_limit,
        };

        // Chunking is pure CPU work; parallelize across the batch's files.
        let chunked: Vec<(PendingEmbeddingRow, Vec<Chunk>)> = batch
            .par_iter()
            .map(|row| {
                let language = language_from_str(&row.language);
                let chunks = self.chunker.chunk(&row.embedding_text, &row.file_path, language, config);
                (row.clone(), chunks)
            })
            .collect();

        let file_paths: Vec<String> = chunked.iter().map(|(row, _)| row.file_path.clone()).collect();

        let mut chunk_rows = Vec::new();
        let mut vector_docs = Vec::new();
        let indexed_at = now_millis();

        for (row, chunks) in &chunked {
            for chunk in chunks {
                let chunk_id = format!("{}:{}", row.file_path, chunk.chunk_index);
                chunk_rows.push((
                    chunk_id.clone(),
                    row.file_path.clone(),
                    chunk.chunk_index,
                    chunk.text.clone(),
                    chunk.start_offset,
                    chunk.end_offset,
                    chunk.token_count,
                ));
                vector_docs.push(VectorDoc {
                    id: chunk_id,
                    content: chunk.text.clone(),
                    metadata: json!({
                        "file_path": row.file_path,
                        "chunk_index": chunk.chunk_index,
                        "total_chunks": chunks.len(),
                        "start_offset": chunk.start_offset,
                        "end_offset": chunk.end_offset,
                        "token_count": chunk.token_count,
                        "indexed_at": indexed_at,
                        "partition_id": row.partition_id,
                        "authority_score": row.authority_score,
                    }),
                });
            }
        }

        if let Err(e) = store.replace_chunks(&file_paths, &chunk_rows) {
            warn!(error = %e, "failed to write semantic_chunks, leaving batch pending");
            stats.files_failed += batch.len();
            return;
        }

        match self.vector_store.add_documents("codegraph", vector_docs).await {
            Ok(()) => {
                if let Err(e) = store.mark_embedded(&file_paths) {
                    warn!(error = %e, "failed to flip embedding_stored, leaving batch pending");
                    stats.files_failed += batch.len();
                    return;
                }
                stats.files_embedded += batch.len();
                stats.chunks_written += chunk_rows.len();
                debug!(files = batch.len(), chunks = chunk_rows.len(), "embedding batch committed");
            }
            Err(e) => {
                warn!(error = %e, "vector store rejected batch, leaving rows pending");
                stats.files_failed += batch.len();
            }
        }
    }
}

fn language_from_str(s: &str) -> Language {
    Language::from_extension(s).unwrap_or(Language::Other)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{ExternalError, VectorHit};
    use crate::store::FileRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct WholeTextChunker;

    impl Chunker for WholeTextChunker {
        fn chunk(&self, text: &str, _file_path: &str, _language: Language, _config: ChunkConfig) -> Vec<Chunk> {
            if text.is_empty() {
                return vec![];
            }
            vec![Chunk {
                text: text.to_string(),
                chunk_index: 0,
                start_offset: 0,
                end_offset: text.len() as u32,
                token_count: text.split_whitespace().count() as u32,
            }]
        }
    }

    #[derive(Default)]
    struct RecordingVectorStore {
        added: Mutex<Vec<VectorDoc>>,
        fail: bool,
    }

    #[async_trait]
    impl VectorStore for RecordingVectorStore {
        async fn add_documents(&self, _collection: &str, docs: Vec<VectorDoc>) -> Result<(), ExternalError> {
            if self.fail {
                return Err(ExternalError::failed("vector_store", "simulated failure"));
            }
            self.added.lock().unwrap().extend(docs);
            Ok(())
        }

        async fn search_similar(&self, _collection: &str, _query: &str, _k: usize, _threshold: f32) -> Result<Vec<VectorHit>, ExternalError> {
            Ok(vec![])
        }
    }

    fn seed_pending_file(store: &mut IndexStore, file_path: &str, embedding_text: &str) {
        let rec = FileRecord {
            file_path: file_path.to_string(),
            mtime_ms: 0,
            file_hash: "h".to_string(),
            language: "ts".to_string(),
            size_bytes: 10,
            symbols: vec![],
            imports: vec![],
            searchable_text: String::new(),
            embedding_text: embedding_text.to_string(),
            partition_id: "project".to_string(),
            authority_score: 0.5,
            index_fulltext: false,
        };
        store.persist_file(&rec).unwrap();
    }

    #[tokio::test]
    async fn embeds_pending_rows_and_flips_flags() {
        let mut store = IndexStore::open_in_memory().unwrap();
        seed_pending_file(&mut store, "a.ts", "a useful doc comment about caching");

        let vector_store = Arc::new(RecordingVectorStore::default());
        let pipeline = EmbeddingPipeline::new(Arc::new(WholeTextChunker), vector_store.clone());
        let opts = IndexOptions::default();

        let stats = pipeline.generate_pending(&mut store, &opts).await.unwrap();
        assert_eq!(stats.files_embedded, 1);
        assert_eq!(vector_store.added.lock().unwrap().len(), 1);

        let pending_after = store.pending_embeddings().unwrap();
        assert!(pending_after.is_empty());
    }

    #[tokio::test]
    async fn failed_batch_leaves_rows_pending() {
        let mut store = IndexStore::open_in_memory().unwrap();
        seed_pending_file(&mut store, "a.ts", "a useful doc comment about caching");

        let vector_store = Arc::new(RecordingVectorStore {
            fail: true,
            ..Default::default()
        });
        let pipeline = EmbeddingPipeline::new(Arc::new(WholeTextChunker), vector_store);
        let opts = IndexOptions::default();

        let stats = pipeline.generate_pending(&mut store, &opts).await.unwrap();
        assert_eq!(stats.files_failed, 1);

        let pending_after = store.pending_embeddings().unwrap();
        assert_eq!(pending_after.len(), 1);
    }
}
