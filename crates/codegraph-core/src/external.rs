//! Traits for the collaborators this crate consumes but does not implement:
//! AST extraction, embedding/vector storage, lexical (BM25) indexing, text
//! chunking, and partition classification.
//!
//! Each is a single `#[async_trait]`-or-sync interface implemented by
//! interchangeable concrete backends, object-safety asserted by a test.
//! The six traits are split one-per-collaborator because each is an
//! independently swappable system (a different AST parser, a different
//! vector database) rather than facets of one backend.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::model::{AstExtraction, Language};

/// Errors raised by an external collaborator. The core never interprets
/// the cause beyond "it failed" — callers either retry, degrade, or drop
/// the affected unit of work.
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{collaborator} failed: {message}")]
    Failed {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} is unavailable")]
    Unavailable { collaborator: &'static str },
}

impl ExternalError {
    pub fn failed(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            collaborator,
            message: message.into(),
        }
    }
}

/// Produces a symbol/import/export tree for one file.
///
/// `ContentExtractor` invokes this for every non-documentation file;
/// documentation files skip AST extraction entirely.
pub trait AstExtractor: Send + Sync {
    fn extract(&self, file_path: &str, contents: &str, language_hint: Language) -> Result<AstExtraction, ExternalError>;
}

/// Maps text to a fixed-dimension vector. Consumed internally by
/// `VectorStore` implementations, not called directly by the core —
/// present here so the contract is documented and testable in isolation.
pub trait EmbeddingBackend: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExternalError>;
}

/// A document submitted to a `VectorStore`.
#[derive(Debug, Clone)]
pub struct VectorDoc {
    pub id: String,
    pub content: String,
    pub metadata: Value,
}

/// A similarity hit returned by a `VectorStore`.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
    pub content: String,
    pub metadata: Value,
}

/// Stores embedding vectors by id + metadata and performs top-k similarity
/// search. Embeds internally via an `EmbeddingBackend`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add_documents(&self, collection: &str, docs: Vec<VectorDoc>) -> Result<(), ExternalError>;

    async fn search_similar(
        &self,
        collection: &str,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<VectorHit>, ExternalError>;
}

/// A BM25 hit: document id + raw relevance score.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub id: String,
    pub score: f32,
}

/// Indexes `(docId, text)` pairs and serves BM25 search.
/// `upsert`/`index_document` is idempotent: reindexing the same id
/// replaces the prior entry rather than accumulating duplicates.
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    async fn index_document(&self, id: &str, text: &str, metadata: Value) -> Result<(), ExternalError>;

    async fn search(&self, query: &str, k: usize) -> Result<Vec<LexicalHit>, ExternalError>;
}

/// One token-bounded slice of a chunked text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub chunk_index: u32,
    pub start_offset: u32,
    pub end_offset: u32,
    pub token_count: u32,
}

/// Configuration the `EmbeddingPipeline` passes to the chunker for every
/// call.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub target_tokens: u32,
    pub overlap_fraction: f32,
    pub hard_limit: u32,
}

/// Splits oversize text into overlapping, token-bounded chunks. For small
/// inputs it may return a single chunk covering `[0, len)`.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str, file_path: &str, language: Language, config: ChunkConfig) -> Vec<Chunk>;
}

/// The result of classifying a file into a namespace for authority
/// weighting.
#[derive(Debug, Clone)]
pub struct PartitionInfo {
    pub partition_id: String,
    pub authority_score: f32,
}

/// Maps a file path to a partition id + authority score in `[0, 1]`.
pub trait PartitionClassifier: Send + Sync {
    fn classify(&self, file_path: &str) -> PartitionInfo;
}
