//! Minimal local implementations of the six external collaborator traits
//! `codegraph-core` defines but does not implement.
//!
//! These are the CLI's built-in default backend: no network calls, no ML
//! runtime, good enough to make `codegraph index`/`search`/`graph` actually
//! run end to end. A real deployment would swap these for a tree-sitter
//! extractor, a proper BM25 engine, and a real vector database without
//! touching `codegraph-core`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use codegraph_core::external::{
    AstExtractor, Chunk, ChunkConfig, Chunker, EmbeddingBackend, ExternalError, LexicalHit,
    LexicalIndex, PartitionClassifier, PartitionInfo, VectorDoc, VectorHit, VectorStore,
};
use codegraph_core::model::{AstExtraction, AstImport, AstSymbol, Language, SymbolKind};
use regex::Regex;
use serde_json::Value;

/// Finds function/class-ish declarations and import lines with a handful of
/// per-language regexes. Not a parser: no nesting, no accurate spans.
pub struct RegexAstExtractor;

impl AstExtractor for RegexAstExtractor {
    fn extract(
        &self,
        _file_path: &str,
        contents: &str,
        language_hint: Language,
    ) -> Result<AstExtraction, ExternalError> {
        let symbol_re = symbol_regex(language_hint);
        let import_re = import_regex(language_hint);

        let mut symbols = Vec::new();
        let mut exports = Vec::new();
        for cap in symbol_re.captures_iter(contents) {
            let name = cap
                .get(1)
                .or_else(|| cap.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let kind = if cap.get(0).map(|m| m.as_str()).unwrap_or("").contains("class") {
                SymbolKind::Class
            } else {
                SymbolKind::Function
            };
            symbols.push(AstSymbol {
                name: name.clone(),
                kind,
                signature: None,
                span: None,
                body_text: Some(name.clone()),
                children: vec![],
            });
            exports.push(name);
        }

        let mut imports = Vec::new();
        for cap in import_re.captures_iter(contents) {
            if let Some(path) = cap.get(1).or_else(|| cap.get(2)) {
                imports.push(AstImport {
                    import_path: path.as_str().to_string(),
                    imported_name: None,
                    is_default: false,
                });
            }
        }

        Ok(AstExtraction {
            symbols,
            imports,
            exports,
            language: language_hint,
        })
    }
}

fn symbol_regex(language: Language) -> Regex {
    let pattern = match language {
        Language::Python => r"(?m)^\s*(?:class|def)\s+(\w+)",
        Language::Rust => r"(?m)^\s*(?:pub\s+)?(?:fn|struct|enum|trait)\s+(\w+)",
        Language::Go => r"(?m)^\s*func\s+(?:\([^)]*\)\s*)?(\w+)",
        Language::Java | Language::CSharp | Language::Cpp | Language::C => {
            r"(?m)^\s*(?:public|private|protected|static|\s)*\s*(?:class|struct)?\s*\w[\w<>:,\s]*\s+(\w+)\s*\("
        }
        _ => r"(?m)^\s*(?:export\s+)?(?:async\s+)?function\s+(\w+)|^\s*(?:export\s+)?class\s+(\w+)",
    };
    Regex::new(pattern).expect("static regex is valid")
}

fn import_regex(language: Language) -> Regex {
    let pattern = match language {
        Language::Python => r#"(?m)^\s*(?:from\s+(\S+)\s+import|import\s+(\S+))"#,
        Language::Rust => r"(?m)^\s*use\s+([\w:]+)",
        Language::Go => r#"(?m)"([\w./-]+)""#,
        _ => r#"(?m)(?:from|require\()\s*['"]([^'"]+)['"]"#,
    };
    Regex::new(pattern).expect("static regex is valid")
}

/// Splits on whitespace into `target_tokens`-sized windows with overlap.
pub struct WordChunker;

impl Chunker for WordChunker {
    fn chunk(&self, text: &str, _file_path: &str, _language: Language, config: ChunkConfig) -> Vec<Chunk> {
        let words: Vec<(usize, &str)> = text.split_whitespace().enumerate().collect();
        if words.is_empty() {
            return vec![];
        }

        let target = config.target_tokens.max(1) as usize;
        let overlap = ((target as f32) * config.overlap_fraction) as usize;
        let stride = target.saturating_sub(overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut index = 0u32;

        while start < words.len() {
            let end = (start + target).min(words.len());
            let slice = &words[start..end];
            let text_slice = slice.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ");
            let token_count = (slice.len() as u32).min(config.hard_limit);

            chunks.push(Chunk {
                text: text_slice,
                chunk_index: index,
                start_offset: start as u32,
                end_offset: end as u32,
                token_count,
            });

            index += 1;
            if end == words.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}

/// Scores authority by path depth and well-known low-authority directories
/// (tests, fixtures, generated output) — a lightweight stand-in for a real
/// component-authority model.
pub struct PathHeuristicClassifier;

impl PartitionClassifier for PathHeuristicClassifier {
    fn classify(&self, file_path: &str) -> PartitionInfo {
        let lower = file_path.to_lowercase();
        let is_low_authority = ["test", "tests", "fixture", "fixtures", "generated", "mock"]
            .iter()
            .any(|marker| lower.contains(marker));

        let partition_id = file_path
            .split('/')
            .next()
            .unwrap_or(file_path)
            .to_string();

        let authority_score = if is_low_authority { 0.2 } else { 0.7 };

        PartitionInfo {
            partition_id,
            authority_score,
        }
    }
}

/// In-memory BM25-ish lexical index: term-overlap scoring over a process-
/// lifetime document map. Idempotent upsert per `id`.
#[derive(Default)]
pub struct InMemoryLexicalIndex {
    documents: Mutex<HashMap<String, String>>,
}

impl InMemoryLexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load previously persisted `(file_path, searchable_text)` pairs
    /// read back from `IndexStore`, since this backend keeps no state of
    /// its own across process runs.
    pub fn seed(&self, docs: Vec<(String, String)>) {
        let mut documents = self.documents.lock().expect("lock poisoned");
        documents.extend(docs);
    }
}

#[async_trait]
impl LexicalIndex for InMemoryLexicalIndex {
    async fn index_document(&self, id: &str, text: &str, _metadata: Value) -> Result<(), ExternalError> {
        self.documents
            .lock()
            .map_err(|_| ExternalError::failed("lexical_index", "lock poisoned"))?
            .insert(id.to_string(), text.to_string());
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<LexicalHit>, ExternalError> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| ExternalError::failed("lexical_index", "lock poisoned"))?;

        let query_terms: Vec<String> = tokenize(query);
        let mut hits: Vec<LexicalHit> = documents
            .iter()
            .filter_map(|(id, text)| {
                let doc_terms = tokenize(text);
                let score = term_overlap_score(&query_terms, &doc_terms);
                (score > 0.0).then_some(LexicalHit { id: id.clone(), score })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn term_overlap_score(query_terms: &[String], doc_terms: &[String]) -> f32 {
    if query_terms.is_empty() || doc_terms.is_empty() {
        return 0.0;
    }
    let doc_len = doc_terms.len() as f32;
    query_terms
        .iter()
        .map(|t| doc_terms.iter().filter(|d| *d == t).count() as f32)
        .sum::<f32>()
        / doc_len.sqrt()
}

const EMBEDDING_DIM: usize = 64;

/// Hashes each word into one of `EMBEDDING_DIM` buckets and counts
/// occurrences — a bag-of-words embedding with no model weights to load.
pub struct BagOfWordsEmbeddingBackend;

impl EmbeddingBackend for BagOfWordsEmbeddingBackend {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ExternalError> {
        Ok(texts.iter().map(|t| embed_one(t)).collect())
    }
}

fn embed_one(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];
    for term in tokenize(text) {
        let bucket = fnv1a(&term) as usize % EMBEDDING_DIM;
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

struct StoredVector {
    embedding: Vec<f32>,
    doc: VectorDoc,
}

/// In-memory vector store embedding documents via [`BagOfWordsEmbeddingBackend`].
/// State does not persist across process runs.
#[derive(Default)]
pub struct InMemoryVectorStore {
    backend: BagOfWordsEmbeddingBackend,
    entries: Mutex<HashMap<String, StoredVector>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            backend: BagOfWordsEmbeddingBackend,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Bulk-load previously embedded chunks read back from `IndexStore`,
    /// recomputing their embeddings locally since this backend persists
    /// nothing of its own across process runs.
    pub fn seed(&self, docs: Vec<VectorDoc>) {
        let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.backend.embed(&texts).unwrap_or_default();

        let mut entries = self.entries.lock().expect("lock poisoned");
        for (doc, embedding) in docs.into_iter().zip(embeddings) {
            entries.insert(doc.id.clone(), StoredVector { embedding, doc });
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_documents(&self, _collection: &str, docs: Vec<VectorDoc>) -> Result<(), ExternalError> {
        let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.backend.embed(&texts)?;

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ExternalError::failed("vector_store", "lock poisoned"))?;
        for (doc, embedding) in docs.into_iter().zip(embeddings) {
            entries.insert(doc.id.clone(), StoredVector { embedding, doc });
        }
        Ok(())
    }

    async fn search_similar(
        &self,
        _collection: &str,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<VectorHit>, ExternalError> {
        let query_embedding = self.backend.embed(std::slice::from_ref(&query.to_string()))?
            .into_iter()
            .next()
            .unwrap_or_default();

        let entries = self
            .entries
            .lock()
            .map_err(|_| ExternalError::failed("vector_store", "lock poisoned"))?;

        let mut hits: Vec<VectorHit> = entries
            .values()
            .filter_map(|stored| {
                let score = cosine_similarity(&query_embedding, &stored.embedding);
                (score >= threshold).then(|| VectorHit {
                    id: stored.doc.id.clone(),
                    score,
                    content: stored.doc.content.clone(),
                    metadata: stored.doc.metadata.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}
