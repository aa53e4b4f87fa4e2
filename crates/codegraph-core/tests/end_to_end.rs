//! Full-pipeline scenarios: real `Indexer`/`IndexStore`/`SearchEngine`/
//! `GraphAnalyzer` wired to small in-memory fakes for the six external
//! traits. Each test here is one of the literal end-to-end scenarios this
//! system is expected to satisfy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codegraph_core::external::{
    AstExtractor, Chunk, ChunkConfig, Chunker, ExternalError, LexicalHit, LexicalIndex,
    PartitionClassifier, PartitionInfo, VectorDoc, VectorHit, VectorStore,
};
use codegraph_core::graph::GraphAnalyzer;
use codegraph_core::model::{AstExtraction, AstImport, AstSymbol, Language, SymbolKind};
use codegraph_core::pipeline::EmbeddingPipeline;
use codegraph_core::search::SearchEngine;
use codegraph_core::{IndexOptions, IndexStore, Indexer};
use tempfile::TempDir;

/// Parses a tiny line-oriented fixture syntax, not a real grammar:
///   `export function NAME() { BODY }` / `function NAME() { BODY }`
///   `import { NAME } from 'PATH'`
struct LineFixtureExtractor;

impl AstExtractor for LineFixtureExtractor {
    fn extract(&self, _file_path: &str, contents: &str, language_hint: Language) -> Result<AstExtraction, ExternalError> {
        let mut symbols = Vec::new();
        let mut exports = Vec::new();
        let mut imports = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("export function ").or_else(|| line.strip_prefix("function ")) {
                let name = rest.split('(').next().unwrap_or("").trim().to_string();
                if name.is_empty() {
                    continue;
                }
                symbols.push(AstSymbol {
                    name: name.clone(),
                    kind: SymbolKind::Function,
                    signature: None,
                    span: None,
                    body_text: Some(name.clone()),
                    children: vec![],
                });
                if line.starts_with("export") {
                    exports.push(name);
                }
            } else if let Some(rest) = line.strip_prefix("import ") {
                if let Some(from_idx) = rest.find(" from ") {
                    let name = rest[..from_idx].trim().trim_matches(|c| c == '{' || c == '}').trim().to_string();
                    let path = rest[from_idx + " from ".len()..]
                        .trim()
                        .trim_matches(|c| c == '\'' || c == '"' || c == ';')
                        .to_string();
                    imports.push(AstImport {
                        import_path: path,
                        imported_name: (!name.is_empty()).then_some(name),
                        is_default: false,
                    });
                }
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

/// Fixed authority/partition for every file — good enough for scenarios
/// that don't exercise authority weighting directly.
struct FixedClassifier;

impl PartitionClassifier for FixedClassifier {
    fn classify(&self, _file_path: &str) -> PartitionInfo {
        PartitionInfo {
            partition_id: "project".to_string(),
            authority_score: 1.0,
        }
    }
}

/// Term-overlap BM25 stand-in, shared via `Arc` so the test can query it
/// directly after indexing.
#[derive(Default)]
struct FakeLexicalIndex {
    documents: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl LexicalIndex for FakeLexicalIndex {
    async fn index_document(&self, id: &str, text: &str, _metadata: serde_json::Value) -> Result<(), ExternalError> {
        self.documents.lock().unwrap().insert(id.to_string(), text.to_string());
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<LexicalHit>, ExternalError> {
        let documents = self.documents.lock().unwrap();
        let query_terms: Vec<&str> = query.split_whitespace().collect();
        let mut hits: Vec<LexicalHit> = documents
            .iter()
            .filter_map(|(id, text)| {
                let score = query_terms.iter().filter(|t| text.contains(**t)).count() as f32;
                (score > 0.0).then_some(LexicalHit { id: id.clone(), score })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(k);
        Ok(hits)
    }
}

struct WholeTextChunker;

impl Chunker for WholeTextChunker {
    fn chunk(&self, text: &str, _file_path: &str, _language: Language, _config: ChunkConfig) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return vec![];
        }
        vec![Chunk {
            text: text.to_string(),
            chunk_index: 0,
            start_offset: 0,
            end_offset: text.chars().count() as u32,
            token_count: text.split_whitespace().count() as u32,
        }]
    }
}

#[derive(Default)]
struct FakeVectorStore {
    docs: Mutex<Vec<VectorDoc>>,
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn add_documents(&self, _collection: &str, docs: Vec<VectorDoc>) -> Result<(), ExternalError> {
        self.docs.lock().unwrap().extend(docs);
        Ok(())
    }

    async fn search_similar(&self, _collection: &str, _query: &str, _k: usize, _threshold: f32) -> Result<Vec<VectorHit>, ExternalError> {
        Ok(vec![])
    }
}

fn make_indexer(vector_store: Arc<dyn VectorStore>) -> (Indexer, Arc<FakeLexicalIndex>) {
    let store = IndexStore::open_in_memory().unwrap();
    let lexical = Arc::new(FakeLexicalIndex::default());
    let pipeline = EmbeddingPipeline::new(Arc::new(WholeTextChunker), vector_store);
    let indexer = Indexer::new(store, Arc::new(LineFixtureExtractor), Arc::new(FixedClassifier), lexical.clone(), pipeline);
    (indexer, lexical)
}

/// S1: a two-file repo where `b.ts` imports `foo` from `./a`, which `a.ts` exports.
#[tokio::test]
async fn s1_import_graph_links_exporter_and_importer() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "export function foo() { return 1 }").unwrap();
    std::fs::write(temp.path().join("b.ts"), "import { foo } from './a'").unwrap();

    let (mut indexer, _lexical) = make_indexer(Arc::new(FakeVectorStore::default()));
    let opts = IndexOptions { skip_embeddings: true, ..Default::default() };
    indexer.index_repository(temp.path(), &opts).await.unwrap();

    let engine = SearchEngine::new(indexer.store(), temp.path(), _lexical.as_ref(), None, 0.25);
    let results = engine.search_import_graph("a", 10).unwrap();
    assert_eq!(results[0].file_path, "b.ts");
    assert!(results[0].score >= 1.0);

    let analyzer = GraphAnalyzer::new(indexer.store());
    assert_eq!(analyzer.dependents("a").unwrap(), vec!["b.ts".to_string()]);
    let dependencies = analyzer.dependencies("b.ts").unwrap();
    assert!(dependencies.iter().any(|d| d.contains("a")));
}

/// S2: reindexing an untouched repository is a pure cache hit.
#[tokio::test]
async fn s2_reindex_with_no_changes_is_cache_hit() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "export function foo() { return 1 }").unwrap();
    std::fs::write(temp.path().join("b.ts"), "import { foo } from './a'").unwrap();

    let (mut indexer, _lexical) = make_indexer(Arc::new(FakeVectorStore::default()));
    let opts = IndexOptions { skip_embeddings: true, ..Default::default() };
    indexer.index_repository(temp.path(), &opts).await.unwrap();

    // Touch whitespace only — content hash is unchanged.
    std::fs::write(temp.path().join("a.ts"), "export function foo() { return 1 }\n").unwrap();
    let hash_before = indexer.store().file_hash("a.ts").unwrap();

    let stats = indexer.index_repository(temp.path(), &opts).await.unwrap();
    assert_eq!(stats.already_indexed, 2);
    assert_eq!(stats.needs_indexing, 0);
    assert_eq!(indexer.store().file_hash("a.ts").unwrap(), hash_before);
}

/// S3: renaming a symbol forces a reindex and the old name disappears.
#[tokio::test]
async fn s3_symbol_rename_triggers_reindex_and_keyword_search_finds_it() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "export function foo() { return 1 }").unwrap();

    let (mut indexer, lexical) = make_indexer(Arc::new(FakeVectorStore::default()));
    let opts = IndexOptions { skip_embeddings: true, ..Default::default() };
    indexer.index_repository(temp.path(), &opts).await.unwrap();

    std::fs::write(temp.path().join("a.ts"), "export function foo2() { return 1 }").unwrap();
    let stats = indexer.index_repository(temp.path(), &opts).await.unwrap();
    assert_eq!(stats.needs_indexing, 1);

    let symbols = indexer.store().symbols_for_file("a.ts").unwrap();
    assert!(!symbols.iter().any(|s| s.name == "foo"));
    assert!(symbols.iter().any(|s| s.name == "foo2"));

    let engine = SearchEngine::new(indexer.store(), temp.path(), lexical.as_ref(), None, 0.25);
    let results = engine.search_keyword("foo2", 5).await.unwrap();
    assert_eq!(results[0].file_path, "a.ts");
}

/// S4: semantic search with no vector store configured degrades to keyword
/// search and is honest about it in the metadata.
#[tokio::test]
async fn s4_semantic_search_without_vector_store_degrades_honestly() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.ts"), "export function returnAValue() { return 1 }").unwrap();

    let (mut indexer, lexical) = make_indexer(Arc::new(FakeVectorStore::default()));
    let opts = IndexOptions { skip_embeddings: true, ..Default::default() };
    indexer.index_repository(temp.path(), &opts).await.unwrap();

    let engine = SearchEngine::new(indexer.store(), temp.path(), lexical.as_ref(), None, 0.25);
    let results = engine.search_semantic("return a value", 5).await.unwrap();

    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.match_type, codegraph_core::search::MatchType::Keyword);
        assert_eq!(result.metadata["degraded"], serde_json::json!(true));
        assert!(result.metadata["fallback_reason"].as_str().unwrap_or("").len() > 0);
    }
}

/// S5: a three-file import cycle is detected with the expected member set and depth.
#[tokio::test]
async fn s5_three_file_cycle_detected() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("x.ts"), "import { z } from './y'").unwrap();
    std::fs::write(temp.path().join("y.ts"), "import { x } from './z'").unwrap();
    std::fs::write(temp.path().join("z.ts"), "import { y } from './x'").unwrap();

    let (mut indexer, _lexical) = make_indexer(Arc::new(FakeVectorStore::default()));
    let opts = IndexOptions { skip_embeddings: true, ..Default::default() };
    indexer.index_repository(temp.path(), &opts).await.unwrap();

    let analyzer = GraphAnalyzer::new(indexer.store());
    let cycles = analyzer.detect_cycles().unwrap();
    assert!(!cycles.is_empty());

    let cycle = &cycles[0];
    let mut members: Vec<String> = cycle.files.clone();
    members.sort();
    members.dedup();
    assert_eq!(members, vec!["x.ts".to_string(), "y.ts".to_string(), "z.ts".to_string()]);
    assert_eq!(cycle.depth, 3);
}

/// S6: documentation files skip AST extraction entirely — full body goes to
/// the intent stream and `fts5_documents`, nothing lands in the code stream.
#[tokio::test]
async fn s6_documentation_file_indexed_as_full_text() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("doc.md"), "How to configure the cache").unwrap();

    let (mut indexer, _lexical) = make_indexer(Arc::new(FakeVectorStore::default()));
    let opts = IndexOptions { skip_embeddings: true, ..Default::default() };
    indexer.index_repository(temp.path(), &opts).await.unwrap();

    assert_eq!(indexer.store().fts5_document_count("doc.md").unwrap(), 1);

    let pending = indexer.store().pending_embeddings().unwrap();
    let doc_row = pending.iter().find(|r| r.file_path == "doc.md").unwrap();
    assert_eq!(doc_row.embedding_text, "How to configure the cache");

    let bm25 = indexer.store().all_bm25_documents().unwrap();
    let doc_bm25 = bm25.iter().find(|(path, _)| path == "doc.md").unwrap();
    assert!(doc_bm25.1.trim().is_empty());
}
