//! Keyword, semantic, and import-graph search over the committed index
//! state. Read-only: `SearchEngine` never mutates `IndexStore`.
//!
//! A driver that queries an external lexical/vector backend, hydrates
//! results with richer local metadata, and re-ranks before truncating to
//! the caller's limit. Never mislabels a degraded fallback result as
//! semantic.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::warn;

use crate::error::CoreError;
use crate::external::{LexicalIndex, VectorStore};
use crate::model::SymbolRow;
use crate::store::IndexStore;

const SNIPPET_LEN: usize = 200;
const CANDIDATE_MULTIPLIER: usize = 3;
const DEFAULT_AUTHORITY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Keyword,
    Semantic,
    Import,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Keyword => "keyword",
            MatchType::Semantic => "semantic",
            MatchType::Import => "import",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub file_path: String,
    pub score: f32,
    pub match_type: MatchType,
    pub symbols: Vec<SymbolRow>,
    pub snippet: Option<String>,
    pub metadata: Value,
}

pub struct SearchEngine<'a> {
    store: &'a IndexStore,
    project_root: PathBuf,
    lexical_index: &'a dyn LexicalIndex,
    vector_store: Option<&'a dyn VectorStore>,
    similarity_threshold: f32,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        store: &'a IndexStore,
        project_root: impl Into<PathBuf>,
        lexical_index: &'a dyn LexicalIndex,
        vector_store: Option<&'a dyn VectorStore>,
        similarity_threshold: f32,
    ) -> Self {
        Self {
            store,
            project_root: project_root.into(),
            lexical_index,
            vector_store,
            similarity_threshold,
        }
    }

    /// BM25 search with authority weighting. Stale entries (file deleted on
    /// disk since indexing) are silently dropped from results.
    pub async fn search_keyword(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, CoreError> {
        let hits = self
            .lexical_index
            .search(query, limit * CANDIDATE_MULTIPLIER)
            .await
            .map_err(CoreError::from)?;

        let mut results = Vec::new();
        for hit in hits {
            let file_path = hit.id;
            if !self.project_root.join(&file_path).exists() {
                continue;
            }

            let authority = self.store.authority_score(&file_path)?;
            let authority_score = authority.as_ref().map(|(a, _)| *a).unwrap_or(DEFAULT_AUTHORITY);
            let partition = authority.map(|(_, p)| p);

            let symbols = self.store.symbols_for_file(&file_path)?;
            let snippet = self.read_snippet(&file_path);
            let final_score = hit.score * authority_score;

            results.push(SearchResult {
                file_path,
                score: final_score,
                match_type: MatchType::Keyword,
                symbols,
                snippet,
                metadata: json!({
                    "original_score": hit.score,
                    "authority_score": authority_score,
                    "partition": partition,
                }),
            });
        }

        sort_results(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    /// Vector similarity search, degrading to keyword search when the
    /// vector store is absent or fails. Degraded results keep
    /// `match_type == Keyword` and carry `metadata.degraded = true` — the
    /// core never relabels a fallback as semantic.
    pub async fn search_semantic(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, CoreError> {
        let Some(vector_store) = self.vector_store else {
            return self
                .degrade_to_keyword(query, limit, "vector store unavailable")
                .await;
        };

        let hits = match vector_store
            .search_similar("codegraph", query, limit * CANDIDATE_MULTIPLIER, self.similarity_threshold)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector store search failed, degrading to keyword");
                return self
                    .degrade_to_keyword(query, limit, &format!("vector store error: {e}"))
                    .await;
            }
        };

        let mut results = Vec::new();
        for hit in hits {
            let file_path = extract_file_path(&hit.metadata).unwrap_or(hit.id.clone());
            if !self.project_root.join(&file_path).exists() {
                continue;
            }

            let authority = self.store.authority_score(&file_path)?;
            let authority_score = authority.as_ref().map(|(a, _)| *a).unwrap_or(DEFAULT_AUTHORITY);

            let symbols = self.store.symbols_for_file(&file_path)?;
            let snippet = hit.content.chars().take(SNIPPET_LEN).collect::<String>();
            let final_score = hit.score * authority_score;

            let mut metadata = hit.metadata.clone();
            if let Value::Object(map) = &mut metadata {
                map.insert("actual_search_mode".to_string(), json!("semantic"));
                map.insert("authority_score".to_string(), json!(authority_score));
            }

            results.push(SearchResult {
                file_path,
                score: final_score,
                match_type: MatchType::Semantic,
                symbols,
                snippet: Some(snippet),
                metadata,
            });
        }

        sort_results(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    async fn degrade_to_keyword(&self, query: &str, limit: usize, reason: &str) -> Result<Vec<SearchResult>, CoreError> {
        let mut results = self.search_keyword(query, limit).await?;
        for result in &mut results {
            if let Value::Object(map) = &mut result.metadata {
                map.insert("degraded".to_string(), json!(true));
                map.insert("fallback_reason".to_string(), json!(reason));
                map.insert("actual_search_mode".to_string(), json!("bm25"));
            }
        }
        Ok(results)
    }

    /// Groups `imports` by `source_file` whose `import_path` contains
    /// `module_path` as a substring, scoring by distinct import count.
    pub fn search_import_graph(&self, module_path: &str, limit: usize) -> Result<Vec<SearchResult>, CoreError> {
        let matches = self.store.imports_matching(module_path)?;

        let mut by_file: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();
        for import in matches {
            by_file.entry(import.source_file).or_default().push(import.import_path);
        }

        let mut results = Vec::new();
        for (file_path, mut import_paths) in by_file {
            import_paths.sort();
            import_paths.dedup();
            let score = import_paths.len() as f32;
            let symbols = self.store.symbols_for_file(&file_path)?;
            let snippet = format!("Imports: {}", import_paths.join(", "));

            results.push(SearchResult {
                file_path,
                score,
                match_type: MatchType::Import,
                symbols,
                snippet: Some(snippet),
                metadata: json!({ "import_count": import_paths.len() }),
            });
        }

        sort_results(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    fn read_snippet(&self, file_path: &str) -> Option<String> {
        let abs = self.project_root.join(file_path);
        read_excerpt(&abs, SNIPPET_LEN)
    }
}

fn read_excerpt(path: &Path, max_len: usize) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    Some(contents.chars().take(max_len).collect())
}

fn extract_file_path(metadata: &Value) -> Option<String> {
    metadata.get("file_path").and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Stable, total order: `(final_score desc, file_path asc)`.
fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
}
