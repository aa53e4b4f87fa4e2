//! Knobs for one `Indexer.index_repository` run. Plain data, passed
//! explicitly rather than read from a global.

/// Options for a single indexing run.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Explicit file list. When set, `Indexer` uses explicit mode and
    /// `ignore_patterns` is ignored.
    pub files: Option<Vec<String>>,
    /// Glob-style ignore patterns applied in discovery mode.
    pub ignore_patterns: Vec<String>,
    /// Skip `EmbeddingPipeline.generate_pending()` after the file loop.
    pub skip_embeddings: bool,
    pub debug: bool,
    pub chunk_target_tokens: u32,
    pub chunk_overlap_fraction: f32,
    pub chunk_hard_limit: u32,
    pub embedding_batch_size: usize,
    pub file_batch_size: usize,
    pub min_file_size: u64,
    pub max_file_size: u64,
    pub similarity_threshold: f32,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            files: None,
            ignore_patterns: Vec::new(),
            skip_embeddings: false,
            debug: false,
            chunk_target_tokens: 28_800,
            chunk_overlap_fraction: 0.10,
            chunk_hard_limit: 32_000,
            embedding_batch_size: 20,
            file_batch_size: 50,
            min_file_size: 10,
            max_file_size: 1_048_576,
            similarity_threshold: 0.25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_knobs() {
        let opts = IndexOptions::default();
        assert_eq!(opts.embedding_batch_size, 20);
        assert_eq!(opts.file_batch_size, 50);
        assert_eq!(opts.min_file_size, 10);
        assert_eq!(opts.max_file_size, 1_048_576);
        assert!((opts.similarity_threshold - 0.25).abs() < f32::EPSILON);
    }
}
