//! `codegraph index <root> [--ignore PAT]... [--skip-embeddings]`
//!
//! `--skip-embeddings` is the global flag declared on [`crate::GlobalOptions`];
//! this subcommand reads it through `config.embedding.skip_embeddings` rather
//! than redeclaring it, since a subcommand-local flag with the same long name
//! would collide with the global one.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use codegraph_core::{IndexOptions, Indexer};

use crate::adapters::{PathHeuristicClassifier, RegexAstExtractor, WordChunker};
use crate::commands::CliContext;
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory to index. Defaults to the workspace root.
    pub root: Option<PathBuf>,

    /// Extra glob patterns to exclude, on top of the configured defaults.
    #[arg(long = "ignore")]
    pub ignore: Vec<String>,

    /// Index exactly these files (relative to root) instead of discovering them.
    #[arg(long)]
    pub files: Vec<String>,
}

pub async fn execute(args: IndexArgs, global: &GlobalOptions) -> Result<()> {
    let mut global = global.clone();
    if let Some(root) = &args.root {
        global.workspace = Some(root.clone());
    }

    let context = CliContext::bootstrap(&global)?;
    let CliContext {
        workspace_root,
        config,
        store,
        lexical_index,
        vector_store,
    } = context;

    let pipeline = codegraph_core::pipeline::EmbeddingPipeline::new(
        Arc::new(WordChunker),
        Arc::new(vector_store),
    );
    let mut indexer = Indexer::new(
        store,
        Arc::new(RegexAstExtractor),
        Arc::new(PathHeuristicClassifier),
        Arc::new(lexical_index),
        pipeline,
    );

    let opts = IndexOptions {
        files: (!args.files.is_empty()).then_some(args.files),
        ignore_patterns: args.ignore,
        skip_embeddings: config.embedding.skip_embeddings,
        file_batch_size: config.indexing.file_batch_size,
        min_file_size: config.indexing.min_file_size,
        max_file_size: config.indexing.max_file_size,
        embedding_batch_size: config.embedding.embedding_batch_size,
        chunk_target_tokens: config.embedding.chunk_target_tokens,
        chunk_overlap_fraction: config.embedding.chunk_overlap_fraction,
        chunk_hard_limit: config.embedding.chunk_hard_limit,
        similarity_threshold: config.search.similarity_threshold,
        ..Default::default()
    };

    let stats = indexer.index_repository(&workspace_root, &opts).await?;

    println!("indexed {} files ({} new, {} unchanged, {} skipped)", stats.total, stats.indexed, stats.already_indexed, stats.skipped);
    println!("symbols extracted: {}", stats.total_symbols);
    println!("files embedded: {}", stats.files_with_embeddings);
    println!("elapsed: {}ms", stats.elapsed_ms);

    if !stats.languages_histogram.is_empty() {
        let mut languages: Vec<(&String, &usize)> = stats.languages_histogram.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        println!("languages:");
        for (language, count) in languages {
            println!("  {language}: {count}");
        }
    }

    if !stats.errors.is_empty() {
        eprintln!("{} file(s) failed:", stats.errors.len());
        for error in &stats.errors {
            eprintln!("  {error}");
        }
    }

    Ok(())
}
