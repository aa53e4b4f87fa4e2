//! `codegraph search keyword|semantic|imports <query> [--limit N]`

use anyhow::Result;
use clap::Subcommand;
use codegraph_core::{SearchEngine, SearchResult};

use crate::commands::CliContext;
use crate::GlobalOptions;

#[derive(Subcommand, Debug)]
pub enum SearchCommand {
    /// BM25 keyword search, weighted by authority score.
    Keyword {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Vector similarity search, degrading to keyword search when
    /// unavailable.
    Semantic {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Files importing a module (substring match).
    Imports {
        module: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub async fn execute(cmd: SearchCommand, global: &GlobalOptions) -> Result<()> {
    let context = CliContext::bootstrap(global)?;
    let engine = SearchEngine::new(
        &context.store,
        context.workspace_root.as_path(),
        &context.lexical_index,
        Some(&context.vector_store),
        context.config.search.similarity_threshold,
    );

    let results = match cmd {
        SearchCommand::Keyword { query, limit } => engine.search_keyword(&query, limit).await?,
        SearchCommand::Semantic { query, limit } => engine.search_semantic(&query, limit).await?,
        SearchCommand::Imports { module, limit } => engine.search_import_graph(&module, limit)?,
    };

    print_results(&results);
    Ok(())
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("no matches");
        return;
    }

    for result in results {
        println!("{}  score={:.3}  type={}", result.file_path, result.score, result.match_type.as_str());
        if let Some(snippet) = &result.snippet {
            println!("    {}", snippet.replace('\n', " "));
        }
        if !result.symbols.is_empty() {
            let names: Vec<&str> = result.symbols.iter().map(|s| s.name.as_str()).collect();
            println!("    symbols: {}", names.join(", "));
        }
        if result.metadata.get("degraded").is_some() {
            println!("    (degraded: {})", result.metadata.get("fallback_reason").and_then(|v| v.as_str()).unwrap_or(""));
        }
    }
}
