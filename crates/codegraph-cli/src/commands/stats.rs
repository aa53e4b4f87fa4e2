//! `codegraph stats` / `codegraph clear`

use anyhow::Result;

use crate::commands::CliContext;
use crate::GlobalOptions;

pub async fn execute_stats(global: &GlobalOptions) -> Result<()> {
    let context = CliContext::bootstrap(global)?;
    let stats = context.store.stats()?;

    println!("total files: {}", stats.total_files);
    println!("files with embeddings: {}", stats.files_with_embeddings);
    println!("total symbols: {}", stats.total_symbols);
    println!("total imports: {}", stats.total_imports);
    if let Some(last_indexed_at_ms) = stats.last_indexed_at_ms {
        println!("last indexed at (ms since epoch): {last_indexed_at_ms}");
    }
    if !stats.languages.is_empty() {
        println!("languages:");
        for (language, count) in &stats.languages {
            println!("  {language}: {count}");
        }
    }

    Ok(())
}

pub async fn execute_clear(global: &GlobalOptions) -> Result<()> {
    let mut context = CliContext::bootstrap(global)?;
    context.store.clear_index()?;
    println!("index cleared for {}", context.workspace_root.display());
    Ok(())
}
