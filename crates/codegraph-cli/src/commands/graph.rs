//! `codegraph graph dependents|dependencies|cycles|impact <file>`

use anyhow::Result;
use clap::Subcommand;
use codegraph_core::graph::GraphAnalyzer;

use crate::commands::CliContext;
use crate::GlobalOptions;

#[derive(Subcommand, Debug)]
pub enum GraphCommand {
    /// Files that import `file` (reverse dependencies).
    Dependents { file: String },
    /// Modules `file` imports (forward dependencies).
    Dependencies { file: String },
    /// All import cycles in the indexed project.
    Cycles,
    /// Files transitively affected by a change to `file`.
    Impact {
        file: String,
        #[arg(long, default_value_t = 5)]
        max_depth: usize,
    },
}

pub async fn execute(cmd: GraphCommand, global: &GlobalOptions) -> Result<()> {
    let context = CliContext::bootstrap(global)?;
    let analyzer = GraphAnalyzer::new(&context.store);

    match cmd {
        GraphCommand::Dependents { file } => {
            for dependent in analyzer.dependents(&file)? {
                println!("{dependent}");
            }
        }
        GraphCommand::Dependencies { file } => {
            for dependency in analyzer.dependencies(&file)? {
                println!("{dependency}");
            }
        }
        GraphCommand::Cycles => {
            let cycles = analyzer.detect_cycles()?;
            if cycles.is_empty() {
                println!("no cycles found");
            }
            for cycle in cycles {
                println!("cycle (depth {}): {}", cycle.depth, cycle.files.join(" -> "));
            }
        }
        GraphCommand::Impact { file, max_depth } => {
            let impacted = analyzer.impact_analysis(&file, max_depth)?;
            if impacted.is_empty() {
                println!("no impacted files within depth {max_depth}");
            }
            for item in impacted {
                println!("{} (distance {}): {}", item.file_path, item.distance, item.path.join(" -> "));
            }
        }
    }

    Ok(())
}
