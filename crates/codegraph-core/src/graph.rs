//! Import-graph queries: reverse dependency lookup, forward dependency
//! lookup, cycle detection, and bounded-depth impact analysis.
//!
//! No pointer graph is materialized between calls — each query rebuilds a
//! `HashMap<FilePath, Vec<FilePath>>` from `imports` on demand, keeping
//! cyclic references relational rather than a set of live pointers.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::CoreError;
use crate::store::IndexStore;

/// A cycle found by `detect_cycles`: the closed walk of files plus its
/// length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub files: Vec<String>,
    pub depth: usize,
}

/// One file reached by `impact_analysis`, with its BFS distance and the
/// path taken from the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactedFile {
    pub file_path: String,
    pub distance: usize,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unseen,
    InProgress,
    Done,
}

pub struct GraphAnalyzer<'a> {
    store: &'a IndexStore,
}

impl<'a> GraphAnalyzer<'a> {
    pub fn new(store: &'a IndexStore) -> Self {
        Self { store }
    }

    /// Files whose `import_path` contains `file` as a substring — a
    /// deliberate approximation, since specifiers are rarely absolute paths.
    pub fn dependents(&self, file: &str) -> Result<Vec<String>, CoreError> {
        let mut files: Vec<String> = self
            .store
            .imports_matching(file)?
            .into_iter()
            .map(|i| i.source_file)
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Distinct import specifiers written by `file`.
    pub fn dependencies(&self, file: &str) -> Result<Vec<String>, CoreError> {
        let mut paths: Vec<String> = self
            .store
            .imports_from(file)?
            .into_iter()
            .map(|i| i.import_path)
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// DFS over local files with a recursion-stack set; a cycle is reported
    /// whenever an edge targets a node currently `InProgress`.
    pub fn detect_cycles(&self) -> Result<Vec<Cycle>, CoreError> {
        let adjacency = self.build_local_adjacency()?;
        let mut state: HashMap<String, VisitState> = adjacency.keys().map(|f| (f.clone(), VisitState::Unseen)).collect();
        let mut cycles = Vec::new();

        let mut files: Vec<&String> = adjacency.keys().collect();
        files.sort();

        for file in files {
            if state.get(file) == Some(&VisitState::Unseen) {
                let mut stack = Vec::new();
                self.dfs_visit(file, &adjacency, &mut state, &mut stack, &mut cycles);
            }
        }

        Ok(cycles)
    }

    fn dfs_visit(
        &self,
        node: &str,
        adjacency: &HashMap<String, Vec<String>>,
        state: &mut HashMap<String, VisitState>,
        stack: &mut Vec<String>,
        cycles: &mut Vec<Cycle>,
    ) {
        state.insert(node.to_string(), VisitState::InProgress);
        stack.push(node.to_string());

        if let Some(neighbors) = adjacency.get(node) {
            let mut neighbors = neighbors.clone();
            neighbors.sort();
            for neighbor in neighbors {
                match state.get(&neighbor) {
                    Some(VisitState::InProgress) => {
                        let start = stack.iter().position(|f| f == &neighbor).unwrap_or(0);
                        let mut files: Vec<String> = stack[start..].to_vec();
                        files.push(neighbor.clone());
                        cycles.push(Cycle {
                            depth: files.len() - 1,
                            files,
                        });
                    }
                    Some(VisitState::Unseen) | None => {
                        if state.contains_key(&neighbor) {
                            self.dfs_visit(&neighbor, adjacency, state, stack, cycles);
                        }
                    }
                    Some(VisitState::Done) => {}
                }
            }
        }

        stack.pop();
        state.insert(node.to_string(), VisitState::Done);
    }

    /// BFS over reverse-dependency edges capped at `max_depth`.
    pub fn impact_analysis(&self, file: &str, max_depth: usize) -> Result<Vec<ImpactedFile>, CoreError> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(file.to_string());

        let mut queue: VecDeque<(String, usize, Vec<String>)> = VecDeque::new();
        queue.push_back((file.to_string(), 0, vec![file.to_string()]));

        let mut impacted = Vec::new();

        while let Some((current, distance, path)) = queue.pop_front() {
            if distance >= max_depth {
                continue;
            }
            let mut next = self.dependents(&current)?;
            next.sort();
            for dependent in next {
                if visited.contains(&dependent) {
                    continue;
                }
                visited.insert(dependent.clone());
                let mut next_path = path.clone();
                next_path.push(dependent.clone());
                impacted.push(ImpactedFile {
                    file_path: dependent.clone(),
                    distance: distance + 1,
                    path: next_path.clone(),
                });
                queue.push_back((dependent, distance + 1, next_path));
            }
        }

        Ok(impacted)
    }

    /// Build `source_file -> [target local files]`, skipping external
    /// specifiers (node_modules-style segments or `@scope/...`).
    fn build_local_adjacency(&self) -> Result<HashMap<String, Vec<String>>, CoreError> {
        let local_files: HashSet<String> = self.store.all_file_paths()?.into_iter().collect();
        let mut adjacency: HashMap<String, Vec<String>> = local_files.iter().map(|f| (f.clone(), Vec::new())).collect();

        for import in self.store.all_imports()? {
            if is_external_specifier(&import.import_path) {
                continue;
            }
            if let Some(target) = local_files.iter().find(|f| f.contains(import.import_path.trim_start_matches("./"))) {
                adjacency.entry(import.source_file).or_default().push(target.clone());
            }
        }

        Ok(adjacency)
    }
}

fn is_external_specifier(import_path: &str) -> bool {
    import_path.starts_with('@') || import_path.contains("node_modules")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImportRow;
    use crate::store::FileRecord;

    fn seed(store: &mut IndexStore, file_path: &str, imports: &[&str]) {
        let rec = FileRecord {
            file_path: file_path.to_string(),
            mtime_ms: 0,
            file_hash: file_path.to_string(),
            language: "ts".to_string(),
            size_bytes: 1,
            symbols: vec![],
            imports: imports
                .iter()
                .map(|p| ImportRow {
                    source_file: file_path.to_string(),
                    import_path: p.to_string(),
                    imported_name: None,
                    is_default: false,
                })
                .collect(),
            searchable_text: String::new(),
            embedding_text: String::new(),
            partition_id: "project".to_string(),
            authority_score: 0.5,
            index_fulltext: false,
        };
        store.persist_file(&rec).unwrap();
    }

    #[test]
    fn dependents_and_dependencies() {
        let mut store = IndexStore::open_in_memory().unwrap();
        seed(&mut store, "a.ts", &[]);
        seed(&mut store, "b.ts", &["./a"]);

        let analyzer = GraphAnalyzer::new(&store);
        assert_eq!(analyzer.dependents("a.ts").unwrap(), vec!["b.ts".to_string()]);
        assert_eq!(analyzer.dependencies("b.ts").unwrap(), vec!["./a".to_string()]);
    }

    #[test]
    fn detects_three_file_cycle() {
        let mut store = IndexStore::open_in_memory().unwrap();
        seed(&mut store, "x.ts", &["./y"]);
        seed(&mut store, "y.ts", &["./z"]);
        seed(&mut store, "z.ts", &["./x"]);

        let analyzer = GraphAnalyzer::new(&store);
        let cycles = analyzer.detect_cycles().unwrap();

        assert!(!cycles.is_empty());
        let found = &cycles[0];
        let mut files_set: Vec<String> = found.files.clone();
        files_set.sort();
        files_set.dedup();
        assert_eq!(files_set, vec!["x.ts".to_string(), "y.ts".to_string(), "z.ts".to_string()]);
        assert_eq!(found.depth, 3);
    }

    #[test]
    fn impact_analysis_respects_max_depth() {
        let mut store = IndexStore::open_in_memory().unwrap();
        seed(&mut store, "a.ts", &[]);
        seed(&mut store, "b.ts", &["./a"]);
        seed(&mut store, "c.ts", &["./b"]);

        let analyzer = GraphAnalyzer::new(&store);
        let impacted = analyzer.impact_analysis("a.ts", 1).unwrap();

        assert_eq!(impacted.len(), 1);
        assert_eq!(impacted[0].file_path, "b.ts");
    }
}
