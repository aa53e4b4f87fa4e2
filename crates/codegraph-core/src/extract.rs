//! Splits a file's content into the two streams the rest of the pipeline
//! keeps separate: a code stream (identifiers, bodies, import specifiers —
//! the lexical domain) and an intent stream (doc comments, annotated
//! comments, leading comments — the semantic domain).
//!
//! Prose never enters the lexical index; code never enters the semantic
//! index. Implemented as pure text transforms over an `AstExtraction` the
//! external `AstExtractor` produced.

use std::sync::OnceLock;

use regex::Regex;

use crate::external::{AstExtractor, ExternalError};
use crate::model::{AstExtraction, AstImport, AstSymbol, Language};

/// The two streams plus the raw AST data `Indexer` needs for symbol/import
/// persistence.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub code_stream: String,
    pub intent_stream: String,
    pub language: Language,
    pub symbols: Vec<AstSymbol>,
    pub imports: Vec<AstImport>,
    pub exports: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract both streams for `file_path`. Documentation files skip AST
    /// extraction entirely: `code_stream` is empty, `intent_stream` is the
    /// full trimmed file body.
    pub fn extract(
        &self,
        ast_extractor: &dyn AstExtractor,
        file_path: &str,
        contents: &str,
        language: Language,
    ) -> Result<ExtractedContent, ExternalError> {
        if language.is_documentation() {
            return Ok(ExtractedContent {
                code_stream: String::new(),
                intent_stream: contents.trim().to_string(),
                language,
                symbols: Vec::new(),
                imports: Vec::new(),
                exports: Vec::new(),
            });
        }

        let ast = ast_extractor.extract(file_path, contents, language)?;
        let code_stream = build_code_stream(&ast);
        let intent_stream = build_intent_stream(contents);

        Ok(ExtractedContent {
            code_stream,
            intent_stream,
            language: ast.language,
            symbols: ast.symbols,
            imports: ast.imports,
            exports: ast.exports,
        })
    }
}

/// Whitespace-joined concatenation of symbol names, symbol bodies, and
/// import specifiers across the whole extraction tree.
fn build_code_stream(ast: &AstExtraction) -> String {
    let mut parts = Vec::new();
    for symbol in &ast.symbols {
        collect_symbol_tokens(symbol, &mut parts);
    }
    for import in &ast.imports {
        parts.push(import.import_path.clone());
        if let Some(name) = &import.imported_name {
            parts.push(name.clone());
        }
    }
    parts.join(" ")
}

fn collect_symbol_tokens(symbol: &AstSymbol, out: &mut Vec<String>) {
    out.push(symbol.name.clone());
    if let Some(body) = &symbol.body_text {
        out.push(body.clone());
    }
    for child in &symbol.children {
        collect_symbol_tokens(child, out);
    }
}

/// Line-separated concatenation of block doc comments, TODO/FIXME/NOTE/HACK
/// line comments, and the first ten leading comment lines.
fn build_intent_stream(contents: &str) -> String {
    let mut lines = Vec::new();

    for m in doc_block_regex().find_iter(contents) {
        lines.push(m.as_str().trim().to_string());
    }

    for line in contents.lines() {
        let trimmed = line.trim();
        if annotated_comment_regex().is_match(trimmed) {
            lines.push(trimmed.to_string());
        }
    }

    let mut leading_count = 0;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !is_comment_line(trimmed) {
            break;
        }
        lines.push(trimmed.to_string());
        leading_count += 1;
        if leading_count >= 10 {
            break;
        }
    }

    lines.join("\n")
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with("//") || line.starts_with('#') || line.starts_with("/*") || line.starts_with('*')
}

fn doc_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)/\*.*?\*/|""".*?"""|'''.*?'''"#).expect("valid doc-block regex")
    })
}

fn annotated_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(//|#)\s*(TODO|FIXME|NOTE|HACK)\b").expect("valid annotated-comment regex")
    })
}
