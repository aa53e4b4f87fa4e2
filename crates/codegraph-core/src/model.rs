//! Shared value types: languages, symbols, imports, and the AST extraction
//! contract produced by the external [`crate::external::AstExtractor`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A detected source language, or a documentation format.
///
/// Detection is purely extension-based; there is no content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    C,
    Cpp,
    CSharp,
    Java,
    /// Documentation files (markdown, restructured text, plain text docs).
    /// `ContentExtractor` skips AST extraction entirely for this variant.
    Markdown,
    /// Anything indexable that doesn't fit a known bucket.
    Other,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Java => "java",
            Language::Markdown => "markdown",
            Language::Other => "other",
        }
    }

    /// Detect a language (or documentation format) from a file extension.
    /// Returns `None` if the extension is not part of the indexable set.
    pub fn from_extension(ext: &str) -> Option<Self> {
        extension_map().get(ext.to_lowercase().as_str()).copied()
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// True for documentation formats, where `ContentExtractor` takes the
    /// full-text path instead of invoking `AstExtractor`.
    pub fn is_documentation(&self) -> bool {
        matches!(self, Language::Markdown)
    }
}

fn extension_map() -> &'static HashMap<&'static str, Language> {
    use std::sync::OnceLock;
    static MAP: OnceLock<HashMap<&'static str, Language>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("py", Language::Python),
            ("js", Language::JavaScript),
            ("jsx", Language::JavaScript),
            ("mjs", Language::JavaScript),
            ("ts", Language::TypeScript),
            ("tsx", Language::TypeScript),
            ("rs", Language::Rust),
            ("go", Language::Go),
            ("c", Language::C),
            ("h", Language::C),
            ("cpp", Language::Cpp),
            ("cc", Language::Cpp),
            ("hpp", Language::Cpp),
            ("cs", Language::CSharp),
            ("java", Language::Java),
            ("md", Language::Markdown),
            ("mdx", Language::Markdown),
            ("rst", Language::Markdown),
        ])
    })
}

/// The indexable extension set, expanded to globs by `FileDiscovery` in
/// discovery mode.
pub const INDEXABLE_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "mjs", "ts", "tsx", "rs", "go", "c", "h", "cpp", "cc", "hpp", "cs", "java",
    "md", "mdx", "rst",
];

/// Symbol kind, mirroring `symbols.type` in the schema. Kept as an enum in
/// memory and serialized to/from the small set of strings the schema
/// stores — exhaustive matching in Rust, a narrow string column in SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Variable,
    Interface,
    Type,
    Enum,
    Other,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "function" => SymbolKind::Function,
            "class" => SymbolKind::Class,
            "method" => SymbolKind::Method,
            "variable" => SymbolKind::Variable,
            "interface" => SymbolKind::Interface,
            "type" => SymbolKind::Type,
            "enum" => SymbolKind::Enum,
            _ => SymbolKind::Other,
        }
    }

    /// Container kinds can hold other symbols as `parent_symbol`.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum
        )
    }
}

/// A 1-based source span, rendered to the compact `"l1:c1-l2:c2"` string
/// the schema stores in `symbols.location`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl Span {
    pub fn to_location_string(&self) -> String {
        format!(
            "{}:{}-{}:{}",
            self.start_row, self.start_col, self.end_row, self.end_col
        )
    }
}

/// A symbol as produced by `AstExtractor`, before flattening for storage.
/// Hierarchical: a class's methods appear as `children`.
#[derive(Debug, Clone)]
pub struct AstSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub signature: Option<String>,
    pub span: Option<Span>,
    /// Raw source text of the symbol body, used to build the code stream.
    pub body_text: Option<String>,
    pub children: Vec<AstSymbol>,
}

/// An import edge as produced by `AstExtractor`.
#[derive(Debug, Clone)]
pub struct AstImport {
    pub import_path: String,
    pub imported_name: Option<String>,
    pub is_default: bool,
}

/// The full extraction result for one non-documentation file.
#[derive(Debug, Clone, Default)]
pub struct AstExtraction {
    pub symbols: Vec<AstSymbol>,
    pub imports: Vec<AstImport>,
    /// Names exported by the module/file, used to stamp `is_exported`.
    pub exports: Vec<String>,
    pub language: Language,
}

impl Default for Language {
    fn default() -> Self {
        Language::Other
    }
}

/// A flattened symbol row, as persisted in `symbols`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRow {
    pub file_path: String,
    pub name: String,
    pub kind: SymbolKind,
    pub signature: Option<String>,
    pub location: String,
    pub parent_symbol: Option<String>,
    pub is_exported: bool,
}

/// A flattened import row, as persisted in `imports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub source_file: String,
    pub import_path: String,
    pub imported_name: Option<String>,
    pub is_default: bool,
}

/// Depth-first flatten of a symbol tree into storage rows. Children carry
/// their enclosing container's `name` as `parent_symbol`.
pub fn flatten_symbols(file_path: &str, symbols: &[AstSymbol], exported: &[String]) -> Vec<SymbolRow> {
    let mut rows = Vec::new();
    for sym in symbols {
        flatten_one(file_path, sym, None, exported, &mut rows);
    }
    rows
}

fn flatten_one(
    file_path: &str,
    sym: &AstSymbol,
    parent: Option<&str>,
    exported: &[String],
    out: &mut Vec<SymbolRow>,
) {
    let location = sym
        .span
        .map(|s| s.to_location_string())
        .unwrap_or_else(|| "0:0-0:0".to_string());

    out.push(SymbolRow {
        file_path: file_path.to_string(),
        name: sym.name.clone(),
        kind: sym.kind,
        signature: sym.signature.clone(),
        location,
        parent_symbol: parent.map(|p| p.to_string()),
        is_exported: exported.iter().any(|e| e == &sym.name),
    });

    for child in &sym.children {
        flatten_one(file_path, child, Some(&sym.name), exported, out);
    }
}
