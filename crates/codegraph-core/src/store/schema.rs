//! SQLite schema for the index store.
//!
//! One database per project, created under [`crate::paths::StoragePaths::db_path`].
//! DDL as `&str` constants, applied with `execute`/`execute_batch` rather
//! than a migration framework.

/// Bumped whenever a column or table changes shape. [`super::IndexStore::open`]
/// refuses to operate against a database stamped with a newer value, and
/// silently adopts an older one (no migration protocol is defined).
pub const SCHEMA_VERSION: i64 = 1;

pub const SCHEMA_CREATE_INDEXED_FILES: &str = r#"
CREATE TABLE IF NOT EXISTS indexed_files (
    file_path TEXT PRIMARY KEY NOT NULL,
    mtime_ms INTEGER NOT NULL,
    file_hash TEXT NOT NULL,
    language TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    symbol_count INTEGER NOT NULL,
    last_indexed_at_ms INTEGER NOT NULL,
    index_version INTEGER NOT NULL,
    partition_id TEXT NOT NULL,
    authority_score REAL NOT NULL
)
"#;

pub const SCHEMA_CREATE_SYMBOLS: &str = r#"
CREATE TABLE IF NOT EXISTS symbols (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    signature TEXT,
    location TEXT NOT NULL,
    parent_symbol TEXT,
    is_exported INTEGER NOT NULL
)
"#;

pub const SCHEMA_CREATE_IMPORTS: &str = r#"
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_file TEXT NOT NULL,
    import_path TEXT NOT NULL,
    imported_name TEXT,
    is_default INTEGER NOT NULL
)
"#;

pub const SCHEMA_CREATE_BM25_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS bm25_documents (
    file_path TEXT PRIMARY KEY NOT NULL,
    searchable_text TEXT NOT NULL,
    term_count INTEGER NOT NULL
)
"#;

pub const SCHEMA_CREATE_SEMANTIC_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS semantic_metadata (
    file_path TEXT PRIMARY KEY NOT NULL,
    embedding_text TEXT NOT NULL,
    embedding_stored INTEGER NOT NULL,
    total_chunks INTEGER
)
"#;

pub const SCHEMA_CREATE_SEMANTIC_CHUNKS: &str = r#"
CREATE TABLE IF NOT EXISTS semantic_chunks (
    chunk_id TEXT PRIMARY KEY NOT NULL,
    file_path TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    chunk_text TEXT NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    token_count INTEGER NOT NULL,
    embedding_stored INTEGER NOT NULL,
    vector_store_id TEXT
)
"#;

pub const SCHEMA_CREATE_FTS5_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS fts5_documents (
    file_path TEXT NOT NULL,
    content TEXT NOT NULL
)
"#;

pub const SCHEMA_CREATE_META: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

pub const SCHEMA_CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_symbols_file_path ON symbols(file_path);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_imports_source_file ON imports(source_file);
CREATE INDEX IF NOT EXISTS idx_imports_import_path ON imports(import_path);
CREATE INDEX IF NOT EXISTS idx_semantic_chunks_file_path ON semantic_chunks(file_path);
CREATE INDEX IF NOT EXISTS idx_fts5_documents_file_path ON fts5_documents(file_path);
"#;

pub const ALL_TABLE_DDL: &[&str] = &[
    SCHEMA_CREATE_INDEXED_FILES,
    SCHEMA_CREATE_SYMBOLS,
    SCHEMA_CREATE_IMPORTS,
    SCHEMA_CREATE_BM25_DOCUMENTS,
    SCHEMA_CREATE_SEMANTIC_METADATA,
    SCHEMA_CREATE_SEMANTIC_CHUNKS,
    SCHEMA_CREATE_FTS5_DOCUMENTS,
    SCHEMA_CREATE_META,
];

/// Tables `clear_index` truncates, in FK-safe order (none declared, but
/// children first keeps intent clear).
pub const OWNED_TABLES: &[&str] = &[
    "symbols",
    "imports",
    "bm25_documents",
    "semantic_metadata",
    "semantic_chunks",
    "fts5_documents",
    "indexed_files",
];
