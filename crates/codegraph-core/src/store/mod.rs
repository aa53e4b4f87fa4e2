//! The relational index store: schema ownership and atomic per-file writes.
//!
//! `IndexStore` is the sole mutator of `indexed_files`, `symbols`, `imports`,
//! `bm25_documents`, `semantic_metadata`, `semantic_chunks`, and
//! `fts5_documents`. Every other component reads through it.
//!
//! A thin wrapper around a single `rusqlite::Connection`: WAL-mode pragmas
//! on open, one transaction per multi-statement write, `query_row`/
//! `query_map` for reads.

pub mod schema;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{ImportRow, SymbolKind, SymbolRow};

/// Everything `persist_file` needs to commit one file's update atomically.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub file_path: String,
    pub mtime_ms: i64,
    pub file_hash: String,
    pub language: String,
    pub size_bytes: i64,
    pub symbols: Vec<SymbolRow>,
    pub imports: Vec<ImportRow>,
    pub searchable_text: String,
    pub embedding_text: String,
    pub partition_id: String,
    pub authority_score: f32,
    /// Whether `fts5_documents` should carry a row for this file (documentation
    /// files with non-empty content only).
    pub index_fulltext: bool,
}

/// Aggregate counts returned by `stats()`.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_files: u64,
    pub files_with_embeddings: u64,
    pub total_symbols: u64,
    pub total_imports: u64,
    pub languages: Vec<(String, u64)>,
    pub last_indexed_at_ms: Option<i64>,
}

/// One row from `semantic_metadata` pending an embedding, joined with its
/// file's partition/authority for the batch submitted to the vector store.
#[derive(Debug, Clone)]
pub struct PendingEmbeddingRow {
    pub file_path: String,
    pub embedding_text: String,
    pub language: String,
    pub partition_id: String,
    pub authority_score: f32,
}

/// One already-embedded chunk, as read back by [`IndexStore::all_embedded_chunks`].
#[derive(Debug, Clone)]
pub struct EmbeddedChunkRow {
    pub chunk_id: String,
    pub file_path: String,
    pub chunk_text: String,
    pub partition_id: String,
    pub authority_score: f32,
}

/// Owns the SQLite connection backing one project's index.
pub struct IndexStore {
    conn: Connection,
}

impl IndexStore {
    /// Open (creating if absent) the database at `db_path`, applying schema
    /// DDL and refusing to proceed against a newer, unknown schema version.
    pub fn open(db_path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;

        for ddl in schema::ALL_TABLE_DDL {
            conn.execute(ddl, [])?;
        }
        conn.execute_batch(schema::SCHEMA_CREATE_INDEXES)?;

        let store = Self { conn };
        store.check_or_stamp_schema_version()?;
        Ok(store)
    }

    /// Open an in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;

        for ddl in schema::ALL_TABLE_DDL {
            conn.execute(ddl, [])?;
        }
        conn.execute_batch(schema::SCHEMA_CREATE_INDEXES)?;

        let store = Self { conn };
        store.check_or_stamp_schema_version()?;
        Ok(store)
    }

    fn configure_connection(conn: &Connection) -> Result<(), CoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn check_or_stamp_schema_version(&self) -> Result<(), CoreError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match found {
            None => {
                self.conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES ('schema_version', ?1)",
                    params![schema::SCHEMA_VERSION.to_string()],
                )?;
                Ok(())
            }
            Some(v) => {
                let found: i64 = v.parse().unwrap_or(0);
                if found > schema::SCHEMA_VERSION {
                    return Err(CoreError::SchemaTooOld {
                        found,
                        supported: schema::SCHEMA_VERSION,
                    });
                }
                Ok(())
            }
        }
    }

    /// Atomically replace one file's rows across all owned tables.
    ///
    /// Fixed order: upsert `indexed_files`, delete the file's old rows
    /// everywhere else, insert the new ones, all inside one transaction so a
    /// reader never observes a partial update.
    pub fn persist_file(&mut self, rec: &FileRecord) -> Result<(), CoreError> {
        let now_ms = now_millis();
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO indexed_files
                (file_path, mtime_ms, file_hash, language, size_bytes, symbol_count,
                 last_indexed_at_ms, index_version, partition_id, authority_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(file_path) DO UPDATE SET
                mtime_ms = excluded.mtime_ms,
                file_hash = excluded.file_hash,
                language = excluded.language,
                size_bytes = excluded.size_bytes,
                symbol_count = excluded.symbol_count,
                last_indexed_at_ms = excluded.last_indexed_at_ms,
                index_version = excluded.index_version,
                partition_id = excluded.partition_id,
                authority_score = excluded.authority_score
            "#,
            params![
                rec.file_path,
                rec.mtime_ms,
                rec.file_hash,
                rec.language,
                rec.size_bytes,
                rec.symbols.len() as i64,
                now_ms,
                schema::SCHEMA_VERSION,
                rec.partition_id,
                rec.authority_score,
            ],
        )?;

        tx.execute("DELETE FROM symbols WHERE file_path = ?1", params![rec.file_path])?;
        tx.execute("DELETE FROM imports WHERE source_file = ?1", params![rec.file_path])?;
        tx.execute("DELETE FROM bm25_documents WHERE file_path = ?1", params![rec.file_path])?;
        tx.execute("DELETE FROM semantic_metadata WHERE file_path = ?1", params![rec.file_path])?;
        tx.execute("DELETE FROM semantic_chunks WHERE file_path = ?1", params![rec.file_path])?;
        tx.execute("DELETE FROM fts5_documents WHERE file_path = ?1", params![rec.file_path])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO symbols (file_path, name, type, signature, location, parent_symbol, is_exported)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for sym in &rec.symbols {
                stmt.execute(params![
                    sym.file_path,
                    sym.name,
                    sym.kind.as_str(),
                    sym.signature,
                    sym.location,
                    sym.parent_symbol,
                    sym.is_exported as i64,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO imports (source_file, import_path, imported_name, is_default)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for imp in &rec.imports {
                stmt.execute(params![
                    imp.source_file,
                    imp.import_path,
                    imp.imported_name,
                    imp.is_default as i64,
                ])?;
            }
        }

        let term_count = rec.searchable_text.split_whitespace().count() as i64;
        tx.execute(
            "INSERT INTO bm25_documents (file_path, searchable_text, term_count) VALUES (?1, ?2, ?3)",
            params![rec.file_path, rec.searchable_text, term_count],
        )?;

        tx.execute(
            "INSERT INTO semantic_metadata (file_path, embedding_text, embedding_stored, total_chunks) VALUES (?1, ?2, 0, NULL)",
            params![rec.file_path, rec.embedding_text],
        )?;

        if rec.index_fulltext && !rec.embedding_text.trim().is_empty() {
            tx.execute(
                "INSERT INTO fts5_documents (file_path, content) VALUES (?1, ?2)",
                params![rec.file_path, rec.embedding_text],
            )?;
        }

        tx.commit()?;
        debug!(file_path = %rec.file_path, symbols = rec.symbols.len(), "persisted file");
        Ok(())
    }

    pub fn file_hash(&self, file_path: &str) -> Result<Option<String>, CoreError> {
        let hash = self
            .conn
            .query_row(
                "SELECT file_hash FROM indexed_files WHERE file_path = ?1",
                params![file_path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    pub fn symbols_for_file(&self, file_path: &str) -> Result<Vec<SymbolRow>, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT file_path, name, type, signature, location, parent_symbol, is_exported FROM symbols WHERE file_path = ?1",
        )?;
        let rows = stmt
            .query_map(params![file_path], |row| {
                let kind: String = row.get(2)?;
                let is_exported: i64 = row.get(6)?;
                Ok(SymbolRow {
                    file_path: row.get(0)?,
                    name: row.get(1)?,
                    kind: SymbolKind::from_str(&kind),
                    signature: row.get(3)?,
                    location: row.get(4)?,
                    parent_symbol: row.get(5)?,
                    is_exported: is_exported != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn imports_from(&self, source_file: &str) -> Result<Vec<ImportRow>, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT source_file, import_path, imported_name, is_default FROM imports WHERE source_file = ?1",
        )?;
        let rows = stmt
            .query_map(params![source_file], Self::row_to_import)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// `source_file` for every import whose `import_path` contains `needle`
    /// as a substring (dependents lookup and import-graph search share this).
    pub fn imports_matching(&self, needle: &str) -> Result<Vec<ImportRow>, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT source_file, import_path, imported_name, is_default FROM imports WHERE import_path LIKE '%' || ?1 || '%'",
        )?;
        let rows = stmt
            .query_map(params![needle], Self::row_to_import)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All `(source_file, import_path)` pairs, for building the in-memory
    /// adjacency map `GraphAnalyzer` needs for cycle detection.
    pub fn all_imports(&self) -> Result<Vec<ImportRow>, CoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_file, import_path, imported_name, is_default FROM imports")?;
        let rows = stmt
            .query_map([], Self::row_to_import)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn all_file_paths(&self) -> Result<Vec<String>, CoreError> {
        let mut stmt = self.conn.prepare("SELECT file_path FROM indexed_files")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn authority_score(&self, file_path: &str) -> Result<Option<(f32, String)>, CoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT authority_score, partition_id FROM indexed_files WHERE file_path = ?1",
                params![file_path],
                |row| Ok((row.get::<_, f64>(0)? as f32, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Every persisted `(file_path, searchable_text)` pair, for rebuilding
    /// an external `LexicalIndex` that doesn't persist its own state across
    /// process runs.
    pub fn all_bm25_documents(&self) -> Result<Vec<(String, String)>, CoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_path, searchable_text FROM bm25_documents")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Every chunk already submitted to the vector store (`embedding_stored
    /// = 1`), joined with its file's partition/authority — for rebuilding an
    /// external `VectorStore` that doesn't persist its own state.
    pub fn all_embedded_chunks(&self) -> Result<Vec<EmbeddedChunkRow>, CoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sc.chunk_id, sc.file_path, sc.chunk_text, f.partition_id, f.authority_score
            FROM semantic_chunks sc
            JOIN indexed_files f ON f.file_path = sc.file_path
            WHERE sc.embedding_stored = 1
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EmbeddedChunkRow {
                    chunk_id: row.get(0)?,
                    file_path: row.get(1)?,
                    chunk_text: row.get(2)?,
                    partition_id: row.get(3)?,
                    authority_score: row.get::<_, f64>(4)? as f32,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_import(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImportRow> {
        let is_default: i64 = row.get(3)?;
        Ok(ImportRow {
            source_file: row.get(0)?,
            import_path: row.get(1)?,
            imported_name: row.get(2)?,
            is_default: is_default != 0,
        })
    }

    /// All rows with non-empty, unembedded intent streams, carrying their
    /// file's partition/authority along for the vector-store submission
    /// metadata. The caller chunks these into embedding batches.
    pub fn pending_embeddings(&self) -> Result<Vec<PendingEmbeddingRow>, CoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sm.file_path, sm.embedding_text, f.language, f.partition_id, f.authority_score
            FROM semantic_metadata sm
            JOIN indexed_files f ON f.file_path = sm.file_path
            WHERE sm.embedding_stored = 0 AND length(sm.embedding_text) > 10
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PendingEmbeddingRow {
                    file_path: row.get(0)?,
                    embedding_text: row.get(1)?,
                    language: row.get(2)?,
                    partition_id: row.get(3)?,
                    authority_score: row.get::<_, f64>(4)? as f32,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Replace `semantic_chunks` for `file_paths` and insert the new set, in
    /// one transaction. Does not touch `embedding_stored` — the caller flips
    /// that only after the vector-store write succeeds.
    pub fn replace_chunks(
        &mut self,
        file_paths: &[String],
        chunks: &[(String, String, u32, String, u32, u32, u32)],
    ) -> Result<(), CoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut del = tx.prepare("DELETE FROM semantic_chunks WHERE file_path = ?1")?;
            for fp in file_paths {
                del.execute(params![fp])?;
            }
        }
        {
            let mut ins = tx.prepare(
                r#"
                INSERT INTO semantic_chunks
                    (chunk_id, file_path, chunk_index, chunk_text, start_offset, end_offset, token_count, embedding_stored, vector_store_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL)
                "#,
            )?;
            for (chunk_id, file_path, chunk_index, chunk_text, start_offset, end_offset, token_count) in chunks {
                ins.execute(params![
                    chunk_id,
                    file_path,
                    chunk_index,
                    chunk_text,
                    start_offset,
                    end_offset,
                    token_count
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Mark a batch's chunks and files embedded, atomically. Only ever
    /// called after `VectorStore::add_documents` has returned success.
    pub fn mark_embedded(&mut self, file_paths: &[String]) -> Result<(), CoreError> {
        let tx = self.conn.transaction()?;
        for fp in file_paths {
            tx.execute(
                "UPDATE semantic_chunks SET embedding_stored = 1, vector_store_id = chunk_id WHERE file_path = ?1",
                params![fp],
            )?;
            tx.execute(
                r#"
                UPDATE semantic_metadata
                SET embedding_stored = 1,
                    total_chunks = (SELECT COUNT(*) FROM semantic_chunks WHERE file_path = ?1)
                WHERE file_path = ?1
                "#,
                params![fp],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Number of `fts5_documents` rows for `file_path` (0 or 1 — one row per
    /// indexed documentation file).
    pub fn fts5_document_count(&self, file_path: &str) -> Result<u64, CoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM fts5_documents WHERE file_path = ?1",
            params![file_path],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn stats(&self) -> Result<StoreStats, CoreError> {
        let total_files: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM indexed_files", [], |row| row.get(0))?;
        let files_with_embeddings: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM semantic_metadata WHERE embedding_stored = 1",
            [],
            |row| row.get(0),
        )?;
        let total_symbols: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM symbols", [], |row| row.get(0))?;
        let total_imports: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM imports", [], |row| row.get(0))?;
        let last_indexed_at_ms: Option<i64> = self
            .conn
            .query_row("SELECT MAX(last_indexed_at_ms) FROM indexed_files", [], |row| row.get(0))
            .optional()?
            .flatten();

        let mut stmt = self
            .conn
            .prepare("SELECT language, COUNT(*) FROM indexed_files GROUP BY language ORDER BY language")?;
        let languages = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(StoreStats {
            total_files: total_files as u64,
            files_with_embeddings: files_with_embeddings as u64,
            total_symbols: total_symbols as u64,
            total_imports: total_imports as u64,
            languages,
            last_indexed_at_ms,
        })
    }

    /// Truncate every owned table in one transaction.
    pub fn clear_index(&mut self) -> Result<(), CoreError> {
        let tx = self.conn.transaction()?;
        for table in schema::OWNED_TABLES {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SymbolKind, SymbolRow};

    fn sample_record(file_path: &str) -> FileRecord {
        FileRecord {
            file_path: file_path.to_string(),
            mtime_ms: 1,
            file_hash: "abc123".to_string(),
            language: "rust".to_string(),
            size_bytes: 100,
            symbols: vec![SymbolRow {
                file_path: file_path.to_string(),
                name: "foo".to_string(),
                kind: SymbolKind::Function,
                signature: Some("fn foo()".to_string()),
                location: "1:0-1:10".to_string(),
                parent_symbol: None,
                is_exported: true,
            }],
            imports: vec![],
            searchable_text: "foo fn foo".to_string(),
            embedding_text: String::new(),
            partition_id: "project".to_string(),
            authority_score: 0.5,
            index_fulltext: false,
        }
    }

    #[test]
    fn persist_then_read_back() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.persist_file(&sample_record("a.rs")).unwrap();

        assert_eq!(store.file_hash("a.rs").unwrap(), Some("abc123".to_string()));
        let symbols = store.symbols_for_file("a.rs").unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "foo");
    }

    #[test]
    fn reindex_replaces_symbols_atomically() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.persist_file(&sample_record("a.rs")).unwrap();

        let mut rec = sample_record("a.rs");
        rec.file_hash = "def456".to_string();
        rec.symbols[0].name = "bar".to_string();
        store.persist_file(&rec).unwrap();

        let symbols = store.symbols_for_file("a.rs").unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "bar");
        assert_eq!(store.file_hash("a.rs").unwrap(), Some("def456".to_string()));
    }

    #[test]
    fn clear_index_truncates_everything() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.persist_file(&sample_record("a.rs")).unwrap();
        store.clear_index().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_symbols, 0);
    }

    #[test]
    fn stats_counts_languages() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.persist_file(&sample_record("a.rs")).unwrap();
        let mut b = sample_record("b.py");
        b.language = "python".to_string();
        store.persist_file(&b).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.languages.len(), 2);
    }

    #[test]
    fn all_bm25_documents_reflects_persisted_searchable_text() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.persist_file(&sample_record("a.rs")).unwrap();

        let docs = store.all_bm25_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "a.rs");
    }

    #[test]
    fn all_embedded_chunks_only_returns_stored_ones() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.persist_file(&sample_record("a.rs")).unwrap();
        store
            .replace_chunks(
                &["a.rs".to_string()],
                &[(
                    "a.rs:0".to_string(),
                    "a.rs".to_string(),
                    0,
                    "chunk text".to_string(),
                    0,
                    10,
                    5,
                )],
            )
            .unwrap();

        assert!(store.all_embedded_chunks().unwrap().is_empty());

        store.mark_embedded(&["a.rs".to_string()]).unwrap();
        let chunks = store.all_embedded_chunks().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "a.rs:0");
    }
}
