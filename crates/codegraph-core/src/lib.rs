//! CodeGraph core: incremental symbol-graph indexing, storage, and search.
//!
//! This crate owns the hard part of a code indexer: discovering files,
//! detecting changes, splitting each file into a lexical (code) stream and a
//! semantic (intent) stream, persisting both atomically alongside extracted
//! symbols and imports, generating pending embeddings, and serving keyword,
//! semantic, and import-graph queries with authority-weighted ranking.
//!
//! AST parsing, embedding generation, vector storage, BM25 indexing, text
//! chunking, and authority classification are external collaborators,
//! consumed here only through the traits in [`external`].

pub mod change;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod external;
pub mod graph;
pub mod hash;
pub mod indexer;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod search;
pub mod store;

pub use config::IndexOptions;
pub use error::CoreError;
pub use indexer::{IndexStats, Indexer};
pub use model::Language;
pub use paths::{PathResolver, StoragePaths};
pub use search::{SearchEngine, SearchResult};
pub use store::IndexStore;

pub type Result<T> = std::result::Result<T, CoreError>;
