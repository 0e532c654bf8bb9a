//! Semantic search over stored study resources.
//!
//! A query is embedded, compared by cosine similarity against the stored
//! embedding of every document (full scan), narrowed to what the requester may
//! see, and truncated to the requested size.
//!
//! # Architecture
//!
//! The search system is built around trait abstractions for testability:
//!
//! - [`Embedder`] - Text embedding generation (HTTP endpoint, mocks)
//! - [`ProviderFactory`] - Expensive provider construction, run at most once
//!   at a time by [`ProviderLoader`]
//! - [`DocumentStore`] - Document snapshots (PostgreSQL, in-memory)
//!
//! # Example
//!
//! ```ignore
//! use resource_search::domain::search::{ProviderLoader, SearchService, SearchConfig};
//! use resource_search::domain::search::embedder::HttpProviderFactory;
//! use resource_search::domain::search::repository::PgDocumentStore;
//!
//! let loader = ProviderLoader::new(Arc::new(HttpProviderFactory::new(settings)), 384);
//! let service = SearchService::new(loader, PgDocumentStore::new(pool), SearchConfig::default());
//!
//! let results = service.search("operating systems notes", &scope, Some(10)).await?;
//! ```
//!
//! # Ordering
//!
//! Results are ordered by descending similarity, ties by ascending document
//! id. Documents without an embedding score 0 and still take part. Access
//! filtering runs after ranking and before truncation, so a limited result is
//! always a prefix of the full visible ordering.

pub mod access;
mod index_worker;
mod indexer;
mod loader;
pub mod ranker;
mod service;
mod traits;
mod types;

pub mod embedder;
pub mod repository;

// Re-export main types
pub use index_worker::run_backfill_worker;
pub use indexer::{DocumentIndexer, IndexerConfig};
pub use loader::ProviderLoader;
pub use service::{SearchConfig, SearchService};
pub use traits::{DocumentStore, Embedder, ErrorKind, ProviderFactory, Result, SearchError};
pub use types::{
    BackfillStats, DocumentId, DocumentRecord, DocumentType, NewDocument, RankedResult,
    RequesterScope, Role, SearchHit, SearchStats,
};

#[cfg(test)]
pub(crate) use types::fixtures;
