//! Trait definitions for search domain abstractions.
//!
//! These traits enable dependency injection and easy testing through mocking.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::types::{DocumentId, DocumentRecord, NewDocument};

/// Stable error kind reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidQuery,
    EmbeddingUnavailable,
    StoreUnavailable,
    DimensionMismatch,
}

/// Error type for search operations.
///
/// Cloneable so one failed provider initialization can be reported to every
/// caller that waited on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::EmbeddingUnavailable(_) => ErrorKind::EmbeddingUnavailable,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
        }
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(msg.into())
    }
}

impl From<sqlx::Error> for SearchError {
    fn from(e: sqlx::Error) -> Self {
        SearchError::StoreUnavailable(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for SearchError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        SearchError::StoreUnavailable(e.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        SearchError::EmbeddingUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Trait for text embedding generation.
///
/// Abstracts the embedding provider (remote inference, local model, mocks).
///
/// # Example
///
/// ```ignore
/// let embedder = HttpEmbedder::connect(&settings).await?;
/// let embedding = embedder.embed("binary search trees").await?;
/// assert_eq!(embedding.len(), 384);
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Returns the embedding dimensions for this embedder.
    fn dimensions(&self) -> usize;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}

/// Builds an embedding provider. May be slow (model load, warm-up request).
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn Embedder>>;
}

/// Trait for document persistence and retrieval.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read-only snapshot of every stored document.
    async fn list_all(&self) -> Result<Vec<DocumentRecord>>;

    /// Get a document by id.
    async fn get_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>>;

    /// Store a new document, returning it with its assigned id.
    async fn insert_document(
        &self,
        doc: &NewDocument,
        embedding: Option<&[f32]>,
    ) -> Result<DocumentRecord>;

    /// Attach an embedding to an existing document.
    ///
    /// Returns false if the document does not exist.
    async fn set_embedding(&self, id: DocumentId, embedding: &[f32]) -> Result<bool>;

    /// Documents that have no embedding yet, oldest first.
    async fn list_missing_embeddings(&self, limit: usize) -> Result<Vec<DocumentRecord>>;

    /// Total document count.
    async fn count(&self) -> Result<i64>;

    /// Number of documents carrying an embedding.
    async fn count_embedded(&self) -> Result<i64>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        (**self).list_all().await
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>> {
        (**self).get_document(id).await
    }

    async fn insert_document(
        &self,
        doc: &NewDocument,
        embedding: Option<&[f32]>,
    ) -> Result<DocumentRecord> {
        (**self).insert_document(doc, embedding).await
    }

    async fn set_embedding(&self, id: DocumentId, embedding: &[f32]) -> Result<bool> {
        (**self).set_embedding(id, embedding).await
    }

    async fn list_missing_embeddings(&self, limit: usize) -> Result<Vec<DocumentRecord>> {
        (**self).list_missing_embeddings(limit).await
    }

    async fn count(&self) -> Result<i64> {
        (**self).count().await
    }

    async fn count_embedded(&self) -> Result<i64> {
        (**self).count_embedded().await
    }
}
