//! Embedding maintenance for stored documents.

use tracing::{info, warn};

use super::traits::{DocumentStore, Embedder, Result};
use super::types::{BackfillStats, DocumentId, DocumentRecord, NewDocument};

/// Configuration for the document indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Batch size for embedding generation
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { batch_size: 16 }
    }
}

/// Computes and stores document embeddings.
///
/// # Type Parameters
///
/// * `E` - Embedder implementation for generating document embeddings
/// * `R` - DocumentStore implementation the embeddings are written to
///
/// # Example
///
/// ```ignore
/// let indexer = DocumentIndexer::new(loader, store, IndexerConfig::default());
/// let stats = indexer.backfill_missing().await?;
/// println!("Embedded {} documents, {} failed", stats.embedded, stats.failed);
/// ```
pub struct DocumentIndexer<E, R>
where
    E: Embedder,
    R: DocumentStore,
{
    embedder: E,
    store: R,
    config: IndexerConfig,
}

impl<E, R> DocumentIndexer<E, R>
where
    E: Embedder,
    R: DocumentStore,
{
    /// Create a new document indexer.
    pub fn new(embedder: E, store: R, config: IndexerConfig) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Create an indexer with default configuration.
    pub fn with_defaults(embedder: E, store: R) -> Self {
        Self::new(embedder, store, IndexerConfig::default())
    }

    /// Store a new document, embedding it first.
    ///
    /// A failed embedding does not fail the upload: the document is stored
    /// without one and picked up by the next backfill.
    pub async fn index_document(&self, doc: NewDocument) -> Result<DocumentRecord> {
        let embedding = match self.embedder.embed(&doc.search_text()).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(title = %doc.title, error = %e, "Storing document without embedding");
                None
            }
        };

        let record = self
            .store
            .insert_document(&doc, embedding.as_deref())
            .await?;

        info!(
            document_id = %record.id,
            embedded = record.embedding.is_some(),
            "Indexed document"
        );
        Ok(record)
    }

    /// Recompute the embedding of one stored document.
    ///
    /// Returns `None` when no document has this id. Unlike uploads, an
    /// embedding failure is returned to the caller.
    pub async fn reindex_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>> {
        let Some(mut record) = self.store.get_document(id).await? else {
            return Ok(None);
        };

        let embedding = self.embedder.embed(&record.search_text()).await?;
        if !self.store.set_embedding(id, &embedding).await? {
            return Ok(None);
        }

        info!(document_id = %id, "Re-embedded document");
        record.embedding = Some(embedding);
        Ok(Some(record))
    }

    /// Embed every document that is still missing an embedding.
    ///
    /// Failed batches are counted and skipped; documents that keep failing are
    /// left alone until the next pass.
    pub async fn backfill_missing(&self) -> Result<BackfillStats> {
        let mut stats = BackfillStats::default();
        let batch_size = self.config.batch_size.max(1);

        // Skipped documents stay missing, so fetch at most one extra window
        // per failed document to guarantee progress.
        let mut skipped = 0usize;

        loop {
            let pending = self
                .store
                .list_missing_embeddings(skipped + batch_size)
                .await?;
            let batch: Vec<DocumentRecord> = pending.into_iter().skip(skipped).collect();

            if batch.is_empty() {
                break;
            }

            let contents: Vec<String> = batch.iter().map(DocumentRecord::search_text).collect();
            let content_refs: Vec<&str> = contents.iter().map(String::as_str).collect();

            match self.embedder.embed_batch(&content_refs).await {
                Ok(embeddings) => {
                    for (doc, embedding) in batch.iter().zip(embeddings) {
                        if self.store.set_embedding(doc.id, &embedding).await? {
                            stats.embedded += 1;
                        } else {
                            // Deleted between listing and update.
                            skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(batch = batch.len(), error = %e, "Failed to embed batch");
                    stats.failed += batch.len();
                    skipped += batch.len();
                }
            }
        }

        info!(
            embedded = stats.embedded,
            failed = stats.failed,
            "Embedding backfill completed"
        );

        Ok(stats)
    }
}
