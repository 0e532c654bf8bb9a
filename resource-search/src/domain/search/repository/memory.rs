//! In-memory document store, used for tests and local development.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

use crate::domain::search::traits::{DocumentStore, Result, SearchError};
use crate::domain::search::types::{DocumentId, DocumentRecord, NewDocument};

#[derive(Default)]
struct Inner {
    documents: BTreeMap<DocumentId, DocumentRecord>,
    next_id: i32,
}

/// Document store backed by an in-memory map.
///
/// # Examples
///
/// ```ignore
/// let store = InMemoryDocumentStore::new();
/// // or with initial documents:
/// let store = InMemoryDocumentStore::new().with_documents(vec![doc1, doc2]);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add initial documents, keeping their ids.
    pub fn with_documents(self, docs: Vec<DocumentRecord>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            for doc in docs {
                inner.next_id = inner.next_id.max(doc.id.as_i32());
                inner.documents.insert(doc.id, doc);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> Result<T> {
        let inner = self
            .inner
            .read()
            .map_err(|_| SearchError::StoreUnavailable("store lock poisoned".into()))?;
        Ok(f(&inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| SearchError::StoreUnavailable("store lock poisoned".into()))?;
        Ok(f(&mut inner))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        self.read(|inner| inner.documents.values().cloned().collect())
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>> {
        self.read(|inner| inner.documents.get(&id).cloned())
    }

    async fn insert_document(
        &self,
        doc: &NewDocument,
        embedding: Option<&[f32]>,
    ) -> Result<DocumentRecord> {
        self.write(|inner| {
            inner.next_id += 1;
            let record = DocumentRecord {
                id: DocumentId::new(inner.next_id),
                title: doc.title.clone(),
                description: doc.description.clone(),
                keywords: doc.keywords.clone(),
                doc_type: doc.doc_type,
                branch: doc.branch.clone(),
                semester: doc.semester.clone(),
                subject: doc.subject.clone(),
                uploaded_by: doc.uploaded_by,
                file_url: doc.file_url.clone(),
                created_at: OffsetDateTime::now_utc(),
                embedding: embedding.map(<[f32]>::to_vec),
            };
            inner.documents.insert(record.id, record.clone());
            record
        })
    }

    async fn set_embedding(&self, id: DocumentId, embedding: &[f32]) -> Result<bool> {
        self.write(|inner| match inner.documents.get_mut(&id) {
            Some(doc) => {
                doc.embedding = Some(embedding.to_vec());
                true
            }
            None => false,
        })
    }

    async fn list_missing_embeddings(&self, limit: usize) -> Result<Vec<DocumentRecord>> {
        self.read(|inner| {
            let mut missing: Vec<DocumentRecord> = inner
                .documents
                .values()
                .filter(|doc| doc.embedding.is_none())
                .cloned()
                .collect();
            missing.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            missing.truncate(limit);
            missing
        })
    }

    async fn count(&self) -> Result<i64> {
        self.read(|inner| inner.documents.len() as i64)
    }

    async fn count_embedded(&self) -> Result<i64> {
        self.read(|inner| {
            inner
                .documents
                .values()
                .filter(|doc| doc.embedding.is_some())
                .count() as i64
        })
    }
}
