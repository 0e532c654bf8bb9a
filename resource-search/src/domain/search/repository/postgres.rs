//! PostgreSQL document store.
//!
//! Embeddings live in a `REAL[]` column and are scored in-process; the
//! database is only asked for snapshots, not for similarity.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::domain::search::traits::{DocumentStore, Result};
use crate::domain::search::types::{DocumentId, DocumentRecord, DocumentType, NewDocument};

const DOCUMENT_COLUMNS: &str = r#"
    id, title, description, keywords, doc_type, branch, semester, subject,
    uploaded_by, file_url, created_at, embedding
"#;

#[derive(FromRow)]
struct DocumentRow {
    id: i32,
    title: String,
    description: Option<String>,
    keywords: Vec<String>,
    doc_type: DocumentType,
    branch: String,
    semester: String,
    subject: String,
    uploaded_by: i32,
    file_url: String,
    created_at: OffsetDateTime,
    embedding: Option<Vec<f32>>,
}

impl From<DocumentRow> for DocumentRecord {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: DocumentId::new(row.id),
            title: row.title,
            description: row.description,
            keywords: row.keywords,
            doc_type: row.doc_type,
            branch: row.branch,
            semester: row.semester,
            subject: row.subject,
            uploaded_by: row.uploaded_by,
            file_url: row.file_url,
            created_at: row.created_at,
            embedding: row.embedding,
        }
    }
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DocumentRecord::from).collect())
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DocumentRecord::from))
    }

    async fn insert_document(
        &self,
        doc: &NewDocument,
        embedding: Option<&[f32]>,
    ) -> Result<DocumentRecord> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            INSERT INTO documents (
                title, description, keywords, doc_type, branch, semester, subject,
                uploaded_by, file_url, embedding
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(&doc.title)
        .bind(doc.description.as_deref())
        .bind(&doc.keywords)
        .bind(doc.doc_type)
        .bind(&doc.branch)
        .bind(&doc.semester)
        .bind(&doc.subject)
        .bind(doc.uploaded_by)
        .bind(&doc.file_url)
        .bind(embedding)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn set_embedding(&self, id: DocumentId, embedding: &[f32]) -> Result<bool> {
        let result = sqlx::query("UPDATE documents SET embedding = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(embedding)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_missing_embeddings(&self, limit: usize) -> Result<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS} FROM documents
            WHERE embedding IS NULL
            ORDER BY created_at, id
            LIMIT $1
            "#
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DocumentRecord::from).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_embedded(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
