//! Core types for the search domain.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// A stored document identifier.
///
/// Wraps i32 to match the database SERIAL type. Ordering is used as the
/// ranking tie-break, so it must stay a plain numeric comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DocumentId(i32);

impl DocumentId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for DocumentId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Kind of study resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, Display, EnumString,
)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DocumentType {
    Notes,
    /// Previous year question papers.
    Pyq,
    Research,
    Lecture,
}

/// A stored resource together with its precomputed embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub title: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub doc_type: DocumentType,
    /// Owning branch (program), e.g. "cse"
    pub branch: String,
    pub semester: String,
    pub subject: String,
    /// User id of the uploader
    pub uploaded_by: i32,
    /// Storage location of the uploaded file
    pub file_url: String,
    pub created_at: OffsetDateTime,
    /// Absent for documents that were never embedded
    pub embedding: Option<Vec<f32>>,
}

/// Metadata for a document that is about to be stored.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub doc_type: DocumentType,
    pub branch: String,
    pub semester: String,
    pub subject: String,
    pub uploaded_by: i32,
    pub file_url: String,
}

impl NewDocument {
    /// Text that gets embedded for this document.
    pub fn search_text(&self) -> String {
        search_text(
            &self.title,
            self.description.as_deref(),
            &self.keywords,
            &self.subject,
        )
    }
}

impl DocumentRecord {
    pub fn search_text(&self) -> String {
        search_text(
            &self.title,
            self.description.as_deref(),
            &self.keywords,
            &self.subject,
        )
    }
}

fn search_text(title: &str, description: Option<&str>, keywords: &[String], subject: &str) -> String {
    let mut parts = vec![title.to_string()];

    if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
        parts.push(desc.to_string());
    }

    if !keywords.is_empty() {
        parts.push(keywords.join(", "));
    }

    parts.push(subject.to_string());
    parts.join("\n\n")
}

/// Requester role as forwarded by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Student,
    Faculty,
    Staff,
}

impl Role {
    pub fn is_restricted(&self) -> bool {
        matches!(self, Role::Student)
    }
}

/// Visibility scope of the caller.
///
/// A restricted scope always carries the branch and semester it is limited to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequesterScope {
    Unrestricted,
    Restricted { branch: String, semester: String },
}

impl RequesterScope {
    pub fn restricted(branch: impl Into<String>, semester: impl Into<String>) -> Self {
        Self::Restricted {
            branch: branch.into(),
            semester: semester.into(),
        }
    }

    /// Build a scope from a resolved role.
    ///
    /// Returns `None` when a restricted role arrives without its branch or semester.
    pub fn for_role(role: Role, branch: Option<String>, semester: Option<String>) -> Option<Self> {
        if !role.is_restricted() {
            return Some(Self::Unrestricted);
        }

        match (branch, semester) {
            (Some(branch), Some(semester)) if !branch.is_empty() && !semester.is_empty() => {
                Some(Self::Restricted { branch, semester })
            }
            _ => None,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

/// A candidate document with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub document: DocumentRecord,
    /// Cosine similarity in [-1, 1], 0 for documents without a usable embedding
    pub similarity_score: f64,
}

/// Public view of a ranked document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: DocumentId,
    pub title: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub branch: String,
    pub semester: String,
    pub subject: String,
    pub uploaded_by: i32,
    pub file_url: String,
    pub similarity_score: f64,
}

impl From<RankedResult> for SearchHit {
    fn from(result: RankedResult) -> Self {
        let doc = result.document;
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            keywords: doc.keywords,
            doc_type: doc.doc_type,
            branch: doc.branch,
            semester: doc.semester,
            subject: doc.subject,
            uploaded_by: doc.uploaded_by,
            file_url: doc.file_url,
            similarity_score: result.similarity_score,
        }
    }
}

/// Statistics about the stored documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub total: i64,
    pub embedded: i64,
    pub missing_embedding: i64,
}

/// Outcome of an embedding backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillStats {
    pub embedded: usize,
    pub failed: usize,
}
