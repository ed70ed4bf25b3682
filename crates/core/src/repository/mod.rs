//! Physical row storage seam.
//!
//! The document facade is the only caller. Implementations own query
//! execution, unique constraints and transaction isolation; the facade only
//! relies on the operations below and on `begin`/`commit`/`rollback`.

pub mod memory;

use async_trait::async_trait;
use document_service_filters::{Filter, SortField};
use thiserror::Error;

use crate::document::id::DocumentId;
use crate::document::model::{DocumentVersion, NewVersion, RowId, VersionPatch};

pub use memory::InMemoryRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated on {uid}.{field} (value {value})")]
    UniqueConstraint {
        uid: String,
        field: String,
        value: String,
    },
    #[error("row not found: {0}")]
    RowNotFound(RowId),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Query over the rows of one content type.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub uid: String,
    pub filter: Filter,
    /// Empty means storage order (row id ascending).
    pub sort: Vec<SortField>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl RowQuery {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            filter: Filter::Everything,
            sort: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    /// Every row sharing one `documentId`.
    pub fn for_document(uid: &str, document_id: &DocumentId) -> Self {
        Self::new(uid).filter(Filter::eq("documentId", document_id.as_str()))
    }

    /// Narrow the query; conditions accumulate.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = std::mem::take(&mut self.filter).and(filter);
        self
    }

    pub fn sort(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Row-level CRUD shared by repositories and open transactions.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn find_one(&self, query: &RowQuery) -> RepoResult<Option<DocumentVersion>>;

    async fn find_many(&self, query: &RowQuery) -> RepoResult<Vec<DocumentVersion>>;

    /// Ignores `offset` and `limit`.
    async fn count(&self, query: &RowQuery) -> RepoResult<u64>;

    async fn create(&self, uid: &str, row: NewVersion) -> RepoResult<DocumentVersion>;

    async fn update(&self, uid: &str, id: RowId, patch: VersionPatch) -> RepoResult<DocumentVersion>;

    /// Returns whether a row was removed.
    async fn delete(&self, uid: &str, id: RowId) -> RepoResult<bool>;

    /// Ignores `offset` and `limit`; returns the number of removed rows.
    async fn delete_many(&self, query: &RowQuery) -> RepoResult<u64>;
}

#[async_trait]
pub trait Repository: RowStore {
    /// Open a transaction. Work done through it is invisible to other callers
    /// until [`Transaction::commit`]; dropping it uncommitted rolls back.
    async fn begin(&self) -> RepoResult<Box<dyn Transaction>>;
}

#[async_trait]
pub trait Transaction: RowStore {
    async fn commit(self: Box<Self>) -> RepoResult<()>;

    async fn rollback(self: Box<Self>) -> RepoResult<()>;
}
