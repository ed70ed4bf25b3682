/// Operation parameters and result envelopes of the document facade.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::id::{DocumentId, LocaleSelector};
use crate::document::model::{Document, PublicationState};

/// Parameters shared by every facade operation.
///
/// Each operation reads the subset it understands; the defaulting of
/// `locale` and `status` is decided per action in `document::defaults`.
/// Interceptors receive and may rewrite this value before the operation runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Params {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    /// Bulk target for `deleteMany`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<DocumentId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<LocaleSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PublicationState>,
    /// Raw predicate tree, parsed when the operation runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Attach `availableLocales` / `availableStatus` to returned documents.
    pub with_metadata: bool,
    /// Recorded in `createdBy` / `updatedBy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locale(mut self, locale: impl Into<LocaleSelector>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn status(mut self, status: PublicationState) -> Self {
        self.status = Some(status);
        self
    }

    pub fn draft(self) -> Self {
        self.status(PublicationState::Draft)
    }

    pub fn published(self) -> Self {
        self.status(PublicationState::Published)
    }

    pub fn filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn document_ids(mut self, ids: impl IntoIterator<Item = DocumentId>) -> Self {
        self.document_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn populate<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populate = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Append a sort key such as `title:desc`.
    pub fn sort(mut self, clause: impl Into<String>) -> Self {
        self.sort.push(clause.into());
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_metadata(mut self) -> Self {
        self.with_metadata = true;
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub results: Vec<Document>,
    pub pagination: Pagination,
}

/// Versions of one document touched by clone/publish/unpublish/discardDraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Versions {
    pub document_id: DocumentId,
    pub versions: Vec<Document>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub count: u64,
}
