//! Document facade for one content type.
//!
//! # Responsibility
//! - Expose the document operations (find*, create, update, delete, clone,
//!   publish, unpublish, discardDraft) over physical version rows.
//! - Route every call through the composed middleware chain; the operation
//!   body is the innermost step.
//! - Attach derived status (and optionally sibling metadata) to every
//!   returned version.
//!
//! # Invariants
//! - At most one draft and one published row per (documentId, locale).
//! - Only draft rows are mutated in place; published rows are only ever
//!   replaced by `publish` or removed.
//! - Multi-row transitions run inside one repository transaction per call.
//! - Unknown documentIds yield `None`, never an error.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use document_service_filters::{self as filters, Filter, Operator, SortField};
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::document::defaults::{self, locale_filter, status_filter, Resolved};
use crate::document::id::{DocumentId, LocaleScope};
use crate::document::model::{
    Attributes, Document, DocumentVersion, NewVersion, PublicationState, VersionPatch,
};
use crate::document::schema::{ContentType, SchemaRegistry};
use crate::document::status::{self, load_siblings};
use crate::document::validate::{page_offset, sanitize_attributes, validate_page};
use crate::error::{DocumentError, DocumentResult};
use crate::events::{DocumentEvent, EventBus, EventKind};
use crate::middleware::{Action, Context, Endpoint, MiddlewareRegistry, Outcome, Pipeline};
use crate::repository::{Repository, RowQuery, RowStore, Transaction};
use crate::service::types::{DeleteResult, Page, Pagination, Params, Versions};

/// Facade bound to one content type.
pub struct DocumentService {
    content_type: ContentType,
    schemas: Arc<SchemaRegistry>,
    repo: Arc<dyn Repository>,
    pipeline: Pipeline,
    events: EventBus,
    config: Arc<ServiceConfig>,
}

impl DocumentService {
    pub fn new(
        content_type: ContentType,
        schemas: Arc<SchemaRegistry>,
        repo: Arc<dyn Repository>,
        middleware: &MiddlewareRegistry,
        events: EventBus,
        config: Arc<ServiceConfig>,
    ) -> Self {
        let pipeline = Pipeline::compose(&content_type.uid, middleware);
        Self {
            content_type,
            schemas,
            repo,
            pipeline,
            events,
            config,
        }
    }

    pub fn uid(&self) -> &str {
        &self.content_type.uid
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Interceptor names that wrap `action`, outermost first.
    pub fn middleware_for(&self, action: Action) -> Vec<String> {
        self.pipeline.middleware_names(action)
    }

    /// One version of a document, or `None` when nothing matches.
    pub async fn find_one(
        &self,
        document_id: &DocumentId,
        params: Params,
    ) -> DocumentResult<Option<Document>> {
        let params = with_document(params, document_id);
        self.dispatch(Action::FindOne, params)
            .await?
            .into_document(Action::FindOne)
    }

    pub async fn find_first(&self, params: Params) -> DocumentResult<Option<Document>> {
        self.dispatch(Action::FindFirst, params)
            .await?
            .into_document(Action::FindFirst)
    }

    pub async fn find_many(&self, params: Params) -> DocumentResult<Vec<Document>> {
        self.dispatch(Action::FindMany, params)
            .await?
            .into_documents(Action::FindMany)
    }

    pub async fn count(&self, params: Params) -> DocumentResult<u64> {
        self.dispatch(Action::Count, params)
            .await?
            .into_count(Action::Count)
    }

    pub async fn find_page(&self, params: Params) -> DocumentResult<Page> {
        self.dispatch(Action::FindPage, params)
            .await?
            .into_page(Action::FindPage)
    }

    /// Create a new document with a single draft row.
    pub async fn create(&self, params: Params) -> DocumentResult<Document> {
        self.dispatch(Action::Create, params)
            .await?
            .into_document(Action::Create)?
            .ok_or(DocumentError::UnexpectedOutcome {
                action: Action::Create,
            })
    }

    /// Update the draft of one locale, materializing it from the published
    /// row (or from nothing) when it does not exist yet.
    pub async fn update(
        &self,
        document_id: &DocumentId,
        params: Params,
    ) -> DocumentResult<Option<Document>> {
        let params = with_document(params, document_id);
        self.dispatch(Action::Update, params)
            .await?
            .into_document(Action::Update)
    }

    /// Delete draft and published rows of the targeted locale(s).
    pub async fn delete(
        &self,
        document_id: &DocumentId,
        params: Params,
    ) -> DocumentResult<DeleteResult> {
        let params = with_document(params, document_id);
        self.dispatch(Action::Delete, params)
            .await?
            .into_deleted(Action::Delete)
    }

    /// Bulk delete by `filters`, `locale` and/or `document_ids`.
    pub async fn delete_many(&self, params: Params) -> DocumentResult<DeleteResult> {
        self.dispatch(Action::DeleteMany, params)
            .await?
            .into_deleted(Action::DeleteMany)
    }

    /// Copy the drafts of a document under a new documentId.
    pub async fn clone_document(
        &self,
        document_id: &DocumentId,
        params: Params,
    ) -> DocumentResult<Option<Versions>> {
        let params = with_document(params, document_id);
        self.dispatch(Action::Clone, params)
            .await?
            .into_versions(Action::Clone)
    }

    pub async fn publish(
        &self,
        document_id: &DocumentId,
        params: Params,
    ) -> DocumentResult<Option<Versions>> {
        let params = with_document(params, document_id);
        self.dispatch(Action::Publish, params)
            .await?
            .into_versions(Action::Publish)
    }

    pub async fn unpublish(
        &self,
        document_id: &DocumentId,
        params: Params,
    ) -> DocumentResult<Option<Versions>> {
        let params = with_document(params, document_id);
        self.dispatch(Action::Unpublish, params)
            .await?
            .into_versions(Action::Unpublish)
    }

    /// Reset the draft of every targeted locale that also has a published
    /// version to the published content. Other locales are untouched.
    pub async fn discard_draft(
        &self,
        document_id: &DocumentId,
        params: Params,
    ) -> DocumentResult<Option<Versions>> {
        let params = with_document(params, document_id);
        self.dispatch(Action::DiscardDraft, params)
            .await?
            .into_versions(Action::DiscardDraft)
    }

    async fn dispatch(&self, action: Action, params: Params) -> DocumentResult<Outcome> {
        let ctx = Context {
            uid: self.content_type.uid.clone(),
            action,
            params,
        };
        self.pipeline.run(ctx, self).await
    }

    // ---- operation bodies -------------------------------------------------

    async fn run_find_one(&self, params: Params) -> DocumentResult<Option<Document>> {
        let Some(document_id) = params.document_id.clone() else {
            return Ok(None);
        };
        let resolved = self.resolve(Action::FindOne, &params)?;
        let query = RowQuery::for_document(self.uid(), &document_id)
            .filter(user_filter(&params)?)
            .filter(resolved.filter());
        let Some(row) = self.repo.find_one(&query).await? else {
            return Ok(None);
        };
        self.present_one(&*self.repo, row, &params).await.map(Some)
    }

    async fn run_find_first(&self, params: Params) -> DocumentResult<Option<Document>> {
        let query = self.list_query(Action::FindFirst, &params)?.limit(1);
        let Some(row) = self.repo.find_one(&query).await? else {
            return Ok(None);
        };
        self.present_one(&*self.repo, row, &params).await.map(Some)
    }

    async fn run_find_many(&self, params: Params) -> DocumentResult<Vec<Document>> {
        let mut query = self
            .list_query(Action::FindMany, &params)?
            .offset(params.start.unwrap_or(0));
        if let Some(limit) = params.limit {
            query = query.limit(limit.min(self.config.max_page_size));
        }
        let rows = self.repo.find_many(&query).await?;
        self.present(&*self.repo, rows, &params).await
    }

    async fn run_count(&self, params: Params) -> DocumentResult<u64> {
        let query = self.list_query(Action::Count, &params)?;
        Ok(self.repo.count(&query).await?)
    }

    async fn run_find_page(&self, params: Params) -> DocumentResult<Page> {
        let page = validate_page(params.page)?;
        let page_size = self.config.clamp_page_size(params.page_size);
        let offset = page_offset(page, page_size)?;
        let query = self.list_query(Action::FindPage, &params)?;

        let total = self.repo.count(&query).await?;
        let rows = self
            .repo
            .find_many(&query.offset(offset).limit(page_size))
            .await?;
        let results = self.present(&*self.repo, rows, &params).await?;

        Ok(Page {
            results,
            pagination: Pagination {
                page,
                page_size,
                page_count: (total as usize).div_ceil(page_size),
                total,
            },
        })
    }

    async fn run_create(&self, params: Params) -> DocumentResult<Document> {
        let resolved = self.resolve(Action::Create, &params)?;
        let data = sanitize_attributes(params.data.as_ref())?;
        let row = NewVersion::draft(
            DocumentId::generate(),
            resolved.target_locale(),
            data,
            params.actor.clone(),
        );

        let tx = self.repo.begin().await?;
        let result = self.create_in(&*tx, row, &params).await;
        let document = self.settle(Action::Create, tx, result).await?;

        tracing::info!(
            uid = %self.uid(),
            document_id = %document.document_id,
            locale = ?document.locale,
            "Created document"
        );
        self.emit(EventKind::Create, &document.document_id, document.locale.clone());
        Ok(document)
    }

    async fn create_in<S: RowStore + ?Sized>(
        &self,
        store: &S,
        row: NewVersion,
        params: &Params,
    ) -> DocumentResult<Document> {
        let created = store.create(self.uid(), row).await?;
        self.present_one(store, created, params).await
    }

    async fn run_update(&self, params: Params) -> DocumentResult<Option<Document>> {
        let Some(document_id) = params.document_id.clone() else {
            return Ok(None);
        };
        let resolved = self.resolve(Action::Update, &params)?;
        let data = sanitize_attributes(params.data.as_ref())?;
        let locale = resolved.target_locale();

        let tx = self.repo.begin().await?;
        let result = self
            .update_in(&*tx, &document_id, locale.clone(), data, &params)
            .await;
        let document = self.settle(Action::Update, tx, result).await?;

        if document.is_some() {
            self.emit(EventKind::Update, &document_id, locale);
        }
        Ok(document)
    }

    async fn update_in<S: RowStore + ?Sized>(
        &self,
        store: &S,
        document_id: &DocumentId,
        locale: Option<String>,
        data: Attributes,
        params: &Params,
    ) -> DocumentResult<Option<Document>> {
        let rows = load_siblings(store, self.uid(), document_id).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let draft = find_row(&rows, &locale, PublicationState::Draft);
        let published = find_row(&rows, &locale, PublicationState::Published);
        let now = Utc::now();

        let updated = match (draft, published) {
            (Some(draft), _) => {
                let patch = VersionPatch {
                    data,
                    updated_at: now,
                    updated_by: params.actor.clone(),
                };
                store.update(self.uid(), draft.id, patch).await?
            }
            (None, Some(published)) => {
                tracing::debug!(
                    uid = %self.uid(),
                    %document_id,
                    ?locale,
                    "Materializing draft from published version"
                );
                let mut row = published.copy_as(None);
                row.data.extend(data);
                row.updated_at = now;
                if params.actor.is_some() {
                    row.updated_by = params.actor.clone();
                }
                store.create(self.uid(), row).await?
            }
            (None, None) => {
                let row = NewVersion::draft(
                    document_id.clone(),
                    locale.clone(),
                    data,
                    params.actor.clone(),
                );
                store.create(self.uid(), row).await?
            }
        };

        self.present_one(store, updated, params).await.map(Some)
    }

    async fn run_delete(&self, params: Params) -> DocumentResult<DeleteResult> {
        let Some(document_id) = params.document_id.clone() else {
            return Ok(DeleteResult { count: 0 });
        };
        let resolved = self.resolve(Action::Delete, &params)?;
        let query = RowQuery::for_document(self.uid(), &document_id).filter(resolved.filter());

        let tx = self.repo.begin().await?;
        let result = tx.delete_many(&query).await.map_err(DocumentError::from);
        let count = self.settle(Action::Delete, tx, result).await?;

        if count > 0 {
            tracing::info!(uid = %self.uid(), %document_id, count, "Deleted document versions");
            self.emit(EventKind::Delete, &document_id, resolved.target_locale());
        }
        Ok(DeleteResult { count })
    }

    async fn run_delete_many(&self, params: Params) -> DocumentResult<DeleteResult> {
        // Resolution rejects `status` before anything is read or written.
        let resolved = self.resolve(Action::DeleteMany, &params)?;
        let mut query = RowQuery::new(self.uid())
            .filter(user_filter(&params)?)
            .filter(resolved.filter());
        if let Some(ids) = &params.document_ids {
            let ids = ids.iter().map(|id| Value::from(id.as_str())).collect();
            query = query.filter(Filter::field("documentId", Operator::In(ids)));
        }

        let tx = self.repo.begin().await?;
        let result = self.delete_many_in(&*tx, &query).await;
        let (count, document_ids) = self.settle(Action::DeleteMany, tx, result).await?;

        tracing::info!(uid = %self.uid(), count, documents = document_ids.len(), "Bulk deleted document versions");
        for document_id in &document_ids {
            self.emit(EventKind::Delete, document_id, resolved.target_locale());
        }
        Ok(DeleteResult { count })
    }

    async fn delete_many_in<S: RowStore + ?Sized>(
        &self,
        store: &S,
        query: &RowQuery,
    ) -> DocumentResult<(u64, BTreeSet<DocumentId>)> {
        let document_ids = store
            .find_many(query)
            .await?
            .into_iter()
            .map(|row| row.document_id)
            .collect();
        let count = store.delete_many(query).await?;
        Ok((count, document_ids))
    }

    async fn run_clone(&self, params: Params) -> DocumentResult<Option<Versions>> {
        let Some(source_id) = params.document_id.clone() else {
            return Ok(None);
        };
        let resolved = self.resolve(Action::Clone, &params)?;
        let data = sanitize_attributes(params.data.as_ref())?;

        let tx = self.repo.begin().await?;
        let result = self.clone_in(&*tx, &source_id, &resolved, data, &params).await;
        let cloned = self.settle(Action::Clone, tx, result).await?;

        if let Some(cloned) = &cloned {
            tracing::info!(
                uid = %self.uid(),
                source = %source_id,
                document_id = %cloned.document_id,
                versions = cloned.versions.len(),
                "Cloned document"
            );
            self.emit(EventKind::Clone, &cloned.document_id, resolved.target_locale());
        }
        Ok(cloned)
    }

    async fn clone_in<S: RowStore + ?Sized>(
        &self,
        store: &S,
        source_id: &DocumentId,
        resolved: &Resolved,
        data: Attributes,
        params: &Params,
    ) -> DocumentResult<Option<Versions>> {
        let drafts = store
            .find_many(&RowQuery::for_document(self.uid(), source_id).filter(resolved.filter()))
            .await?;
        if drafts.is_empty() {
            return Ok(None);
        }

        let document_id = DocumentId::generate();
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let mut attributes = draft.data;
            attributes.extend(data.clone());
            let row = NewVersion::draft(
                document_id.clone(),
                draft.locale,
                attributes,
                params.actor.clone(),
            );
            created.push(store.create(self.uid(), row).await?);
        }

        let versions = self.present(store, created, params).await?;
        Ok(Some(Versions {
            document_id,
            versions,
        }))
    }

    async fn run_publish(&self, params: Params) -> DocumentResult<Option<Versions>> {
        let Some(document_id) = params.document_id.clone() else {
            return Ok(None);
        };
        let resolved = self.resolve(Action::Publish, &params)?;

        let tx = self.repo.begin().await?;
        let result = self.publish_in(&*tx, &document_id, &resolved, &params).await;
        let published = self.settle(Action::Publish, tx, result).await?;

        if let Some(published) = &published {
            tracing::info!(
                uid = %self.uid(),
                %document_id,
                locales = published.versions.len(),
                "Published document"
            );
            for version in &published.versions {
                self.emit(EventKind::Publish, &document_id, version.locale.clone());
            }
        }
        Ok(published)
    }

    async fn publish_in<S: RowStore + ?Sized>(
        &self,
        store: &S,
        document_id: &DocumentId,
        resolved: &Resolved,
        params: &Params,
    ) -> DocumentResult<Option<Versions>> {
        let drafts = store
            .find_many(
                &self
                    .scoped(document_id, &resolved.locale)
                    .filter(status_filter(Some(PublicationState::Draft))),
            )
            .await?;
        if drafts.is_empty() {
            return Ok(None);
        }

        let now = Utc::now();
        let mut published = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            let previous = self
                .version_query(document_id, &draft.locale, PublicationState::Published);
            let replaced = store.delete_many(&previous).await?;
            tracing::debug!(uid = %self.uid(), %document_id, locale = ?draft.locale, replaced, "Publishing draft");
            published.push(store.create(self.uid(), draft.copy_as(Some(now))).await?);
        }

        let versions = self.present(store, published, params).await?;
        Ok(Some(Versions {
            document_id: document_id.clone(),
            versions,
        }))
    }

    async fn run_unpublish(&self, params: Params) -> DocumentResult<Option<Versions>> {
        let Some(document_id) = params.document_id.clone() else {
            return Ok(None);
        };
        let resolved = self.resolve(Action::Unpublish, &params)?;

        let tx = self.repo.begin().await?;
        let result = self.unpublish_in(&*tx, &document_id, &resolved, &params).await;
        let outcome = self.settle(Action::Unpublish, tx, result).await?;

        Ok(outcome.map(|(removed, versions)| {
            if removed > 0 {
                tracing::info!(uid = %self.uid(), %document_id, removed, "Unpublished document");
                self.emit(EventKind::Unpublish, &document_id, resolved.target_locale());
            }
            versions
        }))
    }

    async fn unpublish_in<S: RowStore + ?Sized>(
        &self,
        store: &S,
        document_id: &DocumentId,
        resolved: &Resolved,
        params: &Params,
    ) -> DocumentResult<Option<(u64, Versions)>> {
        if store
            .count(&RowQuery::for_document(self.uid(), document_id))
            .await?
            == 0
        {
            return Ok(None);
        }

        let scope = self.scoped(document_id, &resolved.locale);
        let removed = store
            .delete_many(&scope.clone().filter(status_filter(Some(PublicationState::Published))))
            .await?;
        let drafts = store
            .find_many(&scope.filter(status_filter(Some(PublicationState::Draft))))
            .await?;

        let versions = self.present(store, drafts, params).await?;
        Ok(Some((
            removed,
            Versions {
                document_id: document_id.clone(),
                versions,
            },
        )))
    }

    async fn run_discard_draft(&self, params: Params) -> DocumentResult<Option<Versions>> {
        let Some(document_id) = params.document_id.clone() else {
            return Ok(None);
        };
        let resolved = self.resolve(Action::DiscardDraft, &params)?;

        let tx = self.repo.begin().await?;
        let result = self.discard_in(&*tx, &document_id, &resolved, &params).await;
        let discarded = self.settle(Action::DiscardDraft, tx, result).await?;

        if let Some(discarded) = &discarded {
            tracing::info!(
                uid = %self.uid(),
                %document_id,
                locales = discarded.versions.len(),
                "Discarded document drafts"
            );
            for version in &discarded.versions {
                self.emit(EventKind::DraftDiscard, &document_id, version.locale.clone());
            }
        }
        Ok(discarded)
    }

    async fn discard_in<S: RowStore + ?Sized>(
        &self,
        store: &S,
        document_id: &DocumentId,
        resolved: &Resolved,
        params: &Params,
    ) -> DocumentResult<Option<Versions>> {
        let rows = load_siblings(store, self.uid(), document_id).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        // Only locales holding both versions change; a draft-only or
        // published-only locale is left as it is.
        let mut drafts = Vec::new();
        let published = rows
            .iter()
            .filter(|row| !row.is_draft() && resolved.locale.admits(row.locale()));
        for row in published {
            let Some(stale) = find_row(&rows, &row.locale, PublicationState::Draft) else {
                continue;
            };
            store.delete(self.uid(), stale.id).await?;
            drafts.push(store.create(self.uid(), row.copy_as(None)).await?);
        }

        let versions = self.present(store, drafts, params).await?;
        Ok(Some(Versions {
            document_id: document_id.clone(),
            versions,
        }))
    }

    // ---- helpers ----------------------------------------------------------

    fn resolve(&self, action: Action, params: &Params) -> DocumentResult<Resolved> {
        Ok(defaults::resolve(
            action,
            &self.content_type,
            params.locale.as_ref(),
            params.status,
            &self.config.default_locale,
        )?)
    }

    /// Filters, locale/status scope and ordering for list-style reads.
    fn list_query(&self, action: Action, params: &Params) -> DocumentResult<RowQuery> {
        let resolved = self.resolve(action, params)?;
        Ok(RowQuery::new(self.uid())
            .filter(user_filter(params)?)
            .filter(resolved.filter())
            .sort(sort_keys(params)?))
    }

    fn scoped(&self, document_id: &DocumentId, locale: &LocaleScope) -> RowQuery {
        RowQuery::for_document(self.uid(), document_id).filter(locale_filter(locale))
    }

    /// The single row of one (documentId, locale, state).
    fn version_query(
        &self,
        document_id: &DocumentId,
        locale: &Option<String>,
        state: PublicationState,
    ) -> RowQuery {
        self.scoped(document_id, &LocaleScope::One(locale.clone()))
            .filter(status_filter(Some(state)))
    }

    /// Commit on success, roll back on failure.
    async fn settle<T>(
        &self,
        action: Action,
        tx: Box<dyn Transaction>,
        result: DocumentResult<T>,
    ) -> DocumentResult<T> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(uid = %self.uid(), %action, error = %err, "Rolling back document transaction");
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    fn emit(&self, kind: EventKind, document_id: &DocumentId, locale: Option<String>) {
        self.events
            .emit(DocumentEvent::new(kind, self.uid(), document_id, locale));
    }

    async fn present_one<S: RowStore + ?Sized>(
        &self,
        store: &S,
        row: DocumentVersion,
        params: &Params,
    ) -> DocumentResult<Document> {
        let siblings = load_siblings(store, self.uid(), &row.document_id).await?;
        self.finish(store, row, &siblings, params).await
    }

    /// Convert rows to documents, loading each document's siblings once.
    async fn present<S: RowStore + ?Sized>(
        &self,
        store: &S,
        rows: Vec<DocumentVersion>,
        params: &Params,
    ) -> DocumentResult<Vec<Document>> {
        let mut families: BTreeMap<DocumentId, Vec<DocumentVersion>> = BTreeMap::new();
        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            if !families.contains_key(&row.document_id) {
                let siblings = load_siblings(store, self.uid(), &row.document_id).await?;
                families.insert(row.document_id.clone(), siblings);
            }
            let siblings = families
                .get(&row.document_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            documents.push(self.finish(store, row, siblings, params).await?);
        }
        Ok(documents)
    }

    async fn finish<S: RowStore + ?Sized>(
        &self,
        store: &S,
        row: DocumentVersion,
        siblings: &[DocumentVersion],
        params: &Params,
    ) -> DocumentResult<Document> {
        let mut document = to_document(&self.content_type, row, siblings, params.with_metadata);
        let populated = match &params.populate {
            Some(attributes) => self.populate(store, &mut document, attributes).await?,
            None => Vec::new(),
        };
        if let Some(fields) = &params.fields {
            document
                .data
                .retain(|key, _| fields.contains(key) || populated.contains(key));
        }
        Ok(document)
    }

    /// Replace relation references with the related document in the same
    /// status and locale. Returns the populated attribute names.
    async fn populate<S: RowStore + ?Sized>(
        &self,
        store: &S,
        document: &mut Document,
        attributes: &[String],
    ) -> DocumentResult<Vec<String>> {
        let everything = attributes.iter().any(|a| a == "*");
        let mut populated = Vec::new();
        for (attribute, target_uid) in &self.content_type.relations {
            if !everything && !attributes.contains(attribute) {
                continue;
            }
            let Some(target) = self.schemas.get(target_uid) else {
                tracing::warn!(uid = %self.uid(), %attribute, %target_uid, "Relation target is not registered");
                continue;
            };
            let Some(value) = document.data.get(attribute).cloned() else {
                continue;
            };
            let value = match value {
                Value::Array(items) => {
                    let mut related = Vec::with_capacity(items.len());
                    for item in &items {
                        if let Some(found) = self.load_related(store, target, item, document).await? {
                            related.push(found);
                        }
                    }
                    Value::Array(related)
                }
                single => self
                    .load_related(store, target, &single, document)
                    .await?
                    .unwrap_or(Value::Null),
            };
            document.data.insert(attribute.clone(), value);
            populated.push(attribute.clone());
        }
        Ok(populated)
    }

    async fn load_related<S: RowStore + ?Sized>(
        &self,
        store: &S,
        target: &ContentType,
        reference: &Value,
        source: &Document,
    ) -> DocumentResult<Option<Value>> {
        let raw = match reference {
            Value::String(id) => id.as_str(),
            Value::Object(map) => match map.get("documentId").and_then(Value::as_str) {
                Some(id) => id,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        let Ok(document_id) = DocumentId::parse(raw) else {
            return Ok(None);
        };

        let state = if source.is_draft() {
            PublicationState::Draft
        } else {
            PublicationState::Published
        };
        let locale = if target.localized {
            LocaleScope::One(Some(source.locale.clone().unwrap_or_else(|| {
                target
                    .default_locale_or(&self.config.default_locale)
                    .to_string()
            })))
        } else {
            LocaleScope::One(None)
        };
        let mut query = RowQuery::for_document(&target.uid, &document_id).filter(locale_filter(&locale));
        if target.draft_and_publish {
            query = query.filter(status_filter(Some(state)));
        }

        let Some(row) = store.find_one(&query).await? else {
            return Ok(None);
        };
        let siblings = load_siblings(store, &target.uid, &document_id).await?;
        let related = to_document(target, row, &siblings, false);
        Ok(Some(serde_json::to_value(related)?))
    }
}

#[async_trait]
impl Endpoint for DocumentService {
    async fn call(&self, ctx: Context) -> DocumentResult<Outcome> {
        let Context { action, params, .. } = ctx;
        tracing::debug!(
            uid = %self.uid(),
            %action,
            document_id = ?params.document_id,
            locale = ?params.locale,
            "Running document operation"
        );
        match action {
            Action::FindOne => self.run_find_one(params).await.map(Outcome::Document),
            Action::FindFirst => self.run_find_first(params).await.map(Outcome::Document),
            Action::FindMany => self.run_find_many(params).await.map(Outcome::Documents),
            Action::Count => self.run_count(params).await.map(Outcome::Count),
            Action::FindPage => self.run_find_page(params).await.map(Outcome::Page),
            Action::Create => self
                .run_create(params)
                .await
                .map(|document| Outcome::Document(Some(document))),
            Action::Update => self.run_update(params).await.map(Outcome::Document),
            Action::Delete => self.run_delete(params).await.map(Outcome::Deleted),
            Action::DeleteMany => self.run_delete_many(params).await.map(Outcome::Deleted),
            Action::Clone => self.run_clone(params).await.map(Outcome::Versions),
            Action::Publish => self.run_publish(params).await.map(Outcome::Versions),
            Action::Unpublish => self.run_unpublish(params).await.map(Outcome::Versions),
            Action::DiscardDraft => self.run_discard_draft(params).await.map(Outcome::Versions),
        }
    }
}

fn with_document(mut params: Params, document_id: &DocumentId) -> Params {
    params.document_id = Some(document_id.clone());
    params
}

fn user_filter(params: &Params) -> DocumentResult<Filter> {
    match &params.filters {
        None | Some(Value::Null) => Ok(Filter::Everything),
        Some(raw) => Ok(filters::parse(raw)?),
    }
}

fn sort_keys(params: &Params) -> DocumentResult<Vec<SortField>> {
    params
        .sort
        .iter()
        .map(|clause| filters::parse_sort(clause).map_err(DocumentError::from))
        .collect()
}

fn find_row<'a>(
    rows: &'a [DocumentVersion],
    locale: &Option<String>,
    state: PublicationState,
) -> Option<&'a DocumentVersion> {
    rows.iter()
        .find(|row| &row.locale == locale && row.state() == state)
}

fn to_document(
    content_type: &ContentType,
    row: DocumentVersion,
    siblings: &[DocumentVersion],
    with_metadata: bool,
) -> Document {
    let status = status::status_of(content_type, &row, siblings);
    let meta = with_metadata.then(|| status::metadata_of(content_type, &row, siblings));
    let mut document = Document::from_version(row, status);
    document.meta = meta;
    document
}
