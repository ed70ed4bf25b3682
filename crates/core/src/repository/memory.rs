//! Reference repository keeping every row in process memory.
//!
//! Writers are serialised: an open transaction holds the table lock until it
//! commits or rolls back, and a snapshot taken at `begin` is restored on
//! rollback or when the transaction is dropped uncommitted.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use document_service_filters::{compare_rows, matches};
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{RepoError, RepoResult, Repository, RowQuery, RowStore, Transaction};
use crate::document::model::{DocumentVersion, NewVersion, RowId, VersionPatch};

type UniqueFields = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: RowId,
    rows: BTreeMap<String, BTreeMap<RowId, DocumentVersion>>,
}

impl Tables {
    fn matching(&self, query: &RowQuery) -> Vec<&DocumentVersion> {
        let Some(table) = self.rows.get(&query.uid) else {
            return Vec::new();
        };
        let mut selected: Vec<(&DocumentVersion, Value)> = table
            .values()
            .map(|row| (row, row.to_value()))
            .filter(|(_, view)| matches(&query.filter, view))
            .collect();
        if !query.sort.is_empty() {
            selected.sort_by(|a, b| compare_rows(&a.1, &b.1, &query.sort));
        }
        selected.into_iter().map(|(row, _)| row).collect()
    }

    fn find_many(&self, query: &RowQuery) -> Vec<DocumentVersion> {
        self.matching(query)
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    fn count(&self, query: &RowQuery) -> u64 {
        self.matching(query).len() as u64
    }

    fn insert(&mut self, uid: &str, row: NewVersion, unique: &[String]) -> RepoResult<DocumentVersion> {
        let row = row.into_version(self.last_id + 1);
        self.check_unique(uid, &row, unique)?;
        self.last_id = row.id;
        self.rows
            .entry(uid.to_string())
            .or_default()
            .insert(row.id, row.clone());
        Ok(row)
    }

    fn update(
        &mut self,
        uid: &str,
        id: RowId,
        patch: VersionPatch,
        unique: &[String],
    ) -> RepoResult<DocumentVersion> {
        let mut row = self
            .rows
            .get(uid)
            .and_then(|table| table.get(&id))
            .cloned()
            .ok_or(RepoError::RowNotFound(id))?;
        patch.apply(&mut row);
        self.check_unique(uid, &row, unique)?;
        self.rows
            .entry(uid.to_string())
            .or_default()
            .insert(id, row.clone());
        Ok(row)
    }

    fn delete(&mut self, uid: &str, id: RowId) -> bool {
        self.rows
            .get_mut(uid)
            .is_some_and(|table| table.remove(&id).is_some())
    }

    fn delete_many(&mut self, query: &RowQuery) -> u64 {
        let ids: Vec<RowId> = self.matching(query).iter().map(|row| row.id).collect();
        let Some(table) = self.rows.get_mut(&query.uid) else {
            return 0;
        };
        ids.iter().filter(|id| table.remove(*id).is_some()).count() as u64
    }

    /// Unique values may repeat across publication states and locales, never
    /// within one (state, locale) partition.
    fn check_unique(&self, uid: &str, candidate: &DocumentVersion, unique: &[String]) -> RepoResult<()> {
        let Some(table) = self.rows.get(uid) else {
            return Ok(());
        };
        for field in unique {
            let Some(value) = candidate.data.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = table.values().any(|row| {
                row.id != candidate.id
                    && row.state() == candidate.state()
                    && row.locale == candidate.locale
                    && row.data.get(field) == Some(value)
            });
            if clash {
                return Err(RepoError::UniqueConstraint {
                    uid: uid.to_string(),
                    field: field.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }
}

/// In-memory [`Repository`], cheap to clone (clones share storage).
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
    unique: Arc<UniqueFields>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare unique attributes for a content type.
    pub fn with_unique_fields<I, S>(mut self, uid: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.unique)
            .entry(uid.to_string())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Total number of stored rows across all content types.
    pub async fn row_count(&self) -> usize {
        self.tables.lock().await.len()
    }

    fn unique_for(&self, uid: &str) -> &[String] {
        unique_for(&self.unique, uid)
    }
}

fn unique_for<'a>(unique: &'a UniqueFields, uid: &str) -> &'a [String] {
    unique.get(uid).map(Vec::as_slice).unwrap_or(&[])
}

#[async_trait]
impl RowStore for InMemoryRepository {
    async fn find_one(&self, query: &RowQuery) -> RepoResult<Option<DocumentVersion>> {
        Ok(self.tables.lock().await.find_many(&query.clone().limit(1)).pop())
    }

    async fn find_many(&self, query: &RowQuery) -> RepoResult<Vec<DocumentVersion>> {
        Ok(self.tables.lock().await.find_many(query))
    }

    async fn count(&self, query: &RowQuery) -> RepoResult<u64> {
        Ok(self.tables.lock().await.count(query))
    }

    async fn create(&self, uid: &str, row: NewVersion) -> RepoResult<DocumentVersion> {
        self.tables.lock().await.insert(uid, row, self.unique_for(uid))
    }

    async fn update(&self, uid: &str, id: RowId, patch: VersionPatch) -> RepoResult<DocumentVersion> {
        self.tables
            .lock()
            .await
            .update(uid, id, patch, self.unique_for(uid))
    }

    async fn delete(&self, uid: &str, id: RowId) -> RepoResult<bool> {
        Ok(self.tables.lock().await.delete(uid, id))
    }

    async fn delete_many(&self, query: &RowQuery) -> RepoResult<u64> {
        Ok(self.tables.lock().await.delete_many(query))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn begin(&self) -> RepoResult<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let snapshot = (*guard).clone();
        tracing::trace!(rows = snapshot.len(), "Transaction started");
        Ok(Box::new(MemoryTransaction {
            tables: Mutex::new(guard),
            snapshot: Some(snapshot),
            unique: Arc::clone(&self.unique),
        }))
    }
}

/// Open transaction over an [`InMemoryRepository`].
pub struct MemoryTransaction {
    tables: Mutex<OwnedMutexGuard<Tables>>,
    /// `None` once committed or rolled back.
    snapshot: Option<Tables>,
    unique: Arc<UniqueFields>,
}

impl MemoryTransaction {
    fn restore(&mut self) -> bool {
        match self.snapshot.take() {
            Some(snapshot) => {
                **self.tables.get_mut() = snapshot;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl RowStore for MemoryTransaction {
    async fn find_one(&self, query: &RowQuery) -> RepoResult<Option<DocumentVersion>> {
        Ok(self.tables.lock().await.find_many(&query.clone().limit(1)).pop())
    }

    async fn find_many(&self, query: &RowQuery) -> RepoResult<Vec<DocumentVersion>> {
        Ok(self.tables.lock().await.find_many(query))
    }

    async fn count(&self, query: &RowQuery) -> RepoResult<u64> {
        Ok(self.tables.lock().await.count(query))
    }

    async fn create(&self, uid: &str, row: NewVersion) -> RepoResult<DocumentVersion> {
        self.tables
            .lock()
            .await
            .insert(uid, row, unique_for(&self.unique, uid))
    }

    async fn update(&self, uid: &str, id: RowId, patch: VersionPatch) -> RepoResult<DocumentVersion> {
        self.tables
            .lock()
            .await
            .update(uid, id, patch, unique_for(&self.unique, uid))
    }

    async fn delete(&self, uid: &str, id: RowId) -> RepoResult<bool> {
        Ok(self.tables.lock().await.delete(uid, id))
    }

    async fn delete_many(&self, query: &RowQuery) -> RepoResult<u64> {
        Ok(self.tables.lock().await.delete_many(query))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let mut this = self;
        this.snapshot = None;
        tracing::trace!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        let mut this = self;
        this.restore();
        tracing::debug!("Transaction rolled back");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.restore() {
            tracing::warn!("Transaction dropped without commit; changes rolled back");
        }
    }
}
