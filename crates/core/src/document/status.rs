//! Derived status and sibling metadata.
//!
//! Everything here is computed from a sibling set loaded fresh from the
//! repository (every row sharing one `documentId`); versions never hold
//! references to each other.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::DocumentId;
use super::model::{DocumentVersion, PublicationState};
use super::schema::ContentType;
use crate::repository::{RepoResult, RowQuery, RowStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Published,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableLocale {
    pub locale: Option<String>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableStatus {
    pub locale: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub available_locales: Vec<AvailableLocale>,
    pub available_status: Vec<AvailableStatus>,
}

/// Load every row of one document.
pub async fn load_siblings<S: RowStore + ?Sized>(
    store: &S,
    uid: &str,
    document_id: &DocumentId,
) -> RepoResult<Vec<DocumentVersion>> {
    store
        .find_many(&RowQuery::for_document(uid, document_id))
        .await
}

/// Two versions carry the same content when their attribute payloads are equal.
///
/// System and audit fields live outside the payload, so they never take part
/// in the comparison. Object key order is irrelevant.
pub fn same_content(left: &DocumentVersion, right: &DocumentVersion) -> bool {
    left.data == right.data
}

/// Classify `version` against the draft/published pair of its locale.
pub fn status_of(
    content_type: &ContentType,
    version: &DocumentVersion,
    siblings: &[DocumentVersion],
) -> DocumentStatus {
    if !content_type.draft_and_publish {
        return DocumentStatus::Published;
    }
    let in_state = |state: PublicationState| {
        siblings
            .iter()
            .chain(std::iter::once(version))
            .find(|row| row.locale == version.locale && row.state() == state)
    };
    match (in_state(PublicationState::Draft), in_state(PublicationState::Published)) {
        (_, None) => DocumentStatus::Draft,
        (None, Some(_)) => DocumentStatus::Published,
        (Some(draft), Some(published)) if same_content(draft, published) => {
            DocumentStatus::Published
        }
        (Some(_), Some(_)) => DocumentStatus::Modified,
    }
}

/// Sibling summaries for one version.
pub fn metadata_of(
    content_type: &ContentType,
    version: &DocumentVersion,
    siblings: &[DocumentVersion],
) -> DocumentMetadata {
    let available_status = if content_type.draft_and_publish {
        siblings
            .iter()
            .filter(|row| row.locale == version.locale && row.state() != version.state())
            .map(|row| AvailableStatus {
                locale: row.locale.clone(),
                published_at: row.published_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
                created_by: row.created_by.clone(),
                updated_by: row.updated_by.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut representatives: BTreeMap<Option<&str>, &DocumentVersion> = BTreeMap::new();
    if content_type.localized {
        for row in siblings.iter().filter(|row| row.locale != version.locale) {
            let slot = representatives.entry(row.locale()).or_insert(row);
            if !slot.is_draft() && row.is_draft() {
                *slot = row;
            }
        }
    }
    let available_locales = representatives
        .into_values()
        .map(|row| AvailableLocale {
            locale: row.locale.clone(),
            status: status_of(content_type, row, siblings),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect();

    DocumentMetadata {
        available_locales,
        available_status,
    }
}
