use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::DocumentId;
use super::status::{DocumentMetadata, DocumentStatus};

/// Internal row identifier. Never leaves the repository boundary except
/// to address a row in a follow-up repository call.
pub type RowId = u64;

/// Attribute payload of one version.
pub type Attributes = Map<String, Value>;

/// Publication state of a physical row, also used as the `status` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    Draft,
    Published,
}

/// One physical row: a single (documentId, locale, publication state) version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub id: RowId,
    pub document_id: DocumentId,
    pub locale: Option<String>,
    /// `None` marks a draft row.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub data: Attributes,
}

impl DocumentVersion {
    pub fn state(&self) -> PublicationState {
        if self.published_at.is_some() {
            PublicationState::Published
        } else {
            PublicationState::Draft
        }
    }

    pub fn is_draft(&self) -> bool {
        self.published_at.is_none()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Flat JSON view used for filtering and sorting: attributes plus system fields.
    pub fn to_value(&self) -> Value {
        let mut view = self.data.clone();
        view.insert("id".into(), Value::from(self.id));
        view.insert("documentId".into(), Value::from(self.document_id.as_str()));
        view.insert(
            "locale".into(),
            self.locale.clone().map(Value::String).unwrap_or(Value::Null),
        );
        view.insert("publishedAt".into(), timestamp(self.published_at));
        view.insert("createdAt".into(), timestamp(Some(self.created_at)));
        view.insert("updatedAt".into(), timestamp(Some(self.updated_at)));
        view.insert(
            "createdBy".into(),
            self.created_by.clone().map(Value::String).unwrap_or(Value::Null),
        );
        view.insert(
            "updatedBy".into(),
            self.updated_by.clone().map(Value::String).unwrap_or(Value::Null),
        );
        Value::Object(view)
    }

    /// Copy this row into a new row of the given state, keeping content and audit fields.
    pub fn copy_as(&self, published_at: Option<DateTime<Utc>>) -> NewVersion {
        NewVersion {
            document_id: self.document_id.clone(),
            locale: self.locale.clone(),
            published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
            data: self.data.clone(),
        }
    }
}

/// Row to insert; the repository assigns the [`RowId`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub document_id: DocumentId,
    pub locale: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub data: Attributes,
}

impl NewVersion {
    /// A fresh draft stamped with the current time.
    pub fn draft(
        document_id: DocumentId,
        locale: Option<String>,
        data: Attributes,
        actor: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            document_id,
            locale,
            published_at: None,
            created_at: now,
            updated_at: now,
            created_by: actor.clone(),
            updated_by: actor,
            data,
        }
    }

    pub fn into_version(self, id: RowId) -> DocumentVersion {
        DocumentVersion {
            id,
            document_id: self.document_id,
            locale: self.locale,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by,
            updated_by: self.updated_by,
            data: self.data,
        }
    }
}

/// In-place change to a draft row. Attributes are merged key by key.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionPatch {
    pub data: Attributes,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl VersionPatch {
    pub fn apply(self, row: &mut DocumentVersion) {
        for (key, value) in self.data {
            row.data.insert(key, value);
        }
        row.updated_at = self.updated_at;
        if self.updated_by.is_some() {
            row.updated_by = self.updated_by;
        }
    }
}

/// A version as returned to callers: no internal row id, plus derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: DocumentId,
    pub locale: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub status: DocumentStatus,
    #[serde(flatten)]
    pub data: Attributes,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub meta: Option<DocumentMetadata>,
}

impl Document {
    pub fn from_version(version: DocumentVersion, status: DocumentStatus) -> Self {
        Self {
            document_id: version.document_id,
            locale: version.locale,
            published_at: version.published_at,
            created_at: version.created_at,
            updated_at: version.updated_at,
            created_by: version.created_by,
            updated_by: version.updated_by,
            status,
            data: version.data,
            meta: None,
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.data.get(attribute)
    }

    pub fn is_draft(&self) -> bool {
        self.published_at.is_none()
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> Value {
    value
        .map(|t| Value::String(t.to_rfc3339()))
        .unwrap_or(Value::Null)
}
