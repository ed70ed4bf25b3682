use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::id::DocumentId;

/// Lifecycle events emitted after a document operation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "entry.create")]
    Create,
    #[serde(rename = "entry.update")]
    Update,
    #[serde(rename = "entry.delete")]
    Delete,
    #[serde(rename = "entry.publish")]
    Publish,
    #[serde(rename = "entry.unpublish")]
    Unpublish,
    #[serde(rename = "entry.draft-discard")]
    DraftDiscard,
    #[serde(rename = "entry.clone")]
    Clone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEvent {
    pub kind: EventKind,
    pub uid: String,
    pub document_id: DocumentId,
    pub locale: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DocumentEvent {
    pub fn new(kind: EventKind, uid: &str, document_id: &DocumentId, locale: Option<String>) -> Self {
        Self {
            kind,
            uid: uid.to_string(),
            document_id: document_id.clone(),
            locale,
            timestamp: Utc::now(),
        }
    }
}
