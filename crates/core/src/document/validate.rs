/// Parameter and payload validation.
use serde_json::{Map, Value};
use thiserror::Error;

use crate::middleware::Action;

/// Attribute names owned by the storage layer; callers cannot write them.
pub const SYSTEM_FIELDS: &[&str] = &[
    "id",
    "documentId",
    "locale",
    "publishedAt",
    "createdAt",
    "updatedAt",
    "createdBy",
    "updatedBy",
    "status",
];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{action} does not accept a status; use unpublish or discardDraft instead")]
    StatusNotAllowed { action: Action },
    #[error("{action} does not accept the '*' locale")]
    WildcardLocaleNotAllowed { action: Action },
    #[error("{action} is not available: {uid} does not have draft and publish enabled")]
    DraftAndPublishDisabled { uid: String, action: Action },
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),
    #[error("document data must be a JSON object")]
    InvalidData,
    #[error("invalid documentId: {0:?}")]
    InvalidDocumentId(String),
}

/// Strip system fields from a caller payload.
///
/// `publishedAt` in particular is dropped so a create or update can never
/// write a published row directly.
pub fn sanitize_attributes(data: Option<&Value>) -> Result<Map<String, Value>, ValidationError> {
    let mut attributes = match data {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(ValidationError::InvalidData),
    };
    attributes.retain(|key, _| !SYSTEM_FIELDS.contains(&key.as_str()));
    Ok(attributes)
}

/// Validate a 1-based page number.
pub fn validate_page(page: Option<usize>) -> Result<usize, ValidationError> {
    match page {
        None => Ok(1),
        Some(0) => Err(ValidationError::InvalidPagination(
            "page must be greater than 0".to_string(),
        )),
        Some(page) => Ok(page),
    }
}

/// Row offset of a 1-based page.
pub fn page_offset(page: usize, page_size: usize) -> Result<usize, ValidationError> {
    page.checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(page_size))
        .ok_or_else(|| ValidationError::InvalidPagination(format!("page {page} is out of range")))
}
