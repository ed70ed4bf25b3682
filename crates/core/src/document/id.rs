/// Document identity and locale selection.
///
/// A `documentId` is allocated once (create/clone) and shared by every
/// locale and publication-state row of one logical document. Locales are
/// selected per call as a concrete value, the `*` wildcard or omitted.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::ValidationError;

const WILDCARD_LOCALE: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        DocumentId(Uuid::new_v4().simple().to_string())
    }

    /// Parse a caller-supplied identifier.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) || trimmed == WILDCARD_LOCALE {
            return Err(ValidationError::InvalidDocumentId(raw.to_string()));
        }
        Ok(DocumentId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DocumentId::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Locale requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocaleSelector {
    /// The `*` wildcard: every locale of the document.
    All,
    Exact(String),
}

impl LocaleSelector {
    pub fn parse(raw: &str) -> Self {
        if raw == WILDCARD_LOCALE {
            LocaleSelector::All
        } else {
            LocaleSelector::Exact(raw.to_string())
        }
    }
}

impl From<String> for LocaleSelector {
    fn from(raw: String) -> Self {
        LocaleSelector::parse(&raw)
    }
}

impl From<&str> for LocaleSelector {
    fn from(raw: &str) -> Self {
        LocaleSelector::parse(raw)
    }
}

impl From<LocaleSelector> for String {
    fn from(selector: LocaleSelector) -> Self {
        match selector {
            LocaleSelector::All => WILDCARD_LOCALE.to_string(),
            LocaleSelector::Exact(locale) => locale,
        }
    }
}

/// Locale scope after defaulting against a content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleScope {
    /// No locale restriction.
    Any,
    /// Exactly one locale; `None` is the canonical locale of non-localized types.
    One(Option<String>),
}

impl LocaleScope {
    pub fn admits(&self, locale: Option<&str>) -> bool {
        match self {
            LocaleScope::Any => true,
            LocaleScope::One(expected) => expected.as_deref() == locale,
        }
    }
}
