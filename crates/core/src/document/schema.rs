use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Content-type options the document layer needs: draft & publish,
/// localization and relation targets for `populate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentType {
    pub uid: String,
    pub draft_and_publish: bool,
    pub localized: bool,
    /// Overrides the service-wide default locale.
    pub default_locale: Option<String>,
    /// Relation attribute name -> target content-type uid.
    #[serde(default)]
    pub relations: BTreeMap<String, String>,
}

impl ContentType {
    /// Draft & publish enabled, not localized.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            draft_and_publish: true,
            localized: false,
            default_locale: None,
            relations: BTreeMap::new(),
        }
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn without_draft_and_publish(mut self) -> Self {
        self.draft_and_publish = false;
        self
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    pub fn relation(mut self, attribute: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.insert(attribute.into(), target.into());
        self
    }

    /// Locale applied when a localized call omits one.
    pub fn default_locale_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.default_locale.as_deref().unwrap_or(fallback)
    }
}

/// Content types known at bootstrap, keyed by uid.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, ContentType>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, content_type: ContentType) -> &mut Self {
        self.types.insert(content_type.uid.clone(), content_type);
        self
    }

    pub fn with(mut self, content_type: ContentType) -> Self {
        self.register(content_type);
        self
    }

    pub fn get(&self, uid: &str) -> Option<&ContentType> {
        self.types.get(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
