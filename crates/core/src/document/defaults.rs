//! Per-action defaulting of `status` and `locale`.
//!
//! Every facade operation resolves its parameters through [`resolve`], which
//! consults the single table in [`rules_for`].

use document_service_filters::Filter;

use super::id::{LocaleScope, LocaleSelector};
use super::model::PublicationState;
use super::schema::ContentType;
use super::validate::ValidationError;
use crate::middleware::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    /// Caller may pick; draft when omitted.
    DefaultDraft,
    /// Always the draft row; caller input is ignored.
    ForcedDraft,
    /// Status plays no role; caller input is ignored.
    Ignored,
    /// Supplying a status is a validation error.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleDefault {
    DefaultLocale,
    AllLocales,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub status: StatusRule,
    pub locale: LocaleDefault,
    pub wildcard: bool,
    pub requires_draft_and_publish: bool,
}

pub const fn rules_for(action: Action) -> Rules {
    use LocaleDefault::*;
    use StatusRule::*;

    let (status, locale, wildcard, requires_draft_and_publish) = match action {
        Action::FindOne
        | Action::FindFirst
        | Action::FindMany
        | Action::Count
        | Action::FindPage => (DefaultDraft, DefaultLocale, true, false),
        Action::Create => (ForcedDraft, DefaultLocale, false, false),
        Action::Update => (ForcedDraft, DefaultLocale, false, false),
        Action::Delete => (Ignored, AllLocales, true, false),
        Action::DeleteMany => (Rejected, AllLocales, true, false),
        Action::Clone => (ForcedDraft, AllLocales, true, false),
        Action::Publish | Action::Unpublish | Action::DiscardDraft => {
            (Ignored, AllLocales, true, true)
        }
    };
    Rules {
        status,
        locale,
        wildcard,
        requires_draft_and_publish,
    }
}

/// Effective scope of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub locale: LocaleScope,
    /// `None` when rows of both states are in scope.
    pub status: Option<PublicationState>,
}

impl Resolved {
    /// Repository predicate for this scope.
    pub fn filter(&self) -> Filter {
        Filter::all([locale_filter(&self.locale), status_filter(self.status)])
    }

    /// The single locale a write targets.
    pub fn target_locale(&self) -> Option<String> {
        match &self.locale {
            LocaleScope::One(locale) => locale.clone(),
            LocaleScope::Any => None,
        }
    }
}

pub fn resolve(
    action: Action,
    content_type: &ContentType,
    locale: Option<&LocaleSelector>,
    status: Option<PublicationState>,
    fallback_locale: &str,
) -> Result<Resolved, ValidationError> {
    let rules = rules_for(action);

    if rules.requires_draft_and_publish && !content_type.draft_and_publish {
        return Err(ValidationError::DraftAndPublishDisabled {
            uid: content_type.uid.clone(),
            action,
        });
    }

    let status = match rules.status {
        StatusRule::Rejected if status.is_some() => {
            return Err(ValidationError::StatusNotAllowed { action })
        }
        StatusRule::Rejected | StatusRule::Ignored => None,
        StatusRule::ForcedDraft => Some(PublicationState::Draft),
        StatusRule::DefaultDraft if content_type.draft_and_publish => {
            Some(status.unwrap_or(PublicationState::Draft))
        }
        StatusRule::DefaultDraft => None,
    };

    let locale = if !content_type.localized {
        LocaleScope::One(None)
    } else {
        match locale {
            Some(LocaleSelector::Exact(locale)) => LocaleScope::One(Some(locale.clone())),
            Some(LocaleSelector::All) if rules.wildcard => LocaleScope::Any,
            Some(LocaleSelector::All) => {
                return Err(ValidationError::WildcardLocaleNotAllowed { action })
            }
            None => match rules.locale {
                LocaleDefault::AllLocales => LocaleScope::Any,
                LocaleDefault::DefaultLocale => LocaleScope::One(Some(
                    content_type.default_locale_or(fallback_locale).to_string(),
                )),
            },
        }
    };

    Ok(Resolved { locale, status })
}

pub fn locale_filter(scope: &LocaleScope) -> Filter {
    match scope {
        LocaleScope::Any => Filter::Everything,
        LocaleScope::One(Some(locale)) => Filter::eq("locale", locale.as_str()),
        LocaleScope::One(None) => Filter::is_null("locale"),
    }
}

pub fn status_filter(status: Option<PublicationState>) -> Filter {
    match status {
        None => Filter::Everything,
        Some(PublicationState::Draft) => Filter::is_null("publishedAt"),
        Some(PublicationState::Published) => Filter::not_null("publishedAt"),
    }
}
