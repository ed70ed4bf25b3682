//! Priority-ordered interceptors around every document operation.
//!
//! Interceptors are registered at bootstrap on a [`MiddlewareRegistry`] under
//! one of four scopes (global, uid, action, uid+action). For a concrete call the
//! matching interceptors run outermost-first by descending [`Priority`], ties in
//! registration order, with the operation itself as the innermost step.

pub mod registry;
pub mod stack;

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, DocumentResult};
use crate::service::types::{DeleteResult, Page, Params, Versions};
use crate::document::model::Document;

pub use registry::MiddlewareRegistry;
pub use stack::{Next, Pipeline};

/// Facade operations an interceptor can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    FindOne,
    FindFirst,
    FindMany,
    Count,
    FindPage,
    Create,
    Update,
    Delete,
    DeleteMany,
    Clone,
    Publish,
    Unpublish,
    DiscardDraft,
}

impl Action {
    pub const ALL: [Action; 13] = [
        Action::FindOne,
        Action::FindFirst,
        Action::FindMany,
        Action::Count,
        Action::FindPage,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::DeleteMany,
        Action::Clone,
        Action::Publish,
        Action::Unpublish,
        Action::DiscardDraft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::FindOne => "findOne",
            Action::FindFirst => "findFirst",
            Action::FindMany => "findMany",
            Action::Count => "count",
            Action::FindPage => "findPage",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::DeleteMany => "deleteMany",
            Action::Clone => "clone",
            Action::Publish => "publish",
            Action::Unpublish => "unpublish",
            Action::DiscardDraft => "discardDraft",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Action::FindOne | Action::FindFirst | Action::FindMany | Action::Count | Action::FindPage
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// What an interceptor sees for one call.
#[derive(Debug, Clone)]
pub struct Context {
    pub uid: String,
    pub action: Action,
    pub params: Params,
}

/// Result of one operation as it travels back out through the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Document(Option<Document>),
    Documents(Vec<Document>),
    Count(u64),
    Page(Page),
    Versions(Option<Versions>),
    Deleted(DeleteResult),
}

impl Outcome {
    pub fn into_document(self, action: Action) -> DocumentResult<Option<Document>> {
        match self {
            Outcome::Document(document) => Ok(document),
            _ => Err(DocumentError::UnexpectedOutcome { action }),
        }
    }

    pub fn into_documents(self, action: Action) -> DocumentResult<Vec<Document>> {
        match self {
            Outcome::Documents(documents) => Ok(documents),
            _ => Err(DocumentError::UnexpectedOutcome { action }),
        }
    }

    pub fn into_count(self, action: Action) -> DocumentResult<u64> {
        match self {
            Outcome::Count(count) => Ok(count),
            _ => Err(DocumentError::UnexpectedOutcome { action }),
        }
    }

    pub fn into_page(self, action: Action) -> DocumentResult<Page> {
        match self {
            Outcome::Page(page) => Ok(page),
            _ => Err(DocumentError::UnexpectedOutcome { action }),
        }
    }

    pub fn into_versions(self, action: Action) -> DocumentResult<Option<Versions>> {
        match self {
            Outcome::Versions(versions) => Ok(versions),
            _ => Err(DocumentError::UnexpectedOutcome { action }),
        }
    }

    pub fn into_deleted(self, action: Action) -> DocumentResult<DeleteResult> {
        match self {
            Outcome::Deleted(result) => Ok(result),
            _ => Err(DocumentError::UnexpectedOutcome { action }),
        }
    }
}

/// An interceptor wrapping document operations.
///
/// It may rewrite `ctx.params` before calling `next`, transform the outcome
/// afterwards, return without calling `next`, or fail to abort the call.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: Context, next: Next<'_>) -> DocumentResult<Outcome>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The innermost step of a chain: the operation body itself.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, ctx: Context) -> DocumentResult<Outcome>;
}

/// Middleware backed by a closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a [`Middleware`].
///
/// ```ignore
/// registry.use_global(from_fn("audit", |ctx, next| async move {
///     next.run(ctx).await
/// }.boxed()), Priority::Normal);
/// ```
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(Context, Next<'a>) -> BoxFuture<'a, DocumentResult<Outcome>> + Send + Sync,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(Context, Next<'a>) -> BoxFuture<'a, DocumentResult<Outcome>> + Send + Sync,
{
    async fn handle(&self, ctx: Context, next: Next<'_>) -> DocumentResult<Outcome> {
        (self.f)(ctx, next).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
