//! Document service: a document-oriented data access layer over
//! versioned rows.
//!
//! A document is identified by a `documentId` and owns up to two rows
//! (draft and published) per locale. [`DocumentManager`] hands out one
//! [`DocumentService`] per content type; every call on it passes through
//! the registered middleware before reaching the repository.

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod middleware;
pub mod repository;
pub mod service;
pub mod telemetry;

pub use config::ServiceConfig;
pub use document::id::{DocumentId, LocaleSelector};
pub use document::model::{Document, PublicationState};
pub use document::schema::{ContentType, SchemaRegistry};
pub use document::status::{DocumentMetadata, DocumentStatus};
pub use error::{DocumentError, DocumentResult};
pub use events::{DocumentEvent, EventBus, EventKind};
pub use middleware::{
    from_fn, Action, Context, Middleware, MiddlewareRegistry, Next, Outcome, Priority,
};
pub use repository::{InMemoryRepository, Repository};
pub use service::{DeleteResult, DocumentManager, DocumentService, Page, Params, Versions};
