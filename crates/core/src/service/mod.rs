//! Document manager: one facade per registered content type.

pub mod document_service;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::document::schema::SchemaRegistry;
use crate::error::{DocumentError, DocumentResult};
use crate::events::{DocumentEvent, EventBus};
use crate::middleware::MiddlewareRegistry;
use crate::repository::Repository;

pub use document_service::DocumentService;
pub use types::{DeleteResult, Page, Pagination, Params, Versions};

/// Entry point handed to callers.
///
/// Middleware is composed into each facade here, so interceptors registered
/// on `middleware` after construction have no effect.
pub struct DocumentManager {
    services: BTreeMap<String, DocumentService>,
    events: EventBus,
    config: Arc<ServiceConfig>,
}

impl DocumentManager {
    pub fn new(
        repo: Arc<dyn Repository>,
        schemas: SchemaRegistry,
        middleware: MiddlewareRegistry,
        config: ServiceConfig,
    ) -> Self {
        let schemas = Arc::new(schemas);
        let config = Arc::new(config);
        let events = EventBus::new(config.event_bus_capacity);

        let services: BTreeMap<_, _> = schemas
            .iter()
            .map(|content_type| {
                let service = DocumentService::new(
                    content_type.clone(),
                    Arc::clone(&schemas),
                    Arc::clone(&repo),
                    &middleware,
                    events.clone(),
                    Arc::clone(&config),
                );
                (content_type.uid.clone(), service)
            })
            .collect();

        tracing::info!(
            content_types = services.len(),
            middleware = middleware.len(),
            "Document manager ready"
        );

        Self {
            services,
            events,
            config,
        }
    }

    /// The facade for `uid`.
    pub fn documents(&self, uid: &str) -> DocumentResult<&DocumentService> {
        self.services
            .get(uid)
            .ok_or_else(|| DocumentError::UnknownContentType(uid.to_string()))
    }

    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to lifecycle events of every content type.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
